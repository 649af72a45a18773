use std::collections::VecDeque;
use std::sync::Mutex;

use bytes::{BufMut, Bytes, BytesMut};

use crate::binwriter::BinaryWriter;

/// Default capacity of a queue chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// An unbounded append-only byte queue shared between one producer thread
/// and one consumer thread.
///
/// The producer appends bytes and periodically calls [`commit`], which
/// publishes everything appended so far. The consumer calls
/// [`take_committed`] to drain published bytes in order; bytes appended
/// after the last `commit` are in flight and not observable.
///
/// Storage is chunked: the producer fills a fixed-capacity chunk and starts
/// a new one when it is full, so drained chunks are released while later
/// chunks continue to accept writes. Publication is an O(1) split of the
/// current chunk's filled prefix; committed bytes are never copied.
///
/// Each side's state has its own guard, and each guard is only ever taken
/// by its own thread except during `commit`, which moves the published
/// chunks from the producer's side to the consumer's.
///
/// [`commit`]: AsyncByteQueue::commit
/// [`take_committed`]: AsyncByteQueue::take_committed
pub struct AsyncByteQueue {
    chunk_size: usize,
    producer: Mutex<ProducerState>,
    committed: Mutex<VecDeque<Bytes>>,
}

struct ProducerState {
    /// Chunks filled to capacity but not yet published.
    full: Vec<BytesMut>,
    /// The chunk currently accepting writes.
    tail: BytesMut,
}

impl ProducerState {
    #[inline]
    fn remaining(&self) -> usize {
        self.tail.capacity() - self.tail.len()
    }

    /// Retires the current chunk and starts a fresh one of `capacity` bytes.
    fn start_new_chunk(&mut self, capacity: usize) {
        let old = std::mem::replace(&mut self.tail, BytesMut::with_capacity(capacity));
        if !old.is_empty() {
            self.full.push(old);
        }
    }
}

impl AsyncByteQueue {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Creates a queue with a custom chunk capacity. Small capacities are
    /// useful in tests to exercise chunk-boundary behaviour.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be positive");
        AsyncByteQueue {
            chunk_size,
            producer: Mutex::new(ProducerState {
                full: Vec::new(),
                tail: BytesMut::with_capacity(chunk_size),
            }),
            committed: Mutex::new(VecDeque::new()),
        }
    }

    /// Appends a copy of `data`, splitting across chunk boundaries as needed.
    pub fn append_copy(&self, data: &[u8]) {
        let mut p = self.lock_producer();
        let mut rest = data;
        while !rest.is_empty() {
            if p.remaining() == 0 {
                p.start_new_chunk(self.chunk_size);
            }
            let n = rest.len().min(p.remaining());
            p.tail.extend_from_slice(&rest[..n]);
            rest = &rest[n..];
        }
    }

    /// Appends a single byte.
    pub fn append_byte(&self, byte: u8) {
        let mut p = self.lock_producer();
        if p.remaining() == 0 {
            p.start_new_chunk(self.chunk_size);
        }
        p.tail.put_u8(byte);
    }

    /// Reserves a contiguous region of exactly `size` bytes and fills it
    /// through `fill`. `fill` must write exactly `size` bytes.
    ///
    /// If the current chunk cannot hold `size` contiguous bytes, a fresh
    /// chunk of capacity `max(chunk_size, size)` is started.
    pub fn append_with_writer<F>(&self, size: usize, fill: F)
    where
        F: FnOnce(&mut BinaryWriter<'_>),
    {
        let mut p = self.lock_producer();
        if p.remaining() < size {
            p.start_new_chunk(self.chunk_size.max(size));
        }
        let start = p.tail.len();
        p.tail.resize(start + size, 0);
        let mut writer = BinaryWriter::new(&mut p.tail[start..start + size]);
        fill(&mut writer);
        writer.finish();
    }

    /// Publishes all bytes appended so far to the consumer.
    pub fn commit(&self) {
        let mut p = self.lock_producer();
        let mut segments: Vec<Bytes> = p.full.drain(..).map(BytesMut::freeze).collect();
        if !p.tail.is_empty() {
            // Split off the filled prefix; the tail keeps its spare capacity.
            segments.push(p.tail.split().freeze());
        }
        drop(p);
        if segments.is_empty() {
            return;
        }
        let mut committed = self.lock_committed();
        committed.extend(segments);
    }

    /// Hands the consumer all committed bytes, as one call of `sink` per
    /// contiguous chunk, preserving append order. Never waits: with nothing
    /// committed, `sink` is not called.
    pub fn take_committed<F>(&self, mut sink: F)
    where
        F: FnMut(&[u8]),
    {
        // Detach the chunks before running the sink so the producer's
        // commit is never blocked on consumer I/O.
        let segments: Vec<Bytes> = {
            let mut committed = self.lock_committed();
            committed.drain(..).collect()
        };
        for segment in &segments {
            sink(segment);
        }
    }

    fn lock_producer(&self) -> std::sync::MutexGuard<'_, ProducerState> {
        self.producer.lock().expect("trace queue producer state poisoned")
    }

    fn lock_committed(&self) -> std::sync::MutexGuard<'_, VecDeque<Bytes>> {
        self.committed.lock().expect("trace queue committed state poisoned")
    }
}

impl Default for AsyncByteQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(queue: &AsyncByteQueue) -> Vec<u8> {
        let mut out = Vec::new();
        queue.take_committed(|chunk| out.extend_from_slice(chunk));
        out
    }

    #[test]
    fn test_empty_queue_delivers_nothing() {
        let queue = AsyncByteQueue::new();
        assert!(drain(&queue).is_empty());
    }

    #[test]
    fn test_uncommitted_bytes_are_not_observable() {
        let queue = AsyncByteQueue::new();
        queue.append_copy(b"hello");
        assert!(drain(&queue).is_empty());
        queue.commit();
        assert_eq!(drain(&queue), b"hello");
    }

    #[test]
    fn test_bytes_delivered_in_append_order() {
        let queue = AsyncByteQueue::new();
        queue.append_copy(b"one");
        queue.append_byte(b'-');
        queue.append_copy(b"two");
        queue.commit();
        assert_eq!(drain(&queue), b"one-two");
    }

    #[test]
    fn test_commit_after_each_write_delivers_everything() {
        let queue = AsyncByteQueue::new();
        let mut expected = Vec::new();
        for i in 0..10u8 {
            queue.append_copy(&[i; 3]);
            queue.commit();
            expected.extend_from_slice(&[i; 3]);
        }
        assert_eq!(drain(&queue), expected);
    }

    #[test]
    fn test_append_splits_across_chunk_boundaries() {
        let queue = AsyncByteQueue::with_chunk_size(4);
        let data: Vec<u8> = (0..=255).collect();
        queue.append_copy(&data);
        queue.commit();
        assert_eq!(drain(&queue), data);
    }

    #[test]
    fn test_append_with_writer_reserves_contiguously() {
        let queue = AsyncByteQueue::with_chunk_size(4);
        // Larger than a whole chunk: forces a dedicated oversized chunk.
        queue.append_with_writer(17, |w| {
            w.u64_le(1);
            w.u8(2);
            w.u64_le(3);
        });
        queue.commit();
        let mut expected = Vec::new();
        expected.extend_from_slice(&1u64.to_le_bytes());
        expected.push(2);
        expected.extend_from_slice(&3u64.to_le_bytes());
        assert_eq!(drain(&queue), expected);
    }

    #[test]
    fn test_interleaved_appends_across_chunks() {
        let queue = AsyncByteQueue::with_chunk_size(8);
        let mut expected = Vec::new();
        for i in 0..50u64 {
            queue.append_copy(b"ab");
            expected.extend_from_slice(b"ab");
            queue.append_with_writer(8, |w| w.u64_le(i));
            expected.extend_from_slice(&i.to_le_bytes());
            queue.append_byte(b'.');
            expected.push(b'.');
        }
        queue.commit();
        assert_eq!(drain(&queue), expected);
    }

    #[test]
    fn test_take_committed_drains_incrementally() {
        let queue = AsyncByteQueue::new();
        queue.append_copy(b"first");
        queue.commit();
        assert_eq!(drain(&queue), b"first");

        queue.append_copy(b"second");
        // Appended after the drain, not yet committed.
        assert!(drain(&queue).is_empty());
        queue.commit();
        assert_eq!(drain(&queue), b"second");
    }

    #[test]
    fn test_commit_snapshot_excludes_later_appends() {
        let queue = AsyncByteQueue::new();
        queue.append_copy(b"visible");
        queue.commit();
        queue.append_copy(b"in flight");
        assert_eq!(drain(&queue), b"visible");
    }

    #[test]
    #[should_panic(expected = "unwritten bytes")]
    fn test_short_fill_is_fatal() {
        let queue = AsyncByteQueue::new();
        queue.append_with_writer(9, |w| w.u8(1));
    }
}
