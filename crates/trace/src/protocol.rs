//! Implements the trace stream format.

use bytes::Bytes;

use crate::bytequeue::AsyncByteQueue;

/// Event ids the linter assigns to each variant.
///
/// Ids are assigned monotonically as variants are added and are never
/// reused. 0x02 through 0x05 belong to editor-integration document events
/// handled elsewhere; the gap is intentional.
pub mod event_id {
    pub const INIT: u8 = 0x01;
    pub const LSP_CLIENT_TO_SERVER_MESSAGE: u8 = 0x06;
    pub const VECTOR_MAX_SIZE_HISTOGRAM_BY_OWNER: u8 = 0x07;
    pub const PROCESS_ID: u8 = 0x08;
    pub const LSP_DOCUMENTS: u8 = 0x09;
}

/// CTF magic plus the quick-lint-js metadata UUID. Emitted verbatim at the
/// start of every stream, before the per-stream context.
const STREAM_HEADER: [u8; 20] = [
    // CTF magic.
    0xc1, 0x1f, 0xfc, 0xc1,
    // quick-lint-js metadata UUID.
    0x71, 0x75, 0x69, 0x63, 0x6b, 0x2d, 0x5f, 0x49, //
    0x3e, 0xb9, 0x6c, 0x69, 0x6e, 0x74, 0x6a, 0x73,
];

/// Per-stream metadata, supplied once at stream start.
#[derive(Debug, Clone, Copy)]
pub struct TraceContext {
    pub thread_id: u64,
}

/// The prefix shared by every event record.
#[derive(Debug, Clone, Copy)]
pub struct TraceEventHeader {
    /// Opaque monotonic value supplied by the caller.
    pub timestamp: u64,
}

/// The kind of document an LSP document snapshot describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LspDocumentType {
    Unknown = 0,
    Config = 1,
    Lintable = 2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitEvent {
    pub id: u8,
    /// Must not contain a nul byte.
    pub version: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LspClientToServerMessageEvent {
    pub id: u8,
    pub body: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorMaxSizeHistogramByOwnerEvent {
    pub id: u8,
    pub entries: Vec<VectorMaxSizeHistogramEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorMaxSizeHistogramEntry {
    /// Must not contain a nul byte.
    pub owner: String,
    pub buckets: Vec<VectorSizeHistogramBucket>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorSizeHistogramBucket {
    pub max_size: u64,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessIdEvent {
    pub id: u8,
    pub process_id: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LspDocumentsEvent {
    pub id: u8,
    pub documents: Vec<LspDocumentState>,
}

/// An in-memory LSP document snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct LspDocumentState {
    pub document_type: LspDocumentType,
    pub uri: String,
    pub text: String,
    pub language_id: String,
}

/// A trace event of any variant.
///
/// The writer has a single dispatch site over this type, so the id a
/// variant carries and the payload written for it cannot drift apart.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    Init(InitEvent),
    LspClientToServerMessage(LspClientToServerMessageEvent),
    VectorMaxSizeHistogramByOwner(VectorMaxSizeHistogramByOwnerEvent),
    ProcessId(ProcessIdEvent),
    LspDocuments(LspDocumentsEvent),
}

/// Encodes trace events into an [`AsyncByteQueue`].
///
/// The writer borrows the queue for the duration of each call and holds no
/// other state; higher layers may share one queue between writers as long
/// as they serialize access. No operation blocks and none can fail:
/// caller-supplied data that breaks a documented contract (an embedded nul
/// in a nul-terminated string, a payload too large for a u64 length) is a
/// bug in the caller and asserts.
///
/// Every record is partitioned into scalar spans, emitted through a single
/// exact-size [`append_with_writer`] reservation per contiguous run, and
/// opaque byte spans, emitted through [`append_copy`]. This keeps
/// reservation sizes small and predictable and keeps the queue unaware of
/// record structure.
///
/// [`append_with_writer`]: AsyncByteQueue::append_with_writer
/// [`append_copy`]: AsyncByteQueue::append_copy
pub struct TraceWriter<'a> {
    out: &'a AsyncByteQueue,
}

impl<'a> TraceWriter<'a> {
    pub fn new(out: &'a AsyncByteQueue) -> Self {
        TraceWriter { out }
    }

    /// Publishes everything written so far to the queue's consumer.
    pub fn commit(&self) {
        self.out.commit();
    }

    /// Emits the stream prologue: magic, metadata UUID, thread id, and the
    /// compression mode byte (always zero; the format reserves it).
    ///
    /// Must be the first write on a queue.
    pub fn write_header(&self, context: &TraceContext) {
        self.out.append_copy(&STREAM_HEADER);
        self.out.append_with_writer(8 + 1, |w| {
            w.u64_le(context.thread_id);
            w.u8(0x00); // Compression mode.
        });
    }

    /// Emits one event record: `[timestamp][id][payload]`.
    ///
    /// The id carried by the event is emitted verbatim.
    pub fn write_event(&self, header: &TraceEventHeader, event: &TraceEvent) {
        match event {
            TraceEvent::Init(e) => self.write_event_init(header, e),
            TraceEvent::LspClientToServerMessage(e) => {
                self.write_event_lsp_client_to_server_message(header, e)
            }
            TraceEvent::VectorMaxSizeHistogramByOwner(e) => {
                self.write_event_vector_max_size_histogram_by_owner(header, e)
            }
            TraceEvent::ProcessId(e) => self.write_event_process_id(header, e),
            TraceEvent::LspDocuments(e) => self.write_event_lsp_documents(header, e),
        }
    }

    pub fn write_event_init(&self, header: &TraceEventHeader, event: &InitEvent) {
        self.out.append_with_writer(8 + 1, |w| {
            w.u64_le(header.timestamp);
            w.u8(event.id);
        });
        self.write_nul_terminated_string(&event.version);
    }

    pub fn write_event_lsp_client_to_server_message(
        &self,
        header: &TraceEventHeader,
        event: &LspClientToServerMessageEvent,
    ) {
        self.out.append_with_writer(8 + 1 + 8, |w| {
            w.u64_le(header.timestamp);
            w.u8(event.id);
            w.u64_le(narrow_to_u64(event.body.len()));
        });
        self.out.append_copy(&event.body);
    }

    pub fn write_event_vector_max_size_histogram_by_owner(
        &self,
        header: &TraceEventHeader,
        event: &VectorMaxSizeHistogramByOwnerEvent,
    ) {
        self.out.append_with_writer(8 + 1 + 8, |w| {
            w.u64_le(header.timestamp);
            w.u8(event.id);
            w.u64_le(narrow_to_u64(event.entries.len()));
        });
        for entry in &event.entries {
            self.write_nul_terminated_string(&entry.owner);
            self.out
                .append_with_writer(8 + (8 + 8) * entry.buckets.len(), |w| {
                    w.u64_le(narrow_to_u64(entry.buckets.len()));
                    for bucket in &entry.buckets {
                        w.u64_le(bucket.max_size);
                        w.u64_le(bucket.count);
                    }
                });
        }
    }

    pub fn write_event_process_id(&self, header: &TraceEventHeader, event: &ProcessIdEvent) {
        self.out.append_with_writer(8 + 1 + 8, |w| {
            w.u64_le(header.timestamp);
            w.u8(event.id);
            w.u64_le(event.process_id);
        });
    }

    pub fn write_event_lsp_documents(&self, header: &TraceEventHeader, event: &LspDocumentsEvent) {
        self.out.append_with_writer(8 + 1 + 8, |w| {
            w.u64_le(header.timestamp);
            w.u8(event.id);
            w.u64_le(narrow_to_u64(event.documents.len()));
        });
        for doc in &event.documents {
            self.out
                .append_with_writer(1, |w| w.u8(doc.document_type as u8));
            self.write_utf8_string(&doc.uri);
            self.write_utf8_string(&doc.text);
            self.write_utf8_string(&doc.language_id);
        }
    }

    /// Length-prefixed string: u64 LE size, then the bytes. No terminator;
    /// embedded nuls are permitted.
    fn write_utf8_string(&self, s: &str) {
        self.out
            .append_with_writer(8, |w| w.u64_le(narrow_to_u64(s.len())));
        self.out.append_copy(s.as_bytes());
    }

    /// Nul-terminated string: the bytes, then one 0x00.
    fn write_nul_terminated_string(&self, s: &str) {
        assert!(
            !s.as_bytes().contains(&0),
            "nul-terminated trace string contains an embedded nul"
        );
        self.out.append_copy(s.as_bytes());
        self.out.append_byte(0x00);
    }
}

/// Payloads larger than 2^64 - 1 bytes are outside the format's domain.
#[inline]
fn narrow_to_u64(len: usize) -> u64 {
    u64::try_from(len).expect("container length exceeds u64")
}
