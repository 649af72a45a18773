//! Binary trace stream writer for the qljs LSP server.
//!
//! The linter records structured diagnostic events — process identity, LSP
//! message traffic, in-memory document snapshots, vector-size telemetry —
//! as an append-only binary stream in a Common Trace Format–inspired
//! layout. This crate is the producer side: a [`TraceWriter`] encodes typed
//! events into an [`AsyncByteQueue`], and a [`TraceFlusher`] drains
//! committed bytes to a sink on a background thread. The matching decoder
//! lives in the `qljs-traceparser` crate.
//!
//! All multi-byte integers on the wire are little-endian. A stream is the
//! 29-byte prologue (magic, metadata UUID, thread id, compression byte)
//! followed by event records of the form `[timestamp u64][event id u8]`
//! plus a variant-specific payload.

mod binwriter;
mod bytequeue;
mod flusher;
mod histogram;
mod protocol;

pub use binwriter::BinaryWriter;
pub use bytequeue::{AsyncByteQueue, DEFAULT_CHUNK_SIZE};
pub use flusher::{FlusherConfig, TraceFlusher};
pub use histogram::VectorMaxSizeHistogramByOwner;
pub use protocol::{
    event_id, InitEvent, LspClientToServerMessageEvent, LspDocumentState, LspDocumentType,
    LspDocumentsEvent, ProcessIdEvent, TraceContext, TraceEvent, TraceEventHeader, TraceWriter,
    VectorMaxSizeHistogramByOwnerEvent, VectorMaxSizeHistogramEntry, VectorSizeHistogramBucket,
};
