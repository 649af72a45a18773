// === Error types ===

/// Errors that can occur during trace stream parsing.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Reached end of stream at a clean event boundary (no more events).
    #[error("end of stream")]
    EndOfStream,

    #[error("invalid stream magic")]
    InvalidMagic,

    #[error("truncated stream header")]
    TruncatedHeader,

    #[error("unsupported compression mode: 0x{0:02x}")]
    UnsupportedCompressionMode(u8),

    #[error("unknown event id: 0x{0:02x}")]
    UnknownEventId(u8),

    #[error("unexpected end of event data")]
    UnexpectedEof,
}

// === Stream-level types ===

/// The per-stream metadata carried by the stream prologue.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamHeader {
    pub thread_id: u64,
    /// Always zero; the format reserves the byte.
    pub compression_mode: u8,
}

/// A fully parsed trace stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTrace {
    pub header: StreamHeader,
    pub events: Vec<TraceEvent>,
    /// True if the stream ended mid-event; `events` holds everything up to
    /// the last fully-decodable event.
    pub truncated: bool,
}

// === Event types ===

/// A parsed trace event.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEvent {
    /// Opaque monotonic value assigned by the producer.
    pub timestamp: u64,
    pub event_id: u8,
    pub event: Event,
}

/// The payload of a trace event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Init(Init),
    LspClientToServerMessage(LspClientToServerMessage),
    VectorMaxSizeHistogramByOwner(VectorMaxSizeHistogramByOwner),
    ProcessId(ProcessId),
    LspDocuments(LspDocuments),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Init {
    pub version: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LspClientToServerMessage {
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorMaxSizeHistogramByOwner {
    pub entries: Vec<VectorMaxSizeHistogramEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorMaxSizeHistogramEntry {
    pub owner: String,
    pub buckets: Vec<VectorSizeHistogramBucket>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorSizeHistogramBucket {
    pub max_size: u64,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessId {
    pub process_id: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LspDocuments {
    pub documents: Vec<LspDocument>,
}

/// An in-memory LSP document snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct LspDocument {
    pub document_type: LspDocumentType,
    pub uri: String,
    pub text: String,
    pub language_id: String,
}

/// The kind of document an LSP document snapshot describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LspDocumentType {
    Unknown = 0,
    Config = 1,
    Lintable = 2,
}

impl LspDocumentType {
    /// Parse from the wire format byte value. Unknown bytes decode to
    /// `Unknown` so old parsers tolerate new document kinds.
    pub(crate) fn from_byte(b: u8) -> Self {
        match b {
            1 => Self::Config,
            2 => Self::Lintable,
            _ => Self::Unknown,
        }
    }
}
