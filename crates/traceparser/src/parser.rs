use crate::reader::EventReader;
use crate::types::*;

// Event id constants (wire format byte values). 0x02-0x05 belong to
// editor-integration document events the linter no longer emits; the gap
// is preserved so ids are never reused.
const INIT: u8 = 0x01;
const LSP_CLIENT_TO_SERVER_MESSAGE: u8 = 0x06;
const VECTOR_MAX_SIZE_HISTOGRAM_BY_OWNER: u8 = 0x07;
const PROCESS_ID: u8 = 0x08;
const LSP_DOCUMENTS: u8 = 0x09;

// CTF magic.
const STREAM_MAGIC: [u8; 4] = [0xc1, 0x1f, 0xfc, 0xc1];

// quick-lint-js metadata UUID.
const METADATA_UUID: [u8; 16] = [
    0x71, 0x75, 0x69, 0x63, 0x6b, 0x2d, 0x5f, 0x49, //
    0x3e, 0xb9, 0x6c, 0x69, 0x6e, 0x74, 0x6a, 0x73,
];

/// Parse a complete trace stream: the 29-byte prologue followed by event
/// records until the data runs out.
///
/// Event records carry no length prefix, so an undecodable event ends the
/// stream: everything up to the last fully-decodable event is returned and
/// [`ParsedTrace::truncated`] is set. A malformed prologue is an error.
pub fn parse_stream(data: &[u8]) -> Result<ParsedTrace, ParseError> {
    let mut r = EventReader::new(data);
    let header = parse_stream_header(&mut r)?;

    let mut events = Vec::new();
    let mut truncated = false;
    loop {
        match parse_event(&mut r) {
            Ok(event) => events.push(event),
            Err(ParseError::EndOfStream) => break,
            Err(_) => {
                truncated = true;
                break;
            }
        }
    }

    Ok(ParsedTrace {
        header,
        events,
        truncated,
    })
}

fn parse_stream_header(r: &mut EventReader) -> Result<StreamHeader, ParseError> {
    if r.remaining() < STREAM_MAGIC.len() + METADATA_UUID.len() + 8 + 1 {
        return Err(ParseError::TruncatedHeader);
    }
    if !r.expect_bytes(&STREAM_MAGIC) || !r.expect_bytes(&METADATA_UUID) {
        return Err(ParseError::InvalidMagic);
    }

    let thread_id = r.u64_le();
    let compression_mode = r.byte();
    if compression_mode != 0 {
        return Err(ParseError::UnsupportedCompressionMode(compression_mode));
    }

    Ok(StreamHeader {
        thread_id,
        compression_mode,
    })
}

/// Parse a single event record from the reader.
///
/// Returns `ParseError::EndOfStream` if the reader sits at a clean event
/// boundary with no more data.
fn parse_event(r: &mut EventReader) -> Result<TraceEvent, ParseError> {
    if r.at_end() {
        return Err(ParseError::EndOfStream);
    }

    let timestamp = r.u64_le();
    let event_id = r.byte();
    if r.has_error() {
        return Err(ParseError::UnexpectedEof);
    }

    let event = match event_id {
        INIT => Event::Init(r.init()),
        LSP_CLIENT_TO_SERVER_MESSAGE => {
            Event::LspClientToServerMessage(r.lsp_client_to_server_message())
        }
        VECTOR_MAX_SIZE_HISTOGRAM_BY_OWNER => {
            Event::VectorMaxSizeHistogramByOwner(r.vector_max_size_histogram_by_owner())
        }
        PROCESS_ID => Event::ProcessId(r.process_id()),
        LSP_DOCUMENTS => Event::LspDocuments(r.lsp_documents()),
        other => return Err(ParseError::UnknownEventId(other)),
    };

    if r.has_error() {
        return Err(ParseError::UnexpectedEof);
    }

    Ok(TraceEvent {
        timestamp,
        event_id,
        event,
    })
}

// === Event-specific parsing methods on EventReader ===

impl EventReader<'_> {
    fn init(&mut self) -> Init {
        Init {
            version: self.nul_terminated_string(),
        }
    }

    fn lsp_client_to_server_message(&mut self) -> LspClientToServerMessage {
        let size = self.length();
        LspClientToServerMessage {
            body: self.bytes(size),
        }
    }

    fn vector_max_size_histogram_by_owner(&mut self) -> VectorMaxSizeHistogramByOwner {
        let entry_count = self.u64_le();
        let mut entries = Vec::new();
        for _ in 0..entry_count {
            if self.has_error() {
                break;
            }
            let owner = self.nul_terminated_string();
            let bucket_count = self.u64_le();
            let mut buckets = Vec::new();
            for _ in 0..bucket_count {
                if self.has_error() {
                    break;
                }
                let max_size = self.u64_le();
                let count = self.u64_le();
                buckets.push(VectorSizeHistogramBucket { max_size, count });
            }
            entries.push(VectorMaxSizeHistogramEntry { owner, buckets });
        }
        VectorMaxSizeHistogramByOwner { entries }
    }

    fn process_id(&mut self) -> ProcessId {
        ProcessId {
            process_id: self.u64_le(),
        }
    }

    fn lsp_documents(&mut self) -> LspDocuments {
        let document_count = self.u64_le();
        let mut documents = Vec::new();
        for _ in 0..document_count {
            if self.has_error() {
                break;
            }
            documents.push(LspDocument {
                document_type: LspDocumentType::from_byte(self.byte()),
                uri: self.utf8_string(),
                text: self.utf8_string(),
                language_id: self.utf8_string(),
            });
        }
        LspDocuments { documents }
    }
}
