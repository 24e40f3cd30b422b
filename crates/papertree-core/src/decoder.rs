//! Incremental decoder for the research-tree event stream.
//!
//! The stream is a sequence of blank-line-terminated records in the
//! server-sent-events layout; each record's `data:` lines carry one JSON
//! payload. Bytes are buffered until a full line is available and payloads are
//! only UTF-8 decoded once their record is complete, so the decoded sequence
//! does not depend on where the transport split the chunks.

use thiserror::Error;

use crate::event::StreamEvent;

/// Longest slice of a bad payload kept for diagnostics.
const PREVIEW_CHARS: usize = 120;

/// A record that could not be turned into a [`StreamEvent`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("record {record}: {reason}")]
pub struct DecodeError {
    /// 1-based ordinal of the record within the stream.
    pub record: usize,
    pub reason: String,
    pub preview: String,
}

/// Outcome of decoding one record.
pub type Decoded = Result<StreamEvent, DecodeError>;

/// Buffers raw chunks and yields decoded records in arrival order.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    /// Bytes after the last complete line.
    partial_line: Vec<u8>,
    /// Prefix of `partial_line` already searched for a newline.
    scanned: usize,
    /// `data:` payload lines of the record currently being assembled.
    data_lines: Vec<Vec<u8>>,
    /// Whether the current record has seen any non-blank line.
    in_record: bool,
    records: usize,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every record it completed.
    pub fn push(&mut self, chunk: impl AsRef<[u8]>) -> Vec<Decoded> {
        self.partial_line.extend_from_slice(chunk.as_ref());

        let mut out = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.partial_line[from..].iter().position(|&b| b == b'\n') {
            let end = from + offset;
            let mut line = &self.partial_line[start..end];
            if let [rest @ .., b'\r'] = line {
                line = rest;
            }
            if let Some(decoded) = Self::feed_line(
                line,
                &mut self.data_lines,
                &mut self.in_record,
                &mut self.records,
            ) {
                out.push(decoded);
            }
            start = end + 1;
            from = start;
        }
        self.partial_line.drain(..start);
        self.scanned = self.partial_line.len();
        out
    }

    /// Signal end-of-data. A final record that never got its blank line is
    /// decoded as if it had.
    pub fn finish(&mut self) -> Option<Decoded> {
        let tail = std::mem::take(&mut self.partial_line);
        self.scanned = 0;
        let mut line = tail.as_slice();
        if let [rest @ .., b'\r'] = line {
            line = rest;
        }
        if !line.is_empty() {
            // A non-empty line never completes a record by itself.
            let _ = Self::feed_line(
                line,
                &mut self.data_lines,
                &mut self.in_record,
                &mut self.records,
            );
        }
        Self::feed_line(
            &[],
            &mut self.data_lines,
            &mut self.in_record,
            &mut self.records,
        )
    }

    /// Number of records seen so far, including malformed and data-less ones.
    pub fn records_seen(&self) -> usize {
        self.records
    }

    /// Bytes buffered but not yet part of a complete line.
    pub fn pending_bytes(&self) -> usize {
        self.partial_line.len()
    }

    fn feed_line(
        line: &[u8],
        data_lines: &mut Vec<Vec<u8>>,
        in_record: &mut bool,
        records: &mut usize,
    ) -> Option<Decoded> {
        if line.is_empty() {
            if !*in_record {
                return None;
            }
            *in_record = false;
            *records += 1;
            let lines = std::mem::take(data_lines);
            if lines.is_empty() {
                return None;
            }
            return Some(decode_payload(*records, &lines.join(&b'\n')));
        }

        *in_record = true;
        if line.starts_with(b":") {
            return None;
        }
        if let Some(value) = line.strip_prefix(b"data:") {
            let value = value.strip_prefix(b" ").unwrap_or(value);
            data_lines.push(value.to_vec());
        }
        // event:, id:, retry: and unknown fields carry nothing we use.
        None
    }
}

fn decode_payload(record: usize, payload: &[u8]) -> Decoded {
    serde_json::from_slice::<StreamEvent>(payload).map_err(|e| {
        let text = String::from_utf8_lossy(payload);
        let preview: String = text.chars().take(PREVIEW_CHARS).collect();
        log::warn!("skipping malformed record {record}: {e} ({preview})");
        DecodeError {
            record,
            reason: e.to_string(),
            preview,
        }
    })
}
