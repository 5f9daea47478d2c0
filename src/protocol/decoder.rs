//! Incremental decoder for the `data: `-marked event stream.
//!
//! Network reads hand us arbitrary byte chunks: a chunk can end mid-line or
//! even mid-way through a multi-byte UTF-8 sequence. The decoder buffers
//! bytes across chunks, splits on line boundaries, and yields the payload of
//! every line carrying the frame marker. Everything else on the stream
//! (blank separator lines, comments, unknown fields) is discarded without
//! error.

/// Marker prefix for frame-bearing lines.
const DATA_PREFIX: &str = "data: ";

/// Splits a chunked byte stream into raw frame payload strings.
///
/// Feed chunks as they arrive with [`feed`](Self::feed); call
/// [`flush`](Self::flush) once when the stream closes so a final
/// unterminated line is not lost.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk and return the payloads of all frame lines it
    /// completed, in arrival order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            // Drop the newline and an optional preceding carriage return.
            let line = &line[..pos];
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if let Some(payload) = Self::extract_payload(line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush a trailing line that was never newline-terminated.
    ///
    /// Returns its payload if the pending bytes form a frame line.
    pub fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let pending = std::mem::take(&mut self.buffer);
        let line = pending.strip_suffix(b"\r").unwrap_or(&pending);
        Self::extract_payload(line)
    }

    /// Number of bytes waiting for a line terminator.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    fn extract_payload(line: &[u8]) -> Option<String> {
        let text = match std::str::from_utf8(line) {
            Ok(text) => text,
            Err(err) => {
                // A corrupt line is skipped like any malformed frame.
                log::warn!("skipping non-UTF-8 stream line: {}", err);
                return None;
            }
        };
        let payload = text.strip_prefix(DATA_PREFIX)?;
        Some(payload.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_str(decoder: &mut FrameDecoder, chunk: &str) -> Vec<String> {
        decoder.feed(chunk.as_bytes())
    }

    #[test]
    fn yields_payloads_for_marked_lines() {
        let mut decoder = FrameDecoder::new();
        let payloads = feed_str(&mut decoder, "data: FILE_OPEN a.ts\ndata: COMPLETE\n");
        assert_eq!(payloads, vec!["FILE_OPEN a.ts", "COMPLETE"]);
    }

    #[test]
    fn carries_partial_lines_across_chunks() {
        let mut decoder = FrameDecoder::new();
        assert!(feed_str(&mut decoder, "data: APP").is_empty());
        assert!(feed_str(&mut decoder, "END const x").is_empty());
        let payloads = feed_str(&mut decoder, " = 1;\n");
        assert_eq!(payloads, vec!["APPEND const x = 1;"]);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn marker_itself_can_split_across_chunks() {
        let mut decoder = FrameDecoder::new();
        assert!(feed_str(&mut decoder, "dat").is_empty());
        let payloads = feed_str(&mut decoder, "a: COMPLETE\n");
        assert_eq!(payloads, vec!["COMPLETE"]);
    }

    #[test]
    fn discards_blank_and_unmarked_lines() {
        let mut decoder = FrameDecoder::new();
        let payloads = feed_str(
            &mut decoder,
            "\nevent: progress\n: keep-alive\ndata: COMPLETE\n\n",
        );
        assert_eq!(payloads, vec!["COMPLETE"]);
    }

    #[test]
    fn handles_crlf_terminators() {
        let mut decoder = FrameDecoder::new();
        let payloads = feed_str(&mut decoder, "data: FILE_OPEN a.ts\r\ndata: COMPLETE\r\n");
        assert_eq!(payloads, vec!["FILE_OPEN a.ts", "COMPLETE"]);
    }

    #[test]
    fn reassembles_utf8_split_mid_sequence() {
        let mut decoder = FrameDecoder::new();
        let line = "data: APPEND // héllo\n".as_bytes();
        // Split inside the two-byte 'é' sequence.
        let split = line.iter().position(|&b| b == 0xc3).unwrap() + 1;
        assert!(decoder.feed(&line[..split]).is_empty());
        let payloads = decoder.feed(&line[split..]);
        assert_eq!(payloads, vec!["APPEND // héllo"]);
    }

    #[test]
    fn flush_recovers_unterminated_final_line() {
        let mut decoder = FrameDecoder::new();
        assert!(feed_str(&mut decoder, "data: COMPLETE").is_empty());
        assert_eq!(decoder.flush(), Some("COMPLETE".to_string()));
        assert_eq!(decoder.flush(), None);
    }

    #[test]
    fn flush_discards_unmarked_tail() {
        let mut decoder = FrameDecoder::new();
        assert!(feed_str(&mut decoder, "event: done").is_empty());
        assert_eq!(decoder.flush(), None);
    }

    #[test]
    fn preserves_frame_order_within_a_chunk() {
        let mut decoder = FrameDecoder::new();
        let payloads = feed_str(
            &mut decoder,
            "data: FILE_OPEN a.ts\ndata: APPEND 1\ndata: APPEND 2\ndata: FILE_CLOSE a.ts\n",
        );
        assert_eq!(
            payloads,
            vec!["FILE_OPEN a.ts", "APPEND 1", "APPEND 2", "FILE_CLOSE a.ts"]
        );
    }

    #[test]
    fn payload_spaces_survive_extraction() {
        let mut decoder = FrameDecoder::new();
        let payloads = feed_str(&mut decoder, "data: APPEND   three  spaces\n");
        assert_eq!(payloads, vec!["APPEND   three  spaces"]);
    }
}
