//! Incremental Line Splitting
//!
//! Upstream chunks are cut wherever the transport pleases, including in the
//! middle of a line or of a multi-byte character. `LineSplitter` holds the
//! unterminated tail until its newline arrives. `\n` never occurs inside a
//! multi-byte UTF-8 sequence, so every complete line decodes on its own.

/// A piece of the upstream event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A non-blank line, without its terminator.
    Line(String),
    /// One or more blank lines: the end of an upstream event.
    Boundary,
}

/// Splits a chunked byte stream into lines and event boundaries.
#[derive(Debug)]
pub struct LineSplitter {
    pending: Vec<u8>,
    max_pending: usize,
}

/// The unterminated tail outgrew the configured bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingOverflow(pub usize);

impl LineSplitter {
    pub const fn new(max_pending: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_pending,
        }
    }

    /// Feed one chunk, returning the segments it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Segment>, PendingOverflow> {
        let Some(last_newline) = chunk.iter().rposition(|&b| b == b'\n') else {
            self.pending.extend_from_slice(chunk);
            return self.check_pending().map(|()| Vec::new());
        };

        let (complete, rest) = chunk.split_at(last_newline + 1);
        self.pending.extend_from_slice(complete);
        let block = std::mem::replace(&mut self.pending, rest.to_vec());
        self.check_pending()?;

        // The block ends with '\n', so the final split piece is always empty.
        let terminated = &block[..block.len() - 1];
        let mut segments: Vec<Segment> = Vec::new();
        for raw in terminated.split(|&b| b == b'\n') {
            match decode_line(raw) {
                Some(line) => segments.push(Segment::Line(line)),
                None if segments.last() != Some(&Segment::Boundary) => {
                    segments.push(Segment::Boundary);
                }
                None => {}
            }
        }
        Ok(segments)
    }

    /// Flush the unterminated tail once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        let tail = std::mem::take(&mut self.pending);
        decode_line(&tail)
    }

    fn check_pending(&self) -> Result<(), PendingOverflow> {
        if self.pending.len() > self.max_pending {
            Err(PendingOverflow(self.pending.len()))
        } else {
            Ok(())
        }
    }
}

fn decode_line(raw: &[u8]) -> Option<String> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let line = String::from_utf8_lossy(raw);
    if line.trim().is_empty() {
        None
    } else {
        Some(line.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_all(chunks: &[&[u8]]) -> Vec<Segment> {
        let mut splitter = LineSplitter::new(1024);
        let mut segments = Vec::new();
        for chunk in chunks {
            segments.extend(splitter.push(chunk).unwrap());
        }
        segments.extend(splitter.finish().map(Segment::Line));
        segments
    }

    fn lines_of(segments: &[Segment]) -> Vec<&str> {
        segments
            .iter()
            .filter_map(|s| match s {
                Segment::Line(l) => Some(l.as_str()),
                Segment::Boundary => None,
            })
            .collect()
    }

    fn line(text: &str) -> Segment {
        Segment::Line(text.to_string())
    }

    #[test]
    fn blank_runs_collapse_to_one_boundary() {
        let segments = split_all(&[b"data: a\n\n\n\ndata: b\n\n"]);
        assert_eq!(
            segments,
            vec![line("data: a"), Segment::Boundary, line("data: b"), Segment::Boundary]
        );
    }

    #[test]
    fn line_split_across_chunks_is_rejoined() {
        let segments = split_all(&[b"data: {\"x\":", b"1}\n\ndata: ", b"2\n\n"]);
        assert_eq!(lines_of(&segments), vec!["data: {\"x\":1}", "data: 2"]);
    }

    #[test]
    fn multibyte_split_yields_same_lines_as_single_chunk() {
        let text = "data: {\"content\":\"h\u{e9}llo \u{1f600}\"}\n\ndata: caf\u{e9}\n\n";
        let bytes = text.as_bytes();
        let whole = split_all(&[bytes]);

        for cut in 1..bytes.len() {
            let (a, b) = bytes.split_at(cut);
            let split = split_all(&[a, b]);
            assert_eq!(lines_of(&split), lines_of(&whole), "cut at byte {cut}");
        }
        assert!(lines_of(&whole).iter().all(|l| !l.contains('\u{fffd}')));
    }

    #[test]
    fn crlf_terminators_are_stripped() {
        let segments = split_all(&[b"data: a\r\n\r\ndata: b\r\n"]);
        assert_eq!(
            segments,
            vec![line("data: a"), Segment::Boundary, line("data: b")]
        );
    }

    #[test]
    fn unterminated_tail_is_flushed_on_finish() {
        let mut splitter = LineSplitter::new(1024);
        assert!(splitter.push(b"data: tail").unwrap().is_empty());
        assert_eq!(splitter.finish().as_deref(), Some("data: tail"));
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn oversized_pending_line_overflows() {
        let mut splitter = LineSplitter::new(8);
        assert!(splitter.push(b"data:").is_ok());
        assert_eq!(splitter.push(b" 123456"), Err(PendingOverflow(12)));
    }
}
