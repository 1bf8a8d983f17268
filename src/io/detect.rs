//! Encoding detection and the multi-payload read loop.
//!
//! Reading is driven by a small state machine:
//!
//! ```text
//! DetectFormat ──▶ TryBinary ──▶ (read) ──▶ Advance ──▶ DetectFormat …
//!      │               │
//!      │               └──▶ FallbackToText ──┐
//!      └──────────────────────────────────────┴──▶ TryText ──▶ (read) ──▶ Advance
//! ```
//!
//! `Advance` skips whitespace between payloads and ends the loop once the
//! stream is exhausted, a payload yields no facets, or the parse was
//! cancelled.

use super::{
    ascii, binary, Block, BlockEnd, BlockOutcome, Completion, Encoding, ParseOptions, StlFile,
    Ticker,
};
use crate::error::{MeshError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    DetectFormat,
    TryBinary,
    FallbackToText,
    TryText,
    Advance,
    Finished,
}

/// Accumulates payloads while the state machine runs.
struct Reader<'a> {
    data: &'a [u8],
    options: &'a ParseOptions,
    offset: usize,
    file: StlFile,
}

impl<'a> Reader<'a> {
    fn rest(&self) -> &'a [u8] {
        let data: &'a [u8] = self.data;
        &data[self.offset..]
    }

    fn ticker(&self) -> Ticker<'a> {
        Ticker::new(self.options, self.offset, self.data.len())
    }

    /// Record a finished payload and pick the next state.
    fn finish_block(&mut self, encoding: Encoding, first_facet: usize, outcome: BlockOutcome) -> State {
        let added = self.file.facets.len() - first_facet;
        log::debug!(
            "{} payload at byte {}: {} facets, {} bytes, {:?}",
            encoding,
            self.offset,
            added,
            outcome.consumed,
            outcome.end
        );

        self.offset += outcome.consumed;
        self.file.blocks.push(Block {
            encoding,
            header: outcome.header,
            facets: first_facet..self.file.facets.len(),
        });

        match outcome.end {
            BlockEnd::Cancelled => {
                self.file.completion = Completion::Cancelled;
                return State::Finished;
            }
            BlockEnd::Malformed => self.file.completion = Completion::Truncated,
            BlockEnd::Clean => {}
        }

        if added == 0 {
            if self.offset < self.data.len() && self.file.completion == Completion::Complete {
                log::warn!(
                    "ignoring {} trailing bytes after empty payload",
                    self.data.len() - self.offset
                );
                self.file.completion = Completion::Truncated;
            }
            State::Finished
        } else {
            State::Advance
        }
    }
}

/// Parse every payload in `data`.
pub(crate) fn parse_stream(data: &[u8], options: &ParseOptions) -> Result<StlFile> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Err(MeshError::TruncatedHeader { len: data.len() });
    }

    let mut reader = Reader {
        data,
        options,
        offset: 0,
        file: StlFile::default(),
    };

    let mut state = State::DetectFormat;
    while state != State::Finished {
        state = match state {
            State::DetectFormat => {
                if reader.rest().len() < binary::MIN_BINARY_SIZE {
                    log::trace!("{} bytes left, below binary minimum", reader.rest().len());
                    State::TryText
                } else {
                    State::TryBinary
                }
            }

            State::TryBinary => match binary::validate(reader.rest()) {
                Some(count) => {
                    let first = reader.file.facets.len();
                    let rest = reader.rest();
                    let ticker = reader.ticker();
                    let outcome = binary::read_block(rest, count, &ticker, &mut reader.file.facets);
                    reader.finish_block(Encoding::Binary, first, outcome)
                }
                None => State::FallbackToText,
            },

            State::FallbackToText => {
                log::trace!("binary layout mismatch at byte {}, reading as text", reader.offset);
                State::TryText
            }

            State::TryText => {
                let rest = reader.rest();
                let first = reader.file.facets.len();
                let ticker = reader.ticker();
                let outcome = ascii::read_block(rest, &ticker, &mut reader.file.facets);
                reader.finish_block(Encoding::Ascii, first, outcome)
            }

            State::Advance => {
                let rest = reader.rest();
                // A binary payload follows directly; its header may legitimately
                // start with whitespace.
                if binary::validate(rest).is_none() {
                    reader.offset += rest.iter().take_while(|b| b.is_ascii_whitespace()).count();
                }
                if reader.offset >= data.len() {
                    State::Finished
                } else {
                    State::DetectFormat
                }
            }

            State::Finished => State::Finished,
        };
    }

    if reader.file.completion != Completion::Cancelled {
        options.progress.report(reader.offset, data.len(), "Finished reading STL");
    }

    Ok(reader.file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{write_ascii, write_binary};
    use crate::mesh::Facet;
    use crate::progress::{CancelToken, Progress};
    use nalgebra::Point3;
    use std::sync::{Arc, Mutex};

    fn facets(n: usize, offset: f32) -> Vec<Facet> {
        (0..n)
            .map(|i| {
                let x = i as f32 + offset;
                Facet::from_corners(
                    Point3::new(x, 0.0, 0.0),
                    Point3::new(x + 1.0, 0.0, 0.0),
                    Point3::new(x, 1.0, 0.0),
                )
            })
            .collect()
    }

    fn binary(header: &str, f: &[Facet]) -> Vec<u8> {
        let mut buf = Vec::new();
        write_binary(&mut buf, header, f).unwrap();
        buf
    }

    fn ascii(header: &str, f: &[Facet]) -> Vec<u8> {
        let mut buf = Vec::new();
        write_ascii(&mut buf, header, f).unwrap();
        buf
    }

    fn parse(data: &[u8]) -> StlFile {
        parse_stream(data, &ParseOptions::default()).unwrap()
    }

    #[test]
    fn test_empty_stream_is_error() {
        let err = parse_stream(b"", &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, MeshError::TruncatedHeader { len: 0 }));
    }

    #[test]
    fn test_whitespace_stream_is_error() {
        let err = parse_stream(b" \r\n\t", &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, MeshError::TruncatedHeader { len: 4 }));
    }

    #[test]
    fn test_unterminated_header_is_empty_solid() {
        let stl = parse(b"solid empty");
        assert!(stl.facets.is_empty());
        assert_eq!(stl.header(), "solid empty");
        assert_eq!(stl.encoding(), Some(Encoding::Ascii));
        assert_eq!(stl.completion, Completion::Complete);

        let long = format!("solid {}", "x".repeat(200));
        let stl = parse(long.as_bytes());
        assert!(stl.facets.is_empty());
        assert_eq!(stl.header(), long);
    }

    #[test]
    fn test_cr_only_text() {
        let f = facets(2, 0.0);
        let text = ascii("solid mac", &f);
        let cr: Vec<u8> = text.iter().map(|&b| if b == b'\n' { b'\r' } else { b }).collect();

        let stl = parse(&cr);
        assert_eq!(stl.facets, f);
        assert!(stl.is_complete());
    }

    #[test]
    fn test_binary_single_payload() {
        let f = facets(3, 0.0);
        let stl = parse(&binary("solid bin", &f));
        assert_eq!(stl.facets, f);
        assert_eq!(stl.encoding(), Some(Encoding::Binary));
        assert_eq!(stl.header(), "solid bin");
        assert_eq!(stl.completion, Completion::Complete);
    }

    #[test]
    fn test_binary_length_mismatch_falls_back_to_text() {
        let mut data = binary("solid bin", &facets(3, 0.0));
        data.extend_from_slice(b"\nxyz");
        let stl = parse(&data);
        assert_eq!(stl.encoding(), Some(Encoding::Ascii));
        assert!(stl.facets.is_empty());
        assert_eq!(stl.completion, Completion::Truncated);
    }

    #[test]
    fn test_short_stream_always_text() {
        let data = binary("solid bin\n", &facets(1, 0.0));
        assert_eq!(data.len(), 134);
        assert_eq!(parse(&data).encoding(), Some(Encoding::Binary));

        // One byte less can never be binary, whatever the count field says.
        let mut short = data[..133].to_vec();
        short[80..84].copy_from_slice(&0u32.to_le_bytes());
        let stl = parse(&short);
        assert_eq!(stl.encoding(), Some(Encoding::Ascii));
        assert_eq!(stl.header(), "solid bin");
        assert!(stl.facets.is_empty());
    }

    #[test]
    fn test_concatenated_binary() {
        let a = facets(2, 0.0);
        let b = facets(3, 10.0);
        let mut data = binary("first", &a);
        data.extend(binary("second", &b));

        let stl = parse(&data);
        assert_eq!(stl.facets, [a, b].concat());
        assert_eq!(stl.blocks.len(), 2);
        assert_eq!(stl.blocks[1].header, "second");
        assert_eq!(stl.blocks[1].facets, 2..5);
        assert!(stl.is_complete());
    }

    #[test]
    fn test_concatenated_binary_with_leading_space_header() {
        let a = facets(1, 0.0);
        let b = facets(1, 5.0);
        let mut data = binary("first", &a);
        data.extend(binary("   second", &b));

        let stl = parse(&data);
        assert_eq!(stl.num_facets(), 2);
        assert_eq!(stl.blocks[1].header, "   second");
    }

    #[test]
    fn test_concatenated_text() {
        let a = facets(2, 0.0);
        let b = facets(1, 7.0);
        let mut data = ascii("solid a", &a);
        data.extend_from_slice(b"\n\n");
        data.extend(ascii("solid b", &b));

        let stl = parse(&data);
        assert_eq!(stl.facets, [a, b].concat());
        assert_eq!(stl.blocks.len(), 2);
        assert_eq!(stl.blocks[1].header, "solid b");
        assert!(stl.is_complete());
    }

    #[test]
    fn test_text_then_binary() {
        let a = facets(1, 0.0);
        let b = facets(2, 3.0);
        let mut data = ascii("solid a", &a);
        data.extend(binary("solid b", &b));

        let stl = parse(&data);
        assert_eq!(stl.facets, [a, b].concat());
        assert_eq!(stl.blocks[0].encoding, Encoding::Ascii);
        assert_eq!(stl.blocks[1].encoding, Encoding::Binary);
    }

    #[test]
    fn test_binary_then_text_with_free_header() {
        let a = facets(2, 0.0);
        let b = facets(1, 5.0);
        let mut data = binary("bin", &a);
        data.extend(ascii("exported mesh", &b));

        let stl = parse(&data);
        assert_eq!(stl.facets, [a, b].concat());
        assert_eq!(stl.blocks.len(), 2);
        assert_eq!(stl.blocks[0].encoding, Encoding::Binary);
        assert_eq!(stl.blocks[1].encoding, Encoding::Ascii);
        assert_eq!(stl.blocks[1].header, "exported mesh");
        assert!(stl.is_complete());
    }

    #[test]
    fn test_trailing_garbage_marks_truncated() {
        let a = facets(2, 0.0);
        let mut data = ascii("solid a", &a);
        data.extend_from_slice(b"garbage line\nmore garbage\n");

        let stl = parse(&data);
        assert_eq!(stl.facets, a);
        assert_eq!(stl.completion, Completion::Truncated);
    }

    #[test]
    fn test_cancel_before_start() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let options = ParseOptions::default().with_cancel(cancel);

        let stl = parse_stream(&binary("b", &facets(4, 0.0)), &options).unwrap();
        assert!(stl.facets.is_empty());
        assert_eq!(stl.completion, Completion::Cancelled);

        let stl = parse_stream(&ascii("solid a", &facets(4, 0.0)), &options).unwrap();
        assert!(stl.facets.is_empty());
        assert_eq!(stl.completion, Completion::Cancelled);
    }

    #[test]
    fn test_cancel_mid_stream() {
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let progress = Progress::new(move |current, _total, _msg| {
            if current >= 84 + 2 * 50 {
                trigger.cancel();
            }
        });
        let options = ParseOptions::default()
            .with_progress(progress)
            .with_cancel(cancel);

        let stl = parse_stream(&binary("b", &facets(10, 0.0)), &options).unwrap();
        assert_eq!(stl.num_facets(), 2);
        assert_eq!(stl.completion, Completion::Cancelled);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let options = ParseOptions::default().with_progress(Progress::new(move |c, t, _| {
            sink.lock().unwrap().push((c, t));
        }));

        let mut data = binary("a", &facets(3, 0.0));
        data.extend(ascii("solid b", &facets(3, 0.0)));
        parse_stream(&data, &options).unwrap();

        let seen = seen.lock().unwrap();
        assert!(seen.len() >= 6);
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
        assert_eq!(*seen.last().unwrap(), (data.len(), data.len()));
    }
}
