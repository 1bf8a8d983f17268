//! Text (ASCII) STL reading and writing.
//!
//! ```text
//! solid name
//!   facet normal ni nj nk
//!     outer loop
//!       vertex v1x v1y v1z
//!       vertex v2x v2y v2z
//!       vertex v3x v3y v3z
//!     endloop
//!   endfacet
//!   ...
//! endsolid name
//! ```
//!
//! The reader is positional rather than keyword driven. The first line is the
//! header; after that every facet is a block of seven lines, and only lines 1,
//! 3, 4 and 5 of a block are inspected. Each of those must contain exactly
//! three decimal numbers. Keywords, indentation and letter case are ignored.
//! Lines end at `\n`, `\r\n` or a lone `\r`.

use std::io::Write;
use std::sync::OnceLock;

use nalgebra::{Point3, Vector3};
use regex::bytes::Regex;

use super::{binary, BlockEnd, BlockOutcome, Ticker};
use crate::error::{MeshError, Result};
use crate::mesh::Facet;

/// Lines per facet block.
pub const BLOCK_LINES: usize = 7;

/// Longest header written by [`write_ascii`].
const MAX_HEADER_LEN: usize = 80;

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[+-]?[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?").expect("number pattern is valid")
    })
}

/// Next line starting at `pos`, without its terminator, and the position
/// after it. The final line may be unterminated.
fn next_line(data: &[u8], pos: usize) -> Option<(&[u8], usize)> {
    if pos >= data.len() {
        return None;
    }
    let rest = &data[pos..];
    match rest.iter().position(|&b| b == b'\n' || b == b'\r') {
        Some(i) => {
            let crlf = rest[i] == b'\r' && rest.get(i + 1) == Some(&b'\n');
            let next = pos + i + if crlf { 2 } else { 1 };
            Some((&rest[..i], next))
        }
        None => Some((rest, data.len())),
    }
}

fn leading_whitespace(data: &[u8]) -> usize {
    data.iter().take_while(|b| b.is_ascii_whitespace()).count()
}

/// Extract exactly three numbers from a line.
fn parse_triple(line: &[u8]) -> Option<[f32; 3]> {
    let mut values = [0.0f32; 3];
    let mut found = 0;
    for m in number_pattern().find_iter(line) {
        if found == 3 {
            return None;
        }
        let text = std::str::from_utf8(m.as_bytes()).ok()?;
        values[found] = text.parse().ok()?;
        found += 1;
    }
    (found == 3).then_some(values)
}

fn parse_facet(lines: &[&[u8]; BLOCK_LINES]) -> Option<Facet> {
    let n = parse_triple(lines[0])?;
    let a = parse_triple(lines[2])?;
    let b = parse_triple(lines[3])?;
    let c = parse_triple(lines[4])?;
    Some(Facet::new(
        Vector3::new(n[0], n[1], n[2]),
        [
            Point3::new(a[0], a[1], a[2]),
            Point3::new(b[0], b[1], b[2]),
            Point3::new(c[0], c[1], c[2]),
        ],
    ))
}

/// Parse the seven-line block starting at `pos`, returning the facet and the
/// position after the block.
fn read_facet_block(data: &[u8], pos: usize) -> Option<(Facet, usize)> {
    let mut lines: [&[u8]; BLOCK_LINES] = [&[]; BLOCK_LINES];
    let mut cursor = pos;
    for slot in lines.iter_mut() {
        let (line, next) = next_line(data, cursor)?;
        *slot = line;
        cursor = next;
    }
    parse_facet(&lines).map(|facet| (facet, cursor))
}

fn is_trailer(line: &[u8]) -> bool {
    let trimmed = &line[leading_whitespace(line)..];
    trimmed.len() >= 8 && trimmed[..8].eq_ignore_ascii_case(b"endsolid")
}

/// Whether `data`, after leading whitespace, reads as a text payload: a
/// terminated header line followed by a valid facet block or an `endsolid`
/// trailer. The header itself may say anything.
pub(crate) fn opens_payload(data: &[u8]) -> bool {
    let start = leading_whitespace(data);
    let body = match next_line(data, start) {
        Some((_, next)) => next,
        None => return false,
    };
    if read_facet_block(data, body).is_some() {
        return true;
    }
    next_line(data, body).is_some_and(|(line, _)| is_trailer(line))
}

/// Decide how much of a rejected block to consume and whether stopping there
/// counts as a clean end.
///
/// - Nothing but whitespace left: clean, everything consumed.
/// - A binary payload starts here: clean, nothing consumed, so the next pass
///   reads it.
/// - Otherwise the block's first line is consumed. It is a clean end when that
///   line is an `endsolid` trailer, malformed data otherwise.
fn stop_at(data: &[u8], block_start: usize) -> (usize, BlockEnd) {
    let lead = block_start + leading_whitespace(&data[block_start..]);
    if lead == data.len() {
        return (data.len(), BlockEnd::Clean);
    }
    if binary::validate(&data[block_start..]).is_some() {
        return (block_start, BlockEnd::Clean);
    }
    match next_line(data, lead) {
        Some((line, next)) => {
            let end = if is_trailer(line) {
                BlockEnd::Clean
            } else {
                BlockEnd::Malformed
            };
            (next, end)
        }
        None => (data.len(), BlockEnd::Clean),
    }
}

/// Read one text payload: a header line followed by seven-line facet blocks.
///
/// Reading stops at the first block that is incomplete or fails number
/// extraction; facets read up to that point are kept.
pub(crate) fn read_block(data: &[u8], ticker: &Ticker<'_>, out: &mut Vec<Facet>) -> BlockOutcome {
    let (header, mut pos) = match next_line(data, 0) {
        Some((line, next)) => (String::from_utf8_lossy(line).trim_end().to_string(), next),
        None => (String::new(), data.len()),
    };

    loop {
        if ticker.cancelled() {
            return BlockOutcome {
                header,
                consumed: pos,
                end: BlockEnd::Cancelled,
            };
        }

        match read_facet_block(data, pos) {
            Some((facet, next)) => {
                out.push(facet);
                pos = next;
                ticker.report(pos, "Reading ASCII STL");
            }
            None => {
                let (consumed, end) = stop_at(data, pos);
                if end == BlockEnd::Malformed {
                    log::warn!("malformed facet block at byte {}", ticker.absolute(pos));
                }
                return BlockOutcome {
                    header,
                    consumed,
                    end,
                };
            }
        }
    }
}

/// Write facets as a text STL payload.
///
/// The header becomes the first line (truncated to 80 bytes) and an
/// `endsolid` trailer closes the payload. Numbers are written in shortest
/// round-trip exponent form, so reading the output back is lossless.
///
/// # Errors
///
/// Fails if the header contains a line break or the writer fails.
pub fn write_ascii<W: Write>(writer: &mut W, header: &str, facets: &[Facet]) -> Result<()> {
    if header.contains(['\n', '\r']) {
        return Err(MeshError::invalid_param(
            "header",
            header.escape_debug(),
            "must be a single line",
        ));
    }
    let mut end = header.len().min(MAX_HEADER_LEN);
    while !header.is_char_boundary(end) {
        end -= 1;
    }
    let header = &header[..end];
    writeln!(writer, "{}", header)?;

    for facet in facets {
        let n = facet.normal;
        writeln!(writer, "  facet normal {:e} {:e} {:e}", n.x, n.y, n.z)?;
        writeln!(writer, "    outer loop")?;
        for v in &facet.vertices {
            writeln!(writer, "      vertex {:e} {:e} {:e}", v.x, v.y, v.z)?;
        }
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }

    let name = header.strip_prefix("solid").unwrap_or(header).trim();
    if name.is_empty() {
        writeln!(writer, "endsolid")?;
    } else {
        writeln!(writer, "endsolid {}", name)?;
    }
    Ok(())
}
