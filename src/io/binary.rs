//! Binary STL reading and writing.
//!
//! ```text
//! UINT8[80]    – Header (free-form, not NUL-terminated)
//! UINT32       – Number of facets N (little-endian)
//! foreach facet
//!     REAL32[3] – Normal
//!     REAL32[3] – Vertex 1
//!     REAL32[3] – Vertex 2
//!     REAL32[3] – Vertex 3
//!     UINT16    – Attribute byte count (ignored)
//! end
//! ```

use std::io::Write;

use nalgebra::{Point3, Vector3};

use super::{ascii, BlockEnd, BlockOutcome, Ticker};
use crate::error::{MeshError, Result};
use crate::mesh::Facet;

/// Size of the free-form header.
pub const HEADER_SIZE: usize = 80;

/// Size of the facet count field.
pub const COUNT_SIZE: usize = 4;

/// Size of one facet record.
pub const FACET_SIZE: usize = 50;

/// Streams shorter than this are never treated as binary.
pub const MIN_BINARY_SIZE: usize = HEADER_SIZE + COUNT_SIZE + FACET_SIZE;

fn declared_count(data: &[u8]) -> Option<u32> {
    let field = data.get(HEADER_SIZE..HEADER_SIZE + COUNT_SIZE)?;
    Some(u32::from_le_bytes([field[0], field[1], field[2], field[3]]))
}

/// Check the binary hypothesis for the bytes starting at `data`.
///
/// A payload is accepted when its declared facet records fit and the bytes
/// after them are exhausted, read as a text payload (any header line followed
/// by a facet block or trailer), or form another accepted binary payload. For a lone payload this is the exact `remaining == N * 50`
/// rule; the other two cases let concatenated streams validate as a whole.
/// Returns the facet count of the first payload.
pub(crate) fn validate(data: &[u8]) -> Option<u32> {
    let mut rest = data;
    let mut first = None;
    loop {
        if rest.len() < MIN_BINARY_SIZE {
            return None;
        }
        let count = declared_count(rest)?;
        let end = (HEADER_SIZE + COUNT_SIZE) as u64 + u64::from(count) * FACET_SIZE as u64;
        if end > rest.len() as u64 {
            return None;
        }
        first.get_or_insert(count);
        let tail = &rest[end as usize..];
        if tail.is_empty() || ascii::opens_payload(tail) {
            return first;
        }
        rest = tail;
    }
}

/// Header text: bytes up to the first NUL, lossily decoded, trailing
/// whitespace removed.
fn header_text(data: &[u8]) -> String {
    let raw = &data[..HEADER_SIZE];
    let len = raw.iter().position(|&b| b == 0).unwrap_or(HEADER_SIZE);
    String::from_utf8_lossy(&raw[..len]).trim_end().to_string()
}

#[inline]
fn read_f32(bytes: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[inline]
fn read_triple(bytes: &[u8], at: usize) -> [f32; 3] {
    [read_f32(bytes, at), read_f32(bytes, at + 4), read_f32(bytes, at + 8)]
}

fn read_facet(record: &[u8]) -> Facet {
    let n = read_triple(record, 0);
    let a = read_triple(record, 12);
    let b = read_triple(record, 24);
    let c = read_triple(record, 36);
    Facet::new(
        Vector3::new(n[0], n[1], n[2]),
        [
            Point3::new(a[0], a[1], a[2]),
            Point3::new(b[0], b[1], b[2]),
            Point3::new(c[0], c[1], c[2]),
        ],
    )
}

/// Read one validated binary payload.
///
/// `count` must come from [`validate`] on the same bytes.
pub(crate) fn read_block(
    data: &[u8],
    count: u32,
    ticker: &Ticker<'_>,
    out: &mut Vec<Facet>,
) -> BlockOutcome {
    let header = header_text(data);
    let body = &data[HEADER_SIZE + COUNT_SIZE..];
    out.reserve(count as usize);

    let mut consumed = HEADER_SIZE + COUNT_SIZE;
    for record in body.chunks_exact(FACET_SIZE).take(count as usize) {
        if ticker.cancelled() {
            return BlockOutcome {
                header,
                consumed,
                end: BlockEnd::Cancelled,
            };
        }
        out.push(read_facet(record));
        consumed += FACET_SIZE;
        ticker.report(consumed, "Reading binary STL");
    }

    BlockOutcome {
        header,
        consumed,
        end: BlockEnd::Clean,
    }
}

fn write_triple<W: Write>(writer: &mut W, v: [f32; 3]) -> std::io::Result<()> {
    for c in v {
        writer.write_all(&c.to_le_bytes())?;
    }
    Ok(())
}

/// Write facets as a binary STL payload.
///
/// The header is truncated to 80 bytes and NUL-padded; attribute fields are
/// written as zero.
///
/// # Errors
///
/// Fails if there are more than `u32::MAX` facets or the writer fails.
pub fn write_binary<W: Write>(writer: &mut W, header: &str, facets: &[Facet]) -> Result<()> {
    let count = u32::try_from(facets.len()).map_err(|_| {
        MeshError::invalid_param("facets", facets.len(), "binary STL holds at most u32::MAX facets")
    })?;

    let mut head = [0u8; HEADER_SIZE];
    let bytes = header.as_bytes();
    let len = bytes.len().min(HEADER_SIZE);
    head[..len].copy_from_slice(&bytes[..len]);
    writer.write_all(&head)?;
    writer.write_all(&count.to_le_bytes())?;

    for facet in facets {
        let n = facet.normal;
        write_triple(writer, [n.x, n.y, n.z])?;
        for v in &facet.vertices {
            write_triple(writer, [v.x, v.y, v.z])?;
        }
        writer.write_all(&0u16.to_le_bytes())?;
    }
    Ok(())
}
