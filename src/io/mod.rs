//! STL file I/O.
//!
//! This module reads binary and text STL into a list of [`Facet`]s and writes
//! facets back out in either encoding.
//!
//! # Format Detection
//!
//! The encoding is decided from the bytes, not the file name:
//!
//! | Condition | Treated as |
//! |-----------|------------|
//! | fewer than 134 bytes (80 header + 4 count + one 50-byte facet) | text |
//! | `84 + N * 50` matches the remaining length | binary |
//! | anything else | text |
//!
//! After one payload is read, trailing whitespace is skipped and detection
//! runs again on whatever is left, so files made of several concatenated STL
//! payloads (binary, text or mixed) load completely.
//!
//! # Damaged Files
//!
//! Reading never fails because of bad data after the header. A text block
//! that cannot be parsed ends the payload and the facets read so far are
//! returned, with [`StlFile::completion`] set to [`Completion::Truncated`].
//! Cancelling through [`ParseOptions::with_cancel`] behaves the same way with
//! [`Completion::Cancelled`].
//!
//! # Usage
//!
//! ```no_run
//! use stlweld::io::{self, Encoding, ParseOptions};
//!
//! let stl = io::load("model.stl", &ParseOptions::default()).unwrap();
//! println!("{} facets, header {:?}", stl.num_facets(), stl.header());
//!
//! io::save(&stl, "model_ascii.stl", Encoding::Ascii).unwrap();
//! ```

mod ascii;
mod binary;
mod detect;

pub use ascii::write_ascii;
pub use binary::{write_binary, FACET_SIZE, HEADER_SIZE, MIN_BINARY_SIZE};

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::ops::Range;
use std::path::Path;

use crate::error::{MeshError, Result};
use crate::mesh::Facet;
use crate::progress::{CancelToken, Progress};

/// STL encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Little-endian binary records.
    Binary,
    /// Line-oriented text.
    Ascii,
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Encoding::Binary => write!(f, "binary"),
            Encoding::Ascii => write!(f, "ascii"),
        }
    }
}

/// How a parse ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Completion {
    /// All input was consumed.
    #[default]
    Complete,
    /// Malformed or truncated data stopped the parse; earlier facets are kept.
    Truncated,
    /// The cancel token was set; facets read before that point are kept.
    Cancelled,
}

/// One STL payload within a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Encoding of this payload.
    pub encoding: Encoding,
    /// Header text (binary header up to the first NUL, or the first text line).
    pub header: String,
    /// The facets this payload contributed, as a range into [`StlFile::facets`].
    pub facets: Range<usize>,
}

/// Result of parsing an STL stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StlFile {
    /// All facets, in stream order.
    pub facets: Vec<Facet>,
    /// The payloads the stream was made of.
    pub blocks: Vec<Block>,
    /// How parsing ended.
    pub completion: Completion,
}

impl StlFile {
    /// Create a file from facets, as if read from a single payload.
    pub fn from_facets(header: impl Into<String>, encoding: Encoding, facets: Vec<Facet>) -> Self {
        let blocks = vec![Block {
            encoding,
            header: header.into(),
            facets: 0..facets.len(),
        }];
        Self {
            facets,
            blocks,
            completion: Completion::Complete,
        }
    }

    /// Number of facets.
    pub fn num_facets(&self) -> usize {
        self.facets.len()
    }

    /// Header of the first payload, or `""` if nothing was read.
    pub fn header(&self) -> &str {
        self.blocks.first().map_or("", |b| b.header.as_str())
    }

    /// Encoding of the first payload.
    pub fn encoding(&self) -> Option<Encoding> {
        self.blocks.first().map(|b| b.encoding)
    }

    /// Whether every byte of the input was accounted for.
    pub fn is_complete(&self) -> bool {
        self.completion == Completion::Complete
    }
}

/// Options for reading STL data.
#[derive(Debug, Default)]
pub struct ParseOptions {
    /// Receives `(bytes_consumed, total_bytes, message)` after each facet.
    pub progress: Progress,
    /// Polled before each facet; when set, parsing stops early.
    pub cancel: Option<CancelToken>,
}

impl ParseOptions {
    /// Set the progress reporter.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Set the cancellation token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Progress and cancellation plumbing for one payload, translating
/// payload-relative offsets into stream offsets.
pub(crate) struct Ticker<'a> {
    options: &'a ParseOptions,
    base: usize,
    total: usize,
}

impl<'a> Ticker<'a> {
    pub(crate) fn new(options: &'a ParseOptions, base: usize, total: usize) -> Self {
        Self {
            options,
            base,
            total,
        }
    }

    #[inline]
    pub(crate) fn absolute(&self, local: usize) -> usize {
        self.base + local
    }

    #[inline]
    pub(crate) fn report(&self, local: usize, message: &str) {
        self.options.progress.report(self.absolute(local), self.total, message);
    }

    #[inline]
    pub(crate) fn cancelled(&self) -> bool {
        self.options.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

/// Why a payload reader stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockEnd {
    Clean,
    Malformed,
    Cancelled,
}

/// What a payload reader consumed.
#[derive(Debug)]
pub(crate) struct BlockOutcome {
    pub(crate) header: String,
    pub(crate) consumed: usize,
    pub(crate) end: BlockEnd,
}

/// Parse an in-memory STL stream.
///
/// # Errors
///
/// Returns [`MeshError::TruncatedHeader`] if the stream is empty or holds only
/// whitespace, so there is no header line to read.
///
/// # Example
///
/// ```
/// use stlweld::io::{parse, Completion, ParseOptions};
///
/// let text = b"solid t\nfacet normal 0 0 1\nouter loop\nvertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\nendloop\nendfacet\nendsolid t\n";
/// let stl = parse(text, &ParseOptions::default()).unwrap();
/// assert_eq!(stl.num_facets(), 1);
/// assert_eq!(stl.header(), "solid t");
/// assert_eq!(stl.completion, Completion::Complete);
/// ```
pub fn parse(data: &[u8], options: &ParseOptions) -> Result<StlFile> {
    detect::parse_stream(data, options)
}

/// Read a whole stream and parse it.
pub fn read<R: Read>(mut reader: R, options: &ParseOptions) -> Result<StlFile> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    parse(&data, options)
}

/// Load an STL file.
///
/// # Example
///
/// ```no_run
/// use stlweld::io::{load, ParseOptions};
///
/// let stl = load("model.stl", &ParseOptions::default()).unwrap();
/// ```
pub fn load<P: AsRef<Path>>(path: P, options: &ParseOptions) -> Result<StlFile> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| MeshError::LoadError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    log::debug!("read {} bytes from {}", data.len(), path.display());
    parse(&data, options)
}

/// Write facets in the requested encoding.
pub fn write<W: Write>(writer: &mut W, header: &str, facets: &[Facet], encoding: Encoding) -> Result<()> {
    match encoding {
        Encoding::Binary => write_binary(writer, header, facets),
        Encoding::Ascii => write_ascii(writer, header, facets),
    }
}

/// Save parsed STL data to a file.
///
/// All facets are written as one payload carrying the first payload's header.
///
/// # Example
///
/// ```no_run
/// use stlweld::io::{load, save, Encoding, ParseOptions};
///
/// let stl = load("model.stl", &ParseOptions::default()).unwrap();
/// save(&stl, "model_binary.stl", Encoding::Binary).unwrap();
/// ```
pub fn save<P: AsRef<Path>>(stl: &StlFile, path: P, encoding: Encoding) -> Result<()> {
    let path = path.as_ref();
    let save_error = |message: String| MeshError::SaveError {
        path: path.to_path_buf(),
        message,
    };

    let file = File::create(path).map_err(|e| save_error(e.to_string()))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer, stl.header(), &stl.facets, encoding).map_err(|e| match e {
        MeshError::Io(io) => save_error(io.to_string()),
        other => other,
    })?;
    writer.flush().map_err(|e| save_error(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn sample() -> Vec<Facet> {
        vec![
            Facet::from_corners(
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ),
            Facet::from_corners(
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ),
        ]
    }

    #[test]
    fn test_from_facets() {
        let stl = StlFile::from_facets("solid s", Encoding::Ascii, sample());
        assert_eq!(stl.num_facets(), 2);
        assert_eq!(stl.header(), "solid s");
        assert_eq!(stl.encoding(), Some(Encoding::Ascii));
        assert!(stl.is_complete());
        assert_eq!(stl.blocks[0].facets, 0..2);
    }

    #[test]
    fn test_empty_file_has_no_header() {
        let stl = StlFile::default();
        assert_eq!(stl.header(), "");
        assert_eq!(stl.encoding(), None);
    }

    #[test]
    fn test_write_dispatch() {
        for encoding in [Encoding::Binary, Encoding::Ascii] {
            let mut buf = Vec::new();
            write(&mut buf, "solid s", &sample(), encoding).unwrap();
            let stl = parse(&buf, &ParseOptions::default()).unwrap();
            assert_eq!(stl.encoding(), Some(encoding));
            assert_eq!(stl.facets, sample());
        }
    }

    #[test]
    fn test_read_from_reader() {
        let mut buf = Vec::new();
        write_binary(&mut buf, "solid r", &sample()).unwrap();
        let stl = read(std::io::Cursor::new(buf), &ParseOptions::default()).unwrap();
        assert_eq!(stl.num_facets(), 2);
    }

    #[test]
    fn test_encoding_display() {
        assert_eq!(Encoding::Binary.to_string(), "binary");
        assert_eq!(Encoding::Ascii.to_string(), "ascii");
    }
}
