//! Output formatting and all-or-nothing file writes.
//!
//! Uses itoa for integer formatting and ryu for float formatting.

use crate::records::{RecordError, Result};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Buffer size for RegionWriter.
const DEFAULT_BUFFER_SIZE: usize = 256 * 1024;

/// Buffered writer for region and table lines.
pub struct RegionWriter<W: Write> {
    writer: BufWriter<W>,
    delimiter: u8,
    itoa_buf: itoa::Buffer,
    ryu_buf: ryu::Buffer,
}

impl<W: Write> RegionWriter<W> {
    /// Create a tab-delimited writer.
    pub fn new(output: W) -> Self {
        Self::with_delimiter(output, b'\t')
    }

    pub fn with_delimiter(output: W, delimiter: u8) -> Self {
        Self {
            writer: BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, output),
            delimiter,
            itoa_buf: itoa::Buffer::new(),
            ryu_buf: ryu::Buffer::new(),
        }
    }

    /// Write `chrom, start, end` followed by newline.
    #[inline]
    pub fn write_region(&mut self, chrom: &str, start: u64, end: u64) -> Result<()> {
        self.writer.write_all(chrom.as_bytes())?;
        self.write_delimiter()?;
        self.write_int(start)?;
        self.write_delimiter()?;
        self.write_int(end)?;
        self.write_newline()
    }

    /// Write `chrom, length` followed by newline.
    #[inline]
    pub fn write_length(&mut self, chrom: &str, length: u64) -> Result<()> {
        self.writer.write_all(chrom.as_bytes())?;
        self.write_delimiter()?;
        self.write_int(length)?;
        self.write_newline()
    }

    /// Write `chrom, factor, distance` followed by newline.
    #[inline]
    pub fn write_padding(&mut self, chrom: &str, factor: f64, distance: u64) -> Result<()> {
        self.writer.write_all(chrom.as_bytes())?;
        self.write_delimiter()?;
        self.write_float(factor)?;
        self.write_delimiter()?;
        self.write_int(distance)?;
        self.write_newline()
    }

    /// Write a full line as-is with newline.
    #[inline]
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.write_newline()
    }

    #[inline]
    fn write_delimiter(&mut self) -> Result<()> {
        self.writer.write_all(&[self.delimiter])?;
        Ok(())
    }

    #[inline]
    fn write_newline(&mut self) -> Result<()> {
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    #[inline]
    fn write_int(&mut self, n: u64) -> Result<()> {
        self.writer.write_all(self.itoa_buf.format(n).as_bytes())?;
        Ok(())
    }

    #[inline]
    fn write_float(&mut self, f: f64) -> Result<()> {
        self.writer.write_all(self.ryu_buf.format(f).as_bytes())?;
        Ok(())
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Run `write` against a temporary file beside `path`, then rename it into
/// place. On error the temporary file is removed and `path` is untouched.
pub fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !dir.is_dir() {
        fs::create_dir_all(dir)?;
    }

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        write(&mut out)?;
        out.flush()?;
    }
    tmp.persist(path)
        .map_err(|e| RecordError::Io(e.error))?;
    Ok(())
}

/// Write to `path` atomically, or to stdout when no path is given.
pub fn write_output<F>(path: Option<&Path>, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    match path {
        Some(path) => write_atomically(path, write),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            write(&mut handle)?;
            handle.flush()?;
            Ok(())
        }
    }
}
