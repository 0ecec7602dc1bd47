//! Delimited interval record reader and the crate error type.

use crate::config::RecordLayout;
use crate::interval::{Interval, Span};
use crate::parsing::{parse_u64_fast, should_skip_line, split_fields};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading inputs or running a command.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{path}: {source}")]
    Input { path: String, source: io::Error },

    #[error("{path}: read error at line {line}: {source}")]
    Read {
        path: String,
        line: usize,
        source: io::Error,
    },

    #[error("{path}: parse error at line {line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },

    #[error("chromosome '{chrom}' from {origin} is not in the genome file")]
    UnknownChromosome { chrom: String, origin: String },

    #[error("{origin}: line {line}: interval {chrom}:{start}-{end} has start > end")]
    InvertedInterval {
        origin: String,
        line: usize,
        chrom: String,
        start: u64,
        end: u64,
    },

    #[error("{path}: malformed FASTA: {message}")]
    MalformedFasta { path: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, RecordError>;

impl RecordError {
    /// Wrap an I/O error raised while opening or mapping `path`.
    pub fn input(path: &Path) -> impl FnOnce(io::Error) -> RecordError + '_ {
        move |source| RecordError::Input {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Open an input file, naming it in any error.
pub fn open_input(path: &Path) -> Result<File> {
    File::open(path).map_err(RecordError::input(path))
}

/// One parsed data line: its interval plus every raw field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub interval: Interval,
    pub fields: Vec<String>,
}

impl Record {
    #[inline]
    pub fn chrom(&self) -> &str {
        &self.interval.chrom
    }

    #[inline]
    pub fn start(&self) -> u64 {
        self.interval.start
    }

    #[inline]
    pub fn end(&self) -> u64 {
        self.interval.end
    }

    #[inline]
    pub fn span(&self) -> Span {
        self.interval.span()
    }

    pub fn field(&self, idx: usize) -> Option<&str> {
        self.fields.get(idx).map(String::as_str)
    }

    /// The layout's display columns joined by its delimiter.
    pub fn format(&self, layout: &RecordLayout) -> String {
        layout.format_fields(&self.fields)
    }
}

/// A streaming reader over delimited interval records.
pub struct RecordReader<R: Read> {
    reader: BufReader<R>,
    layout: RecordLayout,
    origin: String,
    line_number: usize,
    seen_data: bool,
    buffer: String,
}

impl RecordReader<File> {
    /// Open a record file from a path.
    pub fn from_path<P: AsRef<Path>>(path: P, layout: RecordLayout) -> Result<Self> {
        let path = path.as_ref();
        let file = open_input(path)?;
        Ok(Self::new(file, layout, path.display().to_string()))
    }
}

impl<R: Read> RecordReader<R> {
    /// Create a reader; `origin` names the source in error messages.
    pub fn new(reader: R, layout: RecordLayout, origin: impl Into<String>) -> Self {
        Self {
            reader: BufReader::new(reader),
            layout,
            origin: origin.into(),
            line_number: 0,
            seen_data: false,
            buffer: String::with_capacity(1024),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Line number of the most recently read line.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Read the next record.
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        loop {
            self.buffer.clear();
            let bytes_read = self
                .reader
                .read_line(&mut self.buffer)
                .map_err(|source| RecordError::Read {
                    path: self.origin.clone(),
                    line: self.line_number + 1,
                    source,
                })?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = self.buffer.trim_end_matches(['\n', '\r']);
            if should_skip_line(line.as_bytes()) {
                continue;
            }

            let fields = split_fields(line, self.layout.delimiter);

            // A header row is recognised by a non-numeric start column.
            if self.layout.header && !self.seen_data {
                let start = fields.get(self.layout.start_col);
                if start.is_some_and(|s| parse_u64_fast(s.as_bytes()).is_none()) {
                    self.seen_data = true;
                    continue;
                }
            }
            self.seen_data = true;

            return self.parse_fields(&fields).map(Some);
        }
    }

    fn parse_fields(&self, fields: &[&str]) -> Result<Record> {
        let layout = &self.layout;
        if fields.len() < layout.min_fields() {
            return Err(self.parse_error(format!(
                "Expected at least {} fields, got {}",
                layout.min_fields(),
                fields.len()
            )));
        }

        let chrom = fields[layout.chrom_col];
        if chrom.is_empty() {
            return Err(self.parse_error("Empty chromosome field".to_string()));
        }
        let start = self.parse_position(fields[layout.start_col], "start")?;
        let end = self.parse_position(fields[layout.end_col], "end")?;

        if start > end {
            return Err(RecordError::InvertedInterval {
                origin: self.origin.clone(),
                line: self.line_number,
                chrom: chrom.to_string(),
                start,
                end,
            });
        }

        Ok(Record {
            interval: Interval::new(chrom, start, end),
            fields: fields.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn parse_position(&self, s: &str, field_name: &str) -> Result<u64> {
        parse_u64_fast(s.trim().as_bytes())
            .ok_or_else(|| self.parse_error(format!("Invalid {} position: '{}'", field_name, s)))
    }

    fn parse_error(&self, message: String) -> RecordError {
        RecordError::Parse {
            path: self.origin.clone(),
            line: self.line_number,
            message,
        }
    }

    /// Get an iterator over all records.
    pub fn records(self) -> RecordIter<R> {
        RecordIter { reader: self }
    }
}

/// Iterator over records.
pub struct RecordIter<R: Read> {
    reader: RecordReader<R>,
}

impl<R: Read> Iterator for RecordIter<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_record().transpose()
    }
}

/// Read all records from a file.
pub fn read_records<P: AsRef<Path>>(path: P, layout: RecordLayout) -> Result<Vec<Record>> {
    RecordReader::from_path(path, layout)?.records().collect()
}

/// Parse records from a string (useful for testing).
pub fn parse_records(content: &str, layout: RecordLayout) -> Result<Vec<Record>> {
    RecordReader::new(content.as_bytes(), layout, "<memory>")
        .records()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileType;

    #[test]
    fn test_parse_bed3() {
        let content = "chr1\t100\t200\nchr1\t300\t400\n";
        let records = parse_records(content, RecordLayout::new(0, 1, 2)).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].chrom(), "chr1");
        assert_eq!(records[0].start(), 100);
        assert_eq!(records[0].end(), 200);
    }

    #[test]
    fn test_custom_columns_and_delimiter() {
        let layout = RecordLayout::new(2, 0, 1).with_delimiter(b',');
        let records = parse_records("10,20,chrX,extra\n", layout).unwrap();
        assert_eq!(records[0].interval, Interval::new("chrX", 10, 20));
        assert_eq!(records[0].field(3), Some("extra"));
    }

    #[test]
    fn test_skip_comments_and_track_lines() {
        let content = "# comment\ntrack name=test\n\nchr1\t100\t200\r\n";
        let records = parse_records(content, RecordLayout::new(0, 1, 2)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].end(), 200);
    }

    #[test]
    fn test_xls_header_skipped() {
        let content = "# Command line: macs3 callpeak\n\
                       chr\tstart\tend\tlength\tabs_summit\tpileup\t-log10(pvalue)\tfold_enrichment\t-log10(qvalue)\tname\n\
                       chr1\t101\t300\t200\t150\t20\t12.5\t4.1\t9.8\tpeak_1\n";
        let records = parse_records(content, FileType::Xls.layout()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].start(), 101);
    }

    #[test]
    fn test_header_not_allowed_for_bed() {
        let content = "chrom\tstart\tend\nchr1\t1\t2\n";
        let result = parse_records(content, FileType::Bed.layout());
        assert!(matches!(result, Err(RecordError::Parse { line: 1, .. })));
    }

    #[test]
    fn test_too_few_fields() {
        let result = parse_records("chr1\t100\n", RecordLayout::new(0, 1, 2));
        assert!(matches!(result, Err(RecordError::Parse { .. })));
    }

    #[test]
    fn test_non_integer_coordinate() {
        let result = parse_records("chr1\t1.5\t200\n", RecordLayout::new(0, 1, 2));
        match result {
            Err(RecordError::Parse { line, message, .. }) => {
                assert_eq!(line, 1);
                assert!(message.contains("start"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_inverted_interval_rejected() {
        let result = parse_records("chr1\t10\t20\nchr1\t300\t200\n", RecordLayout::new(0, 1, 2));
        assert!(matches!(
            result,
            Err(RecordError::InvertedInterval { line: 2, start: 300, end: 200, .. })
        ));
    }

    #[test]
    fn test_format_display_columns() {
        let layout = FileType::NarrowPeak.layout();
        let content = "chr2\t500\t600\tpeak_1\t87\t.\t5.2\t8.1\t6.3\t40\n";
        let records = parse_records(content, layout.clone()).unwrap();
        assert_eq!(
            records[0].format(&layout),
            "chr2\t500\t600\t5.2\t8.1\t6.3\t40"
        );
    }

    #[test]
    fn test_invalid_utf8_names_line() {
        let content: &[u8] = b"chr1\t1\t2\nchr1\t\xff\t5\n";
        let result: Result<Vec<Record>> = RecordReader::new(content, RecordLayout::new(0, 1, 2), "bad.bg")
            .records()
            .collect();
        match result {
            Err(err @ RecordError::Read { line: 2, .. }) => {
                let message = err.to_string();
                assert!(message.starts_with("bad.bg: read error at line 2"), "{}", message);
            }
            other => panic!("expected read error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = read_records("/nonexistent/peaks.bg", RecordLayout::new(0, 1, 2)).unwrap_err();
        assert!(matches!(err, RecordError::Input { .. }));
        assert!(err.to_string().contains("/nonexistent/peaks.bg"));
    }
}
