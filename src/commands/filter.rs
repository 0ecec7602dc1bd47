//! Filter command implementation.
//!
//! Keeps MACS3 peak lines whose -log10 significance column reaches a cutoff.

use crate::config::{FileType, DEFAULT_DELIMITER, DEFAULT_QVALUE};
use crate::parsing::{should_skip_line, split_fields};
use crate::records::{open_input, RecordError, Result};
use std::fmt;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

/// Significance measure and its raw (untransformed) cutoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    QValue(f64),
    PValue(f64),
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold::QValue(DEFAULT_QVALUE)
    }
}

impl Threshold {
    fn raw(self) -> f64 {
        match self {
            Threshold::QValue(v) | Threshold::PValue(v) => v,
        }
    }
}

/// Line counts from one filter run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub kept: usize,
    pub dropped: usize,
}

impl fmt::Display for FilterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kept {} of {} peaks", self.kept, self.kept + self.dropped)
    }
}

/// Filter command configuration.
#[derive(Debug, Clone)]
pub struct FilterCommand {
    pub threshold: Threshold,
    pub file_type: FileType,
    pub delimiter: u8,
}

impl FilterCommand {
    pub fn new(file_type: FileType, threshold: Threshold) -> Self {
        Self {
            threshold,
            file_type,
            delimiter: DEFAULT_DELIMITER,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// 0-based column holding the -log10 value for this format and measure.
    pub fn value_column(&self) -> Result<usize> {
        match (self.file_type, self.threshold) {
            (FileType::NarrowPeak, Threshold::QValue(_)) => Ok(8),
            (FileType::NarrowPeak, Threshold::PValue(_)) => Ok(7),
            (FileType::Xls, Threshold::QValue(_)) => Ok(8),
            (FileType::Xls, Threshold::PValue(_)) => Ok(6),
            (other, _) => Err(RecordError::InvalidArgument(format!(
                "filter supports narrowPeak and xls files, not {}",
                other
            ))),
        }
    }

    /// The cutoff on the -log10 scale.
    pub fn cutoff(&self) -> Result<f64> {
        let raw = self.threshold.raw();
        if !(raw > 0.0 && raw <= 1.0) {
            return Err(RecordError::InvalidArgument(format!(
                "cutoff must lie in (0, 1], got {}",
                raw
            )));
        }
        Ok(-raw.log10())
    }

    /// Copy passing data lines from `input` to `output` unchanged.
    pub fn filter_reader<R: Read, W: Write>(
        &self,
        input: R,
        origin: &str,
        mut output: W,
    ) -> Result<FilterStats> {
        let column = self.value_column()?;
        let cutoff = self.cutoff()?;
        let mut stats = FilterStats::default();
        let mut reader = BufReader::new(input);
        let mut buffer = String::new();
        let mut line_number = 0;

        loop {
            buffer.clear();
            let bytes_read = reader
                .read_line(&mut buffer)
                .map_err(|source| RecordError::Read {
                    path: origin.to_string(),
                    line: line_number + 1,
                    source,
                })?;
            if bytes_read == 0 {
                break;
            }
            line_number += 1;
            let line = buffer.trim_end_matches(['\n', '\r']);
            if should_skip_line(line.as_bytes()) {
                continue;
            }

            let fields = split_fields(line, self.delimiter);
            let value = fields.get(column).ok_or_else(|| RecordError::Parse {
                path: origin.to_string(),
                line: line_number,
                message: format!("Expected at least {} fields, got {}", column + 1, fields.len()),
            })?;
            if value.contains("pvalue") || value.contains("qvalue") {
                continue;
            }
            let value: f64 = value.trim().parse().map_err(|_| RecordError::Parse {
                path: origin.to_string(),
                line: line_number,
                message: format!("Invalid significance value: '{}'", value),
            })?;

            if value >= cutoff {
                output.write_all(line.as_bytes())?;
                output.write_all(b"\n")?;
                stats.kept += 1;
            } else {
                stats.dropped += 1;
            }
        }

        output.flush()?;
        Ok(stats)
    }

    /// Filter one file.
    pub fn run<P: AsRef<Path>, W: Write>(&self, input: P, output: W) -> Result<FilterStats> {
        let path = input.as_ref();
        let origin = path.display().to_string();
        let stats = self.filter_reader(open_input(path)?, &origin, output)?;
        log::info!("{}: {}", origin, stats);
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XLS: &str = "# This file is generated by MACS version 3.0.0\n\
                       # cutoff = 0.01\n\
                       \n\
                       chr\tstart\tend\tlength\tabs_summit\tpileup\t-log10(pvalue)\tfold_enrichment\t-log10(qvalue)\tname\n\
                       chr1\t101\t300\t200\t150\t20\t12.5\t4.1\t1.9\tpeak_1\n\
                       chr1\t501\t700\t200\t600\t30\t1.2\t6.0\t2.5\tpeak_2\n\
                       chr2\t11\t90\t80\t40\t8\t2.0\t2.2\t2.0\tpeak_3\n";

    fn filter(cmd: &FilterCommand, content: &str) -> (String, FilterStats) {
        let mut out = Vec::new();
        let stats = cmd.filter_reader(content.as_bytes(), "<memory>", &mut out).unwrap();
        (String::from_utf8(out).unwrap(), stats)
    }

    #[test]
    fn test_xls_qvalue_default() {
        let cmd = FilterCommand::new(FileType::Xls, Threshold::default());
        let (out, stats) = filter(&cmd, XLS);
        // -log10(0.01) = 2, inclusive
        assert_eq!(
            out,
            "chr1\t501\t700\t200\t600\t30\t1.2\t6.0\t2.5\tpeak_2\n\
             chr2\t11\t90\t80\t40\t8\t2.0\t2.2\t2.0\tpeak_3\n"
        );
        assert_eq!(stats, FilterStats { kept: 2, dropped: 1 });
    }

    #[test]
    fn test_xls_pvalue() {
        let cmd = FilterCommand::new(FileType::Xls, Threshold::PValue(0.001));
        let (out, stats) = filter(&cmd, XLS);
        assert!(out.starts_with("chr1\t101\t300"));
        assert_eq!(stats.kept, 1);
    }

    #[test]
    fn test_narrowpeak_columns() {
        let content = "chr1\t100\t200\tp1\t50\t.\t3.0\t6.0\t1.0\t40\n\
                       chr1\t300\t400\tp2\t50\t.\t3.0\t1.0\t6.0\t40\n";
        let q = FilterCommand::new(FileType::NarrowPeak, Threshold::QValue(0.01));
        assert_eq!(filter(&q, content).0, "chr1\t300\t400\tp2\t50\t.\t3.0\t1.0\t6.0\t40\n");

        let p = FilterCommand::new(FileType::NarrowPeak, Threshold::PValue(0.01));
        assert_eq!(filter(&p, content).0, "chr1\t100\t200\tp1\t50\t.\t3.0\t6.0\t1.0\t40\n");
    }

    #[test]
    fn test_cutoff_range() {
        for bad in [0.0, -0.5, 1.5, f64::NAN] {
            let cmd = FilterCommand::new(FileType::Xls, Threshold::QValue(bad));
            assert!(matches!(cmd.cutoff(), Err(RecordError::InvalidArgument(_))));
        }
        let cmd = FilterCommand::new(FileType::Xls, Threshold::QValue(1.0));
        assert_eq!(cmd.cutoff().unwrap(), 0.0);
    }

    #[test]
    fn test_unsupported_format() {
        let cmd = FilterCommand::new(FileType::Bed, Threshold::default());
        assert!(matches!(cmd.value_column(), Err(RecordError::InvalidArgument(_))));
    }

    #[test]
    fn test_non_numeric_value() {
        let cmd = FilterCommand::new(FileType::NarrowPeak, Threshold::default());
        let mut out = Vec::new();
        let result = cmd.filter_reader(
            "chr1\t1\t2\tp\t0\t.\t1\t1\tNA\t0\n".as_bytes(),
            "x.narrowPeak",
            &mut out,
        );
        assert!(matches!(result, Err(RecordError::Parse { line: 1, .. })));
    }

    #[test]
    fn test_read_error_names_line() {
        let cmd = FilterCommand::new(FileType::NarrowPeak, Threshold::default());
        let content: &[u8] = b"chr1\t1\t2\tp\t0\t.\t1\t1\t3\t0\n\xfe\n";
        let mut out = Vec::new();
        let result = cmd.filter_reader(content, "x.narrowPeak", &mut out);
        assert!(matches!(result, Err(RecordError::Read { line: 2, .. })));
    }
}
