//! Max command implementation.
//!
//! Reports the largest signal value among records lying inside a region,
//! across one or more bedGraph or narrowPeak files.

use crate::config::{FileType, DEFAULT_DELIMITER};
use crate::interval::Interval;
use crate::records::{open_input, RecordError, RecordReader, Result};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Max command configuration.
#[derive(Debug, Clone)]
pub struct PeakMaxCommand {
    pub region: Interval,
    /// Input format; inferred per file from its extension when `None`.
    pub file_type: Option<FileType>,
    pub delimiter: u8,
}

impl PeakMaxCommand {
    pub fn new(region: Interval) -> Self {
        Self {
            region,
            file_type: None,
            delimiter: DEFAULT_DELIMITER,
        }
    }

    pub fn with_file_type(mut self, file_type: Option<FileType>) -> Self {
        self.file_type = file_type;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Format of `path` and its value column.
    pub fn format_for(&self, path: &Path) -> Result<(FileType, usize)> {
        let file_type = self
            .file_type
            .or_else(|| FileType::from_path(path))
            .ok_or_else(|| {
                RecordError::InvalidArgument(format!(
                    "cannot infer the format of {}; pass --file-type",
                    path.display()
                ))
            })?;
        let column = file_type.value_column().ok_or_else(|| {
            RecordError::InvalidArgument(format!(
                "max supports bedgraph and narrowPeak files, not {}",
                file_type
            ))
        })?;
        Ok((file_type, column))
    }

    /// Largest value in `column` among records inside the region, if any.
    pub fn max_in_reader<R: Read>(
        &self,
        input: R,
        file_type: FileType,
        column: usize,
        origin: &str,
    ) -> Result<Option<f64>> {
        let layout = file_type.layout().with_delimiter(self.delimiter);
        let mut reader = RecordReader::new(input, layout, origin);
        let mut highest: Option<f64> = None;

        while let Some(record) = reader.read_record()? {
            if record.chrom() != self.region.chrom
                || record.start() < self.region.start
                || record.end() > self.region.end
            {
                continue;
            }
            let raw = record.field(column).ok_or_else(|| RecordError::Parse {
                path: origin.to_string(),
                line: reader.line_number(),
                message: format!(
                    "Expected at least {} fields, got {}",
                    column + 1,
                    record.fields.len()
                ),
            })?;
            let value: f64 = raw.trim().parse().map_err(|_| RecordError::Parse {
                path: origin.to_string(),
                line: reader.line_number(),
                message: format!("Invalid signal value: '{}'", raw),
            })?;
            highest = Some(highest.map_or(value, |h| h.max(value)));
        }

        Ok(highest)
    }

    /// Maximum over every input, starting from 0.
    pub fn max_of(&self, inputs: &[PathBuf]) -> Result<f64> {
        let mut highest = 0.0_f64;
        for path in inputs {
            let (file_type, column) = self.format_for(path)?;
            let origin = path.display().to_string();
            let file = open_input(path)?;
            match self.max_in_reader(file, file_type, column, &origin)? {
                Some(value) => {
                    log::debug!("{}: max {} in {}", origin, value, self.region.chrom);
                    highest = highest.max(value);
                }
                None => log::info!("{}: no records inside the region", origin),
            }
        }
        Ok(highest)
    }

    /// Write the maximum as a single line.
    pub fn run<W: Write>(&self, inputs: &[PathBuf], mut output: W) -> Result<f64> {
        let highest = self.max_of(inputs)?;
        writeln!(output, "{}", highest)?;
        output.flush()?;
        Ok(highest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const BEDGRAPH: &str = "chr1\t0\t100\t3.5\n\
                            chr1\t100\t200\t9.0\n\
                            chr1\t200\t300\t4.0\n\
                            chr1\t300\t400\t12.0\n\
                            chr2\t100\t200\t50.0\n";

    fn command(region: &str) -> PeakMaxCommand {
        PeakMaxCommand::new(region.parse().unwrap())
    }

    #[test]
    fn test_only_contained_records_count() {
        let cmd = command("chr1:100-300");
        let max = cmd
            .max_in_reader(BEDGRAPH.as_bytes(), FileType::BedGraph, 3, "<memory>")
            .unwrap();
        // chr1 300-400 straddles the end; chr2 is another chromosome
        assert_eq!(max, Some(9.0));
    }

    #[test]
    fn test_region_bounds_are_inclusive() {
        let cmd = command("chr1:300-400");
        let max = cmd
            .max_in_reader(BEDGRAPH.as_bytes(), FileType::BedGraph, 3, "<memory>")
            .unwrap();
        assert_eq!(max, Some(12.0));
    }

    #[test]
    fn test_narrowpeak_signal_column() {
        let content = "chr1\t100\t200\tp1\t50\t.\t7.5\t6.0\t3.0\t40\n\
                       chr1\t150\t180\tp2\t50\t.\t2.5\t9.0\t8.0\t40\n";
        let cmd = command("chr1:0-1000");
        let max = cmd
            .max_in_reader(content.as_bytes(), FileType::NarrowPeak, 6, "<memory>")
            .unwrap();
        assert_eq!(max, Some(7.5));
    }

    #[test]
    fn test_max_across_files() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.bg");
        let b = dir.path().join("b.narrowPeak");
        let empty = dir.path().join("empty.bdg");
        fs::write(&a, BEDGRAPH).unwrap();
        fs::write(&b, "chr1\t120\t180\tp1\t50\t.\t10.25\t6.0\t3.0\t40\n").unwrap();
        fs::write(&empty, "").unwrap();

        let cmd = command("chr1:100-300");
        assert_eq!(cmd.max_of(&[a.clone(), b, empty.clone()]).unwrap(), 10.25);
        assert_eq!(cmd.max_of(&[empty]).unwrap(), 0.0);

        let mut out = Vec::new();
        cmd.run(&[a], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "9\n");
    }

    #[test]
    fn test_negative_values_floor_at_zero() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.bedgraph");
        fs::write(&a, "chr1\t0\t10\t-2.0\n").unwrap();
        assert_eq!(command("chr1:0-10").max_of(&[a]).unwrap(), 0.0);
    }

    #[test]
    fn test_unsupported_format() {
        let cmd = command("chr1:0-10");
        assert!(matches!(
            cmd.format_for(Path::new("genes.bed")),
            Err(RecordError::InvalidArgument(_))
        ));
        assert!(matches!(
            cmd.format_for(Path::new("reads.txt")),
            Err(RecordError::InvalidArgument(_))
        ));
        let forced = command("chr1:0-10").with_file_type(Some(FileType::BedGraph));
        assert_eq!(forced.format_for(Path::new("reads.txt")).unwrap(), (FileType::BedGraph, 3));
    }

    #[test]
    fn test_non_numeric_value() {
        let cmd = command("chr1:0-1000");
        let result = cmd.max_in_reader(
            "chr1\t0\t10\t1.0\nchr1\t10\t20\tNA\n".as_bytes(),
            FileType::BedGraph,
            3,
            "x.bg",
        );
        assert!(matches!(result, Err(RecordError::Parse { line: 2, .. })));
    }
}
