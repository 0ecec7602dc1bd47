//! Genome command implementation.
//!
//! Builds a chromosome length table from FASTA files.

use crate::output::RegionWriter;
use crate::parsing::trim_line_end;
use crate::records::{open_input, RecordError, Result};
use memchr::memchr;
use memmap2::Mmap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Extensions picked up when a directory is given.
pub const FASTA_EXTENSIONS: &[&str] = &["fasta", "fa", "fna"];

/// One FASTA record's name and sequence length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceLength {
    pub name: String,
    pub length: u64,
}

/// Expand directories into their FASTA files. Explicit files are kept as
/// given; each directory contributes its FASTA files in name order.
pub fn collect_fasta_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(path)
                .map_err(RecordError::input(path))?
                .map(|entry| entry.map(|e| e.path()))
                .collect::<std::io::Result<Vec<_>>>()
                .map_err(RecordError::input(path))?
                .into_iter()
                .filter(|p| {
                    p.is_file()
                        && p.extension()
                            .and_then(|e| e.to_str())
                            .is_some_and(|e| FASTA_EXTENSIONS.contains(&e))
                })
                .collect();
            found.sort();
            log::debug!("{}: {} FASTA files", path.display(), found.len());
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

/// Count sequence lengths in FASTA bytes.
pub fn count_fasta_bytes(data: &[u8], origin: &str) -> Result<Vec<SequenceLength>> {
    let mut records: Vec<SequenceLength> = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let next = memchr(b'\n', &data[pos..]).map_or(data.len(), |i| pos + i + 1);
        let line = trim_line_end(&data[pos..next]);
        pos = next;

        if let Some(header) = line.strip_prefix(b">") {
            let header = String::from_utf8_lossy(header);
            let name = header.split_whitespace().next().unwrap_or("").to_string();
            if name.is_empty() {
                return Err(RecordError::MalformedFasta {
                    path: origin.to_string(),
                    message: format!("record {} has an empty name", records.len() + 1),
                });
            }
            records.push(SequenceLength { name, length: 0 });
        } else if !line.is_empty() {
            match records.last_mut() {
                Some(record) => record.length += line.len() as u64,
                None => {
                    return Err(RecordError::MalformedFasta {
                        path: origin.to_string(),
                        message: "sequence data before the first header".to_string(),
                    })
                }
            }
        }
    }

    Ok(records)
}

/// Count sequence lengths in one FASTA file.
pub fn count_fasta(path: &Path) -> Result<Vec<SequenceLength>> {
    let file = open_input(path)?;
    if file.metadata().map_err(RecordError::input(path))?.len() == 0 {
        return Ok(Vec::new());
    }
    let mmap = unsafe { Mmap::map(&file).map_err(RecordError::input(path))? };
    count_fasta_bytes(&mmap, &path.display().to_string())
}

/// Genome command: FASTA files in, `<name>\t<length>` lines out.
#[derive(Debug, Clone, Default)]
pub struct GenomeCommand;

impl GenomeCommand {
    pub fn new() -> Self {
        Self
    }

    /// Write one line per FASTA record across `paths`, in file then record
    /// order. Returns the number of records.
    pub fn run<W: Write>(&self, paths: &[PathBuf], output: W) -> Result<usize> {
        let files = collect_fasta_paths(paths)?;
        if files.is_empty() {
            return Err(RecordError::InvalidArgument(
                "no FASTA files found".to_string(),
            ));
        }

        let mut writer = RegionWriter::new(output);
        let mut count = 0;
        for file in &files {
            let records = count_fasta(file)?;
            log::info!("{}: {} sequences", file.display(), records.len());
            for record in &records {
                writer.write_length(&record.name, record.length)?;
            }
            count += records.len();
        }
        writer.flush()?;
        Ok(count)
    }
}
