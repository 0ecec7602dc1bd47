//! Chromosome length table.
//!
//! Parses `.genome` files (`<chrom>\t<length>` per line).

use rustc_hash::FxHashMap;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::interval::Span;
use crate::records::{open_input, RecordError, Result};

/// Chromosome lengths, preserving the order of the input file.
#[derive(Debug, Clone, Default)]
pub struct Genome {
    /// Map of chromosome name to length
    sizes: FxHashMap<String, u64>,
    /// Chromosome order (preserves input file order)
    order: Vec<String>,
}

impl Genome {
    /// Create an empty genome.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a genome table from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = open_input(path)?;
        Self::from_reader(file, &path.display().to_string())
    }

    /// Load a genome table from any reader; `origin` names it in errors.
    pub fn from_reader<R: Read>(reader: R, origin: &str) -> Result<Self> {
        let reader = BufReader::new(reader);
        let mut genome = Genome::new();
        let mut first_seen: FxHashMap<String, usize> = FxHashMap::default();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result.map_err(|source| RecordError::Read {
                path: origin.to_string(),
                line: line_num + 1,
                source,
            })?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parse_error = |message: String| RecordError::Parse {
                path: origin.to_string(),
                line: line_num + 1,
                message,
            };

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 2 {
                return Err(parse_error(
                    "Genome file requires two columns: chrom and length".to_string(),
                ));
            }

            let size: u64 = fields[1]
                .trim()
                .parse()
                .map_err(|_| parse_error(format!("Invalid chromosome length: {}", fields[1])))?;
            if size == 0 {
                return Err(parse_error(format!(
                    "Chromosome {} has zero length",
                    fields[0]
                )));
            }

            if let Some(&first) = first_seen.get(fields[0]) {
                return Err(parse_error(format!(
                    "Chromosome {} is listed twice (lines {} and {})",
                    fields[0],
                    first,
                    line_num + 1
                )));
            }
            first_seen.insert(fields[0].to_string(), line_num + 1);
            genome.insert(fields[0].to_string(), size);
        }

        Ok(genome)
    }

    /// Get the length of a chromosome.
    #[inline]
    pub fn chrom_size(&self, chrom: &str) -> Option<u64> {
        self.sizes.get(chrom).copied()
    }

    /// Length of a chromosome, or `UnknownChromosome` naming `origin`.
    pub fn size_of(&self, chrom: &str, origin: &str) -> Result<u64> {
        self.chrom_size(chrom)
            .ok_or_else(|| RecordError::UnknownChromosome {
                chrom: chrom.to_string(),
                origin: origin.to_string(),
            })
    }

    /// Number of `spans` ending past the chromosome's length.
    pub fn overruns(&self, chrom: &str, spans: &[Span], origin: &str) -> Result<usize> {
        let length = self.size_of(chrom, origin)?;
        Ok(spans.iter().filter(|span| span.end > length).count())
    }

    /// Check if a chromosome exists.
    #[inline]
    pub fn has_chrom(&self, chrom: &str) -> bool {
        self.sizes.contains_key(chrom)
    }

    /// Get all chromosome names in file order.
    pub fn chromosomes(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    /// Chromosome names with their lengths, in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.order
            .iter()
            .map(move |chrom| (chrom.as_str(), self.sizes[chrom]))
    }

    /// Get number of chromosomes.
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Insert a chromosome length (appends to order if new).
    pub fn insert(&mut self, chrom: String, size: u64) {
        if !self.sizes.contains_key(&chrom) {
            self.order.push(chrom.clone());
        }
        self.sizes.insert(chrom, size);
    }
}
