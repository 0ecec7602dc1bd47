//! Per-chromosome padding distances for plot regions.
//!
//! Small chromosomes and contigs get proportionally more padding so that a
//! rendered region keeps visible context around each peak.

use crate::config::DEFAULT_PADDING_FACTOR;
use crate::genome::Genome;
use crate::output::RegionWriter;
use crate::records::Result;
use rustc_hash::FxHashMap;
use std::io::Write;

/// Length thresholds and their padding factors.
pub const DEFAULT_STEPS: &[(u64, f64)] = &[
    (100_000, 0.1),
    (1_000_000, 0.05),
    (10_000_000, 0.01),
    (100_000_000, 0.005),
    (1_000_000_000, 0.001),
];

/// Step function from chromosome length to padding factor.
#[derive(Debug, Clone, PartialEq)]
pub struct PaddingSchedule {
    /// (threshold, factor), ascending by threshold
    steps: Vec<(u64, f64)>,
    /// Factor for lengths at or above every threshold
    default_factor: f64,
}

impl Default for PaddingSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_STEPS.to_vec(), DEFAULT_PADDING_FACTOR)
    }
}

impl PaddingSchedule {
    pub fn new(mut steps: Vec<(u64, f64)>, default_factor: f64) -> Self {
        steps.sort_by_key(|&(threshold, _)| threshold);
        Self {
            steps,
            default_factor,
        }
    }

    /// Replace the fallback factor.
    pub fn with_default_factor(mut self, factor: f64) -> Self {
        self.default_factor = factor;
        self
    }

    /// Factor of the smallest threshold strictly greater than `length`.
    pub fn factor_for(&self, length: u64) -> f64 {
        self.steps
            .iter()
            .find(|&&(threshold, _)| length < threshold)
            .map(|&(_, factor)| factor)
            .unwrap_or(self.default_factor)
    }

    /// Padding distance in whole bases (fraction truncated).
    pub fn distance_for(&self, length: u64) -> u64 {
        (length as f64 * self.factor_for(length)).floor() as u64
    }
}

/// One chromosome's padding.
#[derive(Debug, Clone, PartialEq)]
pub struct PaddingEntry {
    pub chrom: String,
    pub length: u64,
    pub factor: f64,
    pub distance: u64,
}

/// Padding distance for every chromosome of a genome, in genome order.
#[derive(Debug, Clone, Default)]
pub struct PaddingTable {
    entries: Vec<PaddingEntry>,
    index: FxHashMap<String, usize>,
}

impl PaddingTable {
    /// Derive distances from a genome with the given schedule.
    pub fn from_genome(genome: &Genome, schedule: &PaddingSchedule) -> Self {
        Self::build(genome.iter().map(|(chrom, length)| {
            let factor = schedule.factor_for(length);
            PaddingEntry {
                chrom: chrom.to_string(),
                length,
                factor,
                distance: schedule.distance_for(length),
            }
        }))
    }

    /// The same fixed distance on every chromosome.
    pub fn uniform(genome: &Genome, distance: u64) -> Self {
        Self::build(genome.iter().map(|(chrom, length)| PaddingEntry {
            chrom: chrom.to_string(),
            length,
            factor: distance as f64 / length as f64,
            distance,
        }))
    }

    fn build(entries: impl Iterator<Item = PaddingEntry>) -> Self {
        let entries: Vec<PaddingEntry> = entries.collect();
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.chrom.clone(), i))
            .collect();
        Self { entries, index }
    }

    /// Padding distance for a chromosome.
    #[inline]
    pub fn distance(&self, chrom: &str) -> Option<u64> {
        self.index.get(chrom).map(|&i| self.entries[i].distance)
    }

    pub fn entries(&self) -> &[PaddingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write `<chrom>\t<factor>\t<distance>` per chromosome.
    pub fn write<W: Write>(&self, output: W) -> Result<()> {
        let mut writer = RegionWriter::new(output);
        for entry in &self.entries {
            writer.write_padding(&entry.chrom, entry.factor, entry.distance)?;
        }
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_steps() {
        let schedule = PaddingSchedule::default();
        assert_eq!(schedule.factor_for(50_000), 0.1);
        assert_eq!(schedule.factor_for(500_000), 0.05);
        assert_eq!(schedule.distance_for(500_000), 25_000);
        assert_eq!(schedule.factor_for(5_000_000), 0.01);
        assert_eq!(schedule.factor_for(50_000_000), 0.005);
        assert_eq!(schedule.factor_for(500_000_000), 0.001);
    }

    #[test]
    fn test_threshold_is_strict() {
        let schedule = PaddingSchedule::default();
        // exactly at a threshold falls to the next step
        assert_eq!(schedule.factor_for(100_000), 0.05);
        assert_eq!(schedule.factor_for(99_999), 0.1);
    }

    #[test]
    fn test_default_factor_beyond_thresholds() {
        let schedule = PaddingSchedule::default().with_default_factor(0.0001);
        assert_eq!(schedule.factor_for(2_000_000_000), 0.0001);
        assert_eq!(schedule.distance_for(2_000_000_000), 200_000);
    }

    #[test]
    fn test_fraction_truncated() {
        let schedule = PaddingSchedule::default();
        // 12_345 * 0.1 = 1234.5
        assert_eq!(schedule.distance_for(12_345), 1234);
    }

    #[test]
    fn test_table_from_genome() {
        let mut genome = Genome::new();
        genome.insert("chrM".to_string(), 16_569);
        genome.insert("chr1".to_string(), 248_956_422);

        let table = PaddingTable::from_genome(&genome, &PaddingSchedule::default());
        assert_eq!(table.len(), 2);
        assert_eq!(table.distance("chrM"), Some(1656));
        assert_eq!(table.distance("chr1"), Some(248_956));
        assert_eq!(table.distance("chrX"), None);
        assert_eq!(table.entries()[0].chrom, "chrM");
    }

    #[test]
    fn test_uniform_table() {
        let mut genome = Genome::new();
        genome.insert("chr1".to_string(), 1000);
        let table = PaddingTable::uniform(&genome, 0);
        assert_eq!(table.distance("chr1"), Some(0));
    }

    #[test]
    fn test_write_table() {
        let mut genome = Genome::new();
        genome.insert("chrM".to_string(), 16_569);
        genome.insert("chr2".to_string(), 500_000);

        let mut out = Vec::new();
        PaddingTable::from_genome(&genome, &PaddingSchedule::default())
            .write(&mut out)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "chrM\t0.1\t1656\nchr2\t0.05\t25000\n"
        );
    }
}
