//! Plot-region merging across peak files.
//!
//! Each source's intervals are padded, grown against the intervals of every
//! other source, merged with the source's own previous region, then all
//! sources are unioned per chromosome and coalesced into a sorted,
//! strictly disjoint region list.

use crate::config::{FileType, RecordLayout};
use crate::genome::Genome;
use crate::interval::{classify, Span, Verdict};
use crate::output::RegionWriter;
use crate::padding::{PaddingSchedule, PaddingTable};
use crate::parallel::{group_by_chromosome, process_chromosomes};
use crate::records::{RecordError, RecordReader, Result};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// The intervals of one input source, grouped by chromosome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRegions {
    /// Source identifier (file path); sources are ordered by it.
    pub id: String,
    pub by_chrom: FxHashMap<String, Vec<Span>>,
}

impl SourceRegions {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            by_chrom: FxHashMap::default(),
        }
    }

    /// Build from (chrom, start, end) triples in file order.
    pub fn from_triples<'a, I>(id: impl Into<String>, triples: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, u64, u64)>,
    {
        let mut source = Self::new(id);
        for (chrom, start, end) in triples {
            source.push(chrom, Span::new(start, end));
        }
        source
    }

    /// Read every record of a file.
    pub fn from_path(path: &Path, layout: RecordLayout) -> Result<Self> {
        let reader = RecordReader::from_path(path, layout)?;
        let id = reader.origin().to_string();
        let intervals = reader
            .records()
            .map(|r| r.map(|record| record.interval))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            id,
            by_chrom: group_by_chromosome(intervals),
        })
    }

    pub fn push(&mut self, chrom: &str, span: Span) {
        self.by_chrom.entry(chrom.to_string()).or_default().push(span);
    }

    /// Spans on a chromosome; empty when the source has none there.
    pub fn get(&self, chrom: &str) -> &[Span] {
        self.by_chrom.get(chrom).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sort every chromosome's spans by start (then end).
    pub fn sort_by_start(&mut self) {
        for spans in self.by_chrom.values_mut() {
            spans.sort_unstable();
        }
    }

    pub fn chromosomes(&self) -> impl Iterator<Item = &String> {
        self.by_chrom.keys()
    }

    /// Total number of spans across chromosomes.
    pub fn len(&self) -> usize {
        self.by_chrom.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Final merged regions: per chromosome, sorted and strictly disjoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedRegions {
    by_chrom: FxHashMap<String, Vec<Span>>,
}

impl MergedRegions {
    pub fn get(&self, chrom: &str) -> Option<&[Span]> {
        self.by_chrom.get(chrom).map(Vec::as_slice)
    }

    pub fn chromosomes(&self) -> impl Iterator<Item = &String> {
        self.by_chrom.keys()
    }

    /// Number of chromosomes with an entry.
    pub fn len(&self) -> usize {
        self.by_chrom.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_chrom.is_empty()
    }

    /// Total number of regions.
    pub fn region_count(&self) -> usize {
        self.by_chrom.values().map(Vec::len).sum()
    }

    /// Entries in genome file order.
    pub fn iter_in<'a>(&'a self, genome: &'a Genome) -> impl Iterator<Item = (&'a str, &'a [Span])> {
        genome
            .chromosomes()
            .filter_map(move |chrom| self.get(chrom).map(|spans| (chrom.as_str(), spans)))
    }

    /// Write `chrom, start, end` lines grouped by chromosome in genome order.
    pub fn write<W: Write>(&self, genome: &Genome, output: W) -> Result<()> {
        let mut writer = RegionWriter::new(output);
        for (chrom, spans) in self.iter_in(genome) {
            for span in spans {
                writer.write_region(chrom, span.start, span.end)?;
            }
        }
        writer.flush()
    }
}

/// Fold `span` into the accepted list: drop it if the last region already
/// contains it, grow the last region if they overlap, else append.
#[inline]
fn absorb(accepted: &mut Vec<Span>, span: Span, pad: u64, chrom_max: u64) {
    let verdict = accepted
        .last()
        .map(|&last| classify(span, last, pad, chrom_max));
    match verdict {
        None | Some(Verdict::Disjoint) => accepted.push(span),
        Some(Verdict::Contained) => {}
        Some(v) => {
            if let (Some(grown), Some(last)) = (v.extended(), accepted.last_mut()) {
                *last = grown;
            }
        }
    }
}

/// Coalesce spans sorted by start into a sorted, strictly disjoint list.
/// Spans sharing an endpoint are merged.
pub fn coalesce(spans: &[Span], chrom_max: u64) -> Vec<Span> {
    debug_assert!(spans.windows(2).all(|w| w[0].start <= w[1].start));
    let mut accepted = Vec::with_capacity(spans.len());
    for &span in spans {
        absorb(&mut accepted, span, 0, chrom_max);
    }
    accepted
}

/// Grows, unions and coalesces regions from several sources.
pub struct RegionMerger<'a> {
    genome: &'a Genome,
    padding: &'a PaddingTable,
}

impl<'a> RegionMerger<'a> {
    pub fn new(genome: &'a Genome, padding: &'a PaddingTable) -> Self {
        Self { genome, padding }
    }

    /// Run the whole merge.
    ///
    /// Sources are put in identifier order and each source's spans sorted by
    /// start first, so the result does not depend on argument order.
    pub fn merge(&self, mut sources: Vec<SourceRegions>) -> Result<MergedRegions> {
        sources.sort_by(|a, b| a.id.cmp(&b.id));
        for source in &mut sources {
            source.sort_by_start();
        }
        self.validate(&sources)?;

        let grown = self.grow_sources(&sources)?;
        let unioned = union_sources(grown);
        self.coalesce_all(unioned)
    }

    /// Every span must lie on a known chromosome. Spans running past the
    /// chromosome end are clamped when padded.
    fn validate(&self, sources: &[SourceRegions]) -> Result<()> {
        for source in sources {
            for (chrom, spans) in &source.by_chrom {
                let overruns = self.genome.overruns(chrom, spans, &source.id)?;
                if overruns > 0 {
                    log::warn!(
                        "{}: {} intervals on {} extend past the chromosome end; clamping",
                        source.id,
                        overruns,
                        chrom
                    );
                }
            }
        }
        Ok(())
    }

    /// Padding distance and length of a chromosome.
    fn bounds(&self, chrom: &str, origin: &str) -> Result<(u64, u64)> {
        let chrom_max = self.genome.size_of(chrom, origin)?;
        let pad = self
            .padding
            .distance(chrom)
            .ok_or_else(|| RecordError::UnknownChromosome {
                chrom: chrom.to_string(),
                origin: origin.to_string(),
            })?;
        Ok((pad, chrom_max))
    }

    /// Per-source padded regions, grown against every other source.
    /// `sources` must already be canonically ordered and sorted.
    pub fn grow_sources(&self, sources: &[SourceRegions]) -> Result<Vec<SourceRegions>> {
        (0..sources.len())
            .into_par_iter()
            .map(|i| self.grow_source(i, sources))
            .collect()
    }

    fn grow_source(&self, current: usize, sources: &[SourceRegions]) -> Result<SourceRegions> {
        let source = &sources[current];
        let mut grown = SourceRegions::new(source.id.clone());

        for (chrom, spans) in &source.by_chrom {
            let (pad, chrom_max) = self.bounds(chrom, &source.id)?;
            let mut accepted: Vec<Span> = Vec::with_capacity(spans.len());

            for raw in spans {
                let mut holder = raw.padded(pad, chrom_max);

                for (j, other) in sources.iter().enumerate() {
                    if j == current {
                        continue;
                    }
                    for &candidate in other.get(chrom) {
                        let verdict = classify(candidate, holder, pad, chrom_max);
                        if let Some(extended) = verdict.extended() {
                            holder = extended;
                        } else if verdict == Verdict::Disjoint && candidate.start > holder.end {
                            // sorted by start: nothing later can reach the holder
                            break;
                        }
                    }
                }

                absorb(&mut accepted, holder, pad, chrom_max);
            }

            log::debug!(
                "{}: {} -> {} padded regions on {}",
                source.id,
                spans.len(),
                accepted.len(),
                chrom
            );
            grown.by_chrom.insert(chrom.clone(), accepted);
        }

        Ok(grown)
    }

    /// Coalesce every chromosome of the union.
    pub fn coalesce_all(&self, unioned: FxHashMap<String, Vec<Span>>) -> Result<MergedRegions> {
        let merged = process_chromosomes(unioned, |chrom, spans| {
            let chrom_max = self.genome.size_of(chrom, "merged regions")?;
            Ok::<_, RecordError>(coalesce(&spans, chrom_max))
        })?;
        Ok(MergedRegions {
            by_chrom: merged.into_iter().collect(),
        })
    }
}

/// Union every source's regions per chromosome, sorted by start.
///
/// All sources are treated alike: any chromosome seen in any source is
/// present in the result.
pub fn union_sources(sources: Vec<SourceRegions>) -> FxHashMap<String, Vec<Span>> {
    let mut unioned: FxHashMap<String, Vec<Span>> = FxHashMap::default();
    for source in sources {
        for (chrom, spans) in source.by_chrom {
            unioned.entry(chrom).or_default().extend(spans);
        }
    }
    for spans in unioned.values_mut() {
        spans.sort_unstable();
    }
    unioned
}

/// Regions command configuration.
#[derive(Debug, Clone, Default)]
pub struct RegionsCommand {
    /// Padding step function
    pub schedule: PaddingSchedule,
    /// Explicit input format; inferred from each file's extension when unset
    pub file_type: Option<FileType>,
    /// Field delimiter of the inputs
    pub delimiter: Option<u8>,
}

impl RegionsCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schedule(mut self, schedule: PaddingSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_file_type(mut self, file_type: Option<FileType>) -> Self {
        self.file_type = file_type;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    fn layout_for(&self, path: &Path) -> Result<RecordLayout> {
        let file_type = self
            .file_type
            .or_else(|| FileType::from_path(path))
            .ok_or_else(|| {
                RecordError::InvalidArgument(format!(
                    "cannot infer the format of {}; pass --file-type",
                    path.display()
                ))
            })?;
        let layout = file_type.layout();
        Ok(match self.delimiter {
            Some(d) => layout.with_delimiter(d),
            None => layout,
        })
    }

    /// Read every input file as one source.
    pub fn load_sources(&self, inputs: &[PathBuf]) -> Result<Vec<SourceRegions>> {
        if inputs.is_empty() {
            return Err(RecordError::InvalidArgument(
                "at least one input file is required".to_string(),
            ));
        }
        inputs
            .iter()
            .map(|path| {
                let source = SourceRegions::from_path(path, self.layout_for(path)?)?;
                log::info!("Read {} peaks from {}", source.len(), source.id);
                Ok(source)
            })
            .collect()
    }

    /// Merge regions from in-memory sources.
    pub fn merge(&self, sources: Vec<SourceRegions>, genome: &Genome) -> Result<MergedRegions> {
        let padding = PaddingTable::from_genome(genome, &self.schedule);
        RegionMerger::new(genome, &padding).merge(sources)
    }

    /// Read the inputs, merge, and write the regions.
    pub fn run<W: Write>(&self, inputs: &[PathBuf], genome: &Genome, output: W) -> Result<MergedRegions> {
        let sources = self.load_sources(inputs)?;
        let merged = self.merge(sources, genome)?;
        log::info!(
            "Merged into {} regions on {} chromosomes",
            merged.region_count(),
            merged.len()
        );
        merged.write(genome, output)?;
        Ok(merged)
    }
}
