//! Peak-to-annotation overlap queries.
//!
//! `find_overlaps` is the plain scan over a candidate list. `AnnotationIndex`
//! groups one annotation file by chromosome and sorts each group by start, so
//! a query can binary-search past candidates that cannot reach the peak and
//! stop as soon as candidates start beyond it.

use crate::interval::{classify, Interval, Span};
use crate::records::Record;
use rustc_hash::FxHashMap;

/// Candidate span grown by `wiggle` on both sides (floored at zero).
#[inline]
fn wiggled(span: Span, wiggle: u64) -> Span {
    Span::new(span.start.saturating_sub(wiggle), span.end.saturating_add(wiggle))
}

/// Find every candidate whose wiggle-padded span overlaps `peak`.
///
/// Candidates on other chromosomes are skipped. When `sorted` is true the
/// candidates must be grouped by chromosome and ascending by start within a
/// chromosome; the scan then stops at the first same-chromosome candidate
/// whose padded start lies beyond `peak.end`. Matches keep candidate order.
pub fn find_overlaps<'a>(
    peak: &Interval,
    candidates: &'a [Record],
    wiggle: u64,
    sorted: bool,
) -> Vec<&'a Record> {
    let peak_span = peak.span();
    let mut matches = Vec::new();

    for candidate in candidates {
        if candidate.chrom() != peak.chrom {
            continue;
        }
        let region = wiggled(candidate.span(), wiggle);
        if classify(region, peak_span, 0, u64::MAX).is_overlap() {
            matches.push(candidate);
        } else if sorted && region.start > peak_span.end {
            break;
        }
    }

    matches
}

struct ChromGroup {
    records: Vec<Record>,
    /// Longest record span in the group
    max_len: u64,
}

/// Annotation records grouped by chromosome, each group sorted by start.
#[derive(Default)]
pub struct AnnotationIndex {
    groups: FxHashMap<String, ChromGroup>,
    len: usize,
}

impl AnnotationIndex {
    /// Build an index from records in file order.
    pub fn from_records(records: Vec<Record>) -> Self {
        let len = records.len();
        let mut by_chrom: FxHashMap<String, Vec<Record>> = FxHashMap::default();
        for record in records {
            by_chrom
                .entry(record.chrom().to_string())
                .or_default()
                .push(record);
        }

        let groups = by_chrom
            .into_iter()
            .map(|(chrom, mut records)| {
                // stable: equal starts keep file order
                records.sort_by_key(|r| r.start());
                let max_len = records.iter().map(|r| r.span().len()).max().unwrap_or(0);
                (chrom, ChromGroup { records, max_len })
            })
            .collect();

        Self { groups, len }
    }

    /// The sorted slice of same-chromosome candidates that may reach `peak`.
    pub fn candidates(&self, peak: &Interval, wiggle: u64) -> &[Record] {
        let Some(group) = self.groups.get(&peak.chrom) else {
            return &[];
        };
        // A candidate starting at s ends at or before s + max_len, so its
        // padded end is below peak.start while s + max_len + wiggle is.
        let reach = group.max_len.saturating_add(wiggle);
        let first = group
            .records
            .partition_point(|r| r.start().saturating_add(reach) < peak.start);
        &group.records[first..]
    }

    /// All records whose wiggle-padded span overlaps `peak`, ascending by start.
    pub fn query(&self, peak: &Interval, wiggle: u64) -> Vec<&Record> {
        find_overlaps(peak, self.candidates(peak, wiggle), wiggle, true)
    }

    /// Total number of indexed records.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get all chromosomes in the index.
    pub fn chromosomes(&self) -> impl Iterator<Item = &String> {
        self.groups.keys()
    }
}
