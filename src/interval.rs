//! Core interval types and the closed-interval comparator.
//!
//! Coordinates are compared with closed-interval semantics: two spans that
//! share an endpoint overlap.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A coordinate pair on a single chromosome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: u64,
    pub end: u64,
}

impl Span {
    #[inline]
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of bases between start and end.
    #[inline]
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// True when the two spans share at least one coordinate.
    #[inline]
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// True when `other` lies entirely within this span.
    #[inline]
    pub fn contains(&self, other: &Span) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// Grow both ends by `pad`, clamped to `[0, chrom_max]`.
    #[inline]
    pub fn padded(&self, pad: u64, chrom_max: u64) -> Span {
        clamp(
            self.start.saturating_sub(pad),
            self.end.saturating_add(pad),
            chrom_max,
        )
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Relationship of a subject span to a reference span.
///
/// The four overlap variants carry the grown span the caller should adopt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Subject lies entirely within the reference.
    Contained,
    /// Subject starts inside the reference and ends past it.
    ExtendRight(Span),
    /// Subject starts before the reference and ends inside it.
    ExtendLeft(Span),
    /// Reference lies entirely within the subject.
    Superset(Span),
    /// No shared coordinate, in either direction.
    Disjoint,
}

impl Verdict {
    /// True for every verdict except `Disjoint`.
    #[inline]
    pub fn is_overlap(&self) -> bool {
        !matches!(self, Verdict::Disjoint)
    }

    /// The grown span for the extend/superset verdicts.
    #[inline]
    pub fn extended(&self) -> Option<Span> {
        match *self {
            Verdict::ExtendRight(span) | Verdict::ExtendLeft(span) | Verdict::Superset(span) => {
                Some(span)
            }
            Verdict::Contained | Verdict::Disjoint => None,
        }
    }
}

#[inline]
fn clamp(begin: u64, end: u64, chrom_max: u64) -> Span {
    Span::new(begin.min(chrom_max), end.min(chrom_max))
}

/// Classify `subject` against `reference`.
///
/// Both spans must lie on the same chromosome and have `start <= end`.
/// `pad` is added to whichever subject end protrudes; every produced bound is
/// clamped to `[0, chrom_max]`.
///
/// # Panics
///
/// Panics if either span has `start > end`.
#[inline]
pub fn classify(subject: Span, reference: Span, pad: u64, chrom_max: u64) -> Verdict {
    assert!(
        subject.start <= subject.end,
        "subject span {} has start > end",
        subject
    );
    assert!(
        reference.start <= reference.end,
        "reference span {} has start > end",
        reference
    );

    let starts_inside = subject.start >= reference.start && subject.start <= reference.end;
    let ends_inside = subject.end >= reference.start && subject.end <= reference.end;

    if starts_inside && ends_inside {
        Verdict::Contained
    } else if starts_inside {
        // subject.end > reference.end
        Verdict::ExtendRight(clamp(
            reference.start,
            subject.end.saturating_add(pad),
            chrom_max,
        ))
    } else if subject.start < reference.start && ends_inside {
        Verdict::ExtendLeft(clamp(
            subject.start.saturating_sub(pad),
            reference.end,
            chrom_max,
        ))
    } else if subject.start < reference.start && subject.end > reference.end {
        Verdict::Superset(subject.padded(pad, chrom_max))
    } else {
        Verdict::Disjoint
    }
}

/// A genomic interval: chromosome plus a closed coordinate range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interval {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

impl Interval {
    /// Create a new interval.
    #[inline]
    pub fn new(chrom: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            end,
        }
    }

    /// The coordinate pair without the chromosome.
    #[inline]
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }

    /// Returns the length of the interval.
    #[inline]
    pub fn len(&self) -> u64 {
        self.span().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.span().is_empty()
    }

    /// Closed-interval overlap on the same chromosome.
    #[inline]
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.chrom == other.chrom && self.span().overlaps(&other.span())
    }

    /// Classify this interval against `reference`.
    ///
    /// # Panics
    ///
    /// Panics if the chromosomes differ or either interval is inverted.
    pub fn classify(&self, reference: &Interval, pad: u64, chrom_max: u64) -> Verdict {
        assert_eq!(
            self.chrom, reference.chrom,
            "classify called across chromosomes"
        );
        classify(self.span(), reference.span(), pad, chrom_max)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.chrom, self.start, self.end)
    }
}

/// Parse a `chrom:start-end` region.
impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || format!("region must look like chrom:start-end, got '{}'", s);
        let (chrom, range) = s.rsplit_once(':').ok_or_else(malformed)?;
        let (start, end) = range.split_once('-').ok_or_else(malformed)?;
        if chrom.is_empty() {
            return Err(malformed());
        }
        let start: u64 = start.trim().replace(',', "").parse().map_err(|_| malformed())?;
        let end: u64 = end.trim().replace(',', "").parse().map_err(|_| malformed())?;
        if start > end {
            return Err(format!("region start {} is greater than end {}", start, end));
        }
        Ok(Interval::new(chrom, start, end))
    }
}

impl Ord for Interval {
    fn cmp(&self, other: &Self) -> Ordering {
        self.chrom
            .cmp(&other.chrom)
            .then(self.start.cmp(&other.start))
            .then(self.end.cmp(&other.end))
    }
}

impl PartialOrd for Interval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
