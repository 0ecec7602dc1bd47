//! Command implementations for crunkit.

pub mod annotate;
pub mod filter;
pub mod genome;
pub mod peak_max;
pub mod regions;

pub use annotate::{experiment_title, AnnotateCommand, AnnotationSet, MatchRecord};
pub use filter::{FilterCommand, FilterStats, Threshold};
pub use genome::{count_fasta, GenomeCommand, SequenceLength};
pub use peak_max::PeakMaxCommand;
pub use regions::{
    coalesce, union_sources, MergedRegions, RegionMerger, RegionsCommand, SourceRegions,
};
