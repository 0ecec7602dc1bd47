// Clippy allows for the whole crate
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

//! crunkit: peak-region comparison and merging toolkit
//!
//! This library compares and merges genomic intervals from peak-calling runs.
//!
//! # Features
//!
//! - **Interval comparison**: one classifier drives both merging and matching
//! - **Region merging**: grows and unions regions across sources, padded per chromosome
//! - **Peak annotation**: reports annotations within a wiggle margin of each peak
//! - **Parallel processing**: Uses Rayon per chromosome and per peak, with deterministic output
//!
//! # Example
//!
//! ```rust,no_run
//! use crunkit::{commands::RegionsCommand, genome::Genome};
//! use std::path::PathBuf;
//!
//! let genome = Genome::from_file("hg38.genome").unwrap();
//! let inputs = vec![PathBuf::from("a.narrowPeak"), PathBuf::from("b.narrowPeak")];
//!
//! let merged = RegionsCommand::new()
//!     .run(&inputs, &genome, std::io::stdout())
//!     .unwrap();
//! eprintln!("{} regions", merged.region_count());
//! ```

pub mod commands;
pub mod config;
pub mod genome;
pub mod index;
pub mod interval;
pub mod output;
pub mod padding;
pub mod parallel;
pub mod parsing;
pub mod records;

// Re-export commonly used types
pub use genome::Genome;
pub use index::{find_overlaps, AnnotationIndex};
pub use interval::{classify, Interval, Span, Verdict};
pub use records::{read_records, Record, RecordError, RecordReader};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::commands::{
        AnnotateCommand, FilterCommand, GenomeCommand, PeakMaxCommand, RegionMerger,
        RegionsCommand, SourceRegions, Threshold,
    };
    pub use crate::config::{FileType, RecordLayout};
    pub use crate::genome::Genome;
    pub use crate::index::AnnotationIndex;
    pub use crate::interval::{classify, Interval, Span, Verdict};
    pub use crate::padding::{PaddingSchedule, PaddingTable};
    pub use crate::records::{read_records, Record, RecordError, RecordReader};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_basic_workflow() {
        use crate::commands::{RegionMerger, SourceRegions};
        use crate::genome::Genome;
        use crate::padding::PaddingTable;

        let genome = Genome::from_reader("chr1\t10000\n".as_bytes(), "<memory>").unwrap();
        let padding = PaddingTable::uniform(&genome, 0);
        let a = SourceRegions::from_triples("a", [("chr1", 100, 200), ("chr1", 300, 400)]);
        let b = SourceRegions::from_triples("b", [("chr1", 150, 250)]);

        let merged = RegionMerger::new(&genome, &padding).merge(vec![a, b]).unwrap();
        let spans = merged.get("chr1").unwrap();

        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].start, 100);
        assert_eq!(spans[0].end, 250);
    }

    #[test]
    fn test_annotate_workflow() {
        use crate::config::RecordLayout;
        use crate::index::AnnotationIndex;
        use crate::interval::Interval;
        use crate::records::parse_records;

        let annotations =
            parse_records("chr1\t100\t200\nchr1\t5000\t6000\n", RecordLayout::new(0, 1, 2)).unwrap();
        let index = AnnotationIndex::from_records(annotations);

        let hits = index.query(&Interval::new("chr1", 250, 300), 100);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].start(), 100);
    }
}
