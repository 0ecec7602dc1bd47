//! Immutable configuration values shared by the commands.
//!
//! File-format layouts describe where the chromosome and coordinate columns
//! live and which columns are echoed into match tables. They are plain values
//! handed to each call; nothing here is global or mutable.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Default wiggle margin (bases) for peak/annotation matching.
pub const DEFAULT_WIGGLE: u64 = 1000;

/// Default q-value cutoff for MACS3 filtering.
pub const DEFAULT_QVALUE: f64 = 0.01;

/// Padding factor for chromosomes longer than every schedule threshold.
pub const DEFAULT_PADDING_FACTOR: f64 = 0.001;

/// Default field delimiter.
pub const DEFAULT_DELIMITER: u8 = b'\t';

/// Directory name fragments that mark an experiment folder.
pub const TITLE_MARKERS: &[&str] = &[
    "_exp_",
    "_exper_",
    "_experiment_",
    "_rep_",
    "_replicate_",
    "_enrich_",
    "_enrichment_",
];

/// Supported interval file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// MACS3 / ENCODE narrowPeak (BED6+4)
    NarrowPeak,
    /// MACS3 peak table (`_peaks.xls`)
    Xls,
    /// BED annotation file
    Bed,
    /// bedGraph signal track
    BedGraph,
}

impl FileType {
    /// Infer the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "narrowpeak" => Some(FileType::NarrowPeak),
            "xls" => Some(FileType::Xls),
            "bed" => Some(FileType::Bed),
            "bg" | "bdg" | "bedgraph" => Some(FileType::BedGraph),
            _ => None,
        }
    }

    /// Infer the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn name(self) -> &'static str {
        match self {
            FileType::NarrowPeak => "narrowPeak",
            FileType::Xls => "xls",
            FileType::Bed => "bed",
            FileType::BedGraph => "bedgraph",
        }
    }

    /// 0-based column holding the signal value, for formats that carry one.
    pub fn value_column(self) -> Option<usize> {
        match self {
            FileType::BedGraph => Some(3),
            FileType::NarrowPeak => Some(6),
            FileType::Xls | FileType::Bed => None,
        }
    }

    /// Column layout for this format, tab-delimited.
    pub fn layout(self) -> RecordLayout {
        match self {
            FileType::NarrowPeak => RecordLayout::new(0, 1, 2).with_columns(&[
                (0, "chrom"),
                (1, "chromStart"),
                (2, "chromEnd"),
                (6, "signalValue"),
                (7, "pValue (-log base 10)"),
                (8, "qValue (-log base 10)"),
                (9, "peak"),
            ]),
            FileType::Xls => RecordLayout::new(0, 1, 2)
                .with_columns(&[
                    (0, "chrom"),
                    (1, "chromStart"),
                    (2, "chromEnd"),
                    (5, "peak_position"),
                    (6, "pValue (-log base 10)"),
                    (7, "fold_enrichment"),
                    (8, "qValue (-log base 10)"),
                ])
                .with_header(true),
            FileType::Bed => RecordLayout::new(0, 1, 2).with_columns(&[
                (0, "chrom"),
                (1, "chromStart"),
                (2, "chromEnd"),
                (3, "identifier"),
                (5, "strandedness"),
                (6, "annotation_type"),
            ]),
            FileType::BedGraph => RecordLayout::new(0, 1, 2).with_columns(&[
                (0, "chrom"),
                (1, "chromStart"),
                (2, "chromEnd"),
                (3, "dataValue"),
            ]),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim_start_matches('.'))
            .ok_or_else(|| format!("unknown file type '{}' (narrowPeak, xls, bed, bedgraph)", s))
    }
}

/// Where the interval fields live in a delimited record, and which columns
/// are echoed when the record is formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    pub chrom_col: usize,
    pub start_col: usize,
    pub end_col: usize,
    /// Display columns (index, header name), ascending by index.
    pub columns: Vec<(usize, &'static str)>,
    pub delimiter: u8,
    /// A single header line may precede the data.
    pub header: bool,
}

impl RecordLayout {
    /// Layout with the given interval columns and no display columns.
    pub fn new(chrom_col: usize, start_col: usize, end_col: usize) -> Self {
        Self {
            chrom_col,
            start_col,
            end_col,
            columns: Vec::new(),
            delimiter: DEFAULT_DELIMITER,
            header: false,
        }
    }

    pub fn with_columns(mut self, columns: &[(usize, &'static str)]) -> Self {
        self.columns = columns.to_vec();
        self.columns.sort_by_key(|&(idx, _)| idx);
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    /// Minimum number of fields a data line must carry.
    pub fn min_fields(&self) -> usize {
        self.chrom_col.max(self.start_col).max(self.end_col) + 1
    }

    /// Index of the display column with the given header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .find(|(_, n)| *n == name)
            .map(|&(idx, _)| idx)
    }

    /// Header names joined by the delimiter.
    pub fn header_line(&self) -> String {
        let delim = self.delimiter as char;
        let names: Vec<&str> = self.columns.iter().map(|&(_, name)| name).collect();
        names.join(&delim.to_string())
    }

    /// Display columns of `fields` joined by the delimiter. Columns the
    /// record lacks are written as `-`.
    pub fn format_fields<S: AsRef<str>>(&self, fields: &[S]) -> String {
        let mut out = String::new();
        for (i, &(idx, _)) in self.columns.iter().enumerate() {
            if i > 0 {
                out.push(self.delimiter as char);
            }
            out.push_str(fields.get(idx).map(|f| f.as_ref()).unwrap_or("-"));
        }
        out
    }
}

/// Parse a delimiter argument: a single ASCII character, `\t` or `tab`.
pub fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s {
        "\\t" | "tab" | "\t" => Ok(b'\t'),
        _ => {
            let bytes = s.as_bytes();
            if bytes.len() == 1 && bytes[0].is_ascii() && bytes[0] != b'\n' {
                Ok(bytes[0])
            } else {
                Err(format!("delimiter must be a single ASCII character, got '{}'", s))
            }
        }
    }
}
