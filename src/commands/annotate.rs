//! Annotate command implementation.
//!
//! Reports every annotation record lying within a wiggle margin of each peak,
//! tagged with the experiment title of the peak file.

use crate::config::{FileType, RecordLayout, DEFAULT_DELIMITER, DEFAULT_WIGGLE, TITLE_MARKERS};
use crate::index::AnnotationIndex;
use crate::interval::Interval;
use crate::output::RegionWriter;
use crate::records::{read_records, Record, RecordError, Result};
use rayon::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One peak/annotation overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    /// The matched annotation's interval, used for ordering
    pub interval: Interval,
    /// Annotation display columns
    pub annotation: String,
    /// Experiment title of the peak file
    pub title: String,
    /// Peak display columns
    pub peak: String,
}

impl MatchRecord {
    /// The three parts joined by `delimiter`.
    pub fn to_line(&self, delimiter: u8) -> String {
        let delim = delimiter as char;
        format!("{}{}{}{}{}", self.annotation, delim, self.title, delim, self.peak)
    }
}

/// One annotation file, indexed.
pub struct AnnotationSet {
    pub origin: String,
    pub layout: RecordLayout,
    pub index: AnnotationIndex,
}

impl AnnotationSet {
    /// Index a file's records, keeping only those whose `annotation_type`
    /// column is one of `features` (all records when `features` is empty).
    pub fn from_records(
        origin: impl Into<String>,
        layout: RecordLayout,
        records: Vec<Record>,
        features: &[String],
    ) -> Result<Self> {
        let origin = origin.into();
        let records = if features.is_empty() {
            records
        } else {
            let column = layout.column_index("annotation_type").ok_or_else(|| {
                RecordError::InvalidArgument(format!(
                    "{} has no annotation_type column to filter on",
                    origin
                ))
            })?;
            records
                .into_iter()
                .filter(|r| r.field(column).is_some_and(|f| features.iter().any(|x| x == f)))
                .collect()
        };

        Ok(Self {
            origin,
            layout,
            index: AnnotationIndex::from_records(records),
        })
    }
}

/// Find the experiment title in a path: the first directory component
/// containing one of `markers`, trying markers in order.
pub fn experiment_title<S: AsRef<str>>(path: &Path, markers: &[S]) -> Option<String> {
    let folders: Vec<&str> = path
        .parent()
        .into_iter()
        .flat_map(|p| p.components())
        .filter_map(|c| c.as_os_str().to_str())
        .collect();

    markers.iter().find_map(|marker| {
        folders
            .iter()
            .find(|folder| folder.contains(marker.as_ref()))
            .map(|folder| folder.to_string())
    })
}

/// Annotate command configuration.
#[derive(Debug, Clone)]
pub struct AnnotateCommand {
    /// Margin added to both ends of each annotation before testing overlap
    pub wiggle: u64,
    /// Field delimiter for inputs and output
    pub delimiter: u8,
    /// Peak file format; inferred from the extension when unset
    pub peak_type: Option<FileType>,
    /// Annotation file format; inferred from the extension when unset
    pub annotation_type: Option<FileType>,
    /// Keep only annotations of these types
    pub features: Vec<String>,
    /// Title for every peak file, overriding directory detection
    pub title: Option<String>,
    /// Directory fragments that mark an experiment folder
    pub title_markers: Vec<String>,
}

impl Default for AnnotateCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotateCommand {
    pub fn new() -> Self {
        Self {
            wiggle: DEFAULT_WIGGLE,
            delimiter: DEFAULT_DELIMITER,
            peak_type: None,
            annotation_type: None,
            features: Vec::new(),
            title: None,
            title_markers: TITLE_MARKERS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_wiggle(mut self, wiggle: u64) -> Self {
        self.wiggle = wiggle;
        self
    }

    fn layout_for(&self, path: &Path, explicit: Option<FileType>) -> Result<RecordLayout> {
        let file_type = explicit.or_else(|| FileType::from_path(path)).ok_or_else(|| {
            RecordError::InvalidArgument(format!(
                "cannot infer the format of {}",
                path.display()
            ))
        })?;
        Ok(file_type.layout().with_delimiter(self.delimiter))
    }

    /// The one layout shared by `paths`. The table has a single header, so
    /// mixing formats on one side is rejected.
    fn shared_layout(&self, paths: &[PathBuf], explicit: Option<FileType>) -> Result<RecordLayout> {
        let mut layouts = paths
            .iter()
            .map(|path| self.layout_for(path, explicit).map(|layout| (path, layout)));
        let (first_path, first_layout) = match layouts.next() {
            Some(result) => result?,
            None => {
                return Err(RecordError::InvalidArgument(
                    "no input files given".to_string(),
                ))
            }
        };
        for result in layouts {
            let (path, layout) = result?;
            if layout != first_layout {
                return Err(RecordError::InvalidArgument(format!(
                    "{} and {} have different formats; pass files of one format per side",
                    first_path.display(),
                    path.display()
                )));
            }
        }
        Ok(first_layout)
    }

    /// Title for a peak file: explicit, else from its directories, else its stem.
    pub fn title_for(&self, path: &Path) -> String {
        if let Some(title) = &self.title {
            return title.clone();
        }
        experiment_title(path, &self.title_markers[..]).unwrap_or_else(|| {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            log::warn!(
                "No experiment folder in {}; using '{}' as title",
                path.display(),
                stem
            );
            stem
        })
    }

    /// Load and index annotation files, in path order.
    pub fn load_annotations(&self, paths: &[PathBuf]) -> Result<Vec<AnnotationSet>> {
        let mut paths = paths.to_vec();
        paths.sort();
        let layout = self.shared_layout(&paths, self.annotation_type)?;
        paths
            .iter()
            .map(|path| {
                let records = read_records(path, layout.clone())?;
                let set = AnnotationSet::from_records(
                    path.display().to_string(),
                    layout.clone(),
                    records,
                    &self.features,
                )?;
                log::info!("Indexed {} annotations from {}", set.index.len(), set.origin);
                Ok(set)
            })
            .collect()
    }

    /// Matches for one peak against every annotation set, in set order.
    pub fn match_peak(
        &self,
        peak: &Record,
        peak_layout: &RecordLayout,
        title: &str,
        annotations: &[AnnotationSet],
    ) -> Vec<MatchRecord> {
        let formatted_peak = peak.format(peak_layout);
        let mut matches = Vec::new();
        for set in annotations {
            for hit in set.index.query(&peak.interval, self.wiggle) {
                matches.push(MatchRecord {
                    interval: hit.interval.clone(),
                    annotation: hit.format(&set.layout),
                    title: title.to_string(),
                    peak: formatted_peak.clone(),
                });
            }
        }
        matches
    }

    /// Matches for every record of one peak file.
    pub fn match_file(&self, path: &Path, annotations: &[AnnotationSet]) -> Result<Vec<MatchRecord>> {
        let layout = self.layout_for(path, self.peak_type)?;
        let peaks = read_records(path, layout.clone())?;
        let title = self.title_for(path);
        log::info!(
            "Finding annotations that overlap {} peaks from {}",
            peaks.len(),
            path.display()
        );

        let per_peak: Vec<Vec<MatchRecord>> = peaks
            .par_iter()
            .map(|peak| self.match_peak(peak, &layout, &title, annotations))
            .collect();
        Ok(per_peak.into_iter().flatten().collect())
    }

    /// Header: annotation columns, `exp_title`, peak columns.
    pub fn header(&self, annotations: &[AnnotationSet], peak_layout: &RecordLayout) -> String {
        let delim = (self.delimiter as char).to_string();
        let annotation_header = annotations
            .first()
            .map(|set| set.layout.header_line())
            .unwrap_or_default();
        [annotation_header, "exp_title".to_string(), peak_layout.header_line()].join(&delim)
    }

    /// Match every peak file against every annotation file and write the
    /// table, sorted by annotation chromosome then start. Returns the number
    /// of matches written.
    pub fn run<W: Write>(&self, peaks: &[PathBuf], annotations: &[PathBuf], output: W) -> Result<usize> {
        if peaks.is_empty() || annotations.is_empty() {
            return Err(RecordError::InvalidArgument(
                "at least one peak file and one annotation file are required".to_string(),
            ));
        }
        let mut peak_paths = peaks.to_vec();
        peak_paths.sort();
        let peak_layout = self.shared_layout(&peak_paths, self.peak_type)?;
        let sets = self.load_annotations(annotations)?;

        let mut matches = Vec::new();
        for path in &peak_paths {
            matches.extend(self.match_file(path, &sets)?);
        }
        // stable: ties keep peak order
        matches.sort_by(|a, b| {
            a.interval
                .chrom
                .cmp(&b.interval.chrom)
                .then(a.interval.start.cmp(&b.interval.start))
        });

        let mut writer = RegionWriter::with_delimiter(output, self.delimiter);
        writer.write_line(&self.header(&sets, &peak_layout))?;
        for m in &matches {
            writer.write_line(&m.to_line(self.delimiter))?;
        }
        writer.flush()?;

        log::info!("Wrote {} peak/annotation matches", matches.len());
        Ok(matches.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::parse_records;

    fn annotation_set(content: &str, features: &[String]) -> AnnotationSet {
        let layout = FileType::Bed.layout();
        let records = parse_records(content, layout.clone()).unwrap();
        AnnotationSet::from_records("genes.bed", layout, records, features).unwrap()
    }

    #[test]
    fn test_experiment_title() {
        let path = Path::new("/data/run_exp_h3k4/macs3_out/modified_peakfiles/a.xls");
        assert_eq!(
            experiment_title(path, TITLE_MARKERS),
            Some("run_exp_h3k4".to_string())
        );
        assert_eq!(experiment_title(Path::new("/data/plain/a.xls"), TITLE_MARKERS), None);
    }

    #[test]
    fn test_title_markers_tried_in_order() {
        let path = Path::new("/x_rep_1/y_exp_2/peaks.xls");
        assert_eq!(experiment_title(path, &["_exp_", "_rep_"]), Some("y_exp_2".to_string()));
    }

    #[test]
    fn test_title_override_and_stem_fallback() {
        let cmd = AnnotateCommand::new();
        assert_eq!(cmd.title_for(Path::new("/tmp/sample.narrowPeak")), "sample");

        let cmd = AnnotateCommand {
            title: Some("K27ac".to_string()),
            ..AnnotateCommand::new()
        };
        assert_eq!(cmd.title_for(Path::new("/tmp/sample.narrowPeak")), "K27ac");
    }

    #[test]
    fn test_match_peak_with_wiggle() {
        let set = annotation_set(
            "chr2\t560\t700\tgeneA\t0\t+\tgene\nchr2\t1000\t1100\tgeneB\t0\t-\tgene\nchr1\t500\t600\tgeneC\t0\t+\tgene\n",
            &[],
        );
        let peak_layout = RecordLayout::new(0, 1, 2).with_columns(&[(0, "chrom"), (1, "s"), (2, "e")]);
        let peak = parse_records("chr2\t500\t600\n", peak_layout.clone()).unwrap().remove(0);

        let cmd = AnnotateCommand::new().with_wiggle(50);
        let matches = cmd.match_peak(&peak, &peak_layout, "exp1", &[set]);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].annotation, "chr2\t560\t700\tgeneA\t+\tgene");
        assert_eq!(matches[0].title, "exp1");
        assert_eq!(matches[0].peak, "chr2\t500\t600");
        assert_eq!(
            matches[0].to_line(b'\t'),
            "chr2\t560\t700\tgeneA\t+\tgene\texp1\tchr2\t500\t600"
        );
    }

    #[test]
    fn test_feature_filter() {
        let features = vec!["exon".to_string()];
        let set = annotation_set(
            "chr1\t100\t200\tg1\t0\t+\tgene\nchr1\t120\t150\tg1.e1\t0\t+\texon\n",
            &features,
        );
        assert_eq!(set.index.len(), 1);
    }

    #[test]
    fn test_feature_filter_requires_column() {
        let layout = FileType::BedGraph.layout();
        let records = parse_records("chr1\t1\t2\t0.5\n", layout.clone()).unwrap();
        let result =
            AnnotationSet::from_records("x.bg", layout, records, &["gene".to_string()]);
        assert!(matches!(result, Err(RecordError::InvalidArgument(_))));
    }

    #[test]
    fn test_header() {
        let set = annotation_set("chr1\t1\t2\n", &[]);
        let cmd = AnnotateCommand::new();
        let header = cmd.header(&[set], &FileType::BedGraph.layout());
        assert_eq!(
            header,
            "chrom\tchromStart\tchromEnd\tidentifier\tstrandedness\tannotation_type\texp_title\tchrom\tchromStart\tchromEnd\tdataValue"
        );
    }

    #[test]
    fn test_mixed_annotation_formats_rejected() {
        let cmd = AnnotateCommand::new();
        let result = cmd.run(
            &[PathBuf::from("peaks.narrowPeak")],
            &[PathBuf::from("genes.bed"), PathBuf::from("signal.bg")],
            Vec::<u8>::new(),
        );
        match result {
            Err(RecordError::InvalidArgument(message)) => {
                assert!(message.contains("genes.bed") && message.contains("signal.bg"), "{}", message);
            }
            other => panic!("expected invalid argument, got {:?}", other),
        }
    }

    #[test]
    fn test_mixed_peak_formats_rejected() {
        let cmd = AnnotateCommand::new();
        let result = cmd.run(
            &[PathBuf::from("a.narrowPeak"), PathBuf::from("b_peaks.xls")],
            &[PathBuf::from("genes.bed")],
            Vec::<u8>::new(),
        );
        assert!(matches!(result, Err(RecordError::InvalidArgument(_))));
    }

    #[test]
    fn test_explicit_type_overrides_mixed_extensions() {
        let cmd = AnnotateCommand {
            annotation_type: Some(FileType::Bed),
            ..AnnotateCommand::new()
        };
        let layout = cmd
            .shared_layout(&[PathBuf::from("a.bed"), PathBuf::from("b.txt")], cmd.annotation_type)
            .unwrap();
        assert_eq!(layout, FileType::Bed.layout());
    }
}
