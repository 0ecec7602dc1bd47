// Clippy allows
#![allow(clippy::too_many_arguments)]

//! crunkit: peak-region comparison and merging toolkit
//!
//! Usage: crunkit <COMMAND> [OPTIONS]

use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;
use std::process;

use crunkit::commands::{
    AnnotateCommand, FilterCommand, GenomeCommand, PeakMaxCommand, RegionsCommand, Threshold,
};
use crunkit::config::{parse_delimiter, FileType, DEFAULT_PADDING_FACTOR, DEFAULT_WIGGLE};
use crunkit::genome::Genome;
use crunkit::interval::Interval;
use crunkit::output::write_output;
use crunkit::padding::{PaddingSchedule, PaddingTable};
use crunkit::parallel::configure_threads;
use crunkit::records::{RecordError, Result};

#[derive(Parser)]
#[command(name = "crunkit")]
#[command(version)]
#[command(about = "Compare, merge and annotate peak-calling intervals", long_about = None)]
struct Cli {
    /// Number of threads to use (default: number of CPUs)
    #[arg(long, short = 't', global = true)]
    threads: Option<usize>,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge peaks from several files into padded plot regions
    Regions {
        /// Input peak files (comma-separated or repeated)
        #[arg(short, long, required = true, num_args = 1.., value_delimiter = ',')]
        inputs: Vec<PathBuf>,

        /// Genome file with chromosome lengths
        #[arg(short = 'g', long)]
        genome: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Input format (narrowPeak, xls, bed, bedgraph); inferred from extension when omitted
        #[arg(short = 'f', long)]
        file_type: Option<FileType>,

        /// Padding factor for chromosomes longer than every threshold
        #[arg(long, default_value_t = DEFAULT_PADDING_FACTOR)]
        default_factor: f64,

        /// Field delimiter of the inputs
        #[arg(short, long, value_parser = parse_delimiter)]
        delimiter: Option<u8>,
    },

    /// Report annotations within a margin of each peak
    Annotate {
        /// Peak files
        #[arg(short, long, required = true, num_args = 1.., value_delimiter = ',')]
        peaks: Vec<PathBuf>,

        /// Annotation files
        #[arg(short, long, required = true, num_args = 1.., value_delimiter = ',')]
        annotations: Vec<PathBuf>,

        /// Margin added to both ends of each annotation
        #[arg(short, long, default_value_t = DEFAULT_WIGGLE)]
        wiggle: u64,

        /// Keep only annotations of these types (annotation_type column)
        #[arg(long = "feature", value_delimiter = ',')]
        features: Vec<String>,

        /// Experiment title (default: detected from the peak file's directories)
        #[arg(long)]
        title: Option<String>,

        /// Peak file format; inferred from extension when omitted
        #[arg(long)]
        peak_type: Option<FileType>,

        /// Annotation file format; inferred from extension when omitted
        #[arg(long)]
        annotation_type: Option<FileType>,

        /// Field delimiter for inputs and output
        #[arg(short, long, value_parser = parse_delimiter, default_value = "\\t")]
        delimiter: u8,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Keep MACS3 peaks at or above a significance cutoff
    Filter {
        /// Input narrowPeak or xls file
        #[arg(short, long)]
        input: PathBuf,

        /// q-value cutoff (default 0.01)
        #[arg(short, long, conflicts_with = "pvalue")]
        qvalue: Option<f64>,

        /// p-value cutoff
        #[arg(short, long)]
        pvalue: Option<f64>,

        /// Input format; inferred from extension when omitted
        #[arg(short = 'f', long)]
        file_type: Option<FileType>,

        /// Field delimiter
        #[arg(short, long, value_parser = parse_delimiter, default_value = "\\t")]
        delimiter: u8,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report the highest signal value inside a region
    Max {
        /// bedGraph or narrowPeak files (comma-separated or repeated)
        #[arg(short, long, required = true, num_args = 1.., value_delimiter = ',')]
        inputs: Vec<PathBuf>,

        /// Region as chrom:start-end
        #[arg(short, long)]
        region: Interval,

        /// Input format; inferred per file from its extension when omitted
        #[arg(short = 'f', long)]
        file_type: Option<FileType>,

        /// Field delimiter
        #[arg(short, long, value_parser = parse_delimiter, default_value = "\\t")]
        delimiter: u8,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a genome file of sequence lengths from FASTA files
    Genome {
        /// FASTA files or directories of FASTA files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the padding distance of each chromosome
    Padding {
        /// Genome file with chromosome lengths
        #[arg(short = 'g', long)]
        genome: PathBuf,

        /// Padding factor for chromosomes longer than every threshold
        #[arg(long, default_value_t = DEFAULT_PADDING_FACTOR)]
        default_factor: f64,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    if let Some(n) = cli.threads {
        configure_threads(n);
    }

    let result = match cli.command {
        Commands::Regions {
            inputs,
            genome,
            output,
            file_type,
            default_factor,
            delimiter,
        } => run_regions(inputs, genome, output, file_type, default_factor, delimiter),

        Commands::Annotate {
            peaks,
            annotations,
            wiggle,
            features,
            title,
            peak_type,
            annotation_type,
            delimiter,
            output,
        } => run_annotate(
            peaks,
            annotations,
            wiggle,
            features,
            title,
            peak_type,
            annotation_type,
            delimiter,
            output,
        ),

        Commands::Filter {
            input,
            qvalue,
            pvalue,
            file_type,
            delimiter,
            output,
        } => run_filter(input, qvalue, pvalue, file_type, delimiter, output),

        Commands::Max {
            inputs,
            region,
            file_type,
            delimiter,
            output,
        } => run_max(inputs, region, file_type, delimiter, output),

        Commands::Genome { inputs, output } => run_genome(inputs, output),

        Commands::Padding {
            genome,
            default_factor,
            output,
        } => run_padding(genome, default_factor, output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_regions(
    inputs: Vec<PathBuf>,
    genome_path: PathBuf,
    output: Option<PathBuf>,
    file_type: Option<FileType>,
    default_factor: f64,
    delimiter: Option<u8>,
) -> Result<()> {
    let genome = Genome::from_file(&genome_path)?;
    let mut cmd = RegionsCommand::new()
        .with_schedule(PaddingSchedule::default().with_default_factor(default_factor))
        .with_file_type(file_type);
    if let Some(d) = delimiter {
        cmd = cmd.with_delimiter(d);
    }

    write_output(output.as_deref(), |out| {
        cmd.run(&inputs, &genome, out).map(|_| ())
    })
}

fn run_annotate(
    peaks: Vec<PathBuf>,
    annotations: Vec<PathBuf>,
    wiggle: u64,
    features: Vec<String>,
    title: Option<String>,
    peak_type: Option<FileType>,
    annotation_type: Option<FileType>,
    delimiter: u8,
    output: Option<PathBuf>,
) -> Result<()> {
    let cmd = AnnotateCommand {
        wiggle,
        delimiter,
        peak_type,
        annotation_type,
        features,
        title,
        ..AnnotateCommand::new()
    };
    write_output(output.as_deref(), |out| {
        cmd.run(&peaks, &annotations, out).map(|_| ())
    })
}

fn run_filter(
    input: PathBuf,
    qvalue: Option<f64>,
    pvalue: Option<f64>,
    file_type: Option<FileType>,
    delimiter: u8,
    output: Option<PathBuf>,
) -> Result<()> {
    let file_type = file_type
        .or_else(|| FileType::from_path(&input))
        .ok_or_else(|| {
            RecordError::InvalidArgument(format!(
                "cannot infer the format of {}; pass --file-type",
                input.display()
            ))
        })?;
    let threshold = match (qvalue, pvalue) {
        (_, Some(p)) => Threshold::PValue(p),
        (Some(q), None) => Threshold::QValue(q),
        (None, None) => Threshold::default(),
    };

    let cmd = FilterCommand::new(file_type, threshold).with_delimiter(delimiter);
    // Validate before the output file is created.
    cmd.value_column()?;
    cmd.cutoff()?;
    write_output(output.as_deref(), |out| cmd.run(&input, out).map(|_| ()))
}

fn run_max(
    inputs: Vec<PathBuf>,
    region: Interval,
    file_type: Option<FileType>,
    delimiter: u8,
    output: Option<PathBuf>,
) -> Result<()> {
    let cmd = PeakMaxCommand::new(region)
        .with_file_type(file_type)
        .with_delimiter(delimiter);
    for path in &inputs {
        cmd.format_for(path)?;
    }
    write_output(output.as_deref(), |out| cmd.run(&inputs, out).map(|_| ()))
}

fn run_genome(inputs: Vec<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let cmd = GenomeCommand::new();
    write_output(output.as_deref(), |out| cmd.run(&inputs, out).map(|_| ()))
}

fn run_padding(genome_path: PathBuf, default_factor: f64, output: Option<PathBuf>) -> Result<()> {
    let genome = Genome::from_file(&genome_path)?;
    let schedule = PaddingSchedule::default().with_default_factor(default_factor);
    let table = PaddingTable::from_genome(&genome, &schedule);
    write_output(output.as_deref(), |out| table.write(out))
}
