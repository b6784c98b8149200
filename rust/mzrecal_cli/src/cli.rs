use clap::{
    Parser,
    Subcommand,
};
use mzrecal::{
    DeltaUnit,
    DistanceMetric,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Estimate the linear shift of spectra against a reference.
    EstimateShift(EstimateShiftArgs),
    /// Match the peaks of two spectra and report their deltas.
    MatchPeaks(MatchPeaksArgs),
    /// Write template configuration files.
    WriteTemplate(WriteTemplateArgs),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum SerializationFormat {
    Json,
    #[default]
    PrettyJson,
    Ndjson,
}

#[derive(Parser, Debug, Clone)]
pub struct EstimateShiftArgs {
    /// The path to the json file with the reference spectrum.
    #[arg(short, long)]
    pub reference: PathBuf,

    /// The paths to the json files with the spectra to recalibrate.
    #[arg(short, long, num_args = 1.., required = true)]
    pub spectra: Vec<PathBuf>,

    /// The path to the json file with the shift settings.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// The path to the output file (stdout when missing).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// The format to use for the output
    #[arg(short, long, default_value_t, value_enum)]
    pub format: SerializationFormat,
}

#[derive(Parser, Debug, Clone)]
pub struct MatchPeaksArgs {
    /// The path to the json file with the target spectrum.
    #[arg(short, long)]
    pub target: PathBuf,

    /// The path to the json file with the reference spectrum.
    #[arg(short, long)]
    pub reference: PathBuf,

    /// The distance used to pair peaks.
    #[arg(short, long, default_value_t, value_enum)]
    pub metric: DistanceMetric,

    /// The unit of the reported deltas.
    #[arg(short, long, default_value_t, value_enum)]
    pub unit: DeltaUnit,

    /// The path to the output file (stdout when missing).
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct WriteTemplateArgs {
    /// The path to the output directory.
    #[arg(short, long)]
    pub output_path: PathBuf,
}
