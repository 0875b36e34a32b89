use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show warnings and errors
    Quiet,
    /// Show snapshots, progress and the final summary
    #[default]
    Normal,
    /// Show DTD loading and tree statistics as well
    Verbose,
}

impl VerbosityLevel {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            VerbosityLevel::Quiet
        } else if verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    /// Default log filter directive when `RUST_LOG` is unset
    pub fn filter_directive(self) -> &'static str {
        match self {
            VerbosityLevel::Quiet => "warn",
            VerbosityLevel::Normal => "info",
            VerbosityLevel::Verbose => "debug",
        }
    }
}

/// Infer the structure of a large XML document in a single streaming pass
#[derive(Parser, Debug, Clone)]
#[command(name = "xml-shape")]
#[command(about = "Summarize the element, attribute and text structure of large XML documents")]
#[command(version)]
pub struct Cli {
    /// XML document to analyze
    #[arg(help = "XML document to analyze")]
    pub path: PathBuf,

    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Local DTD used in place of the document's external subset
    #[arg(long = "dtd", help = "Local DTD used for entity declarations")]
    pub dtd: Option<PathBuf>,

    /// Directory report files are written to
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: Option<PathBuf>,

    /// Events before the first snapshot
    #[arg(long = "first-snapshot")]
    pub first_snapshot: Option<u64>,

    /// Events between later snapshots
    #[arg(long = "snapshot-every")]
    pub snapshot_every: Option<u64>,

    /// Only write the final report
    #[arg(long = "no-snapshots")]
    pub no_snapshots: bool,

    /// Document size used for progress percentages (defaults to the file size)
    #[arg(long = "total-bytes")]
    pub total_bytes: Option<u64>,

    /// Occurrence ratio below which a tag is reported as rare
    #[arg(long = "rarely-threshold")]
    pub rarely_threshold: Option<f64>,

    /// Distinct values kept per attribute
    #[arg(long = "attribute-samples")]
    pub attribute_samples: Option<usize>,

    /// Distinct texts kept per tag
    #[arg(long = "text-samples")]
    pub text_samples: Option<usize>,

    /// Samples must be shorter than this many characters
    #[arg(long = "max-sample-length")]
    pub max_sample_length: Option<usize>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    /// Enable quiet mode (warnings and errors only)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        VerbosityLevel::from_flags(self.verbose, self.quiet)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.path.exists() {
            return Err(format!("Path does not exist: {}", self.path.display()));
        }
        if !self.path.is_file() {
            return Err(format!("Path is not a file: {}", self.path.display()));
        }
        if let Some(dtd) = &self.dtd
            && !dtd.is_file()
        {
            return Err(format!("DTD file does not exist: {}", dtd.display()));
        }
        Ok(())
    }
}
