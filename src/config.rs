use clap::Parser;
use std::path::PathBuf;

/// Fixed dataset name recorded in `metadata.json`
pub const DATASET_NAME: &str = "nuScenes-mini";

/// Dataset version used when none is given on the command line
pub const DEFAULT_VERSION: &str = "v1.0-mini";

/// Emit a progress line every this many samples
pub const PROGRESS_INTERVAL: usize = 50;

/// Command-line arguments for converting nuScenes tables to the training format.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct Args {
    /// Root directory of the nuScenes dataset (holds samples/, sweeps/ and the version dir)
    #[arg(short = 'd', long = "dataroot")]
    pub dataroot: String,

    /// Dataset version, i.e. the directory under dataroot holding the table JSON files
    #[arg(long = "dataset_version", default_value = DEFAULT_VERSION)]
    pub dataset_version: String,

    /// Directory that receives the results/ tree
    #[arg(short = 'o', long = "output_dir", default_value = ".")]
    pub output_dir: String,

    /// Process samples in parallel
    #[arg(long = "parallel")]
    pub parallel: bool,
}

impl Args {
    pub fn to_config(&self) -> ConversionConfig {
        ConversionConfig {
            dataroot: PathBuf::from(&self.dataroot),
            version: self.dataset_version.clone(),
            output_dir: PathBuf::from(&self.output_dir),
            parallel: self.parallel,
        }
    }
}

/// Everything a conversion run needs, passed explicitly into the pipeline.
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    pub dataroot: PathBuf,
    pub version: String,
    pub output_dir: PathBuf,
    pub parallel: bool,
}

impl ConversionConfig {
    pub fn new(
        dataroot: impl Into<PathBuf>,
        version: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            dataroot: dataroot.into(),
            version: version.into(),
            output_dir: output_dir.into(),
            parallel: false,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Directory holding the table JSON files
    pub fn tables_dir(&self) -> PathBuf {
        self.dataroot.join(&self.version)
    }

    /// Root of everything this run writes
    pub fn results_dir(&self) -> PathBuf {
        self.output_dir.join("results")
    }
}
