//! nuScenes to training format converter
//!
//! This library joins the nuScenes relational tables to find, for every sample,
//! its key-frame camera images and LIDAR sweeps, and writes them out as `.npy`
//! arrays next to one JSON annotation file per sample.

pub mod config;
pub mod conversion;
pub mod dataset;
pub mod error;
pub mod index;
pub mod io;
pub mod types;
pub mod utils;

// Re-export commonly used types and functions
pub use config::{Args, ConversionConfig};
pub use dataset::{process_samples, run_conversion};
pub use error::{ConvertError, Result};
pub use index::TableIndex;
pub use io::{load_tables, setup_output_directories, write_metadata};
pub use types::{ConversionStats, Metadata, OutputDirs, SampleRecord, Tables};
