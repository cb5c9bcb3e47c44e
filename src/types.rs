use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Records addressed by their `token` primary key
pub trait TokenRecord {
    fn token(&self) -> &str;
}

macro_rules! impl_token_record {
    ($($ty:ty),* $(,)?) => {
        $(
            impl TokenRecord for $ty {
                fn token(&self) -> &str {
                    &self.token
                }
            }
        )*
    };
}

// One timestep in a driving scene
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Sample {
    pub token: String,
    pub timestamp: i64,
    #[serde(default)]
    pub scene_token: String,
}

// One sensor capture, either a key frame or an intermediate sweep
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SampleData {
    pub token: String,
    #[serde(default)]
    pub sample_token: String,
    #[serde(default)]
    pub calibrated_sensor_token: String,
    pub filename: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub is_key_frame: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CalibratedSensor {
    pub token: String,
    pub sensor_token: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Sensor {
    pub token: String,
    pub channel: String,
    pub modality: String,
}

// A 3D bounding box label attached to one sample
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SampleAnnotation {
    #[serde(default)]
    pub token: String,
    pub sample_token: String,
    pub instance_token: String,
    pub translation: [f64; 3],
    pub size: [f64; 3],
    pub rotation: [f64; 4],
    #[serde(default)]
    pub num_lidar_pts: Option<u64>,
    #[serde(default)]
    pub num_radar_pts: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Instance {
    pub token: String,
    #[serde(default)]
    pub category_token: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Category {
    pub token: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Scene {
    pub token: String,
    #[serde(default)]
    pub name: String,
}

impl_token_record!(
    Sample,
    SampleData,
    CalibratedSensor,
    Sensor,
    SampleAnnotation,
    Instance,
    Category,
    Scene,
);

/// All dataset tables, fully loaded before any processing starts
#[derive(Debug, Default, Clone)]
pub struct Tables {
    pub sample: Vec<Sample>,
    pub sample_data: Vec<SampleData>,
    pub sensor: Vec<Sensor>,
    pub calibrated_sensor: Vec<CalibratedSensor>,
    pub sample_annotation: Vec<SampleAnnotation>,
    pub instance: Vec<Instance>,
    pub category: Vec<Category>,
    pub scene: Vec<Scene>,
}

// One object entry in a per-sample annotation file
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ObjectRecord {
    pub category: String,
    pub translation: [f64; 3],
    pub size: [f64; 3],
    pub rotation: [f64; 4],
    pub num_lidar_pts: u64,
    pub num_radar_pts: u64,
}

// Contents of `annotations/<sample_token>.json`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SampleRecord {
    pub sample_token: String,
    pub timestamp: i64,
    pub objects: Vec<ObjectRecord>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FormatDescription {
    pub images: String,
    pub point_clouds: String,
    pub annotations: String,
}

// Contents of `results/metadata.json`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Metadata {
    pub dataset: String,
    pub version: String,
    pub num_samples: usize,
    pub num_scenes: usize,
    pub categories: Vec<String>,
    pub sensors: IndexMap<String, String>,
    pub format: FormatDescription,
}

// Struct to hold the paths to the output directories
#[derive(Debug, Clone)]
pub struct OutputDirs {
    pub results_dir: PathBuf,
    pub images_dir: PathBuf,
    pub point_clouds_dir: PathBuf,
    pub annotations_dir: PathBuf,
}

// Struct to hold conversion statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConversionStats {
    pub samples_processed: usize,
    pub images_saved: usize,
    pub point_clouds_saved: usize,
    pub annotations_saved: usize,
    pub missing_files: usize,
}

impl ConversionStats {
    pub fn print_summary(&self, results_dir: &std::path::Path) {
        log::info!("Conversion complete!");
        log::info!("Images saved: {}", self.images_saved);
        log::info!("Point clouds saved: {}", self.point_clouds_saved);
        log::info!("Annotations saved: {}", self.annotations_saved);
        log::info!("Output: {}", results_dir.display());

        if self.missing_files > 0 {
            log::warn!(
                "Skipped {} key-frame captures whose files are missing",
                self.missing_files
            );
        }
    }
}
