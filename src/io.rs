use indexmap::{IndexMap, IndexSet};
use ndarray::{ArrayBase, Data, Dimension};
use ndarray_npy::WritableElement;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::config::DATASET_NAME;
use crate::error::{ConvertError, Result};
use crate::types::{FormatDescription, Metadata, OutputDirs, Tables};
use crate::utils::create_output_directory;

pub const IMAGES_FORMAT: &str = "numpy arrays (H, W, C), normalized to [0, 1]";
pub const POINT_CLOUDS_FORMAT: &str = "numpy arrays (N, 3), x, y, z coordinates";
pub const ANNOTATIONS_FORMAT: &str = "JSON with 3D bounding boxes and metadata";

/// Read one table file (`<name>.json`, a JSON array of records) from the version directory
pub fn load_table<T: DeserializeOwned>(tables_dir: &Path, table: &'static str) -> Result<Vec<T>> {
    let path = tables_dir.join(format!("{}.json", table));
    let file = File::open(&path).map_err(|e| ConvertError::io(&path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ConvertError::Table {
        table,
        path,
        source,
    })
}

/// Load every table the converter needs from `<dataroot>/<version>/`
pub fn load_tables(dataroot: &Path, version: &str) -> Result<Tables> {
    let tables_dir = dataroot.join(version);
    let tables = Tables {
        sample: load_table(&tables_dir, "sample")?,
        sample_data: load_table(&tables_dir, "sample_data")?,
        sensor: load_table(&tables_dir, "sensor")?,
        calibrated_sensor: load_table(&tables_dir, "calibrated_sensor")?,
        sample_annotation: load_table(&tables_dir, "sample_annotation")?,
        instance: load_table(&tables_dir, "instance")?,
        category: load_table(&tables_dir, "category")?,
        scene: load_table(&tables_dir, "scene")?,
    };
    log::debug!(
        "Loaded {} samples, {} sample_data, {} annotations from {}",
        tables.sample.len(),
        tables.sample_data.len(),
        tables.sample_annotation.len(),
        tables_dir.display()
    );
    Ok(tables)
}

/// Set up `results/` and its images, point_clouds and annotations subdirectories
pub fn setup_output_directories(results_dir: &Path) -> Result<OutputDirs> {
    let results_dir = create_output_directory(results_dir)?;
    let images_dir = create_output_directory(&results_dir.join("images"))?;
    let point_clouds_dir = create_output_directory(&results_dir.join("point_clouds"))?;
    let annotations_dir = create_output_directory(&results_dir.join("annotations"))?;

    Ok(OutputDirs {
        results_dir,
        images_dir,
        point_clouds_dir,
        annotations_dir,
    })
}

/// Write `value` as 2-space indented JSON, replacing any existing file
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).map_err(|e| ConvertError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| ConvertError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(|e| ConvertError::io(path, e))
}

/// Write an array in `.npy` format, replacing any existing file
pub fn write_array<S, D>(path: &Path, array: &ArrayBase<S, D>) -> Result<()>
where
    S: Data,
    S::Elem: WritableElement,
    D: Dimension,
{
    ndarray_npy::write_npy(path, array).map_err(|source| ConvertError::Npy {
        path: path.to_path_buf(),
        source,
    })
}

/// Summarize a run: counts, distinct category names in table order and sensor modalities
pub fn build_metadata(tables: &Tables, version: &str) -> Metadata {
    let categories: IndexSet<&str> = tables.category.iter().map(|c| c.name.as_str()).collect();
    let mut sensors = IndexMap::new();
    for sensor in &tables.sensor {
        sensors.insert(sensor.channel.clone(), sensor.modality.clone());
    }

    Metadata {
        dataset: DATASET_NAME.to_string(),
        version: version.to_string(),
        num_samples: tables.sample.len(),
        num_scenes: tables.scene.len(),
        categories: categories.into_iter().map(str::to_string).collect(),
        sensors,
        format: FormatDescription {
            images: IMAGES_FORMAT.to_string(),
            point_clouds: POINT_CLOUDS_FORMAT.to_string(),
            annotations: ANNOTATIONS_FORMAT.to_string(),
        },
    }
}

/// Create the metadata.json file describing the run
pub fn write_metadata(output_dirs: &OutputDirs, tables: &Tables, version: &str) -> Result<()> {
    let metadata = build_metadata(tables, version);
    write_json(&output_dirs.results_dir.join("metadata.json"), &metadata)
}
