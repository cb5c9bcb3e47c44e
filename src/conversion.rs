use image::DynamicImage;
use ndarray::{s, Array2, Array3};
use std::fs;
use std::path::Path;

use crate::error::{ConvertError, Result};
use crate::index::{SensorKind, TableIndex};
use crate::io::{write_array, write_json};
use crate::types::{ObjectRecord, OutputDirs, Sample, SampleData, SampleRecord};
use crate::utils::{annotation_file_name, image_file_name, point_cloud_file_name};

/// Floats per LIDAR point: x, y, z, intensity, ring index
pub const POINT_DIMS: usize = 5;

/// Leading point columns kept in the output
pub const XYZ_DIMS: usize = 3;

/// What happened to one key-frame capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureResult {
    Saved,
    Missing,
}

/// Per-sample counts, summed into the run statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SampleOutcome {
    pub images: usize,
    pub point_clouds: usize,
    pub missing_files: usize,
}

impl SampleOutcome {
    fn record(&mut self, kind: SensorKind, result: CaptureResult) {
        match (kind, result) {
            (SensorKind::Camera, CaptureResult::Saved) => self.images += 1,
            (SensorKind::Lidar, CaptureResult::Saved) => self.point_clouds += 1,
            (_, CaptureResult::Missing) => self.missing_files += 1,
        }
    }
}

/// Convert a decoded image to an (H, W, C) array with every value in [0, 1].
/// The channel count of the decoded image is kept; samples go through 8 bits first.
pub fn normalize_image(img: DynamicImage) -> Result<Array3<f32>> {
    let (width, height) = (img.width() as usize, img.height() as usize);
    let channels = img.color().channel_count() as usize;
    let (raw, channels) = match channels {
        1 => (img.into_luma8().into_raw(), 1),
        2 => (img.into_luma_alpha8().into_raw(), 2),
        4 => (img.into_rgba8().into_raw(), 4),
        _ => (img.into_rgb8().into_raw(), 3),
    };
    let values: Vec<f32> = raw.into_iter().map(|v| f32::from(v) / 255.0).collect();
    Ok(Array3::from_shape_vec((height, width, channels), values)?)
}

pub fn load_image_array(path: &Path) -> Result<Array3<f32>> {
    let img = image::open(path).map_err(|source| ConvertError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    normalize_image(img)
}

/// Parse little-endian f32 values into (N, 5) rows. A trailing partial float is ignored.
pub fn parse_point_cloud(bytes: &[u8], path: &Path) -> Result<Array2<f32>> {
    let floats: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    if floats.len() % POINT_DIMS != 0 {
        return Err(ConvertError::MalformedPointCloud {
            path: path.to_path_buf(),
            len: bytes.len(),
        });
    }
    let rows = floats.len() / POINT_DIMS;
    Ok(Array2::from_shape_vec((rows, POINT_DIMS), floats)?)
}

pub fn read_point_cloud(path: &Path) -> Result<Array2<f32>> {
    let bytes = fs::read(path).map_err(|e| ConvertError::io(path, e))?;
    parse_point_cloud(&bytes, path)
}

/// Keep x, y, z
pub fn extract_xyz(points: &Array2<f32>) -> Array2<f32> {
    points.slice(s![.., ..XYZ_DIMS]).to_owned()
}

/// Save a camera capture as a normalized image array
pub fn convert_camera(
    capture: &SampleData,
    channel: &str,
    sample_token: &str,
    dataroot: &Path,
    images_dir: &Path,
) -> Result<CaptureResult> {
    let image_path = dataroot.join(&capture.filename);
    if !image_path.exists() {
        return Ok(CaptureResult::Missing);
    }
    let array = load_image_array(&image_path)?;
    write_array(&images_dir.join(image_file_name(sample_token, channel)), &array)?;
    Ok(CaptureResult::Saved)
}

/// Save a LIDAR capture as an (N, 3) coordinate array
pub fn convert_lidar(
    capture: &SampleData,
    sample_token: &str,
    dataroot: &Path,
    point_clouds_dir: &Path,
) -> Result<CaptureResult> {
    let pc_path = dataroot.join(&capture.filename);
    if !pc_path.exists() {
        return Ok(CaptureResult::Missing);
    }
    let xyz = extract_xyz(&read_point_cloud(&pc_path)?);
    write_array(
        &point_clouds_dir.join(point_cloud_file_name(sample_token)),
        &xyz,
    )?;
    Ok(CaptureResult::Saved)
}

/// Assemble the annotation record of a sample, resolving each object's category
pub fn build_sample_record(sample: &Sample, index: &TableIndex) -> SampleRecord {
    let objects = index
        .annotations_for(&sample.token)
        .iter()
        .map(|ann| ObjectRecord {
            category: index.category_for(ann).to_string(),
            translation: ann.translation,
            size: ann.size,
            rotation: ann.rotation,
            num_lidar_pts: ann.num_lidar_pts.unwrap_or(0),
            num_radar_pts: ann.num_radar_pts.unwrap_or(0),
        })
        .collect();

    SampleRecord {
        sample_token: sample.token.clone(),
        timestamp: sample.timestamp,
        objects,
    }
}

/// Convert every key-frame capture of a sample and write its annotation file
pub fn process_sample(
    sample: &Sample,
    index: &TableIndex,
    dataroot: &Path,
    output_dirs: &OutputDirs,
) -> Result<SampleOutcome> {
    let mut outcome = SampleOutcome::default();

    for capture in index.key_frames_for(&sample.token) {
        let Some(kind) = index.classify(capture) else {
            continue;
        };
        let result = match kind {
            SensorKind::Camera => convert_camera(
                capture,
                index.channel_for(capture),
                &sample.token,
                dataroot,
                &output_dirs.images_dir,
            )?,
            SensorKind::Lidar => convert_lidar(
                capture,
                &sample.token,
                dataroot,
                &output_dirs.point_clouds_dir,
            )?,
        };
        outcome.record(kind, result);
    }

    let record = build_sample_record(sample, index);
    write_json(
        &output_dirs
            .annotations_dir
            .join(annotation_file_name(&sample.token)),
        &record,
    )?;

    Ok(outcome)
}
