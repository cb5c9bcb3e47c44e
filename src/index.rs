//! Lookup tables over the loaded dataset tables.
//!
//! Tables reference each other only by token string, so every join the
//! converter needs (sample_data -> calibrated_sensor -> sensor and
//! sample_annotation -> instance -> category) goes through one of the maps
//! built here. All builders are total: a dangling token simply fails to
//! resolve later on.

use std::collections::{HashMap, HashSet};

use crate::types::{
    CalibratedSensor, Category, Instance, SampleAnnotation, SampleData, Sensor, Tables,
    TokenRecord,
};

/// Channel substring marking camera sensors
pub const CAMERA_MARKER: &str = "CAM";

/// Channel substring marking LIDAR sensors
pub const LIDAR_MARKER: &str = "LIDAR";

/// Category reported for annotations whose instance or category does not resolve
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Map every record by its token. Later duplicates replace earlier ones.
pub fn index_by_token<T: TokenRecord>(records: &[T]) -> HashMap<&str, &T> {
    records.iter().map(|r| (r.token(), r)).collect()
}

fn sensor_tokens_with_marker<'a>(sensors: &'a [Sensor], marker: &str) -> HashSet<&'a str> {
    sensors
        .iter()
        .filter(|s| s.channel.contains(marker))
        .map(|s| s.token.as_str())
        .collect()
}

/// Tokens of sensors whose channel contains `CAM`
pub fn camera_sensor_tokens(sensors: &[Sensor]) -> HashSet<&str> {
    sensor_tokens_with_marker(sensors, CAMERA_MARKER)
}

/// Tokens of sensors whose channel contains `LIDAR`
pub fn lidar_sensor_tokens(sensors: &[Sensor]) -> HashSet<&str> {
    sensor_tokens_with_marker(sensors, LIDAR_MARKER)
}

pub fn calibrated_to_sensor(calibrated_sensors: &[CalibratedSensor]) -> HashMap<&str, &str> {
    calibrated_sensors
        .iter()
        .map(|cs| (cs.token.as_str(), cs.sensor_token.as_str()))
        .collect()
}

/// Group annotations by owning sample, keeping table order within each group
pub fn annotations_by_sample(
    annotations: &[SampleAnnotation],
) -> HashMap<&str, Vec<&SampleAnnotation>> {
    let mut grouped: HashMap<&str, Vec<&SampleAnnotation>> = HashMap::new();
    for ann in annotations {
        grouped.entry(ann.sample_token.as_str()).or_default().push(ann);
    }
    grouped
}

/// Group key-frame captures by owning sample, keeping table order; sweeps are dropped
pub fn key_frames_by_sample(sample_data: &[SampleData]) -> HashMap<&str, Vec<&SampleData>> {
    let mut grouped: HashMap<&str, Vec<&SampleData>> = HashMap::new();
    for sd in sample_data.iter().filter(|sd| sd.is_key_frame) {
        grouped.entry(sd.sample_token.as_str()).or_default().push(sd);
    }
    grouped
}

pub fn category_names(categories: &[Category]) -> HashMap<&str, &str> {
    categories
        .iter()
        .map(|c| (c.token.as_str(), c.name.as_str()))
        .collect()
}

/// How a capture is converted, decided by its resolved sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Camera,
    Lidar,
}

/// Every lookup structure the per-sample processor needs, built once per run
#[derive(Debug)]
pub struct TableIndex<'a> {
    pub sample_data: HashMap<&'a str, &'a SampleData>,
    pub sensors: HashMap<&'a str, &'a Sensor>,
    pub camera_sensors: HashSet<&'a str>,
    pub lidar_sensors: HashSet<&'a str>,
    pub calibrated_to_sensor: HashMap<&'a str, &'a str>,
    pub annotations: HashMap<&'a str, Vec<&'a SampleAnnotation>>,
    pub instances: HashMap<&'a str, &'a Instance>,
    pub categories: HashMap<&'a str, &'a str>,
    pub key_frames: HashMap<&'a str, Vec<&'a SampleData>>,
}

impl<'a> TableIndex<'a> {
    pub fn build(tables: &'a Tables) -> Self {
        Self {
            sample_data: index_by_token(&tables.sample_data),
            sensors: index_by_token(&tables.sensor),
            camera_sensors: camera_sensor_tokens(&tables.sensor),
            lidar_sensors: lidar_sensor_tokens(&tables.sensor),
            calibrated_to_sensor: calibrated_to_sensor(&tables.calibrated_sensor),
            annotations: annotations_by_sample(&tables.sample_annotation),
            instances: index_by_token(&tables.instance),
            categories: category_names(&tables.category),
            key_frames: key_frames_by_sample(&tables.sample_data),
        }
    }

    /// Key-frame captures of a sample, in table order
    pub fn key_frames_for(&self, sample_token: &str) -> &[&'a SampleData] {
        self.key_frames
            .get(sample_token)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn annotations_for(&self, sample_token: &str) -> &[&'a SampleAnnotation] {
        self.annotations
            .get(sample_token)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Follow calibrated_sensor_token to the owning sensor token
    pub fn sensor_token_for(&self, sd: &SampleData) -> Option<&'a str> {
        self.calibrated_to_sensor
            .get(sd.calibrated_sensor_token.as_str())
            .copied()
    }

    /// Camera wins when a sensor matches both markers. `None` means skip.
    pub fn classify(&self, sd: &SampleData) -> Option<SensorKind> {
        let sensor_token = self.sensor_token_for(sd)?;
        if self.camera_sensors.contains(sensor_token) {
            Some(SensorKind::Camera)
        } else if self.lidar_sensors.contains(sensor_token) {
            Some(SensorKind::Lidar)
        } else {
            None
        }
    }

    /// Channel of a capture: its own field, else the resolved sensor's channel
    pub fn channel_for<'s>(&'s self, sd: &'s SampleData) -> &'s str {
        if !sd.channel.is_empty() {
            return &sd.channel;
        }
        self.sensor_token_for(sd)
            .and_then(|token| self.sensors.get(token))
            .map(|sensor| sensor.channel.as_str())
            .unwrap_or("")
    }

    pub fn category_for(&self, ann: &SampleAnnotation) -> &'a str {
        self.instances
            .get(ann.instance_token.as_str())
            .and_then(|inst| self.categories.get(inst.category_token.as_str()))
            .copied()
            .unwrap_or(UNKNOWN_CATEGORY)
    }
}
