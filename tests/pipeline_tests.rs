use image::{Rgb, RgbImage};
use ndarray::{Array2, Array3};
use ndarray_npy::read_npy;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use nuscenes2npy::types::{Metadata, SampleRecord};
use nuscenes2npy::{run_conversion, ConversionConfig, ConvertError};

const VERSION: &str = "v1.0-mini";

struct Fixture {
    _temp_dir: TempDir,
    dataroot: PathBuf,
    output_dir: PathBuf,
}

impl Fixture {
    fn config(&self) -> ConversionConfig {
        ConversionConfig::new(&self.dataroot, VERSION, &self.output_dir)
    }

    fn results(&self) -> PathBuf {
        self.output_dir.join("results")
    }
}

fn write_table(dir: &Path, name: &str, value: serde_json::Value) {
    fs::write(dir.join(format!("{}.json", name)), value.to_string()).unwrap();
}

fn write_points(path: &Path, points: &[[f32; 5]]) {
    let bytes: Vec<u8> = points
        .iter()
        .flat_map(|p| p.iter().flat_map(|v| v.to_le_bytes()))
        .collect();
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

fn write_image(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_fn(2, 2, |x, y| Rgb([255, (x * 100) as u8, (y * 50) as u8]))
        .save(path)
        .unwrap();
}

/// Two samples. s1 has a camera key frame, a LIDAR key frame and two annotations;
/// s2 has a camera sweep on disk, a LIDAR key frame whose file is missing, and no annotations.
fn build_fixture() -> Fixture {
    let temp_dir = tempfile::tempdir().unwrap();
    let dataroot = temp_dir.path().join("nuscenes");
    let output_dir = temp_dir.path().join("out");
    let tables_dir = dataroot.join(VERSION);
    fs::create_dir_all(&tables_dir).unwrap();

    write_table(
        &tables_dir,
        "sample",
        json!([
            {"token": "s1", "timestamp": 1000, "scene_token": "sc1"},
            {"token": "s2", "timestamp": 2000, "scene_token": "sc1"}
        ]),
    );
    write_table(
        &tables_dir,
        "scene",
        json!([{"token": "sc1", "name": "scene-0001"}]),
    );
    write_table(
        &tables_dir,
        "sensor",
        json!([
            {"token": "cam", "channel": "CAM_FRONT", "modality": "camera"},
            {"token": "lidar", "channel": "LIDAR_TOP", "modality": "lidar"},
            {"token": "radar", "channel": "RADAR_FRONT", "modality": "radar"}
        ]),
    );
    write_table(
        &tables_dir,
        "calibrated_sensor",
        json!([
            {"token": "cs-cam", "sensor_token": "cam"},
            {"token": "cs-lidar", "sensor_token": "lidar"},
            {"token": "cs-radar", "sensor_token": "radar"}
        ]),
    );
    write_table(
        &tables_dir,
        "sample_data",
        json!([
            {"token": "sd1", "sample_token": "s1", "calibrated_sensor_token": "cs-cam",
             "filename": "samples/CAM_FRONT/s1.png", "is_key_frame": true},
            {"token": "sd2", "sample_token": "s1", "calibrated_sensor_token": "cs-lidar",
             "filename": "samples/LIDAR_TOP/s1.pcd.bin", "is_key_frame": true},
            {"token": "sd3", "sample_token": "s1", "calibrated_sensor_token": "cs-radar",
             "filename": "samples/RADAR_FRONT/s1.pcd", "is_key_frame": true},
            {"token": "sd4", "sample_token": "s2", "calibrated_sensor_token": "cs-cam",
             "filename": "sweeps/CAM_FRONT/s2.png", "is_key_frame": false},
            {"token": "sd5", "sample_token": "s2", "calibrated_sensor_token": "cs-lidar",
             "filename": "samples/LIDAR_TOP/missing.pcd.bin", "is_key_frame": true},
            {"token": "sd6", "sample_token": "s2", "calibrated_sensor_token": "cs-gone",
             "filename": "samples/CAM_FRONT/s1.png", "is_key_frame": true}
        ]),
    );
    write_table(
        &tables_dir,
        "sample_annotation",
        json!([
            {"token": "a1", "sample_token": "s1", "instance_token": "i1",
             "translation": [1.0, 2.0, 0.5], "size": [1.9, 4.5, 1.6],
             "rotation": [0.7, 0.0, 0.0, 0.7], "num_lidar_pts": 42, "num_radar_pts": 3},
            {"token": "a2", "sample_token": "s1", "instance_token": "i-unknown",
             "translation": [0.0, 0.0, 0.0], "size": [1.0, 1.0, 1.0],
             "rotation": [1.0, 0.0, 0.0, 0.0]}
        ]),
    );
    write_table(
        &tables_dir,
        "instance",
        json!([{"token": "i1", "category_token": "c-car"}]),
    );
    write_table(
        &tables_dir,
        "category",
        json!([
            {"token": "c-car", "name": "vehicle.car"},
            {"token": "c-ped", "name": "human.pedestrian.adult"}
        ]),
    );

    write_image(&dataroot.join("samples/CAM_FRONT/s1.png"));
    write_image(&dataroot.join("sweeps/CAM_FRONT/s2.png"));
    write_points(
        &dataroot.join("samples/LIDAR_TOP/s1.pcd.bin"),
        &[
            [1.0, 2.0, 3.0, 10.0, 0.0],
            [4.0, 5.0, 6.0, 20.0, 1.0],
            [7.0, 8.0, 9.0, 30.0, 2.0],
        ],
    );

    Fixture {
        _temp_dir: temp_dir,
        dataroot,
        output_dir,
    }
}

fn read_record(results: &Path, sample_token: &str) -> SampleRecord {
    let path = results.join("annotations").join(format!("{}.json", sample_token));
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn snapshot(dir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files = Vec::new();
    for sub in ["images", "point_clouds", "annotations"] {
        for entry in fs::read_dir(dir.join(sub)).unwrap() {
            let path = entry.unwrap().path();
            let bytes = fs::read(&path).unwrap();
            files.push((path.strip_prefix(dir).unwrap().to_path_buf(), bytes));
        }
    }
    files.push((PathBuf::from("metadata.json"), fs::read(dir.join("metadata.json")).unwrap()));
    files.sort();
    files
}

#[test]
fn test_camera_capture_and_annotation() {
    let fixture = build_fixture();
    run_conversion(&fixture.config()).unwrap();
    let results = fixture.results();

    let image: Array3<f32> = read_npy(results.join("images/s1_CAM_FRONT.npy")).unwrap();
    assert_eq!(image.shape(), &[2, 2, 3]);
    assert!(image.iter().all(|v| (0.0..=1.0).contains(v)));
    assert_eq!(image[[0, 0, 0]], 1.0);

    let record = read_record(&results, "s1");
    assert_eq!(record.timestamp, 1000);
    assert_eq!(record.objects.len(), 2);
    assert_eq!(record.objects[0].category, "vehicle.car");
    assert_eq!(record.objects[0].num_lidar_pts, 42);
    assert_eq!(record.objects[0].rotation, [0.7, 0.0, 0.0, 0.7]);
}

#[test]
fn test_unresolved_instance_is_unknown() {
    let fixture = build_fixture();
    run_conversion(&fixture.config()).unwrap();

    let record = read_record(&fixture.results(), "s1");
    assert_eq!(record.objects[1].category, "unknown");
    assert_eq!(record.objects[1].num_lidar_pts, 0);
    assert_eq!(record.objects[1].num_radar_pts, 0);
}

#[test]
fn test_point_cloud_keeps_xyz() {
    let fixture = build_fixture();
    run_conversion(&fixture.config()).unwrap();

    let points: Array2<f32> =
        read_npy(fixture.results().join("point_clouds/s1.npy")).unwrap();
    assert_eq!(points.shape(), &[3, 3]);
    assert_eq!(points.row(2).to_vec(), vec![7.0, 8.0, 9.0]);
}

#[test]
fn test_every_sample_gets_an_annotation_file() {
    let fixture = build_fixture();
    let stats = run_conversion(&fixture.config()).unwrap();

    let record = read_record(&fixture.results(), "s2");
    assert_eq!(record.sample_token, "s2");
    assert!(record.objects.is_empty());
    assert_eq!(stats.annotations_saved, 2);
}

#[test]
fn test_sweeps_missing_files_and_unknown_sensors_are_skipped() {
    let fixture = build_fixture();
    let stats = run_conversion(&fixture.config()).unwrap();
    let results = fixture.results();

    assert!(!results.join("images/s2_CAM_FRONT.npy").exists());
    assert!(!results.join("point_clouds/s2.npy").exists());
    assert_eq!(fs::read_dir(results.join("images")).unwrap().count(), 1);
    assert_eq!(stats.images_saved, 1);
    assert_eq!(stats.point_clouds_saved, 1);
    assert_eq!(stats.missing_files, 1);
}

#[test]
fn test_metadata() {
    let fixture = build_fixture();
    run_conversion(&fixture.config()).unwrap();

    let content = fs::read_to_string(fixture.results().join("metadata.json")).unwrap();
    let metadata: Metadata = serde_json::from_str(&content).unwrap();

    assert_eq!(metadata.dataset, "nuScenes-mini");
    assert_eq!(metadata.version, VERSION);
    assert_eq!(metadata.num_samples, 2);
    assert_eq!(metadata.num_scenes, 1);
    assert_eq!(
        metadata.categories,
        vec!["vehicle.car", "human.pedestrian.adult"]
    );
    assert_eq!(metadata.sensors["LIDAR_TOP"], "lidar");
    assert!(content.find("\"dataset\"").unwrap() < content.find("\"format\"").unwrap());
}

#[test]
fn test_rerun_is_byte_identical() {
    let fixture = build_fixture();
    run_conversion(&fixture.config()).unwrap();
    let first = snapshot(&fixture.results());

    run_conversion(&fixture.config()).unwrap();
    assert_eq!(first, snapshot(&fixture.results()));
}

#[test]
fn test_parallel_matches_sequential() {
    let fixture = build_fixture();
    let sequential = run_conversion(&fixture.config()).unwrap();
    let expected = snapshot(&fixture.results());

    fs::remove_dir_all(fixture.results()).unwrap();
    let parallel = run_conversion(&fixture.config().with_parallel(true)).unwrap();

    assert_eq!(sequential, parallel);
    assert_eq!(expected, snapshot(&fixture.results()));
}

#[test]
fn test_missing_dataroot() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = ConversionConfig::new(
        temp_dir.path().join("absent"),
        VERSION,
        temp_dir.path().join("out"),
    );

    let err = run_conversion(&config).unwrap_err();
    assert!(matches!(err, ConvertError::MissingDataroot(_)));
    assert!(!temp_dir.path().join("out").exists());
}

#[test]
fn test_malformed_point_cloud_stops_the_run() {
    let fixture = build_fixture();
    fs::write(
        fixture.dataroot.join("samples/LIDAR_TOP/s1.pcd.bin"),
        [0u8; 24],
    )
    .unwrap();

    let err = run_conversion(&fixture.config()).unwrap_err();
    assert!(matches!(err, ConvertError::MalformedPointCloud { len: 24, .. }));
    assert!(!fixture.results().join("metadata.json").exists());
}
