use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConvertError, Result};

/// Create a progress bar with the given length and label
pub fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
                label
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Create an output directory if needed. Existing contents are kept and overwritten file by file.
pub fn create_output_directory(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        log::debug!("Directory {:?} already exists, reusing it.", path);
    }
    fs::create_dir_all(path).map_err(|e| ConvertError::io(path, e))?;
    Ok(path.to_path_buf())
}

/// `<sample_token>_<channel>.npy`
pub fn image_file_name(sample_token: &str, channel: &str) -> String {
    format!(
        "{}.npy",
        sanitize_filename::sanitize(format!("{}_{}", sample_token, channel))
    )
}

/// `<sample_token>.npy`
pub fn point_cloud_file_name(sample_token: &str) -> String {
    format!("{}.npy", sanitize_filename::sanitize(sample_token))
}

/// `<sample_token>.json`
pub fn annotation_file_name(sample_token: &str) -> String {
    format!("{}.json", sanitize_filename::sanitize(sample_token))
}
