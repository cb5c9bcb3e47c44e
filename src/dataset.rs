use indicatif::ProgressBar;
use log::info;
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};

use crate::config::{ConversionConfig, PROGRESS_INTERVAL};
use crate::conversion::{process_sample, SampleOutcome};
use crate::error::{ConvertError, Result};
use crate::index::TableIndex;
use crate::io::{load_tables, setup_output_directories, write_metadata};
use crate::types::{ConversionStats, OutputDirs, Tables};
use crate::utils::create_progress_bar;

/// Running counters shared by the sample loop, sequential or parallel
struct ProgressTracker {
    total: usize,
    processed: AtomicUsize,
    images: AtomicUsize,
    point_clouds: AtomicUsize,
    missing_files: AtomicUsize,
    pb: ProgressBar,
}

impl ProgressTracker {
    fn new(total: usize) -> Self {
        Self {
            total,
            processed: AtomicUsize::new(0),
            images: AtomicUsize::new(0),
            point_clouds: AtomicUsize::new(0),
            missing_files: AtomicUsize::new(0),
            pb: create_progress_bar(total as u64, "Samples"),
        }
    }

    fn record(&self, outcome: SampleOutcome) {
        self.images.fetch_add(outcome.images, Relaxed);
        self.point_clouds.fetch_add(outcome.point_clouds, Relaxed);
        self.missing_files.fetch_add(outcome.missing_files, Relaxed);
        let done = self.processed.fetch_add(1, Relaxed) + 1;
        self.pb.inc(1);

        if done % PROGRESS_INTERVAL == 0 {
            info!(
                "Processed {}/{} samples - Images: {}, PC: {}",
                done,
                self.total,
                self.images.load(Relaxed),
                self.point_clouds.load(Relaxed)
            );
        }
    }

    fn finish(self) -> ConversionStats {
        self.pb.finish_with_message("Sample processing complete");
        let processed = self.processed.into_inner();
        ConversionStats {
            samples_processed: processed,
            images_saved: self.images.into_inner(),
            point_clouds_saved: self.point_clouds.into_inner(),
            annotations_saved: processed,
            missing_files: self.missing_files.into_inner(),
        }
    }
}

/// Run the per-sample processor over every sample, in table order unless `parallel`
pub fn process_samples(
    tables: &Tables,
    index: &TableIndex,
    dataroot: &Path,
    output_dirs: &OutputDirs,
    parallel: bool,
) -> Result<ConversionStats> {
    let tracker = ProgressTracker::new(tables.sample.len());

    if parallel {
        tables.sample.par_iter().try_for_each(|sample| {
            let outcome = process_sample(sample, index, dataroot, output_dirs)?;
            tracker.record(outcome);
            Ok::<(), ConvertError>(())
        })?;
    } else {
        for sample in &tables.sample {
            let outcome = process_sample(sample, index, dataroot, output_dirs)?;
            tracker.record(outcome);
        }
    }

    Ok(tracker.finish())
}

/// Main conversion pipeline: load tables, build indices once, convert samples, write metadata
pub fn run_conversion(config: &ConversionConfig) -> Result<ConversionStats> {
    if !config.dataroot.exists() {
        return Err(ConvertError::MissingDataroot(config.dataroot.clone()));
    }

    let output_dirs = setup_output_directories(&config.results_dir())?;
    info!("Loading tables from {}", config.tables_dir().display());
    let tables = load_tables(&config.dataroot, &config.version)?;
    let index = TableIndex::build(&tables);

    info!("Processing {} samples...", tables.sample.len());
    let stats = process_samples(
        &tables,
        &index,
        &config.dataroot,
        &output_dirs,
        config.parallel,
    )?;

    info!("Creating metadata.json file...");
    write_metadata(&output_dirs, &tables, &config.version)?;
    stats.print_summary(&output_dirs.results_dir);

    Ok(stats)
}
