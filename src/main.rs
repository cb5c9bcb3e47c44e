use clap::Parser;

use log::{error, info};

use nuscenes2npy::{run_conversion, Args};

fn main() {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = args.to_config();

    info!(
        "Starting the conversion of {} ({})...",
        config.dataroot.display(),
        config.version
    );

    if let Err(e) = run_conversion(&config) {
        error!("Conversion failed: {}", e);
        std::process::exit(1);
    }
}
