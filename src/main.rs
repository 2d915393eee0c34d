#![windows_subsystem = "windows"]

use anyhow::Result;
use log::{error, info, warn};

use regioncap::activation::{self, InstanceRole};
use regioncap::app::App;
use regioncap::capture::{CaptureOutput, FileSaveDialog, SystemClipboard};
use regioncap::config::Config;
use regioncap::signals;

fn main() -> Result<()> {
    let loaded = Config::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();
    if let Err(e) = &loaded {
        warn!("failed to load config, using defaults: {}", e);
    }

    let listener = match activation::acquire(config.activation_port) {
        InstanceRole::Secondary => {
            activation::signal_existing(config.activation_port, activation::SIGNAL_TIMEOUT);
            return Ok(());
        }
        InstanceRole::Primary(listener) => listener,
    };
    signals::install();

    let output = CaptureOutput::new(
        Box::new(SystemClipboard),
        Box::new(FileSaveDialog),
        config.save_dir.clone(),
        config.copy_on_save,
    );
    let mut app = App::new(config, listener, output);
    if let Err(e) = app.run() {
        error!("{:#}", e);
    }
    app.shutdown();
    info!("exiting");
    Ok(())
}
