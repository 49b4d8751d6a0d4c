mod config;
mod payload;
mod startup;

use anyhow::Result;
use tracing::info;

use anti_tamper::TamperEngine;
use config::GuardConfig;
use payload::BuiltinPayload;
use startup::run_startup;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = GuardConfig::load()?;
    let mut engine = TamperEngine::new(config.tamper_config(), default_backend());
    let mut payload = BuiltinPayload::default();

    info!(
        detection_enabled = engine.config().enabled,
        payload = config.payload_path.as_deref().unwrap_or("<builtin>"),
        "gateguard starting"
    );

    let code = run_startup(&mut engine, &mut payload, &config);
    std::process::exit(code)
}

#[cfg(unix)]
fn default_backend() -> platform_probe::PosixProbe {
    platform_probe::PosixProbe::new()
}

#[cfg(not(unix))]
fn default_backend() -> platform_probe::WindowsProbe {
    platform_probe::WindowsProbe::new()
}
