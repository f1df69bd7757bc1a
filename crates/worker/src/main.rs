use std::process::ExitCode;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use stockfolio_worker::{run, ReplaySession, WorkerError, WorkerSettings};

/// Logs go to stderr; stdout carries only the result document.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .init();
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let settings = WorkerSettings::from_env();

    let (response, code) = run(&args, settings, |settings| match &settings.replay_file {
        Some(path) => ReplaySession::from_file(path),
        None => Err(WorkerError::SessionUnavailable(
            "no vendor control on this platform; set KIWOOM_REPLAY_FILE".to_string(),
        )),
    });

    let line = serde_json::to_string(&response).unwrap_or_else(|e| {
        format!(r#"{{"success":false,"error":"cannot encode result: {e}"}}"#)
    });
    println!("{line}");

    if code == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
