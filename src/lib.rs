use anyhow::{Context, Result};

pub mod application;
pub mod bootstrap;
pub mod domain;
pub mod infrastructure;
pub mod settings;

pub use application::{SetupFailure, SetupReport};
pub use bootstrap::{load_models, setup_pinecone, LoadedModels, SetupCoordinator, SetupOutcome};
pub use domain::{SetupError, SetupStage};
pub use settings::SetupConfig;

/// Entry point invoked from `main.rs`.
///
/// Prints a JSON [`SetupReport`] on success, or a JSON [`SetupFailure`]
/// naming the failed stage before returning the error.
pub fn run() -> Result<()> {
    // A missing .env file is fine; the variables may come from the shell.
    let _ = dotenvy::dotenv();
    init_tracing();

    match SetupConfig::from_env().and_then(setup_pinecone) {
        Ok(outcome) => {
            let report = serde_json::to_string_pretty(&outcome.report())
                .context("failed to serialise setup report")?;
            println!("{report}");
            Ok(())
        }
        Err(err) => {
            let failure = SetupFailure {
                stage: err.stage().as_str().to_string(),
                error: err.to_string(),
            };
            let payload = serde_json::to_string_pretty(&failure)
                .context("failed to serialise setup failure")?;
            println!("{payload}");
            Err(err).context("pinecone setup failed")
        }
    }
}

/// Install the global subscriber; later calls are no-ops.
pub fn init_tracing() {
    init_tracing_with_writer(std::io::stderr);
}

fn init_tracing_with_writer<W>(make_writer: fn() -> W)
where
    W: std::io::Write + Send + Sync + 'static,
{
    static INIT: std::sync::OnceLock<()> = std::sync::OnceLock::new();

    let _ = INIT.get_or_init(|| {
        let filter = std::env::var("PINECONE_SETUP_LOG").unwrap_or_else(|_| "info".into());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(make_writer)
            .compact()
            .try_init();
    });
}
