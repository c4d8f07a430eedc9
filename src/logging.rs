use anyhow::Context as _;
use tracing::Dispatch;

/// Builds the process subscriber without installing it globally.
///
/// Callers attach the returned dispatcher to the futures they drive
/// (`tracing::instrument::WithSubscriber`), and spawned tasks inherit it
/// through `with_current_subscriber`.
pub fn subscriber() -> anyhow::Result<Dispatch> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
        .context("build log filter")?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .finish();

    Ok(Dispatch::new(subscriber))
}
