use crate::cli::Cli;
use crate::error::Result;
use crate::host;

/// Serve the native messaging protocol. Stdout carries protocol frames only;
/// all diagnostics go to the log on stderr.
pub async fn run(cli: &Cli) -> Result<()> {
    let config = cli.load_config()?;
    tracing::debug!(
        "Starting host (runtime version {}, frame limit {} bytes)",
        config.runtime.effective_version(),
        config.host.max_message_bytes
    );
    host::run(&config).await
}
