use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` directives are honoured, `default_directive` (for example
/// `"nextroute=info"`) is added on top. Calling it again once a subscriber
/// is installed is an error.
pub fn init(default_directive: &str) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(default_directive.parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|error| anyhow!("Failed to install the tracing subscriber: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_directive() {
        assert!(init("nextroute=loud").is_err());
    }
}
