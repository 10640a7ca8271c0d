//! Log output for the `reskit` binary

use crate::error::{Error, Result};
use crate::settings::Settings;

/// Install a `tracing` subscriber printing events at `level` and above.
///
/// `level` is one of `trace`, `debug`, `info`, `warn` or `error`. Fails if a
/// global subscriber is already installed.
pub fn init(level: &str) -> Result<()> {
    let level: tracing::Level = level
        .parse()
        .map_err(|_| Error::Config(format!("unknown log level '{level}'")))?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| Error::Config(e.to_string()))
}

/// [`init`] with the level from `settings`.
pub fn init_from_settings(settings: &Settings) -> Result<()> {
    init(&settings.log_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unknown_level() {
        assert!(matches!(init("chatty"), Err(Error::Config(_))));
    }
}
