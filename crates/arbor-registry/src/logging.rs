//! Logging setup for binaries embedding a registry

use arbor_core::{ArborError, ArborResult};
use tracing_subscriber::{fmt, EnvFilter};

/// Install a global fmt subscriber filtered by `filter`
///
/// `filter` uses `EnvFilter` syntax, e.g. `"info"` or
/// `"arbor_registry=debug,arbor_graph=trace"`. Fails if the directive
/// does not parse or a global subscriber is already set.
pub fn init_logging(filter: &str) -> ArborResult<()> {
    let filter = EnvFilter::try_new(filter)
        .map_err(|e| ArborError::Logging(format!("invalid filter: {e}")))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|_| ArborError::Logging("already initialized".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_once() {
        assert!(matches!(
            init_logging("arbor=notalevel"),
            Err(ArborError::Logging(_))
        ));

        // Only the first install in this process wins
        let _ = init_logging("debug");
        assert!(matches!(
            init_logging("debug"),
            Err(ArborError::Logging(_))
        ));
    }
}
