// Tracing log adapter - subscriber setup for structured logging

use tracing_subscriber::EnvFilter;

use crate::domain::errors::DomainError;

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` applies to this crate and
/// everything else logs warnings only. Output goes to stderr so stdout stays
/// free for the event stream.
pub fn init_tracing(level: &str, json: bool) -> Result<(), DomainError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive(level))
            .map_err(|e| DomainError::BadArgs(format!("Invalid log level '{}': {}", level, e)))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    // A subscriber may already be installed (tests, embedding); keep it
    if let Err(e) = installed {
        tracing::debug!("Tracing already initialised: {}", e);
    }
    Ok(())
}

fn default_directive(level: &str) -> String {
    format!("warn,recoder={}", level.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive("DEBUG"), "warn,recoder=debug");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        assert!(init_tracing("info", false).is_ok());
        assert!(init_tracing("debug", true).is_ok());
    }
}
