use crate::Environment;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, prelude::*};

const DEFAULT_DEV_FILTER: &str = "debug,domain_sessions=trace,tower_http=debug,sea_orm=info";
const DEFAULT_PROD_FILTER: &str = "info,domain_sessions=info,tower_http=info,sea_orm=warn";

/// Install color-eyre for readable startup errors.
///
/// Safe to call more than once; later calls are ignored.
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

/// Builds the filter from `RUST_LOG`, falling back to per-environment defaults.
pub fn default_filter(environment: &Environment) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if environment.is_production() {
            EnvFilter::new(DEFAULT_PROD_FILTER)
        } else {
            EnvFilter::new(DEFAULT_DEV_FILTER)
        }
    })
}

/// Initialize the global subscriber.
///
/// - **Production**: flattened JSON events without targets, for log shipping.
/// - **Development**: pretty multi-line output.
///
/// Both register `tracing_error::ErrorLayer` so `eyre` reports carry span traces.
/// Calling this twice is harmless (tests do it all the time); the second call
/// leaves the first subscriber in place.
pub fn init_tracing(environment: &Environment) {
    let filter = default_filter(environment);

    let result = if environment.is_production() {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .flatten_event(true),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false)
                    .pretty(),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    };

    match result {
        Ok(_) => info!(environment = ?environment, "Tracing initialized"),
        Err(_) => debug!("Tracing already initialized, skipping re-initialization"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_multiple_calls() {
        let env = Environment::Development;
        init_tracing(&env);
        init_tracing(&env);
        init_tracing(&Environment::Production);
    }

    #[test]
    fn test_default_filter_honours_rust_log() {
        temp_env::with_var("RUST_LOG", Some("warn"), || {
            let filter = default_filter(&Environment::Production);
            assert_eq!(filter.to_string(), "warn");
        });
    }

    #[test]
    fn test_default_filter_per_environment() {
        temp_env::with_var_unset("RUST_LOG", || {
            assert!(default_filter(&Environment::Production)
                .to_string()
                .contains("domain_sessions=info"));
            assert!(default_filter(&Environment::Development)
                .to_string()
                .contains("domain_sessions=trace"));
        });
    }
}
