use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::services::RefundPolicy;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/eventmaster";
const DEFAULT_PAYMENT_STORE_PATH: &str = "data/payment.json";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub payment_store_path: PathBuf,
    pub refund_ratio: Decimal,
    pub cancellation_window_hours: i64,
    pub occurrence_lock_timeout: Duration,
    pub production: bool,
    pub cors_allowed_origins: String,
}

impl Default for Config {
    fn default() -> Self {
        let policy = RefundPolicy::default();
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            database_max_connections: 5,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3001)),
            payment_store_path: PathBuf::from(DEFAULT_PAYMENT_STORE_PATH),
            refund_ratio: policy.refund_ratio,
            cancellation_window_hours: policy.cancellation_window.num_hours(),
            occurrence_lock_timeout: Duration::from_millis(5000),
            production: false,
            cors_allowed_origins: DEFAULT_ALLOWED_ORIGINS.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Missing keys take the default;
    /// unparsable ones are logged and also take the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let refund_ratio = parse_or(&lookup, "REFUND_RATIO", defaults.refund_ratio);
        let refund_ratio = if (Decimal::ZERO..=Decimal::ONE).contains(&refund_ratio) {
            refund_ratio
        } else {
            tracing::warn!(%refund_ratio, "REFUND_RATIO must be between 0 and 1, using default");
            defaults.refund_ratio
        };

        let window = parse_or(
            &lookup,
            "CANCELLATION_WINDOW_HOURS",
            defaults.cancellation_window_hours,
        );
        let window = if window >= 0 && chrono::Duration::try_hours(window).is_some() {
            window
        } else {
            tracing::warn!(
                hours = window,
                "CANCELLATION_WINDOW_HOURS is out of range, using default"
            );
            defaults.cancellation_window_hours
        };

        Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            bind_addr: parse_or(&lookup, "BIND_ADDR", defaults.bind_addr),
            payment_store_path: lookup("PAYMENT_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.payment_store_path),
            refund_ratio,
            cancellation_window_hours: window,
            occurrence_lock_timeout: Duration::from_millis(parse_or(
                &lookup,
                "OCCURRENCE_LOCK_TIMEOUT_MS",
                5000u64,
            )),
            production: lookup("RUST_ENV")
                .map(|v| v.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .unwrap_or(defaults.cors_allowed_origins),
        }
    }

    pub fn refund_policy(&self) -> RefundPolicy {
        let cancellation_window = chrono::Duration::try_hours(self.cancellation_window_hours)
            .unwrap_or_else(|| RefundPolicy::default().cancellation_window);
        RefundPolicy {
            refund_ratio: self.refund_ratio,
            cancellation_window,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(key, value = %raw, "Invalid config value, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[]);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:3001");
        assert_eq!(config.refund_policy(), RefundPolicy::default());
        assert_eq!(config.occurrence_lock_timeout, Duration::from_secs(5));
        assert!(!config.production);
    }

    #[test]
    fn values_are_read_from_the_environment() {
        let config = config(&[
            ("REFUND_RATIO", "0.9"),
            ("CANCELLATION_WINDOW_HOURS", "48"),
            ("OCCURRENCE_LOCK_TIMEOUT_MS", "250"),
            ("RUST_ENV", "Production"),
        ]);
        assert_eq!(config.refund_ratio, Decimal::new(9, 1));
        assert_eq!(
            config.refund_policy().cancellation_window,
            chrono::Duration::hours(48)
        );
        assert_eq!(config.occurrence_lock_timeout, Duration::from_millis(250));
        assert!(config.production);
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let config = config(&[
            ("REFUND_RATIO", "1.5"),
            ("DATABASE_MAX_CONNECTIONS", "many"),
            ("BIND_ADDR", "nowhere"),
        ]);
        assert_eq!(config.refund_ratio, Decimal::new(85, 2));
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:3001");
    }

    #[test]
    fn out_of_range_window_falls_back_to_default() {
        for hours in ["9223372036854775807", "-3"] {
            let config = config(&[("CANCELLATION_WINDOW_HOURS", hours)]);
            assert_eq!(config.cancellation_window_hours, 24);
            assert_eq!(
                config.refund_policy().cancellation_window,
                chrono::Duration::hours(24)
            );
        }

        let config = Config {
            cancellation_window_hours: i64::MAX,
            ..Config::default()
        };
        assert_eq!(config.refund_policy(), RefundPolicy::default());
    }
}
