use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::cli::Cli;
use crate::monitor::probe::{DEFAULT_BULK_SUCCESS_RATE, DEFAULT_RETRY_SUCCESS_RATE};
use crate::monitor::MonitorConfig;
use crate::scheduler::MAX_INTERVAL_SECONDS;
use crate::services::crm::CrmSettings;
use crate::services::email::EmailSettings;
use crate::services::sms::SmsSettings;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub monitor: MonitorConfig,
    pub retry_success_rate: f64,
    pub bulk_success_rate: f64,
    pub simulation_seed: Option<u64>,
    pub auto_check_interval_seconds: u64,
    pub email: EmailSettings,
    pub sms: SmsSettings,
    pub crm: CrmSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup. `from_env` passes the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = parse_or("BIND_ADDR", &lookup, DEFAULT_BIND_ADDR.parse::<SocketAddr>())?;

        let defaults = MonitorConfig::default();
        let monitor = MonitorConfig {
            retry_delay: millis_or("RETRY_DELAY_MS", &lookup, defaults.retry_delay)?,
            stagger_delay: millis_or("STAGGER_DELAY_MS", &lookup, defaults.stagger_delay)?,
            resolve_delay: millis_or("RESOLVE_DELAY_MS", &lookup, defaults.resolve_delay)?,
            probe_timeout: millis_or("PROBE_TIMEOUT_MS", &lookup, defaults.probe_timeout)?,
        };
        if monitor.probe_timeout.is_zero() {
            return Err("PROBE_TIMEOUT_MS must be greater than 0".to_string());
        }

        let retry_success_rate = rate_or("RETRY_SUCCESS_RATE", &lookup, DEFAULT_RETRY_SUCCESS_RATE)?;
        let bulk_success_rate = rate_or("BULK_SUCCESS_RATE", &lookup, DEFAULT_BULK_SUCCESS_RATE)?;

        let simulation_seed = match lookup("SIMULATION_SEED") {
            Some(raw) => Some(
                raw.parse::<u64>()
                    .map_err(|_| "SIMULATION_SEED must be a valid number")?,
            ),
            None => None,
        };

        let auto_check_interval_seconds = parse_or("AUTO_CHECK_INTERVAL_SECONDS", &lookup, Ok(0u64))?;
        if auto_check_interval_seconds > MAX_INTERVAL_SECONDS {
            return Err(format!(
                "AUTO_CHECK_INTERVAL_SECONDS must be at most {}, got {}",
                MAX_INTERVAL_SECONDS, auto_check_interval_seconds
            ));
        }

        let email_defaults = EmailSettings::default();
        let email = EmailSettings {
            base_url: lookup("EMAIL_API_URL").unwrap_or(email_defaults.base_url),
            api_key: lookup("EMAIL_API_KEY").unwrap_or(email_defaults.api_key),
            from_email: lookup("FROM_EMAIL").unwrap_or(email_defaults.from_email),
            from_name: lookup("FROM_NAME").unwrap_or(email_defaults.from_name),
        };

        let sms_defaults = SmsSettings::default();
        let sms = SmsSettings {
            base_url: lookup("SMS_API_URL").unwrap_or(sms_defaults.base_url),
            api_key: lookup("SMS_API_KEY").unwrap_or(sms_defaults.api_key),
            from_number: lookup("FROM_NUMBER").unwrap_or(sms_defaults.from_number),
            account_sid: lookup("TWILIO_ACCOUNT_SID"),
            auth_token: lookup("TWILIO_AUTH_TOKEN"),
        };

        let crm_defaults = CrmSettings::default();
        let crm = CrmSettings {
            base_url: lookup("CRM_API_URL").unwrap_or(crm_defaults.base_url),
            api_key: lookup("CRM_API_KEY").unwrap_or(crm_defaults.api_key),
        };

        Ok(Self {
            bind_addr,
            monitor,
            retry_success_rate,
            bulk_success_rate,
            simulation_seed,
            auto_check_interval_seconds,
            email,
            sms,
            crm,
        })
    }

    /// Command-line flags win over the environment.
    pub fn apply_cli(mut self, cli: &Cli) -> Self {
        if let Some(bind) = cli.bind {
            self.bind_addr = bind;
        }
        if let Some(seed) = cli.seed {
            self.simulation_seed = Some(seed);
        }
        if let Some(interval) = cli.auto_check_interval {
            self.auto_check_interval_seconds = interval;
        }
        self
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: Result<T, T::Err>) -> Result<T, String>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} has an invalid value: {}", key, raw)),
        None => default.map_err(|_| format!("{} default is invalid", key)),
    }
}

fn millis_or<F>(key: &str, lookup: &F, default: Duration) -> Result<Duration, String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| format!("{} must be a valid number of milliseconds", key)),
        None => Ok(default),
    }
}

fn rate_or<F>(key: &str, lookup: &F, default: f64) -> Result<f64, String>
where
    F: Fn(&str) -> Option<String>,
{
    let rate = match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("{} must be a number", key))?,
        None => return Ok(default),
    };
    if !(0.0..=1.0).contains(&rate) {
        return Err(format!("{} must be between 0 and 1, got {}", key, rate));
    }
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR.parse().unwrap());
        assert_eq!(config.monitor, MonitorConfig::default());
        assert!((config.retry_success_rate - 0.30).abs() < f64::EPSILON);
        assert!((config.bulk_success_rate - 0.70).abs() < f64::EPSILON);
        assert_eq!(config.simulation_seed, None);
        assert_eq!(config.auto_check_interval_seconds, 0);
        assert_eq!(config.email.base_url, "https://api.sendgrid.com/v3");
        assert_eq!(config.crm.base_url, "https://api.hubapi.com");
        assert!(config.sms.account_sid.is_none());
    }

    #[test]
    fn overrides_are_read() {
        let config = Config::from_lookup(lookup_from(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("RETRY_DELAY_MS", "100"),
            ("STAGGER_DELAY_MS", "10"),
            ("RESOLVE_DELAY_MS", "50"),
            ("RETRY_SUCCESS_RATE", "0.5"),
            ("SIMULATION_SEED", "42"),
            ("TWILIO_ACCOUNT_SID", "AC1"),
            ("TWILIO_AUTH_TOKEN", "tok"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.monitor.retry_delay, Duration::from_millis(100));
        assert_eq!(config.monitor.stagger_delay, Duration::from_millis(10));
        assert_eq!(config.monitor.resolve_delay, Duration::from_millis(50));
        assert!((config.retry_success_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.simulation_seed, Some(42));
        assert_eq!(config.sms.account_sid.as_deref(), Some("AC1"));
    }

    #[test]
    fn rate_outside_unit_interval_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("BULK_SUCCESS_RATE", "1.5")])).unwrap_err();
        assert!(err.contains("BULK_SUCCESS_RATE"));
    }

    #[test]
    fn non_numeric_delay_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("RETRY_DELAY_MS", "soon")])).unwrap_err();
        assert!(err.contains("RETRY_DELAY_MS"));
    }

    #[test]
    fn zero_probe_timeout_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("PROBE_TIMEOUT_MS", "0")])).unwrap_err();
        assert!(err.contains("PROBE_TIMEOUT_MS"));

        let config = Config::from_lookup(lookup_from(&[("PROBE_TIMEOUT_MS", "250")])).unwrap();
        assert_eq!(config.monitor.probe_timeout, Duration::from_millis(250));
    }

    #[test]
    fn auto_check_interval_above_one_week_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[(
            "AUTO_CHECK_INTERVAL_SECONDS",
            "18446744073709551615",
        )]))
        .unwrap_err();
        assert!(err.contains("AUTO_CHECK_INTERVAL_SECONDS"));

        let config = Config::from_lookup(lookup_from(&[("AUTO_CHECK_INTERVAL_SECONDS", "604800")])).unwrap();
        assert_eq!(config.auto_check_interval_seconds, MAX_INTERVAL_SECONDS);
    }

    #[test]
    fn invalid_bind_addr_is_rejected() {
        assert!(Config::from_lookup(lookup_from(&[("BIND_ADDR", "nowhere")])).is_err());
    }

    #[test]
    fn cli_flags_override_environment() {
        let config = Config::from_lookup(lookup_from(&[("SIMULATION_SEED", "1")]))
            .unwrap()
            .apply_cli(&Cli {
                bind: Some("127.0.0.1:7000".parse().unwrap()),
                seed: Some(99),
                auto_check_interval: Some(60),
            });

        assert_eq!(config.bind_addr.port(), 7000);
        assert_eq!(config.simulation_seed, Some(99));
        assert_eq!(config.auto_check_interval_seconds, 60);
    }
}
