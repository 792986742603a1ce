use crate::domain::{LendingPolicy, Money, policy};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/library";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
/// 延滞照合の間隔（既定：1日）
const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// 設定読み込みのエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("{key} must be greater than zero")]
    NotPositive { key: &'static str },
}

/// アプリケーション設定
///
/// | 環境変数 | 既定値 |
/// |---|---|
/// | `DATABASE_URL` | `postgres://localhost/library` |
/// | `PORT` | `3000` |
/// | `DATABASE_MAX_CONNECTIONS` | `5` |
/// | `LENDING_MAX_OPEN_LOANS` | `5` |
/// | `LENDING_DAILY_FINE_RATE` | `5000` |
/// | `LENDING_DEFAULT_LOAN_PERIOD_DAYS` | `14` |
/// | `RECONCILE_INTERVAL_SECS` | `86400` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub max_connections: u32,
    pub reconcile_interval: Duration,
    pub policy: LendingPolicy,
}

impl Config {
    /// プロセスの環境変数から読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の参照関数から読み込む
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let max_connections =
            positive_or(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        let reconcile_secs = positive_or(
            &lookup,
            "RECONCILE_INTERVAL_SECS",
            DEFAULT_RECONCILE_INTERVAL_SECS,
        )?;

        let max_open_loans = positive_or(
            &lookup,
            "LENDING_MAX_OPEN_LOANS",
            policy::DEFAULT_MAX_OPEN_LOANS,
        )?;
        let daily_fine_rate = parse_or(
            &lookup,
            "LENDING_DAILY_FINE_RATE",
            policy::DEFAULT_DAILY_FINE_RATE,
        )?;
        if daily_fine_rate < 0 {
            return Err(ConfigError::Invalid {
                key: "LENDING_DAILY_FINE_RATE",
                value: daily_fine_rate.to_string(),
            });
        }
        let default_loan_period_days = positive_or(
            &lookup,
            "LENDING_DEFAULT_LOAN_PERIOD_DAYS",
            policy::DEFAULT_LOAN_PERIOD_DAYS,
        )?;

        Ok(Self {
            database_url,
            port,
            max_connections,
            reconcile_interval: Duration::from_secs(reconcile_secs),
            policy: LendingPolicy {
                max_open_loans,
                daily_fine_rate: Money::from_minor_units(daily_fine_rate),
                default_loan_period_days,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

fn positive_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + Default,
{
    let value = parse_or(lookup, key, default)?;
    if value <= T::default() {
        return Err(ConfigError::NotPositive { key });
    }
    Ok(value)
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
    fn test_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();

        assert_eq!(config.database_url, "postgres://localhost/library");
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.reconcile_interval, Duration::from_secs(86400));
        assert_eq!(config.policy, LendingPolicy::default());
        assert_eq!(config.policy.max_open_loans, 5);
        assert_eq!(
            config.policy.daily_fine_rate,
            Money::from_minor_units(5000)
        );
        assert_eq!(config.policy.default_loan_period_days, 14);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/lending"),
            ("PORT", "8080"),
            ("LENDING_MAX_OPEN_LOANS", "3"),
            ("LENDING_DAILY_FINE_RATE", "1000"),
            ("LENDING_DEFAULT_LOAN_PERIOD_DAYS", "7"),
            ("RECONCILE_INTERVAL_SECS", "60"),
        ]))
        .unwrap();

        assert_eq!(config.database_url, "postgres://db/lending");
        assert_eq!(config.port, 8080);
        assert_eq!(config.reconcile_interval, Duration::from_secs(60));
        assert_eq!(config.policy.max_open_loans, 3);
        assert_eq!(config.policy.daily_fine_rate, Money::from_minor_units(1000));
        assert_eq!(config.policy.default_loan_period_days, 7);
    }

    #[test]
    fn test_invalid_number() {
        let result = Config::from_lookup(lookup_from(&[("PORT", "eighty")]));
        assert_eq!(
            result,
            Err(ConfigError::Invalid {
                key: "PORT",
                value: "eighty".to_string(),
            })
        );
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = Config::from_lookup(lookup_from(&[("RECONCILE_INTERVAL_SECS", "0")]));
        assert_eq!(
            result,
            Err(ConfigError::NotPositive {
                key: "RECONCILE_INTERVAL_SECS",
            })
        );
    }

    #[test]
    fn test_negative_fine_rate_rejected() {
        let result = Config::from_lookup(lookup_from(&[("LENDING_DAILY_FINE_RATE", "-1")]));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                key: "LENDING_DAILY_FINE_RATE",
                ..
            })
        ));
    }
}
