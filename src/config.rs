use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::calc::{geofence::Geofence, pay::PayPolicy};

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,

    // argon2 PHC strings, never plaintext
    pub admin_password_hash: String,
    pub staff_password_hash: String,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_pin_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// IANA zone used for record dates and displayed times.
    pub timezone: String,
    pub geofence: Geofence,
    pub pay_policy: PayPolicy,
    pub retention_months: u32,
    pub prune_interval_secs: u64,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{} must be set", key))
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, v)),
        None => Ok(default),
    }
}

fn var_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_or(key, env::var(key).ok(), default)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let fence = Geofence::default();
        let policy = PayPolicy::default();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: var_or("ACCESS_TOKEN_TTL", 43_200)?, // default 12 h, one shift

            admin_password_hash: required("ADMIN_PASSWORD_HASH")?,
            staff_password_hash: required("STAFF_PASSWORD_HASH")?,

            rate_login_per_min: var_or("RATE_LOGIN_PER_MIN", 10)?,
            rate_pin_per_min: var_or("RATE_PIN_PER_MIN", 10)?,
            rate_protected_per_min: var_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            timezone: env::var("TIMEZONE").unwrap_or_else(|_| "Europe/London".to_string()),
            geofence: Geofence {
                lat: var_or("GEOFENCE_LAT", fence.lat)?,
                lng: var_or("GEOFENCE_LNG", fence.lng)?,
                radius_m: var_or("GEOFENCE_RADIUS_M", fence.radius_m)?,
            },
            pay_policy: PayPolicy {
                bank_hour_cap: var_or("BANK_HOUR_CAP", policy.bank_hour_cap)?,
                default_rate: var_or("DEFAULT_HOURLY_RATE", policy.default_rate)?,
            },
            retention_months: var_or("RETENTION_MONTHS", 6)?,
            prune_interval_secs: var_or("PRUNE_INTERVAL_SECS", 86_400)?,
        })
    }
}

#[cfg(test)]
impl Config {
    /// Configuration for handler tests; never touches the environment.
    pub fn for_tests() -> Self {
        Self {
            database_url: "postgres://localhost/staff_clock_test".into(),
            jwt_secret: "test-secret".into(),
            server_addr: "127.0.0.1:0".into(),
            access_token_ttl: 900,
            admin_password_hash: String::new(),
            staff_password_hash: String::new(),
            rate_login_per_min: 60,
            rate_pin_per_min: 60,
            rate_protected_per_min: 1000,
            api_prefix: "/api".into(),
            timezone: "Europe/London".into(),
            geofence: Geofence::default(),
            pay_policy: PayPolicy::default(),
            retention_months: 6,
            prune_interval_secs: 86_400,
        }
    }
}
