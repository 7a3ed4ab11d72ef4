use std::env;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result, anyhow};
use chrono::{Duration, Weekday};
use chrono_tz::Tz;
use dotenvy::dotenv;

use crate::attendance::service::AttendanceSettings;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub api_prefix: String,

    // Rate limiting
    pub rate_attendance_per_min: u32,

    // Attendance rules
    pub timezone: Tz,
    pub weekend_days: Vec<Weekday>,
    pub location_max_age_secs: i64,
    pub geofence_cache_ttl_secs: u64,

    pub log_level: tracing::Level,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("invalid {key}={raw:?}: {e}"))
}

fn parse_weekend_days(raw: &str) -> Result<Vec<Weekday>> {
    raw.split(',')
        .map(str::trim)
        .filter(|day| !day.is_empty())
        .map(|day| {
            day.parse::<Weekday>()
                .map_err(|_| anyhow!("invalid weekday {day:?} in WEEKEND_DAYS"))
        })
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            rate_attendance_per_min: parsed("RATE_ATTENDANCE_PER_MIN", "120")?,

            timezone: parsed("TIMEZONE", "UTC")?,
            weekend_days: parse_weekend_days(
                &env::var("WEEKEND_DAYS").unwrap_or_else(|_| "Sat,Sun".to_string()),
            )?,
            location_max_age_secs: parsed("LOCATION_MAX_AGE_SECS", "60")?,
            geofence_cache_ttl_secs: parsed("GEOFENCE_CACHE_TTL_SECS", "300")?,

            log_level: parsed("LOG_LEVEL", "debug")?,
        })
    }

    pub fn attendance_settings(&self) -> AttendanceSettings {
        AttendanceSettings {
            timezone: self.timezone,
            weekend_days: self.weekend_days.clone(),
            location_max_age: Duration::seconds(self.location_max_age_secs),
            geofence_cache_ttl: StdDuration::from_secs(self.geofence_cache_ttl_secs),
        }
    }
}
