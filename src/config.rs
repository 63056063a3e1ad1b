use std::net::IpAddr;
use std::path::PathBuf;

use chrono::FixedOffset;
use ipnet::IpNet;

use crate::verify::freshness::CaptureTimePolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    /// Maximum distance in meters between the device and the facility's
    /// registered coordinates for a submission to be accepted.
    pub geofence_radius_meters: f64,
    /// Maximum age in hours of the evidence photo at submission time.
    pub max_evidence_age_hours: f64,
    /// Fraction of the current tax amount removed per approved submission.
    pub discount_rate: f64,
    pub capture_time_policy: CaptureTimePolicy,
    /// Offset used to resolve timezone-naive capture timestamps (EXIF
    /// carries no zone). Deployments set this to the region they serve.
    pub capture_time_offset: FixedOffset,
    pub evidence_dir: PathBuf,
    pub max_body_size: usize,
    /// Submissions allowed per account within one rate window.
    pub submission_rate_limit: u32,
    pub submission_rate_window_secs: u64,
    pub trusted_proxies: Vec<IpNet>,
    /// Deadline handed to `location::acquire` by device-side callers.
    pub location_timeout_secs: u64,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;

        let host: IpAddr = env_or("GREENTAX_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid GREENTAX_HOST: {e}"))?;

        let port: u16 = env_or("GREENTAX_PORT", "5000")
            .parse()
            .map_err(|e| format!("Invalid GREENTAX_PORT: {e}"))?;

        let geofence_radius_meters: f64 = env_or("GREENTAX_GEOFENCE_RADIUS_M", "50")
            .parse()
            .map_err(|e| format!("Invalid GREENTAX_GEOFENCE_RADIUS_M: {e}"))?;
        if !geofence_radius_meters.is_finite() || geofence_radius_meters <= 0.0 {
            return Err("GREENTAX_GEOFENCE_RADIUS_M must be a positive number".to_string());
        }

        let max_evidence_age_hours: f64 = env_or("GREENTAX_MAX_EVIDENCE_AGE_HOURS", "2")
            .parse()
            .map_err(|e| format!("Invalid GREENTAX_MAX_EVIDENCE_AGE_HOURS: {e}"))?;
        if !max_evidence_age_hours.is_finite() || max_evidence_age_hours <= 0.0 {
            return Err("GREENTAX_MAX_EVIDENCE_AGE_HOURS must be a positive number".to_string());
        }

        let discount_rate: f64 = env_or("GREENTAX_DISCOUNT_RATE", "0.05")
            .parse()
            .map_err(|e| format!("Invalid GREENTAX_DISCOUNT_RATE: {e}"))?;
        if !(discount_rate > 0.0 && discount_rate < 1.0) {
            return Err("GREENTAX_DISCOUNT_RATE must be a fraction between 0 and 1".to_string());
        }

        let capture_time_policy = match env_or("GREENTAX_CAPTURE_TIME_POLICY", "strict").as_str() {
            "lenient" => CaptureTimePolicy::Lenient,
            "strict" => CaptureTimePolicy::Strict,
            other => {
                return Err(format!(
                    "Invalid GREENTAX_CAPTURE_TIME_POLICY '{other}': expected 'strict' or 'lenient'"
                ));
            }
        };

        let offset_minutes: i32 = env_or("GREENTAX_CAPTURE_TIME_OFFSET_MINUTES", "0")
            .parse()
            .map_err(|e| format!("Invalid GREENTAX_CAPTURE_TIME_OFFSET_MINUTES: {e}"))?;
        let capture_time_offset = FixedOffset::east_opt(offset_minutes * 60).ok_or_else(|| {
            format!("GREENTAX_CAPTURE_TIME_OFFSET_MINUTES out of range: {offset_minutes}")
        })?;

        let evidence_dir = PathBuf::from(env_or("GREENTAX_EVIDENCE_DIR", "compost-evidence"));

        let max_body_size: usize = env_or("GREENTAX_MAX_BODY_SIZE", "10485760")
            .parse()
            .map_err(|e| format!("Invalid GREENTAX_MAX_BODY_SIZE: {e}"))?;

        let submission_rate_limit: u32 = env_or("GREENTAX_SUBMISSION_RATE_LIMIT", "30")
            .parse()
            .map_err(|e| format!("Invalid GREENTAX_SUBMISSION_RATE_LIMIT: {e}"))?;

        let submission_rate_window_secs: u64 = env_or("GREENTAX_SUBMISSION_RATE_WINDOW_SECS", "3600")
            .parse()
            .map_err(|e| format!("Invalid GREENTAX_SUBMISSION_RATE_WINDOW_SECS: {e}"))?;

        let trusted_proxies: Vec<IpNet> = env_or("GREENTAX_TRUSTED_PROXIES", "")
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim()
                    .parse()
                    .map_err(|e| format!("Invalid GREENTAX_TRUSTED_PROXIES entry '{s}': {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let location_timeout_secs: u64 = env_or("GREENTAX_LOCATION_TIMEOUT_SECS", "15")
            .parse()
            .map_err(|e| format!("Invalid GREENTAX_LOCATION_TIMEOUT_SECS: {e}"))?;

        let log_level = env_or("GREENTAX_LOG_LEVEL", "info");

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            geofence_radius_meters,
            max_evidence_age_hours,
            discount_rate,
            capture_time_policy,
            capture_time_offset,
            evidence_dir,
            max_body_size,
            submission_rate_limit,
            submission_rate_window_secs,
            trusted_proxies,
            location_timeout_secs,
            log_level,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
