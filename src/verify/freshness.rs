use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;

/// Policy for submissions whose evidence carries no capture timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTimePolicy {
    /// Fail closed: missing capture metadata blocks the submission.
    Strict,
    /// Accept with a warning and an unknown age.
    Lenient,
}

/// A capture timestamp extracted from evidence metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureTimestamp {
    /// Timezone-aware; age computation is exact.
    Utc(DateTime<Utc>),
    /// Timezone-naive (EXIF `DateTimeOriginal` encodes no zone). Resolved
    /// against a caller-supplied reference offset, so the computed age is
    /// approximate by however far the device's offset differed from it.
    Naive(NaiveDateTime),
}

impl CaptureTimestamp {
    /// Parse an RFC 3339 timestamp, or the EXIF `DateTimeOriginal` layout
    /// `YYYY:MM:DD HH:MM:SS`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(CaptureTimestamp::Utc(dt.with_timezone(&Utc)));
        }

        NaiveDateTime::parse_from_str(raw, "%Y:%m:%d %H:%M:%S")
            .ok()
            .map(CaptureTimestamp::Naive)
    }

    pub fn is_naive(&self) -> bool {
        matches!(self, CaptureTimestamp::Naive(_))
    }

    /// Resolve to UTC, interpreting naive timestamps in `naive_offset`.
    pub fn resolve(self, naive_offset: FixedOffset) -> DateTime<Utc> {
        match self {
            CaptureTimestamp::Utc(dt) => dt,
            CaptureTimestamp::Naive(ndt) => naive_offset
                .from_local_datetime(&ndt)
                .single()
                .map(|dt| dt.with_timezone(&Utc))
                // Fixed offsets never produce ambiguous local times.
                .unwrap_or_else(|| Utc.from_utc_datetime(&ndt)),
        }
    }
}

/// Outcome of a freshness check. `age_hours` is absent when no capture
/// timestamp was available.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FreshnessCheck {
    pub age_hours: Option<f64>,
    pub is_fresh: bool,
}

/// Compare the capture timestamp against `now` and the allowed window.
///
/// An age exactly equal to the window is still fresh. A missing timestamp
/// is decided by `policy`: strict fails closed, lenient accepts with an
/// unknown age (the caller is expected to log the bypass).
pub fn check(
    captured_at: Option<CaptureTimestamp>,
    now: DateTime<Utc>,
    naive_offset: FixedOffset,
    max_age_hours: f64,
    policy: CaptureTimePolicy,
) -> FreshnessCheck {
    let Some(capture) = captured_at else {
        return FreshnessCheck {
            age_hours: None,
            is_fresh: policy == CaptureTimePolicy::Lenient,
        };
    };

    let resolved = capture.resolve(naive_offset);
    let age_hours = now.signed_duration_since(resolved).num_milliseconds() as f64 / 3_600_000.0;

    FreshnessCheck {
        age_hours: Some(age_hours),
        is_fresh: age_hours <= max_age_hours,
    }
}
