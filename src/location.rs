//! Cancellable device-location acquisition. Position providers (GPS chips,
//! platform geolocation services) surface as futures; this module bounds
//! them with a timeout and a caller-held cancel handle.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;

use crate::verify::geofence::Coordinates;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    /// The provider did not produce a fix within the allowed time.
    Timeout,
    /// The caller cancelled the acquisition.
    Cancelled,
    /// The provider failed outright (permission denied, no hardware).
    Unavailable(String),
}

impl std::fmt::Display for LocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocationError::Timeout => write!(f, "Location acquisition timed out"),
            LocationError::Cancelled => write!(f, "Location acquisition cancelled"),
            LocationError::Unavailable(reason) => write!(f, "Location unavailable: {reason}"),
        }
    }
}

impl std::error::Error for LocationError {}

/// Cancels the acquisition it was created for. Dropping the handle also
/// cancels, so keep it alive for as long as the result is wanted.
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create a cancel handle and the receiver to pass to [`acquire`].
pub fn cancellation() -> (CancelHandle, watch::Receiver<bool>) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, rx)
}

/// Await a device fix from `provider`, bounded by `timeout` and `cancel`.
/// Cancellation wins over any in-flight provider work.
pub async fn acquire<F>(
    provider: F,
    timeout: Duration,
    mut cancel: watch::Receiver<bool>,
) -> Result<Coordinates, LocationError>
where
    F: Future<Output = Result<Coordinates, String>>,
{
    if *cancel.borrow() {
        return Err(LocationError::Cancelled);
    }

    tokio::select! {
        outcome = tokio::time::timeout(timeout, provider) => match outcome {
            Ok(Ok(coords)) => Ok(coords),
            Ok(Err(reason)) => Err(LocationError::Unavailable(reason)),
            Err(_) => Err(LocationError::Timeout),
        },
        // changed() also resolves when the handle is dropped.
        _ = cancel.changed() => Err(LocationError::Cancelled),
    }
}
