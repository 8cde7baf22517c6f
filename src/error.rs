//! Error taxonomy for levels and the orchestrator

use thiserror::Error;

use crate::platform::SensorKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// User refused access to a sensor. Fatal to the level that needed it.
    #[error("{0} access was denied")]
    PermissionDenied(SensorKind),
    /// The sensor API does not exist on this device
    #[error("{0} is not available on this device")]
    DeviceUnavailable(SensorKind),
    /// Bounded wait expired (geolocation only, recoverable)
    #[error("{0} timed out")]
    Timeout(SensorKind),
    /// Entry could not be understood; the caller re-prompts
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no level {0} in the level table")]
    UnknownLevel(u32),
    /// Advancing is only allowed once the current level is solved
    #[error("level {0} is not complete")]
    LevelNotComplete(u32),
    #[error("the unlocked digits overflow the final code")]
    DigitOverflow,
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Recoverable errors leave the level active
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Timeout(_) | Error::InvalidInput(_))
    }
}
