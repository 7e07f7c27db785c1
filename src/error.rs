//! Error types shared by every analysis step.
//!
//! Structural problems abort the current operation and surface as a
//! [`MeaError`].  Unmapped channels are not errors: the mapper zero-fills
//! those rows and reports them through [`crate::mapping::MappingReport`].
use thiserror::Error;

/// Result type for analysis operations.
pub type Result<T> = std::result::Result<T, MeaError>;

/// Errors raised by the analysis pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeaError {
    /// A numeric parameter is outside its valid range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Kernel or window name not supported by the requested operation.
    #[error("invalid kernel '{0}'")]
    InvalidKernel(String),

    /// A spike timestamp does not address a sample of the recording.
    #[error("spike timestamp {timestamp} on channel {channel} is outside [0, {n_samples})")]
    IndexOutOfRange {
        channel: usize,
        timestamp: usize,
        n_samples: usize,
    },

    /// An array argument violates its channel/sample-count contract.
    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    Shape {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Two raw rows resolve to the same canonical electrode.
    #[error("raw rows {first_raw} and {second_raw} both map to canonical index {index}")]
    DuplicateCanonicalIndex {
        index: usize,
        first_raw: usize,
        second_raw: usize,
    },

    /// Malformed mapping or node table.
    #[error("configuration error: {0}")]
    Config(String),
}

impl MeaError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        MeaError::InvalidParameter { name, reason: reason.into() }
    }

    pub(crate) fn shape(what: &'static str, expected: usize, actual: usize) -> Self {
        MeaError::Shape { what, expected, actual }
    }
}

impl From<serde_json::Error> for MeaError {
    fn from(e: serde_json::Error) -> Self {
        MeaError::Config(e.to_string())
    }
}

/// Reject non-finite or non-positive sampling rates.
pub(crate) fn check_sampling_rate(sampling_rate: f64) -> Result<()> {
    if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
        return Err(MeaError::invalid(
            "sampling_rate",
            format!("must be a positive finite number, got {sampling_rate}"),
        ));
    }
    Ok(())
}

/// Reject non-finite or non-positive durations in seconds.
pub(crate) fn check_seconds(name: &'static str, seconds: f64) -> Result<()> {
    if !(seconds.is_finite() && seconds > 0.0) {
        return Err(MeaError::invalid(
            name,
            format!("must be a positive duration in seconds, got {seconds}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let e = MeaError::IndexOutOfRange { channel: 3, timestamp: 900, n_samples: 600 };
        let msg = e.to_string();
        assert!(msg.contains("900") && msg.contains("channel 3") && msg.contains("600"));
    }

    #[test]
    fn sampling_rate_must_be_positive() {
        assert!(check_sampling_rate(30_000.0).is_ok());
        assert!(check_sampling_rate(0.0).is_err());
        assert!(check_sampling_rate(-1.0).is_err());
        assert!(check_sampling_rate(f64::NAN).is_err());
    }
}
