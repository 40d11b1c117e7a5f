use thiserror::Error;

/// Errors surfaced by the non-real-time parts of the engine.
///
/// The audio path itself never fails: indices are ignored when out of range
/// and parameter values are clamped.
#[derive(Debug, Error)]
pub enum ObstacleError {
    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f32),
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),
    #[error("saved state is too short ({len} bytes)")]
    StateTooShort { len: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ObstacleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        let e = ObstacleError::UnknownParameter("wobble".to_string());
        assert_eq!(format!("{e}"), "unknown parameter 'wobble'");

        let e = ObstacleError::StateTooShort { len: 2 };
        assert_eq!(format!("{e}"), "saved state is too short (2 bytes)");
    }
}
