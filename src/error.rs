use thiserror::Error;

#[derive(Debug, Error)]
pub enum DrillError {
    /// Empty or non-numeric answer. Nothing was mutated.
    #[error("Invalid answer '{input}': expected a whole number")]
    InvalidAnswer { input: String },
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Audio(#[from] AudioError),
}

/// Failures reported by an audio backend or timer host.
///
/// These are always recoverable: callers log and carry on without sound.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AudioError {
    #[error("Audio output unavailable: {0}")]
    Unavailable(String),
    #[error("Audio blocked by platform policy: {0}")]
    Blocked(String),
    #[error("Failed to schedule audio: {0}")]
    Schedule(String),
    #[error("Timer error: {0}")]
    Timer(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_error_converts() {
        let err: DrillError = AudioError::Blocked("autoplay".into()).into();
        assert_eq!(err.to_string(), "Audio blocked by platform policy: autoplay");
    }

    #[test]
    fn invalid_answer_message() {
        let err = DrillError::InvalidAnswer { input: "abc".into() };
        assert_eq!(err.to_string(), "Invalid answer 'abc': expected a whole number");
    }
}
