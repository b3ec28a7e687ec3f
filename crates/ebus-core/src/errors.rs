//! Core error types.

use thiserror::Error;

/// Errors decoding a wire frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The frame has no separator, so there is no topic field.
    #[error("frame has no topic field")]
    MissingTopic,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_topic_display() {
        assert_eq!(CodecError::MissingTopic.to_string(), "frame has no topic field");
    }
}
