use crate::llm::LlmError;

/// Why an extraction produced no usable details.
///
/// Callers treat every variant the same way: log it and fall back to
/// `TaskDetails::fallback`.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("completion service failed: {0}")]
    Service(#[from] LlmError),

    #[error("completion service returned no text")]
    EmptyResponse,

    #[error("malformed extraction response: {reason}")]
    MalformedResponse { reason: String },
}

impl ExtractError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }
}
