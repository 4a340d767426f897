//! Engine error type.

use thiserror::Error;

use crate::rules::RuleId;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, WishError>;

/// Errors raised while building or running a draw pipeline.
///
/// Configuration errors abort construction of one pipeline. A missing peer
/// rule or an empty resolver bucket is never an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WishError {
    #[error("{rule}: missing parameter `{param}`")]
    MissingParameter { rule: RuleId, param: &'static str },

    #[error("{rule}: invalid parameter `{param}`: {reason}")]
    InvalidParameter {
        rule: RuleId,
        param: &'static str,
        reason: String,
    },

    #[error("unknown rule identifier `{0}`")]
    UnknownRule(String),

    #[error("rule {0} appears more than once in the pipeline")]
    DuplicateRule(RuleId),

    #[error("weights sum to zero")]
    ZeroTotalWeight,

    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid persisted state for {rule}: {reason}")]
    InvalidState { rule: String, reason: String },
}

impl WishError {
    /// Construction-time errors that make a pipeline unavailable.
    pub fn is_configuration(&self) -> bool {
        match self {
            WishError::MissingParameter { .. } => true,
            WishError::InvalidParameter { .. } => true,
            WishError::UnknownRule(_) => true,
            WishError::DuplicateRule(_) => true,
            WishError::ZeroTotalWeight => true,
            WishError::InvalidConfig(_) => true,
            WishError::InvalidState { .. } => false,
        }
    }

    pub(crate) fn invalid(rule: RuleId, param: &'static str, reason: impl Into<String>) -> Self {
        WishError::InvalidParameter {
            rule,
            param,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = WishError::MissingParameter {
            rule: RuleId::StarPity,
            param: "star_pity",
        };
        assert_eq!(err.to_string(), "StarPityRule: missing parameter `star_pity`");

        let err = WishError::invalid(RuleId::Up, "up_probability", "weight 12000 exceeds 10000");
        assert_eq!(
            err.to_string(),
            "UpRule: invalid parameter `up_probability`: weight 12000 exceeds 10000"
        );
    }

    #[test]
    fn test_classification() {
        assert!(WishError::ZeroTotalWeight.is_configuration());
        assert!(WishError::UnknownRule("Nope".into()).is_configuration());
        assert!(!WishError::InvalidState {
            rule: "UpRule".into(),
            reason: "bad".into()
        }
        .is_configuration());
    }
}
