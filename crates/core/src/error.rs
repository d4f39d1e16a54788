use crate::types::UserId;

/// Every failure the option framework, the assembler and the track builder
/// can report.
///
/// The first seven variants are the validation taxonomy. [`CoreError::InvalidOption`]
/// wraps one of them with the human label of the option that produced it, which
/// is what gets shown to the submitter.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("value was not submitted")]
    MissingInput,

    #[error("cannot parse {value:?}: {reason}")]
    Parse { value: String, reason: String },

    #[error("value {value} is out of range: {reason}")]
    Range { value: String, reason: String },

    #[error("invalid format: {0}")]
    Format(String),

    #[error("{0}")]
    Constraint(String),

    #[error("activity data is malformed: {0}")]
    DataShape(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{label}: {source}")]
    InvalidOption {
        label: String,
        #[source]
        source: Box<CoreError>,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Activity {activity_id} not found for user {user_id}")]
    NotFound { user_id: UserId, activity_id: i64 },

    #[error("Activity source error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Attach an option's human label to this error.
    pub fn for_option(self, label: &str) -> Self {
        CoreError::InvalidOption {
            label: label.to_string(),
            source: Box::new(self),
        }
    }

    /// True for errors caused by what the user submitted rather than by the
    /// server or its collaborators.
    pub fn is_validation(&self) -> bool {
        match self {
            CoreError::MissingInput
            | CoreError::Parse { .. }
            | CoreError::Range { .. }
            | CoreError::Format(_)
            | CoreError::Constraint(_) => true,
            CoreError::InvalidOption { source, .. } => source.is_validation(),
            _ => false,
        }
    }

    /// Strip any [`CoreError::InvalidOption`] wrapping.
    pub fn root(&self) -> &CoreError {
        match self {
            CoreError::InvalidOption { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn labelled_error_prefixes_label() {
        let err = CoreError::Format("only whole or half hours".into()).for_option("Photo timezone");
        assert_eq!(
            err.to_string(),
            "Photo timezone: invalid format: only whole or half hours"
        );
        assert_matches!(err.root(), CoreError::Format(_));
    }

    #[test]
    fn io_is_not_validation() {
        let err = CoreError::from(std::io::Error::other("disk full")).for_option("Photos");
        assert!(!err.is_validation());
        assert!(CoreError::MissingInput.for_option("Width").is_validation());
    }
}
