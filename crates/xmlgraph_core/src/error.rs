//! Error types for the persistence engine.

use thiserror::Error;

/// Result type for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Errors that can occur while saving or loading an object graph.
///
/// Errors propagate unchanged from the point of failure to the top-level
/// `save`/`load` call. Only [`PersistError::MissingPersistentValue`] is
/// ever swallowed, and only when the persister ignores missing values.
#[derive(Debug, Error)]
pub enum PersistError {
    /// A required argument was absent.
    #[error("null argument: {what} cannot be null")]
    NullArgument {
        /// Which argument was absent.
        what: &'static str,
    },

    /// An argument failed validation.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// The type is not persistable and has no adapter.
    #[error("{type_name} is not persistable and has no registered adapter")]
    NotPersistable {
        /// Name of the offending type.
        type_name: String,
    },

    /// A value could not be constructed.
    #[error("cannot construct {type_name}: {message}")]
    Construction {
        /// Name of the type being constructed.
        type_name: String,
        /// Description of the failure.
        message: String,
    },

    /// A value is neither adapter-covered, persistable nor string-instantiable,
    /// or its type cannot be named.
    #[error("unsupported type {type_name}: {message}")]
    UnsupportedType {
        /// Name of the offending type.
        type_name: String,
        /// Description of the problem.
        message: String,
    },

    /// A type name could not be resolved.
    #[error("could not determine type for name: {name}")]
    TypeResolution {
        /// The unresolved name.
        name: String,
    },

    /// A member is configured in a way the engine cannot honour.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        /// Description of the problem.
        message: String,
    },

    /// A member's element or attribute was absent while loading.
    #[error("missing persistent value: {name}")]
    MissingPersistentValue {
        /// Element/attribute name that was looked up.
        name: String,
    },

    /// A leaf string could not be converted to its typed value.
    #[error("cannot convert {value:?} to {type_name}: {message}")]
    Format {
        /// The string that failed to convert.
        value: String,
        /// Target type name.
        type_name: String,
        /// Parser message.
        message: String,
    },

    /// No setter matched a persistent accessor.
    #[error("cannot find matching setter {setter} in {type_name}")]
    SetterNotFound {
        /// The setter name that was searched for.
        setter: String,
        /// The type that was searched.
        type_name: String,
    },

    /// A value did not fit the slot it was destined for.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The type the slot expects.
        expected: String,
        /// What was supplied.
        found: String,
    },

    /// A structural problem in the XML that has no more specific category.
    #[error("persistence error: {message}")]
    Persistence {
        /// Description of the problem.
        message: String,
    },

    /// XML tree reader/writer error.
    #[error("tree error: {0}")]
    Tree(#[from] xmlgraph_tree::TreeError),
}

impl PersistError {
    /// Creates a null argument error.
    pub fn null_argument(what: &'static str) -> Self {
        Self::NullArgument { what }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a not persistable error.
    pub fn not_persistable(type_name: impl Into<String>) -> Self {
        Self::NotPersistable {
            type_name: type_name.into(),
        }
    }

    /// Creates a construction error.
    pub fn construction(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Construction {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Creates an unsupported type error.
    pub fn unsupported_type(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Creates a type resolution error.
    pub fn type_resolution(name: impl Into<String>) -> Self {
        Self::TypeResolution { name: name.into() }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Creates a missing persistent value error.
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingPersistentValue { name: name.into() }
    }

    /// Creates a format error.
    pub fn format(
        value: impl Into<String>,
        type_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Format {
            value: value.into(),
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Creates a setter not found error.
    pub fn setter_not_found(setter: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::SetterNotFound {
            setter: setter.into(),
            type_name: type_name.into(),
        }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Creates a generic persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Whether this is the recoverable missing-value error.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingPersistentValue { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_missing_is_missing() {
        assert!(PersistError::missing("radius").is_missing());
        assert!(!PersistError::type_resolution("radius").is_missing());
        assert!(!PersistError::persistence("radius").is_missing());
    }

    #[test]
    fn messages_name_the_subject() {
        let err = PersistError::setter_not_found("set_radius", "Circle");
        assert_eq!(
            err.to_string(),
            "cannot find matching setter set_radius in Circle"
        );

        let err = PersistError::type_resolution("widget");
        assert_eq!(err.to_string(), "could not determine type for name: widget");
    }

    #[test]
    fn tree_errors_convert() {
        let err: PersistError = xmlgraph_tree::TreeError::NoRootElement.into();
        assert!(matches!(err, PersistError::Tree(_)));
    }
}
