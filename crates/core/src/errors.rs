//! Core error types for the budget resource handler.
//!
//! The variants follow the stages of a resource operation: validation and
//! expansion run locally before any network call, client and not-found errors
//! come back from the billing API collaborator.

use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for budget resource operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Failed to expand configuration: {0}")]
    Expansion(#[from] ExpansionError),

    #[error("{0}")]
    Client(#[from] ClientError),

    #[error("Budget not found: {0}")]
    NotFound(String),

    #[error("Operation '{0}' was cancelled")]
    Cancelled(String),

    #[error("Invalid resource ID: {0}")]
    InvalidResourceId(#[from] ResourceIdError),

    #[error("Invalid configuration value: {0}")]
    InvalidConfigValue(String),

    #[error("Missing configuration key: {0}")]
    MissingConfigKey(String),

    #[error("Unexpected API response: {0}")]
    UnexpectedResponse(String),
}

impl Error {
    /// Returns `true` when the remote budget does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Returns `true` when the operation was aborted through its cancellation token.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled(_))
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::Validation(ValidationErrors::from(vec![err]))
    }
}

/// A single schema violation, always naming the offending field path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field '{field}' is missing")]
    MissingField { field: String },

    #[error("Expected '{field}' to be one of [{}], got '{value}'", allowed.join(", "))]
    NotInSet {
        field: String,
        value: String,
        allowed: Vec<&'static str>,
    },

    #[error("Expected '{field}' to be in the range ({min} - {max}), got {value}")]
    OutOfRange {
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Expected '{field}' to be an integer, got {value}")]
    NotAnInteger { field: String, value: String },

    #[error("Field '{field}' allows at most {max} entries, got {actual}")]
    TooManyItems {
        field: String,
        max: usize,
        actual: usize,
    },

    #[error("Field '{field}' must not be negative, got {value}")]
    Negative { field: String, value: String },

    #[error("Field '{field}' is not a valid resource ID ('{value}'): {reason}")]
    InvalidResourceId {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Field '{field}' is not a valid resource group name ('{value}'): {reason}")]
    InvalidResourceGroupName {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Field '{field}' repeats the notification for operator {operator} at threshold {threshold}")]
    DuplicateNotification {
        field: String,
        operator: String,
        threshold: i64,
    },

    #[error("Configuration document is malformed: {0}")]
    MalformedDocument(String),
}

impl ValidationError {
    /// The field path this violation refers to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::MissingField { field }
            | ValidationError::NotInSet { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::NotAnInteger { field, .. }
            | ValidationError::TooManyItems { field, .. }
            | ValidationError::Negative { field, .. }
            | ValidationError::InvalidResourceId { field, .. }
            | ValidationError::InvalidResourceGroupName { field, .. }
            | ValidationError::DuplicateNotification { field, .. } => Some(field),
            ValidationError::MalformedDocument(_) => None,
        }
    }
}

/// Every violation found in one configuration document.
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
#[error("{}", join_errors(.0))]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    /// Returns `true` if any violation names exactly this field path.
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field() == Some(field))
    }

    pub fn into_result(self) -> std::result::Result<(), ValidationErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A nested configuration block that cannot be turned into its wire shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpansionError {
    #[error("Block '{block}' is malformed: {message}")]
    MalformedBlock { block: String, message: String },

    #[error("Element {index} of '{field}' is malformed: {message}")]
    InvalidElement {
        field: String,
        index: usize,
        message: String,
    },
}

/// A failure reported by the billing API client, passed through untouched.
///
/// `message` carries the API's own error text; `status` and `code` are filled
/// in when the transport knows them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ClientError {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
}

impl ClientError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Errors raised while parsing a cloud resource identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceIdError {
    #[error("resource ID must not be empty")]
    Empty,

    #[error("the number of path segments is not divisible by 2 in '{0}'")]
    OddSegments(String),

    #[error("key/value segments cannot be empty strings in '{0}'")]
    EmptySegment(String),

    #[error("no subscription ID found in '{0}'")]
    MissingSubscription(String),

    #[error("no resource group name found in '{0}'")]
    MissingResourceGroup(String),

    #[error("'{id}' does not address a {expected} resource")]
    UnexpectedType { id: String, expected: String },
}
