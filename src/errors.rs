// Copyright 2025 Cowboy AI, LLC.

//! Error types for mixin composition and abstract contracts

use thiserror::Error;

/// Errors that can occur while composing units or constructing instances
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MixinError {
    /// A chain entry is neither a class-like unit nor a transformer
    #[error("Invalid mixin shape for {entry}: {reason}")]
    InvalidMixinShape {
        /// Identifier (or description) of the offending entry
        entry: String,
        /// Why the entry was rejected
        reason: String,
    },

    /// Direct instantiation of an abstract base was attempted
    #[error("{unit} is of abstract type and can't be instantiated")]
    AbstractInstantiationDenied {
        /// Name of the unit that was instantiated
        unit: String,
    },

    /// A concrete unit omits a method required by its abstract parent
    #[error("method {method} must be implemented by {unit}")]
    AbstractMethodMissing {
        /// Name of the missing method
        method: String,
        /// Name of the concrete unit that omitted it
        unit: String,
    },

    /// No member with the given name is reachable from an instance or unit
    #[error("Member not found: {member} on {unit}")]
    MemberNotFound {
        /// Unit searched
        unit: String,
        /// Member name
        member: String,
    },

    /// A data field was invoked as if it were a method
    #[error("Member {member} on {unit} is not callable")]
    NotCallable {
        /// Unit searched
        unit: String,
        /// Member name
        member: String,
    },

    /// A registry lookup named a unit or transformer that was never registered
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    /// A registry already holds a unit or transformer under this name
    #[error("Already registered: {0}")]
    AlreadyRegistered(String),

    /// A method received arguments it cannot work with
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A bound receiver's lock was poisoned by a panicking method
    #[error("Receiver poisoned: {0}")]
    ReceiverPoisoned(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for mixin operations
pub type MixinResult<T> = Result<T, MixinError>;

impl From<serde_json::Error> for MixinError {
    fn from(err: serde_json::Error) -> Self {
        MixinError::Serialization(err.to_string())
    }
}

impl MixinError {
    /// Create a shape error for the given entry
    pub fn invalid_shape(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        MixinError::InvalidMixinShape {
            entry: entry.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error was raised by an abstract contract guard
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            MixinError::AbstractInstantiationDenied { .. } | MixinError::AbstractMethodMissing { .. }
        )
    }

    /// Check if this error was raised while validating a composition chain
    pub fn is_shape_error(&self) -> bool {
        matches!(self, MixinError::InvalidMixinShape { .. })
    }
}
