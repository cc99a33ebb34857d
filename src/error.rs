//! Error types for study-hall.

use std::fmt;

use thiserror::Error;

use crate::chat::ChatError;
use crate::config::ConfigError;
use crate::model::ChannelId;
use crate::store::StoreError;

/// Identifies which provisioner call failed inside a [`Error::Provisioning`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    /// Creating the course role.
    CreateRole,
    /// Deleting the course role.
    DeleteRole,
    /// Creating the course channel.
    CreateChannel,
    /// Deleting the course channel.
    DeleteChannel,
    /// Granting a user the course role.
    GrantRole,
    /// Revoking a user's course role.
    RevokeRole,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProvisionStep::CreateRole => "role creation",
            ProvisionStep::DeleteRole => "role deletion",
            ProvisionStep::CreateChannel => "channel creation",
            ProvisionStep::DeleteChannel => "channel deletion",
            ProvisionStep::GrantRole => "access grant",
            ProvisionStep::RevokeRole => "access revocation",
        };
        f.write_str(name)
    }
}

/// Main error type for study-hall operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A session is already running on the target channel.
    #[error("a session is already active on channel {0}")]
    SessionAlreadyActive(ChannelId),

    /// No session exists on the target channel.
    #[error("no session on channel {0}")]
    NoSuchSession(ChannelId),

    /// The user is already enrolled in the course.
    #[error("already enrolled in this course")]
    AlreadyJoined,

    /// The user is not enrolled in the course.
    #[error("not enrolled in this course")]
    NotJoined,

    /// A platform create/delete/grant call failed.
    #[error("provisioning failed during {step}: {source}")]
    Provisioning {
        /// The provisioner call that failed.
        step: ProvisionStep,
        /// The underlying platform error.
        source: ChatError,
    },

    /// A store read or write failed.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// A compensation step failed while undoing a partially applied
    /// operation. External and local state may be inconsistent.
    #[error("compensation failed (original error: {original}): {compensation}")]
    Compensation {
        /// The error that triggered the compensation.
        original: Box<Error>,
        /// The error raised by the failed compensation step.
        compensation: Box<Error>,
    },

    /// Command text did not match any registered command.
    #[error("unknown command")]
    UnknownCommand,

    /// Command arguments were missing or malformed.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Unclassified failure while executing a command.
    #[error("command execution failed: {0}")]
    Execution(String),

    /// Message transport error outside of provisioning.
    #[error("chat transport error: {0}")]
    Chat(#[from] ChatError),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Wrap a platform error with the provisioner step it failed in.
    pub fn provisioning(step: ProvisionStep, source: ChatError) -> Self {
        Error::Provisioning { step, source }
    }

    /// Wrap an original error and a compensation failure together.
    pub fn compensation(original: Error, compensation: Error) -> Self {
        Error::Compensation {
            original: Box::new(original),
            compensation: Box::new(compensation),
        }
    }
}

/// Convenience Result type for study-hall operations.
pub type Result<T> = std::result::Result<T, Error>;
