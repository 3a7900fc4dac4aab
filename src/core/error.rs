//! Error taxonomy for console operations.
//!
//! Every failure is local to one statement, variable or command. Errors are
//! logged through the console's [`LogSink`](super::LogSink) at the point they
//! occur, so callers are free to ignore the returned value.

/// Errors reported by registry, gate and dispatch operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsoleError {
    /// A variable or command with this name already exists. The first registration wins.
    #[error("'{0}' is already registered")]
    DuplicateRegistration(String),

    /// The name contains characters that are not allowed in console names.
    #[error("invalid console name '{0}'")]
    InvalidName(String),

    /// No variable with this name or handle exists.
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    /// The change gate or an external sink refused the mutation.
    #[error("change of '{name}' to '{value}' was rejected")]
    ProtectedMutationRejected {
        /// Variable name.
        name: String,
        /// Requested value text.
        value: String,
    },

    /// The statement head matched neither a command nor a variable.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// A variable group references a variable that is not registered.
    #[error("group '{group}' references missing variable '{member}'")]
    MissingGroupMember {
        /// Group variable name.
        group: String,
        /// Referenced member name.
        member: String,
    },

    /// A group member's live value differs from the snapshot.
    #[error("group '{group}' member '{member}' is '{actual}', expected '{expected}'")]
    GroupMemberMismatch {
        /// Group variable name.
        group: String,
        /// Member name.
        member: String,
        /// Snapshot text.
        expected: String,
        /// Live text.
        actual: String,
    },

    /// Template arguments did not line up with the placeholders.
    #[error("{reason} for: {command}")]
    MalformedSubstitution {
        /// Command name.
        command: String,
        /// Human readable cause.
        reason: &'static str,
    },
}
