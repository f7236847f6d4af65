//! Error types for command handling and fact application.

/// A command could not be applied.
#[derive(Debug, thiserror::Error)]
pub enum CommandError<R>
where
    R: std::error::Error + 'static,
{
    #[error("{machine} `{id}` already exists")]
    AlreadyExists { machine: &'static str, id: String },

    #[error("{machine} `{id}` is not known")]
    UnknownSubject { machine: &'static str, id: String },

    /// The command does not address this kind of machine.
    #[error("{machine} cannot handle {command}")]
    Unroutable {
        machine: &'static str,
        command: String,
    },

    #[error("{machine} `{id}` rejected the command: {source}")]
    Rejected {
        machine: &'static str,
        id: String,
        #[source]
        source: R,
    },
}

/// A fact could not be applied.
///
/// Reactions never reject a fact on its merits (duplicates and stale facts
/// are no-ops), so the only failure is addressing an entity that was never
/// created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReactError {
    #[error("{kind} references unknown {machine} `{id}`")]
    UnknownSubject {
        machine: &'static str,
        kind: &'static str,
        id: String,
    },
}
