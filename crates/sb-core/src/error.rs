use std::io;

use thiserror::Error;

/// Recoverable failures reported at the registry/adapter boundary.
///
/// Outcomes the callers must treat as "absent" (unresolved symbols,
/// unrecognized registers, cleared weak references) are `Option`/null
/// returns on the respective operations, not variants here.
#[derive(Debug, Error)]
pub enum ScriptHostError {
    #[error("script resource not found: {path}")]
    ResourceNotFound {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("no installed engine accepted \"{path}\"")]
    NoEngineAccepted { path: String },
    #[error("{type_name} has no member \"{member}\"")]
    UnknownMember {
        type_name: &'static str,
        member: String,
    },
    #[error("member \"{member}\" of {type_name} is not callable")]
    NotCallable {
        type_name: &'static str,
        member: String,
    },
    #[error("{method} expects {expected} argument(s), got {got}")]
    BadArity {
        method: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{method} argument {index} expects {expected}, got {got}")]
    BadArgument {
        method: &'static str,
        index: usize,
        expected: &'static str,
        got: &'static str,
    },
    #[error("{method} invoked on a receiver that is not a {expected}")]
    BadReceiver {
        method: &'static str,
        expected: &'static str,
    },
}
