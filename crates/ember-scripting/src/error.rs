/// Errors from assembly loading and instance creation. Recoverable:
/// previously loaded assemblies stay valid after a failure.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("failed to load assembly '{0}': {1}")]
    LoadFailed(String, String),

    #[error("assembly source for '{0}' is unavailable: {1}")]
    SourceUnavailable(String, String),

    #[error("unknown script class '{0}'")]
    UnknownClass(String),

    #[error("failed to instantiate '{0}': {1}")]
    InstanceFailed(String, String),
}

/// A failed managed invocation. Caught at the native/managed boundary,
/// logged by the caller, and never propagated as a native panic; the frame
/// continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptFault {
    #[error("script method '{0}' not found")]
    MethodNotFound(String),

    #[error("script exception in '{0}': {1}")]
    Exception(String, String),
}
