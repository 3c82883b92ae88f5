use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiagramError>;

/// Everything that can go wrong while building or rendering a diagram.
#[derive(Debug, Error)]
pub enum DiagramError {
    /// Two connected nodes resolve to the same plot-space centre, so the
    /// direction between them is undefined.
    #[error("attempted to add edge between `{from}` and `{to}` but they share the same location")]
    SameLocation { from: String, to: String },

    #[error("unknown node `{0}`")]
    UnknownNode(String),

    #[error("node `{name}` cannot be more than one of `observed`, `fixed`, or `alternate`")]
    ConflictingNodeStyle { name: String },

    #[error("unrecognized {kind} node style: {value} (options are: shaded, inner, outer)")]
    UnknownDecorationStyle { kind: &'static str, value: String },

    #[error("unknown positioning string: {0}")]
    UnknownPosition(String),

    #[error("the arguments ({keys}) are equivalent, you can only provide one of them")]
    DuplicateAlias { keys: String },

    #[error("invalid value for `{key}`: {reason}")]
    InvalidParam { key: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("export failed: {0}")]
    Export(String),
}

impl DiagramError {
    pub(crate) fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParam {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
