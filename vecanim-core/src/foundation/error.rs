/// Convenience result type used across vecanim.
pub type VecanimResult<T> = Result<T, VecanimError>;

/// Top-level error taxonomy (spec §7). Each variant corresponds to one of
/// the five semantic kinds a [`crate::bitreader::ReaderFlags`] can be asked
/// to enforce; `Io` and `Other` are ambient boundary errors with no
/// forgiving-mode equivalent.
#[derive(thiserror::Error, Debug)]
pub enum VecanimError {
    /// Requested span exceeds the bounded view.
    #[error("out of bounds: {0}")]
    OutOfBounds(String),

    /// A value violates a format constraint.
    #[error("malformed data: {0}")]
    Malformed(String),

    /// Trailing bytes after the declared end of a tag or container.
    #[error("extra data: {0}")]
    ExtraData(String),

    /// Tag code not recognized by the dispatcher.
    #[error("unknown tag: {0}")]
    UnknownTag(String),

    /// Semantically valid but unsupported configuration.
    #[error("unprocessable data: {0}")]
    Unprocessable(String),

    /// Filesystem or other ambient IO failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VecanimError {
    /// Build a [`VecanimError::OutOfBounds`] value.
    pub fn out_of_bounds(msg: impl Into<String>) -> Self {
        Self::OutOfBounds(msg.into())
    }

    /// Build a [`VecanimError::Malformed`] value.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Build a [`VecanimError::ExtraData`] value.
    pub fn extra_data(msg: impl Into<String>) -> Self {
        Self::ExtraData(msg.into())
    }

    /// Build a [`VecanimError::UnknownTag`] value.
    pub fn unknown_tag(msg: impl Into<String>) -> Self {
        Self::UnknownTag(msg.into())
    }

    /// Build a [`VecanimError::Unprocessable`] value.
    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::Unprocessable(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
