use std::fmt::Display;
use std::io;
use std::str;

use serde::{de, ser};

/// Errors produced while decoding, merging, converting or encoding.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The key is not a valid bracket chain, e.g. `a[[b]]` or `a[b]c]`.
    #[error("malformed key `{key}`: {reason}")]
    MalformedKey { key: String, reason: String },

    /// Two values for the same path have shapes that cannot be combined.
    #[error("cannot merge {incoming} into {existing} for key `{key}`")]
    MergeConflict {
        key: String,
        existing: &'static str,
        incoming: &'static str,
    },

    /// A raw value cannot satisfy the requested type.
    #[error("cannot convert {value} to {expected}")]
    IncompatibleType { value: String, expected: String },

    /// The requested type cannot be represented at all.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// Strict mode found keys that no field of the structure accepts.
    #[error("unmapped properties for `{structure}`: {}", .keys.join(", "))]
    UnmappedExtraProperties {
        structure: String,
        keys: Vec<String>,
    },

    /// The structure description cannot produce an instance.
    #[error("cannot instantiate `{0}`")]
    InstantiationFailure(String),

    /// The tree is nested deeper than the recursion limit.
    #[error("nesting exceeds the recursion limit of {0}")]
    RecursionLimit(usize),

    #[error("{0}")]
    Custom(String),

    #[error(transparent)]
    Utf8(#[from] str::Utf8Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The category of an [`Error`], stable across message changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedKey,
    MergeConflict,
    IncompatibleType,
    UnsupportedType,
    UnmappedExtraProperties,
    InstantiationFailure,
    RecursionLimit,
    Custom,
    Utf8,
    Io,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedKey { .. } => ErrorKind::MalformedKey,
            Error::MergeConflict { .. } => ErrorKind::MergeConflict,
            Error::IncompatibleType { .. } => ErrorKind::IncompatibleType,
            Error::UnsupportedType(_) => ErrorKind::UnsupportedType,
            Error::UnmappedExtraProperties { .. } => ErrorKind::UnmappedExtraProperties,
            Error::InstantiationFailure(_) => ErrorKind::InstantiationFailure,
            Error::RecursionLimit(_) => ErrorKind::RecursionLimit,
            Error::Custom(_) => ErrorKind::Custom,
            Error::Utf8(_) => ErrorKind::Utf8,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn malformed_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn incompatible(value: impl Display, expected: impl Display) -> Self {
        Error::IncompatibleType {
            value: value.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Generate error to show top-level type cannot be represented.
    pub(crate) fn top_level(object: &'static str) -> Self {
        Error::UnsupportedType(format!(
            "cannot represent {object} at the top level, only structures and maps"
        ))
    }
}

impl de::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: Display,
    {
        Error::Custom(msg.to_string())
    }
}

impl ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: Display,
    {
        Error::Custom(msg.to_string())
    }
}
