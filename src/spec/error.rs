use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpecParseError {
    #[error("specification is empty")]
    Empty,

    #[error("invalid package name in {0:?}")]
    InvalidName(String),

    #[error("invalid version constraint {0:?}")]
    InvalidVersion(String),

    #[error("invalid build constraint {0:?}")]
    InvalidBuild(String),

    #[error("unknown attribute key {0:?}")]
    UnknownAttribute(String),

    #[error("malformed attribute {0:?}, expected key=value")]
    InvalidAttribute(String),

    #[error("channel given twice: {0:?} and {1:?}")]
    ConflictingChannels(String, String),

    #[error("unbalanced brackets in {0:?}")]
    UnbalancedBrackets(String),
}
