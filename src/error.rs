use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Everything that can go wrong while hashing, encoding or tuning.
///
/// A failed password verification is not an error: `verify_password` and
/// `phc::verify` report mismatches through their `bool` result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A parameter is outside the bounds accepted by RFC 9106 (or this
    /// implementation's practical caps). Names the offending field.
    #[error("invalid {field}: {reason}")]
    InvalidParameter {
        field: &'static str,
        reason: &'static str,
    },

    /// A PHC string did not match the strict
    /// `$argon2<variant>$v=..$m=..,t=..,p=..$salt$hash` grammar.
    #[error("malformed PHC string: {0}")]
    InvalidPhcFormat(&'static str),

    /// A PHC string named an `argon2*` variant this crate does not implement.
    #[error("unsupported Argon2 variant `{0}`")]
    UnsupportedVariant(String),

    /// A PHC string carried a `v=` value other than 16 or 19.
    #[error("unsupported Argon2 version {0}")]
    UnsupportedVersion(u32),

    /// A cancellation token was observed at a slice boundary. The memory
    /// matrix has been zeroized; no partial output is produced.
    #[error("hashing was cancelled")]
    Cancelled,

    /// The memory matrix could not be allocated.
    #[error("failed to allocate the memory matrix")]
    OutOfMemory,
}
