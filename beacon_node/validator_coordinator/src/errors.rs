use crate::backend::{BackendError, StoreError};
use crate::duties::ShufflingError;
use crate::registry::RegistryError;
use safe_arith::ArithError;
use std::fmt;
use types::InvalidLength;

/// The category of an `Error`, numbered as the equivalent gRPC status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    InvalidArgument = 3,
    NotFound = 5,
    FailedPrecondition = 9,
    Internal = 13,
}

/// An error returned to a validator client.
///
/// Errors are never retried by this crate, retrying is left to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The request was malformed (e.g. a public key of the wrong length, an epoch too far in the
    /// future).
    InvalidArgument(String),
    /// A public key or validator index is absent from the registry.
    NotFound(String),
    /// The request requires a chain state which does not exist yet (e.g. before genesis).
    FailedPrecondition(String),
    /// The state store or another collaborator failed.
    Internal(String),
}

impl Error {
    pub fn code(&self) -> Code {
        match self {
            Error::InvalidArgument(_) => Code::InvalidArgument,
            Error::NotFound(_) => Code::NotFound,
            Error::FailedPrecondition(_) => Code::FailedPrecondition,
            Error::Internal(_) => Code::Internal,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::InvalidArgument(msg)
            | Error::NotFound(msg)
            | Error::FailedPrecondition(msg)
            | Error::Internal(msg) => msg,
        }
    }

    pub(crate) fn chain_not_started() -> Self {
        Error::FailedPrecondition("chain has not started".to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.code(), self.message())
    }
}

impl std::error::Error for Error {}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Error {
        Error::Internal(format!("State store error: {:?}", e))
    }
}

impl From<ArithError> for Error {
    fn from(e: ArithError) -> Error {
        Error::Internal(format!("Arithmetic error: {:?}", e))
    }
}

impl From<InvalidLength> for Error {
    fn from(e: InvalidLength) -> Error {
        Error::InvalidArgument(format!("Invalid length: {}", e))
    }
}

impl From<BackendError> for Error {
    fn from(e: BackendError) -> Error {
        match e {
            BackendError::Rejected(msg) => Error::InvalidArgument(msg),
            BackendError::Unavailable(msg) => Error::Internal(msg),
        }
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Error {
        match e {
            RegistryError::UnknownPubkey(pubkey) => {
                Error::NotFound(format!("Unknown validator public key {}", pubkey))
            }
            RegistryError::UnknownValidator(index) => {
                Error::NotFound(format!("Unknown validator index {}", index))
            }
            other => Error::Internal(format!("Registry error: {:?}", other)),
        }
    }
}

impl From<ShufflingError> for Error {
    fn from(e: ShufflingError) -> Error {
        match e {
            ShufflingError::Registry(e) => e.into(),
            other => Error::Internal(format!("Shuffling error: {:?}", other)),
        }
    }
}
