use ipp::model::StatusCode;
use thiserror::Error;

/// The one error type that crosses an operation handler boundary. Every
/// failure that should be visible to the IPP client as a status code and a
/// status message goes through here; anything else (spool I/O, config
/// parsing) is wrapped into `ServerErrorInternalError` at the same boundary.
#[derive(Error, Debug, Clone)]
#[error("{code} {msg}")]
pub struct IppError {
    pub code: StatusCode,
    pub msg: String,
}

impl IppError {
    pub fn new(code: StatusCode, msg: impl Into<String>) -> IppError {
        IppError {
            code,
            msg: msg.into(),
        }
    }

    pub fn operation_not_supported() -> IppError {
        IppError::new(
            StatusCode::ServerErrorOperationNotSupported,
            StatusCode::ServerErrorOperationNotSupported.to_string(),
        )
    }

    pub fn bad_request(msg: impl Into<String>) -> IppError {
        IppError::new(StatusCode::ClientErrorBadRequest, msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> IppError {
        IppError::new(StatusCode::ClientErrorNotFound, msg.into())
    }

    pub fn not_possible(msg: impl Into<String>) -> IppError {
        IppError::new(StatusCode::ClientErrorNotPossible, msg.into())
    }

    pub fn attributes_or_values(msg: impl Into<String>) -> IppError {
        IppError::new(StatusCode::ClientErrorAttributesOrValuesNotSupported, msg.into())
    }

    pub fn busy(msg: impl Into<String>) -> IppError {
        IppError::new(StatusCode::ServerErrorBusy, msg.into())
    }

    pub fn not_accepting_jobs() -> IppError {
        IppError::new(
            StatusCode::ClientErrorNotAcceptingJobs,
            "printer is not accepting jobs",
        )
    }

    pub fn not_authorized() -> IppError {
        IppError::new(StatusCode::ClientErrorNotAuthorized, "not authorized")
    }

    pub fn internal(msg: impl Into<String>) -> IppError {
        IppError::new(StatusCode::ServerErrorInternalError, msg.into())
    }

    pub fn version_not_supported() -> IppError {
        IppError::new(
            StatusCode::ServerErrorVersionNotSupported,
            StatusCode::ServerErrorVersionNotSupported.to_string(),
        )
    }
}

impl From<std::io::Error> for IppError {
    fn from(e: std::io::Error) -> IppError {
        IppError::internal(e.to_string())
    }
}
