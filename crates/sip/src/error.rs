use formwork_core::{DependsError, TransformError};

/// Failures of a save-in-progress operation.
///
/// The first six variants are the API error taxonomy. `Superseded` marks a
/// response that arrived after a newer request and was not applied.
#[derive(Debug, thiserror::Error)]
pub enum SipError {
    #[error("not signed in")]
    Unauthenticated,
    #[error("access to the saved form is forbidden")]
    Forbidden,
    #[error("no saved form for '{form_id}'")]
    NotFound { form_id: String },
    #[error("saved form data is invalid: {0}")]
    InvalidData(String),
    #[error("request did not complete: {0}")]
    ClientFailure(String),
    #[error("server responded with status {status}")]
    ServerFailure { status: u16 },
    #[error("response superseded by a newer request")]
    Superseded,
    #[error("page routing failed: {0}")]
    Routing(#[from] DependsError),
    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl SipError {
    /// Taxonomy name, as used in CLI JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            SipError::Unauthenticated => "unauthenticated",
            SipError::Forbidden => "forbidden",
            SipError::NotFound { .. } => "notFound",
            SipError::InvalidData(_) => "invalidData",
            SipError::ClientFailure(_) => "clientFailure",
            SipError::ServerFailure { .. } => "serverFailure",
            SipError::Superseded => "superseded",
            SipError::Routing(_) => "routing",
            SipError::Transform(_) => "transform",
        }
    }
}
