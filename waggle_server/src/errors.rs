use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use thiserror::Error;
use waggle_engine::EngagementFlowError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("{0}")]
    ConflictError(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Settlement failed. {0}")]
    SettlementError(String),
    #[error("A dependency of the server failed. {0}")]
    DependencyError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::ConflictError(_) => StatusCode::CONFLICT,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::SettlementError(_) => StatusCode::BAD_GATEWAY,
            Self::DependencyError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

/// Maps the engine's error taxonomy onto stable HTTP classes. Participants see the engine's message; gateway and
/// store internals stay in the logs.
impl From<EngagementFlowError> for ServerError {
    fn from(e: EngagementFlowError) -> Self {
        use EngagementFlowError::*;
        match e {
            Validation(_) | Pricing(_) => Self::ValidationError(e.to_string()),
            WalkerUnavailable | OwnerBusy | QuoteAlreadyDispatched(_) | InvalidTransition { .. } | NotSettled(_) => {
                Self::ConflictError(e.to_string())
            },
            QuoteNotFound(_) | EngagementNotFound(_) | ParticipantNotFound(_) => Self::NoRecordFound(e.to_string()),
            PaymentDeclined(_) | Settlement(_) => {
                error!("💻️ Settlement failure: {e}");
                Self::SettlementError(e.to_string())
            },
            NotificationFailed(_) | Dependency(_) | Reconcile { .. } => {
                error!("💻️ Dependency failure: {e}");
                Self::DependencyError(e.to_string())
            },
        }
    }
}
