use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use canopy_api_types::ErrorResponse;

/// Diagnostic attached to error responses for the logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// JSON failure response in the `{success: false, error, details}` shape.
#[derive(Debug)]
pub struct ApiError {
    source: &'static str,
    status: StatusCode,
    error: &'static str,
    details: String,
}

impl ApiError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        error: &'static str,
        details: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            error,
            details: details.into(),
        }
    }

    pub fn internal(source: &'static str, error: &'static str, details: impl Into<String>) -> Self {
        Self::new(source, StatusCode::INTERNAL_SERVER_ERROR, error, details)
    }

    pub fn not_found(source: &'static str, error: &'static str, details: impl Into<String>) -> Self {
        Self::new(source, StatusCode::NOT_FOUND, error, details)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = ErrorReport::from_message(self.source, self.status, self.details.clone());
        let body = ErrorResponse::new(self.error, self.details);
        let mut response = (self.status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}
