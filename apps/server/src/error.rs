use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use padeltime_availability::AvailabilityError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Availability(#[from] AvailabilityError),
    #[error("{error}")]
    RateLimited {
        error: AvailabilityError,
        retry_after: Option<Duration>,
    },
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

impl ApiError {
    pub fn rate_limited(client: &str, retry_after: Option<Duration>) -> Self {
        ApiError::RateLimited {
            error: AvailabilityError::RateLimited {
                client: client.to_string(),
            },
            retry_after,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

/// Whole seconds, rounded up so clients never retry early.
fn retry_after_header(retry_after: Duration) -> HeaderValue {
    let mut secs = retry_after.as_secs();
    if retry_after.subsec_nanos() > 0 || secs == 0 {
        secs += 1;
    }
    HeaderValue::from(secs)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Availability(e) => match e {
                e if e.is_validation() => StatusCode::BAD_REQUEST,
                AvailabilityError::UnknownProvider(_) => StatusCode::NOT_FOUND,
                AvailabilityError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
        });

        let mut response = (status, body).into_response();
        if let ApiError::RateLimited {
            retry_after: Some(retry_after),
            ..
        } = self
        {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, retry_after_header(retry_after));
        }
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
