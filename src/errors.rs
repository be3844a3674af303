use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::models::FinalStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Donation not found")]
    DonationNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Requester not found")]
    RequesterNotFound,

    #[error("Not authorized")]
    Forbidden,

    #[error("You cannot request your own donation")]
    OwnDonation,

    #[error("Already requested")]
    AlreadyRequested,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Access Denied. No Token Provided.")]
    MissingToken,

    #[error("Token expired. Please log in again.")]
    TokenExpired,

    #[error("Invalid token.")]
    InvalidToken,

    #[error("Donation is {0} and does not allow this operation")]
    InvalidState(FinalStatus),

    #[error("Donation was modified concurrently, please retry")]
    ConcurrentUpdate,

    #[error("{0}")]
    BadRequest(String),

    #[error("Failed to hash password")]
    Password,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error")]
    Internal,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DonationNotFound
            | AppError::UserNotFound
            | AppError::RequesterNotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden | AppError::OwnDonation => StatusCode::FORBIDDEN,
            AppError::AlreadyRequested
            | AppError::EmailTaken
            | AppError::InvalidState(_)
            | AppError::ConcurrentUpdate => StatusCode::CONFLICT,
            AppError::InvalidCredentials
            | AppError::MissingToken
            | AppError::TokenExpired
            | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Password | AppError::Database(_) | AppError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Persistence and other internal failures are logged with detail
        // but reported to the client as a generic failure.
        if self.status_code().is_server_error() {
            log::error!("Internal error: {}", self);
            return HttpResponse::InternalServerError().json(json!({ "message": "Server error" }));
        }
        HttpResponse::build(self.status_code()).json(json!({ "message": self.to_string() }))
    }
}
