//! Unified annex error model and HTTP mapping helpers.
//! This module provides a common error enum used across the account
//! administration, self-service and lookup endpoints, along with the wire
//! envelope those endpoints answer errors with.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::{Display, Formatter};

/// Machine-readable error kind carried in the wire envelope's `code` field.
/// The variant names serialize verbatim; clients match on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidFormat,
    Invalid,
    Unauthorized,
    Forbidden,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidFormat => "InvalidFormat",
            ErrorKind::Invalid => "Invalid",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnexError {
    /// Deliberately empty-bodied: also used to disguise unauthorized access
    /// to administrative routes as a missing resource.
    NotFound,
    BadRequest { kind: ErrorKind, message: String },
    Unprocessable { kind: ErrorKind, message: String },
    Unauthorized { message: String },
    Forbidden { message: String },
    Internal { message: String },
}

impl AnnexError {
    pub fn bad_request<S: Into<String>>(kind: ErrorKind, msg: S) -> Self {
        AnnexError::BadRequest { kind, message: msg.into() }
    }
    pub fn unprocessable<S: Into<String>>(kind: ErrorKind, msg: S) -> Self {
        AnnexError::Unprocessable { kind, message: msg.into() }
    }
    pub fn unauthorized<S: Into<String>>(msg: S) -> Self {
        AnnexError::Unauthorized { message: msg.into() }
    }
    pub fn forbidden<S: Into<String>>(msg: S) -> Self {
        AnnexError::Forbidden { message: msg.into() }
    }
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        AnnexError::Internal { message: msg.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AnnexError::NotFound => ErrorKind::Unknown,
            AnnexError::BadRequest { kind, .. } | AnnexError::Unprocessable { kind, .. } => *kind,
            AnnexError::Unauthorized { .. } => ErrorKind::Unauthorized,
            AnnexError::Forbidden { .. } => ErrorKind::Forbidden,
            AnnexError::Internal { .. } => ErrorKind::Unknown,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AnnexError::NotFound => "",
            AnnexError::BadRequest { message, .. }
            | AnnexError::Unprocessable { message, .. }
            | AnnexError::Unauthorized { message }
            | AnnexError::Forbidden { message }
            | AnnexError::Internal { message } => message.as_str(),
        }
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> StatusCode {
        match self {
            AnnexError::NotFound => StatusCode::NOT_FOUND,
            AnnexError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AnnexError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AnnexError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AnnexError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AnnexError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wire envelope: `{"errors":[{"code":..., "message":...}]}`.
    pub fn envelope(&self) -> Value {
        json!({ "errors": [{ "code": self.kind(), "message": self.message() }] })
    }
}

impl Display for AnnexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AnnexError::NotFound => write!(f, "not found"),
            other => write!(f, "{}: {}", other.kind().as_str(), other.message()),
        }
    }
}

impl std::error::Error for AnnexError {}

pub type AnnexResult<T> = Result<T, AnnexError>;

impl IntoResponse for AnnexError {
    fn into_response(self) -> Response {
        match self {
            // 404 carries no body at all, so a denied caller learns nothing.
            AnnexError::NotFound => StatusCode::NOT_FOUND.into_response(),
            other => (other.http_status(), Json(other.envelope())).into_response(),
        }
    }
}
