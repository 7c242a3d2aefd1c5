//! Error types for the SMTP server

use thiserror::Error;

use crate::smtp::address::AddressError;
use crate::smtp::response::{SmtpResponse, codes};

#[derive(Error, Debug)]
pub enum SmtpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unrecognized command")]
    Unrecognized,

    #[error("not implemented")]
    NotImplemented,

    #[error("bad command sequence")]
    BadSequence,

    #[error("Syntax: {0}")]
    Syntax(String),

    #[error("invalid domain")]
    InvalidDomain,

    #[error("{0}")]
    InvalidMailbox(#[from] AddressError),

    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
}

/// Failures reported by a delivery sink
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook answered with status {0}")]
    Status(u16),

    #[error("receiver is gone")]
    ChannelClosed,

    #[error("no sender specified")]
    MissingSender,

    #[error("no recipients specified")]
    NoRecipients,
}

/// Maps SMTP errors to appropriate reply codes
impl SmtpError {
    pub fn to_response_code(&self) -> u16 {
        match self {
            SmtpError::Io(_) => codes::SERVICE_UNAVAILABLE,
            SmtpError::Unrecognized => codes::UNRECOGNIZED,
            SmtpError::NotImplemented => codes::NOT_IMPLEMENTED,
            SmtpError::BadSequence => codes::BAD_SEQUENCE,
            SmtpError::Syntax(_) => codes::SYNTAX_ERROR,
            SmtpError::InvalidDomain => codes::SYNTAX_ERROR,
            SmtpError::InvalidMailbox(_) => codes::INVALID_MAILBOX,
            SmtpError::Delivery(_) => codes::SYNTAX_ERROR,
        }
    }

    pub fn to_response_message(&self) -> String {
        match self {
            SmtpError::Io(_) => "Service not available".to_string(),
            other => other.to_string(),
        }
    }

    pub fn to_response(&self) -> SmtpResponse {
        SmtpResponse::new(self.to_response_code(), self.to_response_message())
    }
}
