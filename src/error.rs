use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;

use crate::{config::ConfigError, idfm::error::IdfmError};

/// The only error message clients ever see
pub const GENERIC_ERROR: &str = "Failed to fetch next trains";

#[derive(thiserror::Error, Debug)]
pub enum NextTrainsError {
    #[error("IDFM error: {0}")]
    Idfm(#[from] IdfmError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResponseError for NextTrainsError {
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        log::error!("{}", self);
        HttpResponse::build(self.status_code()).json(json!({ "error": GENERIC_ERROR }))
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl From<NextTrainsError> for std::io::Error {
    fn from(e: NextTrainsError) -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::Other, e)
    }
}

pub type NextTrainsResult<T> = Result<T, NextTrainsError>;
