use log::*;

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::Value as JsonValue;

use libreauth::pass;

use jsonwebtoken::errors::Error as JwtError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
  // 401
  #[error("unauthorized: {0}")]
  Unauthorized(JsonValue),

  // 403
  #[error("forbidden: {0}")]
  Forbidden(JsonValue),

  // 404
  #[error("not found: {0}")]
  NotFound(JsonValue),

  // 404, post vanished between materialization and aggregation.
  #[error("post {0} no longer exists")]
  MissingPost(i32),

  // 422
  #[error("unprocessable entity: {0}")]
  UnprocessableEntity(JsonValue),

  // 400
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("Json error: {source}")]
  JsonError {
    #[from]
    source: serde_json::Error,
  },

  #[error("Password error: {0}")]
  PasswordError(String),

  #[error("JWT error")]
  JwtError {
    #[from]
    source: JwtError,
  },

  #[error("disconnected: {0}")]
  DisconnectedError(String),

  #[error("postgres error")]
  PgError {
    #[from]
    source: tokio_postgres::error::Error,
  },

  #[error("crossbeam recv error")]
  RecvError {
    #[from]
    source: crossbeam_channel::RecvError,
  },

  #[error("std io error")]
  IOError {
    #[from]
    source: std::io::Error,
  },

  #[error("config error")]
  ConfigError {
    #[from]
    source: config::ConfigError,
  },

  #[error(transparent)]
  Other(#[from] anyhow::Error),
}

impl From<pass::ErrorCode> for Error {
  fn from(code: pass::ErrorCode) -> Self {
    Error::PasswordError(format!("code={:?}", code))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl ResponseError for Error {
  fn status_code(&self) -> StatusCode {
    match self {
      Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      Error::Forbidden(_) => StatusCode::FORBIDDEN,
      Error::NotFound(_) | Error::MissingPost(_) => StatusCode::NOT_FOUND,
      Error::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
      Error::BadRequest(_) => StatusCode::BAD_REQUEST,
      Error::DisconnectedError(_) => StatusCode::BAD_GATEWAY,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    match self {
      Error::Unauthorized(ref message)
      | Error::Forbidden(ref message)
      | Error::NotFound(ref message)
      | Error::UnprocessableEntity(ref message) => {
        HttpResponse::build(status).json(message)
      },
      Error::MissingPost(id) => {
        HttpResponse::build(status).json(json!({ "error": format!("post {} no longer exists", id) }))
      },
      Error::BadRequest(ref message) | Error::DisconnectedError(ref message) => {
        HttpResponse::build(status).json(message)
      },
      ref err => {
        error!("InternalServerError: {:?}", err);
        HttpResponse::InternalServerError().json("Internal Server Error")
      },
    }
  }
}
