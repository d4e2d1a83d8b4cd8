use log::*;

use std::task::{Context, Poll};

use futures::future::{ok, err, Either, Ready};

use actix_web::{
  http::header::{
    HeaderMap, AUTHORIZATION
  },
  error::ErrorUnauthorized,
  Error, HttpMessage,
  HttpResponse, ResponseError,
  HttpRequest, FromRequest
};
use actix_web::dev::{
  Service, Transform,
  ServiceRequest, ServiceResponse,
  Payload,
};

use crate::error::Result;
use crate::auth::jwt::*;

const TOKEN_PREFIX: &str = "Token ";

fn invalid_token(reason: &str) -> crate::error::Error {
  crate::error::Error::Unauthorized(json!({
    "error": reason,
  }))
}

/// Decode the `Authorization: Token <jwt>` header, if there is one.
pub fn decode_jwt_claims(headers: &HeaderMap) -> Result<Option<AuthData>> {
  let header = match headers.get(AUTHORIZATION) {
    Some(header) => header,
    // No authorization provided.  Allow caller to decide if this is an error.
    None => return Ok(None),
  };
  let header = header.to_str().map_err(|_| invalid_token("Invalid authorization token"))?;
  let token = if header.starts_with(TOKEN_PREFIX) {
    &header[TOKEN_PREFIX.len()..]
  } else {
    return Err(invalid_token("Invalid authorization method"));
  };

  Ok(Some(token.decode_jwt()?))
}

impl FromRequest for AuthData {
  type Error = Error;
  type Future = Ready<Result<Self, Self::Error>>;
  type Config = ();

  fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
    match req.extensions().get::<AuthData>() {
      Some(auth) => ok(auth.clone()),
      None => err(ErrorUnauthorized("No authorization token")),
    }
  }
}

pub struct Auth {
  pub is_optional: bool,
}

impl Auth {
  pub fn required() -> Self {
    Self {
      is_optional: false,
    }
  }

  pub fn optional() -> Self {
    Self {
      is_optional: true,
    }
  }
}

impl<S, B> Transform<S> for Auth
where
  S: Service<Request = ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
  S::Future: 'static,
{
  type Request = ServiceRequest;
  type Response = ServiceResponse<B>;
  type Error = Error;
  type InitError = ();
  type Transform = AuthMiddleware<S>;
  type Future = Ready<Result<Self::Transform, Self::InitError>>;

  fn new_transform(&self, service: S) -> Self::Future {
    ok(AuthMiddleware {
      is_optional: self.is_optional,
      service
    })
  }
}

pub struct AuthMiddleware<S> {
  is_optional: bool,
  service: S,
}

impl<S, B> Service for AuthMiddleware<S>
where
  S: Service<Request = ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
  S::Future: 'static,
{
  type Request = ServiceRequest;
  type Response = ServiceResponse<B>;
  type Error = Error;
  type Future = Either<S::Future, Ready<Result<Self::Response, Self::Error>>>;

  fn poll_ready(&mut self, cx: &mut Context) -> Poll<Result<(), Self::Error>> {
    self.service.poll_ready(cx)
  }

  fn call(&mut self, req: ServiceRequest) -> Self::Future {
    let has_auth = match decode_jwt_claims(req.headers()) {
      Ok(Some(auth_data)) => {
        debug!("Has authorization token: user_id={}", auth_data.user_id);
        req.extensions_mut().insert(auth_data);
        true
      },
      Ok(None) => false,
      Err(e) => {
        debug!("Rejected JWT claims: {:?}", e);
        return Either::Right(ok(req.into_response(
          e.error_response().into_body()
        )));
      },
    };

    if has_auth || self.is_optional {
      Either::Left(self.service.call(req))
    } else {
      Either::Right(ok(req.into_response(
        HttpResponse::Unauthorized().json(json!({
          "error": "authorization required",
        }))
        .into_body()
      )))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use actix_web::http::header::HeaderValue;

  #[test]
  fn missing_header_is_not_an_error() {
    let headers = HeaderMap::new();
    assert!(decode_jwt_claims(&headers).unwrap().is_none());
  }

  #[test]
  fn wrong_scheme_is_rejected() {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
    assert!(matches!(
      decode_jwt_claims(&headers),
      Err(crate::error::Error::Unauthorized(_))
    ));
  }
}
