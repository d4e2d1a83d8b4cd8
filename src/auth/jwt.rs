use serde::{Deserialize, Serialize};

use chrono::{Duration, Utc};

use jsonwebtoken::{
  encode, Header, EncodingKey,
  decode, DecodingKey,
  Validation
};

use crate::error::*;
use crate::models::User;

const TOKEN_LIFETIME_DAYS: i64 = 21;

#[derive(Debug, Default, Clone)]
pub struct AuthData {
  pub user_id: i32,
  pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
  pub id: i32,
  pub exp: i64,
}

pub trait GenerateJwt {
  fn generate_jwt(&self) -> Result<String>;
}

pub trait DecodeJwt {
  fn decode_jwt(&self) -> Result<AuthData>;
}

impl GenerateJwt for User {
  fn generate_jwt(&self) -> Result<String> {
    let claims = Claims{
      id: self.id,
      exp: (Utc::now() + Duration::days(TOKEN_LIFETIME_DAYS)).timestamp(),
    };

    let secret = get_secret()?;
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))?;

    Ok(token)
  }
}

impl DecodeJwt for str {
  fn decode_jwt(&self) -> Result<AuthData> {
    let secret = get_secret()?;
    let secret_key = DecodingKey::from_secret(secret.as_ref());
    let token = decode::<Claims>(self, &secret_key, &Validation::default())?;
    Ok(AuthData{
      user_id: token.claims.id,
      token: self.to_string(),
    })
  }
}

fn get_secret() -> Result<String> {
  dotenv::var("JWT_SECRET").map_err(|_| {
    Error::Other(anyhow::anyhow!("Missing JWT_SECRET environment variable."))
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn user() -> User {
    let now = Utc::now().naive_utc();
    User {
      id: 17,
      username: "editor".to_string(),
      email: "editor@example.com".to_string(),
      password: String::new(),
      is_staff: true,
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn token_round_trip_keeps_user_id() {
    std::env::set_var("JWT_SECRET", "test-secret");

    let token = user().generate_jwt().unwrap();
    let auth = token.as_str().decode_jwt().unwrap();
    assert_eq!(auth.user_id, 17);
    assert_eq!(auth.token, token);
  }

  #[test]
  fn garbage_token_is_rejected() {
    std::env::set_var("JWT_SECRET", "test-secret");
    assert!("not.a.token".decode_jwt().is_err());
  }
}
