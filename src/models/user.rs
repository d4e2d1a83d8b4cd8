use chrono::NaiveDateTime;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
  pub id: i32,
  pub username: String,
  pub email: String,
  #[serde(skip_serializing)]
  pub password: String,
  pub is_staff: bool,
  pub created_at: NaiveDateTime,
  pub updated_at: NaiveDateTime,
}
