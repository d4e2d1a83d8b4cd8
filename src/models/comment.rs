use chrono::NaiveDateTime;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
  pub id: i32,
  pub post_id: i32,
  pub author_id: i32,
  pub text: String,
  pub published_at: NaiveDateTime,
}

/// Comment joined with the names it is displayed by.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentDetails {
  #[serde(flatten)]
  pub comment: Comment,
  pub author_username: String,
  pub post_title: String,
}

impl std::fmt::Display for CommentDetails {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} under {}", self.author_username, self.post_title)
  }
}
