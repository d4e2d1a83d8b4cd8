use serde::{Deserialize, Serialize};

use crate::models::Post;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
  pub id: i32,
  pub title: String,
  /// Number of posts carrying the tag, set by the popularity queries.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub posts_count: Option<i64>,
}

impl Tag {
  pub fn new(title: &str) -> Self {
    Self {
      id: 0,
      title: title.to_string(),
      posts_count: None,
    }
  }

  /// Normalize the title to lowercase.
  pub fn clean(&mut self) {
    self.title = self.title.to_lowercase();
  }

  pub fn absolute_url(&self) -> String {
    format!("/tags/{}/posts", self.title)
  }
}

impl std::fmt::Display for Tag {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.title)
  }
}

/// A tag with its posts pre-loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagWithPosts {
  #[serde(flatten)]
  pub tag: Tag,
  pub posts: Vec<Post>,
}
