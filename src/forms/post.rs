use serde::{Deserialize, Serialize};

use crate::models::*;

#[derive(Debug, Serialize, Deserialize)]
pub struct PostOut<T> {
  pub post: T,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostList {
  pub posts: Vec<Post>,
  pub posts_count: usize,
}

impl From<Vec<Post>> for PostList {
  fn from(posts: Vec<Post>) -> Self {
    Self {
      posts_count: posts.len(),
      posts,
    }
  }
}

/// Post as shown on its detail page.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetails {
  #[serde(flatten)]
  pub post: Post,
  pub url: String,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PageRequest {
  pub limit: Option<i64>,
  pub offset: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page {
  pub limit: i64,
  pub offset: i64,
}

impl PageRequest {
  /// Resolve to a concrete page, falling back to `default_limit`.
  pub fn page(&self, default_limit: i64) -> Page {
    Page {
      limit: self.limit.filter(|l| *l > 0).unwrap_or(default_limit),
      offset: self.offset.unwrap_or(0).max(0),
    }
  }
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreatePost {
  pub title: String,
  pub text: String,
  pub image: String,
  /// ISO-8601, defaults to now.
  pub published_at: Option<String>,
  #[serde(default)]
  pub tag_list: Vec<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn page_defaults() {
    let req = PageRequest::default();
    assert_eq!(req.page(20), Page { limit: 20, offset: 0 });
  }

  #[test]
  fn page_ignores_invalid_values() {
    let req = PageRequest { limit: Some(0), offset: Some(-4) };
    assert_eq!(req.page(10), Page { limit: 10, offset: 0 });

    let req = PageRequest { limit: Some(3), offset: Some(6) };
    assert_eq!(req.page(10), Page { limit: 3, offset: 6 });
  }

  #[test]
  fn create_post_from_json() {
    let post: PostOut<CreatePost> = serde_json::from_value(json!({
      "post": {
        "title": "Hello",
        "text": "World",
        "image": "hello.png",
        "publishedAt": "2020-01-02T03:04:05Z",
        "tagList": ["Rust", "web"],
      }
    })).unwrap();
    assert_eq!(post.post.title, "Hello");
    assert_eq!(post.post.published_at.as_deref(), Some("2020-01-02T03:04:05Z"));
    assert_eq!(post.post.tag_list, vec!["Rust", "web"]);

    let post: CreatePost = serde_json::from_value(json!({
      "title": "t", "text": "x", "image": "i.png",
    })).unwrap();
    assert!(post.tag_list.is_empty());
    assert!(post.published_at.is_none());
  }
}
