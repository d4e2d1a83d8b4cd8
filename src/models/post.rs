use chrono::NaiveDateTime;

use serde::{Deserialize, Serialize};

/// Per-row aggregates attached by the query layer. Never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostAnnotations {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub num_likes: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub comments_count: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tags_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
  pub id: i32,
  pub author_id: i32,
  pub title: String,
  pub text: String,
  pub slug: String,
  pub image: String,
  pub published_at: NaiveDateTime,
  #[serde(flatten)]
  pub annotations: PostAnnotations,
}

impl Post {
  pub fn absolute_url(&self) -> String {
    format!("/posts/{}", self.slug)
  }
}

impl std::fmt::Display for Post {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.title)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn post() -> Post {
    Post {
      id: 1,
      author_id: 7,
      title: "Hello world".to_string(),
      text: "body".to_string(),
      slug: "hello-world".to_string(),
      image: "images/hello.png".to_string(),
      published_at: chrono::NaiveDate::from_ymd_opt(2020, 5, 1).unwrap()
        .and_hms_opt(12, 0, 0).unwrap(),
      annotations: Default::default(),
    }
  }

  #[test]
  fn display_and_url() {
    let post = post();
    assert_eq!(post.to_string(), "Hello world");
    assert_eq!(post.absolute_url(), "/posts/hello-world");
  }

  #[test]
  fn unset_annotations_are_not_serialized() {
    let mut post = post();
    let value = serde_json::to_value(&post).unwrap();
    assert!(value.get("numLikes").is_none());
    assert!(value.get("commentsCount").is_none());

    post.annotations.comments_count = Some(3);
    post.annotations.tags_count = Some(2);
    let value = serde_json::to_value(&post).unwrap();
    assert_eq!(value["commentsCount"], 3);
    assert_eq!(value["tagsCount"], 2);
    assert_eq!(value["publishedAt"], "2020-05-01T12:00:00");
  }
}
