use serde::{Deserialize, Serialize};

use crate::models::tag::*;

#[derive(Debug, Serialize, Deserialize)]
pub struct TagList {
  pub tags: Vec<Tag>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PopularTags {
  pub tags: Vec<TagWithPosts>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagOut<T> {
  pub tag: T,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CreateTag {
  pub title: String,
}
