//! Admin list views.  Related records are referenced by raw id.

use chrono::NaiveDateTime;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct AdminList<T> {
  pub columns: Vec<&'static str>,
  pub rows: Vec<T>,
}

pub trait AdminRow {
  /// Columns shown in the list view.
  const LIST_DISPLAY: &'static [&'static str];
}

impl<T: AdminRow> From<Vec<T>> for AdminList<T> {
  fn from(rows: Vec<T>) -> Self {
    Self {
      columns: T::LIST_DISPLAY.to_vec(),
      rows,
    }
  }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PostAdminRow {
  pub id: i32,
  pub title: String,
  pub published_at: NaiveDateTime,
  pub author_id: i32,
  pub author: String,
}

impl AdminRow for PostAdminRow {
  const LIST_DISPLAY: &'static [&'static str] = &["title", "published_at", "author"];
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TagAdminRow {
  pub id: i32,
  pub title: String,
}

impl AdminRow for TagAdminRow {
  const LIST_DISPLAY: &'static [&'static str] = &["title"];
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CommentAdminRow {
  pub id: i32,
  pub text: String,
  pub post_id: i32,
  pub author_id: i32,
}

impl AdminRow for CommentAdminRow {
  const LIST_DISPLAY: &'static [&'static str] = &["text", "post"];
}
