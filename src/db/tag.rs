use std::collections::HashMap;

use tokio_postgres::Row;

use crate::error::*;

use crate::models::*;
use crate::forms::admin::TagAdminRow;

use crate::db::*;
use crate::db::util::*;
use crate::db::post::{POST_COLUMNS, post_from_row_at};

/// How many tags `popular_tag_with_posts` returns.
pub const POPULAR_TAGS_LIMIT: i64 = 5;

const TITLE_MAX_CHARS: usize = 20;

/// Titles that collide with the `/tags/popular/...` routes.
const RESERVED_TITLES: &[&str] = &["popular"];

/// Check a cleaned tag title.
pub fn validate_title(title: &str) -> Result<()> {
  if title.trim().is_empty() || title.chars().count() > TITLE_MAX_CHARS {
    return Err(Error::UnprocessableEntity(json!({
      "error": format!("tag title must be 1 to {} characters", TITLE_MAX_CHARS),
    })));
  }
  if RESERVED_TITLES.contains(&title) {
    return Err(Error::UnprocessableEntity(json!({
      "error": format!("tag title is reserved: {}", title),
    })));
  }
  Ok(())
}

#[derive(Clone)]
pub struct TagService {
  tag_by_title: VersionedStatement,
  list_tags: VersionedStatement,
  store_tag: VersionedStatement,
  upsert_tag: VersionedStatement,

  popular_tags: VersionedStatement,
  posts_for_tags: VersionedStatement,
}

lazy_static! {
  static ref TAG_COLUMNS: ColumnMappers = {
    ColumnMappers {
      table_name: "tags",
      columns: vec![
        generated("id"),
        column("title"),
      ],
    }
  };
}

fn tag_from_row(row: &Row) -> Tag {
  Tag {
    id: row.get(0),
    title: row.get(1),
    posts_count: None,
  }
}

fn tag_with_count_from_row(row: &Row) -> Tag {
  Tag {
    posts_count: Some(row.get(2)),
    ..tag_from_row(row)
  }
}

/// Distribute `(tag_id, post)` pairs onto their tags, keeping the order of
/// both `tags` and the pairs.
pub fn group_posts_by_tag(tags: Vec<Tag>, posts: Vec<(i32, Post)>) -> Vec<TagWithPosts> {
  let mut by_tag: HashMap<i32, Vec<Post>> = HashMap::new();
  for (tag_id, post) in posts {
    by_tag.entry(tag_id).or_insert_with(Vec::new).push(post);
  }
  tags.into_iter().map(|tag| {
    let posts = by_tag.remove(&tag.id).unwrap_or_default();
    TagWithPosts { tag, posts }
  }).collect()
}

impl TagService {
  pub fn new(cl: SharedClient) -> Result<TagService> {
    let select = TAG_COLUMNS.build_select_query("t");

    let tag_by_title = VersionedStatement::new(cl.clone(),
        &format!(r#"{} WHERE t.title = $1"#, select))?;
    let list_tags = VersionedStatement::new(cl.clone(),
        &format!(r#"{} ORDER BY t.title ASC"#, select))?;
    let store_tag = VersionedStatement::new(cl.clone(),
        r#"INSERT INTO tags(title) VALUES($1)
        ON CONFLICT (title) DO NOTHING
        RETURNING id, title"#)?;
    // The no-op update makes the existing row come back from RETURNING.
    let upsert_tag = VersionedStatement::new(cl.clone(),
        r#"INSERT INTO tags(title) VALUES($1)
        ON CONFLICT (title) DO UPDATE SET title = EXCLUDED.title
        RETURNING id, title"#)?;

    let popular_tags = VersionedStatement::new(cl.clone(),
        r#"SELECT t.id, t.title, COUNT(pt.post_id) AS posts_count
        FROM tags t LEFT JOIN posts_tags pt ON pt.tag_id = t.id
        GROUP BY t.id
        ORDER BY posts_count DESC, t.title ASC
        LIMIT $1"#)?;

    // Posts of several tags at once, each with its own tag count.
    let posts_for_tags = VersionedStatement::new(cl.clone(),
        &format!(r#"SELECT pt.tag_id, {},
          (SELECT COUNT(*) FROM posts_tags c WHERE c.post_id = p.id) AS tags_count
        FROM posts_tags pt INNER JOIN posts p ON p.id = pt.post_id
        WHERE pt.tag_id = ANY($1)
        ORDER BY p.published_at DESC, p.id DESC"#, POST_COLUMNS.get_columns(Some("p"))))?;

    Ok(TagService {
      tag_by_title,
      list_tags,
      store_tag,
      upsert_tag,

      popular_tags,
      posts_for_tags,
    })
  }

  pub async fn prepare(&self) -> Result<()> {
    self.tag_by_title.prepare().await?;
    self.list_tags.prepare().await?;
    self.store_tag.prepare().await?;
    self.upsert_tag.prepare().await?;

    self.popular_tags.prepare().await?;
    self.posts_for_tags.prepare().await?;
    Ok(())
  }

  /// Tags ordered by title.
  pub async fn list(&self) -> Result<Vec<Tag>> {
    let rows = self.list_tags.query(&[]).await?;
    Ok(rows.iter().map(tag_from_row).collect())
  }

  pub async fn get_by_title(&self, title: &str) -> Result<Option<Tag>> {
    let title = title.to_lowercase();
    let row = self.tag_by_title.query_opt(&[&title]).await?;
    Ok(row.as_ref().map(tag_from_row))
  }

  /// Store a new tag.  The title is always cleaned first.
  pub async fn store(&self, mut tag: Tag) -> Result<Tag> {
    tag.clean();
    validate_title(&tag.title)?;
    match self.store_tag.query_opt(&[&tag.title]).await? {
      Some(row) => Ok(tag_from_row(&row)),
      None => Err(Error::UnprocessableEntity(json!({
        "error": format!("tag already exists: {}", tag.title),
      }))),
    }
  }

  /// Get the tag titled `title`, creating it when missing.
  pub async fn get_or_create(&self, title: &str) -> Result<Tag> {
    let mut tag = Tag::new(title);
    tag.clean();
    validate_title(&tag.title)?;
    let row = self.upsert_tag.query_one(&[&tag.title]).await?;
    Ok(tag_from_row(&row))
  }

  async fn ranked(&self, limit: Option<i64>) -> Result<Vec<Tag>> {
    let rows = self.popular_tags.query(&[&limit]).await?;
    Ok(rows.iter().map(tag_with_count_from_row).collect())
  }

  /// All tags ranked by number of posts.
  pub async fn popular(&self) -> Result<Vec<Tag>> {
    // `LIMIT NULL` means no limit.
    self.ranked(None).await
  }

  /// The top tags by post count, each with its posts pre-loaded.
  pub async fn popular_tag_with_posts(&self) -> Result<Vec<TagWithPosts>> {
    let tags = self.ranked(Some(POPULAR_TAGS_LIMIT)).await?;
    if tags.is_empty() {
      return Ok(Vec::new());
    }
    let ids: Vec<i32> = tags.iter().map(|tag| tag.id).collect();
    let rows = self.posts_for_tags.query(&[&ids]).await?;
    let tags_count_idx = POST_COLUMNS.len() + 1;
    let posts = rows.iter().map(|row| {
      let mut post = post_from_row_at(row, 1);
      post.annotations.tags_count = Some(row.get(tags_count_idx));
      (row.get(0), post)
    }).collect();
    Ok(group_posts_by_tag(tags, posts))
  }

  pub async fn admin_list(&self) -> Result<Vec<TagAdminRow>> {
    let rows = self.list_tags.query(&[]).await?;
    Ok(rows.iter().map(|row| TagAdminRow {
      id: row.get(0),
      title: row.get(1),
    }).collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tag(id: i32, title: &str, count: i64) -> Tag {
    Tag {
      id,
      title: title.to_string(),
      posts_count: Some(count),
    }
  }

  fn post(id: i32) -> Post {
    Post {
      id,
      author_id: 1,
      title: format!("post {}", id),
      text: String::new(),
      slug: format!("post-{}", id),
      image: String::new(),
      published_at: chrono::NaiveDate::from_ymd_opt(2022, 2, 2).unwrap()
        .and_hms_opt(0, 0, 0).unwrap(),
      annotations: Default::default(),
    }
  }

  #[test]
  fn posts_are_grouped_under_their_tag() {
    let tags = vec![tag(2, "rust", 2), tag(1, "go", 1), tag(3, "zig", 0)];
    let posts = vec![(2, post(10)), (1, post(11)), (2, post(12))];

    let grouped = group_posts_by_tag(tags, posts);
    assert_eq!(grouped.len(), 3);
    assert_eq!(grouped[0].tag.title, "rust");
    assert_eq!(grouped[0].posts.iter().map(|p| p.id).collect::<Vec<_>>(), vec![10, 12]);
    assert_eq!(grouped[1].posts.iter().map(|p| p.id).collect::<Vec<_>>(), vec![11]);
    assert!(grouped[2].posts.is_empty());
  }

  #[test]
  fn a_post_can_appear_under_several_tags() {
    let tags = vec![tag(1, "a", 1), tag(2, "b", 1)];
    let posts = vec![(1, post(5)), (2, post(5))];

    let grouped = group_posts_by_tag(tags, posts);
    assert_eq!(grouped[0].posts[0].id, 5);
    assert_eq!(grouped[1].posts[0].id, 5);
  }

  #[test]
  fn tag_titles_are_checked() {
    assert!(validate_title("rust").is_ok());
    assert!(validate_title(&"x".repeat(20)).is_ok());
    assert!(matches!(validate_title(""), Err(Error::UnprocessableEntity(_))));
    assert!(matches!(validate_title(" "), Err(Error::UnprocessableEntity(_))));
    assert!(matches!(validate_title(&"x".repeat(21)), Err(Error::UnprocessableEntity(_))));
  }

  #[test]
  fn popular_is_not_a_tag_title() {
    assert!(matches!(validate_title("popular"), Err(Error::UnprocessableEntity(_))));
  }
}
