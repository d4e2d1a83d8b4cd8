use std::collections::HashMap;

use chrono::NaiveDateTime;
use slug::slugify;

use tokio_postgres::Row;

use crate::error::*;
use crate::util;

use crate::models::*;
use crate::forms::post::*;
use crate::forms::admin::PostAdminRow;

use crate::db::*;
use crate::db::util::*;

#[derive(Clone)]
pub struct PostService {
  // get one post
  post_by_id: VersionedStatement,
  post_by_slug: VersionedStatement,

  // get multiple posts
  list_posts: VersionedStatement,
  posts_by_year: VersionedStatement,
  popular_posts: VersionedStatement,
  posts_by_tag: VersionedStatement,

  // annotations
  post_counts: VersionedStatement,

  // store post
  store_post: VersionedStatement,

  // delete post
  delete_post: VersionedStatement,

  // (un)like post
  like_post: VersionedStatement,
  unlike_post: VersionedStatement,

  // admin list view
  admin_posts: VersionedStatement,
}

lazy_static! {
  pub(crate) static ref POST_COLUMNS: ColumnMappers = {
    ColumnMappers {
      table_name: "posts",
      columns: vec![
        generated("id"),
        column("author_id"),
        column("title"),
        column("text"),
        column("slug"),
        column("image"),
        column("published_at"),
      ],
    }
  };
}

/// Read the plain post columns starting at `offset`.
pub(crate) fn post_from_row_at(row: &Row, offset: usize) -> Post {
  Post {
    id: row.get(offset),
    author_id: row.get(offset + 1),
    title: row.get(offset + 2),
    text: row.get(offset + 3),
    slug: row.get(offset + 4),
    image: row.get(offset + 5),
    published_at: row.get(offset + 6),
    annotations: Default::default(),
  }
}

fn post_from_row(row: &Row) -> Post {
  post_from_row_at(row, 0)
}

fn post_from_opt_row(row: &Option<Row>) -> Option<Post> {
  row.as_ref().map(post_from_row)
}

fn post_with_likes_from_row(row: &Row) -> Post {
  let mut post = post_from_row(row);
  post.annotations.num_likes = Some(row.get(POST_COLUMNS.len()));
  post
}

/// Column limits of the posts table, in characters.
const TITLE_MAX_CHARS: usize = 200;
const SLUG_MAX_CHARS: usize = 200;
const IMAGE_MAX_CHARS: usize = 100;

fn unprocessable(message: String) -> Error {
  Error::UnprocessableEntity(json!({ "error": message }))
}

/// Slug of `title`, cut to fit the slug column.
///
/// `None` if nothing of the title survives slugification.
pub fn post_slug(title: &str) -> Option<String> {
  let slug: String = slugify(title).chars().take(SLUG_MAX_CHARS).collect();
  let slug = slug.trim_matches('-');
  if slug.is_empty() {
    None
  } else {
    Some(slug.to_string())
  }
}

/// Check that `post` fits the posts table and return its slug.
pub fn validate_post(post: &CreatePost) -> Result<String> {
  let title_len = post.title.chars().count();
  if post.title.trim().is_empty() || title_len > TITLE_MAX_CHARS {
    return Err(unprocessable(format!("post title must be 1 to {} characters", TITLE_MAX_CHARS)));
  }
  if post.image.chars().count() > IMAGE_MAX_CHARS {
    return Err(unprocessable(format!("post image must be at most {} characters", IMAGE_MAX_CHARS)));
  }
  post_slug(&post.title).ok_or_else(|| {
    unprocessable(format!("post title has nothing to build a slug from: {:?}", post.title))
  })
}

/// Comment and tag counts of a post, keyed by post id.
pub type PostCounts = HashMap<i32, (i64, i64)>;

/// Attach `counts` to every post, keeping the input order.
///
/// Fails on the first post that has no entry, which means it was deleted
/// after the collection was loaded.
pub fn attach_counts(mut posts: Vec<Post>, counts: &PostCounts) -> Result<Vec<Post>> {
  for post in posts.iter_mut() {
    let (comments_count, tags_count) = counts.get(&post.id)
      .ok_or(Error::MissingPost(post.id))?;
    post.annotations.comments_count = Some(*comments_count);
    post.annotations.tags_count = Some(*tags_count);
  }
  Ok(posts)
}

impl PostService {
  pub fn new(cl: SharedClient) -> Result<PostService> {
    let select = POST_COLUMNS.build_select_query("p");
    let columns = POST_COLUMNS.get_columns(Some("p"));

    // Build post_by_* queries
    let post_by_id = VersionedStatement::new(cl.clone(),
        &format!(r#"{} WHERE p.id = $1"#, select))?;
    // slugs aren't unique, prefer the newest post.
    let post_by_slug = VersionedStatement::new(cl.clone(),
        &format!(r#"{} WHERE p.slug = $1 ORDER BY p.published_at DESC, p.id DESC LIMIT 1"#, select))?;

    // Build list queries
    let list_posts = VersionedStatement::new(cl.clone(),
        &format!(r#"{} ORDER BY p.published_at DESC, p.id DESC LIMIT $1 OFFSET $2"#, select))?;
    let posts_by_year = VersionedStatement::new(cl.clone(),
        &format!(r#"{} WHERE p.published_at >= $1 AND p.published_at < $2
        ORDER BY p.published_at ASC, p.id ASC"#, select))?;
    let popular_posts = VersionedStatement::new(cl.clone(),
        &format!(r#"SELECT {}, COUNT(DISTINCT l.user_id) AS num_likes
        FROM posts p LEFT JOIN posts_likes l ON l.post_id = p.id
        GROUP BY p.id
        ORDER BY num_likes DESC, p.published_at DESC, p.id DESC
        LIMIT $1 OFFSET $2"#, columns))?;
    let posts_by_tag = VersionedStatement::new(cl.clone(),
        &format!(r#"{} INNER JOIN posts_tags pt ON pt.post_id = p.id
        INNER JOIN tags t ON t.id = pt.tag_id
        WHERE t.title = $1
        ORDER BY p.published_at DESC, p.id DESC"#, select))?;

    // Counted with sub-selects, joining both relations would multiply the counts.
    let post_counts = VersionedStatement::new(cl.clone(),
        r#"SELECT p.id,
          (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comments_count,
          (SELECT COUNT(*) FROM posts_tags pt WHERE pt.post_id = p.id) AS tags_count
        FROM posts p WHERE p.id = ANY($1)"#)?;

    // store post query, the post and its tags go in as one statement.
    let store_post = VersionedStatement::new(cl.clone(),
        &format!(r#"WITH p AS ({}),
        pt AS (INSERT INTO posts_tags(post_id, tag_id)
          SELECT DISTINCT p.id, t.tag_id FROM p, unnest($7::int[]) AS t(tag_id)
          ON CONFLICT DO NOTHING)
        SELECT {} FROM p"#, POST_COLUMNS.build_insert_query(), columns))?;

    let delete_post = VersionedStatement::new(cl.clone(),
        r#"DELETE FROM posts WHERE id = $1"#)?;

    let like_post = VersionedStatement::new(cl.clone(),
        r#"INSERT INTO posts_likes(post_id, user_id) VALUES($1, $2)
        ON CONFLICT DO NOTHING"#)?;
    let unlike_post = VersionedStatement::new(cl.clone(),
        r#"DELETE FROM posts_likes WHERE post_id = $1 AND user_id = $2"#)?;

    let admin_posts = VersionedStatement::new(cl.clone(),
        r#"SELECT p.id, p.title, p.published_at, p.author_id, u.username
        FROM posts p INNER JOIN users u ON u.id = p.author_id
        ORDER BY p.published_at DESC, p.id DESC LIMIT $1 OFFSET $2"#)?;

    Ok(PostService {
      post_by_id,
      post_by_slug,

      list_posts,
      posts_by_year,
      popular_posts,
      posts_by_tag,

      post_counts,

      store_post,

      delete_post,

      like_post,
      unlike_post,

      admin_posts,
    })
  }

  pub async fn prepare(&self) -> Result<()> {
    self.post_by_id.prepare().await?;
    self.post_by_slug.prepare().await?;

    self.list_posts.prepare().await?;
    self.posts_by_year.prepare().await?;
    self.popular_posts.prepare().await?;
    self.posts_by_tag.prepare().await?;

    self.post_counts.prepare().await?;

    self.store_post.prepare().await?;
    self.delete_post.prepare().await?;

    self.like_post.prepare().await?;
    self.unlike_post.prepare().await?;

    self.admin_posts.prepare().await?;
    Ok(())
  }

  pub async fn get_by_id(&self, post_id: i32) -> Result<Option<Post>> {
    let row = self.post_by_id.query_opt(&[&post_id]).await?;
    Ok(post_from_opt_row(&row))
  }

  pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>> {
    let row = self.post_by_slug.query_opt(&[&slug]).await?;
    Ok(post_from_opt_row(&row))
  }

  /// Posts newest first.
  pub async fn list(&self, page: &Page) -> Result<Vec<Post>> {
    let rows = self.list_posts.query(&[&page.limit, &page.offset]).await?;
    Ok(rows.iter().map(post_from_row).collect())
  }

  /// Posts published in calendar year `year`, oldest first.
  pub async fn year(&self, year: i32) -> Result<Vec<Post>> {
    let (start, end) = match util::year_bounds(year) {
      Some(bounds) => bounds,
      None => return Ok(Vec::new()),
    };
    let rows = self.posts_by_year.query(&[&start, &end]).await?;
    Ok(rows.iter().map(post_from_row).collect())
  }

  /// Posts ranked by number of distinct users who liked them.
  pub async fn popular(&self, page: &Page) -> Result<Vec<Post>> {
    let rows = self.popular_posts.query(&[&page.limit, &page.offset]).await?;
    Ok(rows.iter().map(post_with_likes_from_row).collect())
  }

  pub async fn list_by_tag(&self, tag_title: &str) -> Result<Vec<Post>> {
    let title = tag_title.to_lowercase();
    let rows = self.posts_by_tag.query(&[&title]).await?;
    Ok(rows.iter().map(post_from_row).collect())
  }

  /// Annotate already loaded posts with their comment and tag counts.
  ///
  /// One aggregate query covers the whole collection.
  pub async fn fetch_with_comments_count(&self, posts: Vec<Post>) -> Result<Vec<Post>> {
    if posts.is_empty() {
      return Ok(posts);
    }
    let ids: Vec<i32> = posts.iter().map(|post| post.id).collect();
    let rows = self.post_counts.query(&[&ids]).await?;
    let counts: PostCounts = rows.iter()
      .map(|row| (row.get(0), (row.get(1), row.get(2))))
      .collect();
    attach_counts(posts, &counts)
  }

  /// Store a new post authored by `author`, tagged with `tag_ids`.
  pub async fn store(&self, author: &User, post: &CreatePost, tag_ids: &[i32]) -> Result<Post> {
    if !author.is_staff {
      return Err(Error::Forbidden(json!({
        "error": "only staff accounts may author posts",
      })));
    }
    let slug = validate_post(post)?;
    let published_at: NaiveDateTime = match &post.published_at {
      Some(ts) => util::parse_iso8601(ts).map_err(Error::BadRequest)?,
      None => util::now(),
    };
    let row = self.store_post.query_one(&[
      &author.id, &post.title, &post.text, &slug, &post.image, &published_at, &tag_ids,
    ]).await?;
    Ok(post_from_row(&row))
  }

  pub async fn delete(&self, post_id: i32) -> Result<u64> {
    Ok(self.delete_post.execute(&[&post_id]).await?)
  }

  pub async fn like(&self, user_id: i32, post_id: i32) -> Result<u64> {
    Ok(self.like_post.execute(&[&post_id, &user_id]).await?)
  }

  pub async fn unlike(&self, user_id: i32, post_id: i32) -> Result<u64> {
    Ok(self.unlike_post.execute(&[&post_id, &user_id]).await?)
  }

  pub async fn admin_list(&self, page: &Page) -> Result<Vec<PostAdminRow>> {
    let rows = self.admin_posts.query(&[&page.limit, &page.offset]).await?;
    Ok(rows.iter().map(|row| PostAdminRow {
      id: row.get(0),
      title: row.get(1),
      published_at: row.get(2),
      author_id: row.get(3),
      author: row.get(4),
    }).collect())
  }
}
