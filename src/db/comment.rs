use crate::error::*;
use crate::util;

use crate::models::*;
use crate::forms::comment::*;
use crate::forms::post::Page;
use crate::forms::admin::CommentAdminRow;

use crate::db::*;
use crate::db::util::*;

use tokio_postgres::Row;

#[derive(Clone)]
pub struct CommentService {
  // get comment
  comment_by_id: VersionedStatement,

  // store comment
  store_comment: VersionedStatement,

  // delete comment
  delete_comment: VersionedStatement,

  // get multiple comments
  comments_by_post: VersionedStatement,

  admin_comments: VersionedStatement,
}

lazy_static! {
  static ref COMMENT_COLUMNS: ColumnMappers = {
    ColumnMappers {
      table_name: "comments",
      columns: vec![
        generated("id"),
        column("post_id"),
        column("author_id"),
        column("text"),
        column("published_at"),
      ],
    }
  };
}

fn comment_from_row(row: &Row) -> Comment {
  Comment {
    id: row.get(0),
    post_id: row.get(1),
    author_id: row.get(2),
    text: row.get(3),
    published_at: row.get(4),
  }
}

fn comment_details_from_row(row: &Row) -> CommentDetails {
  CommentDetails {
    comment: comment_from_row(row),
    author_username: row.get(5),
    post_title: row.get(6),
  }
}

impl CommentService {
  pub fn new(cl: SharedClient) -> Result<CommentService> {
    let details_select = format!(r#"SELECT {}, u.username, p.title
      FROM comments c INNER JOIN users u ON u.id = c.author_id
      INNER JOIN posts p ON p.id = c.post_id"#, COMMENT_COLUMNS.get_columns(Some("c")));

    let comment_by_id = VersionedStatement::new(cl.clone(),
        &format!(r#"{} WHERE c.id = $1"#, details_select))?;

    let store_comment = VersionedStatement::new(cl.clone(),
        &COMMENT_COLUMNS.build_insert_query())?;

    let delete_comment = VersionedStatement::new(cl.clone(),
        r#"DELETE FROM comments WHERE id = $1"#)?;

    let comments_by_post = VersionedStatement::new(cl.clone(),
        &format!(r#"{} WHERE c.post_id = $1 ORDER BY c.published_at ASC, c.id ASC"#, details_select))?;

    let admin_comments = VersionedStatement::new(cl.clone(),
        &format!(r#"{} ORDER BY c.published_at ASC, c.id ASC LIMIT $1 OFFSET $2"#,
        COMMENT_COLUMNS.build_select_query("c")))?;

    Ok(CommentService {
      comment_by_id,

      store_comment,
      delete_comment,

      comments_by_post,

      admin_comments,
    })
  }

  pub async fn prepare(&self) -> Result<()> {
    self.comment_by_id.prepare().await?;

    self.store_comment.prepare().await?;
    self.delete_comment.prepare().await?;

    self.comments_by_post.prepare().await?;
    self.admin_comments.prepare().await?;

    Ok(())
  }

  pub async fn get_by_id(&self, comment_id: i32) -> Result<Option<CommentDetails>> {
    let row = self.comment_by_id.query_opt(&[&comment_id]).await?;
    Ok(row.as_ref().map(comment_details_from_row))
  }

  pub async fn store(&self, author_id: i32, post_id: i32, comment: &CreateComment) -> Result<Comment> {
    let published_at = util::now();
    let row = self.store_comment.query_one(&[
      &post_id, &author_id, &comment.text, &published_at,
    ]).await?;
    Ok(comment_from_row(&row))
  }

  pub async fn delete(&self, comment_id: i32) -> Result<u64> {
    Ok(self.delete_comment.execute(&[&comment_id]).await?)
  }

  /// Comments of a post, oldest first.
  pub async fn list_by_post(&self, post_id: i32) -> Result<Vec<CommentDetails>> {
    let rows = self.comments_by_post.query(&[&post_id]).await?;
    Ok(rows.iter().map(comment_details_from_row).collect())
  }

  pub async fn admin_list(&self, page: &Page) -> Result<Vec<CommentAdminRow>> {
    let rows = self.admin_comments.query(&[&page.limit, &page.offset]).await?;
    Ok(rows.iter().map(|row| {
      let comment = comment_from_row(row);
      CommentAdminRow {
        id: comment.id,
        text: comment.text,
        post_id: comment.post_id,
        author_id: comment.author_id,
      }
    }).collect())
  }
}
