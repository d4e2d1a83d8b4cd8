use log::*;

use actix_web::{
  get, post, delete, web, HttpResponse,
  Error
};

use crate::error::*;
use crate::app::*;
use crate::forms::comment::*;
use crate::auth::AuthData;
use crate::db::DbService;
use crate::middleware::Auth;

use super::post::post_by_slug;

/// Comments of a post, oldest first
#[get("/posts/{slug}/comments")]
async fn list(
  db: web::Data<DbService>,
  slug: web::Path<String>,
) -> Result<HttpResponse, Error> {
  let post = post_by_slug(&db, &slug).await?;
  let comments = db.comment.list_by_post(post.id).await?;
  Ok(HttpResponse::Ok().json(CommentList { comments }))
}

#[post("/posts/{slug}/comments", wrap="Auth::required()")]
async fn store_comment(
  auth: AuthData,
  cfg: web::Data<CommentService>,
  db: web::Data<DbService>,
  slug: web::Path<String>,
  comment: web::Json<CommentOut<CreateComment>>,
) -> Result<HttpResponse, Error> {
  let comment = comment.into_inner().comment;
  if comment.text.trim().is_empty() || comment.text.len() > cfg.max_length {
    return Err(crate::error::Error::UnprocessableEntity(json!({
      "error": format!("comment text must be 1 to {} bytes", cfg.max_length),
    })).into());
  }
  let post = post_by_slug(&db, &slug).await?;
  let stored = db.comment.store(auth.user_id, post.id, &comment).await?;
  debug!("Comment - stored comment: id={}, post_id={}", stored.id, post.id);
  Ok(HttpResponse::Ok().json(CommentOut { comment: stored }))
}

/// delete a comment, its author or staff only
#[delete("/posts/{slug}/comments/{id}", wrap="Auth::required()")]
async fn delete_comment(
  auth: AuthData,
  db: web::Data<DbService>,
  path: web::Path<(String, i32)>,
) -> Result<HttpResponse, Error> {
  let (slug, comment_id) = path.into_inner();
  let post = post_by_slug(&db, &slug).await?;
  let comment = match db.comment.get_by_id(comment_id).await? {
    Some(details) if details.comment.post_id == post.id => details.comment,
    _ => return Ok(HttpResponse::NotFound().finish()),
  };
  if comment.author_id != auth.user_id {
    super::staff_user(&db, &auth).await?;
  }
  db.comment.delete(comment.id).await?;
  Ok(HttpResponse::Ok().finish())
}

#[derive(Debug, Clone)]
pub struct CommentService {
  pub max_length: usize,
}

impl Default for CommentService {
  fn default() -> Self {
    Self {
      max_length: 10_000,
    }
  }
}

impl super::Service for CommentService {
  fn load_app_config(&mut self, config: &AppConfig, _prefix: &str) -> Result<()> {
    if let Some(max_length) = config.get_int("Comment.max_length")? {
      self.max_length = max_length.max(1) as usize;
    }
    Ok(())
  }

  fn api_config(&self, web: &mut web::ServiceConfig) {
    web
      .data(self.clone())
      .service(list)
      .service(store_comment)
      .service(delete_comment);
  }
}

pub fn new_factory() -> CommentService {
  Default::default()
}
