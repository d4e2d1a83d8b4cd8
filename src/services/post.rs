use log::*;

use actix_web::{
  get, post, delete, web, HttpResponse,
  Error
};

use crate::error::*;
use crate::app::*;
use crate::models::*;
use crate::forms::post::*;
use crate::auth::AuthData;
use crate::db::DbService;
use crate::middleware::Auth;

pub(crate) async fn post_by_slug(db: &DbService, slug: &str) -> Result<Post> {
  db.post.get_by_slug(slug).await?.ok_or_else(|| {
    crate::error::Error::NotFound(json!({
      "error": format!("no post with slug: {}", slug),
    }))
  })
}

/// Get list of posts, newest first
#[get("/posts")]
async fn list(
  cfg: web::Data<PostService>,
  db: web::Data<DbService>,
  req: web::Query<PageRequest>,
) -> Result<HttpResponse, Error> {
  let posts = db.post.list(&req.page(cfg.page_size)).await?;
  Ok(HttpResponse::Ok().json(PostList::from(posts)))
}

/// Most liked posts, with comment and tag counts
#[get("/posts/popular")]
async fn popular(
  cfg: web::Data<PostService>,
  db: web::Data<DbService>,
  req: web::Query<PageRequest>,
) -> Result<HttpResponse, Error> {
  let posts = db.post.popular(&req.page(cfg.page_size)).await?;
  let posts = db.post.fetch_with_comments_count(posts).await?;
  Ok(HttpResponse::Ok().json(PostList::from(posts)))
}

/// Posts of one calendar year, oldest first
#[get("/posts/year/{year}")]
async fn by_year(
  db: web::Data<DbService>,
  year: web::Path<i32>,
) -> Result<HttpResponse, Error> {
  let posts = db.post.year(year.into_inner()).await?;
  Ok(HttpResponse::Ok().json(PostList::from(posts)))
}

/// get post by slug
#[get("/posts/{slug}")]
async fn get_post(
  db: web::Data<DbService>,
  slug: web::Path<String>,
) -> Result<HttpResponse, Error> {
  let post = post_by_slug(&db, &slug).await?;
  let url = post.absolute_url();
  Ok(HttpResponse::Ok().json(PostOut {
    post: PostDetails { post, url },
  }))
}

/// post new post, staff only
#[post("/posts", wrap="Auth::required()")]
async fn store_post(
  auth: AuthData,
  db: web::Data<DbService>,
  post: web::Json<PostOut<CreatePost>>,
) -> Result<HttpResponse, Error> {
  let author = super::staff_user(&db, &auth).await?;
  let post = post.into_inner().post;

  let mut tag_ids = Vec::with_capacity(post.tag_list.len());
  for title in post.tag_list.iter() {
    tag_ids.push(db.tag.get_or_create(title).await?.id);
  }
  let stored = db.post.store(&author, &post, &tag_ids).await?;
  info!("Post - stored post: id={}, slug={}", stored.id, stored.slug);

  let url = stored.absolute_url();
  Ok(HttpResponse::Ok().json(PostOut {
    post: PostDetails { post: stored, url },
  }))
}

/// delete an existing post, staff only
#[delete("/posts/{slug}", wrap="Auth::required()")]
async fn delete_post(
  auth: AuthData,
  cfg: web::Data<PostService>,
  db: web::Data<DbService>,
  slug: web::Path<String>,
) -> Result<HttpResponse, Error> {
  super::staff_user(&db, &auth).await?;
  if !cfg.allow_delete {
    return Ok(HttpResponse::Forbidden().finish());
  }
  let post = post_by_slug(&db, &slug).await?;
  db.post.delete(post.id).await?;
  info!("Post - deleted post: id={}", post.id);
  Ok(HttpResponse::Ok().finish())
}

#[post("/posts/{slug}/like", wrap="Auth::required()")]
async fn like(
  auth: AuthData,
  db: web::Data<DbService>,
  slug: web::Path<String>,
) -> Result<HttpResponse, Error> {
  let post = post_by_slug(&db, &slug).await?;
  db.post.like(auth.user_id, post.id).await?;
  Ok(HttpResponse::Ok().finish())
}

#[delete("/posts/{slug}/like", wrap="Auth::required()")]
async fn unlike(
  auth: AuthData,
  db: web::Data<DbService>,
  slug: web::Path<String>,
) -> Result<HttpResponse, Error> {
  let post = post_by_slug(&db, &slug).await?;
  db.post.unlike(auth.user_id, post.id).await?;
  Ok(HttpResponse::Ok().finish())
}

#[derive(Debug, Clone)]
pub struct PostService {
  pub page_size: i64,
  pub allow_delete: bool,
}

impl Default for PostService {
  fn default() -> Self {
    Self {
      page_size: 20,
      allow_delete: false,
    }
  }
}

impl super::Service for PostService {
  fn load_app_config(&mut self, config: &AppConfig, _prefix: &str) -> Result<()> {
    self.page_size = config.get_int("Post.page_size")?.unwrap_or(self.page_size);
    self.allow_delete = config.get_bool("Post.allow_delete")?.unwrap_or(false);
    Ok(())
  }

  fn api_config(&self, web: &mut web::ServiceConfig) {
    // `popular` must be registered ahead of `{slug}`.
    web
      .data(self.clone())
      .service(list)
      .service(popular)
      .service(by_year)
      .service(get_post)
      .service(store_post)
      .service(delete_post)
      .service(like)
      .service(unlike);
  }
}

pub fn new_factory() -> PostService {
  Default::default()
}
