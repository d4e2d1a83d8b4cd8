use log::*;

use actix_web::{
  get, post, web, HttpResponse,
  Error
};

use crate::error::*;
use crate::app::*;
use crate::models::*;
use crate::forms::tag::*;
use crate::forms::post::PostList;
use crate::auth::AuthData;
use crate::db::DbService;
use crate::middleware::Auth;

/// Get list of tags, by title
#[get("/tags")]
async fn list(
  db: web::Data<DbService>,
) -> Result<HttpResponse, Error> {
  let tags = db.tag.list().await?;
  Ok(HttpResponse::Ok().json(TagList { tags }))
}

/// Tags ranked by number of posts
#[get("/tags/popular")]
async fn popular(
  db: web::Data<DbService>,
) -> Result<HttpResponse, Error> {
  let tags = db.tag.popular().await?;
  Ok(HttpResponse::Ok().json(TagList { tags }))
}

/// Top tags with their posts
#[get("/tags/popular/posts")]
async fn popular_with_posts(
  db: web::Data<DbService>,
) -> Result<HttpResponse, Error> {
  let tags = db.tag.popular_tag_with_posts().await?;
  Ok(HttpResponse::Ok().json(PopularTags { tags }))
}

/// Posts carrying a tag
#[get("/tags/{title}/posts")]
async fn tag_filter(
  db: web::Data<DbService>,
  title: web::Path<String>,
) -> Result<HttpResponse, Error> {
  if db.tag.get_by_title(&title).await?.is_none() {
    return Ok(HttpResponse::NotFound().json(json!({
      "error": format!("no tag: {}", title),
    })));
  }
  let posts = db.post.list_by_tag(&title).await?;
  Ok(HttpResponse::Ok().json(PostList::from(posts)))
}

/// post new tag, staff only
#[post("/tags", wrap="Auth::required()")]
async fn store_tag(
  auth: AuthData,
  db: web::Data<DbService>,
  tag: web::Json<TagOut<CreateTag>>,
) -> Result<HttpResponse, Error> {
  super::staff_user(&db, &auth).await?;
  let tag = db.tag.store(Tag::new(&tag.tag.title)).await?;
  info!("Tag - stored tag: id={}, title={}", tag.id, tag.title);
  Ok(HttpResponse::Ok().json(TagOut { tag }))
}

#[derive(Debug, Clone, Default)]
pub struct TagService {
}

impl super::Service for TagService {
  fn load_app_config(&mut self, _config: &AppConfig, _prefix: &str) -> Result<()> {
    Ok(())
  }

  fn api_config(&self, web: &mut web::ServiceConfig) {
    // `popular/posts` must be registered ahead of `{title}/posts`.
    web
      .service(list)
      .service(popular)
      .service(popular_with_posts)
      .service(tag_filter)
      .service(store_tag);
  }
}

pub fn new_factory() -> TagService {
  Default::default()
}
