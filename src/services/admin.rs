use actix_web::{
  get, web, HttpResponse,
  Error
};

use crate::error::*;
use crate::app::*;
use crate::forms::admin::*;
use crate::forms::post::PageRequest;
use crate::auth::AuthData;
use crate::db::DbService;
use crate::middleware::Auth;

#[get("/admin/posts", wrap="Auth::required()")]
async fn posts(
  auth: AuthData,
  cfg: web::Data<AdminService>,
  db: web::Data<DbService>,
  req: web::Query<PageRequest>,
) -> Result<HttpResponse, Error> {
  super::staff_user(&db, &auth).await?;
  let rows = db.post.admin_list(&req.page(cfg.list_per_page)).await?;
  Ok(HttpResponse::Ok().json(AdminList::from(rows)))
}

#[get("/admin/tags", wrap="Auth::required()")]
async fn tags(
  auth: AuthData,
  db: web::Data<DbService>,
) -> Result<HttpResponse, Error> {
  super::staff_user(&db, &auth).await?;
  let rows = db.tag.admin_list().await?;
  Ok(HttpResponse::Ok().json(AdminList::from(rows)))
}

#[get("/admin/comments", wrap="Auth::required()")]
async fn comments(
  auth: AuthData,
  cfg: web::Data<AdminService>,
  db: web::Data<DbService>,
  req: web::Query<PageRequest>,
) -> Result<HttpResponse, Error> {
  super::staff_user(&db, &auth).await?;
  let rows = db.comment.admin_list(&req.page(cfg.list_per_page)).await?;
  Ok(HttpResponse::Ok().json(AdminList::from(rows)))
}

#[derive(Debug, Clone)]
pub struct AdminService {
  pub list_per_page: i64,
}

impl Default for AdminService {
  fn default() -> Self {
    Self {
      list_per_page: 100,
    }
  }
}

impl super::Service for AdminService {
  fn load_app_config(&mut self, config: &AppConfig, _prefix: &str) -> Result<()> {
    self.list_per_page = config.get_int("Admin.list_per_page")?.unwrap_or(self.list_per_page);
    Ok(())
  }

  fn api_config(&self, web: &mut web::ServiceConfig) {
    web
      .data(self.clone())
      .service(posts)
      .service(tags)
      .service(comments);
  }
}

pub fn new_factory() -> AdminService {
  Default::default()
}
