use log::*;

use std::collections::HashSet;

use actix_web::web;

use crate::error::*;
use crate::app::*;
use crate::models::User;
use crate::auth::AuthData;
use crate::db::DbService;

mod user;
mod post;
mod tag;
mod comment;
mod admin;

type BoxService = Box<dyn Service>;

pub trait Service: ServiceClone + Send {
  /// Load Service config from AppConfig.
  fn load_app_config(&mut self, config: &AppConfig, prefix: &str) -> Result<()>;

  /// Setup endpoints outside of `/api`.
  fn web_config(&self, _web: &mut web::ServiceConfig) {
  }

  /// Setup endpoints under `/api`.
  fn api_config(&self, _web: &mut web::ServiceConfig) {
  }
}

pub trait ServiceClone {
  fn clone_box(&self) -> BoxService;
}

impl<T> ServiceClone for T
where
    T: 'static + Service + Clone,
{
  fn clone_box(&self) -> BoxService {
    Box::new(self.clone())
  }
}

impl Clone for BoxService {
  fn clone(&self) -> BoxService {
    self.clone_box()
  }
}

fn new_service(name: &str) -> Result<BoxService> {
  Ok(match name {
    "User" => Box::new(user::new_factory()),
    "Post" => Box::new(post::new_factory()),
    "Tag" => Box::new(tag::new_factory()),
    "Comment" => Box::new(comment::new_factory()),
    "Admin" => Box::new(admin::new_factory()),
    _ => {
      return Err(anyhow::anyhow!("Unknown Service: {}", name).into());
    },
  })
}

/// Reload the account behind `auth`, failing unless it is staff now.
///
/// The token's staff flag is not trusted, it outlives account changes.
pub(crate) async fn staff_user(db: &DbService, auth: &AuthData) -> Result<User> {
  require_staff_account(db.user.get_by_id(auth.user_id).await?)
}

fn require_staff_account(user: Option<User>) -> Result<User> {
  match user {
    Some(user) if user.is_staff => Ok(user),
    Some(_) => Err(Error::Forbidden(json!({ "error": "staff account required" }))),
    None => Err(Error::Unauthorized(json!({ "error": "unknown user" }))),
  }
}

#[derive(Clone, Default)]
pub struct Services {
  db_url: String,
  services: Vec<BoxService>,
}

impl Services {
  pub fn new() -> Services {
    Default::default()
  }

  /// Load the services listed under `{prefix}.services`.
  pub fn load_app_config(&mut self, config: &AppConfig, prefix: &str) -> Result<()> {
    self.db_url = config.require_str("db.url")?;

    let list = config.get_str_list(&format!("{}.services", prefix))?
      .ok_or_else(|| anyhow::anyhow!("missing list of services: {}.services", prefix))?;
    let mut loaded = HashSet::new();
    for name in list {
      if !loaded.insert(name.clone()) {
        return Err(anyhow::anyhow!("can't load service multiple times: {}", name).into());
      }
      info!("Loading {}Service config", name);
      let mut service = new_service(&name)?;
      service.load_app_config(config, prefix)?;
      self.services.push(service);
    }
    Ok(())
  }

  pub fn len(&self) -> usize {
    self.services.len()
  }

  /// Setup Service endpoints.  Called once per worker.
  pub fn web_config(&self, web: &mut web::ServiceConfig) {
    match DbService::new(&self.db_url) {
      Ok(db) => {
        web.data(db);
      },
      Err(e) => {
        error!("Failed to init db: {:?}", e);
      },
    }

    for service in self.services.iter() {
      service.web_config(web);
    }
    web.service(
      web::scope("/api")
        .configure(|web| {
          for service in self.services.iter() {
            service.api_config(web);
          }
        })
    );
  }
}

pub fn config_services(config: &AppConfig, prefix: &str) -> Result<Services> {
  let mut services = Services::new();
  services.load_app_config(config, prefix)?;
  Ok(services)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn account(is_staff: bool) -> User {
    let now = crate::util::now();
    User {
      id: 7,
      username: "editor".to_string(),
      email: "editor@example.com".to_string(),
      password: String::new(),
      is_staff,
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn staff_flag_is_read_from_the_account() {
    assert_eq!(require_staff_account(Some(account(true))).unwrap().id, 7);
    assert!(matches!(require_staff_account(Some(account(false))), Err(Error::Forbidden(_))));
    assert!(matches!(require_staff_account(None), Err(Error::Unauthorized(_))));
  }

  #[test]
  fn loads_listed_services() {
    let config = AppConfig::from_toml(r#"
      [db]
      url = "postgres://localhost/blog"
      [api]
      services = ["Post", "Tag"]
    "#).unwrap();
    let services = config_services(&config, "api").unwrap();
    assert_eq!(services.len(), 2);
  }

  #[test]
  fn rejects_unknown_and_duplicate_services() {
    let config = AppConfig::from_toml(r#"
      [db]
      url = "postgres://localhost/blog"
      [api]
      services = ["Profile"]
      [web]
      services = ["Tag", "Tag"]
    "#).unwrap();
    assert!(config_services(&config, "api").is_err());
    assert!(config_services(&config, "web").is_err());
  }
}
