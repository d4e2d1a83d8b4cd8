use log::*;

use std::convert::TryFrom;

use actix_web::{
  get, post, web, HttpResponse,
  Error
};

use crate::error::*;
use crate::app::*;
use crate::forms::*;
use crate::auth::AuthData;

use crate::db::DbService;
use crate::auth::pass;

use crate::middleware::Auth;

/// login user
#[post("/users/login")]
async fn login(
  db: web::Data<DbService>,
  login: web::Json<UserOut<LoginUser>>,
) -> Result<HttpResponse, Error> {
  let login = &login.user;
  let user = match db.user.get_by_email(&login.email).await? {
    Some(user) => user,
    _ => {
      return Ok(HttpResponse::NotFound().finish());
    }
  };

  let res = pass::check_password(&user.password, &login.password)?;
  debug!("login: user_id={}, valid={}", user.id, res.is_valid);
  if res.is_valid {
    if res.needs_update {
      // Rehash password.
      db.user.update_password(user.id, &login.password).await?;
    }
    Ok(HttpResponse::Ok().json(UserResponse::try_from(user)?))
  } else {
    Ok(HttpResponse::Unauthorized().json(json!({
      "error": "Invalid user/password",
    })))
  }
}

/// register new user
#[post("/users")]
async fn register(
  cfg: web::Data<UserService>,
  db: web::Data<DbService>,
  register: web::Json<UserOut<RegisterUser>>,
) -> Result<HttpResponse, Error> {
  if !cfg.allow_register {
    return Ok(HttpResponse::Forbidden().finish());
  }
  let register = &register.user;
  let is_staff = cfg.is_staff_email(&register.email);
  let user = db.user.register(register, is_staff).await?;
  info!("Registered user: id={}, staff={}", user.id, user.is_staff);

  Ok(HttpResponse::Ok().json(UserResponse::try_from(user)?))
}

/// get current user
#[get("/user", wrap="Auth::required()")]
async fn get_user(
  auth: AuthData,
  db: web::Data<DbService>,
) -> Result<HttpResponse, Error> {
  match db.user.get_by_id(auth.user_id).await? {
    Some(user) => {
      Ok(HttpResponse::Ok().json(UserResponse::try_from(user)?))
    },
    _ => {
      Ok(HttpResponse::NotFound().finish())
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct UserService {
  pub allow_register: bool,
  /// Registrations with these emails get staff accounts.
  pub staff_emails: Vec<String>,
}

impl UserService {
  fn is_staff_email(&self, email: &str) -> bool {
    self.staff_emails.iter().any(|e| e.eq_ignore_ascii_case(email))
  }
}

impl super::Service for UserService {
  fn load_app_config(&mut self, config: &AppConfig, _prefix: &str) -> Result<()> {
    self.allow_register = config.get_bool("User.allow_register")?.unwrap_or(false);
    self.staff_emails = config.get_str_list("User.staff_emails")?.unwrap_or_default();
    Ok(())
  }

  fn api_config(&self, web: &mut web::ServiceConfig) {
    web
      .data(self.clone())
      .service(register)
      .service(login)
      .service(get_user);
  }
}

pub fn new_factory() -> UserService {
  Default::default()
}
