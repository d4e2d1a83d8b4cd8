use crate::error::*;
use crate::models::*;
use crate::forms::user::RegisterUser;
use crate::auth::pass;

use crate::db::*;
use crate::db::util::*;

use tokio_postgres::Row;

#[derive(Clone)]
pub struct UserService {
  // gets
  user_by_id: VersionedStatement,
  user_by_email: VersionedStatement,
  user_by_username: VersionedStatement,

  // updates
  store_user: VersionedStatement,
  update_password: VersionedStatement,
}

lazy_static! {
  static ref USER_COLUMNS: ColumnMappers = {
    ColumnMappers {
      table_name: "users",
      columns: vec![
        generated("id"),
        column("username"),
        column("email"),
        column("password"),
        column("is_staff"),
        generated("created_at"),
        generated("updated_at"),
      ],
    }
  };
}

fn user_from_row(row: &Row) -> User {
  User {
    id: row.get(0),
    username: row.get(1),
    email: row.get(2),
    password: row.get(3),
    is_staff: row.get(4),
    created_at: row.get(5),
    updated_at: row.get(6),
  }
}

fn user_from_opt_row(row: &Option<Row>) -> Option<User> {
  row.as_ref().map(user_from_row)
}

impl UserService {
  pub fn new(cl: SharedClient) -> Result<UserService> {
    let select = USER_COLUMNS.build_select_query("u");
    // Build user_by_* queries
    let user_by_id = VersionedStatement::new(cl.clone(),
        &format!(r#"{} WHERE u.id = $1"#, select))?;
    let user_by_email = VersionedStatement::new(cl.clone(),
        &format!(r#"{} WHERE u.email = $1"#, select))?;
    let user_by_username = VersionedStatement::new(cl.clone(),
        &format!(r#"{} WHERE u.username = $1"#, select))?;

    let store_user = VersionedStatement::new(cl.clone(),
        &USER_COLUMNS.build_insert_query())?;
    let update_password = VersionedStatement::new(cl.clone(),
        r#"UPDATE users SET password = $2, updated_at = (NOW() AT TIME ZONE 'utc')
        WHERE id = $1"#)?;

    Ok(UserService {
      user_by_id,
      user_by_email,
      user_by_username,

      store_user,
      update_password,
    })
  }

  pub async fn prepare(&self) -> Result<()> {
    self.user_by_id.prepare().await?;
    self.user_by_email.prepare().await?;
    self.user_by_username.prepare().await?;

    self.store_user.prepare().await?;
    self.update_password.prepare().await?;

    Ok(())
  }

  pub async fn get_by_id(&self, user_id: i32) -> Result<Option<User>> {
    let row = self.user_by_id.query_opt(&[&user_id]).await?;
    Ok(user_from_opt_row(&row))
  }

  pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
    let row = self.user_by_email.query_opt(&[&email]).await?;
    Ok(user_from_opt_row(&row))
  }

  pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
    let row = self.user_by_username.query_opt(&[&username]).await?;
    Ok(user_from_opt_row(&row))
  }

  /// Store a new user.  Only `is_staff` users may author posts.
  pub async fn register(&self, user: &RegisterUser, is_staff: bool) -> Result<User> {
    if self.get_by_username(&user.username).await?.is_some() {
      return Err(Error::UnprocessableEntity(json!({
        "error": format!("username already taken: {}", user.username),
      })));
    }
    if self.get_by_email(&user.email).await?.is_some() {
      return Err(Error::UnprocessableEntity(json!({
        "error": "email already registered",
      })));
    }
    let hash = pass::hash_password(&user.password)?;
    let row = self.store_user.query_one(&[
      &user.username, &user.email, &hash, &is_staff,
    ]).await?;
    Ok(user_from_row(&row))
  }

  pub async fn update_password(&self, user_id: i32, password: &str) -> Result<u64> {
    let hash = pass::hash_password(password)?;
    Ok(self.update_password.execute(&[&user_id, &hash]).await?)
  }
}
