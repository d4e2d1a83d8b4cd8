use log::*;

use actix_rt::System;

use crate::{
  error::*,
  app::*,
  db::DbService,
};

async fn install_schema(url: String) -> Result<()> {
  let db = DbService::new(&url)?;
  db.migrate().await?;
  // Every statement should prepare against the fresh schema.
  db.prepare().await
}

/// Install the schema into `db.url`.
pub fn execute(config: AppConfig) -> Result<()> {
  let db_url = config.require_str("db.url")?;
  let mut sys = System::new("system.migrate");
  sys.block_on(install_schema(db_url))?;
  info!("Schema installed.");
  Ok(())
}
