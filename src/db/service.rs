use log::*;

use std::rc::Rc;
use std::cell::RefCell;
use std::time::Duration;

use tokio::time::delay_for;

use tokio_postgres::{
  connect, Client, Statement, Row, NoTls,
  types::ToSql,
};

use crate::error::*;

use super::{
  UserService,
  PostService,
  TagService,
  CommentService,
};

const MAX_RETRIES: u32 = 10;
const RECONNECT_DELAY: Duration = Duration::from_millis(500);
const POLL_DELAY: Duration = Duration::from_millis(100);

pub static SCHEMA_SQL: &'static str = include_str!("../../sql/schema.sql");

fn disconnected() -> Error {
  Error::DisconnectedError("Failed to connect to database".to_string())
}

/// What to do with a failed client call.
enum Failure {
  /// Connection dropped, the call can be retried once reconnected.
  Retry,
  Fatal(Error),
}

fn classify(err: tokio_postgres::Error, query: &str) -> Failure {
  match err.code() {
    // client-side error.
    None => {
      if err.to_string() == "connection closed" {
        Failure::Retry
      } else {
        error!("Postgres error: {}, query=[[{}]]", err, query);
        Failure::Fatal(err.into())
      }
    },
    // server-side error.
    Some(code) => {
      error!("Postgres DB error: {:?}: {}, query=[[{}]]", code, err, query);
      Failure::Fatal(err.into())
    },
  }
}

pub type RefClient = Rc<(u64, Client)>;

/// Client connected state
#[derive(Clone)]
pub enum ClientState {
  Disconnected(u64),
  Connecting(u64),
  Connected(RefClient),
}

/// A postgres client shared by all repository services of one worker.
/// Each time the client reconnects the version number is bumped, which
/// invalidates statements prepared on the old connection.
#[derive(Clone)]
pub struct SharedClient {
  state: Rc<RefCell<ClientState>>,
}

impl SharedClient {
  pub fn new(url: &str) -> Self {
    let cl = Self {
      state: Rc::new(RefCell::new(ClientState::Disconnected(0))),
    };
    let task_cl = cl.clone();
    let url = url.to_string();
    actix_rt::spawn(async move {
      task_cl.run_connection(url).await;
      debug!("client background task stopped.");
    });
    cl
  }

  async fn run_connection(&self, url: String) {
    let mut version = 0;
    loop {
      version += 1;
      debug!("client task: ver={}: Connecting", version);
      self.set_state(ClientState::Connecting(version));
      let (cl, conn) = loop {
        match connect(&url, NoTls).await {
          Ok(pair) => break pair,
          Err(e) => {
            debug!("client task: ver={}: connect error: {}", version, e);
            delay_for(RECONNECT_DELAY).await;
          },
        }
      };
      debug!("client task: ver={}: Connecting -> Connected", version);
      self.set_state(ClientState::Connected(Rc::new((version, cl))));

      // Drive the connection until it closes.
      if let Err(e) = conn.await {
        debug!("tokio-postgres connection error: {}", e);
      } else {
        debug!("tokio-postgres connection closed.");
        self.set_state(ClientState::Disconnected(version));
        return;
      }
      debug!("client task: ver={}: Connected -> Connecting", version);
      delay_for(RECONNECT_DELAY).await;
    }
  }

  pub async fn get_client(&self) -> Result<RefClient> {
    for _ in 0..MAX_RETRIES {
      match self.get_state() {
        ClientState::Connected(cl) => return Ok(cl),
        ClientState::Connecting(version) | ClientState::Disconnected(version) => {
          debug!("get_client: ver={}: waiting for connection", version);
          delay_for(POLL_DELAY).await;
        },
      }
    }
    Err(disconnected())
  }

  /// Run a multi-statement script, without parameters.
  pub async fn batch_execute(&self, script: &str) -> Result<()> {
    let mut retries = 0;
    loop {
      let cl = self.get_client().await?;
      match cl.1.batch_execute(script).await {
        Ok(()) => return Ok(()),
        Err(err) => match classify(err, "<batch>") {
          Failure::Retry if retries + 1 < MAX_RETRIES => {
            retries += 1;
            info!("DB connection closed, retry batch.");
            delay_for(POLL_DELAY).await;
          },
          Failure::Retry => return Err(disconnected()),
          Failure::Fatal(err) => return Err(err),
        },
      }
    }
  }

  /// Is `version` still the live connection?
  pub fn check_version(&self, version: u64) -> bool {
    match &*self.state.borrow() {
      ClientState::Connected(cl) => cl.0 == version,
      _ => false,
    }
  }

  fn get_state(&self) -> ClientState {
    self.state.borrow().clone()
  }

  fn set_state(&self, state: ClientState) {
    self.state.replace(state);
  }
}

pub struct ClientStatement {
  cl: RefClient,
  statement: Statement,
}

/// Prepare statement state
#[derive(Clone)]
enum StatementState {
  Init,
  Preparing(u64),
  Prepared(Rc<ClientStatement>),
}

/// A lazily prepared statement bound to the current `SharedClient` version.
#[derive(Clone)]
pub struct VersionedStatement {
  shared_cl: SharedClient,
  state: Rc<RefCell<StatementState>>,
  query: String,
}

macro_rules! impl_client_method {
  ($method:ident, $res_ty:ty) => {
    pub async fn $method(&self, params: &[&(dyn ToSql + Sync)]) -> Result<$res_ty> {
      let mut retries = 0;
      loop {
        let prepared = self.get_statement().await?;
        match prepared.cl.1.$method(&prepared.statement, params).await {
          Ok(res) => return Ok(res),
          Err(err) => match classify(err, &self.query) {
            Failure::Retry => {
              retries += 1;
              if retries >= MAX_RETRIES {
                return Err(disconnected());
              }
              info!("DB connection closed, retry query.");
              delay_for(POLL_DELAY).await;
            },
            Failure::Fatal(err) => return Err(err),
          },
        }
      }
    }
  };
}

impl VersionedStatement {
  pub fn new(shared_cl: SharedClient, query: &str) -> Result<Self> {
    Ok(Self {
      shared_cl,
      state: Rc::new(RefCell::new(StatementState::Init)),
      query: query.to_string(),
    })
  }

  pub async fn prepare(&self) -> Result<()> {
    self.get_statement().await?;
    Ok(())
  }

  async fn get_statement(&self) -> Result<Rc<ClientStatement>> {
    for _ in 0..MAX_RETRIES {
      match self.get_state() {
        StatementState::Init => {
          let cl = self.shared_cl.get_client().await?;
          let version = cl.0;
          debug!("get_statement: ver={}: Init -> Preparing", version);
          self.set_state(StatementState::Preparing(version));
          match cl.1.prepare(&self.query).await {
            Ok(statement) => {
              debug!("get_statement: ver={}: Preparing -> Prepared", version);
              let prepared = Rc::new(ClientStatement { cl, statement });
              self.set_state(StatementState::Prepared(prepared.clone()));
              return Ok(prepared);
            },
            Err(err) => {
              self.set_state(StatementState::Init);
              match classify(err, &self.query) {
                Failure::Retry => debug!("get_statement: ver={}: connection closed", version),
                Failure::Fatal(err) => return Err(err),
              }
            },
          }
        },
        StatementState::Preparing(version) => {
          // Another task on this worker is preparing it.
          debug!("get_statement: ver={}: Preparing..", version);
          delay_for(POLL_DELAY).await;
        },
        StatementState::Prepared(prepared) => {
          if self.shared_cl.check_version(prepared.cl.0) {
            return Ok(prepared);
          }
          // old connection, prepare again.
          self.set_state(StatementState::Init);
        },
      }
    }
    Err(disconnected())
  }

  fn get_state(&self) -> StatementState {
    self.state.borrow().clone()
  }

  fn set_state(&self, state: StatementState) {
    self.state.replace(state);
  }

  impl_client_method!(query, Vec<Row>);
  impl_client_method!(query_one, Row);
  impl_client_method!(query_opt, Option<Row>);
  impl_client_method!(execute, u64);
}

#[derive(Clone)]
pub struct DbService {
  pub shared_cl: SharedClient,
  pub user: UserService,
  pub post: PostService,
  pub tag: TagService,
  pub comment: CommentService,
}

impl DbService {
  pub fn new(db_url: &str) -> Result<DbService> {
    let shared_cl = SharedClient::new(db_url);

    Ok(DbService {
      user: UserService::new(shared_cl.clone())?,
      post: PostService::new(shared_cl.clone())?,
      tag: TagService::new(shared_cl.clone())?,
      comment: CommentService::new(shared_cl.clone())?,
      shared_cl,
    })
  }

  /// Install the schema.  Safe to run more than once.
  pub async fn migrate(&self) -> Result<()> {
    info!("DBService: install schema.");
    self.shared_cl.batch_execute(SCHEMA_SQL).await
  }

  pub async fn prepare(&self) -> Result<()> {
    info!("DBService: Prepare UserService.");
    self.user.prepare().await?;
    info!("DBService: Prepare PostService.");
    self.post.prepare().await?;
    info!("DBService: Prepare TagService.");
    self.tag.prepare().await?;
    info!("DBService: Prepare CommentService.");
    self.comment.prepare().await?;

    info!("DBService: finished.");
    Ok(())
  }
}
