use log::*;

use std::thread;
use futures::executor;

use crossbeam_channel::{
  bounded, Sender, Receiver,
};

use actix_rt::System;
use actix_web::{get, web, middleware, HttpResponse, App, HttpServer};

use crate::{
  error::*,
  app::*,
  db::DbService,
  services::config_services,
};

#[derive(Debug)]
enum StopEvent {
  /// Stop every server.
  Shutdown,
  /// Sent to one server.
  StopServer,
  StopServerFinished(u32),
}

fn send_event(tx: &Sender<StopEvent>, ev: StopEvent) {
  if let Err(e) = tx.send(ev) {
    error!("Failed to send stop event: {:?}", e.into_inner());
  }
}

#[get("/stop")]
async fn stop_server(waiter: web::Data<ServerWaiter>) -> HttpResponse {
  info!("Got shutdown request.");
  waiter.main_shutdown();

  HttpResponse::Ok().body("Shutting down.")
}

/// Main thread's handle on one server.
struct ServerStopper {
  tx: Sender<StopEvent>,
}

/// Server thread's side of the stop protocol.
#[derive(Clone)]
struct ServerWaiter {
  id: u32,
  main_tx: Sender<StopEvent>,
  rx: Receiver<StopEvent>,
}

impl ServerWaiter {
  fn wait_shutdown(&self) -> Result<StopEvent> {
    Ok(self.rx.recv()?)
  }

  fn server_stopped(&self) {
    debug!("Server({}) stopped, let main thread know.", self.id);
    send_event(&self.main_tx, StopEvent::StopServerFinished(self.id));
  }

  fn main_shutdown(&self) {
    info!("Signal main thread to shutdown.");
    send_event(&self.main_tx, StopEvent::Shutdown);
  }
}

struct MainStopper {
  tx: Sender<StopEvent>,
  rx: Receiver<StopEvent>,
  servers: Vec<ServerStopper>,
}

impl MainStopper {
  fn new() -> Self {
    let (tx, rx) = bounded(1);
    Self { tx, rx,
      servers: Vec::new(),
    }
  }

  fn new_server(&mut self) -> ServerWaiter {
    let id = self.servers.len() as u32;
    let (tx, rx) = bounded(1);
    self.servers.push(ServerStopper { tx });
    ServerWaiter {
      id,
      main_tx: self.tx.clone(),
      rx,
    }
  }

  /// Block until every server stopped, or a shutdown was requested.
  fn wait_shutdown(&self) {
    let total = self.servers.len();
    let mut stopped = 0usize;
    while stopped < total {
      match self.rx.recv() {
        Err(e) => {
          error!("Main thread waiter received error: {:?}", e);
          return;
        },
        Ok(StopEvent::Shutdown) => {
          info!("Got shutdown signal.  Stop servers.");
          break;
        },
        Ok(StopEvent::StopServerFinished(id)) => {
          stopped += 1;
          debug!("Server({}) stopped.  Remaining {}", id, total - stopped);
        },
        Ok(ev) => {
          error!("Main thread received unexpected event: {:?}", ev);
        },
      }
    }
    if stopped == total {
      return;
    }

    for stopper in self.servers.iter() {
      send_event(&stopper.tx, StopEvent::StopServer);
    }
    // Wait for the rest to confirm.
    while stopped < total {
      match self.rx.recv() {
        Err(e) => {
          error!("Main thread waiter received error during shutdown: {:?}", e);
          return;
        },
        Ok(StopEvent::StopServerFinished(id)) => {
          stopped += 1;
          debug!("Server({}) stopped.  Remaining {}", id, total - stopped);
        },
        Ok(_) => (),
      }
    }
    info!("Stopped all servers.");
  }
}

pub fn execute(config: AppConfig) -> Result<()> {
  let mut main_stopper = MainStopper::new();

  let servers = config.get_str_list("servers")?.unwrap_or_default();
  if servers.is_empty() {
    return Err(anyhow::anyhow!("no servers configured").into());
  }
  for server in servers {
    let cfg = config.clone();
    let waiter = main_stopper.new_server();
    debug!("Spawn server: {}", server);
    thread::spawn(move || {
      if let Err(e) = run_server(&cfg, &server, waiter.clone()) {
        error!("Error from server({}): {:?}", server, e);
        waiter.server_stopped();
      }
    });
  }

  main_stopper.wait_shutdown();

  info!("main thread: stopped.");
  Ok(())
}

async fn check_db(url: String) -> Result<()> {
  let db = DbService::new(&url)?;
  db.prepare().await
}

fn run_server(config: &AppConfig, prefix: &str, waiter: ServerWaiter) -> Result<()> {
  let mut sys = System::new(format!("system.{}", prefix));

  let debug = config.get_bool("debug")?.unwrap_or(false);
  if debug {
    // Prepare every statement once, so bad SQL fails at startup.
    sys.block_on(check_db(config.require_str("db.url")?))?;
  }

  info!("Serve.Services: configure services. prefix={}", prefix);
  let services = config_services(config, prefix)?;

  let stopper = if config.get_bool(&format!("{}.stopper", prefix))?.unwrap_or_default() {
    Some(waiter.clone())
  } else {
    None
  };

  let mut server = HttpServer::new(move || {
    let json = web::JsonConfig::default().limit(256 * 1024);

    let mut app = App::new()
      .app_data(json)
      .wrap(middleware::Logger::default())
      .wrap(middleware::Compress::default())
      .configure(|web| services.web_config(web));

    if let Some(ref stopper) = stopper {
      app = app.data(stopper.clone())
        .service(stop_server);
    }

    app
  });

  let workers = match config.get_int(&format!("{}.workers", prefix))? {
    Some(workers) if workers > 0 => workers as usize,
    _ => num_cpus::get(),
  };
  info!("Workers: {}", workers);
  server = server.workers(workers);

  if let Some(backlog) = config.get_int(&format!("{}.backlog", prefix))? {
    info!("Listen backlog: {}", backlog);
    server = server.backlog(backlog as i32);
  }

  let listen = config.require_str(&format!("{}.listen", prefix))?;
  info!("{} services listening on: {}", prefix, listen);
  server = server.bind(listen)?;

  let server = server.run();

  {
    let srv = server.clone();
    let waiter = waiter.clone();
    thread::spawn(move || {
      if let Ok(StopEvent::StopServer) = waiter.wait_shutdown() {
        debug!("Got shutdown signal.  Stop server: {}", waiter.id);
        executor::block_on(srv.stop(true));
      }
    });
  }

  let res = sys.block_on(server);
  waiter.server_stopped();
  Ok(res?)
}
