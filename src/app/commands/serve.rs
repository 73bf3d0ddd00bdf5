use log::*;

use std::convert::TryInto;
use std::thread;

use actix_rt::System;
use actix_web::{web, HttpServer};

use crate::{
  error::*,
  app::*,
  services::{config_services, Services},
};

pub fn execute(config: AppConfig) -> Result<()> {
  let servers = config.get_str_list("servers")?
    .ok_or_else(|| anyhow::anyhow!("Missing list of servers"))?;

  let mut handles = Vec::new();
  for server in servers.into_iter() {
    // Load services up front so config errors stop startup.
    info!("Serve.Services: configure services. prefix={}", server);
    let services = config_services(&config, &server)?;
    let cfg = config.clone();
    debug!("Spawn server: {}", server);
    handles.push(thread::spawn(move || {
      if let Err(err) = run_server(&cfg, &server, services) {
        error!("Error from server({}): {:?}", server, err);
      }
      debug!("run_server({}): stopped.", server);
    }));
  }

  for handle in handles {
    if handle.join().is_err() {
      error!("Server thread panicked.");
    }
  }

  info!("main thread: stopped.");
  Ok(())
}

/// Per-server sizes from `<prefix>.form_limit`, `.workers` and `.backlog`.
#[derive(Debug, PartialEq)]
struct ServerLimits {
  form_limit: usize,
  workers: Option<usize>,
  backlog: Option<u32>,
}

impl ServerLimits {
  fn load(config: &AppConfig, prefix: &str) -> Result<Self> {
    let form_limit: usize = config.get_int(&format!("{}.form_limit", prefix))?
      .unwrap_or(256 * 1024)
      .try_into()
      .map_err(|_| anyhow::anyhow!("{}.form_limit must be >= 0", prefix))?;

    let workers: Option<usize> = match config.get_int(&format!("{}.workers", prefix))? {
      Some(workers) if workers > 0 => Some(workers.try_into()
        .map_err(|_| anyhow::anyhow!("{}.workers is too large", prefix))?),
      Some(_) => return Err(anyhow::anyhow!("{}.workers must be > 0", prefix).into()),
      None => None,
    };

    let backlog: Option<u32> = config.get_int(&format!("{}.backlog", prefix))?
      .map(|backlog| backlog.try_into()
        .map_err(|_| anyhow::anyhow!("{}.backlog must be between 0 and {}", prefix, u32::MAX)))
      .transpose()?;

    Ok(ServerLimits { form_limit, workers, backlog })
  }
}

fn run_server(config: &AppConfig, prefix: &str, services: Services) -> Result<()> {
  let sys = System::new();

  let debug = config.get_bool("debug")?.unwrap_or(false);
  debug!("Debug = {:?}", debug);

  if debug {
    // Test db prepared statements.
    sys.block_on(services.check_db())?;
  }

  let limits = ServerLimits::load(config, prefix)?;
  let form_limit = limits.form_limit;

  // Start http server
  let mut server = HttpServer::new(move || {
    build_app(&services)
      .app_data(web::FormConfig::default().limit(form_limit))
  });

  if let Some(workers) = limits.workers {
    info!("Workers: {}", workers);
    server = server.workers(workers);
  }

  if let Some(backlog) = limits.backlog {
    info!("Listen backlog: {}", backlog);
    server = server.backlog(backlog);
  }

  // setup binds.
  let listen = config.get_str(&format!("{}.listen", prefix))?
    .ok_or_else(|| anyhow::anyhow!("Missing {}.listen", prefix))?;
  info!("{} services listening on: {}", prefix, listen);
  server = server.bind(listen)?;

  // run server future
  sys.block_on(async move { server.run().await })?;
  Ok(())
}
