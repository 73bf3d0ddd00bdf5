//! One Postgres connection per worker, kept open by a background task, and
//! statements that re-prepare themselves whenever the connection they were
//! prepared on has been replaced.

use log::*;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tokio::time::sleep;

use tokio_postgres::{
  connect, Client, NoTls, Row, Statement,
  error::SqlState,
  types::ToSql,
};

use crate::error::*;

const CONNECT_BACKOFF: Duration = Duration::from_millis(500);
const POLL_INTERVAL: Duration = Duration::from_millis(100);
const MAX_WAITS: u32 = 10;

fn disconnected() -> Error {
  Error::DisconnectedError("Failed to connect to database".to_string())
}

/// An open connection.  `generation` goes up by one on every reconnect.
pub struct Connection {
  generation: u64,
  client: Client,
}

#[derive(Clone)]
enum Link {
  Down(u64),
  Connecting(u64),
  Up(Rc<Connection>),
}

/// Handle on the worker's connection, shared by all of its statements.
#[derive(Clone)]
pub struct SharedClient {
  link: Rc<RefCell<Link>>,
}

impl SharedClient {
  /// Start connecting in the background.  Must be called on the worker's
  /// runtime.
  pub fn new(url: &str) -> Self {
    let shared = SharedClient {
      link: Rc::new(RefCell::new(Link::Down(0))),
    };
    let task = shared.clone();
    let url = url.to_string();
    actix_rt::spawn(async move {
      task.maintain(&url).await;
      info!("Postgres connection task stopped.");
    });
    shared
  }

  /// Keep a connection open until the server closes it cleanly.
  async fn maintain(&self, url: &str) {
    let mut generation = 0;
    loop {
      generation += 1;
      self.set_link(Link::Connecting(generation));
      let (client, conn) = loop {
        match connect(url, NoTls).await {
          Ok(pair) => break pair,
          Err(err) => {
            warn!("Postgres connect failed (gen {}): {}", generation, err);
            sleep(CONNECT_BACKOFF).await;
          },
        }
      };
      info!("Postgres connected (gen {}).", generation);
      self.set_link(Link::Up(Rc::new(Connection {
        generation,
        client,
      })));

      if let Err(err) = conn.await {
        warn!("Postgres connection lost (gen {}): {}", generation, err);
      } else {
        debug!("Postgres connection closed (gen {}).", generation);
        return;
      }
      self.set_link(Link::Down(generation));
      sleep(CONNECT_BACKOFF).await;
    }
  }

  /// The open connection, waiting briefly while a reconnect is in progress.
  pub async fn connection(&self) -> Result<Rc<Connection>> {
    for _ in 0..MAX_WAITS {
      match self.link() {
        Link::Up(conn) => return Ok(conn),
        Link::Connecting(generation) | Link::Down(generation) => {
          debug!("Waiting for Postgres connection (gen {}).", generation);
          sleep(POLL_INTERVAL).await;
        },
      }
    }
    Err(disconnected())
  }

  fn is_current(&self, generation: u64) -> bool {
    matches!(&*self.link.borrow(), Link::Up(conn) if conn.generation == generation)
  }

  fn link(&self) -> Link {
    self.link.borrow().clone()
  }

  fn set_link(&self, link: Link) {
    self.link.replace(link);
  }
}

struct Prepared {
  conn: Rc<Connection>,
  statement: Statement,
}

/// A query prepared lazily on the current connection.
#[derive(Clone)]
pub struct VersionedStatement {
  shared_cl: SharedClient,
  prepared: RefCell<Option<Rc<Prepared>>>,
  query: String,
}

macro_rules! statement_call {
  ($method:ident, $out:ty) => {
    pub async fn $method(&self, params: &[&(dyn ToSql + Sync)]) -> Result<$out> {
      let mut attempts = 0;
      loop {
        let prepared = self.statement().await?;
        match prepared.conn.client.$method(&prepared.statement, params).await {
          Ok(out) => return Ok(out),
          Err(err) if err.is_closed() && attempts < MAX_WAITS => {
            attempts += 1;
            info!("Postgres connection closed, retrying query.");
            sleep(POLL_INTERVAL).await;
          },
          Err(err) => return Err(self.query_error(err)),
        }
      }
    }
  };
}

impl VersionedStatement {
  pub fn new(shared_cl: SharedClient, query: &str) -> Result<Self> {
    Ok(VersionedStatement {
      shared_cl,
      prepared: RefCell::new(None),
      query: query.to_string(),
    })
  }

  /// Prepare now instead of on first use.
  pub async fn prepare(&self) -> Result<()> {
    self.statement().await?;
    Ok(())
  }

  async fn statement(&self) -> Result<Rc<Prepared>> {
    let cached = self.prepared.borrow().clone();
    if let Some(prepared) = cached {
      if self.shared_cl.is_current(prepared.conn.generation) {
        return Ok(prepared);
      }
      debug!("Statement outlived its connection, re-preparing.");
    }

    for _ in 0..MAX_WAITS {
      let conn = self.shared_cl.connection().await?;
      match conn.client.prepare(&self.query).await {
        Ok(statement) => {
          let prepared = Rc::new(Prepared {
            conn,
            statement,
          });
          self.prepared.replace(Some(prepared.clone()));
          return Ok(prepared);
        },
        Err(err) if err.is_closed() => {
          sleep(POLL_INTERVAL).await;
        },
        Err(err) => {
          error!("Postgres prepare failed: {}, query=[[{}]]", err, self.query);
          return Err(err.into());
        },
      }
    }
    Err(disconnected())
  }

  /// Unique violations become `Error::Conflict` naming the constraint.
  fn query_error(&self, err: tokio_postgres::Error) -> Error {
    if err.is_closed() {
      return disconnected();
    }
    if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
      let constraint = err.as_db_error()
        .and_then(|e| e.constraint())
        .unwrap_or("unique")
        .to_string();
      debug!("Unique violation: {}, query=[[{}]]", constraint, self.query);
      return Error::Conflict(constraint);
    }
    error!("Postgres error: {}, query=[[{}]]", err, self.query);
    err.into()
  }

  statement_call!(query, Vec<Row>);
  statement_call!(query_one, Row);
  statement_call!(query_opt, Option<Row>);
  statement_call!(execute, u64);
}
