use log::*;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

pub const DEFAULT_TAG_TTL: Duration = Duration::from_secs(60);

/// Result of a cache lookup.  A miss carries the generation to hand back
/// to `put` once the catalog has been read.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedTags {
  Hit(Vec<String>),
  Miss(u64),
}

#[derive(Debug, Default)]
struct Entries {
  generation: u64,
  by_min_count: HashMap<i64, (Instant, Vec<String>)>,
}

/// Time-bounded cache of the tag catalog, keyed by minimum usage count.
///
/// Shared by all workers of a server.  Entries expire after `ttl` and the
/// whole cache is dropped whenever an article's tag set may have changed.
/// A read that started before an invalidation is not stored.
#[derive(Debug)]
pub struct TagCache {
  ttl: Duration,
  entries: Mutex<Entries>,
}

impl Default for TagCache {
  fn default() -> Self {
    Self::new(DEFAULT_TAG_TTL)
  }
}

impl TagCache {
  pub fn new(ttl: Duration) -> Self {
    Self {
      ttl,
      entries: Mutex::new(Entries::default()),
    }
  }

  fn lock(&self) -> MutexGuard<'_, Entries> {
    self.entries.lock().unwrap_or_else(|poisoned| {
      warn!("TagCache: lock poisoned, recovering.");
      poisoned.into_inner()
    })
  }

  pub fn get(&self, min_count: i64) -> CachedTags {
    let entries = self.lock();
    match entries.by_min_count.get(&min_count) {
      Some((stored, tags)) if stored.elapsed() < self.ttl => CachedTags::Hit(tags.clone()),
      _ => CachedTags::Miss(entries.generation),
    }
  }

  /// Store `tags` read after a miss at `generation`.  Dropped when the
  /// cache was invalidated in the meantime.
  pub fn put(&self, min_count: i64, generation: u64, tags: Vec<String>) {
    let mut entries = self.lock();
    if entries.generation != generation {
      debug!("TagCache: discarding catalog read before invalidation.");
      return;
    }
    entries.by_min_count.insert(min_count, (Instant::now(), tags));
  }

  pub fn invalidate(&self) {
    let mut entries = self.lock();
    entries.generation += 1;
    entries.by_min_count.clear();
  }
}
