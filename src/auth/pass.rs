use libreauth::pass::{Algorithm, HashBuilder, Hasher};

use crate::error::*;

pub const PWD_ALGORITHM: Algorithm = Algorithm::Argon2;
pub const PWD_SCHEME_VERSION: usize = 1;

// If the Hasher changes, make sure to increment PWD_SCHEME_VERSION
fn hasher() -> Result<Hasher> {
  Ok(HashBuilder::new()
    .algorithm(PWD_ALGORITHM)
    .version(PWD_SCHEME_VERSION)
    .finalize()?)
}

#[derive(Debug)]
pub struct CheckedPass {
  pub is_valid: bool,
  pub needs_update: bool,
}

pub fn check_password(stored: &str, password: &str) -> Result<CheckedPass> {
  let checker = HashBuilder::from_phc(stored)?;
  let is_valid = checker.is_valid(password);
  Ok(CheckedPass {
    is_valid,
    needs_update: is_valid && checker.needs_update(Some(PWD_SCHEME_VERSION)),
  })
}

pub fn hash_password(password: &str) -> Result<String> {
  Ok(hasher()?.hash(password)?)
}
