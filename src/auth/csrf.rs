use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::*;

pub const CSRF_HEADER: &str = "X-CSRF-Token";
pub const CSRF_FIELD: &str = "csrf_token";

const ANONYMOUS_SEED: &[u8] = b"anonymous-user";

type HmacSha256 = Hmac<Sha256>;

/// CSRF token for an identity: HMAC-SHA256 of the user id under the server
/// secret, or a fixed value for anonymous visitors.  Stable across requests.
pub fn token_for(secret: &str, user_id: Option<i32>) -> Result<String> {
  match user_id {
    Some(id) => {
      let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("hmac key: {}", e))?;
      mac.update(id.to_string().as_bytes());
      Ok(hex::encode(mac.finalize().into_bytes()))
    },
    None => Ok(hex::encode(Sha256::digest(ANONYMOUS_SEED))),
  }
}

/// Constant-time comparison of a submitted token against the expected one.
pub fn tokens_match(submitted: Option<&str>, expected: &str) -> bool {
  match submitted {
    Some(token) if !token.is_empty() => token.as_bytes().ct_eq(expected.as_bytes()).into(),
    _ => false,
  }
}
