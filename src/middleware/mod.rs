mod auth;
mod csrf;
pub use self::{
  auth::*,
  csrf::*,
};
