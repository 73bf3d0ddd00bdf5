//! Server-rendered HTML fragments.
//!
//! Each fragment is a typed props struct implementing [`Fragment`]; the set of
//! fragments is fixed at compile time and listed by [`FragmentKind`].

use actix_web::HttpResponse;

mod favorite;
mod follow;
mod comment;
mod errors;
pub use self::{
  favorite::*,
  follow::*,
  comment::*,
  errors::*,
};

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

pub trait Fragment {
  const KIND: FragmentKind;

  fn render(&self) -> String;

  /// 200 response carrying the rendered markup.
  fn respond(&self) -> HttpResponse {
    HttpResponse::Ok()
      .content_type(HTML_CONTENT_TYPE)
      .body(self.render())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
  FavoriteButton,
  FollowButton,
  CommentCard,
  ErrorMessages,
}

impl FragmentKind {
  pub const ALL: [FragmentKind; 4] = [
    FragmentKind::FavoriteButton,
    FragmentKind::FollowButton,
    FragmentKind::CommentCard,
    FragmentKind::ErrorMessages,
  ];

  pub fn name(self) -> &'static str {
    match self {
      FragmentKind::FavoriteButton => "favorite-button",
      FragmentKind::FollowButton => "follow-button",
      FragmentKind::CommentCard => "comment",
      FragmentKind::ErrorMessages => "error-messages",
    }
  }

  pub fn from_name(name: &str) -> Option<FragmentKind> {
    Self::ALL.iter().copied().find(|kind| kind.name() == name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn registry_names_round_trip() {
    for kind in FragmentKind::ALL {
      assert_eq!(FragmentKind::from_name(kind.name()), Some(kind));
    }
    assert_eq!(FragmentKind::from_name("navbar"), None);
    assert_eq!(FavoriteButton::KIND, FragmentKind::FavoriteButton);
    assert_eq!(CommentCard::KIND.name(), "comment");
  }
}
