use crate::util::{attr, segment, text};

use super::{Fragment, FragmentKind};

#[derive(Debug, Clone, PartialEq)]
pub struct FollowButton {
  pub username: String,
  pub is_following: bool,
}

impl Fragment for FollowButton {
  const KIND: FragmentKind = FragmentKind::FollowButton;

  fn render(&self) -> String {
    let (action, label) = if self.is_following {
      ("unfollow", "Unfollow")
    } else {
      ("follow", "Follow")
    };
    let url = format!("/profile/{}/{}", segment(&self.username), action);
    format!(
      r#"<button class="btn btn-sm btn-outline-secondary action-btn" fx-action="{}" fx-method="POST" fx-swap="outerHTML"><i class="ion-plus-round"></i>&nbsp;{} {}</button>"#,
      attr(&url), label, text(&self.username))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn label_and_action_flip() {
    let html = FollowButton { username: "jake".into(), is_following: false }.render();
    assert!(html.contains("Follow jake"));
    assert!(html.contains(r#"fx-action="/profile/jake/follow""#));

    let html = FollowButton { username: "jake".into(), is_following: true }.render();
    assert!(html.contains("Unfollow jake"));
    assert!(html.contains(r#"fx-action="/profile/jake/unfollow""#));
  }

  #[test]
  fn username_is_escaped() {
    let html = FollowButton { username: "<jo>".into(), is_following: false }.render();
    assert!(html.contains("Follow &lt;jo&gt;"));
    assert!(html.contains("/profile/%3Cjo%3E/follow"));
    assert!(!html.contains("<jo>"));
  }
}
