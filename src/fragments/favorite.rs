use crate::util::{attr, segment};

use super::{Fragment, FragmentKind};

#[derive(Debug, Clone, PartialEq)]
pub struct FavoriteButton {
  pub slug: String,
  pub count: i64,
  pub is_favorited: bool,
  pub align_right: bool,
  pub compact: bool,
}

impl FavoriteButton {
  /// The opposite verb of the current state.
  pub fn action(&self) -> &'static str {
    if self.is_favorited { "unfavorite" } else { "favorite" }
  }

  /// Variant flags carried over to the next toggle.
  fn query_string(&self) -> String {
    let mut qs = Vec::new();
    if self.align_right {
      qs.push("align=right");
    }
    if self.compact {
      qs.push("variant=compact");
    }
    if qs.is_empty() {
      String::new()
    } else {
      format!("?{}", qs.join("&"))
    }
  }

  pub fn action_url(&self) -> String {
    format!("/article/{}/{}{}", segment(&self.slug), self.action(), self.query_string())
  }
}

impl Fragment for FavoriteButton {
  const KIND: FragmentKind = FragmentKind::FavoriteButton;

  fn render(&self) -> String {
    let align = if self.align_right { " pull-xs-right" } else { "" };
    let class = if self.is_favorited { "btn-primary" } else { "btn-outline-primary" };
    let open = format!(
      r#"<button class="btn btn-sm{} {}" fx-action="{}" fx-method="POST" fx-swap="outerHTML">"#,
      align, class, attr(&self.action_url()));
    if self.compact {
      format!(r#"{}<i class="ion-heart"></i> {}</button>"#, open, self.count)
    } else {
      let label = if self.is_favorited { "Unfavorite" } else { "Favorite" };
      format!(
        r#"{}<i class="ion-heart"></i>&nbsp;{} Article <span class="counter">({})</span></button>"#,
        open, label, self.count)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn button(is_favorited: bool) -> FavoriteButton {
    FavoriteButton {
      slug: "x".into(),
      count: 3,
      is_favorited,
      align_right: false,
      compact: false,
    }
  }

  #[test]
  fn favorited_button_offers_unfavorite() {
    let html = button(true).render();
    assert!(html.contains("Unfavorite"));
    assert!(html.contains("(3)"));
    assert!(html.contains(r#"fx-action="/article/x/unfavorite""#));
    assert!(html.contains("btn-primary"));
  }

  #[test]
  fn unfavorited_button_offers_favorite() {
    let html = button(false).render();
    assert!(html.contains("Favorite Article"));
    assert!(!html.contains("Unfavorite"));
    assert!(html.contains(r#"fx-action="/article/x/favorite""#));
    assert!(html.contains("btn-outline-primary"));
  }

  #[test]
  fn variants_are_kept_in_the_action_url() {
    let mut b = button(false);
    b.align_right = true;
    b.compact = true;
    assert_eq!(b.action_url(), "/article/x/favorite?align=right&variant=compact");
    assert_eq!(
      b.render(),
      r#"<button class="btn btn-sm pull-xs-right btn-outline-primary" fx-action="/article/x/favorite?align=right&amp;variant=compact" fx-method="POST" fx-swap="outerHTML"><i class="ion-heart"></i> 3</button>"#
    );
  }

  #[test]
  fn slug_is_encoded() {
    let mut b = button(false);
    b.slug = r#"a"b"#.into();
    assert!(b.render().contains("/article/a%22b/favorite"));
  }
}
