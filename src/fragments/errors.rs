use crate::util::text;

use super::{Fragment, FragmentKind};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorMessages {
  pub messages: Vec<String>,
}

impl Fragment for ErrorMessages {
  const KIND: FragmentKind = FragmentKind::ErrorMessages;

  /// Empty when there is nothing to report.
  fn render(&self) -> String {
    if self.messages.is_empty() {
      return String::new();
    }
    let items: String = self.messages.iter()
      .map(|m| format!("<li>{}</li>", text(m)))
      .collect();
    format!(r#"<ul class="error-messages">{}</ul>"#, items)
  }
}
