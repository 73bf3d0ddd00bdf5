use chrono::{Datelike, NaiveDateTime};

use html_escape::{encode_double_quoted_attribute, encode_text};

/// English ordinal suffix: 1st, 2nd, 3rd, 4th, 11th, 12th, 13th, 21st, ...
pub fn ordinal_suffix(day: u32) -> &'static str {
  match (day % 10, day % 100) {
    (_, 11..=13) => "th",
    (1, _) => "st",
    (2, _) => "nd",
    (3, _) => "rd",
    _ => "th",
  }
}

/// "January 5th"
pub fn month_day(ts: &NaiveDateTime) -> String {
  let day = ts.day();
  format!("{} {}{}", ts.format("%B"), day, ordinal_suffix(day))
}

pub fn text(value: &str) -> String {
  encode_text(value).into_owned()
}

pub fn attr(value: &str) -> String {
  encode_double_quoted_attribute(value).into_owned()
}

/// Percent-encode one URL path segment.
pub fn segment(value: &str) -> String {
  urlencoding::encode(value).into_owned()
}
