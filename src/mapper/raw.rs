//! Raw source values as site adapters hand them over.

use serde_json::Value;

/// One raw value extracted by a site adapter: plain text, a markup fragment,
/// or a JSON scalar. The setters decide per field how much cleaning each
/// variant needs; numbers skip the text vocabularies entirely.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    /// An HTML fragment (a table cell, a span soup). Only its visible text
    /// participates in normalization.
    Html(String),
    Number(serde_json::Number),
    Bool(bool),
    Null,
}

impl RawValue {
    /// Visible text of the value; `None` for null.
    pub fn text(&self) -> Option<String> {
        match self {
            RawValue::Text(s) => Some(s.clone()),
            RawValue::Html(h) => Some(fragment_text(h)),
            RawValue::Number(n) => Some(n.to_string()),
            RawValue::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            RawValue::Null => None,
        }
    }

    /// True for null, blank text, numeric zero and false, the values the
    /// sources use to mean "nothing here".
    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Text(s) | RawValue::Html(s) => s.trim().is_empty(),
            RawValue::Number(n) => n.as_f64() == Some(0.0),
            RawValue::Bool(b) => !b,
        }
    }
}

/// Flatten a markup fragment to its visible text, space-separated.
fn fragment_text(html: &str) -> String {
    let fragment = scraper::Html::parse_fragment(html);
    fragment
        .root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => RawValue::Text(s),
            Value::Number(n) => RawValue::Number(n),
            Value::Bool(b) => RawValue::Bool(b),
            Value::Null => RawValue::Null,
            // Composite values are rare and site-specific; keep them visible
            // as their JSON text so a mapping rule can still skip them.
            other => RawValue::Text(other.to_string()),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_text_extraction() {
        let value = RawValue::Html("<td>Этаж <b>5</b> из 12</td>".to_string());
        assert_eq!(value.text().unwrap(), "Этаж 5 из 12");
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(RawValue::from(serde_json::json!(5)).text().unwrap(), "5");
        assert_eq!(RawValue::from(serde_json::json!(true)).text().unwrap(), "1");
        assert_eq!(RawValue::from(serde_json::json!(null)).text(), None);
    }

    #[test]
    fn test_emptiness() {
        assert!(RawValue::Null.is_empty());
        assert!(RawValue::Text("  ".into()).is_empty());
        assert!(RawValue::from(serde_json::json!(0)).is_empty());
        assert!(!RawValue::from(serde_json::json!("0")).is_empty());
    }
}
