//! Packets sent by the server.

use serde::{Deserialize, Serialize};

pub mod login;
pub mod play;
pub mod status;

/// A plain-text JSON chat component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextComponent {
    pub text: String,
}

impl TextComponent {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Wraps plain text as a JSON chat component.
pub fn text_component(text: &str) -> serde_json::Result<String> {
    TextComponent::plain(text).to_json()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_component_escapes() {
        assert_eq!(text_component("hi").unwrap(), r#"{"text":"hi"}"#);
        assert_eq!(text_component("a\"b\\\n").unwrap(), r#"{"text":"a\"b\\\n"}"#);
        assert_eq!(text_component("\r\t").unwrap(), r#"{"text":"\r\t"}"#);
        assert_eq!(text_component("\u{1}").unwrap(), r#"{"text":"\u0001"}"#);

        let json = text_component("caf\u{e9} \u{1F600}").unwrap();
        let back: TextComponent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TextComponent::plain("caf\u{e9} \u{1F600}"));
    }
}
