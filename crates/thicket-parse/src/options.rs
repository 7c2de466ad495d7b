use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Limits and switches for a [`Parser`](crate::Parser).
///
/// Deserialises from JSON with every field optional:
///
/// ```json
/// { "max_versions": 4, "max_steps": 100000, "timeout_ms": 250, "reuse": true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserOptions {
    /// Most stack versions kept alive after each round.
    pub max_versions: usize,
    /// Most parse actions performed before giving up.
    pub max_steps: Option<u64>,
    #[serde(rename = "timeout_ms", deserialize_with = "millis")]
    pub timeout: Option<Duration>,
    /// Whether an old tree's nodes may be reused.
    pub reuse: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self { max_versions: 6, max_steps: None, timeout: None, reuse: true }
    }
}

fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}

/// Counters describing the most recent parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Old subtrees pushed whole, leaves included.
    pub reused_nodes: usize,
    pub reused_bytes: usize,
    /// Tokens produced by the lexer, not counting the end of input.
    pub lexed_tokens: usize,
    /// Peak number of live stack versions.
    pub max_versions: usize,
    pub steps: u64,
}

impl ParseStats {
    /// Share of the text covered by reused nodes.
    pub fn reuse_rate(&self, text_len: usize) -> f64 {
        if text_len == 0 { 0.0 } else { self.reused_bytes as f64 / text_len as f64 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_from_json() {
        let options: ParserOptions =
            serde_json::from_str(r#"{ "max_versions": 2, "timeout_ms": 15 }"#).unwrap();
        assert_eq!(
            options,
            ParserOptions {
                max_versions: 2,
                max_steps: None,
                timeout: Some(Duration::from_millis(15)),
                reuse: true,
            }
        );
        assert!(serde_json::from_str::<ParserOptions>(r#"{ "versions": 2 }"#).is_err());
    }
}
