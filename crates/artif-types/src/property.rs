//! Property filters and fetched property sets

use crate::TypeError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Characters the repository rejects in property keys and values
pub const DISALLOWED_PROPERTY_CHARS: &[char] = &[
    '(', ')', '{', '}', '[', ']', '*', '+', '^', '$', '\\', '/', '~', '`', '!', '@', '#', '%',
    '&', '<', '>', ';', ',', ' ',
];

/// Format a key/value pair as a `key=value` token
pub fn format_token(key: &str, value: &str) -> String {
    format!("{}={}", key, value)
}

/// Return an error naming the first disallowed character in `text`
pub fn check_property_text(text: &str) -> Result<(), TypeError> {
    match text.chars().find(|c| DISALLOWED_PROPERTY_CHARS.contains(c)) {
        Some(ch) => Err(TypeError::DisallowedCharacter {
            text: text.to_string(),
            ch,
        }),
        None => Ok(()),
    }
}

/// Required key/value pairs; an artifact qualifies only if it carries all of them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyFilter(BTreeMap<String, String>);

impl PropertyFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `key=value` tokens; blank tokens are skipped
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self, TypeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::new();
        for token in tokens {
            let token = token.as_ref().trim();
            if token.is_empty() {
                continue;
            }
            let (key, value) = token
                .split_once('=')
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| TypeError::InvalidPropertyToken(token.to_string()))?;
            filter.insert(key, value);
        }
        Ok(filter)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    /// `key=value` tokens in key order
    pub fn to_tokens(&self) -> Vec<String> {
        self.0.iter().map(|(k, v)| format_token(k, v)).collect()
    }

    /// Number of required tokens present in `props`
    pub fn matched_count(&self, props: &Properties) -> usize {
        let available = props.tokens();
        self.to_tokens()
            .iter()
            .filter(|token| available.contains(*token))
            .count()
    }

    pub fn is_satisfied_by(&self, props: &Properties) -> bool {
        self.matched_count(props) == self.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertyFilter {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<BTreeMap<String, String>> for PropertyFilter {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

/// Properties attached to one artifact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(BTreeMap<String, String>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `properties` object of a repository response
    pub fn from_json_map(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        Self(
            map.iter()
                .map(|(k, v)| (k.clone(), decode_property_value(v)))
                .collect(),
        )
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    /// Keep only the listed keys
    pub fn retain_keys(&mut self, keys: &[String]) {
        self.0.retain(|k, _| keys.iter().any(|wanted| wanted == k));
    }

    pub fn tokens(&self) -> BTreeSet<String> {
        self.0.iter().map(|(k, v)| format_token(k, v)).collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Coerce one property value to a string
///
/// Single-element arrays unwrap, longer arrays join with `,`, empty arrays
/// become `""`. Strings are used as-is and other scalars use their JSON text.
pub fn decode_property_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Array(items) => items
            .iter()
            .map(decode_property_value)
            .collect::<Vec<_>>()
            .join(","),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_rule() {
        assert_eq!(decode_property_value(&json!(["stable"])), "stable");
        assert_eq!(decode_property_value(&json!(["a", "b"])), "a,b");
        assert_eq!(decode_property_value(&json!([])), "");
        assert_eq!(decode_property_value(&json!("prod")), "prod");
        assert_eq!(decode_property_value(&json!(3)), "3");
        assert_eq!(decode_property_value(&json!(true)), "true");
    }

    #[test]
    fn test_filter_requires_all_pairs() {
        let filter: PropertyFilter = [("release", "stable"), ("channel", "prod")]
            .into_iter()
            .collect();

        let partial: Properties = [("release", "stable")].into_iter().collect();
        let full: Properties = [("release", "stable"), ("channel", "prod"), ("os", "win")]
            .into_iter()
            .collect();

        assert_eq!(filter.matched_count(&partial), 1);
        assert!(!filter.is_satisfied_by(&partial));
        assert_eq!(filter.matched_count(&full), 2);
        assert!(filter.is_satisfied_by(&full));
    }

    #[test]
    fn test_from_tokens() {
        let filter = PropertyFilter::from_tokens(["release=stable", "", "channel=prod"]).unwrap();
        assert_eq!(filter.to_tokens(), vec!["channel=prod", "release=stable"]);

        assert_eq!(
            PropertyFilter::from_tokens(["release"]),
            Err(TypeError::InvalidPropertyToken("release".to_string()))
        );
        assert!(PropertyFilter::from_tokens(["=x"]).is_err());
    }

    #[test]
    fn test_check_property_text() {
        assert!(check_property_text("release").is_ok());
        assert!(check_property_text("win-22_a.b").is_ok());
        assert_eq!(
            check_property_text("bad key"),
            Err(TypeError::DisallowedCharacter {
                text: "bad key".to_string(),
                ch: ' '
            })
        );
        for ch in DISALLOWED_PROPERTY_CHARS {
            assert!(check_property_text(&format!("a{}b", ch)).is_err());
        }
    }
}
