//! Typed identifier allow-list rules and their matching semantics.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// One allow-list rule for classifying an identifier (an IMEI in practice).
///
/// The serde representation mirrors the stored JSON objects, e.g.
/// `{"type": "prefix", "prefix": "3527"}` or
/// `{"type": "range", "start": "35000000000000", "end": "35999999999999"}`.
///
/// `Range` bounds compare as strings, byte-wise. That is only meaningful when
/// every identifier has the same length, which holds for 14/15-digit IMEIs;
/// `"100" < "9"` lexicographically, so mixed-length bounds behave oddly.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AccessRule {
    Prefix { prefix: String },
    Range { start: String, end: String },
    Regex { pattern: String },
    Exact { imeis: Vec<String> },
}

impl AccessRule {
    /// Does `identifier` satisfy this rule?
    ///
    /// Regex patterns are anchored at position 0 (the match must begin at the
    /// start of the identifier, but need not cover all of it). A pattern that
    /// fails to compile matches nothing; bad configuration must never widen
    /// access.
    pub fn matches(&self, identifier: &str) -> bool {
        match self {
            AccessRule::Prefix { prefix } => identifier.starts_with(prefix.as_str()),
            AccessRule::Range { start, end } => {
                start.as_str() <= identifier && identifier <= end.as_str()
            }
            AccessRule::Regex { pattern } => match regex::Regex::new(pattern) {
                Ok(re) => re.find(identifier).is_some_and(|m| m.start() == 0),
                Err(err) => {
                    warn!(%pattern, %err, "unparseable regex rule treated as non-matching");
                    false
                }
            },
            AccessRule::Exact { imeis } => imeis.iter().any(|imei| imei == identifier),
        }
    }
}

/// Evaluate a rule list in order; the first matching rule wins.
///
/// Order dependence is part of the contract: audit records name the matched
/// rule, so "best match" re-ordering would silently change what gets logged.
pub fn first_match<'a>(rules: &'a [AccessRule], identifier: &str) -> Option<&'a AccessRule> {
    rules.iter().find(|rule| rule.matches(identifier))
}

/// Decode a stored JSON rule array, dropping elements that do not parse.
///
/// An unrecognized rule kind or malformed object is skipped with a warning
/// rather than surfaced as an error: a skipped rule can only narrow access,
/// never widen it.
pub fn parse_rules(value: &Value) -> Vec<AccessRule> {
    let Some(items) = value.as_array() else {
        if !value.is_null() {
            warn!("allowed ranges column is not a JSON array; ignoring");
        }
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(rule) => Some(rule),
            Err(err) => {
                warn!(%err, "skipping unparseable access rule");
                None
            }
        })
        .collect()
}
