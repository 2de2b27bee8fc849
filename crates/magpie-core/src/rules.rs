//! Trigger response rules and their stored form.
//!
//! A rule persists as a `(chance, cooldown, kind, content)` tuple so the
//! store stays readable as plain JSON arrays.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What a triggered rule sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    Text,
    Sticker,
    Gif,
}

impl ResponseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseKind::Text => "text",
            ResponseKind::Sticker => "sticker",
            ResponseKind::Gif => "gif",
        }
    }
}

impl FromStr for ResponseKind {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ResponseKind::Text),
            "sticker" => Ok(ResponseKind::Sticker),
            "gif" => Ok(ResponseKind::Gif),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cooldown identity. Rules sharing kind and content share one window.
pub type Signature = (ResponseKind, String);

/// A trigger response: sent with probability `chance`, then muted for
/// `cooldown` seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RuleTuple", into = "RuleTuple")]
pub struct ResponseRule {
    pub chance: f64,
    pub cooldown: u64,
    pub kind: ResponseKind,
    pub content: String,
}

type RuleTuple = (f64, u64, String, String);

impl TryFrom<RuleTuple> for ResponseRule {
    type Error = String;

    fn try_from((chance, cooldown, kind, content): RuleTuple) -> std::result::Result<Self, String> {
        let kind = kind
            .parse()
            .map_err(|_| format!("unknown response kind {kind:?}"))?;
        Ok(ResponseRule {
            chance,
            cooldown,
            kind,
            content,
        })
    }
}

impl From<ResponseRule> for RuleTuple {
    fn from(rule: ResponseRule) -> Self {
        (
            rule.chance,
            rule.cooldown,
            rule.kind.as_str().to_string(),
            rule.content,
        )
    }
}

impl ResponseRule {
    pub fn signature(&self) -> Signature {
        (self.kind, self.content.clone())
    }
}

/// Renders a rule collection for the listing commands, one entry per line.
pub fn format_rule_listing(rules: &BTreeMap<String, ResponseRule>) -> String {
    if rules.is_empty() {
        return "{}".to_string();
    }
    let mut out = String::new();
    for (key, rule) in rules {
        out.push_str(&format!(
            "{}: ({}, {}, {}, {})\n",
            key, rule.chance, rule.cooldown, rule.kind, rule.content
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_round_trips_as_tuple() {
        let rule = ResponseRule {
            chance: 0.5,
            cooldown: 60,
            kind: ResponseKind::Sticker,
            content: "CAADBQAD".to_string(),
        };
        let json = serde_json::to_string(&rule).unwrap();
        assert_eq!(json, r#"[0.5,60,"sticker","CAADBQAD"]"#);
        let back: ResponseRule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn kind_parse_is_case_insensitive() {
        assert_eq!("TEXT".parse::<ResponseKind>(), Ok(ResponseKind::Text));
        assert_eq!("Gif".parse::<ResponseKind>(), Ok(ResponseKind::Gif));
        assert!("video".parse::<ResponseKind>().is_err());
    }

    #[test]
    fn unknown_kind_fails_decoding() {
        let err = serde_json::from_str::<ResponseRule>(r#"[1.0,0,"video","x"]"#);
        assert!(err.is_err());
    }

    #[test]
    fn listing_is_one_line_per_rule() {
        let mut rules = BTreeMap::new();
        rules.insert(
            "hello".to_string(),
            ResponseRule {
                chance: 1.0,
                cooldown: 0,
                kind: ResponseKind::Text,
                content: "hi".to_string(),
            },
        );
        let listing = format_rule_listing(&rules);
        assert_eq!(listing, "hello: (1, 0, text, hi)\n");
        assert_eq!(format_rule_listing(&BTreeMap::new()), "{}");
    }
}
