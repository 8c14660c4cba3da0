use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Static tables driving directive handling: which keywords get an
/// automatic closing directive, and which follow-up keywords chain onto a
/// directive at the same indentation instead of becoming its sibling.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DirectiveRules {
    pub closers: BTreeMap<String, String>,
    pub chains: BTreeMap<String, Vec<String>>,
}

impl Default for DirectiveRules {
    fn default() -> Self {
        let closers = [
            ("for", "endfor"),
            ("if", "endif"),
            ("ifchanged", "endifchanged"),
            ("ifequal", "endifequal"),
            ("ifnotequal", "endifnotequal"),
            ("block", "endblock"),
            ("filter", "endfilter"),
            ("autoescape", "endautoescape"),
            ("with", "endwith"),
            ("blocktrans", "endblocktrans"),
            ("spaceless", "endspaceless"),
            ("comment", "endcomment"),
            ("cache", "endcache"),
            ("localize", "endlocalize"),
            ("compress", "endcompress"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let chains = [
            ("if", &["else", "elif"][..]),
            ("ifchanged", &["else"][..]),
            ("ifequal", &["else"][..]),
            ("ifnotequal", &["else"][..]),
            ("for", &["empty"][..]),
            ("with", &["with"][..]),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
        .collect();

        Self { closers, chains }
    }
}

impl DirectiveRules {
    pub fn closer_for(&self, keyword: &str) -> Option<&str> {
        self.closers.get(keyword).map(|s| s.as_str())
    }

    pub fn is_closer(&self, keyword: &str) -> bool {
        self.closers.values().any(|c| c == keyword)
    }

    /// Whether `follower` at the same indentation belongs inside `keyword`.
    pub fn chains(&self, keyword: &str, follower: &str) -> bool {
        self.chains
            .get(keyword)
            .is_some_and(|allowed| allowed.iter().any(|a| a == follower))
    }
}
