//! # Tag matching for logic definitions.
//!
//! [`TagPattern`] decides whether an event's tag belongs to a logic
//! definition's match set (or cancel set). Matching is a pure function of the
//! pattern and the tag: no state, no side effects, evaluated on every
//! incoming event.
//!
//! ## Variants
//! - `Exact`: equality on the tag string
//! - `Wildcard`: matches every tag (the `"*"` literal)
//! - `Any`: ordered collection; matches if **any** element matches (recursive)
//! - `Regex`: matches via [`regex::Regex::is_match`]
//!
//! An absent pattern (`Option::None` at the call site) matches nothing.
//!
//! ## Example
//! ```rust
//! use logicvisor::TagPattern;
//!
//! let p = TagPattern::from(vec![
//!     TagPattern::from("FETCH"),
//!     TagPattern::Regex(regex::Regex::new("^POLL_").unwrap()),
//! ]);
//! assert!(p.matches("FETCH"));
//! assert!(p.matches("POLL_USERS"));
//! assert!(!p.matches("RESET"));
//! ```

use regex::Regex;

/// Pattern matched against event tags.
#[derive(Debug, Clone)]
pub enum TagPattern {
    /// Matches a single tag by equality.
    Exact(String),
    /// Matches every tag.
    Wildcard,
    /// Matches if any element matches.
    Any(Vec<TagPattern>),
    /// Matches tags accepted by the regular expression.
    Regex(Regex),
}

impl TagPattern {
    /// Returns true when `tag` belongs to this pattern's match set.
    pub fn matches(&self, tag: &str) -> bool {
        match self {
            TagPattern::Exact(t) => t == tag,
            TagPattern::Wildcard => true,
            TagPattern::Any(patterns) => patterns.iter().any(|p| p.matches(tag)),
            TagPattern::Regex(re) => re.is_match(tag),
        }
    }
}

impl From<&str> for TagPattern {
    /// `"*"` becomes [`TagPattern::Wildcard`]; anything else is exact.
    fn from(tag: &str) -> Self {
        if tag == "*" {
            TagPattern::Wildcard
        } else {
            TagPattern::Exact(tag.to_string())
        }
    }
}

impl From<String> for TagPattern {
    fn from(tag: String) -> Self {
        TagPattern::from(tag.as_str())
    }
}

impl From<Vec<TagPattern>> for TagPattern {
    fn from(patterns: Vec<TagPattern>) -> Self {
        TagPattern::Any(patterns)
    }
}

impl From<Regex> for TagPattern {
    fn from(re: Regex) -> Self {
        TagPattern::Regex(re)
    }
}
