//! Resource and action pattern matching
//!
//! Patterns are compiled once into [`ResourcePattern`] and [`ActionPattern`]
//! and then matched without allocating. A pattern that cannot be interpreted
//! matches nothing, so a malformed permission never widens access.

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Wildcard token accepted by both resource and action patterns
pub const WILDCARD: &str = "*";

/// Separator between alternatives in an action pattern (`GET|POST`)
const ACTION_SEPARATOR: char = '|';

/// Closed set of verbs an action pattern may name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("GET") {
            Ok(Verb::Get)
        } else if s.eq_ignore_ascii_case("POST") {
            Ok(Verb::Post)
        } else if s.eq_ignore_ascii_case("PUT") {
            Ok(Verb::Put)
        } else if s.eq_ignore_ascii_case("DELETE") {
            Ok(Verb::Delete)
        } else {
            Err(())
        }
    }
}

/// Resource pattern compiled once, matched many times
///
/// `*` matches any run of characters, `/` included, and the pattern must
/// cover the whole path: `/admin/*` matches `/admin/users` and
/// `/admin/users/7` but not `/public/x`. Without `*` the comparison is an
/// exact, case-sensitive string match. An empty pattern, or one whose regex
/// fails to build, matches nothing.
#[derive(Debug, Clone)]
pub enum ResourcePattern {
    /// Bare `*`
    Any,
    /// No wildcard
    Exact(String),
    /// Anchored regex built from the literal segments between `*`s
    Glob(Regex),
    /// Matches no resource
    Nothing,
}

impl ResourcePattern {
    pub fn compile(pattern: &str) -> Self {
        if pattern.is_empty() {
            return ResourcePattern::Nothing;
        }
        if pattern == WILDCARD {
            return ResourcePattern::Any;
        }
        if !pattern.contains('*') {
            return ResourcePattern::Exact(pattern.to_string());
        }

        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");

        match Regex::new(&format!("(?s)^{}$", body)) {
            Ok(regex) => ResourcePattern::Glob(regex),
            Err(e) => {
                warn!("Resource pattern '{}' rejected, it matches nothing: {}", pattern, e);
                ResourcePattern::Nothing
            }
        }
    }

    pub fn matches(&self, actual: &str) -> bool {
        match self {
            ResourcePattern::Any => true,
            ResourcePattern::Exact(expected) => actual == expected,
            ResourcePattern::Glob(regex) => regex.is_match(actual),
            ResourcePattern::Nothing => false,
        }
    }
}

/// Action pattern compiled once, matched many times
///
/// The pattern is `*`, a verb from [`Verb`], or several of those joined by
/// `|`. Verbs compare case-insensitively. If any alternative is not
/// recognized the whole pattern matches nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionPattern {
    Any,
    Verbs(Vec<Verb>),
    Nothing,
}

impl ActionPattern {
    pub fn compile(pattern: &str) -> Self {
        let mut any = false;
        let mut verbs = Vec::new();

        for alternative in pattern.split(ACTION_SEPARATOR) {
            if alternative == WILDCARD {
                any = true;
            } else if let Ok(verb) = alternative.parse::<Verb>() {
                verbs.push(verb);
            } else {
                return ActionPattern::Nothing;
            }
        }

        if any {
            ActionPattern::Any
        } else {
            ActionPattern::Verbs(verbs)
        }
    }

    pub fn matches(&self, actual: &str) -> bool {
        match self {
            ActionPattern::Any => true,
            ActionPattern::Verbs(verbs) => actual
                .parse::<Verb>()
                .map(|verb| verbs.contains(&verb))
                .unwrap_or(false),
            ActionPattern::Nothing => false,
        }
    }
}

/// Match a concrete resource path against a resource pattern
///
/// Compiles the pattern on every call; hot paths keep a [`ResourcePattern`].
pub fn match_resource(actual: &str, pattern: &str) -> bool {
    ResourcePattern::compile(pattern).matches(actual)
}

/// Match a concrete action against an action pattern
pub fn match_action(actual: &str, pattern: &str) -> bool {
    ActionPattern::compile(pattern).matches(actual)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_exact() {
        assert!(match_resource("/admin/users", "/admin/users"));
        assert!(!match_resource("/admin/Users", "/admin/users"));
        assert!(!match_resource("/admin/users/1", "/admin/users"));
    }

    #[test]
    fn test_resource_trailing_wildcard() {
        assert!(match_resource("/admin/users", "/admin/*"));
        assert!(match_resource("/admin/users/7/edit", "/admin/*"));
        assert!(match_resource("/admin/", "/admin/*"));
        assert!(!match_resource("/public/x", "/admin/*"));
        assert!(!match_resource("/admin", "/admin/*"));
    }

    #[test]
    fn test_resource_inner_wildcard() {
        assert!(match_resource("/docs/42/edit", "/docs/*/edit"));
        assert!(!match_resource("/docs/42/view", "/docs/*/edit"));
        assert!(match_resource("/a/b/c/d", "/a/*/d"));
        assert!(match_resource("/api/v1/users.json", "/api/*/*.json"));
        assert!(!match_resource("/api/v1/users.xml", "/api/*/*.json"));
    }

    #[test]
    fn test_resource_universal_and_empty() {
        assert!(match_resource("/anything/at/all", "*"));
        assert!(match_resource("", "*"));
        assert!(!match_resource("", ""));
        assert!(!match_resource("/x", ""));
    }

    #[test]
    fn test_action_tokens() {
        assert!(match_action("GET", "GET"));
        assert!(match_action("get", "GET"));
        assert!(match_action("Delete", "delete"));
        assert!(!match_action("POST", "GET"));
        assert!(match_action("PATCH", "*"));
    }

    #[test]
    fn test_action_alternatives() {
        assert!(match_action("POST", "GET|POST"));
        assert!(match_action("get", "GET|POST"));
        assert!(!match_action("PUT", "GET|POST"));
        assert!(match_action("PUT", "GET|*"));
    }

    #[test]
    fn test_action_unrecognized_pattern_fails_closed() {
        assert!(!match_action("GET", ""));
        assert!(!match_action("GET", "(GET)|(POST)"));
        assert!(!match_action("GET", "GET|FETCH"));
        assert!(!match_action("PATCH", "PATCH"));
        assert!(!match_action("GET", " GET"));
    }

    #[test]
    fn test_resource_regex_metacharacters_are_literal() {
        assert!(match_resource("/files/a.b", "/files/*.b"));
        assert!(!match_resource("/files/axb", "/files/a.*"));
        assert!(match_resource("/files/a.txt", "/files/a.*"));
        assert!(match_resource("/q?x=(1)", "/q?x=*"));
        assert!(!match_resource("/qx=1", "/q?x=*"));
        assert!(match_resource("/a+b/[c]", "/a+b/*"));
        assert!(match_resource("/line\nbreak", "/line*"));
        assert!(match_resource("/line\nbreak", "*break"));
    }

    #[test]
    fn test_compiled_patterns() {
        assert!(matches!(ResourcePattern::compile("*"), ResourcePattern::Any));
        assert!(matches!(ResourcePattern::compile(""), ResourcePattern::Nothing));
        assert!(matches!(ResourcePattern::compile("/x"), ResourcePattern::Exact(_)));

        let glob = ResourcePattern::compile("/docs/*/edit");
        assert!(matches!(glob, ResourcePattern::Glob(_)));
        assert!(glob.matches("/docs/1/edit"));
        assert!(!glob.matches("/docs/1/edit/2"));

        assert_eq!(ActionPattern::compile("GET|*"), ActionPattern::Any);
        assert_eq!(
            ActionPattern::compile("get|Post"),
            ActionPattern::Verbs(vec![Verb::Get, Verb::Post])
        );
        assert_eq!(ActionPattern::compile("GET|*|FETCH"), ActionPattern::Nothing);
        assert!(!ActionPattern::Nothing.matches("GET"));
    }

    #[test]
    fn test_verb_roundtrip_display() {
        for verb in [Verb::Get, Verb::Post, Verb::Put, Verb::Delete] {
            assert_eq!(verb.to_string().parse::<Verb>(), Ok(verb));
        }
    }
}
