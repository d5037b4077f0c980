// regex_cache.rs — Shared compile-once regex cache.
//
// Every pattern the engine matches with — "matches" param matchers, context
// regexes, and converted globs — is fetched from one cache keyed by the
// pattern source. Each source is resolved exactly once:
//
// - passes the safety screen and compiles      → compiled regex
// - passes the safety screen, fails to compile → substring containment
// - fails the safety screen                    → never matches
//
// The safety screen rejects sources longer than 500 characters and sources
// that apply a quantifier to a group that itself contains a quantifier
// (the classic catastrophic-backtracking shape; the regex crate is linear
// time, but such patterns are never what a policy author meant).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use regex::Regex;

/// Longest pattern source the safety screen accepts.
pub const MAX_PATTERN_LEN: usize = 500;

/// The resolved form of one pattern source.
#[derive(Debug, Clone)]
pub enum PatternMatcher {
    /// Compiled and cached; shared across every lookup of the same source.
    Regex(Arc<Regex>),
    /// Source was rejected by the regex engine; degrade to containment.
    Substring(String),
    /// Source was rejected by the safety screen; matches nothing.
    Never,
}

impl PatternMatcher {
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            PatternMatcher::Regex(re) => re.is_match(text),
            PatternMatcher::Substring(needle) => text.contains(needle.as_str()),
            PatternMatcher::Never => false,
        }
    }
}

/// Shared pattern cache, keyed by pattern source.
#[derive(Default)]
pub struct RegexCache {
    inner: Mutex<HashMap<String, PatternMatcher>>,
}

impl RegexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the matcher for a source, compiling on first sight.
    ///
    /// Rejections are cached too, so repeated lookups of a bad pattern are
    /// O(1) and warn only once.
    pub fn matcher(&self, pattern: &str) -> PatternMatcher {
        let mut map = self.inner.lock();
        if let Some(found) = map.get(pattern) {
            return found.clone();
        }
        let resolved = if !is_safe_pattern(pattern) {
            tracing::warn!(pattern, "unsafe pattern rejected; it will never match");
            PatternMatcher::Never
        } else {
            match Regex::new(pattern) {
                Ok(re) => PatternMatcher::Regex(Arc::new(re)),
                Err(err) => {
                    tracing::warn!(
                        pattern,
                        %err,
                        "pattern failed to compile; falling back to substring containment"
                    );
                    PatternMatcher::Substring(pattern.to_string())
                }
            }
        };
        map.insert(pattern.to_string(), resolved.clone());
        resolved
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Whether a pattern source passes the safety screen.
pub fn is_safe_pattern(pattern: &str) -> bool {
    pattern.len() <= MAX_PATTERN_LEN && !has_nested_quantifier(pattern)
}

/// Detect a quantifier applied to a group that contains a quantifier,
/// e.g. `(a+)*` or `(\d*){2,}`. Escapes and character classes are skipped.
fn has_nested_quantifier(pattern: &str) -> bool {
    let mut group_has_quantifier: Vec<bool> = Vec::new();
    let mut closed_quantified_group = false;
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
                closed_quantified_group = false;
            }
            '[' => {
                // Skip the character class body.
                for c2 in chars.by_ref() {
                    if c2 == ']' {
                        break;
                    }
                }
                closed_quantified_group = false;
            }
            '(' => {
                group_has_quantifier.push(false);
                closed_quantified_group = false;
            }
            ')' => {
                let had = group_has_quantifier.pop().unwrap_or(false);
                if had {
                    if let Some(parent) = group_has_quantifier.last_mut() {
                        *parent = true;
                    }
                }
                closed_quantified_group = had;
            }
            '*' | '+' | '{' => {
                if closed_quantified_group {
                    return true;
                }
                if let Some(top) = group_has_quantifier.last_mut() {
                    *top = true;
                }
                closed_quantified_group = false;
            }
            _ => closed_quantified_group = false,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiled_matchers_are_shared() {
        let cache = RegexCache::new();
        let a = cache.matcher("ab+c");
        let b = cache.matcher("ab+c");
        match (a, b) {
            (PatternMatcher::Regex(x), PatternMatcher::Regex(y)) => {
                assert!(Arc::ptr_eq(&x, &y), "same source must share one Regex");
            }
            other => panic!("expected compiled matchers, got {:?}", other),
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn nested_quantifiers_are_rejected() {
        assert!(!is_safe_pattern("(a+)*"));
        assert!(!is_safe_pattern("(a*)+"));
        assert!(!is_safe_pattern("(x|(y+))*"));
        assert!(!is_safe_pattern("(\\d+){2,}"));
    }

    #[test]
    fn plain_patterns_are_safe() {
        assert!(is_safe_pattern("a+b*c"));
        assert!(is_safe_pattern("(abc)+"));
        assert!(is_safe_pattern("^\\.env$"));
        assert!(is_safe_pattern("[a-z]+@[a-z]+"));
        // Quantifiers inside a class are literal.
        assert!(is_safe_pattern("([*+])+"));
    }

    #[test]
    fn oversized_pattern_is_rejected() {
        let big = "a".repeat(MAX_PATTERN_LEN + 1);
        assert!(!is_safe_pattern(&big));
        let cache = RegexCache::new();
        assert!(!cache.matcher(&big).is_match("aaa"));
    }

    #[test]
    fn unsafe_pattern_never_matches() {
        let cache = RegexCache::new();
        let m = cache.matcher("(a+)+");
        assert!(!m.is_match("aaaa"));
        assert!(matches!(m, PatternMatcher::Never));
    }

    #[test]
    fn uncompilable_pattern_degrades_to_substring() {
        let cache = RegexCache::new();
        // Unbalanced bracket passes the screen but the engine rejects it.
        let m = cache.matcher("[unclosed");
        assert!(matches!(m, PatternMatcher::Substring(_)));
        assert!(m.is_match("prefix [unclosed suffix"));
        assert!(!m.is_match("something else"));
    }

    #[test]
    fn rejections_are_cached() {
        let cache = RegexCache::new();
        cache.matcher("(a+)+");
        cache.matcher("(a+)+");
        assert_eq!(cache.len(), 1);
    }
}
