// pattern.rs — Glob-to-regex conversion.
//
// Policy matchers use a single wildcard dialect: `*` matches any run of
// characters (including separators), everything else is literal. Converting
// to an anchored regex lets globs share the policy index's regex cache
// instead of carrying a second pattern engine.

/// Convert a `*`-glob into an anchored regex source string.
///
/// `*` becomes `.*`; every other regex metacharacter is escaped. The result
/// is anchored at both ends, so `exec*` matches `exec` and `exec_raw` but
/// not `unsafe_exec`.
pub fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '.' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '^' | '$' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn matches(glob: &str, text: &str) -> bool {
        Regex::new(&glob_to_regex(glob)).unwrap().is_match(text)
    }

    #[test]
    fn literal_pattern_is_exact() {
        assert!(matches("exec", "exec"));
        assert!(!matches("exec", "exec_raw"));
        assert!(!matches("exec", "unsafe_exec"));
    }

    #[test]
    fn star_matches_any_run() {
        assert!(matches("memory_*", "memory_get"));
        assert!(matches("memory_*", "memory_"));
        assert!(!matches("memory_*", "memory"));
        assert!(matches("*", "anything at all"));
    }

    #[test]
    fn star_crosses_separators() {
        assert!(matches("agent:*", "agent:main:subagent:forge"));
    }

    #[test]
    fn metacharacters_are_literal() {
        assert!(matches("a.b", "a.b"));
        assert!(!matches("a.b", "axb"));
        assert!(matches("f(x)+[y]", "f(x)+[y]"));
        assert!(matches("cost{1}", "cost{1}"));
    }

    #[test]
    fn anchored_at_both_ends() {
        assert_eq!(glob_to_regex("web_*"), "^web_.*$");
    }
}
