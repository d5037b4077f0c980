// compile.rs — Policy compiler and index.
//
// Turns the declared policy list (plus enabled built-in templates) into a
// scope-keyed lookup structure. Build happens off the hot path; the result
// is immutable — reload builds a fresh index and replaces the old one
// wholesale.
//
// Compilation walks every condition and pushes every pattern source into
// the shared regex cache, so the first evaluation never pays compile cost
// and invalid patterns are rejected (and warned about) exactly once.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::condition::{Condition, NameMatcher};
use crate::context::HookKind;
use crate::model::Policy;
use crate::regex_cache::RegexCache;
use ag_util::glob_to_regex;

/// Key for policies whose scope does not name agents.
const ANY_AGENT: &str = "*";

/// Immutable, scope-keyed policy lookup structure.
pub struct PolicyIndex {
    policies: Vec<Arc<Policy>>,
    by_hook: HashMap<HookKind, Vec<(usize, Arc<Policy>)>>,
    by_agent: HashMap<String, Vec<(usize, Arc<Policy>)>>,
    regexes: Arc<RegexCache>,
}

impl PolicyIndex {
    /// Build an index from declared policies and generated built-ins.
    ///
    /// Declared policies win id conflicts with built-ins. Policies with a
    /// blank or duplicate id are skipped with one warning each; the rest
    /// of the set still compiles.
    pub fn build(declared: Vec<Policy>, builtins: Vec<Policy>, regexes: Arc<RegexCache>) -> Self {
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut merged: Vec<Policy> = Vec::new();
        for policy in declared.into_iter().chain(builtins) {
            if policy.id.trim().is_empty() {
                tracing::warn!(name = %policy.name, "skipping policy with empty id");
                continue;
            }
            if !seen_ids.insert(policy.id.clone()) {
                tracing::warn!(id = %policy.id, "skipping policy with duplicate id");
                continue;
            }
            merged.push(policy);
        }

        for policy in &merged {
            for rule in &policy.rules {
                for condition in &rule.conditions {
                    precompile_condition(condition, &regexes);
                }
            }
        }

        let policies: Vec<Arc<Policy>> = merged.into_iter().map(Arc::new).collect();
        let mut by_hook: HashMap<HookKind, Vec<(usize, Arc<Policy>)>> = HashMap::new();
        let mut by_agent: HashMap<String, Vec<(usize, Arc<Policy>)>> = HashMap::new();

        for (order, policy) in policies.iter().enumerate() {
            if policy.scope.hooks.is_empty() {
                for hook in HookKind::ALL {
                    by_hook.entry(hook).or_default().push((order, policy.clone()));
                }
            } else {
                for hook in &policy.scope.hooks {
                    by_hook
                        .entry(*hook)
                        .or_default()
                        .push((order, policy.clone()));
                }
            }

            if policy.scope.agents.is_empty() {
                by_agent
                    .entry(ANY_AGENT.to_string())
                    .or_default()
                    .push((order, policy.clone()));
            } else {
                for agent in &policy.scope.agents {
                    by_agent
                        .entry(agent.clone())
                        .or_default()
                        .push((order, policy.clone()));
                }
            }
        }

        Self {
            policies,
            by_hook,
            by_agent,
            regexes,
        }
    }

    /// The effective candidate set for one evaluation: policies indexed
    /// under the hook, the agent id, or the any-agent bucket, de-duplicated,
    /// in declaration order. Scope filtering happens in the evaluator.
    pub fn candidates(&self, hook: HookKind, agent_id: &str) -> Vec<(usize, Arc<Policy>)> {
        let mut seen: HashSet<usize> = HashSet::new();
        let mut out: Vec<(usize, Arc<Policy>)> = Vec::new();
        let buckets = [
            self.by_hook.get(&hook),
            self.by_agent.get(agent_id),
            self.by_agent.get(ANY_AGENT),
        ];
        for bucket in buckets.into_iter().flatten() {
            for (order, policy) in bucket {
                if seen.insert(*order) {
                    out.push((*order, policy.clone()));
                }
            }
        }
        out.sort_by_key(|(order, _)| *order);
        out
    }

    /// Number of policies that survived compilation.
    pub fn policy_count(&self) -> usize {
        self.policies.len()
    }

    /// Every compiled policy, in declaration order.
    pub fn policies(&self) -> &[Arc<Policy>] {
        &self.policies
    }

    /// The shared pattern cache the index was compiled against.
    pub fn regexes(&self) -> &Arc<RegexCache> {
        &self.regexes
    }
}

/// Push every pattern source a condition carries into the cache.
fn precompile_condition(condition: &Condition, cache: &RegexCache) {
    match condition {
        Condition::Tool { name, params } => {
            precompile_name_matcher(name.as_ref(), cache);
            for matcher in params.values() {
                if let Some(source) = &matcher.matches {
                    cache.matcher(source);
                }
            }
        }
        Condition::Agent { id, .. } => {
            precompile_name_matcher(id.as_ref(), cache);
        }
        Condition::Context {
            history_matches,
            message_matches,
            session_key,
            ..
        } => {
            if let Some(source) = history_matches {
                cache.matcher(source);
            }
            if let Some(source) = message_matches {
                cache.matcher(source);
            }
            if let Some(pattern) = session_key {
                if pattern.contains('*') {
                    cache.matcher(&glob_to_regex(pattern));
                }
            }
        }
        Condition::Any { conditions } => {
            for inner in conditions {
                precompile_condition(inner, cache);
            }
        }
        Condition::Not { condition } => precompile_condition(condition, cache),
        Condition::Time { .. } | Condition::Risk { .. } | Condition::Frequency { .. } => {}
    }
}

fn precompile_name_matcher(matcher: Option<&NameMatcher>, cache: &RegexCache) {
    let patterns: &[String] = match matcher {
        Some(NameMatcher::One(p)) => std::slice::from_ref(p),
        Some(NameMatcher::Many(ps)) => ps,
        None => return,
    };
    for pattern in patterns {
        if pattern.contains('*') {
            cache.matcher(&glob_to_regex(pattern));
        }
    }
}
