//! # ag-policy
//!
//! The policy half of the governance engine: the declarative policy model,
//! a condition kernel with a closed set of condition kinds, a compiler that
//! turns policies into a scope-keyed index with a shared regex cache, a
//! five-factor risk assessor, a bounded frequency counter, and the
//! evaluator that aggregates rule effects under deny-wins.
//!
//! ## Key invariants
//!
//! - **Deny wins**: one matching deny rule denies the action regardless of
//!   any allow or audit matches.
//! - **Immutable index**: a built [`PolicyIndex`] is never mutated; reload
//!   replaces it wholesale.
//! - **Fail-closed matching**: a pattern rejected by the safety validator
//!   never matches anything; a missing context field referenced by a
//!   condition evaluates to false, never to an error.

pub mod builtin;
pub mod compile;
pub mod condition;
pub mod context;
pub mod error;
pub mod eval;
pub mod frequency;
pub mod model;
pub mod regex_cache;
pub mod risk;

pub use builtin::{builtin_policies, BuiltinToggles};
pub use compile::PolicyIndex;
pub use condition::{Condition, ConditionDeps, NameMatcher, ParamMatcher};
pub use context::{EvaluationContext, HookKind};
pub use error::PolicyError;
pub use eval::{evaluate_policies, Decision, EvaluationOutcome, RuleMatch};
pub use frequency::{FrequencyCounter, FrequencyScope};
pub use model::{
    policies_from_yaml, Effect, EscalationFallback, Policy, PolicyScope, Rule, TimeWindow,
};
pub use regex_cache::{PatternMatcher, RegexCache};
pub use risk::{RiskAssessment, RiskAssessor, RiskLevel};
