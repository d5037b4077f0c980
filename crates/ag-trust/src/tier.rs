// tier.rs — The five trust tiers.
//
// Tiers are a coarse banding of the numeric score so policy rules can gate
// on "trusted or better" without caring about exact numbers. The variant
// order is the total order rules compare with.

use serde::{Deserialize, Serialize};

/// Trust tier bands, ascending. Derived from the score unless locked.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum TrustTier {
    /// Score below 20 — new or repeatedly violating agents.
    #[default]
    Untrusted,
    /// Score 20–39.
    Restricted,
    /// Score 40–59.
    Standard,
    /// Score 60–79.
    Trusted,
    /// Score 80 and above.
    Privileged,
}

impl TrustTier {
    /// Band a score into a tier. Pure function of the score.
    pub fn from_score(score: i64) -> Self {
        if score >= 80 {
            TrustTier::Privileged
        } else if score >= 60 {
            TrustTier::Trusted
        } else if score >= 40 {
            TrustTier::Standard
        } else if score >= 20 {
            TrustTier::Restricted
        } else {
            TrustTier::Untrusted
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrustTier::Untrusted => "untrusted",
            TrustTier::Restricted => "restricted",
            TrustTier::Standard => "standard",
            TrustTier::Trusted => "trusted",
            TrustTier::Privileged => "privileged",
        }
    }
}

impl std::fmt::Display for TrustTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
