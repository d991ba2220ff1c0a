//! Company purchase policy gate.
//!
//! Pure classification: the gate never mutates a candidate, it only
//! decides whether manual approval is required and why. The price rule is
//! evaluated before the restricted-term rule; the first failing rule wins.

use serde::{Deserialize, Serialize};

use crate::domain::product::Product;

/// Hard price ceiling for auto-approved purchases, in dollars.
pub const PRICE_CEILING: f64 = 500.0;

/// Terms that always require manual approval wherever they appear in a
/// title or description.
pub const RESTRICTED_TERMS: &[&str] = &["gaming", "luxury"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyVerdict {
    pub passes: bool,
    pub reason: String,
}

impl PolicyVerdict {
    fn pass() -> Self {
        Self { passes: true, reason: String::new() }
    }

    fn reject(reason: String) -> Self {
        Self { passes: false, reason }
    }
}

pub trait PolicyEngine: Send + Sync {
    fn evaluate(&self, candidate: &Product) -> PolicyVerdict;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CompanyPolicyEngine;

impl PolicyEngine for CompanyPolicyEngine {
    fn evaluate(&self, candidate: &Product) -> PolicyVerdict {
        evaluate_candidate(candidate)
    }
}

pub fn evaluate_candidate(candidate: &Product) -> PolicyVerdict {
    if candidate.price > PRICE_CEILING {
        return PolicyVerdict::reject(format!(
            "Price exceeds company policy limit (${PRICE_CEILING:.0})."
        ));
    }

    let title = candidate.title.to_lowercase();
    let description = candidate.description.to_lowercase();
    for term in RESTRICTED_TERMS {
        if title.contains(term) || description.contains(term) {
            return PolicyVerdict::reject(format!(
                "Product rejected due to restricted term: '{term}'."
            ));
        }
    }

    PolicyVerdict::pass()
}
