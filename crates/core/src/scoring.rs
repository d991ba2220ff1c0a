//! Candidate scoring and ranking.
//!
//! Scores are additive points against the conversation context: a
//! budget-fit term that decays linearly with price deviation, plus fixed
//! bonuses for purpose and brand keyword matches.

use crate::domain::product::{Product, ScoredCandidate};
use crate::domain::session::PurchaseContext;

/// Maximum points awarded for an exact budget match.
pub const BUDGET_FIT_POINTS: f64 = 10.0;
/// Bonus when the purpose appears in the candidate description.
pub const PURPOSE_DESCRIPTION_POINTS: f64 = 5.0;
/// Additional bonus when the purpose also appears in the title.
pub const PURPOSE_TITLE_POINTS: f64 = 2.0;
/// Bonus when the preferred brand appears in the title.
pub const BRAND_TITLE_POINTS: f64 = 5.0;

/// Number of ranked candidates surfaced to the user.
pub const MAX_PRESENTED: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct ScoreCalculator;

impl ScoreCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Budget-fit term: linear decay from [`BUDGET_FIT_POINTS`] at an
    /// exact price match down to zero once the deviation equals the
    /// budget itself. Never negative.
    pub fn budget_fit_score(&self, budget: f64, price: f64) -> f64 {
        if budget <= 0.0 {
            return 0.0;
        }
        let deviation = (budget - price).abs();
        (BUDGET_FIT_POINTS - (deviation / budget) * BUDGET_FIT_POINTS).max(0.0)
    }

    pub fn score_candidate(&self, product: &Product, context: &PurchaseContext) -> f64 {
        let mut score = 0.0;

        if let Some(budget) = context.budget {
            score += self.budget_fit_score(budget, product.price);
        }

        if let Some(purpose) = context.purpose.as_deref() {
            let purpose = purpose.to_lowercase();
            if !purpose.is_empty() {
                if product.description.to_lowercase().contains(&purpose) {
                    score += PURPOSE_DESCRIPTION_POINTS;
                }
                if product.title.to_lowercase().contains(&purpose) {
                    score += PURPOSE_TITLE_POINTS;
                }
            }
        }

        if let Some(brand) = context.brand.as_deref() {
            let brand = brand.to_lowercase();
            if !brand.is_empty() && product.title.to_lowercase().contains(&brand) {
                score += BRAND_TITLE_POINTS;
            }
        }

        score
    }

    /// Attach scores, order best-first, and keep the presentation bound.
    /// The sort is stable, so equal scores keep their arrival order and
    /// the first-encountered candidate wins ties.
    pub fn rank(&self, candidates: Vec<Product>, context: &PurchaseContext) -> Vec<ScoredCandidate> {
        let mut scored = candidates
            .into_iter()
            .map(|product| {
                let match_score = self.score_candidate(&product, context);
                ScoredCandidate { product, match_score }
            })
            .collect::<Vec<_>>();

        scored.sort_by(|a, b| {
            b.match_score.partial_cmp(&a.match_score).unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(MAX_PRESENTED);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::{ScoreCalculator, BUDGET_FIT_POINTS, MAX_PRESENTED};
    use crate::domain::product::{Product, ProductId};
    use crate::domain::session::PurchaseContext;

    fn product(id: &str, title: &str, price: f64, description: &str) -> Product {
        Product {
            id: ProductId(id.to_owned()),
            title: title.to_owned(),
            price,
            description: description.to_owned(),
            availability: "In Stock".to_owned(),
            delivery_time: "3-5 days".to_owned(),
            category: "Laptops".to_owned(),
            link: "https://example.com/product/x".to_owned(),
        }
    }

    #[test]
    fn exact_budget_match_earns_full_points() {
        let calculator = ScoreCalculator::new();
        assert!((calculator.budget_fit_score(500.0, 500.0) - BUDGET_FIT_POINTS).abs() < 1e-9);
    }

    #[test]
    fn budget_fit_is_monotonically_non_increasing_in_deviation() {
        let calculator = ScoreCalculator::new();
        let budget = 400.0;
        let mut previous = f64::INFINITY;

        // Prices ordered by increasing |budget - price|.
        for price in [400.0, 380.0, 440.0, 300.0, 550.0, 200.0, 50.0, 0.0, 900.0] {
            let score = calculator.budget_fit_score(budget, price);
            assert!(score >= 0.0, "score must never be negative");
            assert!(score <= previous + 1e-9, "score must not increase with deviation");
            previous = score;
        }

        // Deviation equal to the budget (or beyond) bottoms out at zero.
        assert_eq!(calculator.budget_fit_score(400.0, 800.0), 0.0);
        assert_eq!(calculator.budget_fit_score(400.0, 0.0), 0.0);
    }

    #[test]
    fn purpose_matches_stack_description_and_title_bonuses() {
        let calculator = ScoreCalculator::new();
        let context = PurchaseContext {
            purpose: Some("Gaming".to_owned()),
            ..PurchaseContext::default()
        };

        let description_only = product("p1", "Desk 001", 0.0, "desk for gaming sessions");
        let both = product("p2", "Gaming Desk 001", 0.0, "desk for gaming sessions");

        assert_eq!(calculator.score_candidate(&description_only, &context), 5.0);
        assert_eq!(calculator.score_candidate(&both, &context), 7.0);
    }

    #[test]
    fn brand_match_adds_title_bonus() {
        let calculator = ScoreCalculator::new();
        let context =
            PurchaseContext { brand: Some("acme".to_owned()), ..PurchaseContext::default() };

        let branded = product("p1", "Acme Ultrabook", 0.0, "thin and light");
        assert_eq!(calculator.score_candidate(&branded, &context), 5.0);
    }

    #[test]
    fn rank_orders_best_first_and_keeps_presentation_bound() {
        let calculator = ScoreCalculator::new();
        let context = PurchaseContext { budget: Some(100.0), ..PurchaseContext::default() };

        let candidates = vec![
            product("p1", "A", 50.0, ""),
            product("p2", "B", 100.0, ""),
            product("p3", "C", 90.0, ""),
            product("p4", "D", 10.0, ""),
        ];

        let ranked = calculator.rank(candidates, &context);
        assert_eq!(ranked.len(), MAX_PRESENTED);
        assert_eq!(ranked[0].product.id.0, "p2");
        assert_eq!(ranked[1].product.id.0, "p3");
        assert!(ranked[0].match_score >= ranked[1].match_score);
    }

    #[test]
    fn ties_are_broken_by_arrival_order() {
        let calculator = ScoreCalculator::new();
        let context = PurchaseContext { budget: Some(100.0), ..PurchaseContext::default() };

        let candidates =
            vec![product("first", "A", 90.0, ""), product("second", "B", 110.0, "")];

        let ranked = calculator.rank(candidates, &context);
        assert_eq!(ranked[0].product.id.0, "first");
    }
}
