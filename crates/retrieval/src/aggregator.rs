//! Merge local catalog matches with external lookup results.
//!
//! Hard failure-isolation boundary: whatever the external source does
//! (errors, timeouts, exhausted retries), `fetch_candidates` returns the
//! local results and never propagates the failure into the turn.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use procura_core::catalog::Catalog;
use procura_core::domain::product::{Product, ProductId};
use procura_core::domain::session::PurchaseContext;

use crate::external::ExternalSource;

pub struct CandidateAggregator {
    catalog: Catalog,
    external: Arc<dyn ExternalSource>,
}

impl CandidateAggregator {
    pub fn new(catalog: Catalog, external: Arc<dyn ExternalSource>) -> Self {
        Self { catalog, external }
    }

    /// Fetch the merged candidate set for a context whose item and budget
    /// are filled. No truncation happens here; ranking bounds the list
    /// only after scoring.
    pub async fn fetch_candidates(&self, context: &PurchaseContext) -> Vec<Product> {
        let (Some(item), Some(budget)) = (context.item.as_deref(), context.budget) else {
            return Vec::new();
        };

        // Urgency is advisory: when no delivery time matches the stated
        // preference, fall back to the unconstrained item/budget match.
        let mut local = self.catalog.search(item, budget, context.urgency.as_deref());
        if local.is_empty() && context.urgency.is_some() {
            local = self.catalog.search(item, budget, None);
        }

        let external = match self.external.search(item, budget).await {
            Ok(products) => products,
            Err(error) => {
                warn!(
                    event_name = "aggregator.external_degraded",
                    item,
                    error = %error,
                    "external lookup failed, continuing with local catalog only"
                );
                Vec::new()
            }
        };

        debug!(
            event_name = "aggregator.sources_merged",
            local_count = local.len(),
            external_count = external.len(),
            "candidate sources merged"
        );

        merge_candidates(local, external)
    }
}

/// De-dup key: lowercase whitespace-normalized title plus price in whole
/// cents. First occurrence wins, and local candidates precede external
/// ones, so catalog entries survive collisions.
fn dedup_key(product: &Product) -> (String, i64) {
    let title =
        product.title.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ");
    (title, (product.price * 100.0).round() as i64)
}

fn merge_candidates(local: Vec<Product>, external: Vec<Product>) -> Vec<Product> {
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(local.len() + external.len());

    for mut product in local.into_iter().chain(external) {
        if product.id.0.trim().is_empty() {
            product.id = ProductId::generate();
        }
        if seen.insert(dedup_key(&product)) {
            merged.push(product);
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use procura_core::catalog::Catalog;
    use procura_core::domain::product::{Product, ProductId};
    use procura_core::domain::session::PurchaseContext;

    use crate::external::{ExternalSource, SourceError};

    use super::CandidateAggregator;

    struct StaticSource {
        products: Vec<Product>,
    }

    #[async_trait]
    impl ExternalSource for StaticSource {
        async fn search(&self, _item: &str, _budget: f64) -> Result<Vec<Product>, SourceError> {
            Ok(self.products.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl ExternalSource for FailingSource {
        async fn search(&self, _item: &str, _budget: f64) -> Result<Vec<Product>, SourceError> {
            Err(SourceError::RetriesExhausted {
                attempts: 3,
                last_error: "connect timeout".to_owned(),
            })
        }
    }

    fn external_product(id: &str, title: &str, price: f64) -> Product {
        Product {
            id: ProductId(id.to_owned()),
            title: title.to_owned(),
            price,
            description: "From external lookup".to_owned(),
            availability: "Check site".to_owned(),
            delivery_time: "Varies".to_owned(),
            category: "External".to_owned(),
            link: "https://shop.example.com/item".to_owned(),
        }
    }

    fn laptop_context() -> PurchaseContext {
        PurchaseContext {
            item: Some("laptop".to_owned()),
            budget: Some(800.0),
            ..PurchaseContext::default()
        }
    }

    #[tokio::test]
    async fn external_failure_never_propagates_and_local_results_survive() {
        let aggregator = CandidateAggregator::new(Catalog::seeded(), Arc::new(FailingSource));

        let candidates = aggregator.fetch_candidates(&laptop_context()).await;

        assert!(!candidates.is_empty(), "local catalog results must still flow to ranking");
        for candidate in &candidates {
            assert!(candidate.price <= 800.0);
            assert!(candidate.title.to_lowercase().contains("laptop"));
        }
    }

    #[tokio::test]
    async fn external_results_are_appended_after_local_ones() {
        let source = StaticSource {
            products: vec![external_product("ext-1", "Featherweight Laptop", 650.0)],
        };
        let aggregator = CandidateAggregator::new(Catalog::seeded(), Arc::new(source));

        let candidates = aggregator.fetch_candidates(&laptop_context()).await;
        let last = candidates.last().expect("merged set is non-empty");

        assert_eq!(last.id.0, "ext-1");
        assert!(candidates.len() > 1);
    }

    #[tokio::test]
    async fn duplicate_title_and_price_pairs_are_collapsed() {
        let duplicate = external_product("ext-dup", "  Lightweight   Laptop 001-1 ", 500.0);
        let aggregator = CandidateAggregator::new(
            Catalog::seeded(),
            Arc::new(StaticSource { products: vec![duplicate] }),
        );

        let candidates = aggregator.fetch_candidates(&laptop_context()).await;

        let matching = candidates
            .iter()
            .filter(|candidate| {
                candidate.title.to_lowercase().contains("lightweight laptop 001-1")
                    || candidate.id.0 == "ext-dup"
            })
            .collect::<Vec<_>>();
        assert_eq!(matching.len(), 1, "local entry wins over the external duplicate");
        assert_ne!(matching[0].id.0, "ext-dup");
    }

    #[tokio::test]
    async fn missing_product_ids_are_backfilled() {
        let source = StaticSource {
            products: vec![
                external_product("", "Featherweight Laptop", 650.0),
                external_product("  ", "Campus Laptop", 700.0),
            ],
        };
        let aggregator = CandidateAggregator::new(Catalog::new(Vec::new()), Arc::new(source));

        let candidates = aggregator.fetch_candidates(&laptop_context()).await;

        assert_eq!(candidates.len(), 2);
        let mut ids = std::collections::HashSet::new();
        for candidate in &candidates {
            assert!(!candidate.id.0.trim().is_empty(), "every candidate carries an id");
            assert!(ids.insert(candidate.id.0.clone()), "generated ids are unique");
        }
    }

    #[tokio::test]
    async fn unmatched_urgency_preference_falls_back_to_item_and_budget() {
        let aggregator = CandidateAggregator::new(Catalog::seeded(), Arc::new(FailingSource));
        let context = PurchaseContext {
            urgency: Some("no urgency".to_owned()),
            ..laptop_context()
        };

        let candidates = aggregator.fetch_candidates(&context).await;
        assert!(!candidates.is_empty(), "an unmatched urgency must not empty the result set");
    }

    #[tokio::test]
    async fn matching_urgency_preference_constrains_delivery_times() {
        let aggregator = CandidateAggregator::new(Catalog::seeded(), Arc::new(FailingSource));
        let context = PurchaseContext {
            item: Some("chair".to_owned()),
            budget: Some(500.0),
            urgency: Some("1-2 days".to_owned()),
            ..PurchaseContext::default()
        };

        let candidates = aggregator.fetch_candidates(&context).await;
        assert!(!candidates.is_empty());
        for candidate in &candidates {
            assert_eq!(candidate.delivery_time, "1-2 days");
        }
    }

    #[tokio::test]
    async fn incomplete_context_yields_no_candidates() {
        let aggregator =
            CandidateAggregator::new(Catalog::seeded(), Arc::new(FailingSource));

        let missing_budget = PurchaseContext {
            item: Some("laptop".to_owned()),
            ..PurchaseContext::default()
        };
        assert!(aggregator.fetch_candidates(&missing_budget).await.is_empty());
    }
}
