use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// A product under consideration, before scoring.
///
/// Immutable once constructed; the ranking match score lives in
/// [`ScoredCandidate`] rather than on the product itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: f64,
    pub description: String,
    pub availability: String,
    pub delivery_time: String,
    pub category: String,
    pub link: String,
}

/// A product with its late-bound match score attached during ranking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub product: Product,
    pub match_score: f64,
}

#[cfg(test)]
mod tests {
    use super::ProductId;

    #[test]
    fn generated_product_ids_are_unique() {
        assert_ne!(ProductId::generate(), ProductId::generate());
    }
}
