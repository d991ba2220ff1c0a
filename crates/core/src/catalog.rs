//! Static in-memory product catalog.
//!
//! The catalog is synthesized once at startup from fixed seeds: five
//! categories, five base items each, three variants per item. Variant
//! indexes drive the price ladder and the descriptor/availability/delivery
//! rotations, so repeated builds produce an identical catalog.

use crate::domain::product::{Product, ProductId};

#[derive(Debug, Clone, Copy)]
struct CategorySeed {
    name: &'static str,
    slug: &'static str,
    items: [&'static str; 5],
    descriptors: [&'static str; 5],
    price_range: (f64, f64),
}

const CATEGORY_SEEDS: &[CategorySeed] = &[
    CategorySeed {
        name: "Office Chairs",
        slug: "chair",
        items: ["Ergonomic Chair", "Task Chair", "Mesh Chair", "Executive Chair", "Adjustable Stool"],
        descriptors: [
            "with lumbar support",
            "adjustable height",
            "breathable mesh",
            "with headrest",
            "reclining feature",
        ],
        price_range: (100.0, 500.0),
    },
    CategorySeed {
        name: "Office Desks",
        slug: "desk",
        items: ["Standing Desk", "Portable Desk", "L-Shaped Desk", "Gaming Desk", "Foldable Desk"],
        descriptors: [
            "height-adjustable",
            "easy assembly",
            "with storage",
            "modern design",
            "portable",
        ],
        price_range: (200.0, 600.0),
    },
    CategorySeed {
        name: "Monitors",
        slug: "monitor",
        items: [
            "24-Inch Monitor",
            "27-Inch Monitor",
            "32-Inch Monitor",
            "Curved Monitor",
            "Portable Monitor",
        ],
        descriptors: [
            "Full HD",
            "energy-efficient",
            "4K resolution",
            "with speakers",
            "ultra-thin bezel",
        ],
        price_range: (150.0, 400.0),
    },
    CategorySeed {
        name: "Laptops",
        slug: "laptop",
        items: [
            "Lightweight Laptop",
            "Gaming Laptop",
            "Business Laptop",
            "Ultrabook",
            "Convertible Laptop",
        ],
        descriptors: [
            "high performance",
            "long battery life",
            "touchscreen",
            "lightweight",
            "dedicated GPU",
        ],
        price_range: (500.0, 2000.0),
    },
    CategorySeed {
        name: "Keyboards",
        slug: "keyboard",
        items: [
            "Mechanical Keyboard",
            "Wireless Keyboard",
            "Ergonomic Keyboard",
            "RGB Keyboard",
            "Compact Keyboard",
        ],
        descriptors: [
            "clicky switches",
            "silent typing",
            "customizable keys",
            "durable build",
            "backlit",
        ],
        price_range: (50.0, 150.0),
    },
];

const VARIANTS_PER_ITEM: usize = 3;

const AVAILABILITY: [&str; 3] = ["In Stock", "Out of Stock", "Available in 3 days"];
const DELIVERY_TIMES: [&str; 3] = ["1-2 days", "3-5 days", "5-7 days"];

fn variant_price(range: (f64, f64), item_index: usize, variant: usize) -> f64 {
    let (min, max) = range;
    let last_step = (4 * VARIANTS_PER_ITEM + VARIANTS_PER_ITEM - 1) as f64;
    let step = (item_index * VARIANTS_PER_ITEM + variant) as f64 / last_step;
    ((min + (max - min) * step) * 100.0).round() / 100.0
}

fn build_products() -> Vec<Product> {
    let mut products = Vec::new();

    for seed in CATEGORY_SEEDS {
        for (item_index, item) in seed.items.iter().enumerate() {
            for variant in 0..VARIANTS_PER_ITEM {
                let id = format!("{}-{:03}-{}", seed.slug, item_index + 1, variant + 1);
                let descriptor = seed.descriptors[(item_index + variant) % seed.descriptors.len()];

                products.push(Product {
                    id: ProductId(id.clone()),
                    title: format!("{} {:03}-{}", item, item_index + 1, variant + 1),
                    price: variant_price(seed.price_range, item_index, variant),
                    description: format!("{item} {descriptor}"),
                    availability: AVAILABILITY[(item_index * VARIANTS_PER_ITEM + variant)
                        % AVAILABILITY.len()]
                    .to_owned(),
                    delivery_time: DELIVERY_TIMES[(item_index + variant) % DELIVERY_TIMES.len()]
                        .to_owned(),
                    category: seed.name.to_owned(),
                    link: format!("https://example.com/product/{id}"),
                });
            }
        }
    }

    products
}

/// Immutable product catalog available before the first turn.
#[derive(Debug, Clone)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Build the deterministic seeded catalog.
    pub fn seeded() -> Self {
        Self::new(build_products())
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Filter by budget ceiling, case-insensitive item substring in the
    /// title, and (when set) urgency substring against the delivery time.
    pub fn search(&self, item: &str, budget: f64, urgency: Option<&str>) -> Vec<Product> {
        let item = item.to_lowercase();

        self.products
            .iter()
            .filter(|product| product.price <= budget)
            .filter(|product| product.title.to_lowercase().contains(&item))
            .filter(|product| match urgency {
                Some(urgency) if !urgency.trim().is_empty() => {
                    product.delivery_time.to_lowercase().contains(&urgency.to_lowercase())
                }
                _ => true,
            })
            .cloned()
            .collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::seeded()
    }
}
