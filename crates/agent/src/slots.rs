//! Slot definitions and the fixed clarification order.

use serde::{Deserialize, Serialize};

use procura_core::domain::session::PurchaseContext;

/// A piece of information requested before a search can run. `item` is
/// handled outside this list: it is a hard search precondition, not a
/// clarification slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Budget,
    Purpose,
    Brand,
    Features,
    Urgency,
}

/// Generic prompt used when a question is needed for a slot name the
/// system does not recognize.
pub const GENERIC_PROMPT: &str = "Could you provide more details about your request?";

impl Slot {
    /// Fixed clarification order. `missing_slots` and the question loop
    /// both follow this order, so the first missing slot is always the
    /// next question to ask.
    pub const ORDER: [Slot; 5] =
        [Slot::Budget, Slot::Purpose, Slot::Brand, Slot::Features, Slot::Urgency];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Budget => "budget",
            Self::Purpose => "purpose",
            Self::Brand => "brand",
            Self::Features => "features",
            Self::Urgency => "urgency",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "budget" => Some(Self::Budget),
            "purpose" => Some(Self::Purpose),
            "brand" => Some(Self::Brand),
            "features" => Some(Self::Features),
            "urgency" => Some(Self::Urgency),
            _ => None,
        }
    }

    pub fn question(&self) -> &'static str {
        match self {
            Self::Budget => "What's your approximate budget for this purchase?",
            Self::Purpose => "What will you be using the item for? (e.g., college work, office tasks)",
            Self::Brand => "Do you have any brand preferences?",
            Self::Features => "Are there specific features you need? (e.g., screen size, RAM)",
            Self::Urgency => "How soon do you need the item delivered?",
        }
    }

    fn is_filled(&self, context: &PurchaseContext) -> bool {
        match self {
            Self::Budget => context.budget.is_some(),
            Self::Purpose => context.purpose.is_some(),
            Self::Brand => context.brand.is_some(),
            Self::Features => context.features.is_some(),
            Self::Urgency => context.urgency.is_some(),
        }
    }
}

/// Clarification question for a slot name, falling back to the generic
/// prompt for unrecognized names.
pub fn clarification_question(slot_name: &str) -> &'static str {
    Slot::parse(slot_name).map(|slot| slot.question()).unwrap_or(GENERIC_PROMPT)
}

/// Every unfilled slot, in the fixed order. The first element is the next
/// question to ask.
pub fn missing_slots(context: &PurchaseContext) -> Vec<Slot> {
    Slot::ORDER.into_iter().filter(|slot| !slot.is_filled(context)).collect()
}

#[derive(Clone, Debug, PartialEq)]
pub enum SlotValue {
    Amount(f64),
    Text(String),
}

/// Write an answered slot value into the context. A direct answer to a
/// pending clarification is the highest-confidence source for that slot.
pub fn apply_answer(context: &mut PurchaseContext, slot: Slot, value: SlotValue) {
    let as_text = |value: SlotValue| match value {
        SlotValue::Amount(amount) => amount.to_string(),
        SlotValue::Text(text) => text,
    };

    match slot {
        Slot::Budget => match value {
            SlotValue::Amount(amount) => context.budget = Some(amount),
            SlotValue::Text(raw) => {
                if let Ok(amount) = raw.trim().parse::<f64>() {
                    context.budget = Some(amount);
                }
            }
        },
        Slot::Purpose => context.purpose = Some(as_text(value)),
        Slot::Brand => context.brand = Some(as_text(value)),
        Slot::Features => context.features = Some(as_text(value)),
        Slot::Urgency => context.urgency = Some(as_text(value)),
    }
}
