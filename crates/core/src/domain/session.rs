use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::product::ScoredCandidate;
use crate::policy::PolicyVerdict;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    PurchaseRequest,
    GeneralQuery,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PurchaseRequest => "purchase_request",
            Self::GeneralQuery => "general_query",
        }
    }
}

/// Accumulated slot values for one conversation.
///
/// Fixed-shape record: every slot is an explicit optional field, so slot
/// names are checked at compile time rather than carried as map keys.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PurchaseContext {
    pub item: Option<String>,
    pub budget: Option<f64>,
    pub purpose: Option<String>,
    pub brand: Option<String>,
    pub features: Option<String>,
    pub urgency: Option<String>,
}

impl PurchaseContext {
    /// Fill `item` only when it is currently absent. Extraction-derived
    /// values never clobber a slot that was already answered.
    pub fn fill_item_if_absent(&mut self, value: Option<String>) {
        if self.item.is_none() {
            self.item = value.filter(|item| !item.is_empty());
        }
    }

    pub fn fill_budget_if_absent(&mut self, value: Option<f64>) {
        if self.budget.is_none() {
            self.budget = value;
        }
    }

    pub fn fill_purpose_if_absent(&mut self, value: Option<String>) {
        if self.purpose.is_none() {
            self.purpose = value.filter(|purpose| !purpose.is_empty());
        }
    }

    /// The hard precondition for running a search, distinct from the
    /// optional-slot list.
    pub fn has_search_preconditions(&self) -> bool {
        self.item.is_some() && self.budget.is_some()
    }
}

/// One user/bot exchange, with a copy of the context at that point.
/// Append-only; never mutated after being recorded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub user_text: String,
    pub bot_text: String,
    pub intent: Intent,
    pub context: PurchaseContext,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub candidate: ScoredCandidate,
    pub verdict: PolicyVerdict,
}

/// Full per-conversation state: context, ordered history, and at most one
/// selected best candidate with its policy verdict. Lives for the process
/// lifetime; destroyed only by restart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: ConversationId,
    pub context: PurchaseContext,
    pub history: Vec<TurnRecord>,
    pub recommendation: Option<Recommendation>,
}

impl Session {
    pub fn new(id: ConversationId) -> Self {
        Self { id, context: PurchaseContext::default(), history: Vec::new(), recommendation: None }
    }

    /// Append a turn record carrying a snapshot of the current context.
    pub fn record_turn(&mut self, user_text: String, bot_text: String, intent: Intent) {
        self.history.push(TurnRecord {
            user_text,
            bot_text,
            intent,
            context: self.context.clone(),
            recorded_at: Utc::now(),
        });
    }
}
