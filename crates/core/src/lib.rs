pub mod approvals;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod policy;
pub mod scoring;

pub use approvals::{
    ApprovalMessage, DeliveryReceipt, ManualDispatchSink, NotificationSink, NotifyError,
};
pub use catalog::Catalog;
pub use domain::product::{Product, ProductId, ScoredCandidate};
pub use domain::session::{
    ConversationId, Intent, PurchaseContext, Recommendation, Session, TurnRecord,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use policy::{CompanyPolicyEngine, PolicyEngine, PolicyVerdict};
pub use scoring::ScoreCalculator;
