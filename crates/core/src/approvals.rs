//! Approval request content for candidates that fail the policy gate.
//!
//! Core owns the message content contract only: subject, body, and an
//! approval action keyed by the candidate's product id. Actual delivery
//! is a collaborator concern; the default sink degrades to a
//! manually-dispatched compose link.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::product::{ProductId, ScoredCandidate};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalMessage {
    pub product_id: ProductId,
    pub subject: String,
    pub body: String,
    pub approval_url: String,
}

impl ApprovalMessage {
    /// Build the approval request for a selected candidate. The body
    /// carries price, match score, link, and category; the approval URL
    /// is keyed by the candidate's opaque product id.
    pub fn for_candidate(candidate: &ScoredCandidate, approval_base_url: &str) -> Self {
        let product = &candidate.product;
        let approval_url =
            format!("{}/approve?product_id={}", approval_base_url.trim_end_matches('/'), product.id.0);

        let subject = format!("Approval Request: {}", product.title);
        let body = format!(
            "Product Approval Request\n\n\
             Product: {title}\n\
             Price: ${price:.2}\n\
             Match Score: {score:.2}\n\
             Link: {link}\n\
             Category: {category}\n\n\
             Explanation: This product was selected as the best match for the \
             user's request based on budget and purpose.\n\
             Approve here: {approval_url}\n",
            title = product.title,
            price = product.price,
            score = candidate.match_score,
            link = product.link,
            category = product.category,
        );

        Self { product_id: product.id.clone(), subject, body, approval_url }
    }

    /// Gmail compose link for manual dispatch when no mail transport is
    /// configured or direct delivery failed.
    pub fn compose_url(&self, approver_email: &str) -> String {
        format!(
            "https://mail.google.com/mail/?view=cm&fs=1&to={}&su={}&body={}",
            percent_encode(approver_email),
            percent_encode(&self.subject),
            percent_encode(&self.body),
        )
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification transport failure: {0}")]
    Transport(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeliveryReceipt {
    Sent,
    ManualDispatch { compose_url: String },
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, message: &ApprovalMessage) -> Result<DeliveryReceipt, NotifyError>;
}

/// Default sink: never sends anything itself, it hands back a compose
/// link for a human to dispatch.
#[derive(Clone, Debug)]
pub struct ManualDispatchSink {
    approver_email: String,
}

impl ManualDispatchSink {
    pub fn new(approver_email: impl Into<String>) -> Self {
        Self { approver_email: approver_email.into() }
    }
}

#[async_trait]
impl NotificationSink for ManualDispatchSink {
    async fn deliver(&self, message: &ApprovalMessage) -> Result<DeliveryReceipt, NotifyError> {
        Ok(DeliveryReceipt::ManualDispatch {
            compose_url: message.compose_url(&self.approver_email),
        })
    }
}

fn percent_encode(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char);
            }
            other => {
                encoded.push('%');
                encoded.push_str(&format!("{other:02X}"));
            }
        }
    }
    encoded
}
