//! Turn and approval endpoints.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json, routing::post, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use procura_agent::TurnEngine;
use procura_core::approvals::{ApprovalMessage, DeliveryReceipt, NotificationSink};
use procura_core::domain::product::ScoredCandidate;
use procura_core::domain::session::{ConversationId, PurchaseContext, TurnRecord};
use procura_core::errors::{ApplicationError, InterfaceError};
use procura_store::SessionStore;

#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<TurnEngine>,
    pub store: Arc<dyn SessionStore>,
    pub sink: Arc<dyn NotificationSink>,
    pub approver_email: String,
    pub approval_base_url: String,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/turn", post(submit_turn))
        .route("/api/approval", post(request_approval))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct TurnApiRequest {
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub input: String,
    #[serde(default)]
    pub current_slot: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TurnApiResponse {
    pub conversation_id: String,
    pub response: String,
    pub current_slot: Option<String>,
    pub context: PurchaseContext,
    pub history: Vec<TurnRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<ScoredCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_product: Option<ScoredCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passes_policy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub correlation_id: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

async fn submit_turn(
    State(state): State<ApiState>,
    Json(request): Json<TurnApiRequest>,
) -> ApiResult<TurnApiResponse> {
    let correlation_id = Uuid::new_v4().to_string();

    let conversation_id = request
        .conversation_id
        .filter(|id| !id.trim().is_empty())
        .map(ConversationId)
        .unwrap_or_else(ConversationId::generate);

    let turn = state
        .engine
        .handle_turn(procura_agent::TurnRequest {
            conversation_id: conversation_id.clone(),
            text: request.input,
            current_slot: request.current_slot,
        })
        .await
        .map_err(|error| application_error(error, &correlation_id))?;

    Ok(Json(TurnApiResponse {
        conversation_id: conversation_id.0,
        response: turn.response,
        current_slot: turn.next_slot.map(|slot| slot.as_str().to_owned()),
        context: turn.context,
        history: turn.history,
        products: turn.candidates,
        best_product: turn.best,
        passes_policy: turn.verdict.as_ref().map(|verdict| verdict.passes),
        policy_reason: turn.verdict.map(|verdict| verdict.reason),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ApprovalApiRequest {
    pub conversation_id: String,
}

#[derive(Debug, Serialize)]
pub struct ApprovalApiResponse {
    pub delivered: bool,
    pub mailto_link: String,
    pub subject: String,
    pub body: String,
    pub approval_url: String,
}

async fn request_approval(
    State(state): State<ApiState>,
    Json(request): Json<ApprovalApiRequest>,
) -> ApiResult<ApprovalApiResponse> {
    let correlation_id = Uuid::new_v4().to_string();
    let conversation_id = ConversationId(request.conversation_id);

    let session = state
        .store
        .find(&conversation_id)
        .await
        .map_err(|error| {
            application_error(ApplicationError::Store(error.to_string()), &correlation_id)
        })?;

    let Some(session) = session else {
        return Err(client_error("Unknown conversation id", &correlation_id));
    };
    let Some(recommendation) = session.recommendation else {
        return Err(client_error("No product selected for approval", &correlation_id));
    };

    let message =
        ApprovalMessage::for_candidate(&recommendation.candidate, &state.approval_base_url);

    let (delivered, mailto_link) = match state.sink.deliver(&message).await {
        Ok(DeliveryReceipt::Sent) => (true, message.compose_url(&state.approver_email)),
        Ok(DeliveryReceipt::ManualDispatch { compose_url }) => (false, compose_url),
        Err(error) => {
            // Delivery failure is not fatal: fall back to manual dispatch.
            warn!(
                event_name = "approval.delivery_failed",
                correlation_id = %correlation_id,
                error = %error,
                "approval delivery failed, presenting manual dispatch link"
            );
            (false, message.compose_url(&state.approver_email))
        }
    };

    Ok(Json(ApprovalApiResponse {
        delivered,
        mailto_link,
        subject: message.subject,
        body: message.body,
        approval_url: message.approval_url,
    }))
}

fn application_error(
    error: ApplicationError,
    correlation_id: &str,
) -> (StatusCode, Json<ApiError>) {
    let interface = error.into_interface(correlation_id);
    let status = match &interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    warn!(
        event_name = "api.request_failed",
        correlation_id = correlation_id,
        error = %interface,
        "request failed"
    );

    (
        status,
        Json(ApiError {
            error: interface.user_message().to_owned(),
            correlation_id: correlation_id.to_owned(),
        }),
    )
}

fn client_error(message: &str, correlation_id: &str) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError { error: message.to_owned(), correlation_id: correlation_id.to_owned() }),
    )
}
