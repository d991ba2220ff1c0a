//! The turn engine: one conversation turn, end to end.
//!
//! Data flows one direction per turn: text -> interpreter -> slot filling
//! (reads/writes session context) -> candidate retrieval -> ranking ->
//! policy gate -> rendered decision, appended to session history. Turns
//! for one conversation run under that conversation's session lock.

use std::sync::Arc;

use tracing::info;

use procura_core::domain::product::ScoredCandidate;
use procura_core::domain::session::{
    ConversationId, Intent, PurchaseContext, Recommendation, Session, TurnRecord,
};
use procura_core::errors::ApplicationError;
use procura_core::policy::{CompanyPolicyEngine, PolicyEngine, PolicyVerdict};
use procura_core::scoring::ScoreCalculator;
use procura_retrieval::CandidateAggregator;
use procura_store::SessionStore;

use crate::interpreter::{Interpreter, PatternInterpreter};
use crate::slots::{apply_answer, missing_slots, Slot, GENERIC_PROMPT};

/// Fixed reply for utterances that are not purchase requests.
const GENERAL_QUERY_REPLY: &str = "I'm not sure I understood that. Tell me what you'd like \
     to purchase, e.g. 'I need a laptop for college work under $800'.";

/// Fixed reply when the optional slots are answered but the hard search
/// preconditions are still missing.
const PRECONDITION_REPLY: &str =
    "I still need the item you're looking for and your budget to show suggestions.";

#[derive(Clone, Debug)]
pub struct TurnRequest {
    pub conversation_id: ConversationId,
    pub text: String,
    /// Slot the previous turn asked about, if any.
    pub current_slot: Option<String>,
}

#[derive(Clone, Debug)]
pub struct TurnResponse {
    pub response: String,
    pub next_slot: Option<Slot>,
    pub context: PurchaseContext,
    pub history: Vec<TurnRecord>,
    /// Ranked options presented this turn; empty unless a search ran.
    pub candidates: Vec<ScoredCandidate>,
    pub best: Option<ScoredCandidate>,
    pub verdict: Option<PolicyVerdict>,
}

pub struct TurnEngine<I = PatternInterpreter, P = CompanyPolicyEngine> {
    interpreter: I,
    aggregator: CandidateAggregator,
    calculator: ScoreCalculator,
    policy: P,
    store: Arc<dyn SessionStore>,
}

impl TurnEngine<PatternInterpreter, CompanyPolicyEngine> {
    pub fn with_defaults(aggregator: CandidateAggregator, store: Arc<dyn SessionStore>) -> Self {
        Self::new(PatternInterpreter::new(), aggregator, CompanyPolicyEngine, store)
    }
}

impl<I, P> TurnEngine<I, P>
where
    I: Interpreter,
    P: PolicyEngine,
{
    pub fn new(
        interpreter: I,
        aggregator: CandidateAggregator,
        policy: P,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self { interpreter, aggregator, calculator: ScoreCalculator::new(), policy, store }
    }

    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnResponse, ApplicationError> {
        let handle = self
            .store
            .checkout(&request.conversation_id)
            .await
            .map_err(|error| ApplicationError::Store(error.to_string()))?;
        let mut session = handle.lock().await;

        let mut intent = Intent::PurchaseRequest;

        if let Some(slot_name) = request.current_slot.as_deref() {
            let Some(slot) = Slot::parse(slot_name) else {
                return Ok(finish_turn(&mut session, &request, intent, Reply {
                    response: GENERIC_PROMPT.to_owned(),
                    next_slot: None,
                    outcome: None,
                }));
            };

            match self.interpreter.interpret_slot_answer(&request.text, slot) {
                Some(value) => apply_answer(&mut session.context, slot, value),
                None => {
                    // Unusable answer: re-ask the same question. The
                    // context is left untouched so the slot stays pending.
                    return Ok(finish_turn(&mut session, &request, intent, Reply {
                        response: slot.question().to_owned(),
                        next_slot: Some(slot),
                        outcome: None,
                    }));
                }
            }
        } else {
            let utterance = self.interpreter.interpret(&request.text);
            intent = utterance.intent;

            if intent == Intent::GeneralQuery {
                return Ok(finish_turn(&mut session, &request, intent, Reply {
                    response: GENERAL_QUERY_REPLY.to_owned(),
                    next_slot: None,
                    outcome: None,
                }));
            }

            session.context.fill_item_if_absent(utterance.item);
            session.context.fill_budget_if_absent(utterance.budget);
            session.context.fill_purpose_if_absent(utterance.purpose);
        }

        // Transition: ask for the first missing slot, or verify the hard
        // precondition, or run the search.
        let next_missing = missing_slots(&session.context).first().copied();
        if let Some(next) = next_missing {
            return Ok(finish_turn(&mut session, &request, intent, Reply {
                response: next.question().to_owned(),
                next_slot: Some(next),
                outcome: None,
            }));
        }

        if !session.context.has_search_preconditions() {
            return Ok(finish_turn(&mut session, &request, intent, Reply {
                response: PRECONDITION_REPLY.to_owned(),
                next_slot: None,
                outcome: None,
            }));
        }

        let candidates = self.aggregator.fetch_candidates(&session.context).await;
        let ranked = self.calculator.rank(candidates, &session.context);

        let Some(best) = ranked.first().cloned() else {
            let response = no_results_message(&session.context);
            return Ok(finish_turn(&mut session, &request, intent, Reply {
                response,
                next_slot: None,
                outcome: None,
            }));
        };

        let verdict = self.policy.evaluate(&best.product);
        let response = render_recommendation(&session.context, &ranked, &best, &verdict);

        session.recommendation =
            Some(Recommendation { candidate: best.clone(), verdict: verdict.clone() });

        Ok(finish_turn(&mut session, &request, intent, Reply {
            response,
            next_slot: None,
            outcome: Some((ranked, best, verdict)),
        }))
    }
}

struct Reply {
    response: String,
    next_slot: Option<Slot>,
    outcome: Option<(Vec<ScoredCandidate>, ScoredCandidate, PolicyVerdict)>,
}

fn finish_turn(
    session: &mut Session,
    request: &TurnRequest,
    intent: Intent,
    reply: Reply,
) -> TurnResponse {
    session.record_turn(request.text.clone(), reply.response.clone(), intent);

    info!(
        event_name = "turn.completed",
        conversation_id = %session.id.0,
        intent = intent.as_str(),
        next_slot = reply.next_slot.map(|slot| slot.as_str()).unwrap_or("none"),
        presented = reply.outcome.is_some(),
        "conversation turn completed"
    );

    let (candidates, best, verdict) = match reply.outcome {
        Some((candidates, best, verdict)) => (candidates, Some(best), Some(verdict)),
        None => (Vec::new(), None, None),
    };

    TurnResponse {
        response: reply.response,
        next_slot: reply.next_slot,
        context: session.context.clone(),
        history: session.history.clone(),
        candidates,
        best,
        verdict,
    }
}

fn no_results_message(context: &PurchaseContext) -> String {
    format!(
        "No suitable {} found under ${:.2}. Please adjust your budget or try again.",
        context.item.as_deref().unwrap_or("item"),
        context.budget.unwrap_or_default(),
    )
}

fn render_recommendation(
    context: &PurchaseContext,
    ranked: &[ScoredCandidate],
    best: &ScoredCandidate,
    verdict: &PolicyVerdict,
) -> String {
    let item = context.item.as_deref().unwrap_or("item");
    let purpose = context.purpose.as_deref().unwrap_or("general use");
    let budget = context.budget.unwrap_or_default();

    let mut table = String::from(
        "| Title | Price | Match Score | Link | Availability | Delivery Time | Category |\n\
         |-------|-------|-------------|------|--------------|---------------|----------|\n",
    );
    for candidate in ranked {
        let product = &candidate.product;
        table.push_str(&format!(
            "| {} | ${:.2} | {:.2} | [View]({}) | {} | {} | {} |\n",
            product.title,
            product.price,
            candidate.match_score,
            product.link,
            product.availability,
            product.delivery_time,
            product.category,
        ));
    }

    let mut response = format!(
        "Thank you! Here are some options for a {item} for {purpose} with a budget of \
         ${budget:.2}:\n\n{table}"
    );
    response.push_str(&format!(
        "\n**Best Choice:** \"{}\" because it best fits your budget and purpose.\n\
         **Match Score:** {:.2}",
        best.product.title, best.match_score,
    ));

    if !verdict.passes {
        response.push_str(&format!("\n\nThis product requires approval: {}", verdict.reason));
    }

    response
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use procura_core::catalog::Catalog;
    use procura_core::domain::product::{Product, ProductId};
    use procura_core::domain::session::{ConversationId, Intent};
    use procura_retrieval::{CandidateAggregator, ExternalSource, SourceError};
    use procura_store::{InMemorySessionStore, SessionStore};

    use crate::slots::Slot;

    use super::{TurnEngine, TurnRequest, GENERAL_QUERY_REPLY, PRECONDITION_REPLY};

    struct UnreachableSource;

    #[async_trait]
    impl ExternalSource for UnreachableSource {
        async fn search(&self, _item: &str, _budget: f64) -> Result<Vec<Product>, SourceError> {
            Err(SourceError::RetriesExhausted {
                attempts: 3,
                last_error: "connection refused".to_owned(),
            })
        }
    }

    fn engine_with(catalog: Catalog) -> (TurnEngine, Arc<InMemorySessionStore>) {
        let store = Arc::new(InMemorySessionStore::new());
        let aggregator = CandidateAggregator::new(catalog, Arc::new(UnreachableSource));
        (TurnEngine::with_defaults(aggregator, store.clone()), store)
    }

    fn request(id: &str, text: &str, current_slot: Option<&str>) -> TurnRequest {
        TurnRequest {
            conversation_id: ConversationId(id.to_owned()),
            text: text.to_owned(),
            current_slot: current_slot.map(str::to_owned),
        }
    }

    fn gaming_desk(price: f64) -> Product {
        Product {
            id: ProductId("desk-004-1".to_owned()),
            title: "Gaming Desk 004-1".to_owned(),
            price,
            description: "Gaming Desk modern design".to_owned(),
            availability: "In Stock".to_owned(),
            delivery_time: "3-5 days".to_owned(),
            category: "Office Desks".to_owned(),
            link: "https://example.com/product/desk-004-1".to_owned(),
        }
    }

    #[tokio::test]
    async fn scenario_a_full_clarification_loop_ends_in_a_laptop_recommendation() {
        let (engine, _store) = engine_with(Catalog::seeded());
        let id = "conv-a";

        let turn = engine
            .handle_turn(request(id, "I need a laptop for college work under $800", None))
            .await
            .expect("turn 1");
        assert_eq!(turn.next_slot, Some(Slot::Brand), "budget and purpose were extracted");
        assert_eq!(turn.response, Slot::Brand.question());

        let turn = engine
            .handle_turn(request(id, "no brand", Some("brand")))
            .await
            .expect("turn 2");
        assert_eq!(turn.next_slot, Some(Slot::Features));

        let turn = engine
            .handle_turn(request(id, "no special features", Some("features")))
            .await
            .expect("turn 3");
        assert_eq!(turn.next_slot, Some(Slot::Urgency));

        let turn = engine
            .handle_turn(request(id, "no urgency", Some("urgency")))
            .await
            .expect("turn 4");

        assert_eq!(turn.next_slot, None);
        assert!(!turn.candidates.is_empty(), "ranked candidate list must be non-empty");
        for candidate in &turn.candidates {
            assert!(candidate.product.price <= 800.0);
            assert!(candidate.product.title.to_lowercase().contains("laptop"));
        }
        assert!(turn.best.is_some());
        assert!(turn.response.contains("Best Choice"));
        assert_eq!(turn.history.len(), 4, "each turn appends exactly one record");
    }

    #[tokio::test]
    async fn scenario_b_gaming_candidate_fails_the_policy_gate() {
        let (engine, _store) = engine_with(Catalog::new(vec![gaming_desk(300.0)]));
        let id = "conv-b";

        let turn = engine
            .handle_turn(request(id, "I want a gaming desk for $300", None))
            .await
            .expect("turn 1");
        assert_eq!(turn.next_slot, Some(Slot::Purpose), "budget came from the request text");

        for (answer, slot) in [
            ("long work sessions", "purpose"),
            ("no", "brand"),
            ("no", "features"),
        ] {
            let turn = engine.handle_turn(request(id, answer, Some(slot))).await.expect("turn");
            assert!(turn.next_slot.is_some());
        }

        let turn = engine
            .handle_turn(request(id, "no rush", Some("urgency")))
            .await
            .expect("final turn");

        let verdict = turn.verdict.expect("a search ran and produced a verdict");
        assert!(!verdict.passes);
        assert!(verdict.reason.contains("'gaming'"));
        assert!(turn.response.contains("requires approval"));
        assert_eq!(turn.best.expect("best candidate").product.title, "Gaming Desk 004-1");
    }

    #[tokio::test]
    async fn scenario_c_unparseable_budget_answer_reprompts_the_same_slot() {
        let (engine, store) = engine_with(Catalog::seeded());
        let id = "conv-c";

        let turn = engine.handle_turn(request(id, "I need a laptop", None)).await.expect("turn 1");
        assert_eq!(turn.next_slot, Some(Slot::Budget));

        // The same unusable answer twice: the policy is applied
        // consistently across turns.
        for _ in 0..2 {
            let turn = engine
                .handle_turn(request(id, "soon", Some("budget")))
                .await
                .expect("re-prompt turn");
            assert_eq!(turn.next_slot, Some(Slot::Budget));
            assert_eq!(turn.response, Slot::Budget.question());
            assert_eq!(turn.context.budget, None, "budget must stay unset");
        }

        let turn = engine
            .handle_turn(request(id, "$800", Some("budget")))
            .await
            .expect("parseable answer");
        assert_eq!(turn.context.budget, Some(800.0));
        assert_eq!(turn.next_slot, Some(Slot::Purpose));

        let session = store
            .find(&super::ConversationId(id.to_owned()))
            .await
            .expect("find")
            .expect("session exists");
        assert_eq!(session.history.len(), 4);
    }

    #[tokio::test]
    async fn general_queries_get_a_fixed_reply_and_no_slot() {
        let (engine, _store) = engine_with(Catalog::seeded());

        let turn = engine
            .handle_turn(request("conv-g", "hello there", None))
            .await
            .expect("turn");

        assert_eq!(turn.response, GENERAL_QUERY_REPLY);
        assert_eq!(turn.next_slot, None);
        assert_eq!(turn.history[0].intent, Intent::GeneralQuery);
    }

    #[tokio::test]
    async fn missing_item_after_all_slots_yields_the_precondition_reply() {
        let (engine, _store) = engine_with(Catalog::seeded());
        let id = "conv-p";

        // "need" marks the intent but no verb phrase anchors an item.
        let turn = engine
            .handle_turn(request(id, "we need something under $200 for the team", None))
            .await
            .expect("turn 1");
        assert_eq!(turn.next_slot, Some(Slot::Brand), "budget and purpose were extracted");

        let turn = engine.handle_turn(request(id, "any", Some("brand"))).await.expect("turn 2");
        assert_eq!(turn.next_slot, Some(Slot::Features));
        let turn = engine.handle_turn(request(id, "none", Some("features"))).await.expect("turn 3");
        assert_eq!(turn.next_slot, Some(Slot::Urgency));

        let turn = engine
            .handle_turn(request(id, "this month", Some("urgency")))
            .await
            .expect("turn 4");
        assert_eq!(turn.response, PRECONDITION_REPLY);
        assert_eq!(turn.next_slot, None);
        assert!(turn.best.is_none(), "no search runs without an item");
    }

    #[tokio::test]
    async fn no_matching_candidates_reports_a_budget_item_mismatch() {
        let (engine, _store) = engine_with(Catalog::new(Vec::new()));
        let id = "conv-n";

        engine
            .handle_turn(request(id, "I need a laptop for work under $800", None))
            .await
            .expect("turn 1");
        for (answer, slot) in [("no", "brand"), ("no", "features")] {
            engine.handle_turn(request(id, answer, Some(slot))).await.expect("turn");
        }

        let turn = engine
            .handle_turn(request(id, "whenever", Some("urgency")))
            .await
            .expect("final turn");

        assert!(turn.response.contains("No suitable laptop found under $800.00"));
        assert!(turn.best.is_none());
        assert_eq!(turn.next_slot, None, "the conversation stays open for a revised request");
    }

    #[tokio::test]
    async fn resubmitting_an_identical_answer_does_not_change_missing_slots() {
        let (engine, _store) = engine_with(Catalog::seeded());
        let id = "conv-i";

        engine.handle_turn(request(id, "I need a laptop under 800", None)).await.expect("turn 1");

        let first = engine
            .handle_turn(request(id, "college work", Some("purpose")))
            .await
            .expect("first answer");
        let second = engine
            .handle_turn(request(id, "college work", Some("purpose")))
            .await
            .expect("identical answer again");

        assert_eq!(first.next_slot, Some(Slot::Brand));
        assert_eq!(second.next_slot, Some(Slot::Brand));
        assert_eq!(first.context, second.context);
    }

    #[tokio::test]
    async fn unknown_pending_slot_name_falls_back_to_the_generic_prompt() {
        let (engine, _store) = engine_with(Catalog::seeded());

        let turn = engine
            .handle_turn(request("conv-u", "blue", Some("favorite_color")))
            .await
            .expect("turn");

        assert_eq!(turn.response, crate::slots::GENERIC_PROMPT);
        assert_eq!(turn.next_slot, None);
    }

    #[tokio::test]
    async fn a_later_turn_after_a_result_reopens_the_flow_without_corrupting_history() {
        let (engine, store) = engine_with(Catalog::seeded());
        let id = "conv-r";

        engine
            .handle_turn(request(id, "I need a laptop for college work under $800", None))
            .await
            .expect("turn 1");
        for (answer, slot) in [("no", "brand"), ("no", "features")] {
            engine.handle_turn(request(id, answer, Some(slot))).await.expect("turn");
        }
        let presented = engine
            .handle_turn(request(id, "no urgency", Some("urgency")))
            .await
            .expect("result turn");
        assert!(presented.best.is_some());

        let history_before = presented.history.clone();

        // Context is already complete, so a fresh request searches again.
        let reopened = engine
            .handle_turn(request(id, "I need a laptop again", None))
            .await
            .expect("turn after result");
        assert!(reopened.best.is_some());

        let session =
            store.find(&super::ConversationId(id.to_owned())).await.expect("find").expect("session");
        assert_eq!(session.history.len(), history_before.len() + 1);
        assert_eq!(&session.history[..history_before.len()], &history_before[..]);
        assert!(session.recommendation.is_some());
    }
}
