//! Conversation agent: utterance interpretation, slot filling, and the
//! turn engine that drives one conversation turn end-to-end.

pub mod engine;
pub mod interpreter;
pub mod slots;

pub use engine::{TurnEngine, TurnRequest, TurnResponse};
pub use interpreter::{Interpreter, PatternInterpreter, Utterance};
pub use slots::{clarification_question, missing_slots, Slot, SlotValue};
