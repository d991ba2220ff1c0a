//! Utterance interpretation.
//!
//! Deterministic pattern extraction over normalized text. The trait seam
//! exists so a model-backed interpreter can later satisfy the same
//! `(intent, item?, budget?, purpose?)` contract; this crate ships only
//! the pattern-matching implementation.

use procura_core::domain::session::Intent;

use crate::slots::{Slot, SlotValue};

/// Keywords that classify an utterance as a purchase request.
const INTENT_KEYWORDS: &[&str] = &["need", "buy", "purchase", "want", "get"];

/// Verb phrases that anchor item extraction.
const PURCHASE_PHRASES: &[&str] = &["i need", "i want", "purchase", "buy", "get"];

/// Markers that end the item span and may introduce a budget or purpose.
const BOUNDARY_MARKERS: &[&str] = &["under", "below", "less than", "to use for", "for"];

/// Markers that introduce a budget amount.
const BUDGET_MARKERS: &[&str] = &["under", "below", "less than", "for"];

/// Markers that introduce a purpose clause, longest first.
const PURPOSE_MARKERS: &[&str] = &["to use for", "for"];

#[derive(Clone, Debug, PartialEq)]
pub struct Utterance {
    pub intent: Intent,
    pub item: Option<String>,
    pub budget: Option<f64>,
    pub purpose: Option<String>,
}

pub trait Interpreter: Send + Sync {
    fn interpret(&self, text: &str) -> Utterance;

    /// Interpret raw text as the answer to exactly one pending slot.
    /// `None` means the answer was unusable for that slot.
    fn interpret_slot_answer(&self, text: &str, slot: Slot) -> Option<SlotValue>;
}

#[derive(Clone, Debug, Default)]
pub struct PatternInterpreter;

impl PatternInterpreter {
    pub fn new() -> Self {
        Self
    }
}

impl Interpreter for PatternInterpreter {
    fn interpret(&self, text: &str) -> Utterance {
        let normalized = normalize_text(text);

        let is_purchase =
            INTENT_KEYWORDS.iter().any(|keyword| normalized.contains(keyword));
        if !is_purchase {
            return Utterance {
                intent: Intent::GeneralQuery,
                item: None,
                budget: None,
                purpose: None,
            };
        }

        Utterance {
            intent: Intent::PurchaseRequest,
            item: extract_item(&normalized),
            budget: extract_budget(&normalized),
            purpose: extract_purpose(&normalized),
        }
    }

    fn interpret_slot_answer(&self, text: &str, slot: Slot) -> Option<SlotValue> {
        match slot {
            Slot::Budget => first_amount(text).map(SlotValue::Amount),
            Slot::Purpose | Slot::Brand | Slot::Features | Slot::Urgency => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(SlotValue::Text(trimmed.to_owned()))
                }
            }
        }
    }
}

fn normalize_text(text: &str) -> String {
    text.to_ascii_lowercase()
}

/// Find `phrase` at a word boundary, scanning from `from`.
fn find_phrase(haystack: &str, phrase: &str, from: usize) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let mut search_from = from;

    while let Some(relative) = haystack.get(search_from..)?.find(phrase) {
        let start = search_from + relative;
        let end = start + phrase.len();
        let boundary_before = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
        let boundary_after = end == haystack.len() || !bytes[end].is_ascii_alphanumeric();

        if boundary_before && boundary_after {
            return Some(start);
        }
        search_from = start + 1;
    }

    None
}

/// Earliest boundary-safe occurrence among `phrases`; longer phrases win
/// position ties so "to use for" shadows its inner "for".
fn earliest_phrase(haystack: &str, phrases: &[&str], from: usize) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;

    for phrase in phrases {
        if let Some(start) = find_phrase(haystack, phrase, from) {
            let candidate = (start, start + phrase.len());
            best = match best {
                Some((best_start, best_end))
                    if best_start < candidate.0
                        || (best_start == candidate.0 && best_end >= candidate.1) =>
                {
                    Some((best_start, best_end))
                }
                _ => Some(candidate),
            };
        }
    }

    best
}

/// Take the leading run of word characters, spaces, and hyphens.
fn word_span(text: &str) -> &str {
    let end = text
        .char_indices()
        .find(|(_, ch)| !(ch.is_ascii_alphanumeric() || ch.is_whitespace() || *ch == '-'))
        .map(|(index, _)| index)
        .unwrap_or(text.len());
    text[..end].trim()
}

fn strip_article(text: &str) -> &str {
    let trimmed = text.trim_start();
    for article in ["a ", "an "] {
        if let Some(rest) = trimmed.strip_prefix(article) {
            return rest.trim_start();
        }
    }
    trimmed
}

/// Item: text after a purchase-verb phrase, up to (excluding) the first
/// boundary marker or end of string.
fn extract_item(normalized: &str) -> Option<String> {
    let (_, phrase_end) = earliest_phrase(normalized, PURCHASE_PHRASES, 0)?;
    let rest = strip_article(&normalized[phrase_end..]);
    let rest_offset = normalized.len() - rest.len();

    let span_end = earliest_phrase(normalized, BOUNDARY_MARKERS, rest_offset)
        .map(|(start, _)| start.saturating_sub(rest_offset))
        .unwrap_or(rest.len());

    let item = word_span(&rest[..span_end.min(rest.len())]);
    if item.is_empty() {
        None
    } else {
        Some(item.to_owned())
    }
}

/// Budget: first boundary marker followed by an optional `$` and a number.
fn extract_budget(normalized: &str) -> Option<f64> {
    let mut from = 0;

    while let Some((start, end)) = earliest_phrase(normalized, BUDGET_MARKERS, from) {
        if let Some(amount) = leading_amount(&normalized[end..]) {
            return Some(amount);
        }
        from = start + 1;
    }

    None
}

/// Purpose: text after `for`/`to use for`, skipping occurrences that
/// introduce a dollar amount and trimming a trailing budget clause.
fn extract_purpose(normalized: &str) -> Option<String> {
    let mut from = 0;

    while let Some((start, end)) = earliest_phrase(normalized, PURPOSE_MARKERS, from) {
        let rest = &normalized[end..];
        if leading_amount(rest).is_some() {
            from = start + 1;
            continue;
        }

        let span = word_span(rest);
        let cut = earliest_phrase(span, &["under", "below", "less than"], 0)
            .map(|(cut_start, _)| cut_start)
            .unwrap_or(span.len());
        let purpose = span[..cut].trim();

        if purpose.is_empty() {
            from = start + 1;
            continue;
        }
        return Some(purpose.to_owned());
    }

    None
}

/// Parse an amount at the start of `text`: optional whitespace, optional
/// `$`, then digits with an optional decimal part.
fn leading_amount(text: &str) -> Option<f64> {
    let trimmed = text.trim_start();
    let without_dollar = trimmed.strip_prefix('$').map(str::trim_start).unwrap_or(trimmed);

    let end = without_dollar
        .char_indices()
        .find(|(_, ch)| !(ch.is_ascii_digit() || *ch == '.'))
        .map(|(index, _)| index)
        .unwrap_or(without_dollar.len());

    let digits = &without_dollar[..end];
    if digits.is_empty() || !digits.starts_with(|ch: char| ch.is_ascii_digit()) {
        return None;
    }
    digits.parse::<f64>().ok()
}

/// First amount anywhere in the text, for budget slot answers.
fn first_amount(text: &str) -> Option<f64> {
    for (index, ch) in text.char_indices() {
        if ch.is_ascii_digit() || ch == '$' {
            if let Some(amount) = leading_amount(&text[index..]) {
                return Some(amount);
            }
        }
    }
    None
}
