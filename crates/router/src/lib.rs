//! Routing pipeline - intent classification, safety moderation, dispatch
//!
//! This crate decides how the system handles a user utterance:
//! 1. **Safety gate** (`heuristics`, `moderator`) - pattern tables first,
//!    then a safety-tuned moderation model when the patterns are
//!    inconclusive. A blocked verdict short-circuits everything else.
//! 2. **Intent classification** (`heuristics`, `classifier`) - deterministic
//!    rule groups first, then a structured-prompt model stage, then a `qa`
//!    default on total failure.
//! 3. **Dispatch** (`orchestrator`) - refusal, escalation, small talk,
//!    memory acknowledgment, or knowledge-base retrieval, always rendered
//!    into the response envelope.
//!
//! Model and retrieval handles are expensive to construct; `engines` keeps a
//! bounded LRU cache of them behind an injected factory so concurrent
//! requests share one handle per key.
//!
//! # Safety Principle
//!
//! The model-backed stages are strictly advisory resolvers. Every one of
//! them may fail or return garbage, and every failure degrades to a
//! deterministic fallback tier. No collaborator error escapes a request.

pub mod classifier;
pub mod engines;
pub mod finance;
pub mod heuristics;
pub mod llm;
pub mod moderator;
pub mod orchestrator;
pub mod small_talk;
