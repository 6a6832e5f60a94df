//! Candidate report pipeline.
//!
//! raw CV text → LLM extraction → schema enforcement → date and level normalization
//! → employer aggregation → optional translation → render context.

pub mod aggregate;
pub mod context;
pub mod dates;
pub mod extract;
pub mod formatting;
pub mod handlers;
pub mod levels;
pub mod pipeline;
pub mod prompts;
pub mod schema;
pub mod translate;
