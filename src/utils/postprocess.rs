//! Post-processing of LLM replies.

pub mod json;
pub mod lines;
