//! # promptline
//!
//! Prompt-centric LLM applications in Rust: a handful of small pipelines that fill prompt templates from a
//! record, call a text-generation endpoint, post-process the reply and write it back into the record.
//!
//! ## Usage
//! `promptline` is not released on crates.io. To use it, add a dependency in `Cargo.toml`
//! ```toml
//! promptline = { path = "../promptline" }
//! ```
//! and set `HUGGINGFACEHUB_API_TOKEN` (or pass a key to
//! [`EndpointConfig::with_api_key`](crate::utils::llm::EndpointConfig::with_api_key)).
//!
//! ## Concepts and Design
//! The overall design is data-driven. Every step of an application reads some fields of a record and writes
//! others, so after a run the record tells you exactly what happened. The API hierarchy aims to be as flat
//! as possible.
//!
//! ### Prompt Template and Placeholder
//!
//! A template looks like
//!
//! ```text
//! Summarize the following transcript in a concise manner:\n\n{{transcript}}
//! ```
//!
//! `{{transcript}}` is a placeholder named `"transcript"`. Names can be any string without line breaks.
//!
//! ### Partial Prompt
//!
//! A `PartialPrompt` comes only from `PromptTemplate::construct_prompt`. It records which placeholder gets
//! filled by what value, and which are still unfilled. Once every placeholder is filled,
//! `PartialPrompt::complete` turns it into the concrete prompt.
//!
//! ### Filler
//!
//! Anything that implements [`Fill`](crate::filler::Fill). Pipeline records are fillers of their own
//! prompts.
//!
//! ### Endpoint or LLM
//!
//! The end of `PromptTemplate -> PartialPrompt -> complete prompt` is an endpoint implementing
//! [`Generate`](crate::utils::llm::Generate). Replies are post-processed with the helpers in
//! [utilities](crate::utils): line splitting, or JSON extraction validated against a schema.
//!
//! ### Application
//!
//! An application is an ordered collection of prompt templates, fillers, endpoint calls and post-processing
//! stages over one record. See [exemplars] for the bundled ones and [pipeline] for how runs report failures.
//!
//! ## License
//!
//! `promptline` is free under the Apache license.
//!
//! ## Attribution
//! * `tiktoken-rs`: In [crate::utils::token::tiktoken], we re-export the `tiktoken-rs` crate.

pub mod prompt;
pub mod filler;
pub mod pipeline;
pub mod exemplars;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
