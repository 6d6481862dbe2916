//! # Application Samples
//!
//! * [research_papers]: topic -> paper titles -> Semantic Scholar search -> per-paper summaries
//! * [video_summary]: YouTube URL or transcript -> summary, topics, optional questions and answers
//! * [project_ideas]: generate project ideas from skills, or refine a given idea, through concurrent branches
//! * [writing_assistant]: route a request to an email, a LinkedIn post or a LinkedIn message
//! * [user_personas]: product description -> user types -> one persona per user type
//! * [chatbot]: multi-turn chat, in-session or with per-thread memory and streaming
//!
//! Every application takes its collaborators (endpoint, search, transcripts) in `new`, so any of them can be
//! swapped for another implementation.

pub mod research_papers;
pub mod video_summary;
pub mod project_ideas;
pub mod writing_assistant;
pub mod user_personas;
pub mod chatbot;
