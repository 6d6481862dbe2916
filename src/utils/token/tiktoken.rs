use std::collections::HashMap;
use std::sync::Arc;
use anyhow::Result;
pub use tiktoken_rs::{cl100k_base, o200k_base, CoreBPE};
use log::warn;

use crate::utils::token::CountToken;
use lazy_static::lazy_static;

/// Context window assumed for models missing from [MODEL_TO_MAX_TOKENS].
pub const FALLBACK_MAX_TOKENS: usize = 8192;

lazy_static! {
    /// const map from model name to max tokens.
    pub static ref MODEL_TO_MAX_TOKENS: HashMap<&'static str, usize> = HashMap::from([
        ("openai/gpt-oss-20b", 131072),
        ("openai/gpt-oss-120b", 131072),
        ("gpt-4o", 128000),
        ("gpt-4o-mini", 128000),
        ("gpt-4", 8192),
        ("gpt-4-32k", 32768),
        ("gpt-3.5-turbo", 16385),
    ]);
}

/// Counter using the Tiktoken tokenizer.
#[derive(Clone)]
#[readonly::make]
pub struct Tiktoken {
    /// The model name of the tokenizer. read-only.
    #[readonly]
    pub model: String,
    /// Context window of the model. read-only.
    #[readonly]
    pub max_tokens: usize,
    bpe: Arc<CoreBPE>,
}

impl Tiktoken {
    /// Create a new Tiktoken counter. gpt-oss and gpt-4o models use the `o200k` encoding, everything else `cl100k`.
    pub fn new(model: impl Into<String>) -> Result<Self> {
        let model = model.into();
        let max_tokens = match MODEL_TO_MAX_TOKENS.get(model.as_str()) {
            Some(max_tokens) => *max_tokens,
            None => {
                warn!("model {} has no known context window, assuming {} tokens", model, FALLBACK_MAX_TOKENS);
                FALLBACK_MAX_TOKENS
            }
        };
        let bpe = if model.contains("gpt-oss") || model.starts_with("gpt-4o") {
            o200k_base()?
        } else {
            cl100k_base()?
        };
        Ok(Tiktoken {
            model,
            max_tokens,
            bpe: Arc::new(bpe),
        })
    }
}

impl CountToken for Tiktoken {
    fn count_token(&self, string: &str) -> usize {
        self.bpe.encode_with_special_tokens(string).len()
    }
}
