//! Token counting traits and utilities

pub mod tiktoken;

use crate::utils::llm::{ChatMessage, Role};

const TOKENS_PER_MESSAGE: usize = 3;

/// Trait for counting tokens in a string.
pub trait CountToken {
    fn count_token(&self, string: &str) -> usize;
}

/// Blanket impl of CountToken for Fn(&str) -> usize.
impl<F> CountToken for F where F: Fn(&str) -> usize {
    fn count_token(&self, string: &str) -> usize {
        self(string)
    }
}

/// Count the number of tokens in a string by the length of the string.
#[inline]
pub fn count_tokens_by_len(string: &str) -> usize {
    string.len()
}

/// Count the tokens a chat message costs, following the OpenAI accounting of a fixed per-message overhead.
pub fn count_msg_token(counter: &(impl CountToken + ?Sized), msg: &ChatMessage) -> usize {
    counter.count_token(&msg.content) + TOKENS_PER_MESSAGE
}

/// Drops the oldest messages until the conversation fits in `max_tokens`.
///
/// A leading system message is always kept and its tokens are taken from the budget first.
/// Returns an empty conversation if the system message alone does not fit.
pub fn truncate_messages(counter: &(impl CountToken + ?Sized),
                         messages: &[ChatMessage],
                         max_tokens: usize) -> Vec<ChatMessage> {
    let (system_message, rest) = match messages.split_first() {
        Some((first, rest)) if first.role == Role::System => (Some(first), rest),
        _ => (None, messages),
    };
    let budget = match system_message {
        Some(sys) => match max_tokens.checked_sub(count_msg_token(counter, sys)) {
            Some(budget) => budget,
            None => return Vec::new(),
        },
        None => max_tokens,
    };
    let truncate_start_idx = get_truncate_start_idx(counter, rest, budget);
    system_message
        .into_iter()
        .chain(rest[truncate_start_idx..].iter())
        .cloned()
        .collect()
}

/// Index of the oldest message that still fits when keeping the newest ones.
pub(crate) fn get_truncate_start_idx(counter: &(impl CountToken + ?Sized),
                                     messages: &[ChatMessage],
                                     max_tokens: usize) -> usize {
    let mut token_count = 0;
    for (idx, msg) in messages.iter().enumerate().rev() {
        let message_token_count = count_msg_token(counter, msg);
        if token_count + message_token_count > max_tokens {
            return idx + 1;
        }
        token_count += message_token_count;
    }
    0
}
