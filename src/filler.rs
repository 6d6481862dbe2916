use crate::prompt::errors::PromptError;
use crate::prompt::PartialPrompt;

/// A filler that reads everything it needs from itself, typically a pipeline record.
pub trait Fill {
    fn fill(&self, partial_prompt: &mut PartialPrompt) -> Result<(), PromptError>;
}

/// Fills a partial prompt from `(placeholder, value)` pairs, skipping placeholders the template lacks.
pub(crate) fn fill_present<'a>(partial_prompt: &mut PartialPrompt,
                               values: impl IntoIterator<Item=(&'a str, String)>) {
    for (placeholder, value) in values {
        partial_prompt.fill_if_present(placeholder, value);
    }
}
