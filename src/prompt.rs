//! # Prompt
//! A prompt is simply a string
//! ## PromptTemplate
//! A prompt template is a string with placeholders. It can also have metadata in JSON format.
//!
//! ## Placeholder
//! A placeholder is a string that is in the format of `{{name}}`. It can be filled with a value.
//! It has a name, which is the string inside the double braces.
//!
//! ## PartialPrompt
//! A partial prompt is a prompt template with some placeholders filled. A partial prompt can be only constructed from a prompt template via [PromptTemplate::construct_prompt].
//!
//! The placeholders in a partial prompt can be filled with values via [PartialPrompt::fill] or [PartialPrompt::try_fill]. You can also use these two methods to update the filling values of the placeholders.
//! When all placeholders are filled, the partial prompt can be completed via [PartialPrompt::complete], in which the placeholders in a template are **actually** replaced with the filling values.
//!
//! Completing is a pure function of the template and the filling values, so the same record always yields
//! the byte-identical prompt.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use log::warn;
use crate::filler::Fill;
use crate::prompt::errors::PromptError;
use crate::utils::prompt_processing::{get_placeholders, replace_all_placeholders};
use crate::utils::JsonMap;


/// A prompt template with some placeholders filled. A partial prompt can be only constructed from a prompt template via [PromptTemplate::construct_prompt].
#[derive(Debug, Clone)]
#[readonly::make]
pub struct PartialPrompt {
    /// The template of the partial prompt, readonly
    #[readonly]
    pub template: PromptTemplate,

    /// Mapping from placeholder name to its filling value
    pub(crate) placeholder_to_vals: HashMap<String, Option<String>>,

    /// Record the placeholders that are not filled yet
    pub(crate) unfilled_placeholders: HashSet<String>,
}

impl PartialPrompt {
    /// Fill the placeholders in the partial prompt with the given values.
    /// Panics if the placeholder does not exist.
    pub fn fill(&mut self, placeholder: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.try_fill(placeholder, value).unwrap()
    }

    /// Fill the placeholders in the partial prompt with the given values.
    /// Returns an error if the placeholder does not exist.
    pub fn try_fill(&mut self, placeholder: impl Into<String>, value: impl Into<String>) -> Result<&mut Self, PromptError> {
        let placeholder = placeholder.into();
        if self.placeholder_to_vals.contains_key(&placeholder) {
            self.unfilled_placeholders.remove(&placeholder);
            self.placeholder_to_vals.insert(placeholder, Some(value.into()));
            Ok(self)
        } else {
            Err(PromptError::placeholder_not_exist(placeholder, value, &self.template.placeholders))
        }
    }

    /// Fill the placeholder only if the template has it. Used by fillers that own more fields than a
    /// single template needs.
    pub fn fill_if_present(&mut self, placeholder: &str, value: impl Into<String>) -> &mut Self {
        if self.placeholder_to_vals.contains_key(placeholder) {
            self.unfilled_placeholders.remove(placeholder);
            self.placeholder_to_vals.insert(placeholder.to_string(), Some(value.into()));
        }
        self
    }

    /// Fill with everything a [Fill] implementor provides.
    pub fn fill_from(&mut self, filler: &impl Fill) -> Result<&mut Self, PromptError> {
        filler.fill(self)?;
        Ok(self)
    }

    /// Whether every placeholder has a value.
    pub fn is_complete(&self) -> bool {
        self.unfilled_placeholders.is_empty()
    }

    /// Complete the partial prompt and return the completed prompt.
    /// Returns an error if there are still unfilled placeholders.
    pub fn complete(&self) -> Result<String, PromptError> {
        if self.is_complete() {
            Ok(replace_all_placeholders(self.template.str(), &self.placeholder_to_vals))
        } else {
            let mut all_placeholders: Vec<String> = self.template.placeholders.iter().cloned().collect();
            let mut unfilled_placeholders: Vec<String> = self.unfilled_placeholders.iter().cloned().collect();
            all_placeholders.sort();
            unfilled_placeholders.sort();
            Err(PromptError::UnfilledPlaceholders { all_placeholders, unfilled_placeholders })
        }
    }
}

/// A prompt template with placeholders. It can also have metadata in JSON format.
#[derive(Debug, Clone)]
#[readonly::make]
pub struct PromptTemplate {
    /// The template of the partial prompt, immutable
    template: Arc<String>,

    /// The placeholders in the template, readonly
    #[readonly]
    pub placeholders: HashSet<String>,

    /// The metadata of the prompt template, readonly
    #[readonly]
    pub meta_data: Arc<JsonMap>,
}

impl PromptTemplate {
    /// Create a prompt template from a string without metadata.
    pub fn new(template: impl Into<String>) -> Self {
        Self::with_metadata(template, JsonMap::new())
    }

    /// Create a prompt template from a string with metadata. Warns if the template does not have any placeholder.
    pub fn with_metadata(template: impl Into<String>, metadata: JsonMap) -> Self {
        let template = template.into();
        let placeholders = get_placeholders(&template);
        if placeholders.is_empty() {
            warn!("Your prompt template does not have a placeholder. If this is intended, ignore this message. \
            Otherwise, check whether you have written placeholders correctly.\n\
            Got prompt template:\n\
            {}", template);
        }
        Self {
            template: Arc::new(template),
            meta_data: Arc::new(metadata),
            placeholders,
        }
    }

    /// Get the prompt template as a string.
    #[inline]
    pub fn str(&self) -> &str {
        &self.template
    }

    /// Construct a partial prompt from the prompt template.
    pub fn construct_prompt(&self) -> PartialPrompt {
        PartialPrompt {
            template: self.clone(),
            placeholder_to_vals: self.placeholders.iter().map(|p| (p.clone(), None)).collect(),
            unfilled_placeholders: self.placeholders.clone(),
        }
    }

    /// Shortcut for `construct_prompt` + `fill_from` + `complete`.
    pub fn render(&self, filler: &impl Fill) -> Result<String, PromptError> {
        self.construct_prompt().fill_from(filler)?.complete()
    }
}

pub mod errors {
    use std::collections::HashSet;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum PromptError {
        /// Tried to complete a partial prompt while some placeholders are still unfilled.
        #[error("to complete the prompt template, requires placeholders {all_placeholders:?}, unfilled placeholders {unfilled_placeholders:?}")]
        UnfilledPlaceholders {
            all_placeholders: Vec<String>,
            unfilled_placeholders: Vec<String>,
        },
        /// Tried to fill a placeholder that does not exist in the template.
        #[error("try to fill placeholder = {try_fill_placeholder} with value = {value}, but available placeholders are {available_placeholders:?}")]
        PlaceholderNotExist {
            try_fill_placeholder: String,
            value: String,
            available_placeholders: Vec<String>,
        },
    }

    impl PromptError {
        pub(crate) fn placeholder_not_exist(try_fill_placeholder: impl Into<String>,
                                            value: impl Into<String>,
                                            available_placeholders: &HashSet<String>) -> Self {
            let mut available_placeholders: Vec<String> = available_placeholders.iter().cloned().collect();
            available_placeholders.sort();
            PromptError::PlaceholderNotExist {
                try_fill_placeholder: try_fill_placeholder.into(),
                value: value.into(),
                available_placeholders,
            }
        }
    }
}

#[cfg(test)]
mod test_prompt {
    use super::PromptTemplate;
    use super::errors::PromptError;

    #[test]
    fn test_complete() {
        let template = PromptTemplate::new("Summarize {{transcript}} in {{language}}.");
        let prompt = template
            .construct_prompt()
            .fill("transcript", "hello world")
            .fill("language", "English")
            .complete()
            .unwrap();
        assert_eq!("Summarize hello world in English.", prompt);
    }

    #[test]
    fn test_unfilled() {
        let template = PromptTemplate::new("{{a}} {{b}}");
        let mut partial = template.construct_prompt();
        partial.fill("a", "x");
        match partial.complete() {
            Err(PromptError::UnfilledPlaceholders { unfilled_placeholders, all_placeholders }) => {
                assert_eq!(vec!["b".to_string()], unfilled_placeholders);
                assert_eq!(vec!["a".to_string(), "b".to_string()], all_placeholders);
            }
            other => panic!("expect unfilled placeholders, got {:?}", other),
        }
    }

    #[test]
    fn test_try_fill_unknown() {
        let template = PromptTemplate::new("{{a}}");
        let err = template.construct_prompt().try_fill("b", "x").map(|_| ()).unwrap_err();
        assert!(matches!(err, PromptError::PlaceholderNotExist { .. }));
    }

    #[test]
    fn test_fill_if_present_ignores_unknown() {
        let template = PromptTemplate::new("{{a}}");
        let prompt = template
            .construct_prompt()
            .fill_if_present("b", "ignored")
            .fill_if_present("a", "kept")
            .complete()
            .unwrap();
        assert_eq!("kept", prompt);
    }
}
