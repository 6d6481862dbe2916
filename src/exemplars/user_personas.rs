//! User persona generator: extract the kinds of users from a free-text description, then write one
//! detailed persona per user kind.

use std::cmp::Ordering;
use std::sync::Arc;
use log::{debug, info};
use schemars::JsonSchema;
use serde::Deserialize;
use crate::filler::{fill_present, Fill};
use crate::pipeline::{run_step, PipelineError, RunFailure, RunResult};
use crate::prompt::errors::PromptError;
use crate::prompt::{PartialPrompt, PromptTemplate};
use crate::utils::llm::{generate_structured, generate_text, Generate};

pub const PIPELINE: &str = "user_personas";

pub const USERS_TEMPLATE_STR: &str = "From the given input text extract the user profiles. Examples: Doctor, Engineer, Driver, \
Farmer, etc.\n Input: {{users}}\n";

pub const PERSONA_TEMPLATE_STR: &str = "User has a product, whose details are : {{product_details}}\n \
The market details where the product is going are : {{market_details}}\n \
Analyse the product details and market details and generate a User persona for\n User: {{user}}\n\n\
**1. Header / Basic Info**\n\
* Persona name (fictional, e.g. \"Tech-Savvy Tara\"), title or role\n\
* Demographics: age, location, education level, occupation or industry, other relevant traits\n\n\
**2. Background / Context**\n\
* Short biography, contexts in which they use the product\n\
* Experience with technology (beginner / intermediate / expert) and everyday environment\n\n\
**3. Goals & Motivations**\n\
* Short-term and long-term goals, and what drives them\n\n\
**4. Behaviors & Preferences**\n\
* How they use similar products now, how often and where\n\
* Technology preferences and learning style\n\n\
**5. Pain Points / Challenges**\n\
* Frustrations and recurring problems in this domain\n\n\
**6. Needs**\n\
* Features or support that would help most, expectations from a solution\n\n\
**7. A Day in the Life**\n\
* A short narrative of a typical day and where the product fits in\n\n\
**8. Quote / Voice**\n\
* A quote capturing their attitude or frustration\n\n\
**9. Personality & Psychographics**\n\
* Traits, values and attitudes towards technology and change\n\n\
**10. Technical / Environmental Constraints**\n\
* Devices, network constraints, accessibility needs\n\n\
**11. Preferred Channels & Influences**\n\
* Where they research and get help, which brands or platforms they trust\n\n\
**12. Opportunities / Solution Ideas** (optional)\n\
* Product improvements that would resonate with this persona\n\n\
**13. Measuring Success** (optional)\n\
* Metrics showing the product satisfies their needs\n\n \
consider additional details provided by the user: {{additional_details}}\n Response";

/// User kinds found in a description.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, JsonSchema)]
pub struct Users {
    /// List of product users
    pub users: Vec<String>,
}

/// Decision taken before every persona generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iteration {
    Continue,
    Terminate,
}

#[derive(Debug, Clone, Default)]
#[readonly::make]
pub struct PersonaRecord {
    #[readonly]
    pub product_details: String,
    #[readonly]
    pub market_details: String,
    #[readonly]
    pub additional_details: String,
    /// Free-text description of who uses the product. read-only.
    #[readonly]
    pub users: String,
    pub user_list: Vec<String>,
    /// Fixed once `user_list` is extracted.
    pub user_count: usize,
    /// Number of personas generated so far.
    pub counter: usize,
    pub personas: Vec<String>,
}

impl PersonaRecord {
    pub fn new(product_details: impl Into<String>,
               market_details: impl Into<String>,
               additional_details: impl Into<String>,
               users: impl Into<String>) -> Self {
        Self {
            product_details: product_details.into(),
            market_details: market_details.into(),
            additional_details: additional_details.into(),
            users: users.into(),
            ..Default::default()
        }
    }

    /// Pairs of (user kind, persona) generated so far.
    pub fn user_personas(&self) -> impl Iterator<Item=(&str, &str)> + '_ {
        self.user_list.iter().map(String::as_str).zip(self.personas.iter().map(String::as_str))
    }
}

impl Fill for PersonaRecord {
    fn fill(&self, partial_prompt: &mut PartialPrompt) -> Result<(), PromptError> {
        fill_present(partial_prompt, [
            ("product_details", self.product_details.clone()),
            ("market_details", self.market_details.clone()),
            ("additional_details", self.additional_details.clone()),
            ("users", self.users.clone()),
        ]);
        Ok(())
    }
}

/// Continue while personas are missing, terminate once every user kind has one.
pub fn next_iteration(record: &PersonaRecord) -> Result<Iteration, PipelineError> {
    match record.counter.cmp(&record.user_count) {
        Ordering::Less => Ok(Iteration::Continue),
        Ordering::Equal => Ok(Iteration::Terminate),
        Ordering::Greater => Err(PipelineError::Invariant(
            format!("persona counter {} overran user count {}", record.counter, record.user_count))),
    }
}

pub struct UserPersonas {
    endpoint: Arc<dyn Generate>,
    users_template: PromptTemplate,
    persona_template: PromptTemplate,
}

impl UserPersonas {
    pub fn new(endpoint: Arc<dyn Generate>) -> Self {
        Self {
            endpoint,
            users_template: PromptTemplate::new(USERS_TEMPLATE_STR),
            persona_template: PromptTemplate::new(PERSONA_TEMPLATE_STR),
        }
    }

    /// extract_users -> generate_persona while next_iteration continues
    pub async fn run(&self, mut record: PersonaRecord) -> RunResult<PersonaRecord> {
        info!("{}: started", PIPELINE);
        run_step!(PIPELINE, "extract_users", record, self.extract_users(&mut record).await);
        loop {
            match next_iteration(&record) {
                Ok(Iteration::Continue) => {
                    run_step!(PIPELINE, "generate_persona", record, self.generate_persona(&mut record).await)
                }
                Ok(Iteration::Terminate) => break,
                Err(error) => return Err(RunFailure::new(PIPELINE, "next_iteration", error, record)),
            }
        }
        info!("{}: generated {} personas", PIPELINE, record.personas.len());
        Ok(record)
    }

    pub async fn extract_users(&self, record: &mut PersonaRecord) -> Result<(), PipelineError> {
        let prompt = self.users_template.render(&*record)?;
        let users: Users = generate_structured(self.endpoint.as_ref(), &prompt).await?;
        record.user_count = users.users.len();
        record.user_list = users.users;
        record.counter = 0;
        debug!("extracted users {:?}", record.user_list);
        Ok(())
    }

    /// Writes the persona of `user_list[counter]` and advances the counter.
    pub async fn generate_persona(&self, record: &mut PersonaRecord) -> Result<(), PipelineError> {
        let prompt = self.persona_prompt(record)?;
        let persona = generate_text(self.endpoint.as_ref(), &prompt).await?;
        record.personas.push(persona);
        record.counter += 1;
        Ok(())
    }

    pub fn persona_prompt(&self, record: &PersonaRecord) -> Result<String, PipelineError> {
        let user = record.user_list.get(record.counter).ok_or_else(|| PipelineError::Invariant(
            format!("no user kind at index {} of {}", record.counter, record.user_list.len())))?;
        let prompt = self.persona_template
            .construct_prompt()
            .fill_from(record)?
            .try_fill("user", user.as_str())?
            .complete()?;
        Ok(prompt)
    }
}
