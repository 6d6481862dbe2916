//! Project idea generator. In `Generate` mode it proposes project ideas for a set of skills and suggests
//! what to learn next; in `Refine` mode it turns a user's idea into an implementation guide.
//!
//! Four branches run concurrently and each of them only works in one mode, writing empty values in the
//! other. The first failing branch fails the whole run.

use std::future::Future;
use std::sync::Arc;
use log::info;
use schemars::JsonSchema;
use serde::Deserialize;
use crate::filler::{fill_present, Fill};
use crate::pipeline::{run_step, PipelineError, RunFailure, RunResult};
use crate::prompt::errors::PromptError;
use crate::prompt::{PartialPrompt, PromptTemplate};
use crate::utils::llm::{generate_structured, generate_text, Generate};

pub const PIPELINE: &str = "project_ideas";

pub const IDEAS_TEMPLATE_STR: &str = "Generate {{number_of_ideas}} project ideas in the domain of {{project_domain}}, \
which are based on skills {{skills}} and are of {{complexity_level}} level.";

pub const OTHER_SKILLS_TEMPLATE_STR: &str = "Suggest other relevant skills which get used to build projects in the domain \
of {{project_domain}} based on skills {{skills}} and of {{complexity_level}} level. Only give me the 4-5 skills, each on a \
new line, without any explanation.";

pub const REFINE_TEMPLATE_STR: &str = "User has given us input: {{input_idea}}, based on this input give me a redefined, \
well structured project idea and all specifications which the user has mentioned";

pub const STEPS_TEMPLATE_STR: &str = "give me steps to follow to complete the following project\n Project: {{refined_idea}}\n\n \
give me only steps. Give each step on a new line";

pub const SKILLS_REQUIRED_TEMPLATE_STR: &str = "For the given Project idea give me skills which are required to complete \
the project.\n Project Idea: {{input_idea}}\n Skills:";

pub const GUIDE_TEMPLATE_STR: &str = " For given Project idea: {{input_idea}}\n The Skills Required are: {{skills_required}}\n \
and Steps to follow for project completion are: {{steps_to_implement}}\n\n Now give me well structured and user friendly output as:\n \
An encouraging message based on the quality of project\n Project Title: \n\n Skills Required: \n\n Steps to follow: \n";

pub const IDEAS_RESPONSE_TEMPLATE_STR: &str = "For given input:\n Project domain:{{project_domain}}\n Skills learned:{{skills}}\n\n \
The generated project ideas with their descriptions are:\n{{project_ideas}}\n\n Draft well structured response to user based on \
the above data, which also includes a suggestion of additional skills to learn\n Additional skills: {{other_skills_to_learn}}\n\n \
Response:\n Encouraging message based on input data and complexity level {{complexity_level}} (Do not mention it is an encouraging \
message)\n Project and short description for all project ideas\n Other skills to learn:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdeaRequest {
    /// Propose new project ideas.
    Generate {
        project_domain: String,
        skills: String,
        complexity_level: String,
        number_of_ideas: usize,
    },
    /// Turn the user's own idea into an implementation guide.
    Refine {
        input_idea: String,
    },
}

impl Default for IdeaRequest {
    fn default() -> Self {
        IdeaRequest::Refine { input_idea: String::new() }
    }
}

/// Project ideas and matching descriptions, index by index.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, JsonSchema)]
pub struct ProjectIdeas {
    /// List of project ideas based on the input details
    pub project_idea: Vec<String>,
    /// List of project descriptions corresponding to each project idea
    pub project_description: Vec<String>,
}

#[derive(Debug, Clone, Default)]
#[readonly::make]
pub struct IdeaRecord {
    #[readonly]
    pub request: IdeaRequest,
    pub project_ideas: Vec<String>,
    pub project_descriptions: Vec<String>,
    pub other_skills_to_learn: String,
    pub steps_to_implement: String,
    pub skills_required: String,
    pub output: String,
}

impl IdeaRecord {
    pub fn new(request: IdeaRequest) -> Self {
        Self {
            request,
            ..Default::default()
        }
    }

    pub fn generate(project_domain: impl Into<String>,
                    skills: impl Into<String>,
                    complexity_level: impl Into<String>,
                    number_of_ideas: usize) -> Self {
        Self::new(IdeaRequest::Generate {
            project_domain: project_domain.into(),
            skills: skills.into(),
            complexity_level: complexity_level.into(),
            number_of_ideas,
        })
    }

    pub fn refine(input_idea: impl Into<String>) -> Self {
        Self::new(IdeaRequest::Refine { input_idea: input_idea.into() })
    }

    pub fn is_refine(&self) -> bool {
        matches!(self.request, IdeaRequest::Refine { .. })
    }

    fn render_ideas(&self) -> String {
        self.project_ideas
            .iter()
            .enumerate()
            .map(|(idx, idea)| match self.project_descriptions.get(idx) {
                Some(description) => format!("{}. {}: {}\n", idx + 1, idea, description),
                None => format!("{}. {}\n", idx + 1, idea),
            })
            .collect()
    }
}

impl Fill for IdeaRecord {
    fn fill(&self, partial_prompt: &mut PartialPrompt) -> Result<(), PromptError> {
        match &self.request {
            IdeaRequest::Generate { project_domain, skills, complexity_level, number_of_ideas } => {
                fill_present(partial_prompt, [
                    ("project_domain", project_domain.clone()),
                    ("skills", skills.clone()),
                    ("complexity_level", complexity_level.clone()),
                    ("number_of_ideas", number_of_ideas.to_string()),
                    ("project_ideas", self.render_ideas()),
                    ("other_skills_to_learn", self.other_skills_to_learn.clone()),
                ]);
            }
            IdeaRequest::Refine { input_idea } => {
                fill_present(partial_prompt, [
                    ("input_idea", input_idea.clone()),
                    ("skills_required", self.skills_required.clone()),
                    ("steps_to_implement", self.steps_to_implement.clone()),
                ]);
            }
        }
        Ok(())
    }
}

/// Tags a branch error with the branch name so a failed join can report its step.
async fn branch<T>(step: &'static str,
                   future: impl Future<Output=Result<T, PipelineError>>) -> Result<T, (&'static str, PipelineError)> {
    future.await.map_err(|error| (step, error))
}

pub struct ProjectIdeaGenerator {
    endpoint: Arc<dyn Generate>,
    ideas_template: PromptTemplate,
    other_skills_template: PromptTemplate,
    refine_template: PromptTemplate,
    steps_template: PromptTemplate,
    skills_required_template: PromptTemplate,
    guide_template: PromptTemplate,
    ideas_response_template: PromptTemplate,
}

impl ProjectIdeaGenerator {
    pub fn new(endpoint: Arc<dyn Generate>) -> Self {
        Self {
            endpoint,
            ideas_template: PromptTemplate::new(IDEAS_TEMPLATE_STR),
            other_skills_template: PromptTemplate::new(OTHER_SKILLS_TEMPLATE_STR),
            refine_template: PromptTemplate::new(REFINE_TEMPLATE_STR),
            steps_template: PromptTemplate::new(STEPS_TEMPLATE_STR),
            skills_required_template: PromptTemplate::new(SKILLS_REQUIRED_TEMPLATE_STR),
            guide_template: PromptTemplate::new(GUIDE_TEMPLATE_STR),
            ideas_response_template: PromptTemplate::new(IDEAS_RESPONSE_TEMPLATE_STR),
        }
    }

    /// (generate_project_ideas | suggest_other_skills | provide_steps_to_implement | provide_skills_required) -> finalize
    pub async fn run(&self, mut record: IdeaRecord) -> RunResult<IdeaRecord> {
        info!("{}: started in {} mode", PIPELINE, if record.is_refine() { "refine" } else { "generate" });
        let joined = futures::try_join!(
            branch("generate_project_ideas", self.generate_project_ideas(&record)),
            branch("suggest_other_skills", self.suggest_other_skills(&record)),
            branch("provide_steps_to_implement", self.provide_steps_to_implement(&record)),
            branch("provide_skills_required", self.provide_skills_required(&record)),
        );
        match joined {
            Ok((ideas, other_skills, steps, skills_required)) => {
                record.project_ideas = ideas.project_idea;
                record.project_descriptions = ideas.project_description;
                record.other_skills_to_learn = other_skills;
                record.steps_to_implement = steps;
                record.skills_required = skills_required;
            }
            Err((step, error)) => return Err(RunFailure::new(PIPELINE, step, error, record)),
        }
        run_step!(PIPELINE, "finalize", record, self.finalize(&mut record).await);
        info!("{}: finished", PIPELINE);
        Ok(record)
    }

    pub async fn generate_project_ideas(&self, record: &IdeaRecord) -> Result<ProjectIdeas, PipelineError> {
        if record.is_refine() {
            return Ok(ProjectIdeas::default());
        }
        let prompt = self.ideas_template.render(record)?;
        Ok(generate_structured(self.endpoint.as_ref(), &prompt).await?)
    }

    pub async fn suggest_other_skills(&self, record: &IdeaRecord) -> Result<String, PipelineError> {
        if record.is_refine() {
            return Ok(String::new());
        }
        let prompt = self.other_skills_template.render(record)?;
        Ok(generate_text(self.endpoint.as_ref(), &prompt).await?)
    }

    /// Refines the idea first, then asks for the steps of the refined idea.
    pub async fn provide_steps_to_implement(&self, record: &IdeaRecord) -> Result<String, PipelineError> {
        if !record.is_refine() {
            return Ok(String::new());
        }
        let prompt = self.refine_template.render(record)?;
        let refined_idea = generate_text(self.endpoint.as_ref(), &prompt).await?;
        let prompt = self.steps_template
            .construct_prompt()
            .try_fill("refined_idea", refined_idea)?
            .complete()?;
        Ok(generate_text(self.endpoint.as_ref(), &prompt).await?)
    }

    pub async fn provide_skills_required(&self, record: &IdeaRecord) -> Result<String, PipelineError> {
        if !record.is_refine() {
            return Ok(String::new());
        }
        let prompt = self.skills_required_template.render(record)?;
        Ok(generate_text(self.endpoint.as_ref(), &prompt).await?)
    }

    pub async fn finalize(&self, record: &mut IdeaRecord) -> Result<(), PipelineError> {
        let prompt = self.final_prompt(record)?;
        record.output = generate_text(self.endpoint.as_ref(), &prompt).await?;
        Ok(())
    }

    pub fn final_prompt(&self, record: &IdeaRecord) -> Result<String, PromptError> {
        if record.is_refine() {
            self.guide_template.render(record)
        } else {
            self.ideas_response_template.render(record)
        }
    }
}
