//! Professional writing assistant: decide whether the request is an email or something for LinkedIn, and
//! for LinkedIn whether it is a post or a direct message, then draft it.
//!
//! The run is a small state machine. Classification replies are parsed into closed enums, so the routers
//! match exhaustively and an unrecognized classification fails the run.

use std::sync::Arc;
use log::info;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use crate::filler::{fill_present, Fill};
use crate::pipeline::{run_step, PipelineError, RunResult};
use crate::prompt::errors::PromptError;
use crate::prompt::{PartialPrompt, PromptTemplate};
use crate::utils::llm::{generate_structured, generate_text, Generate};

pub const PIPELINE: &str = "writing_assistant";

pub const PLATFORM_TEMPLATE_STR: &str = "For given input by user identify whether the task needs to be performed on LinkedIn or Mail.\n Input : {{user_input}}";

pub const TASK_TEMPLATE_STR: &str = "For given input by user identify whether it is about a LinkedIn post or a LinkedIn message \n Input : {{user_input}}";

pub const MAIL_TEMPLATE_STR: &str = "User wants to write a Mail. Understand the purpose of the mail and write a mail as described below. \
Do not add any chart or table in the mail\n User Input: {{user_input}}\n Mail Draft:\n";

pub const POST_TEMPLATE_STR: &str = "User wants to write a LinkedIn post. Understand the purpose and content requirements of the post and \
write a professional LinkedIn post as described below.\n User Input: {{user_input}}\n Post Draft:\n";

pub const MESSAGE_TEMPLATE_STR: &str = "User wants to write a personal message through their account. Understand the purpose of this \
message (to get connected, to reach HR, to seek help from a mentor or something else) and write a professional or semi-professional \
message on their behalf as described below.\n User Input: {{user_input}}\n Write a short message which effectively communicates all \
the points mentioned.\n Message Draft:\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Platform {
    Mail,
    LinkedIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum LinkedInTask {
    Post,
    Message,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PlatformReply {
    /// Where will the task get executed? Mail or LinkedIn
    pub platform: Platform,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TaskReply {
    /// What is the task the user wants to perform? a Message or Post
    pub task: LinkedInTask,
}

#[derive(Debug, Clone, Default)]
#[readonly::make]
pub struct WritingRecord {
    #[readonly]
    pub user_input: String,
    pub platform: Option<Platform>,
    /// Only classified for LinkedIn requests.
    pub linkedin_task: Option<LinkedInTask>,
    pub email: String,
    pub linkedin_content: String,
}

impl WritingRecord {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            ..Default::default()
        }
    }

    /// The drafted text, whichever branch wrote it.
    pub fn draft(&self) -> &str {
        match self.platform {
            Some(Platform::Mail) => &self.email,
            _ => &self.linkedin_content,
        }
    }
}

impl Fill for WritingRecord {
    fn fill(&self, partial_prompt: &mut PartialPrompt) -> Result<(), PromptError> {
        fill_present(partial_prompt, [("user_input", self.user_input.clone())]);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ClassifyPlatform,
    ClassifyTask,
    DraftMail,
    DraftPost,
    DraftMessage,
}

impl Step {
    pub fn name(self) -> &'static str {
        match self {
            Step::ClassifyPlatform => "classify_platform",
            Step::ClassifyTask => "classify_task",
            Step::DraftMail => "draft_mail",
            Step::DraftPost => "draft_post",
            Step::DraftMessage => "draft_message",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Step::DraftMail | Step::DraftPost | Step::DraftMessage)
    }
}

/// Mail requests are drafted right away, everything else goes through task classification.
pub fn which_platform(record: &WritingRecord) -> Step {
    match record.platform {
        Some(Platform::Mail) => Step::DraftMail,
        Some(Platform::LinkedIn) | None => Step::ClassifyTask,
    }
}

pub fn which_task(record: &WritingRecord) -> Step {
    match record.linkedin_task {
        Some(LinkedInTask::Post) => Step::DraftPost,
        Some(LinkedInTask::Message) | None => Step::DraftMessage,
    }
}

pub struct WritingAssistant {
    endpoint: Arc<dyn Generate>,
    platform_template: PromptTemplate,
    task_template: PromptTemplate,
    mail_template: PromptTemplate,
    post_template: PromptTemplate,
    message_template: PromptTemplate,
}

impl WritingAssistant {
    pub fn new(endpoint: Arc<dyn Generate>) -> Self {
        Self {
            endpoint,
            platform_template: PromptTemplate::new(PLATFORM_TEMPLATE_STR),
            task_template: PromptTemplate::new(TASK_TEMPLATE_STR),
            mail_template: PromptTemplate::new(MAIL_TEMPLATE_STR),
            post_template: PromptTemplate::new(POST_TEMPLATE_STR),
            message_template: PromptTemplate::new(MESSAGE_TEMPLATE_STR),
        }
    }

    pub async fn run(&self, mut record: WritingRecord) -> RunResult<WritingRecord> {
        info!("{}: started", PIPELINE);
        let mut step = Step::ClassifyPlatform;
        loop {
            run_step!(PIPELINE, step.name(), record, self.execute(step, &mut record).await);
            if step.is_terminal() {
                break;
            }
            step = match step {
                Step::ClassifyPlatform => which_platform(&record),
                _ => which_task(&record),
            };
        }
        info!("{}: drafted for {:?}/{:?}", PIPELINE, record.platform, record.linkedin_task);
        Ok(record)
    }

    pub async fn execute(&self, step: Step, record: &mut WritingRecord) -> Result<(), PipelineError> {
        match step {
            Step::ClassifyPlatform => {
                let prompt = self.platform_template.render(&*record)?;
                let reply: PlatformReply = generate_structured(self.endpoint.as_ref(), &prompt).await?;
                record.platform = Some(reply.platform);
            }
            Step::ClassifyTask => {
                let prompt = self.task_template.render(&*record)?;
                let reply: TaskReply = generate_structured(self.endpoint.as_ref(), &prompt).await?;
                record.linkedin_task = Some(reply.task);
            }
            Step::DraftMail => {
                let prompt = self.mail_template.render(&*record)?;
                record.email = generate_text(self.endpoint.as_ref(), &prompt).await?;
            }
            Step::DraftPost => {
                let prompt = self.post_template.render(&*record)?;
                record.linkedin_content = generate_text(self.endpoint.as_ref(), &prompt).await?;
            }
            Step::DraftMessage => {
                let prompt = self.message_template.render(&*record)?;
                record.linkedin_content = generate_text(self.endpoint.as_ref(), &prompt).await?;
            }
        }
        Ok(())
    }
}
