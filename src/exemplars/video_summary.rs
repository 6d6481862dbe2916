//! YouTube video summarizer: summary, key topics and, on request, questions and answers, either from a
//! video URL or from a transcript pasted by the user.

use std::sync::Arc;
use log::{debug, info};
use crate::filler::{fill_present, Fill};
use crate::pipeline::{run_step, PipelineError, RunResult};
use crate::prompt::errors::PromptError;
use crate::prompt::{PartialPrompt, PromptTemplate};
use crate::utils::fetch::FetchTranscript;
use crate::utils::llm::{generate_text, Generate};
use crate::utils::postprocess::lines::non_empty_lines;

pub const PIPELINE: &str = "video_summary";

pub const SUMMARY_TEMPLATE_STR: &str = "Topic wise summarize the following YouTube video transcript :\n\n{{transcript}}\n\n Topic Wise Summary:";

pub const TOPICS_TEMPLATE_STR: &str = "Extract key topics from the following summary:\n\n{{summary}}\n\n Only give Key Topics where each topic is in next line:";

pub const QUESTIONS_TEMPLATE_STR: &str = "Generate questions based on the following topics:\n\n{{topics}}\n\n Topic wise Questions:";

pub const ANSWERS_TEMPLATE_STR: &str = "Based on the following transcript, provide answers to the questions:\n\n\
Transcript: {{transcript}}\n\nQuestions: {{questions}}\n\n Provide detailed answers for each question. Example format:\n\n \
Question: \n Answer: \n\n Question: \n Answer: \n\n";

#[derive(Debug, Clone, Default)]
#[readonly::make]
pub struct VideoRecord {
    /// Transcript supplied by the user. When non-empty, no video is looked up. read-only.
    #[readonly]
    pub input_transcript: String,
    #[readonly]
    pub video_url: String,
    #[readonly]
    pub want_questions: bool,
    /// Only honored together with `want_questions`. read-only.
    #[readonly]
    pub want_answers: bool,
    pub video_id: Option<String>,
    pub transcript: String,
    pub summary: String,
    pub topics: Vec<String>,
    pub questions: String,
    pub qa: String,
}

impl VideoRecord {
    pub fn new(input_transcript: impl Into<String>,
               video_url: impl Into<String>,
               want_questions: bool,
               want_answers: bool) -> Self {
        Self {
            input_transcript: input_transcript.into(),
            video_url: video_url.into(),
            want_questions,
            want_answers,
            ..Default::default()
        }
    }

    pub fn has_input_transcript(&self) -> bool {
        !self.input_transcript.trim().is_empty()
    }

    /// The text to show the user last: the Q&A when answers were requested, otherwise the questions.
    pub fn follow_up(&self) -> Option<&str> {
        if self.want_questions && self.want_answers {
            Some(self.qa.as_str())
        } else if self.want_questions {
            Some(self.questions.as_str())
        } else {
            None
        }
    }
}

impl Fill for VideoRecord {
    fn fill(&self, partial_prompt: &mut PartialPrompt) -> Result<(), PromptError> {
        fill_present(partial_prompt, [
            ("transcript", self.transcript.clone()),
            ("summary", self.summary.clone()),
            ("topics", self.topics.join(", ")),
            ("questions", self.questions.clone()),
        ]);
        Ok(())
    }
}

/// Extracts the video id from `...?v=ID[&...]` or `youtu.be/ID[?...]`. The id may come out empty.
pub fn parse_video_id(video_url: &str) -> Option<&str> {
    if let Some((_, rest)) = video_url.split_once("v=") {
        rest.split('&').next()
    } else if let Some((_, rest)) = video_url.split_once("youtu.be/") {
        rest.split('?').next()
    } else {
        None
    }
}

pub struct VideoSummary {
    endpoint: Arc<dyn Generate>,
    transcripts: Arc<dyn FetchTranscript>,
    summary_template: PromptTemplate,
    topics_template: PromptTemplate,
    questions_template: PromptTemplate,
    answers_template: PromptTemplate,
}

impl VideoSummary {
    pub fn new(endpoint: Arc<dyn Generate>, transcripts: Arc<dyn FetchTranscript>) -> Self {
        Self {
            endpoint,
            transcripts,
            summary_template: PromptTemplate::new(SUMMARY_TEMPLATE_STR),
            topics_template: PromptTemplate::new(TOPICS_TEMPLATE_STR),
            questions_template: PromptTemplate::new(QUESTIONS_TEMPLATE_STR),
            answers_template: PromptTemplate::new(ANSWERS_TEMPLATE_STR),
        }
    }

    /// get_video_id -> get_transcript -> summarize -> extract_topics -> generate_questions -> generate_answers
    pub async fn run(&self, mut record: VideoRecord) -> RunResult<VideoRecord> {
        info!("{}: started, transcript supplied: {}", PIPELINE, record.has_input_transcript());
        run_step!(PIPELINE, "get_video_id", record, self.get_video_id(&mut record));
        run_step!(PIPELINE, "get_transcript", record, self.get_transcript(&mut record).await);
        run_step!(PIPELINE, "summarize", record, self.summarize(&mut record).await);
        run_step!(PIPELINE, "extract_topics", record, self.extract_topics(&mut record).await);
        run_step!(PIPELINE, "generate_questions", record, self.generate_questions(&mut record).await);
        run_step!(PIPELINE, "generate_answers", record, self.generate_answers(&mut record).await);
        info!("{}: finished with {} topics", PIPELINE, record.topics.len());
        Ok(record)
    }

    pub fn get_video_id(&self, record: &mut VideoRecord) -> Result<(), PipelineError> {
        if record.has_input_transcript() {
            return Ok(());
        }
        let video_id = parse_video_id(&record.video_url).ok_or_else(|| PipelineError::input("Invalid YouTube URL"))?;
        record.video_id = Some(video_id.to_string());
        Ok(())
    }

    pub async fn get_transcript(&self, record: &mut VideoRecord) -> Result<(), PipelineError> {
        if record.has_input_transcript() {
            record.transcript = record.input_transcript.clone();
            return Ok(());
        }
        let video_id = record.video_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PipelineError::input("Invalid or missing video ID"))?;
        record.transcript = self.transcripts.fetch_transcript(video_id).await?;
        debug!("transcript of video {} has {} chars", video_id, record.transcript.len());
        Ok(())
    }

    pub async fn summarize(&self, record: &mut VideoRecord) -> Result<(), PipelineError> {
        let prompt = self.summary_template.render(&*record)?;
        record.summary = generate_text(self.endpoint.as_ref(), &prompt).await?;
        Ok(())
    }

    pub async fn extract_topics(&self, record: &mut VideoRecord) -> Result<(), PipelineError> {
        let prompt = self.topics_template.render(&*record)?;
        let reply = generate_text(self.endpoint.as_ref(), &prompt).await?;
        record.topics = non_empty_lines(&reply);
        Ok(())
    }

    pub async fn generate_questions(&self, record: &mut VideoRecord) -> Result<(), PipelineError> {
        if !record.want_questions {
            return Ok(());
        }
        let prompt = self.questions_template.render(&*record)?;
        record.questions = generate_text(self.endpoint.as_ref(), &prompt).await?;
        Ok(())
    }

    pub async fn generate_answers(&self, record: &mut VideoRecord) -> Result<(), PipelineError> {
        if !(record.want_questions && record.want_answers) {
            return Ok(());
        }
        let prompt = self.answers_prompt(record)?;
        record.qa = generate_text(self.endpoint.as_ref(), &prompt).await?;
        Ok(())
    }

    pub fn answers_prompt(&self, record: &VideoRecord) -> Result<String, PromptError> {
        self.answers_template.render(record)
    }
}

#[cfg(test)]
mod test_video_summary {
    use std::sync::Arc;
    use super::{parse_video_id, VideoRecord, VideoSummary};
    use crate::pipeline::PipelineError;
    use crate::testing::{ScriptedEndpoint, StaticTranscripts};
    use crate::utils::llm::GenerationError;

    fn endpoint() -> Arc<ScriptedEndpoint> {
        Arc::new(ScriptedEndpoint::new()
            .reply("Topic wise summarize", "a summary")
            .reply("Extract key topics", "Rust\n\n  Ownership \n")
            .reply("Generate questions", "Q1?\nQ2?")
            .reply("provide answers", "Q1? A1.\nQ2? A2."))
    }

    #[test]
    fn test_parse_video_id() {
        assert_eq!(Some("abc123"), parse_video_id("https://www.youtube.com/watch?v=abc123&t=42s"));
        assert_eq!(Some("abc123"), parse_video_id("https://youtu.be/abc123?si=xyz"));
        assert_eq!(Some(""), parse_video_id("https://www.youtube.com/watch?v="));
        assert_eq!(None, parse_video_id("not-a-url"));
    }

    #[tokio::test]
    async fn test_from_video_url() {
        let endpoint = endpoint();
        let transcripts = Arc::new(StaticTranscripts::with("abc123", "fetched words"));
        let app = VideoSummary::new(endpoint.clone(), transcripts.clone());
        let record = app.run(VideoRecord::new("", "https://youtu.be/abc123", true, false)).await.unwrap();

        assert_eq!(Some("abc123".to_string()), record.video_id);
        assert_eq!("fetched words", record.transcript);
        assert_eq!("a summary", record.summary);
        assert_eq!(vec!["Rust", "Ownership"], record.topics);
        assert_eq!("Q1?\nQ2?", record.questions);
        assert!(record.qa.is_empty());
        assert_eq!(Some("Q1?\nQ2?"), record.follow_up());
        assert!(endpoint.prompts().iter().any(|p| p.contains("Rust, Ownership")));
        assert_eq!(0, endpoint.count_containing("provide answers"));
    }

    #[tokio::test]
    async fn test_input_transcript_bypasses_video() {
        let endpoint = endpoint();
        let transcripts = Arc::new(StaticTranscripts::default());
        let app = VideoSummary::new(endpoint.clone(), transcripts.clone());
        let record = app.run(VideoRecord::new("pasted words", "not-a-url", true, true)).await.unwrap();

        assert_eq!(None, record.video_id);
        assert_eq!("pasted words", record.transcript);
        assert!(transcripts.requested.lock().unwrap().is_empty());
        assert_eq!("Q1? A1.\nQ2? A2.", record.qa);
        assert_eq!(Some("Q1? A1.\nQ2? A2."), record.follow_up());
    }

    #[tokio::test]
    async fn test_invalid_url_short_circuits() {
        let endpoint = endpoint();
        let app = VideoSummary::new(endpoint.clone(), Arc::new(StaticTranscripts::default()));
        let failure = app.run(VideoRecord::new("", "not-a-url", true, true)).await.unwrap_err();

        assert_eq!("get_video_id", failure.step);
        assert!(matches!(failure.error, PipelineError::Input(ref message) if message == "Invalid YouTube URL"));
        let record = failure.record;
        assert!(record.summary.is_empty() && record.topics.is_empty());
        assert!(record.questions.is_empty() && record.qa.is_empty());
        assert!(endpoint.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_video_id() {
        let app = VideoSummary::new(endpoint(), Arc::new(StaticTranscripts::default()));
        let failure = app.run(VideoRecord::new("", "https://www.youtube.com/watch?v=&t=1", false, false)).await.unwrap_err();
        assert_eq!("get_transcript", failure.step);
        assert_eq!("Invalid or missing video ID", failure.error.to_string());
    }

    #[tokio::test]
    async fn test_missing_captions() {
        let endpoint = endpoint();
        let app = VideoSummary::new(endpoint.clone(), Arc::new(StaticTranscripts::default()));
        let failure = app.run(VideoRecord::new("", "https://youtu.be/nocaps", false, false)).await.unwrap_err();
        assert_eq!("get_transcript", failure.step);
        assert!(matches!(failure.error, PipelineError::Fetch(_)));
        assert!(failure.record.summary.is_empty());
        assert!(endpoint.calls().is_empty());
    }

    #[tokio::test]
    async fn test_blank_summary_fails_the_run() {
        let endpoint = Arc::new(ScriptedEndpoint::new()
            .reply("Topic wise summarize", "")
            .reply("Extract key topics", "Rust"));
        let app = VideoSummary::new(endpoint.clone(), Arc::new(StaticTranscripts::default()));
        let failure = app.run(VideoRecord::new("words", "", false, false)).await.unwrap_err();
        assert_eq!("summarize", failure.step);
        assert!(matches!(failure.error, PipelineError::Generation(GenerationError::EmptyReply)));
        assert!(failure.record.topics.is_empty());
        assert_eq!(0, endpoint.count_containing("Extract key topics"));
    }

    #[tokio::test]
    async fn test_blank_input_transcript_falls_back_to_url() {
        let transcripts = Arc::new(StaticTranscripts::with("abc123", "fetched words"));
        let app = VideoSummary::new(endpoint(), transcripts);
        let record = app.run(VideoRecord::new("  \n", "https://youtu.be/abc123", false, false)).await.unwrap();
        assert_eq!("fetched words", record.transcript);
    }

    #[tokio::test]
    async fn test_answers_need_questions() {
        let endpoint = endpoint();
        let app = VideoSummary::new(endpoint.clone(), Arc::new(StaticTranscripts::default()));
        let record = app.run(VideoRecord::new("words", "", false, true)).await.unwrap();
        assert!(record.questions.is_empty() && record.qa.is_empty());
        assert_eq!(None, record.follow_up());
        assert_eq!(2, endpoint.calls().len());
    }

    #[test]
    fn test_answers_prompt_is_deterministic() {
        let app = VideoSummary::new(endpoint(), Arc::new(StaticTranscripts::default()));
        let mut record = VideoRecord::new("", "", true, true);
        record.transcript = "words".to_string();
        record.questions = "Q1?".to_string();
        let prompt = app.answers_prompt(&record).unwrap();
        assert_eq!(prompt, app.answers_prompt(&record).unwrap());
        assert!(prompt.contains("Transcript: words\n\nQuestions: Q1?"));
    }
}
