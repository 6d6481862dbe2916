use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{bail, Result};
use clap::Parser;
use promptline::exemplars::video_summary::{VideoRecord, VideoSummary};
use promptline::utils::fetch::YouTubeTranscripts;
use promptline::utils::llm::{EndpointConfig, OpenAIEndpoint};

/// Summarize a YouTube video and optionally generate questions and answers
#[derive(Parser, Debug)]
struct Args {
    /// YouTube video URL
    #[arg(short, long, default_value = "")]
    url: String,

    /// Read the transcript from a file instead of fetching it
    #[arg(short, long)]
    transcript: Option<PathBuf>,

    /// Generate questions
    #[arg(short, long)]
    questions: bool,

    /// Generate answers to the questions
    #[arg(short, long, requires = "questions")]
    answers: bool,

    /// Hugging Face API token, defaults to HUGGINGFACEHUB_API_TOKEN
    #[arg(long)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let input_transcript = match &args.transcript {
        Some(path) => fs::read_to_string(path)?,
        None => String::new(),
    };
    if args.url.trim().is_empty() && input_transcript.trim().is_empty() {
        bail!("Please enter a valid YouTube video URL or provide a transcript.");
    }

    let endpoint = Arc::new(OpenAIEndpoint::new(EndpointConfig::from_env_with_key(args.api_key)?));
    let app = VideoSummary::new(endpoint, Arc::new(YouTubeTranscripts::new()));
    let record = app
        .run(VideoRecord::new(input_transcript, args.url, args.questions, args.answers))
        .await?;

    println!("## Video Summary\n\n{}\n", record.summary);
    if let Some(follow_up) = record.follow_up() {
        let title = if args.answers { "Generated Q&A" } else { "Generated Questions" };
        println!("## {}\n\n{}", title, follow_up);
    }
    Ok(())
}
