use std::sync::Arc;
use anyhow::{bail, Result};
use clap::Parser;
use promptline::exemplars::writing_assistant::{WritingAssistant, WritingRecord};
use promptline::utils::llm::{EndpointConfig, OpenAIEndpoint};

/// Draft an email, a LinkedIn post or a LinkedIn message from a description
#[derive(Parser, Debug)]
struct Args {
    /// What you want to write
    request: String,

    /// Hugging Face API token, defaults to HUGGINGFACEHUB_API_TOKEN
    #[arg(long)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if args.request.trim().is_empty() {
        bail!("Please describe what you want to write.");
    }

    let endpoint = Arc::new(OpenAIEndpoint::new(EndpointConfig::from_env_with_key(args.api_key)?));
    let record = WritingAssistant::new(endpoint).run(WritingRecord::new(args.request)).await?;

    match (record.platform, record.linkedin_task) {
        (Some(platform), Some(task)) => println!("## {:?} {:?}\n", platform, task),
        (Some(platform), None) => println!("## {:?}\n", platform),
        _ => {}
    }
    println!("{}", record.draft());
    Ok(())
}
