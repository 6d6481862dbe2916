use std::sync::Arc;
use anyhow::{bail, Result};
use clap::Parser;
use promptline::exemplars::research_papers::{PaperRecord, ResearchPapers};
use promptline::utils::fetch::SemanticScholar;
use promptline::utils::llm::{EndpointConfig, OpenAIEndpoint};

/// Get research papers on a topic and summarize them
#[derive(Parser, Debug)]
struct Args {
    /// Research topic
    topic: String,

    /// Number of top papers to fetch
    #[arg(short = 'n', long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=10))]
    top_search: u8,

    /// Hugging Face API token, defaults to HUGGINGFACEHUB_API_TOKEN
    #[arg(long)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if args.topic.trim().is_empty() {
        bail!("Please enter a research topic.");
    }

    let endpoint = Arc::new(OpenAIEndpoint::new(EndpointConfig::from_env_with_key(args.api_key)?));
    let app = ResearchPapers::new(endpoint, Arc::new(SemanticScholar::new()));
    let record = app.run(PaperRecord::new(args.topic, args.top_search as usize)).await?;

    println!("## Summarized Result\n");
    println!("{}", record.summary);
    Ok(())
}
