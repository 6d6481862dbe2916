use std::sync::Arc;
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use promptline::exemplars::project_ideas::{IdeaRecord, ProjectIdeaGenerator};
use promptline::utils::llm::{EndpointConfig, OpenAIEndpoint};

/// Generate project ideas or get implementation guidance for an existing idea
#[derive(Parser, Debug)]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Hugging Face API token, defaults to HUGGINGFACEHUB_API_TOKEN
    #[arg(long, global = true)]
    api_key: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Generate new project ideas
    Generate {
        /// Project domain, e.g. Web Development
        #[arg(short, long)]
        domain: String,
        /// Your current skills, e.g. "Python, SQL"
        #[arg(short, long)]
        skills: String,
        /// Beginner, Intermediate or Advanced
        #[arg(short, long, default_value = "Beginner")]
        complexity: String,
        /// Number of ideas to generate
        #[arg(short, long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=10))]
        number: u8,
    },
    /// Get an implementation guide for your own idea
    Refine {
        /// Your project idea
        idea: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let record = match args.mode {
        Mode::Generate { domain, skills, complexity, number } => {
            if domain.trim().is_empty() || skills.trim().is_empty() {
                bail!("Please fill in both project domain and skills.");
            }
            IdeaRecord::generate(domain, skills, complexity, number as usize)
        }
        Mode::Refine { idea } => {
            if idea.trim().is_empty() {
                bail!("Please describe your project idea.");
            }
            IdeaRecord::refine(idea)
        }
    };

    let endpoint = Arc::new(OpenAIEndpoint::new(EndpointConfig::from_env_with_key(args.api_key)?));
    let record = ProjectIdeaGenerator::new(endpoint).run(record).await?;
    println!("{}", record.output);
    Ok(())
}
