use std::sync::Arc;
use anyhow::{bail, Result};
use clap::Parser;
use promptline::exemplars::user_personas::{PersonaRecord, UserPersonas};
use promptline::utils::llm::{EndpointConfig, OpenAIEndpoint};

/// Generate detailed user personas for a product
#[derive(Parser, Debug)]
struct Args {
    /// Product or service details
    #[arg(short, long)]
    product: String,

    /// Target market details
    #[arg(short, long)]
    market: String,

    /// Who uses the product, e.g. "students, teachers and school administrators"
    #[arg(short, long)]
    users: String,

    /// Anything else the personas should consider
    #[arg(short, long, default_value = "")]
    additional: String,

    /// Hugging Face API token, defaults to HUGGINGFACEHUB_API_TOKEN
    #[arg(long)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if [&args.product, &args.market, &args.users].iter().any(|field| field.trim().is_empty()) {
        bail!("Please fill in product, market and user details.");
    }

    let endpoint = Arc::new(OpenAIEndpoint::new(EndpointConfig::from_env_with_key(args.api_key)?));
    let record = UserPersonas::new(endpoint)
        .run(PersonaRecord::new(args.product, args.market, args.additional, args.users))
        .await?;

    for (user, persona) in record.user_personas() {
        println!("# {}\n\n{}\n", user, persona);
    }
    Ok(())
}
