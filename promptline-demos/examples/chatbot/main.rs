use std::io::{stdin, stdout, Write};
use std::sync::Arc;
use anyhow::Result;
use clap::Parser;
use promptline::exemplars::chatbot::{ChatSession, ContextWindow};
use promptline::pipeline::PipelineError;
use promptline::utils::llm::{EndpointConfig, OpenAIEndpoint};

/// Chat with an assistant. Type `/clear` to start over, `/quit` to leave.
#[derive(Parser, Debug)]
struct Args {
    /// Optional system message
    #[arg(short, long)]
    system: Option<String>,

    /// Tokens of the context window kept free for the reply
    #[arg(long, default_value_t = 2048)]
    reserved_tokens: usize,

    /// Model to chat with, defaults to PROMPTLINE_MODEL
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Upper bound on the tokens of one reply
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Hugging Face API token, defaults to HUGGINGFACEHUB_API_TOKEN
    #[arg(long)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let mut config = EndpointConfig::from_env_with_key(args.api_key)?;
    if let Some(model) = args.model {
        config = config.model(model);
    }
    if let Some(temperature) = args.temperature {
        config = config.temperature(temperature);
    }
    if let Some(max_tokens) = args.max_tokens {
        config = config.max_tokens(max_tokens);
    }
    let context = ContextWindow::for_model(&config.model, args.reserved_tokens)?;
    let mut session = ChatSession::new(Arc::new(OpenAIEndpoint::new(config))).with_context_window(context);
    if let Some(system) = args.system {
        session = session.with_system_message(system);
    }

    let mut line = String::new();
    loop {
        print!("Ask: ");
        stdout().flush()?;
        line.clear();
        if stdin().read_line(&mut line)? == 0 {
            break;
        }
        match line.trim() {
            "/quit" => break,
            "/clear" => {
                session.clear();
                println!("(conversation cleared)");
            }
            input => match session.send(input).await {
                Ok(reply) => println!("\n{}\n", reply),
                Err(PipelineError::Input(message)) => println!("{}", message),
                Err(e) => eprintln!("error: {}", e),
            },
        }
    }
    Ok(())
}
