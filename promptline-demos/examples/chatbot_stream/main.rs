use std::io::{stdin, stdout, Write};
use std::process::exit;
use std::sync::Arc;
use anyhow::Result;
use clap::Parser;
use futures::{pin_mut, StreamExt};
use promptline::exemplars::chatbot::{Chatbot, ContextWindow, MemoryCheckpointer};
use promptline::utils::llm::{EndpointConfig, OpenAIEndpoint};
use promptline::utils::printing::IncrementalMarkdownPrinter;
use termimad::crossterm::{cursor, ExecutableCommand};

const HELP: &str = "commands: /new <thread>, /switch <thread>, /threads, /history, /forget, /quit";

/// Streaming chat over named threads that are remembered for the whole session
#[derive(Parser, Debug)]
struct Args {
    /// Thread to start in
    #[arg(short, long, default_value = "main")]
    thread: String,

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

async fn stream_reply(chatbot: &Chatbot, printer: &mut IncrementalMarkdownPrinter, thread: &str, input: &str) -> Result<()> {
    let stream = chatbot.stream_turn(thread, input);
    pin_mut!(stream);
    printer.activate(true)?;
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(chunk) => printer.push_and_print(&chunk)?,
            Err(e) => {
                printer.deactivate()?;
                return Err(e.into());
            }
        }
    }
    printer.deactivate()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    ctrlc::set_handler(move || {
        // the printer hides the cursor while streaming
        let _ = stdout().execute(cursor::Show);
        exit(0);
    })?;
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
    let mut chatbot = Chatbot::new(Arc::new(OpenAIEndpoint::new(config)), Arc::new(MemoryCheckpointer::new()))
        .with_context_window(context);
    if let Some(system) = args.system {
        chatbot = chatbot.with_system_message(system);
    }

    let mut printer = IncrementalMarkdownPrinter::default();
    let mut thread = args.thread;
    let mut line = String::new();
    println!("{}", HELP);
    loop {
        print!("[{}] Ask: ", thread);
        stdout().flush()?;
        line.clear();
        if stdin().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        let (command, argument) = input.split_once(' ').unwrap_or((input, ""));
        match command {
            "/quit" => break,
            "/new" | "/switch" if !argument.trim().is_empty() => thread = argument.trim().to_string(),
            "/threads" => println!("{}", chatbot.checkpointer().threads().await.join(", ")),
            "/history" => {
                for message in chatbot.checkpointer().history(&thread).await {
                    println!("{:?}: {}", message.role, message.content);
                }
            }
            "/forget" => {
                chatbot.checkpointer().forget(&thread).await;
                println!("(thread {} forgotten)", thread);
            }
            _ if command.starts_with('/') => println!("{}", HELP),
            _ => {
                if let Err(e) = stream_reply(&chatbot, &mut printer, &thread, input).await {
                    eprintln!("error: {}", e);
                }
            }
        }
    }
    Ok(())
}
