//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod ask;
pub mod topic_list;

use std::error::Error;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::warn;

use crate::cli::ask::run_ask;
use crate::cli::topic_list::list_topics;
use crate::core::config::Config;
use crate::core::endpoint::ChatConfig;
use crate::core::gemini::GeminiEndpoint;
use crate::core::topics::{find_topic, Topic};
use crate::ui::chat_loop::{run_chat, ChatOptions};
use crate::utils::logging::init_file_logging;

#[derive(Parser, Debug)]
#[command(name = "dsa-tutor")]
#[command(about = "A terminal tutor for data structures and algorithms, backed by Gemini")]
#[command(
    long_about = "dsa-tutor is a full-screen terminal chat with an AI tutor for data structures \
and algorithms. Replies stream in as they are generated and are rendered as Markdown.\n\n\
Environment Variables:\n\
  GEMINI_API_KEY    Your Gemini API key\n\
  API_KEY           Fallback when GEMINI_API_KEY is not set\n\
  RUST_LOG          Log filter used with --log (default dsa_tutor=info)\n\n\
Controls:\n\
  Enter             Send the message, or ask about the selected topic\n\
  Ctrl+B            Show or hide the topic panel\n\
  Tab               Move focus between the input and the topic panel\n\
  Up/Down/Mouse     Scroll the conversation, or move the topic selection\n\
  PageUp/PageDown   Scroll the conversation by a page\n\
  Ctrl+R            Clear the conversation and start over\n\
  Esc               Close the topic panel\n\
  Ctrl+C            Quit the application"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Gemini model to chat with
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Topic to ask about when the chat starts (id or title, see `dsa-tutor topics`)
    #[arg(short = 't', long, global = true, value_name = "TOPIC")]
    pub topic: Option<String>,

    /// Write diagnostic logs to the specified file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// List the built-in DSA topics
    Topics,
    /// Ask a single question and print the streamed reply
    Ask {
        /// The question to ask
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        prompt: Vec<String>,
    },
    /// Set a configuration value, or show the configuration when no key is given
    Set {
        /// Configuration key to set (model, base-url, markdown, log-file)
        key: Option<String>,
        /// Value to set for the key
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Topics => {
            list_topics();
            Ok(())
        }
        Commands::Set { key, value } => {
            let mut config = Config::load()?;
            let (key, value) = match set_arguments(key, value) {
                Ok(Some(pair)) => pair,
                Ok(None) => {
                    config.print_all();
                    return Ok(());
                }
                Err(e) => {
                    eprintln!("❌ {e}");
                    eprintln!("Example: dsa-tutor set markdown off");
                    std::process::exit(1);
                }
            };
            if let Err(e) = config.set(&key, &value) {
                eprintln!("❌ {e}");
                std::process::exit(1);
            }
            config.save()?;
            println!("✅ Set {key} to: {value}");
            Ok(())
        }
        Commands::Unset { key } => {
            let mut config = Config::load()?;
            if let Err(e) = config.unset(&key) {
                eprintln!("❌ {e}");
                std::process::exit(1);
            }
            config.save()?;
            println!("✅ Unset {key}");
            Ok(())
        }
        Commands::Ask { prompt } => {
            let config = Config::load()?;
            init_file_logging(config.resolve_log_file(args.log.as_deref()).as_deref())?;
            let model = config.resolve_model(args.model.as_deref());
            let endpoint = GeminiEndpoint::from_env(config.resolve_base_url());
            run_ask(Arc::new(endpoint), ChatConfig::tutor(model), prompt).await
        }
        Commands::Chat => {
            let config = Config::load()?;
            let startup_topic = args.topic.as_deref().map(resolve_topic);
            init_file_logging(config.resolve_log_file(args.log.as_deref()).as_deref())?;

            let model = config.resolve_model(args.model.as_deref());
            let endpoint = GeminiEndpoint::from_env(config.resolve_base_url());
            if !endpoint.has_api_key() {
                warn!("no API key in GEMINI_API_KEY or API_KEY; replies will fail");
            }

            let options = ChatOptions {
                markdown: config.markdown_enabled(),
                startup_topic,
            };
            run_chat(Arc::new(endpoint), ChatConfig::tutor(model), options).await
        }
    }
}

/// A bare `set` shows the config (`None`); a key needs a non-blank value.
fn set_arguments(
    key: Option<String>,
    value: Vec<String>,
) -> Result<Option<(String, String)>, String> {
    let Some(key) = key else {
        return Ok(None);
    };
    let value = value.join(" ");
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("Missing value for {key}"));
    }
    Ok(Some((key, value.to_string())))
}

fn resolve_topic(key: &str) -> &'static Topic {
    match find_topic(key) {
        Some(topic) => topic,
        None => {
            eprintln!("❌ Unknown topic: {key}");
            eprintln!("Run 'dsa-tutor topics' to see the available topics.");
            std::process::exit(1);
        }
    }
}
