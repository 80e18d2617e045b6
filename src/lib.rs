//! dsa-tutor is a terminal-first tutor for data structures and algorithms that
//! talks to a hosted LLM and streams its answers into a chat transcript.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation session, the topic catalog, configuration,
//!   and the model endpoint used to stream replies.
//! - [`ui`] renders the terminal interface and runs the interactive event loop
//!   that drives user input and display updates.
//! - [`api`] defines the wire payloads exchanged with the model endpoint.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which dispatches into [`ui::chat_loop`] for
//! interactive sessions.

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
