//! TUI-less "ask" command

use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;

use crate::core::endpoint::{ChatConfig, ModelEndpoint};
use crate::core::session::{ConversationSession, SendOutcome};

/// Prints the part of `snapshot` not yet written. Returns the new written
/// length in bytes.
fn write_new_suffix<W: Write>(out: &mut W, snapshot: &str, written: usize) -> io::Result<usize> {
    match snapshot.get(written..) {
        Some(suffix) if !suffix.is_empty() => {
            out.write_all(suffix.as_bytes())?;
            out.flush()?;
            Ok(snapshot.len())
        }
        _ => Ok(written),
    }
}

/// Runs one send and writes the streamed reply to `out`. On failure the
/// fallback reply follows whatever had already streamed.
pub async fn ask_once<E, W>(
    session: &mut ConversationSession<E>,
    prompt: &str,
    out: &mut W,
) -> Result<SendOutcome, Box<dyn Error>>
where
    E: ModelEndpoint,
    W: Write,
{
    let mut written = 0;
    let mut write_error = None;
    let outcome = session
        .send(prompt, |snapshot| {
            if write_error.is_some() {
                return;
            }
            match write_new_suffix(out, snapshot, written) {
                Ok(len) => written = len,
                Err(e) => write_error = Some(e),
            }
        })
        .await;
    if let Some(e) = write_error {
        return Err(e.into());
    }

    if outcome == SendOutcome::Failed {
        if written > 0 {
            writeln!(out)?;
        }
        if let Some(last) = session.transcript().last() {
            write!(out, "{}", last.body)?;
        }
    }
    writeln!(out)?;
    out.flush()?;
    Ok(outcome)
}

pub async fn run_ask<E: ModelEndpoint>(
    endpoint: Arc<E>,
    chat_config: ChatConfig,
    prompt: Vec<String>,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: dsa-tutor ask <prompt>");
        std::process::exit(1);
    }

    let mut session = ConversationSession::new(endpoint, chat_config);
    session.start();

    let mut stdout = io::stdout();
    let outcome = ask_once(&mut session, &prompt, &mut stdout).await?;
    session.dispose();

    if outcome == SendOutcome::Failed {
        eprintln!("❌ Error: the tutor could not answer. Check GEMINI_API_KEY and your network.");
        std::process::exit(1);
    }
    Ok(())
}
