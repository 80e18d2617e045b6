//! Terminal UI for the interactive tutor.
//!
//! - [`chat_loop`]: terminal lifecycle and the event loop that drives a
//!   [`crate::core::session::ConversationSession`].
//! - [`shell`]: input, focus and scroll state, and key handling.
//! - [`renderer`] and [`markdown`]: frame layout and reply rendering.
//! - [`theme`]: styles.

pub mod chat_loop;
pub mod markdown;
pub mod renderer;
pub mod shell;
pub mod theme;
