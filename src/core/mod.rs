pub mod chat_stream;
pub mod config;
pub mod constants;
pub mod endpoint;
pub mod gemini;
pub mod message;
pub mod session;
pub mod topics;
