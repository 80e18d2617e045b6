//! Shared constants used across the application

/// Space reserved for the activity indicator + margin in the input area.
/// Rendering and cursor placement must agree on this value.
pub const INDICATOR_SPACE: u16 = 4;

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Sampling temperature every chat session is created with.
pub const CHAT_TEMPERATURE: f32 = 0.7;

/// Environment variables consulted for the API key, in order.
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

pub const SYSTEM_INSTRUCTION: &str = "You are a world-class Data Structures and Algorithms (DSA) expert and tutor.
Your goal is to help students understand complex concepts with clarity, provide clean and efficient code examples, and explain time and space complexity (Big O notation).

When responding:
1. Use Markdown for formatting.
2. Use code blocks with appropriate language tags (python, java, cpp, javascript).
3. Break down complex logic into step-by-step explanations.
4. Suggest optimizations where possible.
5. If the user asks for a solution to a problem, explain the intuition before showing the code.
6. Use a professional yet encouraging tone.";

pub const WELCOME_GREETING: &str = "Hello! I'm your DSA Tutor. What data structure or algorithm would you like to explore today? I can help you with conceptual explanations, code implementations, or complexity analysis.";

pub const RESET_GREETING: &str = "Chat context cleared. How can I help you next?";

/// Body of the assistant turn committed when a reply cannot be produced.
pub const FALLBACK_REPLY: &str =
    "I'm sorry, I encountered an error. Please try again or check your API configuration.";
