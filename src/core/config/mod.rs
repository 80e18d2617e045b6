pub mod io;


use serde::{Deserialize, Serialize};

use crate::core::constants::{DEFAULT_BASE_URL, DEFAULT_MODEL};

pub use io::ConfigError;

/// Keys accepted by `dsa-tutor set` / `dsa-tutor unset`.
pub const CONFIG_KEYS: &[&str] = &["model", "base-url", "markdown", "log-file"];

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Model used when `--model` is not given
    pub model: Option<String>,
    /// Root of the Gemini REST API
    pub base_url: Option<String>,
    /// Render assistant replies as Markdown
    pub markdown: Option<bool>,
    /// Diagnostic log file used when `--log` is not given
    pub log_file: Option<String>,
}

impl Config {
    /// Flag value, then config value, then the built-in default.
    pub fn resolve_model(&self, flag: Option<&str>) -> String {
        flag.filter(|m| !m.trim().is_empty())
            .map(str::to_string)
            .or_else(|| self.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    pub fn resolve_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn resolve_log_file(&self, flag: Option<&str>) -> Option<String> {
        flag.map(str::to_string).or_else(|| self.log_file.clone())
    }

    pub fn markdown_enabled(&self) -> bool {
        self.markdown.unwrap_or(true)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            });
        }
        match key {
            "model" => self.model = Some(value.to_string()),
            "base-url" => self.base_url = Some(value.to_string()),
            "log-file" => self.log_file = Some(value.to_string()),
            "markdown" => {
                self.markdown = Some(parse_toggle(value).ok_or_else(|| {
                    ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                    }
                })?)
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn unset(&mut self, key: &str) -> Result<(), ConfigError> {
        match key {
            "model" => self.model = None,
            "base-url" => self.base_url = None,
            "markdown" => self.markdown = None,
            "log-file" => self.log_file = None,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn print_all(&self) {
        println!("Current configuration:");
        match &self.model {
            Some(model) => println!("  model: {model}"),
            None => println!("  model: (unset, default {DEFAULT_MODEL})"),
        }
        match &self.base_url {
            Some(url) => println!("  base-url: {url}"),
            None => println!("  base-url: (unset, default {DEFAULT_BASE_URL})"),
        }
        match self.markdown_enabled() {
            true => println!("  markdown: on"),
            false => println!("  markdown: off"),
        }
        match &self.log_file {
            Some(path) => println!("  log-file: {path}"),
            None => println!("  log-file: (unset)"),
        }
    }
}

fn parse_toggle(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}
