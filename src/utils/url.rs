//! URL helpers for building model endpoint addresses.

/// Normalize a base URL by removing trailing slashes.
///
/// # Examples
///
/// ```
/// use dsa_tutor::utils::url::normalize_base_url;
///
/// assert_eq!(
///     normalize_base_url("https://generativelanguage.googleapis.com/v1beta/"),
///     "https://generativelanguage.googleapis.com/v1beta"
/// );
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// URL of the server-sent-events streaming endpoint for `model`.
///
/// Accepts model names with or without the `models/` resource prefix.
///
/// # Examples
///
/// ```
/// use dsa_tutor::utils::url::stream_generate_url;
///
/// assert_eq!(
///     stream_generate_url("https://host/v1beta/", "models/gemini-pro"),
///     "https://host/v1beta/models/gemini-pro:streamGenerateContent?alt=sse"
/// );
/// ```
pub fn stream_generate_url(base_url: &str, model: &str) -> String {
    let model = model.trim();
    let model = model.strip_prefix("models/").unwrap_or(model);
    format!(
        "{}/models/{}:streamGenerateContent?alt=sse",
        normalize_base_url(base_url),
        model
    )
}
