use reqwest::Client;
use std::time::Duration;

use crate::error::Result;

/// Punctuation stripped from the end of fallback translations.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '·', '—', '-'];

/// Build the HTTP client shared by all upstream providers.
pub fn build_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder().user_agent(concat!("lyric-relay/", env!("CARGO_PKG_VERSION")));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Remove one trailing run of punctuation and the whitespace around it.
///
/// Text that is nothing but punctuation is returned trimmed rather than emptied.
pub fn clean_translation(text: &str) -> String {
    let cleaned = text.trim_end().trim_end_matches(TRAILING_PUNCTUATION).trim();
    if cleaned.is_empty() {
        text.trim().to_string()
    } else {
        cleaned.to_string()
    }
}
