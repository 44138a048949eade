//! Response shapes for the three fetch modes (spec.md §4.4: `full`,
//! `head_only`, `status_only`), each capping how much body is read off the
//! wire.

use reqwest::StatusCode;

/// What a single successful fetch produced, shaped by the engine's fetch
/// mode. `body_size` is the number of bytes actually read off the wire (up
/// to the mode's cap), independent of whether those bytes are kept.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub final_url: String,
    pub body_size: usize,
    pub truncated: bool,
}

impl FetchedResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Read at most `max_body_bytes` from `response`, reporting whether the
/// body was truncated. `head_only` never calls this.
pub async fn read_capped_body(mut response: reqwest::Response, max_body_bytes: usize) -> Result<(usize, bool), reqwest::Error> {
    let mut read = 0usize;
    let mut truncated = false;

    while let Some(chunk) = response.chunk().await? {
        if read + chunk.len() > max_body_bytes {
            read = max_body_bytes;
            truncated = true;
            break;
        }
        read += chunk.len();
    }

    Ok((read, truncated))
}
