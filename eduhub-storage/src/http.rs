use eduhub_core::{PlatformError, PlatformResult};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::TokenSource;

const MAX_ERROR_BODY: usize = 512;

/// Appends path segments to an endpoint base, percent-encoding each one.
pub(crate) fn endpoint<I, S>(base: &str, segments: I) -> PlatformResult<Url>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut url = Url::parse(base)
        .map_err(|e| PlatformError::NotConfigured(format!("invalid endpoint {}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| PlatformError::NotConfigured(format!("endpoint {} cannot be a base", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Sends an authorized request and decodes the JSON body. 404 maps to `None`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    tokens: &dyn TokenSource,
) -> PlatformResult<Option<T>> {
    let token = tokens.access_token().await?;
    let response = request.bearer_auth(token).send().await?;
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    if !status.is_success() {
        let mut message = response.text().await.unwrap_or_default();
        truncate_at_char_boundary(&mut message, MAX_ERROR_BODY);
        return Err(PlatformError::Status {
            status: status.as_u16(),
            message,
        });
    }

    Ok(Some(response.json::<T>().await?))
}

fn truncate_at_char_boundary(message: &mut String, max_len: usize) {
    if message.len() <= max_len {
        return;
    }
    let mut cut = max_len;
    while !message.is_char_boundary(cut) {
        cut -= 1;
    }
    message.truncate(cut);
}
