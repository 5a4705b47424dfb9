use reqwest::Url;

use crate::error::{ProtectKitError, ProtectKitResult};

/// Appends path segments to the base URL. Each segment is percent-encoded, so
/// identifiers containing `/` or `?` stay inside their own segment.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> ProtectKitResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ProtectKitError::Config(format!("base url {base} cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Appends query parameters, skipping absent and empty values.
pub(crate) fn with_query(mut url: Url, params: &[(&str, Option<String>)]) -> Url {
    for (name, value) in params {
        if let Some(value) = value.as_deref().filter(|value| !value.is_empty()) {
            url.query_pairs_mut().append_pair(name, value);
        }
    }
    url
}
