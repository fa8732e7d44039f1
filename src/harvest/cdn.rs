//! Direct media URL resolution
//!
//! Tries, in order:
//! 1. the extractor's top-level direct URL
//! 2. the first format whose URL contains the CDN host marker
//!
//! and gives up with `None` otherwise. Format quality is never compared.

use crate::sources::{CdnExtractor, ExtractedMedia};

pub struct CdnResolver<'a> {
    extractor: &'a dyn CdnExtractor,
    host_marker: String,
}

impl<'a> CdnResolver<'a> {
    pub fn new(extractor: &'a dyn CdnExtractor, host_marker: impl Into<String>) -> Self {
        Self {
            extractor,
            host_marker: host_marker.into(),
        }
    }

    /// Resolves a direct media URL for `url`, or `None` when no tier yields one
    pub async fn resolve(&self, url: &str) -> Option<String> {
        let media = self.extractor.info(url).await;
        let resolved = select_link(&media, &self.host_marker);
        match &resolved {
            Some(link) => tracing::debug!(url, link = %link, "Resolved CDN link"),
            None => tracing::debug!(url, "No CDN link found"),
        }
        resolved
    }
}

fn select_link(media: &ExtractedMedia, host_marker: &str) -> Option<String> {
    if let Some(direct) = media.direct_url.as_deref().filter(|u| !u.is_empty()) {
        return Some(direct.to_string());
    }

    media
        .formats
        .iter()
        .find(|f| f.url.contains(host_marker))
        .map(|f| f.url.clone())
}
