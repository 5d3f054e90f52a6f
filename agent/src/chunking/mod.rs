//! Splitting stored content into pages.
//!
//! [`TaskChunker`] asks an optional [`Segmenter`] for semantic boundaries first and
//! falls back to [`split_lines`] whenever the provider is missing, fails, or returns
//! segments that lose content. Chunking a readable blob never fails.

#[cfg(feature = "jina")]
mod jina;
mod lines;

#[cfg(feature = "jina")]
pub use jina::JinaSegmenter;
pub use lines::split_lines;

use std::{fmt, future::Future, pin::Pin, sync::Arc};

use hyperfocus_blobs::{BlobError, BlobStore};
use serde::Serialize;

use crate::error::SegmentationError;

/// A contiguous slice of a blob's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    /// Position of the page, starting at 0.
    pub ordinal: usize,
    /// Page text.
    pub content: String,
    /// Set when the page is larger than the page size because a single unit
    /// (one line, one provider segment) could not be split.
    pub truncated: bool,
}

impl Page {
    /// Length of the page in characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.content.chars().count()
    }

    /// Returns `true` for a page without content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Future returned by [`Segmenter::segment`].
pub type SegmentFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<String>, SegmentationError>> + Send + 'a>>;

/// A semantic segmentation provider.
pub trait Segmenter: Send + Sync {
    /// Provider name used in logs.
    fn name(&self) -> &'static str;

    /// Splits `text` into ordered segments of at most `max_chunk_len` characters.
    fn segment<'a>(&'a self, text: &'a str, max_chunk_len: usize) -> SegmentFuture<'a>;
}

/// Splits blobs into pages for isolated processing.
#[derive(Clone, Default)]
pub struct TaskChunker {
    segmenter: Option<Arc<dyn Segmenter>>,
}

impl fmt::Debug for TaskChunker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskChunker")
            .field("segmenter", &self.segmenter.as_ref().map(|s| s.name()))
            .finish()
    }
}

impl TaskChunker {
    /// A chunker that only splits on lines.
    #[must_use]
    pub const fn new() -> Self {
        Self { segmenter: None }
    }

    /// A chunker that tries `segmenter` before falling back to line splitting.
    #[must_use]
    pub fn with_segmenter(segmenter: impl Segmenter + 'static) -> Self {
        Self {
            segmenter: Some(Arc::new(segmenter)),
        }
    }

    /// Splits the text of blob `blob_id` into pages of at most `page_size` characters.
    ///
    /// # Errors
    ///
    /// Fails only when the blob is missing or binary.
    pub async fn chunk(
        &self,
        store: &BlobStore,
        blob_id: &str,
        page_size: usize,
    ) -> Result<Vec<Page>, BlobError> {
        let text = store.get(blob_id)?.require_text()?;
        Ok(self.chunk_text(text, page_size).await)
    }

    /// Splits `text` into pages of at most `page_size` characters.
    pub async fn chunk_text(&self, text: &str, page_size: usize) -> Vec<Page> {
        let page_size = page_size.max(1);
        if text.is_empty() {
            return Vec::new();
        }
        if let Some(segmenter) = &self.segmenter {
            match segment_checked(segmenter.as_ref(), text, page_size).await {
                Ok(pages) => {
                    tracing::debug!(provider = segmenter.name(), pages = pages.len(), "semantic segmentation");
                    return pages;
                }
                Err(error) => {
                    tracing::warn!(provider = segmenter.name(), %error, "segmentation failed, splitting by lines");
                }
            }
        }
        split_lines(text, page_size)
    }
}

async fn segment_checked(
    segmenter: &dyn Segmenter,
    text: &str,
    page_size: usize,
) -> Result<Vec<Page>, SegmentationError> {
    let segments = segmenter.segment(text, page_size).await?;
    if segments.iter().all(|segment| segment.trim().is_empty()) {
        return Err(SegmentationError::Empty);
    }
    let produced = segments.iter().flat_map(|segment| non_whitespace(segment));
    if !produced.eq(non_whitespace(text)) {
        return Err(SegmentationError::ContentMismatch);
    }

    Ok(segments
        .into_iter()
        .filter(|segment| !segment.trim().is_empty())
        .enumerate()
        .map(|(ordinal, content)| Page {
            ordinal,
            truncated: content.chars().count() > page_size,
            content,
        })
        .collect())
}

fn non_whitespace(text: &str) -> impl Iterator<Item = char> + '_ {
    text.chars().filter(|c| !c.is_whitespace())
}
