// THEORY:
// Salons import photos in bulk: a stylist uploads a whole session of before/after
// pairs at once. Tagging them one after another wastes the blocking pool, and
// tagging all of them at once decodes every image into memory together. The batch
// tagger keeps a bounded number of pairs in flight (`batch_concurrency`, the logical
// CPU count by default) and returns results in input order.
//
// Every pair is independent. One bad photo yields one `Err` in its slot and does not
// affect the others; there is no partial record for the failed pair.

use crate::core_modules::tagged_photo::{Metadata, TaggedPhoto};
use crate::error::Result;
use crate::image_source::ImageSource;
use crate::pipeline::SalonPipeline;
use futures::stream::{self, StreamExt};
use tracing::info;

/// One before/after pair to tag.
#[derive(Debug, Clone)]
pub struct TagRequest {
    pub before: ImageSource,
    pub after: ImageSource,
    pub metadata: Option<Metadata>,
}

impl TagRequest {
    pub fn new(before: ImageSource, after: ImageSource) -> Self {
        Self {
            before,
            after,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl SalonPipeline {
    /// Tags every request, at most `batch_concurrency` at a time. The output has one
    /// entry per request, in the same order.
    pub async fn tag_photo_batch(&self, requests: Vec<TagRequest>) -> Vec<Result<TaggedPhoto>> {
        let total = requests.len();
        let in_flight = self.config().batch_concurrency();

        let results: Vec<Result<TaggedPhoto>> = stream::iter(requests)
            .map(|request| self.tag_photo(request.before, request.after, request.metadata))
            .buffered(in_flight)
            .collect()
            .await;

        let tagged = results.iter().filter(|result| result.is_ok()).count();
        info!(total, tagged, failed = total - tagged, in_flight, "photo batch tagged");
        results
    }
}
