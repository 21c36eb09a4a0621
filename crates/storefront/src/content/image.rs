//! Public image URLs for content store assets.

use nextcart_core::ImageRef;

const IMAGE_CDN: &str = "https://cdn.sanity.io/images";

/// Turns image fields into URLs the payment provider and browsers can fetch.
#[derive(Debug, Clone)]
pub struct ImageUrlBuilder {
    base: String,
}

impl ImageUrlBuilder {
    #[must_use]
    pub fn new(project_id: &str, dataset: &str) -> Self {
        Self {
            base: format!("{IMAGE_CDN}/{project_id}/{dataset}"),
        }
    }

    /// URL for an image field, or `None` if its asset reference is malformed.
    ///
    /// Images are served in the best format the client accepts and scaled
    /// down only, never cropped.
    #[must_use]
    pub fn url_for(&self, image: &ImageRef) -> Option<String> {
        let asset = image.asset()?;
        Some(format!(
            "{}/{}?auto=format&fit=max",
            self.base,
            asset.file_name()
        ))
    }
}
