use super::domain::{AdImage, Destination, FormState};

/// Blocking validation failures. The payload is never dispatched when one is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("article URL is required")]
    MissingUrl,
    #[error("the first headline is required")]
    MissingHeadline,
    #[error("the first description is required")]
    MissingDescription,
    #[error("primary text is required")]
    MissingPrimaryText,
}

/// Canonical request body, independent of which endpoint receives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPayload {
    pub url: String,
    pub headlines: Vec<String>,
    pub descriptions: Vec<String>,
    pub primary_text: String,
    pub image_description: Option<String>,
    pub images: Vec<AdImage>,
    pub destination: Option<Destination>,
}

/// Pure conversion from form state to [`SubmissionPayload`].
pub struct SubmissionBuilder;

impl SubmissionBuilder {
    /// Validate in a fixed order (url, headline, description, primary text) and stop
    /// at the first failure.
    pub fn build(
        form: &FormState,
        destination: Option<Destination>,
    ) -> Result<SubmissionPayload, ValidationError> {
        let url = form.url.trim();
        if url.is_empty() {
            return Err(ValidationError::MissingUrl);
        }
        if form.headlines.first().trim().is_empty() {
            return Err(ValidationError::MissingHeadline);
        }
        if form.descriptions.first().trim().is_empty() {
            return Err(ValidationError::MissingDescription);
        }
        if form.primary_text.trim().is_empty() {
            return Err(ValidationError::MissingPrimaryText);
        }

        let keywords = form.keywords.trim();
        let image_description = (!keywords.is_empty()).then(|| keywords.to_string());

        Ok(SubmissionPayload {
            url: url.to_string(),
            headlines: form.headlines.to_submission_list(),
            descriptions: form.descriptions.to_submission_list(),
            primary_text: form.primary_text.clone(),
            image_description,
            images: form.images.clone(),
            destination,
        })
    }
}
