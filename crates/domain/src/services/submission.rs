//! Three-step problem submission flow.
//!
//! The form walks through content, location and identity steps. Each step is
//! gated by its validation predicate; validation failures land in a per-field
//! error map and never abort the flow. Submitting uploads every attached image
//! concurrently, then inserts exactly one problem row referencing the URLs.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use validator::ValidationErrors;

use super::BackendError;
use crate::models::problem::{CreateProblemRequest, Problem, ProblemCategory, MAX_IMAGES};
use crate::models::setting::Taxonomy;

/// Steps of the submission form, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStep {
    Content,
    Location,
    Identity,
}

impl SubmissionStep {
    pub fn next(self) -> Option<Self> {
        match self {
            SubmissionStep::Content => Some(SubmissionStep::Location),
            SubmissionStep::Location => Some(SubmissionStep::Identity),
            SubmissionStep::Identity => None,
        }
    }

    pub fn previous(self) -> Option<Self> {
        match self {
            SubmissionStep::Content => None,
            SubmissionStep::Location => Some(SubmissionStep::Content),
            SubmissionStep::Identity => Some(SubmissionStep::Location),
        }
    }

    /// 1-based position, for progress indicators.
    pub fn number(self) -> u8 {
        match self {
            SubmissionStep::Content => 1,
            SubmissionStep::Location => 2,
            SubmissionStep::Identity => 3,
        }
    }
}

/// Form fields that can carry a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DraftField {
    Category,
    Title,
    Description,
    Images,
    Upazila,
    UnionName,
    Ward,
    AddressDetails,
    SubmitterName,
    SubmitterPhone,
}

impl DraftField {
    /// Maps a request field name to the form field.
    pub fn from_field_name(name: &str) -> Option<Self> {
        let field = match name {
            "category" => DraftField::Category,
            "title" => DraftField::Title,
            "description" => DraftField::Description,
            "images" => DraftField::Images,
            "upazila" => DraftField::Upazila,
            "union_name" | "unionName" => DraftField::UnionName,
            "ward" => DraftField::Ward,
            "address_details" | "addressDetails" => DraftField::AddressDetails,
            "submitter_name" | "submitterName" => DraftField::SubmitterName,
            "submitter_phone" | "submitterPhone" => DraftField::SubmitterPhone,
            _ => return None,
        };
        Some(field)
    }

    pub fn step(self) -> SubmissionStep {
        match self {
            DraftField::Category
            | DraftField::Title
            | DraftField::Description
            | DraftField::Images => SubmissionStep::Content,
            DraftField::Upazila
            | DraftField::UnionName
            | DraftField::Ward
            | DraftField::AddressDetails => SubmissionStep::Location,
            DraftField::SubmitterName | DraftField::SubmitterPhone => SubmissionStep::Identity,
        }
    }
}

/// A single field error with a stable code and a display message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub code: String,
    pub message: String,
}

/// Per-field validation errors, at most one per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<DraftField, FieldError>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: DraftField) -> Option<&FieldError> {
        self.0.get(&field)
    }

    pub fn code(&self, field: DraftField) -> Option<&str> {
        self.get(field).map(|e| e.code.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DraftField, &FieldError)> {
        self.0.iter()
    }

    pub fn insert(&mut self, field: DraftField, code: &str, message: &str) {
        self.0.entry(field).or_insert_with(|| FieldError {
            code: code.to_string(),
            message: message.to_string(),
        });
    }

    fn retain_step(&mut self, step: SubmissionStep) {
        self.0.retain(|field, _| field.step() == step);
    }
}

impl From<&ValidationErrors> for FieldErrors {
    fn from(errors: &ValidationErrors) -> Self {
        let mut map = BTreeMap::new();
        for (name, errs) in errors.field_errors() {
            let Some(field) = DraftField::from_field_name(&name) else {
                continue;
            };
            let Some(first) = errs.first() else {
                continue;
            };
            let message = first
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| first.code.to_string());
            map.entry(field).or_insert(FieldError {
                code: first.code.to_string(),
                message,
            });
        }
        FieldErrors(map)
    }
}

/// An image chosen by the user, held in memory until submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageAttachment {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Everything the user has entered so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionDraft {
    pub category: Option<ProblemCategory>,
    pub title: String,
    pub description: String,
    pub images: Vec<ImageAttachment>,
    pub upazila: String,
    pub union_name: String,
    pub ward: String,
    pub address_details: String,
    pub submitter_name: String,
    pub submitter_phone: String,
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl SubmissionDraft {
    /// Builds the insert payload using already uploaded image URLs.
    pub fn to_request(&self, image_urls: Vec<String>) -> CreateProblemRequest {
        CreateProblemRequest {
            category: self.category,
            title: self.title.clone(),
            description: self.description.clone(),
            images: image_urls,
            upazila: self.upazila.clone(),
            union_name: self.union_name.clone(),
            ward: non_empty(&self.ward),
            address_details: non_empty(&self.address_details),
            submitter_name: self.submitter_name.clone(),
            submitter_phone: self.submitter_phone.clone(),
        }
    }

    /// Errors for every field, across all steps.
    pub fn validate_all(&self, taxonomy: &Taxonomy) -> FieldErrors {
        let mut errors = match self.to_request(Vec::new()).validate_with(taxonomy) {
            Ok(()) => FieldErrors::default(),
            Err(errors) => FieldErrors::from(&errors),
        };
        if self.images.len() > MAX_IMAGES {
            errors.insert(
                DraftField::Images,
                "too_many_images",
                "সর্বোচ্চ ৫টি ছবি দেওয়া যাবে",
            );
        }
        errors
    }

    /// Errors for the fields of one step.
    pub fn validate_step(&self, step: SubmissionStep, taxonomy: &Taxonomy) -> FieldErrors {
        let mut errors = self.validate_all(taxonomy);
        errors.retain_step(step);
        errors
    }
}

/// Read-only summary shown on the final step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
    pub category: Option<String>,
    pub title: String,
    pub description: String,
    pub image_count: usize,
    pub upazila: Option<String>,
    pub union_name: Option<String>,
    pub ward: Option<String>,
    pub address_details: Option<String>,
    pub submitter_name: String,
    pub submitter_phone: String,
}

/// Where the form currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum FormState {
    Editing(SubmissionStep),
    Submitting,
    Submitted(Box<Problem>),
}

/// Errors from submitting a draft.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("the form has invalid fields")]
    Invalid(FieldErrors),

    #[error("a submission is already in progress")]
    InFlight,

    #[error("the problem was already submitted")]
    AlreadySubmitted,

    #[error("image upload failed: {0}")]
    Upload(#[source] BackendError),

    #[error("saving the problem failed: {0}")]
    Insert(#[source] BackendError),
}

/// Operations the submission flow needs from the portal.
#[async_trait::async_trait]
pub trait SubmissionBackend: Send + Sync {
    /// Uploads one image and returns its public URL.
    async fn upload_image(&self, image: &ImageAttachment) -> Result<String, BackendError>;

    /// Inserts one problem row.
    async fn insert_problem(&self, request: &CreateProblemRequest) -> Result<Problem, BackendError>;
}

/// Uploads all images concurrently, then inserts the problem.
///
/// The insert runs only after every upload succeeded. Images uploaded before a
/// failed insert are left in storage.
pub async fn submit_draft<B>(
    backend: &B,
    draft: &SubmissionDraft,
) -> Result<Problem, SubmissionError>
where
    B: SubmissionBackend + ?Sized,
{
    let uploads = draft.images.iter().map(|image| backend.upload_image(image));
    let urls = futures::future::try_join_all(uploads)
        .await
        .map_err(SubmissionError::Upload)?;

    let request = draft.to_request(urls);
    backend
        .insert_problem(&request)
        .await
        .map_err(SubmissionError::Insert)
}

/// State machine behind the submission form.
#[derive(Debug, Clone)]
pub struct SubmissionForm {
    taxonomy: Taxonomy,
    draft: SubmissionDraft,
    state: FormState,
    errors: FieldErrors,
}

impl SubmissionForm {
    pub fn new(taxonomy: Taxonomy) -> Self {
        Self {
            taxonomy,
            draft: SubmissionDraft::default(),
            state: FormState::Editing(SubmissionStep::Content),
            errors: FieldErrors::default(),
        }
    }

    pub fn draft(&self) -> &SubmissionDraft {
        &self.draft
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Current step, or `None` once the form left the editing state.
    pub fn step(&self) -> Option<SubmissionStep> {
        match self.state {
            FormState::Editing(step) => Some(step),
            _ => None,
        }
    }

    pub fn set_category(&mut self, category: ProblemCategory) {
        self.draft.category = Some(category);
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.draft.description = description.into();
    }

    /// Selecting an upazila always clears the chosen union.
    pub fn set_upazila(&mut self, upazila: impl Into<String>) {
        self.draft.upazila = upazila.into();
        self.draft.union_name.clear();
    }

    pub fn set_union(&mut self, union_name: impl Into<String>) {
        self.draft.union_name = union_name.into();
    }

    pub fn set_ward(&mut self, ward: impl Into<String>) {
        self.draft.ward = ward.into();
    }

    pub fn set_address_details(&mut self, address_details: impl Into<String>) {
        self.draft.address_details = address_details.into();
    }

    pub fn set_submitter_name(&mut self, name: impl Into<String>) {
        self.draft.submitter_name = name.into();
    }

    pub fn set_submitter_phone(&mut self, phone: impl Into<String>) {
        self.draft.submitter_phone = phone.into();
    }

    /// Attaches images up to the per-problem cap.
    ///
    /// Files beyond the remaining slots are dropped. Returns how many were
    /// accepted.
    pub fn attach_images(&mut self, images: impl IntoIterator<Item = ImageAttachment>) -> usize {
        let remaining = MAX_IMAGES.saturating_sub(self.draft.images.len());
        let before = self.draft.images.len();
        self.draft.images.extend(images.into_iter().take(remaining));
        self.draft.images.len() - before
    }

    pub fn remove_image(&mut self, index: usize) -> Option<ImageAttachment> {
        (index < self.draft.images.len()).then(|| self.draft.images.remove(index))
    }

    /// Attached images, in order, for preview.
    pub fn previews(&self) -> &[ImageAttachment] {
        &self.draft.images
    }

    /// Validates the current step and advances when it passes.
    pub fn next(&mut self) -> bool {
        let Some(step) = self.step() else {
            return false;
        };
        self.errors = self.draft.validate_step(step, &self.taxonomy);
        if !self.errors.is_empty() {
            return false;
        }
        match step.next() {
            Some(next) => {
                self.state = FormState::Editing(next);
                true
            }
            None => false,
        }
    }

    /// Goes back one step; entered values are kept.
    pub fn back(&mut self) -> bool {
        match self.step().and_then(SubmissionStep::previous) {
            Some(previous) => {
                self.errors = FieldErrors::default();
                self.state = FormState::Editing(previous);
                true
            }
            None => false,
        }
    }

    pub fn summary(&self) -> SubmissionSummary {
        let draft = &self.draft;
        let upazila = self
            .taxonomy
            .upazilas
            .iter()
            .find(|u| u.value == draft.upazila)
            .map(|u| u.label.clone());
        let union_name = self
            .taxonomy
            .unions_for(&draft.upazila)
            .iter()
            .find(|u| u.value == draft.union_name)
            .map(|u| u.label.clone());

        SubmissionSummary {
            category: draft.category.map(|c| self.taxonomy.category_label(c)),
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            image_count: draft.images.len(),
            upazila,
            union_name,
            ward: non_empty(&draft.ward),
            address_details: non_empty(&draft.address_details),
            submitter_name: draft.submitter_name.trim().to_string(),
            submitter_phone: draft.submitter_phone.trim().to_string(),
        }
    }

    /// Moves into the submitting state and returns the draft to send.
    ///
    /// Refuses while a submission is in flight or after success. Every step
    /// is revalidated; on failure the form jumps to the first failing step.
    pub fn begin_submit(&mut self) -> Result<SubmissionDraft, SubmissionError> {
        match self.state {
            FormState::Submitting => return Err(SubmissionError::InFlight),
            FormState::Submitted(_) => return Err(SubmissionError::AlreadySubmitted),
            FormState::Editing(_) => {}
        }

        let errors = self.draft.validate_all(&self.taxonomy);
        if !errors.is_empty() {
            self.show_first_failing_step(&errors);
            return Err(SubmissionError::Invalid(errors));
        }

        self.errors = FieldErrors::default();
        self.state = FormState::Submitting;
        Ok(self.draft.clone())
    }

    /// Moves to the earliest step with an error and shows only that step's errors.
    fn show_first_failing_step(&mut self, errors: &FieldErrors) {
        let Some(step) = errors.iter().next().map(|(field, _)| field.step()) else {
            return;
        };
        let mut step_errors = errors.clone();
        step_errors.retain_step(step);
        self.errors = step_errors;
        self.state = FormState::Editing(step);
    }

    /// Records the outcome of a submission started with `begin_submit`.
    ///
    /// On failure every value is kept. Field errors send the form back to the
    /// first failing step; any other failure returns to the identity step.
    pub fn finish_submit(
        &mut self,
        result: Result<Problem, SubmissionError>,
    ) -> Result<Problem, SubmissionError> {
        match result {
            Ok(problem) => {
                info!(problem_id = problem.id, "Problem submitted");
                self.state = FormState::Submitted(Box::new(problem.clone()));
                Ok(problem)
            }
            Err(err) => {
                warn!(error = %err, "Problem submission failed");
                self.state = FormState::Editing(SubmissionStep::Identity);
                if let SubmissionError::Invalid(errors) = &err {
                    self.show_first_failing_step(errors);
                }
                Err(err)
            }
        }
    }

    /// Validates, uploads and inserts in one call.
    pub async fn submit<B>(&mut self, backend: &B) -> Result<Problem, SubmissionError>
    where
        B: SubmissionBackend + ?Sized,
    {
        let draft = self.begin_submit()?;
        let result = submit_draft(backend, &draft).await;
        self.finish_submit(result)
    }
}
