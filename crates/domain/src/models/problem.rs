//! Problem domain model.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::pagination::PageRequest;
use shared::validation::{normalize_phone, validate_required};
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

use super::setting::Taxonomy;

/// Maximum number of images attached to a single problem.
pub const MAX_IMAGES: usize = 5;

/// Default page size for the public listing.
pub const PUBLIC_PAGE_SIZE: i64 = 9;

/// Default page size for the admin triage listing.
pub const ADMIN_PAGE_SIZE: i64 = 10;

/// Default number of problems on the homepage.
pub const RECENT_LIMIT: i64 = 6;

/// Error returned when a string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Category of a reported problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemCategory {
    Road,
    Water,
    Electricity,
    Education,
    Health,
    Agriculture,
    Internet,
    LawAndOrder,
    Other,
}

impl ProblemCategory {
    pub const ALL: [ProblemCategory; 9] = [
        ProblemCategory::Road,
        ProblemCategory::Water,
        ProblemCategory::Electricity,
        ProblemCategory::Education,
        ProblemCategory::Health,
        ProblemCategory::Agriculture,
        ProblemCategory::Internet,
        ProblemCategory::LawAndOrder,
        ProblemCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemCategory::Road => "road",
            ProblemCategory::Water => "water",
            ProblemCategory::Electricity => "electricity",
            ProblemCategory::Education => "education",
            ProblemCategory::Health => "health",
            ProblemCategory::Agriculture => "agriculture",
            ProblemCategory::Internet => "internet",
            ProblemCategory::LawAndOrder => "law_and_order",
            ProblemCategory::Other => "other",
        }
    }
}

impl std::fmt::Display for ProblemCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProblemCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProblemCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "category",
                value: s.to_string(),
            })
    }
}

/// Triage status of a problem.
///
/// Any status may be set from any other; there is no transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemStatus {
    Pending,
    Approved,
    InProgress,
    Resolved,
    Rejected,
}

impl ProblemStatus {
    pub const ALL: [ProblemStatus; 5] = [
        ProblemStatus::Pending,
        ProblemStatus::Approved,
        ProblemStatus::InProgress,
        ProblemStatus::Resolved,
        ProblemStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemStatus::Pending => "pending",
            ProblemStatus::Approved => "approved",
            ProblemStatus::InProgress => "in_progress",
            ProblemStatus::Resolved => "resolved",
            ProblemStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ProblemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProblemStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProblemStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "status",
                value: s.to_string(),
            })
    }
}

/// A citizen complaint record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub category: ProblemCategory,
    pub upazila: String,
    pub union_name: String,
    pub ward: Option<String>,
    pub address_details: Option<String>,
    pub submitter_name: String,
    pub submitter_phone: String,
    pub status: ProblemStatus,
    pub images: Vec<String>,
    pub votes_count: i64,
    pub views_count: i64,
}

impl Problem {
    pub fn counts(&self) -> ProblemCounts {
        ProblemCounts {
            votes_count: self.votes_count,
            views_count: self.views_count,
        }
    }
}

/// Validated content for a new problem row.
///
/// Status, counts, id and creation time are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProblem {
    pub title: String,
    pub description: String,
    pub category: ProblemCategory,
    pub upazila: String,
    pub union_name: String,
    pub ward: Option<String>,
    pub address_details: Option<String>,
    pub submitter_name: String,
    pub submitter_phone: String,
    pub images: Vec<String>,
}

/// Vote and view counters of one problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemCounts {
    pub votes_count: i64,
    pub views_count: i64,
}

/// Request payload for submitting a problem.
///
/// Images are public URLs returned by earlier uploads.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateProblemRequest {
    #[validate(required(code = "category_required", message = "সমস্যার ধরন নির্বাচন করুন"))]
    pub category: Option<ProblemCategory>,

    #[validate(custom(function = "shared::validation::validate_title"))]
    pub title: String,

    #[validate(custom(function = "shared::validation::validate_description"))]
    pub description: String,

    #[validate(length(
        max = 5,
        code = "too_many_images",
        message = "সর্বোচ্চ ৫টি ছবি দেওয়া যাবে"
    ))]
    pub images: Vec<String>,

    #[validate(custom(function = "validate_upazila"))]
    pub upazila: String,

    #[validate(custom(function = "validate_union_name"))]
    pub union_name: String,

    #[validate(length(max = 50, code = "ward_too_long", message = "ওয়ার্ড সর্বোচ্চ ৫০ অক্ষর"))]
    pub ward: Option<String>,

    #[validate(length(
        max = 500,
        code = "address_too_long",
        message = "ঠিকানা সর্বোচ্চ ৫০০ অক্ষর"
    ))]
    pub address_details: Option<String>,

    #[validate(custom(function = "shared::validation::validate_submitter_name"))]
    pub submitter_name: String,

    #[validate(custom(function = "shared::validation::validate_bd_mobile"))]
    pub submitter_phone: String,
}

fn validate_upazila(upazila: &str) -> Result<(), ValidationError> {
    validate_required(upazila, "upazila_required", "উপজেলা নির্বাচন করুন")
}

fn validate_union_name(union_name: &str) -> Result<(), ValidationError> {
    validate_required(union_name, "union_required", "ইউনিয়ন নির্বাচন করুন")
}

fn optional_trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CreateProblemRequest {
    /// Runs the field rules plus the taxonomy membership checks.
    ///
    /// Location membership is only checked for fields that passed their own
    /// rules, so each field reports at most one error.
    pub fn validate_with(&self, taxonomy: &Taxonomy) -> Result<(), ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        let upazila_failed = errors.errors().contains_key("upazila");
        let union_failed = errors.errors().contains_key("union_name");
        if !upazila_failed {
            if let Err(err) = taxonomy.check_upazila(&self.upazila) {
                errors.add("upazila", err);
            } else if !union_failed {
                if let Err(err) = taxonomy.check_union(&self.upazila, &self.union_name) {
                    errors.add("union_name", err);
                }
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validates the request and converts it into a storable problem.
    ///
    /// Text fields are trimmed and the phone number is normalised.
    pub fn into_new_problem(self, taxonomy: &Taxonomy) -> Result<NewProblem, ValidationErrors> {
        self.validate_with(taxonomy)?;
        let Some(category) = self.category else {
            let mut errors = ValidationErrors::new();
            let mut err = ValidationError::new("category_required");
            err.message = Some("সমস্যার ধরন নির্বাচন করুন".into());
            errors.add("category", err);
            return Err(errors);
        };

        Ok(NewProblem {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            category,
            upazila: self.upazila.trim().to_string(),
            union_name: self.union_name.trim().to_string(),
            ward: optional_trimmed(self.ward),
            address_details: optional_trimmed(self.address_details),
            submitter_name: self.submitter_name.trim().to_string(),
            submitter_phone: normalize_phone(&self.submitter_phone),
            images: self.images,
        })
    }
}

/// How far free-text search reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchScope {
    /// Title and description.
    #[default]
    Content,
    /// Title, description and submitter name.
    ContentAndSubmitter,
}

/// Filter applied to problem listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProblemFilter {
    pub category: Option<ProblemCategory>,
    pub status: Option<ProblemStatus>,
    pub upazila: Option<String>,
    pub search: Option<String>,
    pub scope: SearchScope,
}

/// Treats empty values and the literal `all` as "no filter".
fn filter_value(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "all")
}

/// Query parameters for the public listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProblemsQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub upazila: Option<String>,
    pub search: Option<String>,
}

impl ListProblemsQuery {
    pub fn page_request(&self, default_per_page: i64) -> PageRequest {
        PageRequest::new(self.page, self.per_page, default_per_page)
    }

    pub fn to_filter(&self) -> Result<ProblemFilter, ParseEnumError> {
        Ok(ProblemFilter {
            category: filter_value(&self.category)
                .map(str::parse::<ProblemCategory>)
                .transpose()?,
            status: filter_value(&self.status)
                .map(str::parse::<ProblemStatus>)
                .transpose()?,
            upazila: filter_value(&self.upazila).map(str::to_string),
            search: filter_value(&self.search).map(str::to_string),
            scope: SearchScope::Content,
        })
    }
}

/// Query parameters for the admin triage listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminListProblemsQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<String>,
    pub search: Option<String>,
}

impl AdminListProblemsQuery {
    pub fn page_request(&self, default_per_page: i64) -> PageRequest {
        PageRequest::new(self.page, self.per_page, default_per_page)
    }

    pub fn to_filter(&self) -> Result<ProblemFilter, ParseEnumError> {
        Ok(ProblemFilter {
            status: filter_value(&self.status)
                .map(str::parse::<ProblemStatus>)
                .transpose()?,
            search: filter_value(&self.search).map(str::to_string),
            scope: SearchScope::ContentAndSubmitter,
            ..Default::default()
        })
    }
}

/// Query parameters for the recent problems list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentProblemsQuery {
    pub limit: Option<i64>,
}

impl RecentProblemsQuery {
    pub fn limit(&self, default_limit: i64) -> i64 {
        self.limit.unwrap_or(default_limit).clamp(1, 50)
    }
}

/// Request to change a problem's status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: ProblemStatus,
}

/// Query parameters for deleting a problem.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteProblemQuery {
    #[serde(default)]
    pub confirm: bool,
}

/// Pagination info for list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// One page of problems, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemPage {
    pub data: Vec<Problem>,
    pub pagination: Pagination,
}

impl ProblemPage {
    pub fn new(data: Vec<Problem>, page: &PageRequest, total: i64) -> Self {
        Self {
            data,
            pagination: Pagination {
                page: page.page,
                per_page: page.per_page,
                total,
                total_pages: page.total_pages(total),
            },
        }
    }

    pub fn empty(page: &PageRequest) -> Self {
        Self::new(Vec::new(), page, 0)
    }
}
