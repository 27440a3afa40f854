//! Portal settings: dropdown taxonomies and site metadata.
//!
//! Every setting value is read whole and replaced whole.

use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use super::problem::{ParseEnumError, ProblemCategory};

/// A dropdown option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsOption {
    pub value: String,
    pub label: String,
}

impl SettingsOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// Option whose stored value is its own label.
    pub fn same(label: &str) -> Self {
        Self::new(label, label)
    }
}

/// Keys of the `app_settings` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    Categories,
    Upazilas,
    Unions,
}

impl SettingKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::Categories => "categories",
            SettingKey::Upazilas => "upazilas",
            SettingKey::Unions => "unions",
        }
    }
}

impl std::fmt::Display for SettingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Types of the `site_settings` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteSettingType {
    SiteInfo,
    CandidateInfo,
    SocialLinks,
}

impl SiteSettingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteSettingType::SiteInfo => "site_info",
            SiteSettingType::CandidateInfo => "candidate_info",
            SiteSettingType::SocialLinks => "social_links",
        }
    }
}

impl std::fmt::Display for SiteSettingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Folders of the site-assets bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteAssetFolder {
    Logos,
    Photos,
    Symbols,
}

impl SiteAssetFolder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteAssetFolder::Logos => "logos",
            SiteAssetFolder::Photos => "photos",
            SiteAssetFolder::Symbols => "symbols",
        }
    }
}

impl FromStr for SiteAssetFolder {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "logos" => Ok(SiteAssetFolder::Logos),
            "photos" => Ok(SiteAssetFolder::Photos),
            "symbols" => Ok(SiteAssetFolder::Symbols),
            other => Err(ParseEnumError {
                kind: "folder",
                value: other.to_string(),
            }),
        }
    }
}

/// Dropdown taxonomies used by the submission form and listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub categories: Vec<SettingsOption>,
    pub upazilas: Vec<SettingsOption>,
    /// Unions keyed by upazila value.
    pub unions: BTreeMap<String, Vec<SettingsOption>>,
}

fn setting_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

impl Taxonomy {
    /// Taxonomy the database is seeded with.
    pub fn default_seed() -> Self {
        let categories = vec![
            SettingsOption::new("road", "রাস্তাঘাট"),
            SettingsOption::new("water", "পানি"),
            SettingsOption::new("electricity", "বিদ্যুৎ"),
            SettingsOption::new("education", "শিক্ষা"),
            SettingsOption::new("health", "স্বাস্থ্য"),
            SettingsOption::new("agriculture", "কৃষি"),
            SettingsOption::new("internet", "ইন্টারনেট"),
            SettingsOption::new("law_and_order", "আইন-শৃঙ্খলা"),
            SettingsOption::new("other", "অন্যান্য"),
        ];

        let seed: [(&str, &[&str]); 3] = [
            (
                "কোম্পানীগঞ্জ",
                &[
                    "ইসলামপুর পশ্চিম",
                    "ইসলামপুর পূর্ব",
                    "ইছাকলস",
                    "উত্তর রণিখাই",
                    "দক্ষিণ রণিখাই",
                    "তেলিখাল",
                ],
            ),
            (
                "গোয়াইনঘাট",
                &[
                    "রুস্তমপুর",
                    "পশ্চিম জাফলং",
                    "মধ্য জাফলং",
                    "পূর্ব জাফলং",
                    "লেঙ্গুড়া",
                    "আলীরগাঁও",
                    "ফতেপুর",
                    "নন্দিরগাঁও",
                    "তোয়াকুল",
                    "ডৌবাড়ী",
                ],
            ),
            (
                "জৈন্তাপুর",
                &[
                    "জৈন্তাপুর",
                    "চারিকাটা",
                    "দরবস্ত",
                    "ফতেহপুর",
                    "চিকনাগুল",
                    "নিজপাট",
                ],
            ),
        ];

        let upazilas = seed
            .iter()
            .map(|(name, _)| SettingsOption::same(name))
            .collect();
        let unions = seed
            .iter()
            .map(|(name, unions)| {
                (
                    name.to_string(),
                    unions.iter().map(|u| SettingsOption::same(u)).collect(),
                )
            })
            .collect();

        Self {
            categories,
            upazilas,
            unions,
        }
    }

    pub fn has_upazila(&self, upazila: &str) -> bool {
        self.upazilas.iter().any(|u| u.value == upazila)
    }

    pub fn unions_for(&self, upazila: &str) -> &[SettingsOption] {
        self.unions.get(upazila).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Label configured for a category, falling back to its stored value.
    pub fn category_label(&self, category: ProblemCategory) -> String {
        self.categories
            .iter()
            .find(|c| c.value == category.as_str())
            .map(|c| c.label.clone())
            .unwrap_or_else(|| category.as_str().to_string())
    }

    pub fn check_upazila(&self, upazila: &str) -> Result<(), ValidationError> {
        if self.has_upazila(upazila.trim()) {
            Ok(())
        } else {
            Err(setting_error("upazila_unknown", "উপজেলা নির্বাচন করুন"))
        }
    }

    pub fn check_union(&self, upazila: &str, union_name: &str) -> Result<(), ValidationError> {
        let union_name = union_name.trim();
        if self
            .unions_for(upazila.trim())
            .iter()
            .any(|u| u.value == union_name)
        {
            Ok(())
        } else {
            Err(setting_error("union_unknown", "ইউনিয়ন নির্বাচন করুন"))
        }
    }
}

/// Rejects option lists with blank or duplicate values, or blank labels.
pub fn validate_options(options: &[SettingsOption]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for option in options {
        if option.value.trim().is_empty() || option.label.trim().is_empty() {
            return Err(setting_error("option_blank", "মান ও লেবেল দুটোই লিখুন"));
        }
        if !seen.insert(option.value.as_str()) {
            return Err(setting_error("option_duplicate", "একই মান একাধিকবার দেওয়া হয়েছে"));
        }
    }
    Ok(())
}

/// Category options must name known categories.
pub fn validate_category_options(options: &[SettingsOption]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if let Err(err) = validate_options(options) {
        errors.add("categories", err);
    } else if options
        .iter()
        .any(|o| o.value.parse::<ProblemCategory>().is_err())
    {
        errors.add(
            "categories",
            setting_error("category_unknown", "অজানা সমস্যার ধরন"),
        );
    }
    if errors.errors().is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Upazila options must be non-blank and unique.
pub fn validate_upazila_options(options: &[SettingsOption]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if let Err(err) = validate_options(options) {
        errors.add("upazilas", err);
        return Err(errors);
    }
    Ok(())
}

/// Union lists must be keyed by a configured upazila.
pub fn validate_union_map(
    unions: &BTreeMap<String, Vec<SettingsOption>>,
    upazilas: &[SettingsOption],
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    for (upazila, options) in unions {
        if !upazilas.iter().any(|u| &u.value == upazila) {
            errors.add(
                "unions",
                setting_error("upazila_unknown", "উপজেলা নির্বাচন করুন"),
            );
            break;
        }
        if let Err(err) = validate_options(options) {
            errors.add("unions", err);
            break;
        }
    }
    if errors.errors().is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Stable slug for a known upazila, used by area pages.
pub fn upazila_slug(upazila: &str) -> String {
    match upazila {
        "কোম্পানীগঞ্জ" => "companiganj".to_string(),
        "গোয়াইনঘাট" => "gowainghat".to_string(),
        "জৈন্তাপুর" => "jaintapur".to_string(),
        other => other.to_string(),
    }
}

/// General site metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SiteInfo {
    #[validate(length(min = 1, max = 200, message = "সাইটের নাম লিখুন"))]
    pub site_name: String,
    pub tagline: String,
    pub logo_url: String,
    pub symbol_url: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub office_address: String,
}

/// Candidate profile shown on the site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CandidateInfo {
    #[validate(length(min = 1, max = 200, message = "প্রার্থীর নাম লিখুন"))]
    pub name: String,
    pub name_english: String,
    pub photo_url: String,
    pub designation: String,
    pub symbol: String,
    pub bio: String,
    pub vision: String,
    pub education: String,
    pub experience: String,
}

/// Social network profile links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SocialLinks {
    #[validate(custom(function = "validate_link"))]
    pub facebook: String,
    #[validate(custom(function = "validate_link"))]
    pub twitter: String,
    #[validate(custom(function = "validate_link"))]
    pub instagram: String,
    #[validate(custom(function = "validate_link"))]
    pub youtube: String,
    #[validate(custom(function = "validate_link"))]
    pub linkedin: String,
}

/// Empty links are allowed; anything else must be an http(s) URL.
fn validate_link(link: &str) -> Result<(), ValidationError> {
    let link = link.trim();
    if link.is_empty() || link.starts_with("https://") || link.starts_with("http://") {
        Ok(())
    } else {
        Err(setting_error("invalid_url", "সঠিক লিংক দিন"))
    }
}

/// All site settings in one response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettings {
    pub site_info: SiteInfo,
    pub candidate_info: CandidateInfo,
    pub social_links: SocialLinks,
}
