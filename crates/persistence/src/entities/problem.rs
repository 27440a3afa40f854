//! Problem entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Problem, ProblemCategory, ProblemStatus};
use sqlx::FromRow;

/// Database enum for problem_category that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "problem_category", rename_all = "snake_case")]
pub enum ProblemCategoryDb {
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

impl From<ProblemCategory> for ProblemCategoryDb {
    fn from(category: ProblemCategory) -> Self {
        match category {
            ProblemCategory::Road => ProblemCategoryDb::Road,
            ProblemCategory::Water => ProblemCategoryDb::Water,
            ProblemCategory::Electricity => ProblemCategoryDb::Electricity,
            ProblemCategory::Education => ProblemCategoryDb::Education,
            ProblemCategory::Health => ProblemCategoryDb::Health,
            ProblemCategory::Agriculture => ProblemCategoryDb::Agriculture,
            ProblemCategory::Internet => ProblemCategoryDb::Internet,
            ProblemCategory::LawAndOrder => ProblemCategoryDb::LawAndOrder,
            ProblemCategory::Other => ProblemCategoryDb::Other,
        }
    }
}

impl From<ProblemCategoryDb> for ProblemCategory {
    fn from(category: ProblemCategoryDb) -> Self {
        match category {
            ProblemCategoryDb::Road => ProblemCategory::Road,
            ProblemCategoryDb::Water => ProblemCategory::Water,
            ProblemCategoryDb::Electricity => ProblemCategory::Electricity,
            ProblemCategoryDb::Education => ProblemCategory::Education,
            ProblemCategoryDb::Health => ProblemCategory::Health,
            ProblemCategoryDb::Agriculture => ProblemCategory::Agriculture,
            ProblemCategoryDb::Internet => ProblemCategory::Internet,
            ProblemCategoryDb::LawAndOrder => ProblemCategory::LawAndOrder,
            ProblemCategoryDb::Other => ProblemCategory::Other,
        }
    }
}

/// Database enum for problem_status that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "problem_status", rename_all = "snake_case")]
pub enum ProblemStatusDb {
    Pending,
    Approved,
    InProgress,
    Resolved,
    Rejected,
}

impl From<ProblemStatus> for ProblemStatusDb {
    fn from(status: ProblemStatus) -> Self {
        match status {
            ProblemStatus::Pending => ProblemStatusDb::Pending,
            ProblemStatus::Approved => ProblemStatusDb::Approved,
            ProblemStatus::InProgress => ProblemStatusDb::InProgress,
            ProblemStatus::Resolved => ProblemStatusDb::Resolved,
            ProblemStatus::Rejected => ProblemStatusDb::Rejected,
        }
    }
}

impl From<ProblemStatusDb> for ProblemStatus {
    fn from(status: ProblemStatusDb) -> Self {
        match status {
            ProblemStatusDb::Pending => ProblemStatus::Pending,
            ProblemStatusDb::Approved => ProblemStatus::Approved,
            ProblemStatusDb::InProgress => ProblemStatus::InProgress,
            ProblemStatusDb::Resolved => ProblemStatus::Resolved,
            ProblemStatusDb::Rejected => ProblemStatus::Rejected,
        }
    }
}

/// Database row mapping for the problems table.
#[derive(Debug, Clone, FromRow)]
pub struct ProblemEntity {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub category: ProblemCategoryDb,
    pub upazila: String,
    pub union_name: String,
    pub ward: Option<String>,
    pub address_details: Option<String>,
    pub submitter_name: String,
    pub submitter_phone: String,
    pub status: ProblemStatusDb,
    pub images: Vec<String>,
    pub votes_count: i64,
    pub views_count: i64,
}

impl From<ProblemEntity> for Problem {
    fn from(entity: ProblemEntity) -> Self {
        Self {
            id: entity.id,
            created_at: entity.created_at,
            title: entity.title,
            description: entity.description,
            category: entity.category.into(),
            upazila: entity.upazila,
            union_name: entity.union_name,
            ward: entity.ward,
            address_details: entity.address_details,
            submitter_name: entity.submitter_name,
            submitter_phone: entity.submitter_phone,
            status: entity.status.into(),
            images: entity.images,
            votes_count: entity.votes_count,
            views_count: entity.views_count,
        }
    }
}

/// One `(upazila, status)` pair for upazila statistics.
#[derive(Debug, Clone, FromRow)]
pub struct UpazilaStatusEntity {
    pub upazila: String,
    pub status: ProblemStatusDb,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_problem_entity() -> ProblemEntity {
        ProblemEntity {
            id: 12,
            created_at: Utc::now(),
            title: "ভাঙা কালভার্ট".to_string(),
            description: "কালভার্ট ভেঙে যাওয়ায় দুই গ্রামের যোগাযোগ বন্ধ হয়ে আছে।".to_string(),
            category: ProblemCategoryDb::LawAndOrder,
            upazila: "জৈন্তাপুর".to_string(),
            union_name: "নিজপাট".to_string(),
            ward: None,
            address_details: Some("বাজারের পাশে".to_string()),
            submitter_name: "সালমা".to_string(),
            submitter_phone: "01912345678".to_string(),
            status: ProblemStatusDb::InProgress,
            images: vec!["/uploads/problem-images/1.jpg".to_string()],
            votes_count: 4,
            views_count: 30,
        }
    }

    #[test]
    fn test_problem_entity_to_domain() {
        let entity = create_test_problem_entity();
        let problem: Problem = entity.clone().into();

        assert_eq!(problem.id, entity.id);
        assert_eq!(problem.category, ProblemCategory::LawAndOrder);
        assert_eq!(problem.status, ProblemStatus::InProgress);
        assert_eq!(problem.images, entity.images);
        assert_eq!(problem.votes_count, 4);
        assert_eq!(problem.views_count, 30);
    }

    #[test]
    fn test_category_db_roundtrip() {
        for category in ProblemCategory::ALL {
            let db: ProblemCategoryDb = category.into();
            assert_eq!(ProblemCategory::from(db), category);
        }
    }

    #[test]
    fn test_status_db_roundtrip() {
        for status in ProblemStatus::ALL {
            let db: ProblemStatusDb = status.into();
            assert_eq!(ProblemStatus::from(db), status);
        }
    }
}
