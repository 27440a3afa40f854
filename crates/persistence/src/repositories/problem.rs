//! Problem repository for database operations.

use domain::models::{
    NewProblem, Problem, ProblemCategory, ProblemFilter, ProblemStatus, SearchScope,
};
use shared::pagination::PageRequest;
use sqlx::PgPool;

use crate::entities::{ProblemCategoryDb, ProblemEntity, ProblemStatusDb, UpazilaStatusEntity};
use crate::metrics::QueryTimer;

const PROBLEM_COLUMNS: &str = "id, created_at, title, description, category, upazila, union_name, \
     ward, address_details, submitter_name, submitter_phone, status, images, votes_count, views_count";

/// Escapes LIKE wildcards and wraps the term for a substring match.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Builds the WHERE clause for a problem filter.
/// Tracks conditions and parameter positions for dynamic binding.
struct ProblemFilterBuilder {
    conditions: Vec<String>,
    param_count: i32,
}

impl ProblemFilterBuilder {
    fn build(filter: &ProblemFilter) -> Self {
        let mut conditions = Vec::new();
        let mut param_count = 0;

        if filter.category.is_some() {
            param_count += 1;
            conditions.push(format!("category = ${}", param_count));
        }

        if filter.status.is_some() {
            param_count += 1;
            conditions.push(format!("status = ${}", param_count));
        }

        if filter.upazila.is_some() {
            param_count += 1;
            conditions.push(format!("upazila = ${}", param_count));
        }

        if filter.search.is_some() {
            param_count += 1;
            let p = param_count;
            conditions.push(match filter.scope {
                SearchScope::Content => {
                    format!("(title ILIKE ${p} OR description ILIKE ${p})")
                }
                SearchScope::ContentAndSubmitter => format!(
                    "(title ILIKE ${p} OR description ILIKE ${p} OR submitter_name ILIKE ${p})"
                ),
            });
        }

        Self {
            conditions,
            param_count,
        }
    }

    fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            "TRUE".to_string()
        } else {
            self.conditions.join(" AND ")
        }
    }

    fn param_count(&self) -> i32 {
        self.param_count
    }
}

/// Binds the filter values in the order `ProblemFilterBuilder` numbered them.
macro_rules! bind_problem_filters {
    ($builder:expr, $filter:expr, $pattern:expr) => {{
        let mut b = $builder;
        if let Some(category) = $filter.category {
            b = b.bind(ProblemCategoryDb::from(category));
        }
        if let Some(status) = $filter.status {
            b = b.bind(ProblemStatusDb::from(status));
        }
        if let Some(ref upazila) = $filter.upazila {
            b = b.bind(upazila);
        }
        if let Some(ref pattern) = $pattern {
            b = b.bind(pattern);
        }
        b
    }};
}

/// Counter columns updated by read-modify-write.
#[derive(Debug, Clone, Copy)]
enum Counter {
    Votes,
    Views,
}

impl Counter {
    fn column(self) -> &'static str {
        match self {
            Counter::Votes => "votes_count",
            Counter::Views => "views_count",
        }
    }

    fn read_query_name(self) -> &'static str {
        match self {
            Counter::Votes => "read_problem_votes",
            Counter::Views => "read_problem_views",
        }
    }

    fn write_query_name(self) -> &'static str {
        match self {
            Counter::Votes => "write_problem_votes",
            Counter::Views => "write_problem_views",
        }
    }
}

/// Repository for problem database operations.
#[derive(Clone)]
pub struct ProblemRepository {
    pool: PgPool,
}

impl ProblemRepository {
    /// Creates a new ProblemRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new problem. Status starts at pending and both counters at zero.
    pub async fn insert(&self, problem: &NewProblem) -> Result<Problem, sqlx::Error> {
        let timer = QueryTimer::new("insert_problem");
        let query = format!(
            r#"
            INSERT INTO problems (
                title, description, category, upazila, union_name, ward,
                address_details, submitter_name, submitter_phone, status,
                images, votes_count, views_count
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', $10, 0, 0)
            RETURNING {}
            "#,
            PROBLEM_COLUMNS
        );
        let result = sqlx::query_as::<_, ProblemEntity>(&query)
            .bind(&problem.title)
            .bind(&problem.description)
            .bind(ProblemCategoryDb::from(problem.category))
            .bind(&problem.upazila)
            .bind(&problem.union_name)
            .bind(&problem.ward)
            .bind(&problem.address_details)
            .bind(&problem.submitter_name)
            .bind(&problem.submitter_phone)
            .bind(&problem.images)
            .fetch_one(&self.pool)
            .await;
        timer.finish(&result);
        result.map(Into::into)
    }

    /// Find a problem by id.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Problem>, sqlx::Error> {
        let timer = QueryTimer::new("find_problem_by_id");
        let query = format!("SELECT {} FROM problems WHERE id = $1", PROBLEM_COLUMNS);
        let result = sqlx::query_as::<_, ProblemEntity>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.finish(&result);
        Ok(result?.map(Into::into))
    }

    /// List problems newest first with filtering and pagination.
    ///
    /// Returns the page and the total number of matching rows.
    pub async fn list(
        &self,
        filter: &ProblemFilter,
        page: &PageRequest,
    ) -> Result<(Vec<Problem>, i64), sqlx::Error> {
        let builder = ProblemFilterBuilder::build(filter);
        let where_clause = builder.where_clause();
        let param_count = builder.param_count();
        let pattern = filter.search.as_deref().map(like_pattern);

        let timer = QueryTimer::new("count_filtered_problems");
        let count_query = format!("SELECT COUNT(*) FROM problems WHERE {}", where_clause);
        let count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        let count_builder = bind_problem_filters!(count_builder, filter, pattern);
        let total = count_builder.fetch_one(&self.pool).await;
        timer.finish(&total);
        let total = total?;

        let timer = QueryTimer::new("list_problems");
        let list_query = format!(
            r#"
            SELECT {}
            FROM problems
            WHERE {}
            ORDER BY created_at DESC, id DESC
            LIMIT ${} OFFSET ${}
            "#,
            PROBLEM_COLUMNS,
            where_clause,
            param_count + 1,
            param_count + 2
        );
        let list_builder = sqlx::query_as::<_, ProblemEntity>(&list_query);
        let list_builder = bind_problem_filters!(list_builder, filter, pattern);
        let entities = list_builder
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await;
        timer.finish(&entities);

        Ok((entities?.into_iter().map(Into::into).collect(), total))
    }

    /// Newest problems, up to `limit`.
    pub async fn recent(&self, limit: i64) -> Result<Vec<Problem>, sqlx::Error> {
        let timer = QueryTimer::new("recent_problems");
        let query = format!(
            "SELECT {} FROM problems ORDER BY created_at DESC, id DESC LIMIT $1",
            PROBLEM_COLUMNS
        );
        let result = sqlx::query_as::<_, ProblemEntity>(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await;
        timer.finish(&result);
        Ok(result?.into_iter().map(Into::into).collect())
    }

    /// Set a problem's status. Any status may follow any other.
    pub async fn update_status(
        &self,
        id: i64,
        status: ProblemStatus,
    ) -> Result<Option<Problem>, sqlx::Error> {
        let timer = QueryTimer::new("update_problem_status");
        let query = format!(
            "UPDATE problems SET status = $2 WHERE id = $1 RETURNING {}",
            PROBLEM_COLUMNS
        );
        let result = sqlx::query_as::<_, ProblemEntity>(&query)
            .bind(id)
            .bind(ProblemStatusDb::from(status))
            .fetch_optional(&self.pool)
            .await;
        timer.finish(&result);
        Ok(result?.map(Into::into))
    }

    /// Add one vote: read the current count, then write it back plus one.
    pub async fn increment_votes(&self, id: i64) -> Result<Option<Problem>, sqlx::Error> {
        self.read_modify_write(id, Counter::Votes).await
    }

    /// Add one view: read the current count, then write it back plus one.
    pub async fn increment_views(&self, id: i64) -> Result<Option<Problem>, sqlx::Error> {
        self.read_modify_write(id, Counter::Views).await
    }

    /// Two separate statements without a row lock; concurrent writers may
    /// overwrite each other's increment.
    async fn read_modify_write(
        &self,
        id: i64,
        counter: Counter,
    ) -> Result<Option<Problem>, sqlx::Error> {
        let read_timer = QueryTimer::new(counter.read_query_name());
        let read_query = format!("SELECT {} FROM problems WHERE id = $1", counter.column());
        let current = sqlx::query_scalar::<_, i64>(&read_query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        read_timer.finish(&current);
        let Some(current) = current? else {
            return Ok(None);
        };

        let write_timer = QueryTimer::new(counter.write_query_name());
        let write_query = format!(
            "UPDATE problems SET {} = $2 WHERE id = $1 RETURNING {}",
            counter.column(),
            PROBLEM_COLUMNS
        );
        let result = sqlx::query_as::<_, ProblemEntity>(&write_query)
            .bind(id)
            .bind(current + 1)
            .fetch_optional(&self.pool)
            .await;
        write_timer.finish(&result);
        Ok(result?.map(Into::into))
    }

    /// Delete a problem, returning the removed row.
    pub async fn delete(&self, id: i64) -> Result<Option<Problem>, sqlx::Error> {
        let timer = QueryTimer::new("delete_problem");
        let query = format!("DELETE FROM problems WHERE id = $1 RETURNING {}", PROBLEM_COLUMNS);
        let result = sqlx::query_as::<_, ProblemEntity>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.finish(&result);
        Ok(result?.map(Into::into))
    }

    /// Count all problems.
    pub async fn count_all(&self) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_problems");
        let result = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM problems")
            .fetch_one(&self.pool)
            .await;
        timer.finish(&result);
        result
    }

    /// Count problems with one status.
    pub async fn count_by_status(&self, status: ProblemStatus) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_problems_by_status");
        let result =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM problems WHERE status = $1")
                .bind(ProblemStatusDb::from(status))
                .fetch_one(&self.pool)
                .await;
        timer.finish(&result);
        result
    }

    /// Count problems in one category.
    pub async fn count_by_category(&self, category: ProblemCategory) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_problems_by_category");
        let result =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM problems WHERE category = $1")
                .bind(ProblemCategoryDb::from(category))
                .fetch_one(&self.pool)
                .await;
        timer.finish(&result);
        result
    }

    /// Count problems in one upazila.
    pub async fn count_by_upazila(&self, upazila: &str) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_problems_by_upazila");
        let result =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM problems WHERE upazila = $1")
                .bind(upazila)
                .fetch_one(&self.pool)
                .await;
        timer.finish(&result);
        result
    }

    /// `(upazila, status)` of the newest problems, capped at `limit` rows.
    pub async fn upazila_status_pairs(
        &self,
        limit: i64,
    ) -> Result<Vec<(String, ProblemStatus)>, sqlx::Error> {
        let timer = QueryTimer::new("problem_upazila_status_pairs");
        let result = sqlx::query_as::<_, UpazilaStatusEntity>(
            r#"
            SELECT upazila, status
            FROM problems
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);
        Ok(result?
            .into_iter()
            .map(|row| (row.upazila, row.status.into()))
            .collect())
    }
}
