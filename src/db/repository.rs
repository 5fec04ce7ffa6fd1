//! Scheme record store over SQLite.
//!
//! Nested eligibility, contact and budget records are flattened into columns;
//! string lists are stored as JSON text.

use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::errors::AppError;
use crate::filter::{Clause, Column, Predicate};
use crate::models::{
    Budget, Category, ContactInfo, District, EducationLevel, Eligibility, Gender, Labelled,
    Location, Range, Scheme, SchemeDraft, SchemeStatus, ValueCount,
};

const COLUMNS: &str = "id, title, description, category, age_min, age_max, income_min, \
    income_max, education, gender, location, occupation, other_requirements, district, \
    benefits, documents, application_process, deadline, status, government_body, \
    contact_phone, contact_email, contact_website, contact_address, budget_amount, \
    budget_currency, tags, image, featured, views, applications, created_at, updated_at";

const NEWEST_FIRST: &str = " ORDER BY created_at DESC, rowid DESC";

/// Ids bound per statement; SQLite caps a statement at 32766 parameters.
const ID_BATCH: usize = 10_000;

/// Database repository for scheme records.
#[derive(Clone)]
pub struct SchemeRepository {
    pool: SqlitePool,
}

impl SchemeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Number of schemes satisfying the predicate's structured clauses.
    pub async fn count(&self, predicate: &Predicate) -> Result<u64, AppError> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS total FROM schemes");
        predicate.push_where(&mut builder);

        let row = builder.build().fetch_one(&self.pool).await?;
        let total: i64 = row.get("total");
        Ok(total.max(0) as u64)
    }

    /// One window of matching schemes, newest first.
    pub async fn find(
        &self,
        predicate: &Predicate,
        skip: u64,
        limit: u32,
    ) -> Result<Vec<Scheme>, AppError> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM schemes", COLUMNS));
        predicate.push_where(&mut builder);
        builder
            .push(NEWEST_FIRST)
            .push(" LIMIT ")
            .push_bind(i64::from(limit))
            .push(" OFFSET ")
            .push_bind(i64::try_from(skip).unwrap_or(i64::MAX));

        let rows = builder.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(scheme_from_row).collect())
    }

    /// Ids of every scheme satisfying the predicate.
    pub async fn matching_ids(&self, predicate: &Predicate) -> Result<HashSet<String>, AppError> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT id FROM schemes");
        predicate.push_where(&mut builder);

        let rows = builder.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    /// The subset of `ids` whose schemes satisfy the predicate, queried in
    /// batches of at most `ID_BATCH` ids.
    pub async fn matching_among(
        &self,
        predicate: &Predicate,
        ids: &[String],
    ) -> Result<HashSet<String>, AppError> {
        let mut matching = HashSet::new();
        for batch in ids.chunks(ID_BATCH) {
            let restricted = predicate.clone().and(Clause::IdIn(batch.to_vec()));
            matching.extend(self.matching_ids(&restricted).await?);
        }
        Ok(matching)
    }

    /// Fetch the given schemes in no particular order; unknown ids are skipped.
    pub async fn get_many(&self, ids: &[String]) -> Result<Vec<Scheme>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let predicate = Predicate::any().and(Clause::IdIn(ids.to_vec()));
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM schemes", COLUMNS));
        predicate.push_where(&mut builder);

        let rows = builder.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(scheme_from_row).collect())
    }

    /// Get a scheme by ID.
    pub async fn get(&self, id: &str) -> Result<Option<Scheme>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM schemes WHERE id = ?", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(scheme_from_row))
    }

    /// Every stored scheme, whatever its status.
    pub async fn list_all(&self) -> Result<Vec<Scheme>, AppError> {
        let rows = sqlx::query(&format!("SELECT {} FROM schemes{}", COLUMNS, NEWEST_FIRST))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(scheme_from_row).collect())
    }

    pub async fn is_empty(&self) -> Result<bool, AppError> {
        Ok(self.count(&Predicate::any()).await? == 0)
    }

    /// Bump the view counter. Returns false when the scheme no longer exists.
    pub async fn increment_views(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE schemes SET views = views + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert a new scheme with a fresh id and timestamps.
    pub async fn insert(&self, draft: &SchemeDraft) -> Result<Scheme, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        // stored with microsecond precision
        let now = Utc::now().trunc_subsecs(6);
        let stamp = timestamp(&now);

        let query = sqlx::query(
            "INSERT INTO schemes (title, description, category, age_min, age_max, income_min, \
             income_max, education, gender, location, occupation, other_requirements, district, \
             benefits, documents, application_process, deadline, status, government_body, \
             contact_phone, contact_email, contact_website, contact_address, budget_amount, \
             budget_currency, tags, image, featured, views, applications, created_at, updated_at, id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, \
             0, 0, ?, ?, ?)",
        );
        bind_draft(query, draft)
            .bind(&stamp)
            .bind(&stamp)
            .bind(&id)
            .execute(&self.pool)
            .await?;

        Ok(Scheme::new(id, draft.clone(), 0, 0, now, now))
    }

    /// Replace the caller-controlled fields of a scheme.
    ///
    /// Returns `None` when no scheme has this id.
    pub async fn update(&self, id: &str, draft: &SchemeDraft) -> Result<Option<Scheme>, AppError> {
        let stamp = timestamp(&Utc::now());

        let query = sqlx::query(
            "UPDATE schemes SET title = ?, description = ?, category = ?, age_min = ?, \
             age_max = ?, income_min = ?, income_max = ?, education = ?, gender = ?, \
             location = ?, occupation = ?, other_requirements = ?, district = ?, benefits = ?, \
             documents = ?, application_process = ?, deadline = ?, status = ?, \
             government_body = ?, contact_phone = ?, contact_email = ?, contact_website = ?, \
             contact_address = ?, budget_amount = ?, budget_currency = ?, tags = ?, image = ?, \
             featured = ?, updated_at = ? WHERE id = ?",
        );
        let result = bind_draft(query, draft)
            .bind(&stamp)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    /// Delete a scheme. Returns false when no scheme has this id.
    pub async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM schemes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Every distinct value of `column` with its number of Active schemes,
    /// sorted by value.
    pub async fn value_counts(&self, column: Column) -> Result<Vec<ValueCount>, AppError> {
        let sql = format!(
            "SELECT {col} AS value, \
             SUM(CASE WHEN status = ? THEN 1 ELSE 0 END) AS active \
             FROM schemes GROUP BY {col} ORDER BY {col}",
            col = column.name()
        );
        let rows = sqlx::query(&sql)
            .bind(SchemeStatus::Active.as_str())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| ValueCount {
                value: row.get("value"),
                count: row.get("active"),
            })
            .collect())
    }
}

fn bind_draft<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    draft: &'q SchemeDraft,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    let eligibility = &draft.eligibility;
    let contact = &draft.contact_info;

    query
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.category.as_str())
        .bind(eligibility.age.min)
        .bind(eligibility.age.max)
        .bind(eligibility.income.min)
        .bind(eligibility.income.max)
        .bind(eligibility.education.as_str())
        .bind(eligibility.gender.as_str())
        .bind(eligibility.location.as_str())
        .bind(&eligibility.occupation)
        .bind(to_json_array(&eligibility.other_requirements))
        .bind(draft.district.as_str())
        .bind(to_json_array(&draft.benefits))
        .bind(to_json_array(&draft.documents))
        .bind(&draft.application_process)
        .bind(draft.deadline.as_ref().map(timestamp))
        .bind(draft.status.as_str())
        .bind(&draft.government_body)
        .bind(&contact.phone)
        .bind(&contact.email)
        .bind(&contact.website)
        .bind(&contact.address)
        .bind(draft.budget.amount)
        .bind(&draft.budget.currency)
        .bind(to_json_array(&draft.tags))
        .bind(&draft.image)
        .bind(draft.featured as i32)
}

/// Fixed-width UTC timestamp so that text order is time order.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn parse_label<E: Labelled>(row: &SqliteRow, column: &str, fallback: E) -> E {
    let raw: String = row.get(column);
    E::from_label(&raw).unwrap_or_else(|| {
        tracing::warn!(column, value = %raw, "Unknown stored label, using default");
        fallback
    })
}

fn scheme_from_row(row: &SqliteRow) -> Scheme {
    let featured: i32 = row.get("featured");
    let deadline: Option<String> = row.get("deadline");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    let details = SchemeDraft {
        title: row.get("title"),
        description: row.get("description"),
        category: parse_label(row, "category", Category::Other),
        eligibility: Eligibility {
            age: Range {
                min: row.get("age_min"),
                max: row.get("age_max"),
            },
            income: Range {
                min: row.get("income_min"),
                max: row.get("income_max"),
            },
            education: parse_label(row, "education", EducationLevel::default()),
            gender: parse_label(row, "gender", Gender::default()),
            location: parse_label(row, "location", Location::default()),
            occupation: row.get("occupation"),
            other_requirements: parse_json_array(row.get("other_requirements")),
        },
        district: parse_label(row, "district", District::default()),
        benefits: parse_json_array(row.get("benefits")),
        documents: parse_json_array(row.get("documents")),
        application_process: row.get("application_process"),
        deadline: deadline.as_deref().and_then(parse_timestamp),
        status: parse_label(row, "status", SchemeStatus::default()),
        government_body: row.get("government_body"),
        contact_info: ContactInfo {
            phone: row.get("contact_phone"),
            email: row.get("contact_email"),
            website: row.get("contact_website"),
            address: row.get("contact_address"),
        },
        budget: Budget {
            amount: row.get("budget_amount"),
            currency: row.get("budget_currency"),
        },
        tags: parse_json_array(row.get("tags")),
        image: row.get("image"),
        featured: featured != 0,
    };

    Scheme::new(
        row.get("id"),
        details,
        row.get("views"),
        row.get("applications"),
        parse_timestamp(&created_at).unwrap_or_default(),
        parse_timestamp(&updated_at).unwrap_or_default(),
    )
}

fn to_json_array(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

fn parse_json_array(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}
