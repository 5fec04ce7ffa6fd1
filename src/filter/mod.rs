//! Eligibility filter compiler.
//!
//! Turns a flat set of optional visitor criteria into a single conjunctive
//! [`Predicate`] over the `schemes` table. Records can mark themselves as
//! universally eligible with the `Any`/`Both`/`All Districts` escape values, so
//! a concrete query value always matches both itself and the escape value.
//! Age and income use range containment: the visitor's value must fall inside
//! the band the scheme declares.
//!
//! Free-text search is carried on the predicate but never rendered to SQL;
//! the orchestrator resolves it through the search index.

use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite};

use crate::models::{Category, District, EducationLevel, Gender, Location, SchemeStatus};

/// Criteria a visitor can narrow schemes by. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub education: Option<EducationLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<District>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

/// Filterable columns of the `schemes` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    Category,
    Status,
    Featured,
    AgeMin,
    AgeMax,
    IncomeMin,
    IncomeMax,
    Education,
    Gender,
    Location,
    District,
}

impl Column {
    pub fn name(self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::Category => "category",
            Column::Status => "status",
            Column::Featured => "featured",
            Column::AgeMin => "age_min",
            Column::AgeMax => "age_max",
            Column::IncomeMin => "income_min",
            Column::IncomeMax => "income_max",
            Column::Education => "education",
            Column::Gender => "gender",
            Column::Location => "location",
            Column::District => "district",
        }
    }
}

/// One conjunct of a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// `column = value`
    Equals(Column, &'static str),
    /// `column IN (values)`
    OneOf(Column, Vec<&'static str>),
    /// `min <= value AND max >= value`
    Within {
        min: Column,
        max: Column,
        value: i64,
    },
    /// Boolean column is true.
    IsSet(Column),
    /// Record id is one of the given ids; an empty list matches nothing.
    IdIn(Vec<String>),
}

/// A conjunction of clauses plus an optional free-text query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    clauses: Vec<Clause>,
    text: Option<String>,
}

impl Predicate {
    /// Matches every record, whatever its status.
    pub fn any() -> Self {
        Self::default()
    }

    /// Baseline for every public listing: only Active schemes.
    pub fn active() -> Self {
        Self::any().and(Clause::Equals(
            Column::Status,
            SchemeStatus::Active.as_str(),
        ))
    }

    pub fn and(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Attach a free-text query; blank text is ignored.
    pub fn matching_text(mut self, text: &str) -> Self {
        let text = text.trim();
        if !text.is_empty() {
            self.text = Some(text.to_string());
        }
        self
    }

    #[cfg(test)]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Append ` WHERE ...` for the structured clauses to `builder`.
    pub fn push_where<'args>(&self, builder: &mut QueryBuilder<'args, Sqlite>) {
        if self.clauses.is_empty() {
            return;
        }

        builder.push(" WHERE ");
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                builder.push(" AND ");
            }
            push_clause(builder, clause);
        }
    }
}

fn push_clause<'args>(builder: &mut QueryBuilder<'args, Sqlite>, clause: &Clause) {
    match clause {
        Clause::Equals(column, value) => {
            builder.push(column.name()).push(" = ").push_bind(*value);
        }
        Clause::OneOf(column, values) => {
            builder.push(column.name()).push(" IN (");
            let mut list = builder.separated(", ");
            for value in values {
                list.push_bind(*value);
            }
            list.push_unseparated(")");
        }
        Clause::Within { min, max, value } => {
            builder
                .push(min.name())
                .push(" <= ")
                .push_bind(*value)
                .push(" AND ")
                .push(max.name())
                .push(" >= ")
                .push_bind(*value);
        }
        Clause::IsSet(column) => {
            builder.push(column.name()).push(" = 1");
        }
        Clause::IdIn(ids) if ids.is_empty() => {
            builder.push("0 = 1");
        }
        Clause::IdIn(ids) => {
            builder.push(Column::Id.name()).push(" IN (");
            let mut list = builder.separated(", ");
            for id in ids {
                list.push_bind(id.clone());
            }
            list.push_unseparated(")");
        }
    }
}

/// Compile visitor criteria into a predicate over Active schemes.
pub fn compile(criteria: &FilterCriteria) -> Predicate {
    let mut predicate = Predicate::active();

    if let Some(category) = criteria.category {
        predicate = predicate.and(Clause::Equals(Column::Category, category.as_str()));
    }

    if let Some(age) = criteria.age {
        predicate = predicate.and(Clause::Within {
            min: Column::AgeMin,
            max: Column::AgeMax,
            value: age,
        });
    }

    if let Some(income) = criteria.income {
        predicate = predicate.and(Clause::Within {
            min: Column::IncomeMin,
            max: Column::IncomeMax,
            value: income,
        });
    }

    if let Some(education) = criteria.education {
        predicate = predicate.and(Clause::OneOf(
            Column::Education,
            or_wildcard(education.as_str(), EducationLevel::Any.as_str()),
        ));
    }

    if let Some(gender) = criteria.gender {
        predicate = predicate.and(Clause::OneOf(
            Column::Gender,
            or_wildcard(gender.as_str(), Gender::Any.as_str()),
        ));
    }

    if let Some(location) = criteria.location {
        predicate = predicate.and(Clause::OneOf(
            Column::Location,
            or_wildcard(location.as_str(), Location::Both.as_str()),
        ));
    }

    // "All Districts" as a query value means no district constraint
    if let Some(district) = criteria.district.filter(|d| *d != District::AllDistricts) {
        predicate = predicate.and(Clause::OneOf(
            Column::District,
            or_wildcard(district.as_str(), District::AllDistricts.as_str()),
        ));
    }

    if let Some(search) = &criteria.search {
        predicate = predicate.matching_text(search);
    }

    predicate
}

fn or_wildcard(value: &'static str, wildcard: &'static str) -> Vec<&'static str> {
    if value == wildcard {
        vec![value]
    } else {
        vec![value, wildcard]
    }
}

#[cfg(test)]
impl Predicate {
    /// In-memory evaluation of the structured clauses, mirroring the SQL.
    pub fn matches(&self, scheme: &crate::models::Scheme) -> bool {
        self.clauses.iter().all(|clause| clause_matches(clause, scheme))
    }
}

#[cfg(test)]
fn clause_matches(clause: &Clause, scheme: &crate::models::Scheme) -> bool {
    let d = &scheme.details;
    let text = |column: Column| -> String {
        match column {
            Column::Id => scheme.id.clone(),
            Column::Category => d.category.as_str().to_string(),
            Column::Status => d.status.as_str().to_string(),
            Column::Education => d.eligibility.education.as_str().to_string(),
            Column::Gender => d.eligibility.gender.as_str().to_string(),
            Column::Location => d.eligibility.location.as_str().to_string(),
            Column::District => d.district.as_str().to_string(),
            other => panic!("{:?} is not a text column", other),
        }
    };
    let number = |column: Column| -> i64 {
        match column {
            Column::AgeMin => d.eligibility.age.min,
            Column::AgeMax => d.eligibility.age.max,
            Column::IncomeMin => d.eligibility.income.min,
            Column::IncomeMax => d.eligibility.income.max,
            Column::Featured => i64::from(d.featured),
            other => panic!("{:?} is not a numeric column", other),
        }
    };

    match clause {
        Clause::Equals(column, value) => text(*column) == *value,
        Clause::OneOf(column, values) => values.contains(&text(*column).as_str()),
        Clause::Within { min, max, value } => number(*min) <= *value && number(*max) >= *value,
        Clause::IsSet(column) => number(*column) == 1,
        Clause::IdIn(ids) => ids.contains(&scheme.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Range, Scheme, SchemeDraft, SchemeLabels};

    fn scheme(configure: impl FnOnce(&mut SchemeDraft)) -> Scheme {
        let mut details = SchemeDraft {
            title: "Test Scheme".to_string(),
            description: "A scheme".to_string(),
            category: Category::Education,
            eligibility: Default::default(),
            district: District::AllDistricts,
            benefits: vec!["Benefit".to_string()],
            documents: vec!["Aadhaar Card".to_string()],
            application_process: "Apply online".to_string(),
            deadline: None,
            status: SchemeStatus::Active,
            government_body: "Department".to_string(),
            contact_info: Default::default(),
            budget: Default::default(),
            tags: vec![],
            image: None,
            featured: false,
        };
        configure(&mut details);
        let labels = SchemeLabels::describe(&details);
        Scheme {
            id: "test-id".to_string(),
            details,
            views: 0,
            applications: 0,
            created_at: Default::default(),
            updated_at: Default::default(),
            labels,
        }
    }

    #[test]
    fn test_empty_criteria_only_requires_active() {
        let predicate = compile(&FilterCriteria::default());
        assert_eq!(
            predicate.clauses(),
            &[Clause::Equals(Column::Status, "Active")]
        );
        assert!(predicate.text().is_none());
    }

    #[test]
    fn test_inactive_schemes_never_match() {
        let predicate = compile(&FilterCriteria::default());
        assert!(predicate.matches(&scheme(|_| {})));
        assert!(!predicate.matches(&scheme(|s| s.status = SchemeStatus::Inactive)));
        assert!(!predicate.matches(&scheme(|s| s.status = SchemeStatus::Upcoming)));
    }

    #[test]
    fn test_gender_any_matches_every_concrete_gender() {
        let universal = scheme(|s| s.eligibility.gender = Gender::Any);
        let women_only = scheme(|s| s.eligibility.gender = Gender::Female);

        for gender in [Gender::Male, Gender::Female] {
            let predicate = compile(&FilterCriteria {
                gender: Some(gender),
                ..Default::default()
            });
            assert!(predicate.matches(&universal));
            assert_eq!(predicate.matches(&women_only), gender == Gender::Female);
        }
    }

    #[test]
    fn test_all_districts_matches_every_concrete_district() {
        let everywhere = scheme(|s| s.district = District::AllDistricts);
        let madurai = scheme(|s| s.district = District::Madurai);

        for district in District::ALL.iter().copied() {
            let predicate = compile(&FilterCriteria {
                district: Some(district),
                ..Default::default()
            });
            assert!(predicate.matches(&everywhere));
            if district != District::AllDistricts {
                assert_eq!(predicate.matches(&madurai), district == District::Madurai);
            }
        }
    }

    #[test]
    fn test_all_districts_query_adds_no_constraint() {
        let predicate = compile(&FilterCriteria {
            district: Some(District::AllDistricts),
            ..Default::default()
        });
        assert_eq!(predicate, Predicate::active());
    }

    #[test]
    fn test_location_both_is_the_wildcard() {
        let predicate = compile(&FilterCriteria {
            location: Some(Location::Rural),
            ..Default::default()
        });
        assert!(predicate.matches(&scheme(|s| s.eligibility.location = Location::Both)));
        assert!(predicate.matches(&scheme(|s| s.eligibility.location = Location::Rural)));
        assert!(!predicate.matches(&scheme(|s| s.eligibility.location = Location::Urban)));
    }

    #[test]
    fn test_education_any_is_the_wildcard() {
        let predicate = compile(&FilterCriteria {
            education: Some(EducationLevel::Graduate),
            ..Default::default()
        });
        assert!(predicate.matches(&scheme(|s| s.eligibility.education = EducationLevel::Any)));
        assert!(!predicate.matches(&scheme(|s| {
            s.eligibility.education = EducationLevel::Primary
        })));
    }

    #[test]
    fn test_age_uses_range_containment() {
        let predicate = compile(&FilterCriteria {
            age: Some(70),
            ..Default::default()
        });
        let working_age = scheme(|s| s.eligibility.age = Range { min: 18, max: 65 });
        let all_ages = scheme(|s| s.eligibility.age = Range { min: 0, max: 120 });

        assert!(!predicate.matches(&working_age));
        assert!(predicate.matches(&all_ages));
    }

    #[test]
    fn test_inverted_income_range_matches_nothing() {
        let inverted = scheme(|s| s.eligibility.income = Range { min: 500, max: 100 });
        for income in [0, 100, 300, 500, 1000] {
            let predicate = compile(&FilterCriteria {
                income: Some(income),
                ..Default::default()
            });
            assert!(!predicate.matches(&inverted));
        }
    }

    #[test]
    fn test_search_is_carried_as_text() {
        let predicate = compile(&FilterCriteria {
            search: Some("  farmer insurance ".to_string()),
            category: Some(Category::Agriculture),
            ..Default::default()
        });
        assert_eq!(predicate.text(), Some("farmer insurance"));
        assert_eq!(predicate.clauses().len(), 2);

        let blank = compile(&FilterCriteria {
            search: Some("   ".to_string()),
            ..Default::default()
        });
        assert!(blank.text().is_none());
    }

    #[test]
    fn test_sql_rendering() {
        let predicate = compile(&FilterCriteria {
            category: Some(Category::Housing),
            age: Some(30),
            gender: Some(Gender::Female),
            district: Some(District::Chennai),
            ..Default::default()
        });

        let mut builder = QueryBuilder::<Sqlite>::new("SELECT id FROM schemes");
        predicate.push_where(&mut builder);
        let sql = builder.sql();

        assert!(sql.starts_with("SELECT id FROM schemes WHERE status = "));
        assert!(sql.contains(" AND category = "));
        assert!(sql.contains(" AND age_min <= "));
        assert!(sql.contains(" AND age_max >= "));
        assert!(sql.contains(" AND gender IN ("));
        assert!(sql.contains(" AND district IN ("));
        assert!(!sql.contains("search"));
    }

    #[test]
    fn test_empty_id_list_renders_false() {
        let predicate = Predicate::any().and(Clause::IdIn(vec![]));
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT id FROM schemes");
        predicate.push_where(&mut builder);
        assert_eq!(builder.sql(), "SELECT id FROM schemes WHERE 0 = 1");
    }

    #[test]
    fn test_any_predicate_renders_no_where() {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT id FROM schemes");
        Predicate::any().push_where(&mut builder);
        assert_eq!(builder.sql(), "SELECT id FROM schemes");
    }
}
