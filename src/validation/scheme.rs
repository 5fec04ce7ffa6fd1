//! Scheme entity validator.
//!
//! Gates create and update requests and applies the save-time normalization:
//! titles are title-cased and empty tag lists are derived from the category
//! and the first three title words.

use chrono::{DateTime, NaiveDate, Utc};

use super::Checker;
use crate::errors::AppError;
use crate::models::{
    Budget, BudgetPayload, Category, ContactInfo, District, Eligibility, EligibilityPayload,
    Range, RangePayload, SchemeDraft, SchemePayload, SchemeStatus, AGE_BOUNDS,
};

pub const MAX_TITLE_CHARS: usize = 200;

/// Validate a create request into a normalized draft.
pub fn validate_create(payload: SchemePayload) -> Result<SchemeDraft, AppError> {
    let mut check = Checker::default();

    let title = check.title(payload.title);
    let description = check.required_text(
        "description",
        payload.description,
        "Description is required",
    );
    let category = check.required_labelled::<Category>(
        "category",
        payload.category.as_deref(),
        "Category is required",
    );
    let benefits = check.non_empty_list(
        "benefits",
        payload.benefits,
        "At least one benefit is required",
    );
    let documents = check.non_empty_list(
        "documents",
        payload.documents,
        "At least one document is required",
    );
    let application_process = check.required_text(
        "applicationProcess",
        payload.application_process,
        "Application process is required",
    );
    let government_body = check.required_text(
        "governmentBody",
        payload.government_body,
        "Government body is required",
    );
    let eligibility = check.eligibility(payload.eligibility, Eligibility::default());
    let district = check
        .labelled::<District>("district", payload.district.as_deref())
        .unwrap_or_default();
    let status = check
        .labelled::<SchemeStatus>("status", payload.status.as_deref())
        .unwrap_or_default();
    let deadline = match payload.deadline {
        Some(raw) => check.deadline(&raw),
        None => None,
    };
    let contact_info = check.contact_info(payload.contact_info.unwrap_or_default());
    let budget = check.budget(payload.budget, Budget::default());
    let image = match payload.image {
        Some(raw) => check.url("image", &raw),
        None => None,
    };

    check.finish()?;
    let Some(category) = category else {
        return Err(AppError::validation("category", "Category is required"));
    };

    Ok(normalize(SchemeDraft {
        title,
        description,
        category,
        eligibility,
        district,
        benefits,
        documents,
        application_process,
        deadline,
        status,
        government_body,
        contact_info,
        budget,
        tags: clean_list(payload.tags.unwrap_or_default()),
        image,
        featured: payload.featured.unwrap_or(false),
    }))
}

/// Validate only the supplied fields of an update and merge them over `existing`.
pub fn validate_update(
    existing: SchemeDraft,
    payload: SchemePayload,
) -> Result<SchemeDraft, AppError> {
    let mut check = Checker::default();
    let mut draft = existing;

    if payload.title.is_some() {
        draft.title = check.title(payload.title);
    }
    if payload.description.is_some() {
        draft.description = check.required_text(
            "description",
            payload.description,
            "Description is required",
        );
    }
    if let Some(raw) = payload.category.as_deref() {
        if let Some(category) =
            check.required_labelled("category", Some(raw), "Category is required")
        {
            draft.category = category;
        }
    }
    if payload.benefits.is_some() {
        draft.benefits = check.non_empty_list(
            "benefits",
            payload.benefits,
            "At least one benefit is required",
        );
    }
    if payload.documents.is_some() {
        draft.documents = check.non_empty_list(
            "documents",
            payload.documents,
            "At least one document is required",
        );
    }
    if payload.application_process.is_some() {
        draft.application_process = check.required_text(
            "applicationProcess",
            payload.application_process,
            "Application process is required",
        );
    }
    if payload.government_body.is_some() {
        draft.government_body = check.required_text(
            "governmentBody",
            payload.government_body,
            "Government body is required",
        );
    }
    if payload.eligibility.is_some() {
        draft.eligibility = check.eligibility(payload.eligibility, draft.eligibility);
    }
    if let Some(district) = check.labelled("district", payload.district.as_deref()) {
        draft.district = district;
    }
    if let Some(status) = check.labelled("status", payload.status.as_deref()) {
        draft.status = status;
    }
    if let Some(raw) = payload.deadline {
        draft.deadline = check.deadline(&raw);
    }
    if let Some(contact_info) = payload.contact_info {
        draft.contact_info = check.contact_info(contact_info);
    }
    if payload.budget.is_some() {
        draft.budget = check.budget(payload.budget, draft.budget);
    }
    if let Some(tags) = payload.tags {
        draft.tags = clean_list(tags);
    }
    if let Some(raw) = payload.image {
        draft.image = check.url("image", &raw);
    }
    if let Some(featured) = payload.featured {
        draft.featured = featured;
    }

    check.finish()?;
    Ok(normalize(draft))
}

/// Title-case the title and derive tags when none were given.
pub fn normalize(mut draft: SchemeDraft) -> SchemeDraft {
    draft.title = title_case(&draft.title);
    if draft.tags.is_empty() {
        draft.tags = default_tags(draft.category, &draft.title);
    }
    draft
}

/// Upper-case the first character of every word and lower-case the rest.
///
/// A word starts at an alphanumeric character and runs to the next whitespace,
/// so `PM-KISAN yojana` becomes `Pm-kisan Yojana`.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_word = false;

    for ch in input.chars() {
        if ch.is_whitespace() {
            in_word = false;
            out.push(ch);
        } else if in_word {
            out.extend(ch.to_lowercase());
        } else if ch.is_alphanumeric() || ch == '_' {
            in_word = true;
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
    }

    out
}

/// `[category, first three title words...]`
pub fn default_tags(category: Category, title: &str) -> Vec<String> {
    std::iter::once(category.as_str().to_string())
        .chain(title.split_whitespace().take(3).map(str::to_string))
        .collect()
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

impl Checker {
    fn title(&mut self, value: Option<String>) -> String {
        let title = self.required_text("title", value, "Title is required");
        if title.chars().count() > MAX_TITLE_CHARS {
            self.fail(
                "title",
                format!("Title cannot exceed {} characters", MAX_TITLE_CHARS),
            );
        }
        title
    }

    fn non_empty_list(&mut self, field: &str, value: Option<Vec<String>>, message: &str) -> Vec<String> {
        let items = clean_list(value.unwrap_or_default());
        if items.is_empty() {
            self.fail(field, message);
        }
        items
    }

    fn range(
        &mut self,
        field: &str,
        value: Option<RangePayload>,
        base: Range,
        ceiling: Option<i64>,
    ) -> Range {
        let Some(value) = value else {
            return base;
        };
        let range = Range {
            min: value.min.unwrap_or(base.min),
            max: value.max.unwrap_or(base.max),
        };

        if range.min < 0 {
            self.fail(field, format!("{} minimum cannot be negative", field));
        }
        if let Some(ceiling) = ceiling {
            if range.max > ceiling {
                self.fail(field, format!("{} maximum cannot exceed {}", field, ceiling));
            }
        }
        if range.min > range.max {
            self.fail(field, format!("{} minimum cannot exceed its maximum", field));
        }
        range
    }

    fn eligibility(&mut self, value: Option<EligibilityPayload>, base: Eligibility) -> Eligibility {
        let Some(value) = value else {
            return base;
        };

        Eligibility {
            age: self.range("eligibility.age", value.age, base.age, Some(AGE_BOUNDS.max)),
            income: self.range("eligibility.income", value.income, base.income, None),
            education: self
                .labelled("eligibility.education", value.education.as_deref())
                .unwrap_or(base.education),
            gender: self
                .labelled("eligibility.gender", value.gender.as_deref())
                .unwrap_or(base.gender),
            location: self
                .labelled("eligibility.location", value.location.as_deref())
                .unwrap_or(base.location),
            occupation: clean_optional(value.occupation).unwrap_or(base.occupation),
            other_requirements: value
                .other_requirements
                .map(clean_list)
                .unwrap_or(base.other_requirements),
        }
    }

    fn deadline(&mut self, raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
        {
            return Some(midnight.and_utc());
        }

        self.fail(
            "deadline",
            "Deadline must be a date (YYYY-MM-DD or RFC 3339)",
        );
        None
    }

    fn url(&mut self, field: &str, raw: &str) -> Option<String> {
        let value = clean_optional(Some(raw.to_string()))?;
        if !is_http_url(&value) {
            self.fail(field, format!("{} must be an http(s) URL", field));
        }
        Some(value)
    }

    fn contact_info(&mut self, value: ContactInfo) -> ContactInfo {
        let website = match value.website {
            Some(raw) => self.url("contactInfo.website", &raw),
            None => None,
        };

        ContactInfo {
            phone: clean_optional(value.phone),
            email: clean_optional(value.email),
            website,
            address: clean_optional(value.address),
        }
    }

    fn budget(&mut self, value: Option<BudgetPayload>, base: Budget) -> Budget {
        let Some(value) = value else {
            return base;
        };

        let amount = value.amount.unwrap_or(base.amount);
        if amount < 0 {
            self.fail("budget.amount", "Budget amount cannot be negative");
        }

        Budget {
            amount,
            currency: clean_optional(value.currency).unwrap_or(base.currency),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FieldError;
    use crate::models::Gender;

    fn valid_payload() -> SchemePayload {
        serde_json::from_value(serde_json::json!({
            "title": "pradhan mantri KISAN samman nidhi",
            "description": "Income support for farmer families",
            "category": "Agriculture",
            "benefits": ["Rs 6000 per year"],
            "documents": ["Aadhaar Card", "Land records"],
            "applicationProcess": "Apply on the PM-KISAN portal",
            "governmentBody": "Ministry of Agriculture"
        }))
        .unwrap()
    }

    fn field_errors(result: Result<SchemeDraft, AppError>) -> Vec<FieldError> {
        match result {
            Err(AppError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_create_applies_defaults() {
        let draft = validate_create(valid_payload()).unwrap();

        assert_eq!(draft.title, "Pradhan Mantri Kisan Samman Nidhi");
        assert_eq!(draft.category, Category::Agriculture);
        assert_eq!(draft.district, District::AllDistricts);
        assert_eq!(draft.status, SchemeStatus::Active);
        assert_eq!(draft.eligibility, Eligibility::default());
        assert_eq!(draft.budget, Budget::default());
        assert!(!draft.featured);
        assert_eq!(
            draft.tags,
            vec!["Agriculture", "Pradhan", "Mantri", "Kisan"]
        );
    }

    #[test]
    fn test_caller_tags_are_kept() {
        let mut payload = valid_payload();
        payload.tags = Some(vec!["farmers".into(), " ".into(), "income".into()]);
        let draft = validate_create(payload).unwrap();
        assert_eq!(draft.tags, vec!["farmers", "income"]);
    }

    #[test]
    fn test_empty_benefits_rejected() {
        let mut payload = valid_payload();
        payload.benefits = Some(vec![]);

        let errors = field_errors(validate_create(payload));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "benefits");
    }

    #[test]
    fn test_all_failures_reported_together() {
        let payload: SchemePayload = serde_json::from_value(serde_json::json!({
            "title": "",
            "category": "Transport",
            "benefits": [],
            "eligibility": { "gender": "Other", "age": { "min": 60, "max": 18 } }
        }))
        .unwrap();

        let errors = field_errors(validate_create(payload));
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();

        for expected in [
            "title",
            "description",
            "category",
            "benefits",
            "documents",
            "applicationProcess",
            "governmentBody",
            "eligibility.age",
            "eligibility.gender",
        ] {
            assert!(fields.contains(&expected), "missing error for {}", expected);
        }
    }

    #[test]
    fn test_title_length_limit() {
        let mut payload = valid_payload();
        payload.title = Some("a".repeat(201));
        let errors = field_errors(validate_create(payload));
        assert_eq!(errors[0].field, "title");

        let mut payload = valid_payload();
        payload.title = Some("a".repeat(200));
        assert!(validate_create(payload).is_ok());
    }

    #[test]
    fn test_inverted_income_range_rejected() {
        let mut payload = valid_payload();
        payload.eligibility = Some(EligibilityPayload {
            income: Some(RangePayload {
                min: Some(500_000),
                max: Some(100_000),
            }),
            ..Default::default()
        });
        let errors = field_errors(validate_create(payload));
        assert_eq!(errors[0].field, "eligibility.income");
    }

    #[test]
    fn test_deadline_formats() {
        let mut payload = valid_payload();
        payload.deadline = Some("2025-03-31".into());
        let draft = validate_create(payload).unwrap();
        assert_eq!(
            draft.deadline.unwrap().to_rfc3339(),
            "2025-03-31T00:00:00+00:00"
        );

        let mut payload = valid_payload();
        payload.deadline = Some("next tuesday".into());
        let errors = field_errors(validate_create(payload));
        assert_eq!(errors[0].field, "deadline");
    }

    #[test]
    fn test_image_must_be_url() {
        let mut payload = valid_payload();
        payload.image = Some("not a url".into());
        let errors = field_errors(validate_create(payload));
        assert_eq!(errors[0].field, "image");
    }

    #[test]
    fn test_update_validates_only_supplied_fields() {
        let existing = validate_create(valid_payload()).unwrap();

        let patch: SchemePayload = serde_json::from_value(serde_json::json!({
            "featured": true,
            "eligibility": { "gender": "Female", "age": { "max": 40 } }
        }))
        .unwrap();
        let updated = validate_update(existing.clone(), patch).unwrap();

        assert!(updated.featured);
        assert_eq!(updated.eligibility.gender, Gender::Female);
        assert_eq!(updated.eligibility.age, Range { min: 0, max: 40 });
        assert_eq!(updated.title, existing.title);
        assert_eq!(updated.benefits, existing.benefits);
    }

    #[test]
    fn test_update_rejects_emptied_documents() {
        let existing = validate_create(valid_payload()).unwrap();
        let patch = SchemePayload {
            documents: Some(vec![]),
            status: Some("Archived".into()),
            ..Default::default()
        };

        let errors = field_errors(validate_update(existing, patch));
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["documents", "status"]);
    }

    #[test]
    fn test_update_retitles_and_normalizes() {
        let existing = validate_create(valid_payload()).unwrap();
        let patch = SchemePayload {
            title: Some("free LAPTOP scheme".into()),
            tags: Some(vec![]),
            ..Default::default()
        };

        let updated = validate_update(existing, patch).unwrap();
        assert_eq!(updated.title, "Free Laptop Scheme");
        assert_eq!(updated.tags, vec!["Agriculture", "Free", "Laptop", "Scheme"]);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("hello WORLD"), "Hello World");
        assert_eq!(title_case("PM-KISAN yojana"), "Pm-kisan Yojana");
        assert_eq!(title_case("(new) scheme"), "(New) Scheme");
        assert_eq!(title_case("tn  2024 grant"), "Tn  2024 Grant");
    }
}
