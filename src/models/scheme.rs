//! Scheme model: a government welfare program with eligibility and benefit metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, District, EducationLevel, Gender, Location, SchemeStatus};

/// Widest age band a scheme can declare.
pub const AGE_BOUNDS: Range = Range { min: 0, max: 120 };

/// Widest income band a scheme can declare.
pub const INCOME_BOUNDS: Range = Range {
    min: 0,
    max: 999_999_999,
};

/// Inclusive integer band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Range {
    pub min: i64,
    pub max: i64,
}

impl Range {
    pub fn contains(&self, value: i64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Who may benefit from a scheme.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    pub age: Range,
    pub income: Range,
    pub education: EducationLevel,
    pub gender: Gender,
    pub location: Location,
    pub occupation: String,
    pub other_requirements: Vec<String>,
}

impl Default for Eligibility {
    fn default() -> Self {
        Self {
            age: AGE_BOUNDS,
            income: INCOME_BOUNDS,
            education: EducationLevel::default(),
            gender: Gender::default(),
            location: Location::default(),
            occupation: "Any".to_string(),
            other_requirements: Vec::new(),
        }
    }
}

/// How to reach the administering office.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Budget {
    pub amount: i64,
    pub currency: String,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            amount: 0,
            currency: "INR".to_string(),
        }
    }
}

/// The caller-controlled part of a scheme, already validated and normalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeDraft {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub eligibility: Eligibility,
    pub district: District,
    pub benefits: Vec<String>,
    pub documents: Vec<String>,
    pub application_process: String,
    pub deadline: Option<DateTime<Utc>>,
    pub status: SchemeStatus,
    pub government_body: String,
    pub contact_info: ContactInfo,
    pub budget: Budget,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub featured: bool,
}

/// A stored scheme.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scheme {
    pub id: String,
    #[serde(flatten)]
    pub details: SchemeDraft,
    pub views: i64,
    pub applications: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub labels: SchemeLabels,
}

impl Scheme {
    pub fn new(
        id: String,
        details: SchemeDraft,
        views: i64,
        applications: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let labels = SchemeLabels::describe(&details);
        Self {
            id,
            details,
            views,
            applications,
            created_at,
            updated_at,
            labels,
        }
    }
}

/// Display strings derived from a scheme, computed on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeLabels {
    pub age_range: String,
    pub income_range: String,
    pub deadline_formatted: String,
}

impl SchemeLabels {
    pub fn describe(draft: &SchemeDraft) -> Self {
        let age = draft.eligibility.age;
        let income = draft.eligibility.income;

        let age_range = if age == AGE_BOUNDS {
            "All Ages".to_string()
        } else {
            format!("{} - {} years", age.min, age.max)
        };

        let income_range = if income == INCOME_BOUNDS {
            "All Income Levels".to_string()
        } else {
            format!(
                "₹{} - ₹{}",
                group_indian(income.min),
                group_indian(income.max)
            )
        };

        let deadline_formatted = draft
            .deadline
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_else(|| "No Deadline".to_string());

        Self {
            age_range,
            income_range,
            deadline_formatted,
        }
    }
}

/// Trimmed view of a scheme used in chatbot replies.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub benefits: Vec<String>,
    pub eligibility: Eligibility,
}

impl From<Scheme> for SchemeSummary {
    fn from(scheme: Scheme) -> Self {
        Self {
            id: scheme.id,
            title: scheme.details.title,
            description: scheme.details.description,
            benefits: scheme.details.benefits,
            eligibility: scheme.details.eligibility,
        }
    }
}

/// A distinct classification value with the number of active schemes holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueCount {
    pub value: String,
    pub count: i64,
}

/// Format an amount with Indian digit grouping (12,34,567).
fn group_indian(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let sign = if amount < 0 { "-" } else { "" };

    if digits.len() <= 3 {
        return format!("{sign}{digits}");
    }

    let (head, last3) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (left, right) = rest.split_at(rest.len() - 2);
        groups.push(right);
        rest = left;
    }
    groups.push(rest);
    groups.reverse();

    format!("{sign}{},{last3}", groups.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_indian() {
        assert_eq!(group_indian(0), "0");
        assert_eq!(group_indian(999), "999");
        assert_eq!(group_indian(1000), "1,000");
        assert_eq!(group_indian(250000), "2,50,000");
        assert_eq!(group_indian(12345678), "1,23,45,678");
    }

    #[test]
    fn test_range_contains_is_inclusive() {
        let band = Range { min: 18, max: 65 };
        assert!(band.contains(18));
        assert!(band.contains(65));
        assert!(!band.contains(70));
        assert!(!band.contains(17));
    }

    #[test]
    fn test_default_eligibility_matches_everyone() {
        let eligibility = Eligibility::default();
        assert_eq!(eligibility.age, AGE_BOUNDS);
        assert_eq!(eligibility.income, INCOME_BOUNDS);
        assert_eq!(eligibility.gender, Gender::Any);
        assert_eq!(eligibility.location, Location::Both);
        assert_eq!(eligibility.occupation, "Any");
    }
}
