//! Input validation.
//!
//! Request bodies and query strings arrive loosely typed; this module decodes
//! them into the typed commands the catalog works with, collecting every
//! field error of a request before rejecting it.

mod query;
mod scheme;

pub use query::*;
pub use scheme::*;

use crate::errors::{AppError, FieldError};
use crate::models::Labelled;

/// Collects field errors so a request reports every problem at once.
#[derive(Debug, Default)]
pub struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    pub fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Trimmed, non-empty text; records `message` when missing or blank.
    pub fn required_text(&mut self, field: &str, value: Option<String>, message: &str) -> String {
        match value.map(|v| v.trim().to_string()) {
            Some(v) if !v.is_empty() => v,
            _ => {
                self.fail(field, message);
                String::new()
            }
        }
    }

    /// Parse an enumeration label when one is supplied.
    pub fn labelled<E: Labelled>(&mut self, field: &str, raw: Option<&str>) -> Option<E> {
        let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
        match E::from_label(raw) {
            Some(value) => Some(value),
            None => {
                self.fail(
                    field,
                    format!("Invalid {}. Expected one of: {}", field, E::expected_labels()),
                );
                None
            }
        }
    }

    /// Parse an enumeration label that must be present.
    pub fn required_labelled<E: Labelled>(
        &mut self,
        field: &str,
        raw: Option<&str>,
        message: &str,
    ) -> Option<E> {
        if raw.map(str::trim).unwrap_or_default().is_empty() {
            self.fail(field, message);
            return None;
        }
        self.labelled(field, raw)
    }

    /// Parse an integer within `[min, max]` when one is supplied.
    pub fn integer(
        &mut self,
        field: &str,
        raw: Option<&str>,
        min: i64,
        max: Option<i64>,
    ) -> Option<i64> {
        let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
        let parsed = raw
            .parse::<i64>()
            .ok()
            .filter(|v| *v >= min && max.map_or(true, |m| *v <= m));

        if parsed.is_none() {
            let message = match max {
                Some(max) => format!("{} must be an integer between {} and {}", field, min, max),
                None => format!("{} must be an integer of at least {}", field, min),
            };
            self.fail(field, message);
        }
        parsed
    }

    #[cfg(test)]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(())` when nothing was recorded, otherwise every recorded error.
    pub fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;

    #[test]
    fn test_required_text_trims() {
        let mut check = Checker::default();
        assert_eq!(
            check.required_text("title", Some("  Hello ".into()), "required"),
            "Hello"
        );
        assert!(check.is_clean());

        check.required_text("title", Some("   ".into()), "Title is required");
        check.required_text("description", None, "Description is required");
        let Err(AppError::Validation(errors)) = check.finish() else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "title");
        assert_eq!(errors[1].field, "description");
    }

    #[test]
    fn test_labelled_rejects_unknown_values() {
        let mut check = Checker::default();
        assert_eq!(check.labelled::<Gender>("gender", Some("Female")), Some(Gender::Female));
        assert_eq!(check.labelled::<Gender>("gender", None), None);
        assert_eq!(check.labelled::<Gender>("gender", Some("")), None);
        assert!(check.is_clean());

        assert_eq!(check.labelled::<Gender>("gender", Some("Other")), None);
        assert!(!check.is_clean());
    }

    #[test]
    fn test_integer_bounds() {
        let mut check = Checker::default();
        assert_eq!(check.integer("age", Some("42"), 0, Some(120)), Some(42));
        assert_eq!(check.integer("age", None, 0, Some(120)), None);
        assert!(check.is_clean());

        assert_eq!(check.integer("age", Some("121"), 0, Some(120)), None);
        assert_eq!(check.integer("income", Some("-1"), 0, None), None);
        assert_eq!(check.integer("page", Some("two"), 1, None), None);
        let Err(AppError::Validation(errors)) = check.finish() else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 3);
    }
}
