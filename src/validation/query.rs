//! Query-string decoding.
//!
//! Parameters are taken as raw strings; a blank value is treated as absent.

use serde::Deserialize;

use super::Checker;
use crate::errors::AppError;
use crate::filter::FilterCriteria;
use crate::models::{Category, SchemeStatus, AGE_BOUNDS};
use crate::pagination::{PageRequest, DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT};

pub const DEFAULT_FEATURED: u32 = 6;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    pub fn decode(&self) -> Result<PageRequest, AppError> {
        let mut check = Checker::default();
        let page = check.page_request(self.page.as_deref(), self.limit.as_deref());
        check.finish()?;
        Ok(page)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub category: Option<String>,
    pub age: Option<String>,
    pub income: Option<String>,
    pub education: Option<String>,
    pub gender: Option<String>,
    pub location: Option<String>,
    pub district: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl FilterQuery {
    pub fn decode(&self) -> Result<(FilterCriteria, PageRequest), AppError> {
        let mut check = Checker::default();

        let criteria = FilterCriteria {
            category: check.labelled("category", self.category.as_deref()),
            age: check.integer("age", self.age.as_deref(), AGE_BOUNDS.min, Some(AGE_BOUNDS.max)),
            income: check.integer("income", self.income.as_deref(), 0, None),
            education: check.labelled("education", self.education.as_deref()),
            gender: check.labelled("gender", self.gender.as_deref()),
            location: check.labelled("location", self.location.as_deref()),
            district: check.labelled("district", self.district.as_deref()),
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        };
        let page = check.page_request(self.page.as_deref(), self.limit.as_deref());

        check.finish()?;
        Ok((criteria, page))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl SearchQuery {
    /// The trimmed query text plus the page window. `q` must be non-empty.
    pub fn decode(&self) -> Result<(String, PageRequest), AppError> {
        let mut check = Checker::default();
        let text = check.required_text("q", self.q.clone(), "Search query is required");
        let page = check.page_request(self.page.as_deref(), self.limit.as_deref());
        check.finish()?;
        Ok((text, page))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FeaturedQuery {
    pub limit: Option<String>,
}

impl FeaturedQuery {
    pub fn decode(&self) -> Result<u32, AppError> {
        let mut check = Checker::default();
        let limit = check
            .integer("limit", self.limit.as_deref(), 1, Some(i64::from(MAX_LIMIT)))
            .map_or(DEFAULT_FEATURED, |v| v as u32);
        check.finish()?;
        Ok(limit)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminListQuery {
    pub status: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl AdminListQuery {
    pub fn decode(&self) -> Result<(Option<SchemeStatus>, PageRequest), AppError> {
        let mut check = Checker::default();
        let status = check.labelled("status", self.status.as_deref());
        let page = check.page_request(self.page.as_deref(), self.limit.as_deref());
        check.finish()?;
        Ok((status, page))
    }
}

/// A category taken from a path segment.
pub fn decode_category(raw: &str) -> Result<Category, AppError> {
    let mut check = Checker::default();
    let category = check.required_labelled("category", Some(raw), "Category is required");
    check.finish()?;
    category.ok_or_else(|| AppError::validation("category", "Category is required"))
}

impl Checker {
    fn page_request(&mut self, page: Option<&str>, limit: Option<&str>) -> PageRequest {
        let page = self
            .integer("page", page, 1, Some(i64::from(u32::MAX)))
            .map_or(DEFAULT_PAGE, |v| v as u32);
        let limit = self
            .integer("limit", limit, 1, Some(i64::from(MAX_LIMIT)))
            .map_or(DEFAULT_LIMIT, |v| v as u32);

        PageRequest::new(page, limit).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{District, Gender};

    fn filter(pairs: &[(&str, &str)]) -> FilterQuery {
        let mut query = FilterQuery::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "category" => query.category = value,
                "age" => query.age = value,
                "income" => query.income = value,
                "gender" => query.gender = value,
                "district" => query.district = value,
                "search" => query.search = value,
                "page" => query.page = value,
                "limit" => query.limit = value,
                other => panic!("unexpected key {}", other),
            }
        }
        query
    }

    #[test]
    fn test_page_defaults() {
        let page = PageQuery::default().decode().unwrap();
        assert_eq!(page, PageRequest::default());

        let blank = PageQuery {
            page: Some("".into()),
            limit: Some(" ".into()),
        };
        assert_eq!(blank.decode().unwrap(), PageRequest::default());
    }

    #[test]
    fn test_page_bounds() {
        for (page, limit) in [("0", "9"), ("1", "0"), ("1", "51"), ("x", "9")] {
            let query = PageQuery {
                page: Some(page.into()),
                limit: Some(limit.into()),
            };
            assert!(
                matches!(query.decode(), Err(AppError::Validation(_))),
                "page={} limit={} should be rejected",
                page,
                limit
            );
        }

        let query = PageQuery {
            page: Some("2".into()),
            limit: Some("50".into()),
        };
        assert_eq!(query.decode().unwrap(), PageRequest::new(2, 50).unwrap());
    }

    #[test]
    fn test_filter_decodes_typed_criteria() {
        let (criteria, page) = filter(&[
            ("category", "Education"),
            ("age", "20"),
            ("gender", "Female"),
            ("district", "Chennai"),
            ("search", "  laptop "),
            ("limit", "5"),
        ])
        .decode()
        .unwrap();

        assert_eq!(criteria.category, Some(Category::Education));
        assert_eq!(criteria.age, Some(20));
        assert_eq!(criteria.gender, Some(Gender::Female));
        assert_eq!(criteria.district, Some(District::Chennai));
        assert_eq!(criteria.search.as_deref(), Some("laptop"));
        assert_eq!(page, PageRequest::new(1, 5).unwrap());
    }

    #[test]
    fn test_filter_blank_values_are_absent() {
        let (criteria, _) = filter(&[("category", ""), ("age", ""), ("search", "  ")])
            .decode()
            .unwrap();
        assert_eq!(criteria, FilterCriteria::default());
    }

    #[test]
    fn test_filter_rejects_bad_values_together() {
        let result = filter(&[("age", "130"), ("income", "-5"), ("gender", "other")]).decode();
        let Err(AppError::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["age", "income", "gender"]);
    }

    #[test]
    fn test_search_requires_text() {
        assert!(SearchQuery::default().decode().is_err());
        let blank = SearchQuery {
            q: Some("   ".into()),
            ..Default::default()
        };
        assert!(blank.decode().is_err());

        let query = SearchQuery {
            q: Some(" farmer ".into()),
            ..Default::default()
        };
        let (text, page) = query.decode().unwrap();
        assert_eq!(text, "farmer");
        assert_eq!(page, PageRequest::default());
    }

    #[test]
    fn test_featured_limit() {
        assert_eq!(FeaturedQuery::default().decode().unwrap(), DEFAULT_FEATURED);
        let query = FeaturedQuery {
            limit: Some("3".into()),
        };
        assert_eq!(query.decode().unwrap(), 3);
        let query = FeaturedQuery {
            limit: Some("0".into()),
        };
        assert!(query.decode().is_err());
    }

    #[test]
    fn test_admin_status_filter() {
        let query = AdminListQuery {
            status: Some("Inactive".into()),
            ..Default::default()
        };
        let (status, _) = query.decode().unwrap();
        assert_eq!(status, Some(SchemeStatus::Inactive));

        let query = AdminListQuery {
            status: Some("Deleted".into()),
            ..Default::default()
        };
        assert!(query.decode().is_err());
    }

    #[test]
    fn test_category_path() {
        assert_eq!(
            decode_category("Women Empowerment").unwrap(),
            Category::WomenEmpowerment
        );
        assert!(matches!(
            decode_category("Space Travel"),
            Err(AppError::Validation(_))
        ));
    }
}
