use serde::Deserialize;
use sqlx::FromRow;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::shared::AppError;

/// Stored course. Inactive courses are soft-deleted and hidden from every read.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CourseModel {
    pub id: i32,
    pub category_id: i32,
    pub name: String,
    pub price: i32,
    pub count: i32,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CategoryModel {
    pub id: i32,
    pub name: String,
    pub count: i32,
}

/// Active course joined with its category
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CourseDetailRow {
    pub id: i32,
    pub category_id: i32,
    pub category_name: String,
    pub name: String,
    pub price: i32,
    pub count: i32,
}

/// Writable course fields, shared by create and update.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CourseDraft {
    pub category_id: i32,
    pub name: String,
    pub price: i32,
    #[serde(default)]
    pub count: i32,
}

impl CourseDraft {
    /// Trims the name and checks price and count.
    pub fn validated(mut self) -> Result<Self, AppError> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(AppError::Validation("course name is required".to_string()));
        }
        if self.price < 0 {
            return Err(AppError::Validation("price must not be negative".to_string()));
        }
        if self.count < 0 {
            return Err(AppError::Validation("count must not be negative".to_string()));
        }
        Ok(self)
    }
}

/// Listing order accepted by `/course-sort`.
///
/// Each mode maps to a fixed query; the raw parameter never reaches SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum SortMode {
    /// Most expensive first
    High,
    /// Cheapest first
    Low,
    /// Only free courses
    Free,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    #[rstest]
    #[case("high", SortMode::High)]
    #[case("low", SortMode::Low)]
    #[case("free", SortMode::Free)]
    fn test_sort_mode_parses(#[case] input: &str, #[case] expected: SortMode) {
        assert_eq!(SortMode::from_str(input).unwrap(), expected);
    }

    #[rstest]
    #[case("HIGH")]
    #[case("price DESC; DROP TABLE course")]
    #[case("")]
    fn test_sort_mode_rejects_other_values(#[case] input: &str) {
        assert!(SortMode::from_str(input).is_err());
    }

    #[test]
    fn test_draft_validation() {
        let draft = CourseDraft {
            category_id: 1,
            name: "  Rust  ".to_string(),
            price: 0,
            count: 0,
        };
        assert_eq!(draft.clone().validated().unwrap().name, "Rust");

        let negative = CourseDraft {
            price: -1,
            ..draft.clone()
        };
        assert!(matches!(negative.validated(), Err(AppError::Validation(_))));

        let blank = CourseDraft {
            name: "   ".to_string(),
            ..draft
        };
        assert!(matches!(blank.validated(), Err(AppError::Validation(_))));
    }
}
