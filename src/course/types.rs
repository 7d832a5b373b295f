use serde::{Deserialize, Serialize};

use super::models::{CategoryModel, CourseDetailRow, CourseDraft, CourseModel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseResponse {
    pub id: i32,
    pub name: String,
    pub price: i32,
    pub count: i32,
}

impl From<CourseModel> for CourseResponse {
    fn from(course: CourseModel) -> Self {
        Self {
            id: course.id,
            name: course.name,
            price: course.price,
            count: course.count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseDetailResponse {
    pub id: i32,
    pub category: CategoryRef,
    pub name: String,
    pub price: i32,
    pub count: i32,
}

impl From<CourseDetailRow> for CourseDetailResponse {
    fn from(row: CourseDetailRow) -> Self {
        Self {
            id: row.id,
            category: CategoryRef {
                id: row.category_id,
                name: row.category_name,
            },
            name: row.name,
            price: row.price,
            count: row.count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryResponse {
    pub id: i32,
    pub name: String,
    pub count: i32,
}

impl From<CategoryModel> for CategoryResponse {
    fn from(category: CategoryModel) -> Self {
        Self {
            id: category.id,
            name: category.name,
            count: category.count,
        }
    }
}

/// Update echoed back with the id it was applied to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseUpdateResponse {
    pub id: i32,
    pub category_id: i32,
    pub name: String,
    pub price: i32,
    pub count: i32,
}

impl CourseUpdateResponse {
    pub fn new(id: i32, draft: CourseDraft) -> Self {
        Self {
            id,
            category_id: draft.category_id,
            name: draft.name,
            price: draft.price,
            count: draft.count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Deserialize)]
pub struct SortQuery {
    #[serde(default)]
    pub sort: String,
}
