use chrono::{DateTime, Utc};
use mongodb::bson;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourseVideo {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
    pub order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoursePdf {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_id: Option<String>,
    pub order: i32,
}

/// Embedded content items that carry an explicit position.
pub trait Ordered {
    fn item_id(&self) -> &str;
    fn order(&self) -> i32;
    fn set_order(&mut self, order: i32);
}

impl Ordered for CourseVideo {
    fn item_id(&self) -> &str {
        &self.id
    }
    fn order(&self) -> i32 {
        self.order
    }
    fn set_order(&mut self, order: i32) {
        self.order = order;
    }
}

impl Ordered for CoursePdf {
    fn item_id(&self) -> &str {
        &self.id
    }
    fn order(&self) -> i32 {
        self.order
    }
    fn set_order(&mut self, order: i32) {
        self.order = order;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub level: String,
    pub instructor: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    pub published: bool,
    #[serde(default)]
    pub videos: Vec<CourseVideo>,
    #[serde(default)]
    pub pdfs: Vec<CoursePdf>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Course {
    /// Content is stored in insertion order; readers always see it by position.
    pub fn into_sorted(mut self) -> Self {
        sort_by_order(&mut self.videos);
        sort_by_order(&mut self.pdfs);
        self
    }
}

#[derive(Debug, Serialize)]
pub struct CourseSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub level: String,
    pub instructor: String,
    pub thumbnail_url: Option<String>,
    pub published: bool,
    pub video_count: usize,
    pub pdf_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<Course> for CourseSummary {
    fn from(course: Course) -> Self {
        CourseSummary {
            id: course.id.map(|id| id.to_hex()).unwrap_or_default(),
            video_count: course.videos.len(),
            pdf_count: course.pdfs.len(),
            title: course.title,
            description: course.description,
            category: course.category,
            level: course.level,
            instructor: course.instructor,
            thumbnail_url: course.thumbnail_url,
            published: course.published,
            created_at: course.created_at,
        }
    }
}

/// Full course with content in display order.
#[derive(Debug, Serialize)]
pub struct CourseDetail {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub level: String,
    pub instructor: String,
    pub thumbnail_url: Option<String>,
    pub published: bool,
    pub videos: Vec<CourseVideo>,
    pub pdfs: Vec<CoursePdf>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Course> for CourseDetail {
    fn from(course: Course) -> Self {
        let course = course.into_sorted();
        CourseDetail {
            id: course.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: course.title,
            description: course.description,
            category: course.category,
            level: course.level,
            instructor: course.instructor,
            thumbnail_url: course.thumbnail_url,
            published: course.published,
            videos: course.videos,
            pdfs: course.pdfs,
            created_at: course.created_at,
            updated_at: course.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCourse {
    #[validate(length(min = 3, max = 200, message = "Title must be 3-200 characters"))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: String,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    #[validate(length(min = 1, message = "Level is required"))]
    pub level: String,
    #[validate(length(min = 1, message = "Instructor is required"))]
    pub instructor: String,
    #[validate(url)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCourse {
    #[validate(length(min = 3, max = 200, message = "Title must be 3-200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub category: Option<String>,
    pub level: Option<String>,
    pub instructor: Option<String>,
    #[validate(url)]
    pub thumbnail_url: Option<String>,
    pub published: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddVideo {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(url)]
    pub url: String,
    pub public_id: Option<String>,
    #[validate(range(min = 0))]
    pub duration_seconds: Option<i64>,
    #[validate(range(min = 0, max = 100_000))]
    pub order: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddPdf {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(url)]
    pub url: String,
    pub public_id: Option<String>,
    #[validate(range(min = 0, max = 100_000))]
    pub order: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderItems {
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CourseQuery {
    pub category: Option<String>,
    pub level: Option<String>,
}

pub fn sort_by_order<T: Ordered>(items: &mut [T]) {
    items.sort_by_key(|item| item.order());
}

/// Position for an item appended after the current content.
pub fn next_order<T: Ordered>(items: &[T]) -> i32 {
    items.iter().map(|item| item.order()).max().map_or(0, |max| max.saturating_add(1))
}

/// Applies a full permutation of item ids, renumbering positions densely from zero.
pub fn reorder<T: Ordered>(items: &mut [T], ids: &[String]) -> Result<()> {
    if ids.len() != items.len() {
        return Err(AppError::invalid_data(format!(
            "Expected {} ids, got {}",
            items.len(),
            ids.len()
        )));
    }

    let mut positions = Vec::with_capacity(ids.len());
    for id in ids {
        let index = items
            .iter()
            .position(|item| item.item_id() == id)
            .ok_or_else(|| AppError::invalid_data(format!("Unknown item id: {}", id)))?;
        if positions.contains(&index) {
            return Err(AppError::invalid_data(format!("Repeated item id: {}", id)));
        }
        positions.push(index);
    }

    for (position, index) in positions.into_iter().enumerate() {
        items[index].set_order(position as i32);
    }
    sort_by_order(items);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str, order: i32) -> CourseVideo {
        CourseVideo {
            id: id.to_string(),
            title: format!("Video {}", id),
            url: format!("https://cdn.example.com/{}.mp4", id),
            public_id: None,
            duration_seconds: Some(60),
            order,
        }
    }

    #[test]
    fn test_next_order() {
        let empty: Vec<CourseVideo> = Vec::new();
        assert_eq!(next_order(&empty), 0);
        assert_eq!(next_order(&[video("a", 0), video("b", 4)]), 5);
        assert_eq!(next_order(&[video("a", i32::MAX)]), i32::MAX);
    }

    #[test]
    fn test_explicit_order_is_bounded() {
        let add = |order| AddVideo {
            title: "Intro".to_string(),
            url: "https://cdn.example.com/intro.mp4".to_string(),
            public_id: None,
            duration_seconds: None,
            order: Some(order),
        };
        assert!(add(3).validate().is_ok());
        assert!(add(-1).validate().is_err());
        assert!(add(i32::MAX).validate().is_err());
    }

    #[test]
    fn test_sort_by_order() {
        let mut items = vec![video("c", 2), video("a", 0), video("b", 1)];
        sort_by_order(&mut items);
        let ids: Vec<&str> = items.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_reorder_is_dense() {
        let mut items = vec![video("a", 0), video("b", 7), video("c", 9)];
        let ids = vec!["c".to_string(), "a".to_string(), "b".to_string()];
        reorder(&mut items, &ids).unwrap();

        let got: Vec<(&str, i32)> = items.iter().map(|v| (v.id.as_str(), v.order)).collect();
        assert_eq!(got, vec![("c", 0), ("a", 1), ("b", 2)]);
    }

    #[test]
    fn test_reorder_rejects_unknown_or_missing_ids() {
        let mut items = vec![video("a", 0), video("b", 1)];
        assert!(reorder(&mut items, &["a".to_string()]).is_err());
        assert!(reorder(&mut items, &["a".to_string(), "x".to_string()]).is_err());
        assert!(reorder(&mut items, &["a".to_string(), "a".to_string()]).is_err());
    }
}
