use super::{
    common::parse_optional,
    course::{CategoryResponse, CourseResponse},
};
use crate::error::ApiError;
use database::services::save_course::{ChapterInput, CourseInput, LessonInput};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CourseForm {
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub cover_image: Option<String>,
    /// Defaults to 0
    pub price: Option<f64>,
    /// Defaults to the price
    pub original_price: Option<f64>,
    /// beginner, intermediate or advanced; defaults to beginner
    pub level: Option<String>,
    pub duration_hours: Option<f64>,
    /// draft or published; ignored on creation
    pub status: Option<String>,
    /// Only honored for admins
    pub is_featured: Option<bool>,
}

impl CourseForm {
    pub fn into_input(self) -> Result<CourseInput, ApiError> {
        Ok(CourseInput {
            title: self.title,
            subtitle: self.subtitle,
            description: self.description,
            category_id: self.category_id,
            cover_image: self.cover_image,
            price: self.price.unwrap_or(0.0),
            original_price: self.original_price,
            level: parse_optional(self.level, "level")?.unwrap_or_default(),
            duration_hours: self.duration_hours,
            status: parse_optional(self.status, "status")?,
            is_featured: self.is_featured,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CourseEditResponse {
    pub course: CourseResponse,
    pub categories: Vec<CategoryResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChapterForm {
    pub title: String,
    pub description: Option<String>,
    /// Appended last when absent
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub is_free: bool,
}

impl From<ChapterForm> for ChapterInput {
    fn from(form: ChapterForm) -> Self {
        Self {
            title: form.title,
            description: form.description,
            sort_order: form.sort_order,
            is_free: form.is_free,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LessonForm {
    pub title: String,
    /// video, article or quiz; defaults to video
    pub content_type: Option<String>,
    pub video_url: Option<String>,
    /// Seconds
    #[serde(default)]
    pub video_duration: i32,
    /// Appended last when absent
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub is_free: bool,
}

impl LessonForm {
    pub fn into_input(self) -> Result<LessonInput, ApiError> {
        Ok(LessonInput {
            title: self.title,
            content_type: parse_optional(self.content_type, "content type")?.unwrap_or_default(),
            video_url: self.video_url,
            video_duration: self.video_duration,
            sort_order: self.sort_order,
            is_free: self.is_free,
        })
    }
}
