use chrono::NaiveDateTime;
use database::{
    entities::{categories, chapters, courses, lessons},
    services::query_course::{ChapterOutline, CourseDetail, CourseSummary, HomePage, ReviewView},
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, ToSchema)]
pub struct CourseResponse {
    pub id: i64,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub instructor_id: i64,
    pub instructor_name: Option<String>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub cover_image: Option<String>,
    pub price: f64,
    pub original_price: Option<f64>,
    pub level: String,
    pub duration_hours: f64,
    pub status: String,
    pub is_featured: bool,
    pub enrollment_count: i32,
    pub rating_avg: f64,
    pub rating_count: i32,
    pub created_at: NaiveDateTime,
    pub published_at: Option<NaiveDateTime>,
}

impl From<courses::Model> for CourseResponse {
    fn from(course: courses::Model) -> Self {
        Self {
            id: course.id,
            title: course.title,
            subtitle: course.subtitle,
            description: course.description,
            instructor_id: course.instructor_id,
            instructor_name: None,
            category_id: course.category_id,
            category_name: None,
            cover_image: course.cover_image,
            price: course.price,
            original_price: course.original_price,
            level: course.level.to_string(),
            duration_hours: course.duration_hours,
            status: course.status.to_string(),
            is_featured: course.is_featured,
            enrollment_count: course.enrollment_count,
            rating_avg: course.rating_avg,
            rating_count: course.rating_count,
            created_at: course.created_at,
            published_at: course.published_at,
        }
    }
}

impl From<CourseSummary> for CourseResponse {
    fn from(summary: CourseSummary) -> Self {
        Self {
            instructor_name: summary.instructor_name,
            category_name: summary.category_name,
            ..Self::from(summary.course)
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub description: Option<String>,
    pub sort_order: i32,
}

impl From<categories::Model> for CategoryResponse {
    fn from(category: categories::Model) -> Self {
        Self {
            id: category.id,
            name: category.name,
            parent_id: category.parent_id,
            description: category.description,
            sort_order: category.sort_order,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HomeResponse {
    pub featured_courses: Vec<CourseResponse>,
    pub latest_courses: Vec<CourseResponse>,
    pub categories: Vec<CategoryResponse>,
}

impl From<HomePage> for HomeResponse {
    fn from(home: HomePage) -> Self {
        Self {
            featured_courses: home.featured_courses.into_iter().map(Into::into).collect(),
            latest_courses: home.latest_courses.into_iter().map(Into::into).collect(),
            categories: home.categories.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LessonResponse {
    pub id: i64,
    pub chapter_id: i64,
    pub title: String,
    pub content_type: String,
    pub video_url: Option<String>,
    pub video_duration: i32,
    pub sort_order: i32,
    pub is_free: bool,
}

impl From<lessons::Model> for LessonResponse {
    fn from(lesson: lessons::Model) -> Self {
        Self {
            id: lesson.id,
            chapter_id: lesson.chapter_id,
            title: lesson.title,
            content_type: lesson.content_type.to_string(),
            video_url: lesson.video_url,
            video_duration: lesson.video_duration,
            sort_order: lesson.sort_order,
            is_free: lesson.is_free,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChapterResponse {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub is_free: bool,
    pub lessons: Vec<LessonResponse>,
}

impl ChapterResponse {
    pub fn new(chapter: chapters::Model, lessons: Vec<LessonResponse>) -> Self {
        Self {
            id: chapter.id,
            course_id: chapter.course_id,
            title: chapter.title,
            description: chapter.description,
            sort_order: chapter.sort_order,
            is_free: chapter.is_free,
            lessons,
        }
    }
}

impl From<ChapterOutline> for ChapterResponse {
    fn from(outline: ChapterOutline) -> Self {
        Self::new(
            outline.chapter,
            outline.lessons.into_iter().map(Into::into).collect(),
        )
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewResponse {
    pub id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub rating: i32,
    pub content: Option<String>,
    pub helpful_count: i32,
    pub created_at: NaiveDateTime,
}

impl From<ReviewView> for ReviewResponse {
    fn from(view: ReviewView) -> Self {
        Self {
            id: view.review.id,
            user_id: view.review.user_id,
            username: view.username,
            rating: view.review.rating,
            content: view.review.content,
            helpful_count: view.review.helpful_count,
            created_at: view.review.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CourseDetailResponse {
    pub course: CourseResponse,
    pub instructor_bio: Option<String>,
    pub chapters: Vec<ChapterResponse>,
    pub reviews: Vec<ReviewResponse>,
    pub is_enrolled: bool,
    pub is_favorited: bool,
}

impl From<CourseDetail> for CourseDetailResponse {
    fn from(detail: CourseDetail) -> Self {
        Self {
            course: detail.course.into(),
            instructor_bio: detail.instructor_bio,
            chapters: detail.chapters.into_iter().map(Into::into).collect(),
            reviews: detail.reviews.into_iter().map(Into::into).collect(),
            is_enrolled: detail.is_enrolled,
            is_favorited: detail.is_favorited,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CourseQueryParams {
    /// Category id; also matches its direct subcategories
    pub category: Option<i64>,
    /// beginner, intermediate or advanced
    pub level: Option<String>,
    /// newest, popular, rating, price_low or price_high
    pub sort: Option<String>,
    pub keyword: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FavoriteResponse {
    pub success: bool,
    pub message: String,
    pub is_favorited: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EnrollResponse {
    pub success: bool,
    pub message: String,
    pub course_id: i64,
    pub enrollment_id: i64,
    pub order_no: String,
    pub payment_method: String,
    pub final_amount: f64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewRequest {
    /// 1 to 5
    pub rating: i32,
    pub content: Option<String>,
}
