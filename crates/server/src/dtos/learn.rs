use super::course::{CourseResponse, LessonResponse};
use chrono::NaiveDateTime;
use database::services::progress::{ChapterProgress, CourseProgressView, ProgressUpdate};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LearnParams {
    /// Lesson to open
    pub lesson: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LessonProgressResponse {
    #[serde(flatten)]
    pub lesson: LessonResponse,
    pub watched_duration: i32,
    pub progress_percent: f64,
    pub is_completed: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChapterProgressResponse {
    pub id: i64,
    pub title: String,
    pub sort_order: i32,
    pub lessons: Vec<LessonProgressResponse>,
}

impl From<ChapterProgress> for ChapterProgressResponse {
    fn from(chapter: ChapterProgress) -> Self {
        Self {
            id: chapter.chapter.id,
            title: chapter.chapter.title,
            sort_order: chapter.chapter.sort_order,
            lessons: chapter
                .lessons
                .into_iter()
                .map(|lp| LessonProgressResponse {
                    watched_duration: lp.watch.watched_duration,
                    progress_percent: lp.watch.progress_percent,
                    is_completed: lp.watch.is_completed,
                    lesson: lp.lesson.into(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EnrollmentProgress {
    pub progress_percent: f64,
    pub completed_lessons: i32,
    pub total_lessons: i32,
    pub status: String,
    pub last_accessed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LearnResponse {
    pub course: CourseResponse,
    pub enrollment: EnrollmentProgress,
    pub chapters: Vec<ChapterProgressResponse>,
    pub current_lesson: Option<LessonResponse>,
}

impl From<CourseProgressView> for LearnResponse {
    fn from(view: CourseProgressView) -> Self {
        Self {
            course: view.course.into(),
            enrollment: EnrollmentProgress {
                progress_percent: view.enrollment.progress_percent,
                completed_lessons: view.enrollment.completed_lessons,
                total_lessons: view.enrollment.total_lessons,
                status: view.enrollment.status.to_string(),
                last_accessed_at: view.enrollment.last_accessed_at,
            },
            chapters: view.chapters.into_iter().map(Into::into).collect(),
            current_lesson: view.current_lesson.map(Into::into),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProgressRequest {
    /// Furthest position reached, in seconds
    pub watched_duration: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProgressResponse {
    pub success: bool,
    pub lesson_id: i64,
    pub watched_duration: i32,
    pub progress_percent: f64,
    pub is_completed: bool,
    pub course_progress_percent: f64,
    pub completed_lessons: i32,
    pub enrollment_status: String,
}

impl From<ProgressUpdate> for ProgressResponse {
    fn from(update: ProgressUpdate) -> Self {
        Self {
            success: true,
            lesson_id: update.lesson_id,
            watched_duration: update.watch.watched_duration,
            progress_percent: update.watch.progress_percent,
            is_completed: update.watch.is_completed,
            course_progress_percent: update.enrollment.progress_percent,
            completed_lessons: update.enrollment.completed_lessons,
            enrollment_status: update.enrollment.status.to_string(),
        }
    }
}
