use crate::{
    entities::{chapters, courses, enrollments, learning_progress, lessons},
    error::{ServiceError, ServiceResult},
    services::{
        aggregates,
        query_course::QueryCourseService,
    },
};
use chrono::Utc;
use log::{debug, info};
use models::progress::{CompletionPolicy, LessonWatch};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, TransactionTrait, sea_query::OnConflict,
};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdate {
    pub lesson_id: i64,
    pub watch: LessonWatch,
    pub enrollment: enrollments::Model,
}

#[derive(Debug, Clone, Serialize)]
pub struct LessonProgress {
    #[serde(flatten)]
    pub lesson: lessons::Model,
    pub watch: LessonWatch,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChapterProgress {
    pub chapter: chapters::Model,
    pub lessons: Vec<LessonProgress>,
}

/// The learning page of an enrolled course
#[derive(Debug, Clone, Serialize)]
pub struct CourseProgressView {
    pub course: courses::Model,
    pub enrollment: enrollments::Model,
    pub chapters: Vec<ChapterProgress>,
    pub current_lesson: Option<lessons::Model>,
}

impl From<&learning_progress::Model> for LessonWatch {
    fn from(row: &learning_progress::Model) -> Self {
        LessonWatch {
            watched_duration: row.watched_duration,
            progress_percent: row.progress_percent,
            is_completed: row.is_completed,
        }
    }
}

async fn find_enrollment<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    course_id: i64,
) -> ServiceResult<enrollments::Model> {
    enrollments::Entity::find()
        .filter(enrollments::Column::UserId.eq(user_id))
        .filter(enrollments::Column::CourseId.eq(course_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::forbidden("Please enroll first"))
}

pub struct ProgressService;

impl ProgressService {
    /// Records how far the user has watched a lesson and refreshes the
    /// completion summary of their enrollment
    pub async fn record_progress(
        db: &DatabaseConnection,
        user_id: i64,
        lesson_id: i64,
        watched_duration: i32,
    ) -> ServiceResult<ProgressUpdate> {
        if watched_duration < 0 {
            return Err(ServiceError::validation(
                "Watched duration must be zero or more",
            ));
        }

        let txn = db.begin().await?;

        let (lesson, chapter) = lessons::Entity::find_by_id(lesson_id)
            .find_also_related(chapters::Entity)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Lesson not found"))?;
        let chapter = chapter.ok_or_else(|| ServiceError::not_found("Lesson not found"))?;

        let enrollment = find_enrollment(&txn, user_id, chapter.course_id).await?;

        let previous = learning_progress::Entity::find()
            .filter(learning_progress::Column::UserId.eq(user_id))
            .filter(learning_progress::Column::LessonId.eq(lesson_id))
            .one(&txn)
            .await?;

        let watch = CompletionPolicy::default().record(
            previous.as_ref().map(LessonWatch::from),
            watched_duration,
            lesson.video_duration,
        );

        learning_progress::Entity::insert(learning_progress::ActiveModel {
            user_id: Set(user_id),
            lesson_id: Set(lesson_id),
            watched_duration: Set(watch.watched_duration),
            progress_percent: Set(watch.progress_percent),
            is_completed: Set(watch.is_completed),
            updated_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::columns([
                learning_progress::Column::UserId,
                learning_progress::Column::LessonId,
            ])
            .update_columns([
                learning_progress::Column::WatchedDuration,
                learning_progress::Column::ProgressPercent,
                learning_progress::Column::IsCompleted,
                learning_progress::Column::UpdatedAt,
            ])
            .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;

        let became_complete = watch.is_completed && !previous.is_some_and(|p| p.is_completed);

        let enrollment = aggregates::refresh_enrollment_progress(&txn, enrollment).await?;

        txn.commit().await?;

        if became_complete {
            info!(
                "User {user_id} completed lesson {lesson_id}, course progress {}%",
                enrollment.progress_percent
            );
        } else {
            debug!(
                "User {user_id} at {}s of lesson {lesson_id}",
                watch.watched_duration
            );
        }

        Ok(ProgressUpdate {
            lesson_id,
            watch,
            enrollment,
        })
    }

    /// The outline of an enrolled course joined with the user's progress.
    /// `lesson_id` selects the lesson being watched; it is ignored unless it
    /// belongs to the course.
    pub async fn get_course_progress_view(
        db: &DatabaseConnection,
        user_id: i64,
        course_id: i64,
        lesson_id: Option<i64>,
    ) -> ServiceResult<CourseProgressView> {
        let enrollment = find_enrollment(db, user_id, course_id).await?;

        let course = courses::Entity::find_by_id(course_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Course not found"))?;

        let outline = QueryCourseService::course_outline(db, course_id).await?;

        let lesson_ids: Vec<i64> = outline
            .iter()
            .flat_map(|chapter| chapter.lessons.iter().map(|lesson| lesson.id))
            .collect();

        let mut watches: HashMap<i64, LessonWatch> = if lesson_ids.is_empty() {
            HashMap::new()
        } else {
            learning_progress::Entity::find()
                .filter(learning_progress::Column::UserId.eq(user_id))
                .filter(learning_progress::Column::LessonId.is_in(lesson_ids))
                .all(db)
                .await?
                .iter()
                .map(|row| (row.lesson_id, LessonWatch::from(row)))
                .collect()
        };

        let current_lesson = lesson_id.and_then(|wanted| {
            outline
                .iter()
                .flat_map(|chapter| chapter.lessons.iter())
                .find(|lesson| lesson.id == wanted)
                .cloned()
        });

        let chapters = outline
            .into_iter()
            .map(|outline| ChapterProgress {
                chapter: outline.chapter,
                lessons: outline
                    .lessons
                    .into_iter()
                    .map(|lesson| LessonProgress {
                        watch: watches.remove(&lesson.id).unwrap_or_default(),
                        lesson,
                    })
                    .collect(),
            })
            .collect();

        let mut active: enrollments::ActiveModel = enrollment.into();
        active.last_accessed_at = Set(Some(Utc::now().naive_utc()));
        let enrollment = active.update(db).await?;

        Ok(CourseProgressView {
            course,
            enrollment,
            chapters,
            current_lesson,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        services::commerce::CommerceService,
        testing::{self, TestCourse},
    };
    use models::status::EnrollmentStatus;

    #[tokio::test]
    async fn test_progress_threshold_and_sticky_completion() {
        let db = testing::setup_db().await;
        let prof = testing::insert_instructor(&db, "prof").await;
        let student = testing::insert_student(&db, "sam").await;
        let course = TestCourse::published("Rust").lessons(&[2]).insert(&db, prof.user_id).await;
        CommerceService::enroll(&db, student.user_id, course.id).await.unwrap();

        let lesson = course.lesson_ids[0];

        let update = ProgressService::record_progress(&db, student.user_id, lesson, 300).await.unwrap();
        assert_eq!(update.watch.progress_percent, 50.0);
        assert!(!update.watch.is_completed);
        assert_eq!(update.enrollment.completed_lessons, 0);

        let update = ProgressService::record_progress(&db, student.user_id, lesson, 570).await.unwrap();
        assert!(update.watch.is_completed);
        assert_eq!(update.enrollment.completed_lessons, 1);
        assert_eq!(update.enrollment.progress_percent, 50.0);
        assert_eq!(update.enrollment.status, EnrollmentStatus::Active);

        // Rewinding keeps the furthest position and the completion
        let update = ProgressService::record_progress(&db, student.user_id, lesson, 10).await.unwrap();
        assert_eq!(update.watch.watched_duration, 570);
        assert!(update.watch.is_completed);
        assert_eq!(update.enrollment.completed_lessons, 1);

        let rows = learning_progress::Entity::find().all(&db).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_finishing_every_lesson_completes_enrollment() {
        let db = testing::setup_db().await;
        let prof = testing::insert_instructor(&db, "prof").await;
        let student = testing::insert_student(&db, "sam").await;
        let course = TestCourse::published("Rust").lessons(&[1, 1]).insert(&db, prof.user_id).await;
        CommerceService::enroll(&db, student.user_id, course.id).await.unwrap();

        let mut last = None;
        for lesson in &course.lesson_ids {
            last = Some(
                ProgressService::record_progress(&db, student.user_id, *lesson, 600)
                    .await
                    .unwrap(),
            );
        }

        let enrollment = last.unwrap().enrollment;
        assert_eq!(enrollment.completed_lessons, 2);
        assert_eq!(enrollment.progress_percent, 100.0);
        assert_eq!(enrollment.status, EnrollmentStatus::Completed);
    }

    #[tokio::test]
    async fn test_zero_length_lesson_completes_immediately() {
        let db = testing::setup_db().await;
        let prof = testing::insert_instructor(&db, "prof").await;
        let student = testing::insert_student(&db, "sam").await;
        let course = TestCourse::published("Notes")
            .lessons(&[1])
            .video_duration(0)
            .insert(&db, prof.user_id)
            .await;
        CommerceService::enroll(&db, student.user_id, course.id).await.unwrap();

        let update = ProgressService::record_progress(&db, student.user_id, course.lesson_ids[0], 0)
            .await
            .unwrap();
        assert!(update.watch.is_completed);
        assert_eq!(update.enrollment.status, EnrollmentStatus::Completed);
    }

    #[tokio::test]
    async fn test_record_progress_errors() {
        let db = testing::setup_db().await;
        let prof = testing::insert_instructor(&db, "prof").await;
        let student = testing::insert_student(&db, "sam").await;
        let course = TestCourse::published("Rust").lessons(&[1]).insert(&db, prof.user_id).await;
        let lesson = course.lesson_ids[0];

        let not_enrolled = ProgressService::record_progress(&db, student.user_id, lesson, 10).await;
        assert!(matches!(not_enrolled, Err(ServiceError::Forbidden(_))));

        CommerceService::enroll(&db, student.user_id, course.id).await.unwrap();

        let negative = ProgressService::record_progress(&db, student.user_id, lesson, -1).await;
        assert!(matches!(negative, Err(ServiceError::Validation(_))));

        let missing = ProgressService::record_progress(&db, student.user_id, lesson + 100, 10).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_course_progress_view() {
        let db = testing::setup_db().await;
        let prof = testing::insert_instructor(&db, "prof").await;
        let student = testing::insert_student(&db, "sam").await;
        let course = TestCourse::published("Rust").lessons(&[2, 1]).insert(&db, prof.user_id).await;
        let other = TestCourse::published("Go").lessons(&[1]).insert(&db, prof.user_id).await;

        let denied = ProgressService::get_course_progress_view(&db, student.user_id, course.id, None).await;
        assert!(matches!(denied, Err(ServiceError::Forbidden(_))));

        CommerceService::enroll(&db, student.user_id, course.id).await.unwrap();
        ProgressService::record_progress(&db, student.user_id, course.lesson_ids[1], 600)
            .await
            .unwrap();

        let view = ProgressService::get_course_progress_view(
            &db,
            student.user_id,
            course.id,
            Some(course.lesson_ids[1]),
        )
        .await
        .unwrap();

        assert_eq!(view.chapters.len(), 2);
        let first_chapter = &view.chapters[0].lessons;
        assert_eq!(first_chapter[0].watch, LessonWatch::default());
        assert!(first_chapter[1].watch.is_completed);
        assert_eq!(view.current_lesson.map(|l| l.id), Some(course.lesson_ids[1]));
        assert!(view.enrollment.last_accessed_at.is_some());

        // A lesson from another course is not shown as current
        let view = ProgressService::get_course_progress_view(
            &db,
            student.user_id,
            course.id,
            Some(other.lesson_ids[0]),
        )
        .await
        .unwrap();
        assert!(view.current_lesson.is_none());
    }
}
