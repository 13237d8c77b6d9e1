//! Recomputation of the cached aggregates stored on courses and
//! enrollments.
//!
//! Each refresh recounts from the underlying rows instead of adjusting the
//! cached value, and is meant to run on the same transaction as the write
//! that changed those rows.

use crate::entities::{chapters, courses, enrollments, learning_progress, lessons, reviews};
use log::debug;
use models::{
    progress::{CourseCompletion, RatingSummary},
    status::{EnrollmentStatus, ReviewStatus},
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QuerySelect, RelationTrait, prelude::Expr, sea_query::JoinType,
};

/// Ids of every lesson under every chapter of a course
pub async fn course_lesson_ids<C: ConnectionTrait>(
    conn: &C,
    course_id: i64,
) -> Result<Vec<i64>, DbErr> {
    lessons::Entity::find()
        .select_only()
        .column(lessons::Column::Id)
        .join(JoinType::InnerJoin, lessons::Relation::Chapter.def())
        .filter(chapters::Column::CourseId.eq(course_id))
        .into_tuple::<i64>()
        .all(conn)
        .await
}

/// Number of lessons currently in a course
pub async fn count_course_lessons<C: ConnectionTrait>(conn: &C, course_id: i64) -> Result<i32, DbErr> {
    let count = lessons::Entity::find()
        .join(JoinType::InnerJoin, lessons::Relation::Chapter.def())
        .filter(chapters::Column::CourseId.eq(course_id))
        .count(conn)
        .await?;

    Ok(count as i32)
}

/// Sets `courses.enrollment_count` to the number of enrollment rows
pub async fn refresh_enrollment_count<C: ConnectionTrait>(
    conn: &C,
    course_id: i64,
) -> Result<i32, DbErr> {
    let count = enrollments::Entity::find()
        .filter(enrollments::Column::CourseId.eq(course_id))
        .count(conn)
        .await? as i32;

    courses::Entity::update_many()
        .col_expr(courses::Column::EnrollmentCount, Expr::value(count))
        .filter(courses::Column::Id.eq(course_id))
        .exec(conn)
        .await?;

    debug!("Course {course_id} enrollment_count = {count}");
    Ok(count)
}

/// Sets `courses.rating_avg` and `courses.rating_count` from the approved
/// reviews
pub async fn refresh_rating<C: ConnectionTrait>(
    conn: &C,
    course_id: i64,
) -> Result<RatingSummary, DbErr> {
    let ratings = reviews::Entity::find()
        .select_only()
        .column(reviews::Column::Rating)
        .filter(reviews::Column::CourseId.eq(course_id))
        .filter(reviews::Column::Status.eq(ReviewStatus::Approved))
        .into_tuple::<i32>()
        .all(conn)
        .await?;

    let summary = RatingSummary::from_ratings(ratings);

    courses::Entity::update_many()
        .col_expr(courses::Column::RatingAvg, Expr::value(summary.rating_avg))
        .col_expr(courses::Column::RatingCount, Expr::value(summary.rating_count))
        .filter(courses::Column::Id.eq(course_id))
        .exec(conn)
        .await?;

    debug!(
        "Course {course_id} rating = {} over {} reviews",
        summary.rating_avg, summary.rating_count
    );
    Ok(summary)
}

/// Recomputes completed_lessons, progress_percent and status of an
/// enrollment from the user's completed lessons in that course
pub async fn refresh_enrollment_progress<C: ConnectionTrait>(
    conn: &C,
    enrollment: enrollments::Model,
) -> Result<enrollments::Model, DbErr> {
    let lesson_ids = course_lesson_ids(conn, enrollment.course_id).await?;

    let completed = if lesson_ids.is_empty() {
        0
    } else {
        learning_progress::Entity::find()
            .filter(learning_progress::Column::UserId.eq(enrollment.user_id))
            .filter(learning_progress::Column::LessonId.is_in(lesson_ids))
            .filter(learning_progress::Column::IsCompleted.eq(true))
            .count(conn)
            .await? as i32
    };

    let completion = CourseCompletion::new(completed, enrollment.total_lessons);
    let status = if completion.finished {
        EnrollmentStatus::Completed
    } else {
        EnrollmentStatus::Active
    };

    let mut active: enrollments::ActiveModel = enrollment.into();
    active.completed_lessons = Set(completion.completed_lessons);
    active.progress_percent = Set(completion.progress_percent);
    active.status = Set(status);
    active.update(conn).await
}
