use crate::{
    entities::{courses, enrollments, favorites, reviews, users},
    error::{ServiceError, ServiceResult, is_unique_violation},
    services::aggregates,
};
use chrono::Utc;
use log::info;
use models::status::ReviewStatus;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::Serialize;
use std::collections::HashMap;

/// Accepted star ratings
pub const RATING_RANGE: std::ops::RangeInclusive<i32> = 1..=5;

#[derive(Debug, Clone, Serialize)]
pub struct FavoriteView {
    #[serde(flatten)]
    pub favorite: favorites::Model,
    pub title: String,
    pub cover_image: Option<String>,
    pub price: f64,
    pub instructor_name: Option<String>,
}

pub struct EngagementService;

impl EngagementService {
    /// Flips the favorite flag of a course for a user and returns the new
    /// state
    pub async fn toggle_favorite(
        db: &DatabaseConnection,
        user_id: i64,
        course_id: i64,
    ) -> ServiceResult<bool> {
        if courses::Entity::find_by_id(course_id).one(db).await?.is_none() {
            return Err(ServiceError::not_found("Course not found"));
        }

        let removed = favorites::Entity::delete_many()
            .filter(favorites::Column::UserId.eq(user_id))
            .filter(favorites::Column::CourseId.eq(course_id))
            .exec(db)
            .await?;

        if removed.rows_affected > 0 {
            info!("User {user_id} unfavorited course {course_id}");
            return Ok(false);
        }

        let inserted = favorites::ActiveModel {
            user_id: Set(user_id),
            course_id: Set(course_id),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(db)
        .await;

        match inserted {
            Ok(_) => {}
            // A concurrent toggle inserted first; both end up favorited
            Err(e) if is_unique_violation(&e) => {}
            Err(e) => return Err(e.into()),
        }

        info!("User {user_id} favorited course {course_id}");
        Ok(true)
    }

    /// Adds an approved review from an enrolled user and refreshes the
    /// course's rating aggregates
    pub async fn submit_review(
        db: &DatabaseConnection,
        user_id: i64,
        course_id: i64,
        rating: i32,
        content: Option<String>,
    ) -> ServiceResult<reviews::Model> {
        if !RATING_RANGE.contains(&rating) {
            return Err(ServiceError::validation("Rating must be between 1 and 5"));
        }
        let content = content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let txn = db.begin().await?;

        if courses::Entity::find_by_id(course_id).one(&txn).await?.is_none() {
            return Err(ServiceError::not_found("Course not found"));
        }

        let enrolled = enrollments::Entity::find()
            .filter(enrollments::Column::UserId.eq(user_id))
            .filter(enrollments::Column::CourseId.eq(course_id))
            .count(&txn)
            .await?;
        if enrolled == 0 {
            return Err(ServiceError::forbidden(
                "Only enrolled students can review this course",
            ));
        }

        let review = reviews::ActiveModel {
            user_id: Set(user_id),
            course_id: Set(course_id),
            rating: Set(rating),
            content: Set(content),
            helpful_count: Set(0),
            status: Set(ReviewStatus::Approved),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| ServiceError::from_unique_violation(e, "You have already reviewed this course"))?;

        let summary = aggregates::refresh_rating(&txn, course_id).await?;

        txn.commit().await?;

        info!(
            "User {user_id} rated course {course_id} {rating}/5, average now {}",
            summary.rating_avg
        );
        Ok(review)
    }

    /// The user's favorites, newest first
    pub async fn list_favorites(
        db: &DatabaseConnection,
        user_id: i64,
    ) -> ServiceResult<Vec<FavoriteView>> {
        let rows = favorites::Entity::find()
            .filter(favorites::Column::UserId.eq(user_id))
            .order_by_desc(favorites::Column::CreatedAt)
            .order_by_desc(favorites::Column::Id)
            .find_also_related(courses::Entity)
            .all(db)
            .await?;

        let instructor_ids: Vec<i64> = rows
            .iter()
            .filter_map(|(_, course)| course.as_ref().map(|c| c.instructor_id))
            .collect();

        let instructor_names: HashMap<i64, String> = users::Entity::find()
            .filter(users::Column::Id.is_in(instructor_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|user| (user.id, user.username))
            .collect();

        let views = rows
            .into_iter()
            .filter_map(|(favorite, course)| {
                let course = course?;
                Some(FavoriteView {
                    favorite,
                    title: course.title,
                    cover_image: course.cover_image,
                    price: course.price,
                    instructor_name: instructor_names.get(&course.instructor_id).cloned(),
                })
            })
            .collect();

        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        services::commerce::CommerceService,
        testing::{self, TestCourse},
    };

    #[tokio::test]
    async fn test_double_toggle_restores_state() {
        let db = testing::setup_db().await;
        let prof = testing::insert_instructor(&db, "prof").await;
        let student = testing::insert_student(&db, "sam").await;
        let course = TestCourse::published("Rust").insert(&db, prof.user_id).await;

        assert!(EngagementService::toggle_favorite(&db, student.user_id, course.id).await.unwrap());
        assert_eq!(favorites::Entity::find().count(&db).await.unwrap(), 1);

        let listed = EngagementService::list_favorites(&db, student.user_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Rust");
        assert_eq!(listed[0].instructor_name.as_deref(), Some("prof"));

        assert!(!EngagementService::toggle_favorite(&db, student.user_id, course.id).await.unwrap());
        assert_eq!(favorites::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_favorite_missing_course() {
        let db = testing::setup_db().await;
        let student = testing::insert_student(&db, "sam").await;

        let result = EngagementService::toggle_favorite(&db, student.user_id, 42).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_review_updates_rating() {
        let db = testing::setup_db().await;
        let prof = testing::insert_instructor(&db, "prof").await;
        let course = TestCourse::published("Rust").insert(&db, prof.user_id).await;

        for (name, rating) in [("a", 5), ("b", 4), ("c", 4)] {
            let student = testing::insert_student(&db, name).await;
            CommerceService::enroll(&db, student.user_id, course.id).await.unwrap();
            EngagementService::submit_review(&db, student.user_id, course.id, rating, None)
                .await
                .unwrap();
        }

        let stored = courses::Entity::find_by_id(course.id).one(&db).await.unwrap().unwrap();
        assert_eq!(stored.rating_count, 3);
        assert_eq!(stored.rating_avg, 4.33);
    }

    #[tokio::test]
    async fn test_review_rules() {
        let db = testing::setup_db().await;
        let prof = testing::insert_instructor(&db, "prof").await;
        let student = testing::insert_student(&db, "sam").await;
        let course = TestCourse::published("Rust").insert(&db, prof.user_id).await;

        let not_enrolled =
            EngagementService::submit_review(&db, student.user_id, course.id, 5, None).await;
        assert!(matches!(not_enrolled, Err(ServiceError::Forbidden(_))));

        CommerceService::enroll(&db, student.user_id, course.id).await.unwrap();

        for rating in [0, 6] {
            let out_of_range =
                EngagementService::submit_review(&db, student.user_id, course.id, rating, None).await;
            assert!(matches!(out_of_range, Err(ServiceError::Validation(_))));
        }

        let review = EngagementService::submit_review(
            &db,
            student.user_id,
            course.id,
            5,
            Some("  Great  ".to_string()),
        )
        .await
        .unwrap();
        assert_eq!(review.content.as_deref(), Some("Great"));
        assert_eq!(review.status, ReviewStatus::Approved);

        let duplicate =
            EngagementService::submit_review(&db, student.user_id, course.id, 1, None).await;
        assert!(matches!(duplicate, Err(ServiceError::Conflict(_))));

        let stored = courses::Entity::find_by_id(course.id).one(&db).await.unwrap().unwrap();
        assert_eq!(stored.rating_count, 1);
        assert_eq!(stored.rating_avg, 5.0);
    }
}
