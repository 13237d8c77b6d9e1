use crate::{
    entities::{courses, enrollments, order_items, orders, users},
    error::{ServiceError, ServiceResult},
    services::aggregates,
};
use chrono::Utc;
use log::info;
use models::{
    commerce::OrderAmounts,
    status::{CourseStatus, EnrollmentStatus, PaymentMethod, PaymentStatus},
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Result of a successful enrollment
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentReceipt {
    pub order: orders::Model,
    pub enrollment: enrollments::Model,
}

/// An enrollment as listed on the learner's profile
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentView {
    #[serde(flatten)]
    pub enrollment: enrollments::Model,
    pub title: String,
    pub cover_image: Option<String>,
    pub instructor_name: Option<String>,
}

/// `ORD` + timestamp + zero-padded user id + random suffix. The suffix
/// keeps numbers distinct within the same second.
fn order_no(user_id: i64) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "ORD{}{user_id:04}{}",
        Utc::now().format("%Y%m%d%H%M%S"),
        suffix[..8].to_uppercase()
    )
}

pub struct CommerceService;

impl CommerceService {
    /// Buys a course at its current price and enrolls the user. The order,
    /// its item, the enrollment and the course's enrollment count are
    /// written in one transaction.
    pub async fn enroll(
        db: &DatabaseConnection,
        user_id: i64,
        course_id: i64,
    ) -> ServiceResult<EnrollmentReceipt> {
        let txn = db.begin().await?;

        let course = courses::Entity::find_by_id(course_id)
            .one(&txn)
            .await?
            .filter(|course| course.status == CourseStatus::Published)
            .ok_or_else(|| ServiceError::not_found("Course not found"))?;

        let amounts = OrderAmounts::at_price(course.price);
        let now = Utc::now().naive_utc();

        // Payment is settled immediately
        let order = orders::ActiveModel {
            order_no: Set(order_no(user_id)),
            user_id: Set(user_id),
            total_amount: Set(amounts.total_amount()),
            discount_amount: Set(amounts.discount_amount()),
            final_amount: Set(amounts.final_amount()),
            payment_method: Set(PaymentMethod::for_amount(amounts.final_amount())),
            payment_status: Set(PaymentStatus::Paid),
            paid_at: Set(Some(now)),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        order_items::ActiveModel {
            order_id: Set(order.id),
            course_id: Set(course.id),
            price: Set(course.price),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let total_lessons = aggregates::count_course_lessons(&txn, course.id).await?;

        // The (user, course) unique index rejects a second enrollment, even
        // one racing this transaction
        let enrollment = enrollments::ActiveModel {
            user_id: Set(user_id),
            course_id: Set(course.id),
            order_id: Set(Some(order.id)),
            progress_percent: Set(0.0),
            completed_lessons: Set(0),
            total_lessons: Set(total_lessons),
            status: Set(EnrollmentStatus::Active),
            enrolled_at: Set(now),
            last_accessed_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            ServiceError::from_unique_violation(e, "You have already enrolled in this course")
        })?;

        aggregates::refresh_enrollment_count(&txn, course.id).await?;

        txn.commit().await?;

        info!(
            "User {user_id} enrolled in course {course_id} with order {}",
            order.order_no
        );
        Ok(EnrollmentReceipt { order, enrollment })
    }

    /// The user's enrollments, most recently accessed first
    pub async fn list_enrollments(
        db: &DatabaseConnection,
        user_id: i64,
    ) -> ServiceResult<Vec<EnrollmentView>> {
        let rows = enrollments::Entity::find()
            .filter(enrollments::Column::UserId.eq(user_id))
            .order_by_desc(enrollments::Column::LastAccessedAt)
            .order_by_desc(enrollments::Column::EnrolledAt)
            .order_by_desc(enrollments::Column::Id)
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
            .filter_map(|(enrollment, course)| {
                let course = course?;
                Some(EnrollmentView {
                    enrollment,
                    title: course.title,
                    cover_image: course.cover_image,
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
    use crate::testing::{self, TestCourse};
    use futures::future::join_all;
    use sea_orm::PaginatorTrait;

    #[tokio::test]
    async fn test_free_course_enroll() {
        let db = testing::setup_db().await;
        let prof = testing::insert_instructor(&db, "prof").await;
        let student = testing::insert_student(&db, "sam").await;
        let course = TestCourse::published("Git").lessons(&[3, 2]).insert(&db, prof.user_id).await;

        let receipt = CommerceService::enroll(&db, student.user_id, course.id).await.unwrap();

        assert_eq!(receipt.order.payment_method, PaymentMethod::Free);
        assert_eq!(receipt.order.payment_status, PaymentStatus::Paid);
        assert!(receipt.order.paid_at.is_some());
        assert_eq!(receipt.order.final_amount, 0.0);
        assert_eq!(receipt.enrollment.total_lessons, 5);
        assert_eq!(receipt.enrollment.order_id, Some(receipt.order.id));
        assert!(receipt.order.order_no.starts_with("ORD"));

        let items = order_items::Entity::find()
            .filter(order_items::Column::OrderId.eq(receipt.order.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].course_id, course.id);

        let stored = courses::Entity::find_by_id(course.id).one(&db).await.unwrap().unwrap();
        assert_eq!(stored.enrollment_count, 1);
    }

    #[tokio::test]
    async fn test_paid_course_enroll() {
        let db = testing::setup_db().await;
        let prof = testing::insert_instructor(&db, "prof").await;
        let student = testing::insert_student(&db, "sam").await;
        let course = TestCourse::published("Rust").price(199.0).insert(&db, prof.user_id).await;

        let receipt = CommerceService::enroll(&db, student.user_id, course.id).await.unwrap();
        assert_eq!(receipt.order.payment_method, PaymentMethod::Alipay);
        assert_eq!(receipt.order.total_amount, 199.0);
        assert_eq!(receipt.order.discount_amount, 0.0);
        assert_eq!(
            receipt.order.final_amount,
            receipt.order.total_amount - receipt.order.discount_amount
        );
    }

    #[tokio::test]
    async fn test_enroll_twice_conflicts() {
        let db = testing::setup_db().await;
        let prof = testing::insert_instructor(&db, "prof").await;
        let student = testing::insert_student(&db, "sam").await;
        let course = TestCourse::published("Rust").insert(&db, prof.user_id).await;

        CommerceService::enroll(&db, student.user_id, course.id).await.unwrap();
        let second = CommerceService::enroll(&db, student.user_id, course.id).await;
        assert!(matches!(second, Err(ServiceError::Conflict(_))));

        // The rejected attempt leaves no order behind
        assert_eq!(orders::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_enrolls_yield_one_enrollment() {
        let db = testing::setup_db().await;
        let prof = testing::insert_instructor(&db, "prof").await;
        let student = testing::insert_student(&db, "sam").await;
        let course = TestCourse::published("Rust").lessons(&[1]).insert(&db, prof.user_id).await;

        let attempts = (0..5).map(|_| CommerceService::enroll(&db, student.user_id, course.id));
        let results = join_all(attempts).await;

        let successes = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(ServiceError::Conflict(_))))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 4);

        let enrollments = enrollments::Entity::find()
            .filter(enrollments::Column::CourseId.eq(course.id))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(enrollments, 1);

        let stored = courses::Entity::find_by_id(course.id).one(&db).await.unwrap().unwrap();
        assert_eq!(stored.enrollment_count, 1);
    }

    #[tokio::test]
    async fn test_enroll_missing_or_draft_course() {
        let db = testing::setup_db().await;
        let prof = testing::insert_instructor(&db, "prof").await;
        let student = testing::insert_student(&db, "sam").await;
        let draft = TestCourse::draft("Soon").insert(&db, prof.user_id).await;

        let missing = CommerceService::enroll(&db, student.user_id, draft.id + 100).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));

        let unpublished = CommerceService::enroll(&db, student.user_id, draft.id).await;
        assert!(matches!(unpublished, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_enrollments() {
        let db = testing::setup_db().await;
        let prof = testing::insert_instructor(&db, "prof").await;
        let student = testing::insert_student(&db, "sam").await;
        let rust = TestCourse::published("Rust").insert(&db, prof.user_id).await;
        let go = TestCourse::published("Go").insert(&db, prof.user_id).await;

        CommerceService::enroll(&db, student.user_id, rust.id).await.unwrap();
        CommerceService::enroll(&db, student.user_id, go.id).await.unwrap();

        let listed = CommerceService::list_enrollments(&db, student.user_id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|e| e.instructor_name.as_deref() == Some("prof")));
        let titles: Vec<&str> = listed.iter().map(|e| e.title.as_str()).collect();
        assert!(titles.contains(&"Rust") && titles.contains(&"Go"));
    }
}
