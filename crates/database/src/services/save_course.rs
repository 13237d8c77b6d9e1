use crate::{
    entities::{categories, chapters, courses, enrollments, lessons},
    error::{ServiceError, ServiceResult},
    services::identity::IdentityService,
};
use chrono::Utc;
use log::info;
use models::{
    auth::{AuthContext, CATALOG_EDITORS},
    status::{ContentType, CourseLevel, CourseStatus},
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, SqlErr, TransactionTrait,
};

/// Editable course metadata
#[derive(Debug, Clone, Default)]
pub struct CourseInput {
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub cover_image: Option<String>,
    pub price: f64,
    /// Defaults to `price`
    pub original_price: Option<f64>,
    pub level: CourseLevel,
    pub duration_hours: Option<f64>,
    /// Ignored on creation, new courses always start as drafts. `None`
    /// keeps the current status on update.
    pub status: Option<CourseStatus>,
    /// Only honored for admins
    pub is_featured: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ChapterInput {
    pub title: String,
    pub description: Option<String>,
    pub sort_order: Option<i32>,
    pub is_free: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LessonInput {
    pub title: String,
    pub content_type: ContentType,
    pub video_url: Option<String>,
    pub video_duration: i32,
    pub sort_order: Option<i32>,
    pub is_free: bool,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_title(title: &str, what: &str) -> ServiceResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ServiceError::validation(format!("Please enter {what} title")));
    }
    Ok(title.to_string())
}

pub struct SaveCourseService;

impl SaveCourseService {
    /// Validated (price, original_price) pair
    fn prices(input: &CourseInput) -> ServiceResult<(f64, f64)> {
        if !input.price.is_finite() || input.price < 0.0 {
            return Err(ServiceError::validation("Price must be zero or more"));
        }

        let original_price = input.original_price.unwrap_or(input.price);
        if !original_price.is_finite() || original_price < 0.0 {
            return Err(ServiceError::validation(
                "Original price must be zero or more",
            ));
        }

        Ok((input.price, original_price))
    }

    async fn check_category<C: ConnectionTrait>(
        conn: &C,
        category_id: Option<i64>,
    ) -> ServiceResult<()> {
        if let Some(category_id) = category_id
            && categories::Entity::find_by_id(category_id)
                .one(conn)
                .await?
                .is_none()
        {
            return Err(ServiceError::validation("Unknown category"));
        }
        Ok(())
    }

    /// Loads a course the actor is allowed to change
    pub async fn managed_course<C: ConnectionTrait>(
        conn: &C,
        course_id: i64,
        actor: &AuthContext,
    ) -> ServiceResult<courses::Model> {
        let course = courses::Entity::find_by_id(course_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Course not found"))?;

        if !actor.may_manage(course.instructor_id) {
            return Err(ServiceError::forbidden(
                "No permission to manage this course",
            ));
        }

        Ok(course)
    }

    /// Creates a draft course owned by the actor
    pub async fn create_course(
        db: &DatabaseConnection,
        actor: &AuthContext,
        input: CourseInput,
    ) -> ServiceResult<courses::Model> {
        IdentityService::require_any_role(actor, &CATALOG_EDITORS)?;

        let title = required_title(&input.title, "course")?;
        let (price, original_price) = Self::prices(&input)?;
        Self::check_category(db, input.category_id).await?;

        let is_featured = actor.is_admin() && input.is_featured.unwrap_or(false);

        let course = courses::ActiveModel {
            title: Set(title),
            subtitle: Set(non_blank(input.subtitle)),
            description: Set(non_blank(input.description)),
            instructor_id: Set(actor.user_id),
            category_id: Set(input.category_id),
            cover_image: Set(non_blank(input.cover_image)),
            price: Set(price),
            original_price: Set(Some(original_price)),
            level: Set(input.level),
            duration_hours: Set(input.duration_hours.unwrap_or(0.0).max(0.0)),
            status: Set(CourseStatus::Draft),
            is_featured: Set(is_featured),
            enrollment_count: Set(0),
            rating_avg: Set(0.0),
            rating_count: Set(0),
            created_at: Set(Utc::now().naive_utc()),
            published_at: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!("User {} created course {}", actor.user_id, course.id);
        Ok(course)
    }

    /// Replaces the course metadata. The first transition to published
    /// stamps `published_at`.
    pub async fn update_course(
        db: &DatabaseConnection,
        course_id: i64,
        actor: &AuthContext,
        input: CourseInput,
    ) -> ServiceResult<courses::Model> {
        let course = Self::managed_course(db, course_id, actor).await?;

        let title = required_title(&input.title, "course")?;
        let (price, original_price) = Self::prices(&input)?;
        Self::check_category(db, input.category_id).await?;

        let status = input.status.unwrap_or(course.status);
        let published_at = match course.published_at {
            Some(at) => Some(at),
            None if status == CourseStatus::Published => Some(Utc::now().naive_utc()),
            None => None,
        };
        let is_featured = match input.is_featured {
            Some(featured) if actor.is_admin() => featured,
            _ => course.is_featured,
        };
        let duration_hours = input
            .duration_hours
            .map(|hours| hours.max(0.0))
            .unwrap_or(course.duration_hours);

        let mut active: courses::ActiveModel = course.into();
        active.title = Set(title);
        active.subtitle = Set(non_blank(input.subtitle));
        active.description = Set(non_blank(input.description));
        active.category_id = Set(input.category_id);
        active.cover_image = Set(non_blank(input.cover_image));
        active.price = Set(price);
        active.original_price = Set(Some(original_price));
        active.level = Set(input.level);
        active.duration_hours = Set(duration_hours);
        active.status = Set(status);
        active.is_featured = Set(is_featured);
        active.published_at = Set(published_at);

        let course = active.update(db).await?;

        info!("User {} updated course {course_id}", actor.user_id);
        Ok(course)
    }

    /// Hard-deletes a course nobody is enrolled in. Chapters, lessons,
    /// reviews and favorites go with it.
    pub async fn delete_course(
        db: &DatabaseConnection,
        course_id: i64,
        actor: &AuthContext,
    ) -> ServiceResult<()> {
        let txn = db.begin().await?;

        let course = Self::managed_course(&txn, course_id, actor).await?;

        let enrolled = enrollments::Entity::find()
            .filter(enrollments::Column::CourseId.eq(course_id))
            .count(&txn)
            .await?;
        if enrolled > 0 {
            return Err(Self::has_enrollments());
        }

        // An enrollment committed after the count is caught by the
        // restricting foreign key
        course.delete(&txn).await.map_err(|e| match e.sql_err() {
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => Self::has_enrollments(),
            _ => ServiceError::Database(e),
        })?;

        txn.commit().await?;

        info!("User {} deleted course {course_id}", actor.user_id);
        Ok(())
    }

    fn has_enrollments() -> ServiceError {
        ServiceError::conflict("Cannot delete a course that has active enrollments")
    }

    /// Appends a chapter to a course. Without an explicit sort order it goes
    /// last.
    pub async fn add_chapter(
        db: &DatabaseConnection,
        course_id: i64,
        actor: &AuthContext,
        input: ChapterInput,
    ) -> ServiceResult<chapters::Model> {
        let course = Self::managed_course(db, course_id, actor).await?;
        let title = required_title(&input.title, "chapter")?;

        let sort_order = match input.sort_order {
            Some(order) => order,
            None => {
                let existing = chapters::Entity::find()
                    .filter(chapters::Column::CourseId.eq(course.id))
                    .count(db)
                    .await?;
                existing as i32 + 1
            }
        };

        let chapter = chapters::ActiveModel {
            course_id: Set(course.id),
            title: Set(title),
            description: Set(non_blank(input.description)),
            sort_order: Set(sort_order),
            is_free: Set(input.is_free),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!("Added chapter {} to course {}", chapter.id, course.id);
        Ok(chapter)
    }

    /// Appends a lesson to a chapter, gated on the owning course
    pub async fn add_lesson(
        db: &DatabaseConnection,
        chapter_id: i64,
        actor: &AuthContext,
        input: LessonInput,
    ) -> ServiceResult<lessons::Model> {
        let chapter = chapters::Entity::find_by_id(chapter_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Chapter not found"))?;
        Self::managed_course(db, chapter.course_id, actor).await?;

        let title = required_title(&input.title, "lesson")?;
        if input.video_duration < 0 {
            return Err(ServiceError::validation(
                "Video duration must be zero or more",
            ));
        }

        let sort_order = match input.sort_order {
            Some(order) => order,
            None => {
                let existing = lessons::Entity::find()
                    .filter(lessons::Column::ChapterId.eq(chapter.id))
                    .count(db)
                    .await?;
                existing as i32 + 1
            }
        };

        let lesson = lessons::ActiveModel {
            chapter_id: Set(chapter.id),
            title: Set(title),
            content_type: Set(input.content_type),
            video_url: Set(non_blank(input.video_url)),
            video_duration: Set(input.video_duration),
            sort_order: Set(sort_order),
            is_free: Set(input.is_free),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!("Added lesson {} to chapter {}", lesson.id, chapter.id);
        Ok(lesson)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        entities::reviews,
        testing::{self, TestCourse},
    };
    use models::status::{EnrollmentStatus, ReviewStatus};

    fn course_input(title: &str, price: f64) -> CourseInput {
        CourseInput {
            title: title.to_string(),
            price,
            ..Default::default()
        }
    }

    async fn enroll_directly(db: &DatabaseConnection, user_id: i64, course_id: i64) {
        enrollments::ActiveModel {
            user_id: Set(user_id),
            course_id: Set(course_id),
            order_id: Set(None),
            progress_percent: Set(0.0),
            completed_lessons: Set(0),
            total_lessons: Set(0),
            status: Set(EnrollmentStatus::Active),
            enrolled_at: Set(Utc::now().naive_utc()),
            last_accessed_at: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_create_course_defaults() {
        let db = testing::setup_db().await;
        let prof = testing::insert_instructor(&db, "prof").await;

        let course = SaveCourseService::create_course(&db, &prof, course_input("  Rust  ", 49.0))
            .await
            .unwrap();
        assert_eq!(course.title, "Rust");
        assert_eq!(course.status, CourseStatus::Draft);
        assert_eq!(course.original_price, Some(49.0));
        assert_eq!(course.instructor_id, prof.user_id);
        assert!(course.published_at.is_none());
        assert!(!course.is_featured);
    }

    #[tokio::test]
    async fn test_create_course_validation_and_roles() {
        let db = testing::setup_db().await;
        let prof = testing::insert_instructor(&db, "prof").await;
        let student = testing::insert_student(&db, "sam").await;

        let blank = SaveCourseService::create_course(&db, &prof, course_input("   ", 0.0)).await;
        assert!(matches!(blank, Err(ServiceError::Validation(_))));

        let negative = SaveCourseService::create_course(&db, &prof, course_input("Rust", -1.0)).await;
        assert!(matches!(negative, Err(ServiceError::Validation(_))));

        let unknown_category = SaveCourseService::create_course(
            &db,
            &prof,
            CourseInput {
                category_id: Some(404),
                ..course_input("Rust", 0.0)
            },
        )
        .await;
        assert!(matches!(unknown_category, Err(ServiceError::Validation(_))));

        let denied = SaveCourseService::create_course(&db, &student, course_input("Rust", 0.0)).await;
        assert!(matches!(denied, Err(ServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_first_publish_stamps_published_at_once() {
        let db = testing::setup_db().await;
        let prof = testing::insert_instructor(&db, "prof").await;
        let course = TestCourse::draft("Rust").insert(&db, prof.user_id).await;

        let publish = CourseInput {
            status: Some(CourseStatus::Published),
            ..course_input("Rust", 10.0)
        };
        let published = SaveCourseService::update_course(&db, course.id, &prof, publish.clone())
            .await
            .unwrap();
        let first_stamp = published.published_at.unwrap();

        let unpublish = CourseInput {
            status: Some(CourseStatus::Draft),
            ..course_input("Rust", 10.0)
        };
        let drafted = SaveCourseService::update_course(&db, course.id, &prof, unpublish)
            .await
            .unwrap();
        assert_eq!(drafted.published_at, Some(first_stamp));

        let republished = SaveCourseService::update_course(&db, course.id, &prof, publish)
            .await
            .unwrap();
        assert_eq!(republished.published_at, Some(first_stamp));
    }

    #[tokio::test]
    async fn test_ownership_gate() {
        let db = testing::setup_db().await;
        let alice = testing::insert_instructor(&db, "alice").await;
        let bob = testing::insert_instructor(&db, "bob").await;
        let admin = testing::insert_admin(&db, "root").await;
        let course = TestCourse::published("Rust").lessons(&[1]).insert(&db, alice.user_id).await;

        let edit = SaveCourseService::update_course(&db, course.id, &bob, course_input("Mine", 0.0)).await;
        assert!(matches!(edit, Err(ServiceError::Forbidden(_))));

        let delete = SaveCourseService::delete_course(&db, course.id, &bob).await;
        assert!(matches!(delete, Err(ServiceError::Forbidden(_))));

        let chapter = SaveCourseService::add_chapter(
            &db,
            course.id,
            &bob,
            ChapterInput {
                title: "Extra".to_string(),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(chapter, Err(ServiceError::Forbidden(_))));

        let edited = SaveCourseService::update_course(&db, course.id, &admin, course_input("Moderated", 0.0))
            .await
            .unwrap();
        assert_eq!(edited.title, "Moderated");

        let missing = SaveCourseService::update_course(&db, course.id + 100, &admin, course_input("X", 0.0)).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_guarded_by_enrollments() {
        let db = testing::setup_db().await;
        let prof = testing::insert_instructor(&db, "prof").await;
        let student = testing::insert_student(&db, "sam").await;
        let admin = testing::insert_admin(&db, "root").await;
        let course = TestCourse::published("Rust").lessons(&[2]).insert(&db, prof.user_id).await;

        enroll_directly(&db, student.user_id, course.id).await;

        let blocked = SaveCourseService::delete_course(&db, course.id, &admin).await;
        assert!(matches!(blocked, Err(ServiceError::Conflict(_))));
        assert!(courses::Entity::find_by_id(course.id).one(&db).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_cascades_content() {
        let db = testing::setup_db().await;
        let prof = testing::insert_instructor(&db, "prof").await;
        let student = testing::insert_student(&db, "sam").await;
        let course = TestCourse::published("Rust").lessons(&[2, 1]).insert(&db, prof.user_id).await;

        reviews::ActiveModel {
            user_id: Set(student.user_id),
            course_id: Set(course.id),
            rating: Set(4),
            content: Set(None),
            helpful_count: Set(0),
            status: Set(ReviewStatus::Approved),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        SaveCourseService::delete_course(&db, course.id, &prof).await.unwrap();

        assert!(courses::Entity::find_by_id(course.id).one(&db).await.unwrap().is_none());
        assert_eq!(chapters::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(lessons::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(reviews::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_add_chapter_and_lesson_append() {
        let db = testing::setup_db().await;
        let prof = testing::insert_instructor(&db, "prof").await;
        let course = TestCourse::draft("Rust").lessons(&[2]).insert(&db, prof.user_id).await;

        let chapter = SaveCourseService::add_chapter(
            &db,
            course.id,
            &prof,
            ChapterInput {
                title: "Ownership".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(chapter.sort_order, 2);

        let lesson = SaveCourseService::add_lesson(
            &db,
            chapter.id,
            &prof,
            LessonInput {
                title: "Borrowing".to_string(),
                video_duration: 300,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(lesson.sort_order, 1);
        assert_eq!(lesson.content_type, ContentType::Video);

        let negative = SaveCourseService::add_lesson(
            &db,
            chapter.id,
            &prof,
            LessonInput {
                title: "Bad".to_string(),
                video_duration: -5,
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(negative, Err(ServiceError::Validation(_))));

        let missing = SaveCourseService::add_lesson(
            &db,
            chapter.id + 100,
            &prof,
            LessonInput {
                title: "Lost".to_string(),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }
}
