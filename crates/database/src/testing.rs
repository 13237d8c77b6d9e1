//! Fixtures shared by the service tests

use crate::{
    db::create_connection,
    entities::{chapters, courses, lessons, user_profiles, users},
    services::identity::IdentityService,
};
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use models::{
    auth::{AuthContext, RoleName},
    status::{ContentType, CourseLevel, CourseStatus, UserStatus},
};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection};

pub async fn setup_db() -> DatabaseConnection {
    let db = create_connection("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

/// Inserts an active user with the given roles. The stored hash is not a
/// valid argon2 string, so these users cannot log in.
pub async fn insert_user(db: &DatabaseConnection, username: &str, roles: &[RoleName]) -> AuthContext {
    let user = users::ActiveModel {
        username: Set(username.to_string()),
        email: Set(format!("{username}@example.com")),
        password_hash: Set("not-a-hash".to_string()),
        phone: Set(None),
        status: Set(UserStatus::Active),
        created_at: Set(Utc::now().naive_utc()),
        last_login: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();

    user_profiles::ActiveModel {
        user_id: Set(user.id),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();

    for role in roles {
        IdentityService::grant_role(db, user.id, *role).await.unwrap();
    }

    AuthContext {
        user_id: user.id,
        username: user.username,
        roles: roles.to_vec(),
    }
}

pub async fn insert_student(db: &DatabaseConnection, username: &str) -> AuthContext {
    insert_user(db, username, &[RoleName::Student]).await
}

pub async fn insert_instructor(db: &DatabaseConnection, username: &str) -> AuthContext {
    insert_user(db, username, &[RoleName::Student, RoleName::Instructor]).await
}

pub async fn insert_admin(db: &DatabaseConnection, username: &str) -> AuthContext {
    insert_user(db, username, &[RoleName::Student, RoleName::Admin]).await
}

/// Builder for a course with chapters and lessons
pub struct TestCourse {
    title: String,
    status: CourseStatus,
    price: f64,
    category_id: Option<i64>,
    level: CourseLevel,
    /// Lesson count per chapter
    chapters: Vec<usize>,
    video_duration: i32,
}

pub struct InsertedCourse {
    pub id: i64,
    pub chapter_ids: Vec<i64>,
    /// In chapter then lesson order
    pub lesson_ids: Vec<i64>,
}

impl TestCourse {
    pub fn published(title: &str) -> Self {
        Self {
            title: title.to_string(),
            status: CourseStatus::Published,
            price: 0.0,
            category_id: None,
            level: CourseLevel::Beginner,
            chapters: Vec::new(),
            video_duration: 600,
        }
    }

    pub fn draft(title: &str) -> Self {
        Self {
            status: CourseStatus::Draft,
            ..Self::published(title)
        }
    }

    pub fn price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    pub fn category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn level(mut self, level: CourseLevel) -> Self {
        self.level = level;
        self
    }

    pub fn lessons(mut self, per_chapter: &[usize]) -> Self {
        self.chapters = per_chapter.to_vec();
        self
    }

    pub fn video_duration(mut self, seconds: i32) -> Self {
        self.video_duration = seconds;
        self
    }

    pub async fn insert(self, db: &DatabaseConnection, instructor_id: i64) -> InsertedCourse {
        let now = Utc::now().naive_utc();
        let published_at = (self.status == CourseStatus::Published).then_some(now);

        let course = courses::ActiveModel {
            title: Set(self.title),
            subtitle: Set(None),
            description: Set(None),
            instructor_id: Set(instructor_id),
            category_id: Set(self.category_id),
            cover_image: Set(None),
            price: Set(self.price),
            original_price: Set(Some(self.price)),
            level: Set(self.level),
            duration_hours: Set(0.0),
            status: Set(self.status),
            is_featured: Set(false),
            enrollment_count: Set(0),
            rating_avg: Set(0.0),
            rating_count: Set(0),
            created_at: Set(now),
            published_at: Set(published_at),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();

        let mut chapter_ids = Vec::new();
        let mut lesson_ids = Vec::new();

        for (chapter_index, lesson_count) in self.chapters.into_iter().enumerate() {
            let chapter = chapters::ActiveModel {
                course_id: Set(course.id),
                title: Set(format!("Chapter {}", chapter_index + 1)),
                description: Set(None),
                sort_order: Set(chapter_index as i32 + 1),
                is_free: Set(false),
                ..Default::default()
            }
            .insert(db)
            .await
            .unwrap();
            chapter_ids.push(chapter.id);

            for lesson_index in 0..lesson_count {
                let lesson = lessons::ActiveModel {
                    chapter_id: Set(chapter.id),
                    title: Set(format!("Lesson {}.{}", chapter_index + 1, lesson_index + 1)),
                    content_type: Set(ContentType::Video),
                    video_url: Set(None),
                    video_duration: Set(self.video_duration),
                    sort_order: Set(lesson_index as i32 + 1),
                    is_free: Set(false),
                    ..Default::default()
                }
                .insert(db)
                .await
                .unwrap();
                lesson_ids.push(lesson.id);
            }
        }

        InsertedCourse {
            id: course.id,
            chapter_ids,
            lesson_ids,
        }
    }
}
