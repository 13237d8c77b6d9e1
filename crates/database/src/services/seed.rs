//! Demo content for a fresh database. Everything except categories goes
//! through the regular services so the cached aggregates come out right.

use crate::{
    entities::{categories, users},
    error::ServiceResult,
    services::{
        commerce::CommerceService,
        engagement::EngagementService,
        identity::{IdentityService, ProfileUpdate},
        progress::ProgressService,
        save_course::{ChapterInput, CourseInput, LessonInput, SaveCourseService},
    },
};
use log::info;
use models::{
    auth::{AuthContext, RoleName},
    status::{CourseLevel, CourseStatus},
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait, PaginatorTrait,
};

/// Password shared by every demo account
pub const SAMPLE_PASSWORD: &str = "password123";

struct SampleUser {
    username: &'static str,
    email: &'static str,
    role: RoleName,
    bio: Option<&'static str>,
    occupation: Option<&'static str>,
}

const USERS: [SampleUser; 6] = [
    SampleUser { username: "John", email: "john@example.com", role: RoleName::Student, bio: Some("Passionate programmer"), occupation: Some("Software Engineer") },
    SampleUser { username: "Mike", email: "mike@example.com", role: RoleName::Student, bio: Some("Frontend enthusiast"), occupation: Some("Frontend Developer") },
    SampleUser { username: "Prof. Wang", email: "wang@example.com", role: RoleName::Instructor, bio: Some("10 years Python experience"), occupation: Some("Senior Engineer") },
    SampleUser { username: "Prof. Liu", email: "liu@example.com", role: RoleName::Instructor, bio: Some("Full-stack expert"), occupation: Some("Tech Lead") },
    SampleUser { username: "Prof. Chen", email: "chen@example.com", role: RoleName::Instructor, bio: Some("Data scientist"), occupation: Some("Data Scientist") },
    SampleUser { username: "admin", email: "admin@example.com", role: RoleName::Admin, bio: None, occupation: None },
];

/// (name, parent index, description)
const CATEGORIES: [(&str, Option<usize>, &str); 7] = [
    ("Programming", None, "Programming languages and development"),
    ("Frontend", Some(0), "HTML/CSS/JavaScript"),
    ("Backend", Some(0), "Python/Java/Node.js"),
    ("Mobile", Some(0), "iOS/Android/Flutter"),
    ("Data Science", None, "Data analysis and machine learning"),
    ("Machine Learning", Some(4), "ML algorithms"),
    ("Deep Learning", Some(4), "Neural networks"),
];

struct SampleCourse {
    title: &'static str,
    subtitle: &'static str,
    instructor: usize,
    category: usize,
    price: f64,
    original_price: f64,
    level: CourseLevel,
    duration_hours: f64,
    featured: bool,
    /// Chapter title and (lesson title, seconds)
    chapters: &'static [(&'static str, &'static [(&'static str, i32)])],
}

const COURSES: [SampleCourse; 5] = [
    SampleCourse {
        title: "Python Masterclass",
        subtitle: "From Zero to Hero",
        instructor: 2,
        category: 2,
        price: 199.0,
        original_price: 399.0,
        level: CourseLevel::Beginner,
        duration_hours: 42.5,
        featured: true,
        chapters: &[
            ("Python Setup", &[("Introduction to Python", 600), ("Installing Python", 480)]),
            ("Python Basics", &[("Variables and Naming", 540), ("Data Types", 900)]),
            ("Control Flow", &[("If Statements", 600)]),
        ],
    },
    SampleCourse {
        title: "Web Frontend Development",
        subtitle: "HTML+CSS+JavaScript",
        instructor: 3,
        category: 1,
        price: 299.0,
        original_price: 599.0,
        level: CourseLevel::Intermediate,
        duration_hours: 68.0,
        featured: true,
        chapters: &[("HTML Basics", &[("HTML Structure", 480)]), ("CSS Styling", &[])],
    },
    SampleCourse {
        title: "Machine Learning Fundamentals",
        subtitle: "Python for ML",
        instructor: 4,
        category: 5,
        price: 399.0,
        original_price: 799.0,
        level: CourseLevel::Intermediate,
        duration_hours: 55.5,
        featured: true,
        chapters: &[("ML Overview", &[])],
    },
    SampleCourse {
        title: "Deep Learning & Neural Networks",
        subtitle: "TensorFlow & PyTorch",
        instructor: 4,
        category: 6,
        price: 499.0,
        original_price: 999.0,
        level: CourseLevel::Advanced,
        duration_hours: 72.0,
        featured: false,
        chapters: &[],
    },
    SampleCourse {
        title: "Git Version Control",
        subtitle: "Team Collaboration Essential",
        instructor: 2,
        category: 0,
        price: 0.0,
        original_price: 0.0,
        level: CourseLevel::Beginner,
        duration_hours: 8.0,
        featured: false,
        chapters: &[("Getting Started", &[("Commits and Branches", 720)])],
    },
];

pub struct SeedService;

impl SeedService {
    /// Fills an empty database with demo content. Returns whether anything
    /// was inserted.
    pub async fn seed_if_empty(db: &DatabaseConnection) -> ServiceResult<bool> {
        if users::Entity::find().count(db).await? > 0 {
            info!("Users already present, skipping sample data");
            return Ok(false);
        }

        let mut accounts = Vec::with_capacity(USERS.len());
        for user in &USERS {
            let user_id = IdentityService::register(
                db,
                user.username,
                user.email,
                SAMPLE_PASSWORD,
                SAMPLE_PASSWORD,
            )
            .await?;
            if user.role != RoleName::Student {
                IdentityService::grant_role(db, user_id, user.role).await?;
            }
            IdentityService::update_profile(
                db,
                user_id,
                ProfileUpdate {
                    bio: user.bio.map(str::to_string),
                    occupation: user.occupation.map(str::to_string),
                    ..Default::default()
                },
            )
            .await?;

            accounts.push(AuthContext {
                user_id,
                username: user.username.to_string(),
                roles: IdentityService::roles_for_user(db, user_id).await?,
            });
        }

        let mut category_ids: Vec<i64> = Vec::with_capacity(CATEGORIES.len());
        for (index, (name, parent, description)) in CATEGORIES.iter().enumerate() {
            let category = categories::ActiveModel {
                name: Set(name.to_string()),
                parent_id: Set(parent.map(|p| category_ids[p])),
                description: Set(Some(description.to_string())),
                sort_order: Set(index as i32 + 1),
                ..Default::default()
            }
            .insert(db)
            .await?;
            category_ids.push(category.id);
        }

        let admin = &accounts[5];
        let mut course_ids = Vec::with_capacity(COURSES.len());
        let mut lesson_ids = Vec::new();

        for sample in &COURSES {
            let owner = &accounts[sample.instructor];
            let input = CourseInput {
                title: sample.title.to_string(),
                subtitle: Some(sample.subtitle.to_string()),
                description: Some(format!("{}: {}", sample.title, sample.subtitle)),
                category_id: Some(category_ids[sample.category]),
                cover_image: None,
                price: sample.price,
                original_price: Some(sample.original_price),
                level: sample.level,
                duration_hours: Some(sample.duration_hours),
                status: None,
                is_featured: None,
            };

            let course = SaveCourseService::create_course(db, owner, input.clone()).await?;

            for (chapter_title, lessons) in sample.chapters {
                let chapter = SaveCourseService::add_chapter(
                    db,
                    course.id,
                    owner,
                    ChapterInput {
                        title: chapter_title.to_string(),
                        ..Default::default()
                    },
                )
                .await?;

                for (lesson_title, seconds) in lessons.iter() {
                    let lesson = SaveCourseService::add_lesson(
                        db,
                        chapter.id,
                        owner,
                        LessonInput {
                            title: lesson_title.to_string(),
                            video_url: Some(format!("https://example.com/videos/{}.mp4", lesson_ids.len() + 1)),
                            video_duration: *seconds,
                            ..Default::default()
                        },
                    )
                    .await?;
                    lesson_ids.push((course.id, lesson.id, *seconds));
                }
            }

            // Publishing after the content exists gives enrollments a full
            // lesson count
            SaveCourseService::update_course(
                db,
                course.id,
                admin,
                CourseInput {
                    status: Some(CourseStatus::Published),
                    is_featured: Some(sample.featured),
                    ..input
                },
            )
            .await?;

            course_ids.push(course.id);
        }

        let (john, mike) = (&accounts[0], &accounts[1]);

        for (student, course) in [(john, 0), (john, 1), (mike, 2), (mike, 4)] {
            CommerceService::enroll(db, student.user_id, course_ids[course]).await?;
        }

        // John has finished the first lessons of the Python course
        for (course_id, lesson_id, seconds) in lesson_ids.iter().take(3) {
            if *course_id == course_ids[0] {
                ProgressService::record_progress(db, john.user_id, *lesson_id, *seconds).await?;
            }
        }

        EngagementService::submit_review(
            db,
            john.user_id,
            course_ids[0],
            5,
            Some("Excellent course! Very well explained.".to_string()),
        )
        .await?;
        EngagementService::submit_review(
            db,
            mike.user_id,
            course_ids[2],
            5,
            Some("Best introduction to machine learning!".to_string()),
        )
        .await?;

        for (student, course) in [(john, 2), (mike, 0), (mike, 1)] {
            EngagementService::toggle_favorite(db, student.user_id, course_ids[course]).await?;
        }

        info!(
            "Seeded {} users, {} categories and {} courses",
            accounts.len(),
            category_ids.len(),
            course_ids.len()
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        entities::{courses, enrollments},
        testing,
    };
    use models::status::{EnrollmentStatus, PaymentMethod};

    #[tokio::test]
    async fn test_seed_once() {
        let db = testing::setup_db().await;

        assert!(SeedService::seed_if_empty(&db).await.unwrap());
        assert!(!SeedService::seed_if_empty(&db).await.unwrap());

        let courses = courses::Entity::find().all(&db).await.unwrap();
        assert_eq!(courses.len(), COURSES.len());
        assert!(courses.iter().all(|c| c.status == CourseStatus::Published));
        assert!(courses.iter().all(|c| c.published_at.is_some()));

        let python = courses.iter().find(|c| c.title == "Python Masterclass").unwrap();
        assert_eq!(python.enrollment_count, 1);
        assert_eq!(python.rating_count, 1);
        assert_eq!(python.rating_avg, 5.0);
        assert!(python.is_featured);

        let johns = enrollments::Entity::find()
            .all(&db)
            .await
            .unwrap()
            .into_iter()
            .find(|e| e.course_id == python.id)
            .unwrap();
        assert_eq!(johns.total_lessons, 5);
        assert_eq!(johns.completed_lessons, 3);
        assert_eq!(johns.progress_percent, 60.0);
        assert_eq!(johns.status, EnrollmentStatus::Active);

        let admin = IdentityService::authenticate(&db, "admin@example.com", SAMPLE_PASSWORD)
            .await
            .unwrap();
        assert!(admin.context().is_admin());

        let git = courses.iter().find(|c| c.price == 0.0).unwrap();
        let receipts = CommerceService::list_enrollments(&db, admin.user.id).await.unwrap();
        assert!(receipts.is_empty());
        let receipt = CommerceService::enroll(&db, admin.user.id, git.id).await.unwrap();
        assert_eq!(receipt.order.payment_method, PaymentMethod::Free);
    }
}
