use crate::m20250801_create_all_tables::{
    Categories, Chapters, Courses, Enrollments, Favorites, LearningProgress, Lessons, OrderItems,
    Reviews,
};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One row per (user, course) / (user, lesson). These are what turn a
        // concurrent duplicate write into a constraint error.
        manager
            .create_index(
                Index::create()
                    .name("idx_enrollments_user_course")
                    .table(Enrollments::Table)
                    .col(Enrollments::UserId)
                    .col(Enrollments::CourseId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_learning_progress_user_lesson")
                    .table(LearningProgress::Table)
                    .col(LearningProgress::UserId)
                    .col(LearningProgress::LessonId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reviews_user_course")
                    .table(Reviews::Table)
                    .col(Reviews::UserId)
                    .col(Reviews::CourseId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_favorites_user_course")
                    .table(Favorites::Table)
                    .col(Favorites::UserId)
                    .col(Favorites::CourseId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index on courses for the catalog listing
        manager
            .create_index(
                Index::create()
                    .name("idx_courses_status_published_at")
                    .table(Courses::Table)
                    .col(Courses::Status)
                    .col(Courses::PublishedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_courses_category_id")
                    .table(Courses::Table)
                    .col(Courses::CategoryId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_courses_instructor_id")
                    .table(Courses::Table)
                    .col(Courses::InstructorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_categories_parent_id")
                    .table(Categories::Table)
                    .col(Categories::ParentId)
                    .to_owned(),
            )
            .await?;

        // Indexes for walking course -> chapter -> lesson
        manager
            .create_index(
                Index::create()
                    .name("idx_chapters_course_id")
                    .table(Chapters::Table)
                    .col(Chapters::CourseId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_lessons_chapter_id")
                    .table(Lessons::Table)
                    .col(Lessons::ChapterId)
                    .to_owned(),
            )
            .await?;

        // Indexes for the aggregate refreshes
        manager
            .create_index(
                Index::create()
                    .name("idx_enrollments_course_id")
                    .table(Enrollments::Table)
                    .col(Enrollments::CourseId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reviews_course_id")
                    .table(Reviews::Table)
                    .col(Reviews::CourseId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_order_items_order_id")
                    .table(OrderItems::Table)
                    .col(OrderItems::OrderId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let indexes = [
            "idx_enrollments_user_course",
            "idx_learning_progress_user_lesson",
            "idx_reviews_user_course",
            "idx_favorites_user_course",
            "idx_courses_status_published_at",
            "idx_courses_category_id",
            "idx_courses_instructor_id",
            "idx_categories_parent_id",
            "idx_chapters_course_id",
            "idx_lessons_chapter_id",
            "idx_enrollments_course_id",
            "idx_reviews_course_id",
            "idx_order_items_order_id",
        ];

        for name in indexes {
            manager
                .drop_index(Index::drop().name(name).to_owned())
                .await?;
        }

        Ok(())
    }
}
