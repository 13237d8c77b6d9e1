use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::Phone).string())
                    .col(
                        ColumnDef::new(Users::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Users::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(Users::LastLogin).date_time())
                    .to_owned(),
            )
            .await?;

        // Create user_profiles table (one row per user)
        manager
            .create_table(
                Table::create()
                    .table(UserProfiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserProfiles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserProfiles::UserId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(UserProfiles::AvatarUrl).string())
                    .col(ColumnDef::new(UserProfiles::Bio).text())
                    .col(ColumnDef::new(UserProfiles::Gender).string())
                    .col(ColumnDef::new(UserProfiles::Location).string())
                    .col(ColumnDef::new(UserProfiles::Occupation).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-user_profiles-user_id")
                            .from(UserProfiles::Table, UserProfiles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create roles table
        manager
            .create_table(
                Table::create()
                    .table(Roles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Roles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Roles::Name).string().not_null().unique_key())
                    .col(ColumnDef::new(Roles::Description).string())
                    .to_owned(),
            )
            .await?;

        // Create user_roles junction table (many-to-many)
        manager
            .create_table(
                Table::create()
                    .table(UserRoles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserRoles::UserId).integer().not_null())
                    .col(ColumnDef::new(UserRoles::RoleId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(UserRoles::UserId)
                            .col(UserRoles::RoleId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-user_roles-user_id")
                            .from(UserRoles::Table, UserRoles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-user_roles-role_id")
                            .from(UserRoles::Table, UserRoles::RoleId)
                            .to(Roles::Table, Roles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create categories table (self-referencing tree)
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::Name).string().not_null())
                    .col(ColumnDef::new(Categories::ParentId).integer())
                    .col(ColumnDef::new(Categories::Description).text())
                    .col(
                        ColumnDef::new(Categories::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-categories-parent_id")
                            .from(Categories::Table, Categories::ParentId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Create courses table
        manager
            .create_table(
                Table::create()
                    .table(Courses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Courses::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Courses::Title).string().not_null())
                    .col(ColumnDef::new(Courses::Subtitle).string())
                    .col(ColumnDef::new(Courses::Description).text())
                    .col(ColumnDef::new(Courses::InstructorId).integer().not_null())
                    .col(ColumnDef::new(Courses::CategoryId).integer())
                    .col(ColumnDef::new(Courses::CoverImage).string())
                    .col(
                        ColumnDef::new(Courses::Price)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Courses::OriginalPrice).double())
                    .col(
                        ColumnDef::new(Courses::Level)
                            .string()
                            .not_null()
                            .default("beginner"),
                    )
                    .col(
                        ColumnDef::new(Courses::DurationHours)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Courses::Status)
                            .string()
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(Courses::IsFeatured)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    // Derived from enrollments and reviews, never written directly
                    .col(
                        ColumnDef::new(Courses::EnrollmentCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Courses::RatingAvg)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Courses::RatingCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Courses::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(Courses::PublishedAt).date_time())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-courses-instructor_id")
                            .from(Courses::Table, Courses::InstructorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-courses-category_id")
                            .from(Courses::Table, Courses::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Create chapters table
        manager
            .create_table(
                Table::create()
                    .table(Chapters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Chapters::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Chapters::CourseId).integer().not_null())
                    .col(ColumnDef::new(Chapters::Title).string().not_null())
                    .col(ColumnDef::new(Chapters::Description).text())
                    .col(
                        ColumnDef::new(Chapters::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Chapters::IsFree)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-chapters-course_id")
                            .from(Chapters::Table, Chapters::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create lessons table
        manager
            .create_table(
                Table::create()
                    .table(Lessons::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Lessons::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Lessons::ChapterId).integer().not_null())
                    .col(ColumnDef::new(Lessons::Title).string().not_null())
                    .col(
                        ColumnDef::new(Lessons::ContentType)
                            .string()
                            .not_null()
                            .default("video"),
                    )
                    .col(ColumnDef::new(Lessons::VideoUrl).string())
                    .col(
                        ColumnDef::new(Lessons::VideoDuration)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Lessons::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Lessons::IsFree)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-lessons-chapter_id")
                            .from(Lessons::Table, Lessons::ChapterId)
                            .to(Chapters::Table, Chapters::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create orders table
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Orders::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Orders::OrderNo).string().not_null().unique_key())
                    .col(ColumnDef::new(Orders::UserId).integer().not_null())
                    .col(ColumnDef::new(Orders::TotalAmount).double().not_null())
                    .col(
                        ColumnDef::new(Orders::DiscountAmount)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Orders::FinalAmount).double().not_null())
                    .col(
                        ColumnDef::new(Orders::PaymentMethod)
                            .string()
                            .not_null()
                            .default("alipay"),
                    )
                    .col(
                        ColumnDef::new(Orders::PaymentStatus)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Orders::PaidAt).date_time())
                    .col(ColumnDef::new(Orders::CreatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-orders-user_id")
                            .from(Orders::Table, Orders::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create order_items table
        manager
            .create_table(
                Table::create()
                    .table(OrderItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderItems::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderItems::OrderId).integer().not_null())
                    .col(ColumnDef::new(OrderItems::CourseId).integer().not_null())
                    .col(ColumnDef::new(OrderItems::Price).double().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-order_items-order_id")
                            .from(OrderItems::Table, OrderItems::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-order_items-course_id")
                            .from(OrderItems::Table, OrderItems::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Create enrollments table. Courses with enrollments cannot be
        // deleted, so the course reference restricts instead of cascading.
        manager
            .create_table(
                Table::create()
                    .table(Enrollments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Enrollments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Enrollments::UserId).integer().not_null())
                    .col(ColumnDef::new(Enrollments::CourseId).integer().not_null())
                    .col(ColumnDef::new(Enrollments::OrderId).integer())
                    .col(
                        ColumnDef::new(Enrollments::ProgressPercent)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Enrollments::CompletedLessons)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Enrollments::TotalLessons)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Enrollments::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Enrollments::EnrolledAt)
                            .date_time()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Enrollments::LastAccessedAt).date_time())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-enrollments-user_id")
                            .from(Enrollments::Table, Enrollments::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-enrollments-course_id")
                            .from(Enrollments::Table, Enrollments::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-enrollments-order_id")
                            .from(Enrollments::Table, Enrollments::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Create learning_progress table
        manager
            .create_table(
                Table::create()
                    .table(LearningProgress::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LearningProgress::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LearningProgress::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(LearningProgress::LessonId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LearningProgress::WatchedDuration)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LearningProgress::ProgressPercent)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(LearningProgress::IsCompleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(LearningProgress::UpdatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-learning_progress-user_id")
                            .from(LearningProgress::Table, LearningProgress::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-learning_progress-lesson_id")
                            .from(LearningProgress::Table, LearningProgress::LessonId)
                            .to(Lessons::Table, Lessons::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create reviews table
        manager
            .create_table(
                Table::create()
                    .table(Reviews::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reviews::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Reviews::UserId).integer().not_null())
                    .col(ColumnDef::new(Reviews::CourseId).integer().not_null())
                    .col(ColumnDef::new(Reviews::Rating).integer().not_null())
                    .col(ColumnDef::new(Reviews::Content).text())
                    .col(
                        ColumnDef::new(Reviews::HelpfulCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Reviews::Status)
                            .string()
                            .not_null()
                            .default("approved"),
                    )
                    .col(ColumnDef::new(Reviews::CreatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-reviews-user_id")
                            .from(Reviews::Table, Reviews::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-reviews-course_id")
                            .from(Reviews::Table, Reviews::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create favorites table
        manager
            .create_table(
                Table::create()
                    .table(Favorites::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Favorites::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Favorites::UserId).integer().not_null())
                    .col(ColumnDef::new(Favorites::CourseId).integer().not_null())
                    .col(ColumnDef::new(Favorites::CreatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-favorites-user_id")
                            .from(Favorites::Table, Favorites::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-favorites-course_id")
                            .from(Favorites::Table, Favorites::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order due to foreign key constraints
        manager
            .drop_table(Table::drop().table(Favorites::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Reviews::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(LearningProgress::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Enrollments::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(OrderItems::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Lessons::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Chapters::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Courses::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(UserRoles::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Roles::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(UserProfiles::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
pub(crate) enum Users {
    Table,
    Id,
    Username,
    Email,
    PasswordHash,
    Phone,
    Status,
    CreatedAt,
    LastLogin,
}

#[derive(Iden)]
enum UserProfiles {
    Table,
    Id,
    UserId,
    AvatarUrl,
    Bio,
    Gender,
    Location,
    Occupation,
}

#[derive(Iden)]
pub(crate) enum Roles {
    Table,
    Id,
    Name,
    Description,
}

#[derive(Iden)]
enum UserRoles {
    Table,
    UserId,
    RoleId,
}

#[derive(Iden)]
pub(crate) enum Categories {
    Table,
    Id,
    Name,
    ParentId,
    Description,
    SortOrder,
}

#[derive(Iden)]
pub(crate) enum Courses {
    Table,
    Id,
    Title,
    Subtitle,
    Description,
    InstructorId,
    CategoryId,
    CoverImage,
    Price,
    OriginalPrice,
    Level,
    DurationHours,
    Status,
    IsFeatured,
    EnrollmentCount,
    RatingAvg,
    RatingCount,
    CreatedAt,
    PublishedAt,
}

#[derive(Iden)]
pub(crate) enum Chapters {
    Table,
    Id,
    CourseId,
    Title,
    Description,
    SortOrder,
    IsFree,
}

#[derive(Iden)]
pub(crate) enum Lessons {
    Table,
    Id,
    ChapterId,
    Title,
    ContentType,
    VideoUrl,
    VideoDuration,
    SortOrder,
    IsFree,
}

#[derive(Iden)]
pub(crate) enum Orders {
    Table,
    Id,
    OrderNo,
    UserId,
    TotalAmount,
    DiscountAmount,
    FinalAmount,
    PaymentMethod,
    PaymentStatus,
    PaidAt,
    CreatedAt,
}

#[derive(Iden)]
pub(crate) enum OrderItems {
    Table,
    Id,
    OrderId,
    CourseId,
    Price,
}

#[derive(Iden)]
pub(crate) enum Enrollments {
    Table,
    Id,
    UserId,
    CourseId,
    OrderId,
    ProgressPercent,
    CompletedLessons,
    TotalLessons,
    Status,
    EnrolledAt,
    LastAccessedAt,
}

#[derive(Iden)]
pub(crate) enum LearningProgress {
    Table,
    Id,
    UserId,
    LessonId,
    WatchedDuration,
    ProgressPercent,
    IsCompleted,
    UpdatedAt,
}

#[derive(Iden)]
pub(crate) enum Reviews {
    Table,
    Id,
    UserId,
    CourseId,
    Rating,
    Content,
    HelpfulCount,
    Status,
    CreatedAt,
}

#[derive(Iden)]
pub(crate) enum Favorites {
    Table,
    Id,
    UserId,
    CourseId,
    CreatedAt,
}
