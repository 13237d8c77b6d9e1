use crate::{
    entities::{categories, chapters, courses, enrollments, favorites, lessons, reviews, user_profiles, users},
    error::{ServiceError, ServiceResult},
    services::identity::IdentityService,
};
use models::{
    auth::{AuthContext, CATALOG_EDITORS},
    course_query::{CourseFilter, CourseSort},
    status::{CourseStatus, ReviewStatus},
};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select,
};
use serde::Serialize;
use std::collections::HashMap;

/// Number of featured courses on the home page
const FEATURED_LIMIT: u64 = 6;
/// Number of recently created courses on the home page
const LATEST_LIMIT: u64 = 12;
/// Number of reviews shown on a course page
const REVIEW_LIMIT: u64 = 10;

/// A course as it appears in listings
#[derive(Debug, Clone, Serialize)]
pub struct CourseSummary {
    #[serde(flatten)]
    pub course: courses::Model,
    pub instructor_name: Option<String>,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChapterOutline {
    pub chapter: chapters::Model,
    pub lessons: Vec<lessons::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    #[serde(flatten)]
    pub review: reviews::Model,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseDetail {
    pub course: CourseSummary,
    pub instructor_bio: Option<String>,
    pub chapters: Vec<ChapterOutline>,
    pub reviews: Vec<ReviewView>,
    pub is_enrolled: bool,
    pub is_favorited: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HomePage {
    pub featured_courses: Vec<CourseSummary>,
    pub latest_courses: Vec<CourseSummary>,
    pub categories: Vec<categories::Model>,
}

pub struct QueryCourseService;

impl QueryCourseService {
    /// Published courses matching the filter, in the requested order.
    /// Ties are broken by id, newest first.
    pub async fn list_published_courses(
        db: &DatabaseConnection,
        filter: &CourseFilter,
    ) -> Result<Vec<CourseSummary>, DbErr> {
        let mut condition =
            Condition::all().add(courses::Column::Status.eq(CourseStatus::Published));

        // A category also matches the courses filed under its direct children
        if let Some(category_id) = filter.category_id {
            let mut category_ids = categories::Entity::find()
                .select_only()
                .column(categories::Column::Id)
                .filter(categories::Column::ParentId.eq(category_id))
                .into_tuple::<i64>()
                .all(db)
                .await?;
            category_ids.push(category_id);

            condition = condition.add(courses::Column::CategoryId.is_in(category_ids));
        }

        if let Some(level) = filter.level {
            condition = condition.add(courses::Column::Level.eq(level));
        }

        if let Some(keyword) = filter.keyword() {
            condition = condition.add(
                Condition::any()
                    .add(courses::Column::Title.contains(keyword))
                    .add(courses::Column::Description.contains(keyword)),
            );
        }

        let query = Self::apply_sort(courses::Entity::find().filter(condition), filter.sort)
            .order_by_desc(courses::Column::Id);

        let courses = query.all(db).await?;
        Self::summarize(db, courses).await
    }

    fn apply_sort(query: Select<courses::Entity>, sort: CourseSort) -> Select<courses::Entity> {
        match sort {
            CourseSort::Newest => query.order_by_desc(courses::Column::PublishedAt),
            CourseSort::Popular => query.order_by_desc(courses::Column::EnrollmentCount),
            CourseSort::Rating => query.order_by_desc(courses::Column::RatingAvg),
            CourseSort::PriceLow => query.order_by_asc(courses::Column::Price),
            CourseSort::PriceHigh => query.order_by_desc(courses::Column::Price),
        }
    }

    /// Attaches instructor and category names to a list of courses,
    /// keeping the input order
    pub async fn summarize<C: ConnectionTrait>(
        conn: &C,
        courses: Vec<courses::Model>,
    ) -> Result<Vec<CourseSummary>, DbErr> {
        if courses.is_empty() {
            return Ok(vec![]);
        }

        let instructor_ids: Vec<i64> = courses.iter().map(|c| c.instructor_id).collect();
        let category_ids: Vec<i64> = courses.iter().filter_map(|c| c.category_id).collect();

        // Batch fetch the names and build lookup maps
        let instructor_names: HashMap<i64, String> = users::Entity::find()
            .filter(users::Column::Id.is_in(instructor_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|user| (user.id, user.username))
            .collect();

        let category_names: HashMap<i64, String> = if category_ids.is_empty() {
            HashMap::new()
        } else {
            categories::Entity::find()
                .filter(categories::Column::Id.is_in(category_ids))
                .all(conn)
                .await?
                .into_iter()
                .map(|category| (category.id, category.name))
                .collect()
        };

        let summaries = courses
            .into_iter()
            .map(|course| CourseSummary {
                instructor_name: instructor_names.get(&course.instructor_id).cloned(),
                category_name: course
                    .category_id
                    .and_then(|id| category_names.get(&id).cloned()),
                course,
            })
            .collect();

        Ok(summaries)
    }

    /// Chapters of a course with their lessons, both ordered by
    /// (sort_order, id)
    pub async fn course_outline<C: ConnectionTrait>(
        conn: &C,
        course_id: i64,
    ) -> Result<Vec<ChapterOutline>, DbErr> {
        let chapters = chapters::Entity::find()
            .filter(chapters::Column::CourseId.eq(course_id))
            .order_by_asc(chapters::Column::SortOrder)
            .order_by_asc(chapters::Column::Id)
            .all(conn)
            .await?;

        if chapters.is_empty() {
            return Ok(vec![]);
        }

        let chapter_ids: Vec<i64> = chapters.iter().map(|c| c.id).collect();

        let lessons = lessons::Entity::find()
            .filter(lessons::Column::ChapterId.is_in(chapter_ids))
            .order_by_asc(lessons::Column::SortOrder)
            .order_by_asc(lessons::Column::Id)
            .all(conn)
            .await?;

        let mut lessons_by_chapter: HashMap<i64, Vec<lessons::Model>> = HashMap::new();
        for lesson in lessons {
            lessons_by_chapter
                .entry(lesson.chapter_id)
                .or_default()
                .push(lesson);
        }

        let outline = chapters
            .into_iter()
            .map(|chapter| ChapterOutline {
                lessons: lessons_by_chapter.remove(&chapter.id).unwrap_or_default(),
                chapter,
            })
            .collect();

        Ok(outline)
    }

    /// Everything shown on a course page. `viewer_id` is the signed-in
    /// user, if any.
    pub async fn get_course_detail(
        db: &DatabaseConnection,
        course_id: i64,
        viewer_id: Option<i64>,
    ) -> ServiceResult<CourseDetail> {
        let course = courses::Entity::find_by_id(course_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Course not found"))?;

        let instructor_bio = user_profiles::Entity::find()
            .filter(user_profiles::Column::UserId.eq(course.instructor_id))
            .one(db)
            .await?
            .and_then(|profile| profile.bio);

        let chapters = Self::course_outline(db, course_id).await?;

        let reviews = reviews::Entity::find()
            .filter(reviews::Column::CourseId.eq(course_id))
            .filter(reviews::Column::Status.eq(ReviewStatus::Approved))
            .order_by_desc(reviews::Column::CreatedAt)
            .order_by_desc(reviews::Column::Id)
            .limit(REVIEW_LIMIT)
            .find_also_related(users::Entity)
            .all(db)
            .await?
            .into_iter()
            .map(|(review, user)| ReviewView {
                review,
                username: user.map(|u| u.username),
            })
            .collect();

        let (is_enrolled, is_favorited) = match viewer_id {
            Some(user_id) => {
                let enrolled = enrollments::Entity::find()
                    .filter(enrollments::Column::UserId.eq(user_id))
                    .filter(enrollments::Column::CourseId.eq(course_id))
                    .count(db)
                    .await?
                    > 0;
                let favorited = favorites::Entity::find()
                    .filter(favorites::Column::UserId.eq(user_id))
                    .filter(favorites::Column::CourseId.eq(course_id))
                    .count(db)
                    .await?
                    > 0;
                (enrolled, favorited)
            }
            None => (false, false),
        };

        let course = Self::summarize(db, vec![course])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::not_found("Course not found"))?;

        Ok(CourseDetail {
            course,
            instructor_bio,
            chapters,
            reviews,
            is_enrolled,
            is_favorited,
        })
    }

    pub async fn home(db: &DatabaseConnection) -> Result<HomePage, DbErr> {
        let featured = courses::Entity::find()
            .filter(courses::Column::Status.eq(CourseStatus::Published))
            .filter(courses::Column::IsFeatured.eq(true))
            .order_by_desc(courses::Column::EnrollmentCount)
            .order_by_desc(courses::Column::Id)
            .limit(FEATURED_LIMIT)
            .all(db)
            .await?;

        let latest = courses::Entity::find()
            .filter(courses::Column::Status.eq(CourseStatus::Published))
            .order_by_desc(courses::Column::CreatedAt)
            .order_by_desc(courses::Column::Id)
            .limit(LATEST_LIMIT)
            .all(db)
            .await?;

        let categories = categories::Entity::find()
            .filter(categories::Column::ParentId.is_null())
            .order_by_asc(categories::Column::SortOrder)
            .order_by_asc(categories::Column::Id)
            .all(db)
            .await?;

        Ok(HomePage {
            featured_courses: Self::summarize(db, featured).await?,
            latest_courses: Self::summarize(db, latest).await?,
            categories,
        })
    }

    /// All categories, top-level first, then by sort order
    pub async fn list_categories(db: &DatabaseConnection) -> Result<Vec<categories::Model>, DbErr> {
        categories::Entity::find()
            .order_by_asc(categories::Column::ParentId)
            .order_by_asc(categories::Column::SortOrder)
            .order_by_asc(categories::Column::Id)
            .all(db)
            .await
    }

    /// Courses an instructor may manage, newest first. Admins see every
    /// course, drafts included.
    pub async fn admin_list_courses(
        db: &DatabaseConnection,
        actor: &AuthContext,
    ) -> ServiceResult<Vec<CourseSummary>> {
        IdentityService::require_any_role(actor, &CATALOG_EDITORS)?;

        let mut query = courses::Entity::find();
        if !actor.is_admin() {
            query = query.filter(courses::Column::InstructorId.eq(actor.user_id));
        }

        let courses = query
            .order_by_desc(courses::Column::CreatedAt)
            .order_by_desc(courses::Column::Id)
            .all(db)
            .await?;

        Ok(Self::summarize(db, courses).await?)
    }
}
