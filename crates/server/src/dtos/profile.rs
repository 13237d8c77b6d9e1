use chrono::NaiveDateTime;
use database::services::{
    commerce::EnrollmentView, engagement::FavoriteView, identity::ProfileView,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub last_login: Option<NaiveDateTime>,
    pub roles: Vec<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub gender: Option<String>,
    pub location: Option<String>,
    pub occupation: Option<String>,
}

impl From<ProfileView> for UserResponse {
    fn from(view: ProfileView) -> Self {
        let (avatar_url, bio, gender, location, occupation) = match view.profile {
            Some(p) => (p.avatar_url, p.bio, p.gender, p.location, p.occupation),
            None => Default::default(),
        };

        Self {
            id: view.user.id,
            username: view.user.username,
            email: view.user.email,
            phone: view.user.phone,
            status: view.user.status.to_string(),
            created_at: view.user.created_at,
            last_login: view.user.last_login,
            roles: view.roles.iter().map(ToString::to_string).collect(),
            avatar_url,
            bio,
            gender,
            location,
            occupation,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EnrollmentResponse {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub cover_image: Option<String>,
    pub instructor_name: Option<String>,
    pub progress_percent: f64,
    pub completed_lessons: i32,
    pub total_lessons: i32,
    pub status: String,
    pub enrolled_at: NaiveDateTime,
    pub last_accessed_at: Option<NaiveDateTime>,
}

impl From<EnrollmentView> for EnrollmentResponse {
    fn from(view: EnrollmentView) -> Self {
        let e = view.enrollment;
        Self {
            id: e.id,
            course_id: e.course_id,
            title: view.title,
            cover_image: view.cover_image,
            instructor_name: view.instructor_name,
            progress_percent: e.progress_percent,
            completed_lessons: e.completed_lessons,
            total_lessons: e.total_lessons,
            status: e.status.to_string(),
            enrolled_at: e.enrolled_at,
            last_accessed_at: e.last_accessed_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FavoriteCourseResponse {
    pub course_id: i64,
    pub title: String,
    pub cover_image: Option<String>,
    pub price: f64,
    pub instructor_name: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<FavoriteView> for FavoriteCourseResponse {
    fn from(view: FavoriteView) -> Self {
        Self {
            course_id: view.favorite.course_id,
            title: view.title,
            cover_image: view.cover_image,
            price: view.price,
            instructor_name: view.instructor_name,
            created_at: view.favorite.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user: UserResponse,
    pub enrollments: Vec<EnrollmentResponse>,
    pub favorites: Vec<FavoriteCourseResponse>,
}

/// Blank fields are cleared
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProfileForm {
    pub bio: Option<String>,
    pub location: Option<String>,
    pub occupation: Option<String>,
    pub gender: Option<String>,
}
