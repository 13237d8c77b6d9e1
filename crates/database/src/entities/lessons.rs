use models::status::ContentType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lessons")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub chapter_id: i64,
    pub title: String,
    pub content_type: ContentType,
    pub video_url: Option<String>,
    /// Length of the video in seconds
    pub video_duration: i32,
    pub sort_order: i32,
    pub is_free: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::chapters::Entity",
        from = "Column::ChapterId",
        to = "super::chapters::Column::Id"
    )]
    Chapter,
    #[sea_orm(has_many = "super::learning_progress::Entity")]
    LearningProgress,
}

impl Related<super::chapters::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chapter.def()
    }
}

impl Related<super::learning_progress::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LearningProgress.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
