//! User entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Roles a user account can hold
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Student,
    Faculty,
    ExamManager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Student => "STUDENT",
            Role::Faculty => "FACULTY",
            Role::ExamManager => "EXAM_MANAGER",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(nullable)]
    pub institute_id: Option<i32>,

    pub full_name: String,

    #[sea_orm(unique)]
    pub email: String,

    #[serde(skip_serializing, default)]
    #[sea_orm(column_type = "Text", nullable)]
    pub password_hash: Option<String>,

    /// Upper-case role name, see [`Role`]
    pub role: String,

    #[sea_orm(nullable)]
    pub phone: Option<String>,

    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::institute::Entity",
        from = "Column::InstituteId",
        to = "super::institute::Column::Id",
        on_delete = "Cascade"
    )]
    Institute,
}

impl Related<super::institute::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Institute.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
