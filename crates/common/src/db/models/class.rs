//! Class (department + semester + section) entity
//!
//! Membership is implied by matching the student's department/semester/section.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "classes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(nullable)]
    pub institute_id: Option<i32>,

    pub department: String,

    pub semester: i32,

    pub section: String,

    pub capacity: i32,
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

impl ActiveModelBehavior for ActiveModel {}
