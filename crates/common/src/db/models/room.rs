//! Room entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rooms")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(nullable)]
    pub institute_id: Option<i32>,

    pub name: String,

    /// CLASS / LAB / SEMINAR
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub room_type: String,

    pub capacity: i32,

    pub systems_count: i32,

    pub has_projector: bool,
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
