//! Faculty-to-subject teaching assignment
//!
//! No foreign keys: assignments may point at subjects that no longer resolve.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "faculty_subjects")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Employee id of the teaching faculty
    pub faculty_id: i32,

    pub subject_id: i32,

    pub class_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
