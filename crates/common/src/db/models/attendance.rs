//! Attendance entity
//!
//! One row per (student, subject, date), enforced by a unique index created in
//! [`crate::db::init_schema`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Attendance status values
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "PRESENT",
            AttendanceStatus::Absent => "ABSENT",
            AttendanceStatus::Late => "LATE",
            AttendanceStatus::Excused => "EXCUSED",
        }
    }

    /// Canonical stored form of a caller-supplied status: trimmed and upper-cased.
    /// Values outside the known set are kept as-is.
    pub fn normalize(raw: &str) -> String {
        raw.trim().to_uppercase()
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match Self::normalize(raw).as_str() {
            "PRESENT" => Some(AttendanceStatus::Present),
            "ABSENT" => Some(AttendanceStatus::Absent),
            "LATE" => Some(AttendanceStatus::Late),
            "EXCUSED" => Some(AttendanceStatus::Excused),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub student_id: i32,

    pub subject_id: i32,

    pub date: Date,

    pub status: String,

    /// Employee id of whoever first marked this row
    pub marked_by: i32,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn attendance_status(&self) -> Option<AttendanceStatus> {
        AttendanceStatus::parse(&self.status)
    }

    pub fn is_present(&self) -> bool {
        self.attendance_status() == Some(AttendanceStatus::Present)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id",
        on_delete = "Cascade"
    )]
    Student,

    #[sea_orm(
        belongs_to = "super::subject::Entity",
        from = "Column::SubjectId",
        to = "super::subject::Column::Id"
    )]
    Subject,

    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::MarkedBy",
        to = "super::employee::Column::Id"
    )]
    MarkedBy,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::subject::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subject.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
