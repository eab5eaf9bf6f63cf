//! Blueprint upload entity - tracks processing of one institute archive

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Upload status enum
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl From<String> for UploadStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PENDING" => UploadStatus::Pending,
            "PROCESSING" => UploadStatus::Processing,
            "COMPLETED" => UploadStatus::Completed,
            "FAILED" => UploadStatus::Failed,
            _ => UploadStatus::Pending,
        }
    }
}

impl From<UploadStatus> for String {
    fn from(status: UploadStatus) -> Self {
        match status {
            UploadStatus::Pending => "PENDING".to_string(),
            UploadStatus::Processing => "PROCESSING".to_string(),
            UploadStatus::Completed => "COMPLETED".to_string(),
            UploadStatus::Failed => "FAILED".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "blueprint_uploads")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(nullable)]
    pub institute_id: Option<i32>,

    #[sea_orm(nullable)]
    pub uploaded_by: Option<i32>,

    #[sea_orm(column_type = "Text")]
    pub zip_path: String,

    pub status: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub completed_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Get the upload status as an enum
    pub fn upload_status(&self) -> UploadStatus {
        UploadStatus::from(self.status.clone())
    }

    /// Check if the upload is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self.upload_status(), UploadStatus::Completed | UploadStatus::Failed)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::institute::Entity",
        from = "Column::InstituteId",
        to = "super::institute::Column::Id"
    )]
    Institute,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UploadedBy",
        to = "super::user::Column::Id"
    )]
    UploadedBy,
}

impl ActiveModelBehavior for ActiveModel {}
