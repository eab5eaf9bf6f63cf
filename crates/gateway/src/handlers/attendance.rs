//! Attendance handlers

use axum::{extract::State, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::extract::{ApiJson, ApiPath};
use crate::AppState;
use acadex_common::{
    attendance::{FacultySubjectEntry, MarkAttendance},
    db::models::Attendance,
    errors::{AppError, Result},
    AttendanceService,
};

/// Request to mark one student's attendance
#[derive(Debug, Deserialize, Validate)]
pub struct MarkAttendanceRequest {
    pub student_id: i32,
    pub subject_id: i32,
    /// `YYYY-MM-DD`
    pub date: NaiveDate,
    #[validate(length(min = 1))]
    pub status: String,
    pub marked_by: i32,
}

#[derive(Serialize)]
pub struct MarkAttendanceResponse {
    pub message: String,
}

/// Attendance row as returned by every read endpoint
#[derive(Debug, Serialize)]
pub struct AttendanceRecord {
    pub id: i32,
    pub student_id: i32,
    pub subject_id: i32,
    pub date: NaiveDate,
    pub status: String,
    pub marked_by: i32,
}

impl From<Attendance> for AttendanceRecord {
    fn from(row: Attendance) -> Self {
        Self {
            id: row.id,
            student_id: row.student_id,
            subject_id: row.subject_id,
            date: row.date,
            status: row.status,
            marked_by: row.marked_by,
        }
    }
}

#[derive(Serialize)]
pub struct ClassAttendanceResponse {
    pub subject_id: i32,
    pub date: NaiveDate,
    pub total_records: usize,
    pub attendance: Vec<AttendanceRecord>,
}

#[derive(Serialize)]
pub struct StudentAttendanceResponse {
    pub student_id: i32,
    pub total_classes: usize,
    pub present: usize,
    pub attendance_percentage: f64,
    pub records: Vec<AttendanceRecord>,
}

#[derive(Serialize)]
pub struct SubjectAttendanceResponse {
    pub subject_id: i32,
    pub total_records: usize,
    pub records: Vec<AttendanceRecord>,
}

#[derive(Serialize)]
pub struct FacultySubjectsResponse {
    pub faculty_id: i32,
    pub subjects: Vec<FacultySubjectEntry>,
    pub unresolved_mappings: usize,
}

fn records(rows: Vec<Attendance>) -> Vec<AttendanceRecord> {
    rows.into_iter().map(AttendanceRecord::from).collect()
}

/// Mark or update attendance
pub async fn mark_attendance(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<MarkAttendanceRequest>,
) -> Result<Json<MarkAttendanceResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("status".to_string()),
    })?;

    let service = AttendanceService::new(state.db.clone());
    let result = service
        .mark(MarkAttendance {
            student_id: request.student_id,
            subject_id: request.subject_id,
            date: request.date,
            status: request.status,
            marked_by: request.marked_by,
        })
        .await?;

    Ok(Json(MarkAttendanceResponse {
        message: result.outcome.message().to_string(),
    }))
}

/// Attendance for one subject on one date
pub async fn class_attendance(
    State(state): State<AppState>,
    ApiPath((subject_id, date)): ApiPath<(i32, NaiveDate)>,
) -> Result<Json<ClassAttendanceResponse>> {
    let rows = AttendanceService::new(state.db.clone())
        .class_attendance(subject_id, date)
        .await?;

    Ok(Json(ClassAttendanceResponse {
        subject_id,
        date,
        total_records: rows.len(),
        attendance: records(rows),
    }))
}

/// Attendance summary for a student
pub async fn student_attendance(
    State(state): State<AppState>,
    ApiPath(student_id): ApiPath<i32>,
) -> Result<Json<StudentAttendanceResponse>> {
    let summary = AttendanceService::new(state.db.clone())
        .student_summary(student_id)
        .await?;

    Ok(Json(StudentAttendanceResponse {
        student_id: summary.student_id,
        total_classes: summary.total_classes,
        present: summary.present,
        attendance_percentage: summary.attendance_percentage,
        records: records(summary.records),
    }))
}

/// Full attendance history of a subject
pub async fn subject_attendance(
    State(state): State<AppState>,
    ApiPath(subject_id): ApiPath<i32>,
) -> Result<Json<SubjectAttendanceResponse>> {
    let rows = AttendanceService::new(state.db.clone())
        .subject_history(subject_id)
        .await?;

    Ok(Json(SubjectAttendanceResponse {
        subject_id,
        total_records: rows.len(),
        records: records(rows),
    }))
}

/// Subjects taught by a faculty member
pub async fn faculty_subjects(
    State(state): State<AppState>,
    ApiPath(faculty_id): ApiPath<i32>,
) -> Result<Json<FacultySubjectsResponse>> {
    let listing = AttendanceService::new(state.db.clone())
        .faculty_subjects(faculty_id)
        .await?;

    Ok(Json(FacultySubjectsResponse {
        faculty_id: listing.faculty_id,
        subjects: listing.subjects,
        unresolved_mappings: listing.unresolved_mappings,
    }))
}
