//! Attendance service
//!
//! Marking is an upsert on (student, subject, date) inside one transaction;
//! the read side is plain filtered scans plus the present-percentage summary.

use crate::db::models::{Attendance, AttendanceStatus};
use crate::db::{DbPool, Repository};
use crate::errors::{AppError, Result};
use crate::metrics;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, instrument, warn};

/// A request to mark one student for one subject on one date
#[derive(Debug, Clone)]
pub struct MarkAttendance {
    pub student_id: i32,
    pub subject_id: i32,
    pub date: NaiveDate,
    pub status: String,
    pub marked_by: i32,
}

/// Whether a mark created a new row or overwrote an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    Marked,
    Updated,
}

impl MarkOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            MarkOutcome::Marked => "Attendance marked successfully",
            MarkOutcome::Updated => "Attendance updated successfully",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            MarkOutcome::Marked => "marked",
            MarkOutcome::Updated => "updated",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MarkResult {
    pub outcome: MarkOutcome,
    pub record: Attendance,
}

#[derive(Debug, Clone)]
pub struct StudentSummary {
    pub student_id: i32,
    pub total_classes: usize,
    pub present: usize,
    pub attendance_percentage: f64,
    pub records: Vec<Attendance>,
}

/// One resolved teaching assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacultySubjectEntry {
    pub subject_id: i32,
    pub subject_name: String,
    pub subject_code: String,
    pub class_id: i32,
}

#[derive(Debug, Clone)]
pub struct FacultySubjects {
    pub faculty_id: i32,
    pub subjects: Vec<FacultySubjectEntry>,
    /// Assignments whose subject could not be found
    pub unresolved_mappings: usize,
}

/// Present share of `total` as a percentage rounded to two decimals, ties to
/// even; 0 when there are no records.
pub fn attendance_percentage(present: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let ratio = present as f64 / total as f64 * 100.0;
    (ratio * 100.0).round_ties_even() / 100.0
}

#[derive(Clone)]
pub struct AttendanceService {
    pool: DbPool,
}

impl AttendanceService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Mark attendance, creating the row or overwriting its status.
    ///
    /// References are checked in order student, faculty, subject; the first
    /// missing one fails with `NotFound`.
    #[instrument(skip(self, request), fields(
        student_id = request.student_id,
        subject_id = request.subject_id,
        date = %request.date,
    ))]
    pub async fn mark(&self, request: MarkAttendance) -> Result<MarkResult> {
        let txn = self.pool.begin().await?;
        let repo = Repository::new(&txn);

        repo.find_student_by_id(request.student_id)
            .await?
            .ok_or_else(|| AppError::not_found("Student"))?;

        repo.find_employee_by_id(request.marked_by)
            .await?
            .ok_or_else(|| AppError::not_found("Faculty"))?;

        repo.find_subject_by_id(request.subject_id)
            .await?
            .ok_or_else(|| AppError::not_found("Subject"))?;

        let status = AttendanceStatus::normalize(&request.status);
        if status.is_empty() {
            return Err(AppError::Validation {
                message: "status must not be empty".to_string(),
                field: Some("status".to_string()),
            });
        }

        let existed = repo
            .find_attendance(request.student_id, request.subject_id, request.date)
            .await?
            .is_some();

        let record = repo
            .upsert_attendance(
                request.student_id,
                request.subject_id,
                request.date,
                &status,
                request.marked_by,
            )
            .await?;

        txn.commit().await?;

        let outcome = if existed { MarkOutcome::Updated } else { MarkOutcome::Marked };
        metrics::record_attendance_mark(outcome.label());

        info!(attendance_id = record.id, status = %record.status, outcome = outcome.label(), "Attendance recorded");

        Ok(MarkResult { outcome, record })
    }

    /// All rows for one subject on one date
    pub async fn class_attendance(&self, subject_id: i32, date: NaiveDate) -> Result<Vec<Attendance>> {
        Repository::new(self.pool.conn())
            .attendance_for_class(subject_id, date)
            .await
    }

    /// Every row for a student with the present count and percentage
    pub async fn student_summary(&self, student_id: i32) -> Result<StudentSummary> {
        let records = Repository::new(self.pool.conn())
            .attendance_for_student(student_id)
            .await?;

        let total_classes = records.len();
        let present = records.iter().filter(|r| r.is_present()).count();

        Ok(StudentSummary {
            student_id,
            total_classes,
            present,
            attendance_percentage: attendance_percentage(present, total_classes),
            records,
        })
    }

    /// Full history of a subject
    pub async fn subject_history(&self, subject_id: i32) -> Result<Vec<Attendance>> {
        Repository::new(self.pool.conn())
            .attendance_for_subject(subject_id)
            .await
    }

    /// Subjects a faculty member teaches. Assignments whose subject is gone are
    /// left out of `subjects` and counted in `unresolved_mappings`.
    pub async fn faculty_subjects(&self, faculty_id: i32) -> Result<FacultySubjects> {
        let repo = Repository::new(self.pool.conn());
        let mappings = repo.faculty_subjects(faculty_id).await?;

        let mut subjects = Vec::with_capacity(mappings.len());
        let mut unresolved_mappings = 0;

        for mapping in mappings {
            match repo.find_subject_by_id(mapping.subject_id).await? {
                Some(subject) => subjects.push(FacultySubjectEntry {
                    subject_id: subject.id,
                    subject_name: subject.name,
                    subject_code: subject.code,
                    class_id: mapping.class_id,
                }),
                None => {
                    warn!(
                        faculty_id,
                        mapping_id = mapping.id,
                        subject_id = mapping.subject_id,
                        "Faculty subject mapping points at a missing subject"
                    );
                    unresolved_mappings += 1;
                }
            }
        }

        Ok(FacultySubjects {
            faculty_id,
            subjects,
            unresolved_mappings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::AttendanceEntity;
    use crate::db::{NewInstitute, StudentProfile};
    use crate::db::test_pool;
    use sea_orm::{EntityTrait, PaginatorTrait};

    struct Fixture {
        service: AttendanceService,
        pool: DbPool,
        student_id: i32,
        faculty_id: i32,
        subject_id: i32,
    }

    async fn fixture() -> Fixture {
        let pool = test_pool().await;
        let repo = Repository::new(pool.conn());

        let institute = repo
            .find_or_create_institute(NewInstitute {
                name: "North Campus".into(),
                code: "NC01".into(),
                ..Default::default()
            })
            .await
            .unwrap()
            .row;
        let teacher = repo
            .find_or_create_user(institute.id, "Asha Rao", "asha@nc.edu", "FACULTY")
            .await
            .unwrap()
            .row;
        let pupil = repo
            .find_or_create_user(institute.id, "Ravi Kumar", "ravi@nc.edu", "STUDENT")
            .await
            .unwrap()
            .row;
        let faculty = repo
            .upsert_employee(teacher.id, institute.id, Some("CSE".into()), None)
            .await
            .unwrap();
        let student = repo
            .upsert_student(pupil.id, institute.id, StudentProfile {
                reg_no: "NC-2024-001".into(),
                semester: Some(3),
                ..Default::default()
            })
            .await
            .unwrap();
        let subject = repo
            .create_subject(Some(institute.id), "Operating Systems", "CS302")
            .await
            .unwrap();

        Fixture {
            service: AttendanceService::new(pool.clone()),
            pool,
            student_id: student.id,
            faculty_id: faculty.id,
            subject_id: subject.id,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, d).unwrap()
    }

    fn request(f: &Fixture, date: NaiveDate, status: &str) -> MarkAttendance {
        MarkAttendance {
            student_id: f.student_id,
            subject_id: f.subject_id,
            date,
            status: status.to_string(),
            marked_by: f.faculty_id,
        }
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(attendance_percentage(0, 0), 0.0);
        assert_eq!(attendance_percentage(3, 4), 75.0);
        assert_eq!(attendance_percentage(1, 3), 33.33);
        assert_eq!(attendance_percentage(2, 3), 66.67);
        // 3.125 sits exactly on the tie
        assert_eq!(attendance_percentage(1, 32), 3.12);
        assert_eq!(attendance_percentage(3, 32), 9.38);
    }

    #[tokio::test]
    async fn test_first_mark_creates_upper_cased_row() {
        let f = fixture().await;

        let result = f.service.mark(request(&f, day(2), "present")).await.unwrap();

        assert_eq!(result.outcome, MarkOutcome::Marked);
        assert_eq!(result.outcome.message(), "Attendance marked successfully");
        assert_eq!(result.record.status, "PRESENT");
        assert_eq!(AttendanceEntity::find().count(f.pool.conn()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_second_mark_updates_in_place() {
        let f = fixture().await;

        f.service.mark(request(&f, day(2), "PRESENT")).await.unwrap();
        let result = f.service.mark(request(&f, day(2), "absent")).await.unwrap();

        assert_eq!(result.outcome, MarkOutcome::Updated);
        assert_eq!(result.outcome.message(), "Attendance updated successfully");
        assert_eq!(result.record.status, "ABSENT");

        let rows = f.service.class_attendance(f.subject_id, day(2)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "ABSENT");
    }

    #[tokio::test]
    async fn test_missing_references_are_reported_in_order() {
        let f = fixture().await;

        let mut bad = request(&f, day(2), "PRESENT");
        bad.student_id = 9999;
        bad.subject_id = 9999;
        let err = f.service.mark(bad).await.unwrap_err();
        assert_eq!(err.to_string(), "Student not found");

        let mut bad = request(&f, day(2), "PRESENT");
        bad.marked_by = 9999;
        let err = f.service.mark(bad).await.unwrap_err();
        assert_eq!(err.to_string(), "Faculty not found");

        let mut bad = request(&f, day(2), "PRESENT");
        bad.subject_id = 9999;
        let err = f.service.mark(bad).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { ref resource } if resource == "Subject"));

        assert_eq!(AttendanceEntity::find().count(f.pool.conn()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_status_is_rejected() {
        let f = fixture().await;

        let err = f.service.mark(request(&f, day(2), "  ")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_summary_without_records_is_zero() {
        let f = fixture().await;

        let summary = f.service.student_summary(f.student_id).await.unwrap();
        assert_eq!(summary.total_classes, 0);
        assert_eq!(summary.present, 0);
        assert_eq!(summary.attendance_percentage, 0.0);
        assert!(summary.records.is_empty());
    }

    #[tokio::test]
    async fn test_summary_percentage() {
        let f = fixture().await;

        f.service.mark(request(&f, day(2), "PRESENT")).await.unwrap();
        f.service.mark(request(&f, day(3), "PRESENT")).await.unwrap();
        f.service.mark(request(&f, day(4), "ABSENT")).await.unwrap();
        f.service.mark(request(&f, day(5), "ABSENT")).await.unwrap();
        // Lower-case update still counts as present
        f.service.mark(request(&f, day(5), "present")).await.unwrap();
        f.service.mark(request(&f, day(6), "ABSENT")).await.unwrap();

        let summary = f.service.student_summary(f.student_id).await.unwrap();
        assert_eq!(summary.total_classes, 5);
        assert_eq!(summary.present, 3);
        assert_eq!(summary.attendance_percentage, 60.0);

        // Drop the last day back to 3 of 4
        let repo = Repository::new(f.pool.conn());
        let extra = repo.find_attendance(f.student_id, f.subject_id, day(6)).await.unwrap().unwrap();
        AttendanceEntity::delete_by_id(extra.id).exec(f.pool.conn()).await.unwrap();

        let summary = f.service.student_summary(f.student_id).await.unwrap();
        assert_eq!(summary.attendance_percentage, 75.0);
    }

    #[tokio::test]
    async fn test_subject_history_spans_dates() {
        let f = fixture().await;

        f.service.mark(request(&f, day(2), "PRESENT")).await.unwrap();
        f.service.mark(request(&f, day(9), "LATE")).await.unwrap();

        let history = f.service.subject_history(f.subject_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].date, day(2));
        assert_eq!(history[1].status, "LATE");

        assert!(f.service.class_attendance(f.subject_id, day(3)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_interleaved_marks_leave_one_row() {
        let f = fixture().await;

        let (a, b) = tokio::join!(
            f.service.mark(request(&f, day(2), "PRESENT")),
            f.service.mark(request(&f, day(2), "ABSENT")),
        );
        a.unwrap();
        b.unwrap();

        let rows = f.service.class_attendance(f.subject_id, day(2)).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_faculty_subjects_skip_unresolved() {
        let f = fixture().await;
        let repo = Repository::new(f.pool.conn());

        repo.assign_faculty_subject(f.faculty_id, f.subject_id, 11).await.unwrap();
        repo.assign_faculty_subject(f.faculty_id, 4242, 12).await.unwrap();

        let listing = f.service.faculty_subjects(f.faculty_id).await.unwrap();
        assert_eq!(listing.unresolved_mappings, 1);
        assert_eq!(listing.subjects, vec![FacultySubjectEntry {
            subject_id: f.subject_id,
            subject_name: "Operating Systems".into(),
            subject_code: "CS302".into(),
            class_id: 11,
        }]);

        let empty = f.service.faculty_subjects(777).await.unwrap();
        assert!(empty.subjects.is_empty());
        assert_eq!(empty.unresolved_mappings, 0);
    }
}
