//! Repository pattern for database operations
//!
//! A `Repository` borrows an explicit connection handle, either the pool or an
//! open transaction, so callers decide the transactional scope. Natural-key
//! writes go through single-statement `INSERT ... ON CONFLICT` upserts.

use crate::db::models::*;
use crate::errors::{AppError, Result};
use chrono::NaiveDate;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};

/// Repository for data access operations
pub struct Repository<'c, C> {
    conn: &'c C,
}

/// Outcome of a find-or-create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted<T> {
    pub row: T,
    pub created: bool,
}

/// Fields for a new institute
#[derive(Debug, Clone, Default)]
pub struct NewInstitute {
    pub name: String,
    pub logo_url: Option<String>,
    pub code: String,
    pub address: Option<String>,
    pub timezone: Option<String>,
}

/// Fields for a new student profile
#[derive(Debug, Clone, Default)]
pub struct StudentProfile {
    pub reg_no: String,
    pub roll_no: Option<String>,
    pub department: Option<String>,
    pub semester: Option<i32>,
    pub section: Option<String>,
}

impl<'c, C: ConnectionTrait> Repository<'c, C> {
    /// Create a repository over the given connection or transaction
    pub fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    // ========================================================================
    // Generic Operations
    // ========================================================================

    /// Load every row of a table
    pub async fn scan<E: EntityTrait>(&self) -> Result<Vec<E::Model>> {
        E::find().all(self.conn).await.map_err(Into::into)
    }

    // ========================================================================
    // Institute Operations
    // ========================================================================

    /// Find institute by its natural key
    pub async fn find_institute_by_code(&self, code: &str) -> Result<Option<Institute>> {
        InstituteEntity::find()
            .filter(InstituteColumn::Code.eq(code))
            .one(self.conn)
            .await
            .map_err(Into::into)
    }

    /// Insert the institute unless its code is taken; the existing row wins.
    pub async fn find_or_create_institute(&self, new: NewInstitute) -> Result<Upserted<Institute>> {
        let code = new.code.clone();

        let institute = InstituteActiveModel {
            name: Set(new.name),
            logo_url: Set(new.logo_url),
            code: Set(new.code),
            address: Set(new.address),
            timezone: Set(new.timezone),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        let inserted = InstituteEntity::insert(institute)
            .on_conflict(OnConflict::column(InstituteColumn::Code).do_nothing().to_owned())
            .exec_without_returning(self.conn)
            .await?;

        let row = self
            .find_institute_by_code(&code)
            .await?
            .ok_or_else(|| AppError::Internal {
                message: format!("institute {} vanished after upsert", code),
            })?;

        Ok(Upserted { row, created: inserted > 0 })
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    /// Find user by email
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Email.eq(email))
            .one(self.conn)
            .await
            .map_err(Into::into)
    }

    /// Insert a user unless the email is taken. An existing user is returned
    /// untouched even if its name or role differ.
    pub async fn find_or_create_user(
        &self,
        institute_id: i32,
        full_name: &str,
        email: &str,
        role: &str,
    ) -> Result<Upserted<User>> {
        let user = UserActiveModel {
            institute_id: Set(Some(institute_id)),
            full_name: Set(full_name.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(None),
            role: Set(role.trim().to_uppercase()),
            phone: Set(None),
            is_active: Set(true),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        let inserted = UserEntity::insert(user)
            .on_conflict(OnConflict::column(UserColumn::Email).do_nothing().to_owned())
            .exec_without_returning(self.conn)
            .await?;

        let row = self
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::Internal {
                message: format!("user {} vanished after upsert", email),
            })?;

        Ok(Upserted { row, created: inserted > 0 })
    }

    // ========================================================================
    // Employee Operations
    // ========================================================================

    /// Find employee by ID
    pub async fn find_employee_by_id(&self, id: i32) -> Result<Option<Employee>> {
        EmployeeEntity::find_by_id(id)
            .one(self.conn)
            .await
            .map_err(Into::into)
    }

    /// Create the employee profile for a user, or refresh its department and
    /// designation if the user already has one.
    pub async fn upsert_employee(
        &self,
        user_id: i32,
        institute_id: i32,
        department: Option<String>,
        designation: Option<String>,
    ) -> Result<Employee> {
        let employee = EmployeeActiveModel {
            user_id: Set(user_id),
            institute_id: Set(Some(institute_id)),
            department: Set(department),
            designation: Set(designation),
            ..Default::default()
        };

        EmployeeEntity::insert(employee)
            .on_conflict(
                OnConflict::column(EmployeeColumn::UserId)
                    .update_columns([
                        EmployeeColumn::InstituteId,
                        EmployeeColumn::Department,
                        EmployeeColumn::Designation,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await?;

        EmployeeEntity::find()
            .filter(EmployeeColumn::UserId.eq(user_id))
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::Internal {
                message: format!("employee for user {} vanished after upsert", user_id),
            })
    }

    // ========================================================================
    // Student Operations
    // ========================================================================

    /// Find student by ID
    pub async fn find_student_by_id(&self, id: i32) -> Result<Option<Student>> {
        StudentEntity::find_by_id(id)
            .one(self.conn)
            .await
            .map_err(Into::into)
    }

    /// Find student by registration number
    pub async fn find_student_by_reg_no(&self, reg_no: &str) -> Result<Option<Student>> {
        StudentEntity::find()
            .filter(StudentColumn::RegNo.eq(reg_no))
            .one(self.conn)
            .await
            .map_err(Into::into)
    }

    /// Create a student keyed by `reg_no`, or refresh the academic fields of the
    /// existing one. Fails with `Conflict` if the `reg_no` belongs to another
    /// user or the user already owns a different student profile.
    pub async fn upsert_student(
        &self,
        user_id: i32,
        institute_id: i32,
        profile: StudentProfile,
    ) -> Result<Student> {
        let reg_no = profile.reg_no.clone();

        if let Some(existing) = self.find_student_by_reg_no(&reg_no).await? {
            if existing.user_id != user_id {
                return Err(reg_no_taken(&reg_no, existing.user_id));
            }
        }

        let student = StudentActiveModel {
            user_id: Set(user_id),
            institute_id: Set(Some(institute_id)),
            reg_no: Set(profile.reg_no),
            roll_no: Set(profile.roll_no),
            department: Set(profile.department),
            semester: Set(profile.semester),
            section: Set(profile.section),
            ..Default::default()
        };

        StudentEntity::insert(student)
            .on_conflict(
                OnConflict::column(StudentColumn::RegNo)
                    .update_columns([
                        StudentColumn::RollNo,
                        StudentColumn::Department,
                        StudentColumn::Semester,
                        StudentColumn::Section,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await?;

        let student = self
            .find_student_by_reg_no(&reg_no)
            .await?
            .ok_or_else(|| AppError::Internal {
                message: format!("student {} vanished after upsert", reg_no),
            })?;

        // A concurrent writer may have claimed the reg_no between check and upsert
        if student.user_id != user_id {
            return Err(reg_no_taken(&reg_no, student.user_id));
        }

        Ok(student)
    }

    // ========================================================================
    // Class / Room / Exam Branch Operations
    // ========================================================================

    pub async fn insert_class(&self, class: ClassActiveModel) -> Result<Class> {
        class.insert(self.conn).await.map_err(Into::into)
    }

    pub async fn insert_room(&self, room: RoomActiveModel) -> Result<Room> {
        room.insert(self.conn).await.map_err(Into::into)
    }

    pub async fn insert_exam_branch(&self, branch: ExamBranchActiveModel) -> Result<ExamBranch> {
        branch.insert(self.conn).await.map_err(Into::into)
    }

    // ========================================================================
    // Subject Operations
    // ========================================================================

    /// Find subject by ID
    pub async fn find_subject_by_id(&self, id: i32) -> Result<Option<Subject>> {
        SubjectEntity::find_by_id(id)
            .one(self.conn)
            .await
            .map_err(Into::into)
    }

    /// Create a subject
    pub async fn create_subject(
        &self,
        institute_id: Option<i32>,
        name: &str,
        code: &str,
    ) -> Result<Subject> {
        SubjectActiveModel {
            institute_id: Set(institute_id),
            name: Set(name.to_string()),
            code: Set(code.to_string()),
            ..Default::default()
        }
        .insert(self.conn)
        .await
        .map_err(Into::into)
    }

    /// Assign a subject for a class to a faculty member
    pub async fn assign_faculty_subject(
        &self,
        faculty_id: i32,
        subject_id: i32,
        class_id: i32,
    ) -> Result<FacultySubject> {
        FacultySubjectActiveModel {
            faculty_id: Set(faculty_id),
            subject_id: Set(subject_id),
            class_id: Set(class_id),
            ..Default::default()
        }
        .insert(self.conn)
        .await
        .map_err(Into::into)
    }

    /// Teaching assignments of one faculty member
    pub async fn faculty_subjects(&self, faculty_id: i32) -> Result<Vec<FacultySubject>> {
        FacultySubjectEntity::find()
            .filter(FacultySubjectColumn::FacultyId.eq(faculty_id))
            .order_by_asc(FacultySubjectColumn::Id)
            .all(self.conn)
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Attendance Operations
    // ========================================================================

    /// Find the row for one (student, subject, date)
    pub async fn find_attendance(
        &self,
        student_id: i32,
        subject_id: i32,
        date: NaiveDate,
    ) -> Result<Option<Attendance>> {
        AttendanceEntity::find()
            .filter(AttendanceColumn::StudentId.eq(student_id))
            .filter(AttendanceColumn::SubjectId.eq(subject_id))
            .filter(AttendanceColumn::Date.eq(date))
            .one(self.conn)
            .await
            .map_err(Into::into)
    }

    /// Insert or overwrite the status for (student, subject, date).
    /// `marked_by` is only written on insert.
    pub async fn upsert_attendance(
        &self,
        student_id: i32,
        subject_id: i32,
        date: NaiveDate,
        status: &str,
        marked_by: i32,
    ) -> Result<Attendance> {
        let record = AttendanceActiveModel {
            student_id: Set(student_id),
            subject_id: Set(subject_id),
            date: Set(date),
            status: Set(status.to_string()),
            marked_by: Set(marked_by),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        AttendanceEntity::insert(record)
            .on_conflict(
                OnConflict::columns([
                    AttendanceColumn::StudentId,
                    AttendanceColumn::SubjectId,
                    AttendanceColumn::Date,
                ])
                .update_column(AttendanceColumn::Status)
                .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await?;

        self.find_attendance(student_id, subject_id, date)
            .await?
            .ok_or_else(|| AppError::Internal {
                message: format!(
                    "attendance ({}, {}, {}) vanished after upsert",
                    student_id, subject_id, date
                ),
            })
    }

    /// All rows for a subject on one date
    pub async fn attendance_for_class(
        &self,
        subject_id: i32,
        date: NaiveDate,
    ) -> Result<Vec<Attendance>> {
        AttendanceEntity::find()
            .filter(AttendanceColumn::SubjectId.eq(subject_id))
            .filter(AttendanceColumn::Date.eq(date))
            .order_by_asc(AttendanceColumn::Id)
            .all(self.conn)
            .await
            .map_err(Into::into)
    }

    /// All rows for a student
    pub async fn attendance_for_student(&self, student_id: i32) -> Result<Vec<Attendance>> {
        AttendanceEntity::find()
            .filter(AttendanceColumn::StudentId.eq(student_id))
            .order_by_asc(AttendanceColumn::Date)
            .order_by_asc(AttendanceColumn::Id)
            .all(self.conn)
            .await
            .map_err(Into::into)
    }

    /// All rows for a subject, any date
    pub async fn attendance_for_subject(&self, subject_id: i32) -> Result<Vec<Attendance>> {
        AttendanceEntity::find()
            .filter(AttendanceColumn::SubjectId.eq(subject_id))
            .order_by_asc(AttendanceColumn::Date)
            .order_by_asc(AttendanceColumn::Id)
            .all(self.conn)
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Blueprint Upload Operations
    // ========================================================================

    /// Register an archive for processing
    pub async fn create_upload(
        &self,
        zip_path: &str,
        uploaded_by: Option<i32>,
    ) -> Result<BlueprintUpload> {
        BlueprintUploadActiveModel {
            institute_id: Set(None),
            uploaded_by: Set(uploaded_by),
            zip_path: Set(zip_path.to_string()),
            status: Set(String::from(UploadStatus::Pending)),
            error_message: Set(None),
            created_at: Set(chrono::Utc::now().into()),
            completed_at: Set(None),
            ..Default::default()
        }
        .insert(self.conn)
        .await
        .map_err(Into::into)
    }

    /// Update upload status
    pub async fn update_upload_status(
        &self,
        upload_id: i32,
        status: UploadStatus,
        institute_id: Option<i32>,
        error_message: Option<String>,
    ) -> Result<BlueprintUpload> {
        let mut upload = BlueprintUploadEntity::find_by_id(upload_id)
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::not_found("Blueprint upload"))?
            .into_active_model();

        upload.status = Set(String::from(status.clone()));

        if let Some(id) = institute_id {
            upload.institute_id = Set(Some(id));
        }

        if let Some(err) = error_message {
            upload.error_message = Set(Some(err));
        }

        if matches!(status, UploadStatus::Completed | UploadStatus::Failed) {
            upload.completed_at = Set(Some(chrono::Utc::now().into()));
        }

        upload.update(self.conn).await.map_err(Into::into)
    }
}

fn reg_no_taken(reg_no: &str, owner: i32) -> AppError {
    AppError::Conflict {
        message: format!("reg_no {} already belongs to user {}", reg_no, owner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use sea_orm::PaginatorTrait;

    async fn seed_institute<C: ConnectionTrait>(repo: &Repository<'_, C>) -> Institute {
        repo.find_or_create_institute(NewInstitute {
            name: "North Campus".into(),
            code: "NC01".into(),
            ..Default::default()
        })
        .await
        .unwrap()
        .row
    }

    #[tokio::test]
    async fn test_institute_code_is_reused() {
        let pool = test_pool().await;
        let repo = Repository::new(pool.conn());

        let first = repo
            .find_or_create_institute(NewInstitute {
                name: "North Campus".into(),
                code: "NC01".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let second = repo
            .find_or_create_institute(NewInstitute {
                name: "Renamed Campus".into(),
                code: "NC01".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.row.id, second.row.id);
        assert_eq!(second.row.name, "North Campus");
    }

    #[tokio::test]
    async fn test_existing_user_wins() {
        let pool = test_pool().await;
        let repo = Repository::new(pool.conn());
        let institute = seed_institute(&repo).await;

        let created = repo
            .find_or_create_user(institute.id, "Asha Rao", "asha@nc.edu", "faculty")
            .await
            .unwrap();
        assert!(created.created);
        assert_eq!(created.row.role, "FACULTY");

        let reused = repo
            .find_or_create_user(institute.id, "Someone Else", "asha@nc.edu", "ADMIN")
            .await
            .unwrap();
        assert!(!reused.created);
        assert_eq!(reused.row.id, created.row.id);
        assert_eq!(reused.row.full_name, "Asha Rao");
        assert_eq!(reused.row.role, "FACULTY");
    }

    #[tokio::test]
    async fn test_employee_upsert_keeps_one_profile_per_user() {
        let pool = test_pool().await;
        let repo = Repository::new(pool.conn());
        let institute = seed_institute(&repo).await;
        let user = repo
            .find_or_create_user(institute.id, "Asha Rao", "asha@nc.edu", "FACULTY")
            .await
            .unwrap()
            .row;

        let first = repo
            .upsert_employee(user.id, institute.id, Some("CSE".into()), Some("Lecturer".into()))
            .await
            .unwrap();
        let second = repo
            .upsert_employee(user.id, institute.id, Some("CSE".into()), Some("Professor".into()))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.designation.as_deref(), Some("Professor"));
        assert_eq!(EmployeeEntity::find().count(pool.conn()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_student_owned_by_other_reg_no_is_conflict() {
        let pool = test_pool().await;
        let repo = Repository::new(pool.conn());
        let institute = seed_institute(&repo).await;
        let user = repo
            .find_or_create_user(institute.id, "Ravi", "ravi@nc.edu", "STUDENT")
            .await
            .unwrap()
            .row;

        repo.upsert_student(user.id, institute.id, StudentProfile {
            reg_no: "REG-1".into(),
            ..Default::default()
        })
        .await
        .unwrap();

        let err = repo
            .upsert_student(user.id, institute.id, StudentProfile {
                reg_no: "REG-2".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_reg_no_of_another_user_is_conflict() {
        let pool = test_pool().await;
        let repo = Repository::new(pool.conn());
        let institute = seed_institute(&repo).await;
        let ravi = repo
            .find_or_create_user(institute.id, "Ravi", "ravi@nc.edu", "STUDENT")
            .await
            .unwrap()
            .row;
        let divya = repo
            .find_or_create_user(institute.id, "Divya", "divya@nc.edu", "STUDENT")
            .await
            .unwrap()
            .row;

        repo.upsert_student(ravi.id, institute.id, StudentProfile {
            reg_no: "R-1".into(),
            department: Some("CSE".into()),
            semester: Some(3),
            ..Default::default()
        })
        .await
        .unwrap();

        let err = repo
            .upsert_student(divya.id, institute.id, StudentProfile {
                reg_no: "R-1".into(),
                department: Some("ECE".into()),
                semester: Some(5),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }), "got {err:?}");

        let kept = repo.find_student_by_reg_no("R-1").await.unwrap().unwrap();
        assert_eq!(kept.user_id, ravi.id);
        assert_eq!(kept.department.as_deref(), Some("CSE"));
        assert_eq!(kept.semester, Some(3));
    }

    #[tokio::test]
    async fn test_duplicate_attendance_key_is_rejected_by_index() {
        let pool = test_pool().await;
        let repo = Repository::new(pool.conn());
        let institute = seed_institute(&repo).await;
        let teacher = repo
            .find_or_create_user(institute.id, "Asha", "asha@nc.edu", "FACULTY")
            .await
            .unwrap()
            .row;
        let pupil = repo
            .find_or_create_user(institute.id, "Ravi", "ravi@nc.edu", "STUDENT")
            .await
            .unwrap()
            .row;
        let asha = repo.upsert_employee(teacher.id, institute.id, None, None).await.unwrap();
        let student = repo
            .upsert_student(pupil.id, institute.id, StudentProfile {
                reg_no: "REG-1".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let subject = repo.create_subject(Some(institute.id), "Algorithms", "CS301").await.unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();

        let row = |status: &str| AttendanceActiveModel {
            student_id: Set(student.id),
            subject_id: Set(subject.id),
            date: Set(date),
            status: Set(status.to_string()),
            marked_by: Set(asha.id),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        AttendanceEntity::insert(row("PRESENT")).exec(pool.conn()).await.unwrap();

        // A plain insert that skips the upsert path must hit the unique index
        let err: AppError = AttendanceEntity::insert(row("ABSENT"))
            .exec(pool.conn())
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, AppError::Conflict { .. }), "got {err:?}");

        let rows = repo.attendance_for_class(subject.id, date).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "PRESENT");
    }

    #[tokio::test]
    async fn test_attendance_upsert_overwrites_status_only() {
        let pool = test_pool().await;
        let repo = Repository::new(pool.conn());
        let institute = seed_institute(&repo).await;
        let teacher = repo
            .find_or_create_user(institute.id, "Asha", "asha@nc.edu", "FACULTY")
            .await
            .unwrap()
            .row;
        let other = repo
            .find_or_create_user(institute.id, "Vikram", "vikram@nc.edu", "FACULTY")
            .await
            .unwrap()
            .row;
        let pupil = repo
            .find_or_create_user(institute.id, "Ravi", "ravi@nc.edu", "STUDENT")
            .await
            .unwrap()
            .row;
        let asha = repo.upsert_employee(teacher.id, institute.id, None, None).await.unwrap();
        let vikram = repo.upsert_employee(other.id, institute.id, None, None).await.unwrap();
        let student = repo
            .upsert_student(pupil.id, institute.id, StudentProfile {
                reg_no: "REG-1".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let subject = repo.create_subject(Some(institute.id), "Algorithms", "CS301").await.unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();

        let first = repo
            .upsert_attendance(student.id, subject.id, date, "ABSENT", asha.id)
            .await
            .unwrap();
        let second = repo
            .upsert_attendance(student.id, subject.id, date, "PRESENT", vikram.id)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.status, "PRESENT");
        assert_eq!(second.marked_by, asha.id);
        assert_eq!(repo.attendance_for_student(student.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_status_transitions() {
        let pool = test_pool().await;
        let repo = Repository::new(pool.conn());

        let upload = repo.create_upload("institute_data.zip", None).await.unwrap();
        assert_eq!(upload.upload_status(), UploadStatus::Pending);

        let failed = repo
            .update_upload_status(upload.id, UploadStatus::Failed, None, Some("bad csv".into()))
            .await
            .unwrap();
        assert!(failed.is_terminal());
        assert!(failed.completed_at.is_some());
        assert_eq!(failed.error_message.as_deref(), Some("bad csv"));
    }
}
