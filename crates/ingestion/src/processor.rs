//! Blueprint import processor
//!
//! Extract, parse, then write the whole blueprint in one transaction while
//! tracking progress on a `blueprint_uploads` row.

use crate::archive::extract_archive;
use crate::blueprint::Blueprint;
use crate::errors::IngestionError;
use acadex_common::db::models::{
    ClassActiveModel, ExamBranchActiveModel, Role, RoomActiveModel, UploadStatus,
};
use acadex_common::db::{DbPool, NewInstitute, Repository, StudentProfile};
use acadex_common::metrics;
use sea_orm::{ConnectionTrait, Set};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// What one import wrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub upload_id: i32,
    pub institute_id: i32,
    pub institute_created: bool,
    pub extracted_files: usize,
    pub users_created: usize,
    pub employees: usize,
    pub students: usize,
    pub classes: usize,
    pub rooms: usize,
    pub exam_branches: usize,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let institute = if self.institute_created { "created" } else { "reused" };
        writeln!(f, "Upload {} completed", self.upload_id)?;
        writeln!(f, "  institute:      {} ({})", self.institute_id, institute)?;
        writeln!(f, "  files:          {}", self.extracted_files)?;
        writeln!(f, "  new users:      {}", self.users_created)?;
        writeln!(f, "  employees:      {}", self.employees)?;
        writeln!(f, "  students:       {}", self.students)?;
        writeln!(f, "  classes:        {}", self.classes)?;
        writeln!(f, "  rooms:          {}", self.rooms)?;
        write!(f, "  exam branches:  {}", self.exam_branches)
    }
}

/// Blueprint importer
pub struct BlueprintProcessor {
    pool: DbPool,
    extract_dir: PathBuf,
}

impl BlueprintProcessor {
    pub fn new(pool: DbPool, extract_dir: impl Into<PathBuf>) -> Self {
        Self {
            pool,
            extract_dir: extract_dir.into(),
        }
    }

    /// Import one archive. The upload row ends COMPLETED with the institute id,
    /// or FAILED with the error message and nothing from this run committed.
    #[instrument(skip(self), fields(archive = %archive.display()))]
    pub async fn import(
        &self,
        archive: &Path,
        uploaded_by: Option<i32>,
    ) -> Result<ImportSummary, IngestionError> {
        let started = Instant::now();
        let repo = Repository::new(self.pool.conn());

        let upload = repo
            .create_upload(&archive.display().to_string(), uploaded_by)
            .await?;
        repo.update_upload_status(upload.id, UploadStatus::Processing, None, None)
            .await?;

        info!(upload_id = upload.id, "Blueprint import started");

        let result = self.process(archive).await;
        let elapsed = started.elapsed().as_secs_f64();
        metrics::record_import(elapsed, result.is_ok());

        match result {
            Ok(mut summary) => {
                summary.upload_id = upload.id;
                repo.update_upload_status(
                    upload.id,
                    UploadStatus::Completed,
                    Some(summary.institute_id),
                    None,
                )
                .await?;

                info!(
                    upload_id = upload.id,
                    institute_id = summary.institute_id,
                    elapsed_secs = elapsed,
                    "Blueprint import completed"
                );
                Ok(summary)
            }
            Err(e) => {
                if e.is_malformed_input() {
                    warn!(upload_id = upload.id, error = %e, "Blueprint rejected");
                } else {
                    error!(upload_id = upload.id, error = %e, "Blueprint import failed");
                }

                if let Err(status_err) = repo
                    .update_upload_status(upload.id, UploadStatus::Failed, None, Some(e.to_string()))
                    .await
                {
                    error!(upload_id = upload.id, error = %status_err, "Could not mark upload failed");
                }
                Err(e)
            }
        }
    }

    async fn process(&self, archive: &Path) -> Result<ImportSummary, IngestionError> {
        let files = extract_archive(archive, &self.extract_dir)?;
        let blueprint = Blueprint::load(&self.extract_dir)?;

        info!(
            employees = blueprint.employees.len(),
            students = blueprint.students.len(),
            classes = blueprint.classes.len(),
            rooms = blueprint.rooms.len(),
            exam_branches = blueprint.exam_branches.len(),
            "Blueprint parsed"
        );

        // Dropping the transaction on error rolls back every row of this run
        let txn = self.pool.begin().await?;
        let mut summary = write_blueprint(&Repository::new(&txn), blueprint).await?;
        txn.commit().await?;

        summary.extracted_files = files.len();

        metrics::record_import_rows("employees", summary.employees);
        metrics::record_import_rows("students", summary.students);
        metrics::record_import_rows("classes", summary.classes);
        metrics::record_import_rows("rooms", summary.rooms);
        metrics::record_import_rows("exam_branches", summary.exam_branches);

        Ok(summary)
    }
}

async fn write_blueprint<C: ConnectionTrait>(
    repo: &Repository<'_, C>,
    blueprint: Blueprint,
) -> Result<ImportSummary, IngestionError> {
    let mut summary = ImportSummary::default();

    let row = blueprint.institute;
    let institute = repo
        .find_or_create_institute(NewInstitute {
            name: row.name,
            logo_url: row.logo_url,
            code: row.code,
            address: row.address,
            timezone: row.timezone,
        })
        .await?;
    let institute_id = institute.row.id;
    summary.institute_id = institute_id;
    summary.institute_created = institute.created;

    info!(
        institute_id,
        code = %institute.row.code,
        created = institute.created,
        "Institute ready"
    );

    for row in blueprint.employees {
        let user = repo
            .find_or_create_user(institute_id, &row.full_name, &row.email, &row.role)
            .await?;
        if user.created {
            summary.users_created += 1;
        }
        repo.upsert_employee(user.row.id, institute_id, row.department, row.designation)
            .await?;
        summary.employees += 1;
    }
    info!(count = summary.employees, "Employees imported");

    for row in blueprint.students {
        let user = repo
            .find_or_create_user(institute_id, &row.full_name, &row.email, Role::Student.as_str())
            .await?;
        if user.created {
            summary.users_created += 1;
        }
        repo.upsert_student(user.row.id, institute_id, StudentProfile {
            reg_no: row.reg_no,
            roll_no: row.roll_no,
            department: row.department,
            semester: row.semester,
            section: row.section,
        })
        .await?;
        summary.students += 1;
    }
    info!(count = summary.students, "Students imported");

    for row in blueprint.classes {
        repo.insert_class(ClassActiveModel {
            institute_id: Set(Some(institute_id)),
            department: Set(row.department),
            semester: Set(row.semester),
            section: Set(row.section),
            capacity: Set(row.capacity),
            ..Default::default()
        })
        .await?;
        summary.classes += 1;
    }
    info!(count = summary.classes, "Classes imported");

    for row in blueprint.rooms {
        repo.insert_room(RoomActiveModel {
            institute_id: Set(Some(institute_id)),
            systems_count: Set(row.systems_count()),
            has_projector: Set(row.has_projector()),
            name: Set(row.name),
            room_type: Set(row.room_type),
            capacity: Set(row.capacity),
            ..Default::default()
        })
        .await?;
        summary.rooms += 1;
    }
    info!(count = summary.rooms, "Rooms imported");

    for row in blueprint.exam_branches {
        repo.insert_exam_branch(ExamBranchActiveModel {
            institute_id: Set(Some(institute_id)),
            branch_name: Set(row.branch_name),
            manager_email: Set(row.manager_email),
            ..Default::default()
        })
        .await?;
        summary.exam_branches += 1;
    }
    info!(count = summary.exam_branches, "Exam branches imported");

    Ok(summary)
}
