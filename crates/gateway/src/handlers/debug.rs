//! Whole-database dump for inspection

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;
use acadex_common::{
    db::{models::*, Repository},
    errors::Result,
};

/// Every table keyed by name. User password hashes are never serialized.
#[derive(Serialize)]
pub struct TableDump {
    pub institutes: Vec<Institute>,
    pub users: Vec<User>,
    pub employees: Vec<Employee>,
    pub students: Vec<Student>,
    pub classes: Vec<Class>,
    pub rooms: Vec<Room>,
    pub exam_branches: Vec<ExamBranch>,
    pub attendance: Vec<Attendance>,
    pub faculty_subjects: Vec<FacultySubject>,
    pub subjects: Vec<Subject>,
    pub blueprint_uploads: Vec<BlueprintUpload>,
}

pub async fn dump_all(State(state): State<AppState>) -> Result<Json<TableDump>> {
    let repo = Repository::new(state.db.conn());

    Ok(Json(TableDump {
        institutes: repo.scan::<InstituteEntity>().await?,
        users: repo.scan::<UserEntity>().await?,
        employees: repo.scan::<EmployeeEntity>().await?,
        students: repo.scan::<StudentEntity>().await?,
        classes: repo.scan::<ClassEntity>().await?,
        rooms: repo.scan::<RoomEntity>().await?,
        exam_branches: repo.scan::<ExamBranchEntity>().await?,
        attendance: repo.scan::<AttendanceEntity>().await?,
        faculty_subjects: repo.scan::<FacultySubjectEntity>().await?,
        subjects: repo.scan::<SubjectEntity>().await?,
        blueprint_uploads: repo.scan::<BlueprintUploadEntity>().await?,
    }))
}
