//! Blueprint CSV files
//!
//! Every file is parsed up front so a bad row fails the import before anything
//! is written.

use crate::errors::IngestionError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;

pub const INSTITUTE_CSV: &str = "institute.csv";
pub const EMPLOYEES_CSV: &str = "employees.csv";
pub const STUDENTS_CSV: &str = "students.csv";
pub const CLASSES_CSV: &str = "classes.csv";
pub const ROOMS_CSV: &str = "rooms.csv";
pub const EXAM_BRANCH_CSV: &str = "examination_branch.csv";

#[derive(Debug, Clone, Deserialize)]
pub struct InstituteRow {
    pub name: String,
    pub logo_url: Option<String>,
    pub code: String,
    pub address: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmployeeRow {
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub department: Option<String>,
    pub designation: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StudentRow {
    pub full_name: String,
    pub email: String,
    pub reg_no: String,
    pub roll_no: Option<String>,
    pub department: Option<String>,
    pub semester: Option<i32>,
    pub section: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassRow {
    pub department: String,
    pub semester: i32,
    pub section: String,
    pub capacity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomRow {
    pub name: String,
    #[serde(rename = "type")]
    pub room_type: String,
    pub capacity: i32,
    pub systems_count: Option<i32>,
    pub has_projector: Option<String>,
}

impl RoomRow {
    pub fn systems_count(&self) -> i32 {
        self.systems_count.unwrap_or(0)
    }

    pub fn has_projector(&self) -> bool {
        to_bool(self.has_projector.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExamBranchRow {
    pub branch_name: String,
    pub manager_email: String,
}

/// `yes`, `true` and `1` in any case are true; anything else, including a
/// missing value, is false.
pub fn to_bool(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_lowercase()).as_deref(),
        Some("yes" | "true" | "1")
    )
}

/// All six files of an institute blueprint
#[derive(Debug, Clone)]
pub struct Blueprint {
    pub institute: InstituteRow,
    pub employees: Vec<EmployeeRow>,
    pub students: Vec<StudentRow>,
    pub classes: Vec<ClassRow>,
    pub rooms: Vec<RoomRow>,
    pub exam_branches: Vec<ExamBranchRow>,
}

impl Blueprint {
    /// Parse the blueprint from an extraction directory. Only the first row of
    /// `institute.csv` is used.
    pub fn load(dir: &Path) -> Result<Self, IngestionError> {
        let institute = read_rows::<InstituteRow>(dir, INSTITUTE_CSV)?
            .into_iter()
            .next()
            .ok_or_else(|| IngestionError::malformed(INSTITUTE_CSV, "no data rows"))?;

        Ok(Self {
            institute,
            employees: read_rows(dir, EMPLOYEES_CSV)?,
            students: read_rows(dir, STUDENTS_CSV)?,
            classes: read_rows(dir, CLASSES_CSV)?,
            rooms: read_rows(dir, ROOMS_CSV)?,
            exam_branches: read_rows(dir, EXAM_BRANCH_CSV)?,
        })
    }
}

/// Read a headed CSV file into typed rows. Rows are numbered from 1, after the header.
fn read_rows<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<Vec<T>, IngestionError> {
    let path = dir.join(file);
    if !path.is_file() {
        return Err(IngestionError::malformed(file, "file missing from archive"));
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(&path)
        .map_err(|e| IngestionError::malformed(file, e.to_string()))?;

    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<T>().enumerate() {
        let row = record
            .map_err(|e| IngestionError::malformed(file, format!("row {}: {}", index + 1, e)))?;
        rows.push(row);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{scratch_dir, write_files};

    #[test]
    fn test_to_bool() {
        assert!(to_bool(Some("Yes")));
        assert!(to_bool(Some(" TRUE ")));
        assert!(to_bool(Some("1")));
        assert!(!to_bool(Some("no")));
        assert!(!to_bool(Some("")));
        assert!(!to_bool(None));
    }

    #[test]
    fn test_optional_room_columns() {
        let dir = scratch_dir("rows-rooms");
        write_files(dir.path(), &[(
            ROOMS_CSV,
            "name,type,capacity,systems_count,has_projector\n\
             Lab 1,LAB,30,30,yes\n\
             Room 101,CLASS,60,,\n",
        )]);

        let rooms: Vec<RoomRow> = read_rows(dir.path(), ROOMS_CSV).unwrap();
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].systems_count(), 30);
        assert!(rooms[0].has_projector());
        assert_eq!(rooms[1].systems_count(), 0);
        assert!(!rooms[1].has_projector());
    }

    #[test]
    fn test_rooms_without_optional_columns() {
        let dir = scratch_dir("rows-rooms-short");
        write_files(dir.path(), &[(ROOMS_CSV, "name,type,capacity\nSeminar Hall,SEMINAR,120\n")]);

        let rooms: Vec<RoomRow> = read_rows(dir.path(), ROOMS_CSV).unwrap();
        assert_eq!(rooms[0].room_type, "SEMINAR");
        assert_eq!(rooms[0].systems_count(), 0);
        assert!(!rooms[0].has_projector());
    }

    #[test]
    fn test_bad_number_names_file_and_row() {
        let dir = scratch_dir("rows-bad-number");
        write_files(dir.path(), &[(
            CLASSES_CSV,
            "department,semester,section,capacity\nCSE,3,A,60\nCSE,three,B,60\n",
        )]);

        let err = read_rows::<ClassRow>(dir.path(), CLASSES_CSV).unwrap_err();
        assert!(err.is_malformed_input());
        let message = err.to_string();
        assert!(message.contains(CLASSES_CSV), "{message}");
        assert!(message.contains("row 2"), "{message}");
    }

    #[test]
    fn test_missing_required_column() {
        let dir = scratch_dir("rows-missing-column");
        write_files(dir.path(), &[(EXAM_BRANCH_CSV, "branch_name\nMain\n")]);

        let err = read_rows::<ExamBranchRow>(dir.path(), EXAM_BRANCH_CSV).unwrap_err();
        assert!(err.is_malformed_input());
    }

    #[test]
    fn test_missing_file() {
        let dir = scratch_dir("rows-missing-file");
        let err = Blueprint::load(dir.path()).unwrap_err();
        assert!(err.is_malformed_input());
        assert!(err.to_string().contains(INSTITUTE_CSV));
    }

    #[test]
    fn test_empty_institute_file() {
        let dir = scratch_dir("rows-empty-institute");
        write_files(dir.path(), &[(INSTITUTE_CSV, "name,logo_url,code,address,timezone\n")]);

        let err = Blueprint::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("no data rows"));
    }
}
