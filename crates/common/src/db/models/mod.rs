//! SeaORM entity models
//!
//! Database entities for Acadex

mod attendance;
mod blueprint_upload;
mod class;
mod employee;
mod exam_branch;
mod faculty_subject;
mod institute;
mod room;
mod student;
mod subject;
mod user;

pub use institute::{
    Entity as InstituteEntity,
    Model as Institute,
    ActiveModel as InstituteActiveModel,
    Column as InstituteColumn,
};

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
    Role,
};

pub use employee::{
    Entity as EmployeeEntity,
    Model as Employee,
    ActiveModel as EmployeeActiveModel,
    Column as EmployeeColumn,
};

pub use student::{
    Entity as StudentEntity,
    Model as Student,
    ActiveModel as StudentActiveModel,
    Column as StudentColumn,
};

pub use class::{
    Entity as ClassEntity,
    Model as Class,
    ActiveModel as ClassActiveModel,
    Column as ClassColumn,
};

pub use room::{
    Entity as RoomEntity,
    Model as Room,
    ActiveModel as RoomActiveModel,
    Column as RoomColumn,
};

pub use exam_branch::{
    Entity as ExamBranchEntity,
    Model as ExamBranch,
    ActiveModel as ExamBranchActiveModel,
    Column as ExamBranchColumn,
};

pub use subject::{
    Entity as SubjectEntity,
    Model as Subject,
    ActiveModel as SubjectActiveModel,
    Column as SubjectColumn,
};

pub use faculty_subject::{
    Entity as FacultySubjectEntity,
    Model as FacultySubject,
    ActiveModel as FacultySubjectActiveModel,
    Column as FacultySubjectColumn,
};

pub use attendance::{
    Entity as AttendanceEntity,
    Model as Attendance,
    ActiveModel as AttendanceActiveModel,
    Column as AttendanceColumn,
    AttendanceStatus,
};

pub use blueprint_upload::{
    Entity as BlueprintUploadEntity,
    Model as BlueprintUpload,
    ActiveModel as BlueprintUploadActiveModel,
    Column as BlueprintUploadColumn,
    UploadStatus,
};
