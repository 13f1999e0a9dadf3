pub mod appeals;
pub mod core;
pub mod courses;
pub mod deadlines;
pub mod discipline;
pub mod exams;
pub mod holds;
pub mod students;
pub mod transfer;
