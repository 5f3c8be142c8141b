pub mod analytics;
pub mod catalog;
pub mod core;
pub mod enrollment;
pub mod grades;
