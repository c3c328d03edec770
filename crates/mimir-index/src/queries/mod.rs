pub mod activity;
pub mod project;
pub mod task;
