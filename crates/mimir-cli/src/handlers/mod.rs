pub mod activity;
pub mod agents;
pub mod projects;
pub mod run;
pub mod scan;
pub mod tasks;
