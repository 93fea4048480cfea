pub mod config;
pub mod logging;

pub mod aggregate;
pub mod catalog;
pub mod class_id;
pub mod extract;
pub mod fetch;
pub mod outcome;
pub mod progress;
pub mod retry;
pub mod scheduler;
pub mod skip;
pub mod status;
pub mod task;
pub mod url_model;
