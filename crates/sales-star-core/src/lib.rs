pub mod config;
pub mod error;
pub mod event;
pub mod fact;
pub mod loader;
pub mod packager;
pub mod runner;
pub mod schema;
pub mod tables;
pub mod time_dimension;
