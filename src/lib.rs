pub mod config;
pub mod db;
pub mod filter;
pub mod http;
pub mod model;
pub mod recurrence;
