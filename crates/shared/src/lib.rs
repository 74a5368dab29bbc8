pub mod domain;
pub mod error;
pub mod repo;
pub mod time;
