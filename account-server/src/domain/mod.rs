pub mod activity;
pub mod error;
pub mod preferences;
pub mod stats;
pub mod user;
