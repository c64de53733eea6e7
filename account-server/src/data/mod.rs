pub mod order_source;
pub mod user_repository;
