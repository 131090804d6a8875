//! Application services: routing table, user creation and seeding.

pub mod error;
pub mod repos;
pub mod routes;
pub mod seed;
pub mod users;
