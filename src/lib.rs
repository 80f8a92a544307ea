pub mod auth;
pub mod configuration;
pub mod error;
pub mod logger;
pub mod media;
pub mod middleware;
pub mod routes;
pub mod startup;
pub mod telemetry;
pub mod users;
pub mod validators;
