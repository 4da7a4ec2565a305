pub mod controller;
pub mod error;
pub mod pipeline;
pub mod routes;
pub mod schema;
