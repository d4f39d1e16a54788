//! HTTP surface of trackreel: the render form, job submission and job status.

pub mod activity;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
