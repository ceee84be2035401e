pub mod accounts;
pub mod calendar;
pub mod client;
pub mod config;
pub mod error;
pub mod finance;
pub mod messages;
pub mod models;
pub mod orchestrator;
pub mod payment;
pub mod routes;
pub mod schedule;
