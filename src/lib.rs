pub mod adapters;
pub mod configuration;
pub mod domain;
pub mod helper;
pub mod middlewares;
pub mod ports;
pub mod repositories;
pub mod routes;
pub mod startup;
pub mod telemetry;
pub mod use_cases;
