pub mod audit;
pub mod cache;
pub mod engine;
pub mod error;
pub mod models;
pub mod repository;
pub mod routes;
pub mod service;
