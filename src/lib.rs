pub mod config;
pub mod error;
pub mod frases;
pub mod keys;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;
