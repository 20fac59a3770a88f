pub mod auth;
pub mod chat;
pub mod config;
pub mod credits;
pub mod dashboard;
pub mod db;
pub mod errors;
pub mod formatting;
pub mod jobs;
pub mod llm_client;
pub mod models;
pub mod notify;
pub mod pdf;
pub mod repository;
pub mod routes;
pub mod state;
pub mod storage;
