pub mod api;
pub mod config;
pub mod document_store;
pub mod error;
pub mod llm;
pub mod models;
pub mod resolver;
pub mod retry;
pub mod service;
pub mod storage;
