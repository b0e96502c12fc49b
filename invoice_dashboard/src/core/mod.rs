pub mod auth;
pub mod cache;
pub mod error;
pub mod invoices;
pub mod models;
pub mod store;
