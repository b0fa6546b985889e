pub mod client;
pub mod lenient;
pub mod models;
