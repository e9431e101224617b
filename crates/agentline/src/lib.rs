pub mod accumulator;
pub mod agent;
pub mod builtin;
pub mod consumer;
pub mod errors;
pub mod models;
pub mod protocol;
pub mod providers;
pub mod schema;
pub mod tool;
