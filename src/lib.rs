pub mod catalog;
pub mod config;
pub mod ledger;
pub mod model;
pub mod notify;
pub mod observability;
pub mod server;
pub mod wire;
