pub mod config;
pub mod ledger;
pub mod protocol;
pub mod server;
pub mod session;
