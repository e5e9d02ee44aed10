pub mod aggregate;
pub mod derive;
pub mod error;
pub mod fetch;
pub mod output;
pub mod parser;
pub mod schema;
pub mod server;
pub mod session;
pub mod stats;
