//! provide mongo copy blocking apis.
mod connection;
#[doc(hidden)]
pub mod copier;
mod mongo_store;

pub use connection::Connection;
pub use mongo_store::MongoStore;
