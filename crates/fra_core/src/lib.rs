pub mod clock;
pub mod config;
pub mod db;
pub mod layers;
pub mod query;
pub mod schema;
pub mod seed;
pub mod store;

pub use store::RecordStore;
