pub mod db;
pub mod schema;
pub mod upsert;

pub use db::Db;
pub use schema::{Dataset, Dialect, TableSchema};
pub use upsert::upsert_entities;
