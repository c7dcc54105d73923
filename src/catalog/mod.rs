//! Catalog — product/category/brand records and their SQLite store.

pub mod model;
pub mod store;

pub use model::{Brand, Category, Condition, Product, ProductDraft};
pub use store::{Catalog, Database, LoggedExchange};
