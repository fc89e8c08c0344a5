pub mod schema;

pub use schema::{Field, FieldType, Schema};
