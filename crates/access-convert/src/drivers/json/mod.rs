//! JSON export driver.
//!
//! - [`JsonDialect`]: JSON value rendering; no constraints or sequences
//! - [`JsonWriter`]: writes every table's rows to one `.json` file
//!
//! The file is an array with one object per table:
//!
//! ```text
//! [
//! {"name":"Customers","data":[
//! {"Id":1,"Name":"Ann"}
//! ]}
//! ]
//! ```

mod dialect;
mod writer;

pub use dialect::JsonDialect;
pub use writer::JsonWriter;
