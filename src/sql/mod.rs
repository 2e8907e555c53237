//! Safe SQL builder for document tables: identifiers and field names quoted, values as parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
