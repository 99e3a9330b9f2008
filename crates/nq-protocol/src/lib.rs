pub mod error;
pub mod oid;
pub mod query;
pub mod response;
pub mod schema;
pub mod value;

pub use error::*;
pub use oid::*;
pub use query::*;
pub use response::*;
pub use schema::*;
pub use value::*;
