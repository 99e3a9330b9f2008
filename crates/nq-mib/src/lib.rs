pub mod base;
pub mod error;
pub mod mock;
pub mod parser;
pub mod repository;
pub mod source;

pub use error::{SchemaError, SchemaResult};
pub use mock::MockModuleSource;
pub use repository::{LoadOutcome, LoadSummary, ModuleInfo, SchemaRepository};
pub use source::{FileModuleSource, ModuleSource};
