mod error;
mod mutation;
mod query;

pub use error::*;
pub use mutation::*;
pub use query::*;

pub use sea_orm;
