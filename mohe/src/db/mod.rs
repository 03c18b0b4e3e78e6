pub mod backends;
mod connection;
pub mod repository;
pub(crate) mod schema;
pub mod traits;

pub use backends::libsql::LibSqlBackend;
pub use connection::Database;
pub use repository::{GeoBounds, MbtiWeights};
pub use traits::*;
