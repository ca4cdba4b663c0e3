mod articles;
mod schema;
mod store;
mod types;

pub use articles::PgSession;
pub use schema::PgStore;
pub use store::{ArticleSession, ArticleStore};
pub use types::{ArticleRecord, StoreError};
