pub mod error;
pub mod memory;
pub mod postgres;
pub mod user_repo;

pub use memory::InMemoryUserStore;
pub use postgres::PgUserStore;
pub use user_repo::{TokenUpdate, UserDocument, UserFilter, UserStore};
