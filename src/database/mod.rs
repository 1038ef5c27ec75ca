pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod seed;
pub mod store;
pub mod unit_of_work;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{Backend, PrincipalRepository, RequestRepository, Store};
pub use unit_of_work::UnitOfWork;
