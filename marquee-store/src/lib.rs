pub mod app_config;
pub mod database;
pub mod ledger_repo;
pub mod memory;

pub use app_config::{BusinessRules, Config};
pub use database::DbClient;
pub use ledger_repo::PgLedger;
pub use memory::MemoryLedger;
