//! Persistence adapters for ComplianceRepoPort.

pub mod fixture;
pub mod memory_repo;
pub mod sqlite_repo;

pub use fixture::Fixture;
pub use memory_repo::InMemoryRepo;
pub use sqlite_repo::SqliteRepo;
