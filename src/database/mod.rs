//! Postgres connection pool and migrations.

mod pool;

pub use pool::{create_pool, run_migrations, Database, DatabaseError, PoolStatus};
