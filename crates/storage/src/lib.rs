mod clickhouse_store;
mod query;

pub use self::clickhouse_store::ClickHouseStore;
pub use self::query::QueryClient;

/// Connection settings for the analytics store. `addr` is the HTTP interface
/// (e.g. `http://localhost:8123`); both the typed insert path and the dynamic
/// query path speak to it.
#[derive(Debug, Clone)]
pub struct ClickHouseConfig {
    pub addr: String,
    pub database: String,
    pub username: String,
    pub password: String,
}
