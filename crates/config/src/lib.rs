mod env_parsing;
mod loader;
mod schema;

pub use self::loader::load_from_env;
pub use self::schema::{AppConfig, StreamProvider};

#[cfg(test)]
mod tests;
