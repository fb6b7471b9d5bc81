use std::env;

/// Runtime configuration, read from the environment (a `.env` file is
/// loaded first when present).
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// SQLite database URL
    pub database_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env::var("TILLBOOK_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string()),
            database_url: env::var("TILLBOOK_DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:tillbook.db".to_string()),
        }
    }
}
