use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Base URL of the marketplace autoupload API; overridable for staging.
    pub olx_base_url: String,
    pub remote_request_timeout_secs: u64,
    pub remote_user_agent: String,
    /// Delay before the single follow-up poll after an async import accept.
    pub import_poll_delay_ms: u64,
    /// Upper bound on remote candidates enumerated by the migration matcher.
    pub matcher_candidate_limit: usize,
    /// Fixed pause between per-candidate detail fetches in the matcher.
    pub matcher_detail_delay_ms: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("olx_base_url", &self.olx_base_url)
            .field(
                "remote_request_timeout_secs",
                &self.remote_request_timeout_secs,
            )
            .field("remote_user_agent", &self.remote_user_agent)
            .field("import_poll_delay_ms", &self.import_poll_delay_ms)
            .field("matcher_candidate_limit", &self.matcher_candidate_limit)
            .field("matcher_detail_delay_ms", &self.matcher_detail_delay_ms)
            .finish()
    }
}
