use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub sampling: SamplingConfig,
    pub streaming: StreamingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_retention_days() -> u32 {
    7
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplingConfig {
    /// Cadence of the cpu+ram load sampler.
    #[serde(default = "default_load_interval_ms")]
    pub load_interval_ms: u64,
    /// Samples accumulated before one aggregate row is flushed.
    #[serde(default = "default_window_size")]
    pub window_size: u32,
    /// Cadence of the network lifetime-total sampler.
    #[serde(default = "default_network_interval_secs")]
    pub network_interval_secs: u64,
}

fn default_load_interval_ms() -> u64 {
    2000
}

fn default_window_size() -> u32 {
    60
}

fn default_network_interval_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamingConfig {
    /// Lower bound for the client-requested push cadence.
    #[serde(default = "default_min_cadence_secs")]
    pub min_cadence_secs: u64,
    /// Host used for the latency reading in network pushes.
    #[serde(default = "default_ping_host")]
    pub ping_host: String,
}

fn default_min_cadence_secs() -> u64 {
    5
}

fn default_ping_host() -> String {
    "8.8.8.8".into()
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.retention_days > 0,
            "database.retention_days must be > 0, got {}",
            self.database.retention_days
        );
        anyhow::ensure!(
            self.sampling.load_interval_ms > 0,
            "sampling.load_interval_ms must be > 0, got {}",
            self.sampling.load_interval_ms
        );
        anyhow::ensure!(
            self.sampling.window_size > 0,
            "sampling.window_size must be > 0, got {}",
            self.sampling.window_size
        );
        anyhow::ensure!(
            self.sampling.network_interval_secs > 0,
            "sampling.network_interval_secs must be > 0, got {}",
            self.sampling.network_interval_secs
        );
        anyhow::ensure!(
            self.streaming.min_cadence_secs > 0,
            "streaming.min_cadence_secs must be > 0, got {}",
            self.streaming.min_cadence_secs
        );
        anyhow::ensure!(
            !self.streaming.ping_host.is_empty(),
            "streaming.ping_host must be non-empty"
        );
        Ok(())
    }
}
