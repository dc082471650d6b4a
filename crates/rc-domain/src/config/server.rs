use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_port")]
    pub port: u16,
    /// How long graceful shutdown waits for in-flight calls to end cleanly
    /// before force-closing remaining sockets (spec §5, §4.8).
    #[serde(default = "d_drain_secs")]
    pub shutdown_drain_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: d_host(),
            port: d_port(),
            shutdown_drain_secs: d_drain_secs(),
        }
    }
}

fn d_host() -> String {
    "0.0.0.0".into()
}
fn d_port() -> u16 {
    8080
}
fn d_drain_secs() -> u64 {
    20
}
