use serde::{Deserialize, Serialize};

/// Tenant-resolution cache configuration (spec §4.9, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    #[serde(default = "d_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Directory or source URI the tenant snapshots are loaded from.
    #[serde(default = "d_source")]
    pub source: String,
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: d_cache_ttl_secs(),
            source: d_source(),
        }
    }
}

fn d_cache_ttl_secs() -> u64 {
    300
}
fn d_source() -> String {
    "tenants.toml".into()
}
