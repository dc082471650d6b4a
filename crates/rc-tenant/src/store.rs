//! On-disk tenant store (spec §4.9 "read from the tenant store").
//!
//! The administration surface that actually produces `tenants.toml` is out
//! of scope (spec "Explicitly out of scope") — this store only reads it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rc_domain::model::{BookingRecord, ServiceEntry, WorkingHoursEntry};
use rc_domain::{Error, Greeting, Result, TenantSnapshot, ToolPolicy, VoiceConfig};
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
struct TenantFile {
    #[serde(default)]
    tenant: Vec<TenantRecord>,
}

#[derive(Debug, Deserialize)]
struct TenantRecord {
    tenant_id: String,
    dialed_number: String,
    display_name: String,
    #[serde(default = "d_industry")]
    industry: String,
    #[serde(default = "d_language")]
    language: String,
    #[serde(default = "d_tone")]
    tone: String,
    greeting_text: Option<String>,
    greeting_audio_ref: Option<String>,
    #[serde(default)]
    voice_provider: Option<String>,
    #[serde(default)]
    voice_id: Option<String>,
    #[serde(default)]
    voice_sample_rate: Option<u32>,
    #[serde(default)]
    voice_encoding: Option<String>,
    #[serde(default)]
    prompt_vars: HashMap<String, String>,
    #[serde(default)]
    max_calls_per_turn: Option<u32>,
    #[serde(default)]
    per_tool_timeout_ms: Option<u64>,
    #[serde(default)]
    total_tool_budget_ms: Option<u64>,
    #[serde(default)]
    services: Vec<ServiceEntry>,
    #[serde(default)]
    working_hours: Vec<WorkingHoursEntry>,
    #[serde(default)]
    policies: HashMap<String, String>,
    #[serde(default)]
    faqs: HashMap<String, String>,
    #[serde(default)]
    bookings: Vec<BookingRecord>,
}

fn d_industry() -> String {
    "general".into()
}
fn d_language() -> String {
    "en".into()
}
fn d_tone() -> String {
    "neutral".into()
}

impl TenantRecord {
    fn into_snapshot(self) -> TenantSnapshot {
        let voice = VoiceConfig {
            provider: self.voice_provider.unwrap_or_else(|| "generic".into()),
            voice_id: self.voice_id.unwrap_or_else(|| "default".into()),
            sample_rate: self.voice_sample_rate.unwrap_or(8_000),
            encoding: self.voice_encoding.unwrap_or_else(|| "mulaw".into()),
        };
        let greeting = match (self.greeting_audio_ref, self.greeting_text) {
            (Some(audio), _) => Greeting::AudioRef(audio),
            (None, Some(text)) => Greeting::Text(text),
            (None, None) => Greeting::Text(format!(
                "Thanks for calling {}. How can I help you today?",
                self.display_name
            )),
        };
        let tool_policy = ToolPolicy {
            max_calls_per_turn: self.max_calls_per_turn.unwrap_or(2),
            per_tool_timeout: Duration::from_millis(self.per_tool_timeout_ms.unwrap_or(400)),
            total_tool_budget: Duration::from_millis(self.total_tool_budget_ms.unwrap_or(1_000)),
        };
        TenantSnapshot {
            tenant_id: self.tenant_id,
            display_name: self.display_name,
            industry: self.industry,
            language: self.language,
            tone: self.tone,
            dialed_number: self.dialed_number,
            greeting,
            voice,
            prompt_vars: self.prompt_vars,
            tool_policy,
            services: self.services,
            working_hours: self.working_hours,
            policies: self.policies,
            faqs: self.faqs,
            bookings: self.bookings,
            is_generic: false,
        }
    }
}

/// Read-only view over the tenant records loaded from `tenants.toml`.
pub struct TenantStore {
    path: PathBuf,
    by_id: HashMap<String, TenantSnapshot>,
    by_dialed_number: HashMap<String, String>,
}

impl TenantStore {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(Error::Io(e)),
        };
        let file: TenantFile =
            toml::from_str(&raw).map_err(|e| Error::Other(format!("parsing {}: {e}", path.display())))?;

        let mut by_id = HashMap::new();
        let mut by_dialed_number = HashMap::new();
        for record in file.tenant {
            let dialed = record.dialed_number.clone();
            let id = record.tenant_id.clone();
            by_dialed_number.insert(dialed, id.clone());
            by_id.insert(id, record.into_snapshot());
        }

        tracing::info!(tenants = by_id.len(), path = %path.display(), "tenant store loaded");

        Ok(Self {
            path: path.to_path_buf(),
            by_id,
            by_dialed_number,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve by the tenant id carried in the carrier `start` event's
    /// custom parameters, falling back to the dialed number (spec §4.9).
    pub fn resolve(&self, tenant_key: &str, dialed_number: &str) -> Option<TenantSnapshot> {
        if let Some(snap) = self.by_id.get(tenant_key) {
            return Some(snap.clone());
        }
        let id = self.by_dialed_number.get(dialed_number)?;
        self.by_id.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn missing_file_loads_empty() {
        let store = TenantStore::load(Path::new("/nonexistent/tenants.toml")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn resolves_by_tenant_id() {
        let f = write_temp(
            r#"
            [[tenant]]
            tenant_id = "acme-plumb"
            dialed_number = "+15551230000"
            display_name = "Acme Plumbing"
            "#,
        );
        let store = TenantStore::load(f.path()).unwrap();
        let snap = store.resolve("acme-plumb", "unused").unwrap();
        assert_eq!(snap.display_name, "Acme Plumbing");
        assert!(!snap.is_generic);
    }

    #[test]
    fn resolves_by_dialed_number_fallback() {
        let f = write_temp(
            r#"
            [[tenant]]
            tenant_id = "acme-plumb"
            dialed_number = "+15551230000"
            display_name = "Acme Plumbing"
            "#,
        );
        let store = TenantStore::load(f.path()).unwrap();
        let snap = store.resolve("not-a-real-key", "+15551230000").unwrap();
        assert_eq!(snap.tenant_id, "acme-plumb");
    }

    #[test]
    fn unknown_tenant_resolves_to_none() {
        let store = TenantStore::load(Path::new("/nonexistent/tenants.toml")).unwrap();
        assert!(store.resolve("nope", "nope").is_none());
    }
}
