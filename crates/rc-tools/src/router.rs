//! Tool router (spec §4.5 C5).
//!
//! `Invoke(name, args, tenant)` validates inputs, time-boxes the handler,
//! tags the call with the tenant id (a handler can only ever read the
//! snapshot it was resolved against), and maps every failure onto the
//! `SchemaError`/`NotFound`/`Timeout`/`Empty`/`Upstream` taxonomy. The
//! router keeps no mutable state besides its metrics counters — tenant
//! data is re-resolved fresh from `rc_tenant::TenantCache` on every call
//! so a booking written earlier in the same turn is visible to a later
//! lookup without waiting out the cache TTL.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rc_domain::{TenantSnapshot, ToolErrorTag, ToolOutcome};
use rc_tenant::TenantCache;

use crate::catalogue;

#[derive(Debug, Default)]
pub struct ToolMetrics {
    pub calls: AtomicU64,
    pub timeouts: AtomicU64,
    pub errors: AtomicU64,
}

/// Dispatches tool calls against the fixed catalogue.
pub struct ToolRouter {
    tenants: Arc<TenantCache>,
    metrics: ToolMetrics,
}

impl ToolRouter {
    pub fn new(tenants: Arc<TenantCache>) -> Self {
        Self {
            tenants,
            metrics: ToolMetrics::default(),
        }
    }

    pub fn metrics(&self) -> &ToolMetrics {
        &self.metrics
    }

    /// Invoke a single tool call, enforcing `per_tool_timeout`. The caller
    /// (the conversation engine) is responsible for enforcing the
    /// `max_calls_per_turn` and `total_tool_budget` limits across the turn.
    pub async fn invoke(
        &self,
        name: &str,
        args: &serde_json::Value,
        tenant: &TenantSnapshot,
        per_tool_timeout: Duration,
    ) -> ToolOutcome {
        self.metrics.calls.fetch_add(1, Ordering::Relaxed);

        let outcome = match tokio::time::timeout(per_tool_timeout, self.dispatch(name, args, tenant)).await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                self.metrics.timeouts.fetch_add(1, Ordering::Relaxed);
                return ToolOutcome::Timeout;
            }
        };

        if matches!(outcome, ToolOutcome::Error { .. }) {
            self.metrics.errors.fetch_add(1, Ordering::Relaxed);
        }
        outcome
    }

    async fn dispatch(
        &self,
        name: &str,
        args: &serde_json::Value,
        tenant: &TenantSnapshot,
    ) -> ToolOutcome {
        let tenant_arg = match args.get("tenant").and_then(|v| v.as_str()) {
            Some(t) => t,
            None => {
                return schema_error("missing required field `tenant`");
            }
        };
        if tenant_arg != tenant.tenant_id {
            // A tool call is always dispatched for the call's own tenant
            // snapshot; a mismatched tenant argument is a schema violation,
            // never a cross-tenant read.
            return schema_error("tenant argument does not match the active call's tenant");
        }

        // Re-resolve fresh from the tenant store rather than trust the
        // possibly-stale snapshot the engine was constructed with.
        let fresh = self
            .tenants
            .resolve(&tenant.tenant_id, &tenant.dialed_number);

        match name {
            catalogue::GET_LATEST_BOOKING => get_latest_booking(args, &fresh),
            catalogue::GET_BOOKING_BY_ID => get_booking_by_id(args, &fresh),
            catalogue::GET_BUSINESS_SERVICES => get_business_services(&fresh),
            catalogue::GET_WORKING_HOURS => get_working_hours(&fresh),
            catalogue::GET_POLICIES => get_policies(args, &fresh),
            catalogue::GET_FAQS => get_faqs(args, &fresh),
            other => ToolOutcome::Error {
                tag: ToolErrorTag::NotFound,
                message: format!("unknown tool `{other}`"),
            },
        }
    }
}

fn schema_error(message: &str) -> ToolOutcome {
    ToolOutcome::Error {
        tag: ToolErrorTag::SchemaError,
        message: message.to_owned(),
    }
}

fn require_str<'a>(args: &'a serde_json::Value, field: &str) -> Result<&'a str, ToolOutcome> {
    args.get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| schema_error(&format!("missing required field `{field}`")))
}

fn get_latest_booking(args: &serde_json::Value, tenant: &TenantSnapshot) -> ToolOutcome {
    let phone = match require_str(args, "customer_phone") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match tenant
        .bookings
        .iter()
        .filter(|b| b.customer_phone == phone)
        .max_by_key(|b| b.starts_at)
    {
        Some(booking) => ToolOutcome::Ok {
            payload: serde_json::to_value(booking).unwrap_or_default(),
        },
        None => ToolOutcome::Error {
            tag: ToolErrorTag::NotFound,
            message: format!("no booking found for {phone}"),
        },
    }
}

fn get_booking_by_id(args: &serde_json::Value, tenant: &TenantSnapshot) -> ToolOutcome {
    let id = match require_str(args, "booking_id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match tenant.bookings.iter().find(|b| b.booking_id == id) {
        Some(booking) => ToolOutcome::Ok {
            payload: serde_json::to_value(booking).unwrap_or_default(),
        },
        None => ToolOutcome::Error {
            tag: ToolErrorTag::NotFound,
            message: format!("no booking with id {id}"),
        },
    }
}

fn get_business_services(tenant: &TenantSnapshot) -> ToolOutcome {
    if tenant.services.is_empty() {
        return ToolOutcome::Error {
            tag: ToolErrorTag::Empty,
            message: "no services configured".into(),
        };
    }
    ToolOutcome::Ok {
        payload: serde_json::to_value(&tenant.services).unwrap_or_default(),
    }
}

fn get_working_hours(tenant: &TenantSnapshot) -> ToolOutcome {
    if tenant.working_hours.is_empty() {
        return ToolOutcome::Error {
            tag: ToolErrorTag::Empty,
            message: "no working hours configured".into(),
        };
    }
    ToolOutcome::Ok {
        payload: serde_json::to_value(&tenant.working_hours).unwrap_or_default(),
    }
}

fn get_policies(args: &serde_json::Value, tenant: &TenantSnapshot) -> ToolOutcome {
    let topic = match require_str(args, "topic") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match tenant.policies.get(topic) {
        Some(text) if !text.is_empty() => ToolOutcome::Ok {
            payload: serde_json::json!({ "topic": topic, "text": text }),
        },
        _ => ToolOutcome::Error {
            tag: ToolErrorTag::Empty,
            message: format!("no policy for topic `{topic}`"),
        },
    }
}

fn get_faqs(args: &serde_json::Value, tenant: &TenantSnapshot) -> ToolOutcome {
    let topic = match require_str(args, "topic") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match tenant.faqs.get(topic) {
        Some(text) if !text.is_empty() => ToolOutcome::Ok {
            payload: serde_json::json!({ "topic": topic, "text": text }),
        },
        _ => ToolOutcome::Error {
            tag: ToolErrorTag::Empty,
            message: format!("no FAQ for topic `{topic}`"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn tenant_with_one_booking() -> Arc<TenantCache> {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(
            br#"
            [[tenant]]
            tenant_id = "acme-plumb"
            dialed_number = "+15551230000"
            display_name = "Acme Plumbing"

            [[tenant.services]]
            name = "Drain cleaning"
            duration_minutes = 60

            [[tenant.bookings]]
            booking_id = "bk-1"
            customer_phone = "+15559990000"
            service = "Drain cleaning"
            starts_at = "2026-01-01T10:00:00Z"
            status = "confirmed"

            [tenant.policies]
            cancellation = "Cancel 24h ahead for a full refund."
            "#,
        )
        .unwrap();
        let store = rc_tenant::TenantStore::load(f.path()).unwrap();
        Arc::new(TenantCache::new(store, Duration::from_secs(60)))
    }

    fn snapshot(cache: &TenantCache) -> TenantSnapshot {
        cache.resolve("acme-plumb", "+15551230000")
    }

    #[tokio::test]
    async fn missing_tenant_field_is_schema_error() {
        let cache = tenant_with_one_booking();
        let tenant = snapshot(&cache);
        let router = ToolRouter::new(cache);
        let outcome = router
            .invoke(
                catalogue::GET_BUSINESS_SERVICES,
                &serde_json::json!({}),
                &tenant,
                Duration::from_millis(400),
            )
            .await;
        assert!(matches!(
            outcome,
            ToolOutcome::Error { tag: ToolErrorTag::SchemaError, .. }
        ));
    }

    #[tokio::test]
    async fn mismatched_tenant_argument_is_schema_error() {
        let cache = tenant_with_one_booking();
        let tenant = snapshot(&cache);
        let router = ToolRouter::new(cache);
        let outcome = router
            .invoke(
                catalogue::GET_BUSINESS_SERVICES,
                &serde_json::json!({"tenant": "someone-else"}),
                &tenant,
                Duration::from_millis(400),
            )
            .await;
        assert!(matches!(
            outcome,
            ToolOutcome::Error { tag: ToolErrorTag::SchemaError, .. }
        ));
    }

    #[tokio::test]
    async fn latest_booking_found() {
        let cache = tenant_with_one_booking();
        let tenant = snapshot(&cache);
        let router = ToolRouter::new(cache);
        let outcome = router
            .invoke(
                catalogue::GET_LATEST_BOOKING,
                &serde_json::json!({"tenant": "acme-plumb", "customer_phone": "+15559990000"}),
                &tenant,
                Duration::from_millis(400),
            )
            .await;
        assert!(matches!(outcome, ToolOutcome::Ok { .. }));
    }

    #[tokio::test]
    async fn missing_topic_policy_is_empty() {
        let cache = tenant_with_one_booking();
        let tenant = snapshot(&cache);
        let router = ToolRouter::new(cache);
        let outcome = router
            .invoke(
                catalogue::GET_POLICIES,
                &serde_json::json!({"tenant": "acme-plumb", "topic": "refunds"}),
                &tenant,
                Duration::from_millis(400),
            )
            .await;
        assert!(matches!(
            outcome,
            ToolOutcome::Error { tag: ToolErrorTag::Empty, .. }
        ));
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let cache = tenant_with_one_booking();
        let tenant = snapshot(&cache);
        let router = ToolRouter::new(cache);
        let outcome = router
            .invoke(
                "delete_everything",
                &serde_json::json!({"tenant": "acme-plumb"}),
                &tenant,
                Duration::from_millis(400),
            )
            .await;
        assert!(matches!(
            outcome,
            ToolOutcome::Error { tag: ToolErrorTag::NotFound, .. }
        ));
    }
}
