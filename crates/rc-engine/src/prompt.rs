//! System-prompt rendering (spec §3 "system-prompt template variables",
//! §4.6 step 1).

use rc_domain::TenantSnapshot;

const BASE_TEMPLATE: &str = "You are the phone receptionist for {business_name}, a {industry} \
business. Reply in {language}, in a {tone} tone. This is a live voice call — keep answers short \
and conversational, never a bulleted list. Only state hours, pricing, policies, or bookings that \
a tool call just returned; never invent them.";

/// Render the base template for a tenant, substituting any additional
/// `prompt_vars` the tenant snapshot carries.
pub fn build_system_prompt(tenant: &TenantSnapshot) -> String {
    let mut rendered = BASE_TEMPLATE
        .replace("{business_name}", &tenant.display_name)
        .replace("{industry}", &tenant.industry)
        .replace("{language}", &tenant.language)
        .replace("{tone}", &tenant.tone);

    for (key, value) in &tenant.prompt_vars {
        rendered = rendered.replace(&format!("{{{key}}}"), value);
    }

    if tenant.is_generic {
        rendered.push_str(
            " No tenant-specific records are available for this call; offer to take a message \
            rather than guessing at specifics.",
        );
    }

    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_core_fields() {
        let tenant = TenantSnapshot::generic();
        let prompt = build_system_prompt(&tenant);
        assert!(prompt.contains("our office"));
        assert!(prompt.contains("general"));
    }

    #[test]
    fn generic_snapshot_gets_disclaimer() {
        let tenant = TenantSnapshot::generic();
        assert!(build_system_prompt(&tenant).contains("No tenant-specific records"));
    }

    #[test]
    fn tenant_fields_override_generic_defaults() {
        let mut tenant = TenantSnapshot::generic();
        tenant.display_name = "Acme Plumbing".into();
        tenant.tone = "friendly".into();
        tenant.is_generic = false;
        let prompt = build_system_prompt(&tenant);
        assert!(prompt.contains("Acme Plumbing"));
        assert!(prompt.contains("friendly"));
        assert!(!prompt.contains("No tenant-specific records"));
    }
}
