//! The fixed, read-only tool catalogue (spec §4.5, §6). Every handler is
//! tenant-scoped and reads only from the tenant snapshot passed to it — it
//! never reaches another tenant's data.

use rc_domain::ToolDefinition;

pub const GET_LATEST_BOOKING: &str = "get_latest_booking";
pub const GET_BOOKING_BY_ID: &str = "get_booking_by_id";
pub const GET_BUSINESS_SERVICES: &str = "get_business_services";
pub const GET_WORKING_HOURS: &str = "get_working_hours";
pub const GET_POLICIES: &str = "get_policies";
pub const GET_FAQS: &str = "get_faqs";

/// Build the tool definitions advertised to the LLM (spec §4.4/§4.5).
pub fn build_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: GET_LATEST_BOOKING.into(),
            description: "Look up the caller's most recent booking by phone number.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "tenant": {"type": "string"},
                    "customer_phone": {"type": "string"},
                },
                "required": ["tenant", "customer_phone"],
            }),
        },
        ToolDefinition {
            name: GET_BOOKING_BY_ID.into(),
            description: "Look up a booking by its id.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "tenant": {"type": "string"},
                    "booking_id": {"type": "string"},
                },
                "required": ["tenant", "booking_id"],
            }),
        },
        ToolDefinition {
            name: GET_BUSINESS_SERVICES.into(),
            description: "List the services this business offers.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {"tenant": {"type": "string"}},
                "required": ["tenant"],
            }),
        },
        ToolDefinition {
            name: GET_WORKING_HOURS.into(),
            description: "Get the business's working hours.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {"tenant": {"type": "string"}},
                "required": ["tenant"],
            }),
        },
        ToolDefinition {
            name: GET_POLICIES.into(),
            description: "Get business policy text for a topic (e.g. cancellation).".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "tenant": {"type": "string"},
                    "topic": {"type": "string"},
                },
                "required": ["tenant", "topic"],
            }),
        },
        ToolDefinition {
            name: GET_FAQS.into(),
            description: "Get the FAQ answer for a topic.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "tenant": {"type": "string"},
                    "topic": {"type": "string"},
                },
                "required": ["tenant", "topic"],
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_has_six_tools() {
        assert_eq!(build_tool_definitions().len(), 6);
    }

    #[test]
    fn every_tool_requires_tenant() {
        for def in build_tool_definitions() {
            let required = def.parameters["required"].as_array().unwrap();
            assert!(
                required.iter().any(|v| v == "tenant"),
                "{} must require tenant",
                def.name
            );
        }
    }
}
