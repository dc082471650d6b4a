//! Booking and SMS side-effect sinks (spec §1, §4.7, §6).
//!
//! The booking record writer and SMS sender are collaborators outside the
//! core's scope (spec §1: "appear only as side-effect sinks invoked by
//! tool handlers"); the call session invokes them directly once a booking
//! intent is detected in the completed turn, never through the read-only
//! tool router. A failure of either sink must not fail the call — it is
//! logged and surfaced only through the call's metrics record.

use async_trait::async_trait;

use rc_domain::Result;

/// Writes a completed booking to the tenant's booking store.
#[async_trait]
pub trait BookingSink: Send + Sync {
    async fn create_booking(&self, request: BookingRequest<'_>) -> Result<()>;
}

/// Sends a confirmation SMS to the caller.
#[async_trait]
pub trait SmsSink: Send + Sync {
    async fn send_confirmation(&self, to: &str, message: &str) -> Result<()>;
}

pub struct BookingRequest<'a> {
    pub tenant_id: &'a str,
    pub call_id: &'a str,
    pub caller_phone: &'a str,
    /// The assistant's confirming utterance, kept verbatim as the booking
    /// summary — the core does not parse it into a structured record; that
    /// belongs to the (out-of-scope) administration surface.
    pub summary: &'a str,
}

/// Logs instead of writing anywhere — stands in for the administration
/// surface's real booking writer and SMS sender, both explicitly out of
/// scope (spec §1). Keeps the session runnable end-to-end in `doctor` and
/// in tests without a live downstream dependency.
pub struct LoggingBookingSink;

#[async_trait]
impl BookingSink for LoggingBookingSink {
    async fn create_booking(&self, request: BookingRequest<'_>) -> Result<()> {
        tracing::info!(
            tenant_id = request.tenant_id,
            call_id = request.call_id,
            caller_phone = request.caller_phone,
            summary = request.summary,
            "booking sink invoked"
        );
        Ok(())
    }
}

pub struct LoggingSmsSink;

#[async_trait]
impl SmsSink for LoggingSmsSink {
    async fn send_confirmation(&self, to: &str, message: &str) -> Result<()> {
        tracing::info!(to, message, "sms sink invoked");
        Ok(())
    }
}

/// Scans an assistant turn's text for a booking confirmation phrase (spec
/// §4.7, scenario 1: `"Booked for tomorrow at 9 AM."`). Deliberately a
/// plain substring scan, not a parser — the engine only ever needs to
/// decide *whether* to fire the sinks, never to extract structured fields
/// from the sentence.
pub fn looks_like_booking_confirmation(text: &str) -> bool {
    const PHRASES: [&str; 6] = [
        "booked for",
        "you're booked",
        "youre booked",
        "confirmed your booking",
        "appointment is set",
        "booking is confirmed",
    ];
    let lower = text.to_lowercase();
    PHRASES.iter().any(|p| lower.contains(p))
}
