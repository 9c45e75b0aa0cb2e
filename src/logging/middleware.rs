//! Request ID generation

use uuid::Uuid;

/// Generate a correlation id for one gateway request.
///
/// The same id tags every fallback attempt, the recorded outcome and the
/// `X-ClawGate-Request-Id` response header.
///
/// # Examples
///
/// ```
/// use clawgate::logging::generate_request_id;
///
/// let request_id = generate_request_id();
/// assert!(request_id.starts_with("clawgate-"));
/// ```
pub fn generate_request_id() -> String {
    format!("clawgate-{}", Uuid::new_v4())
}
