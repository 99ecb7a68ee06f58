//! Bounded retry for upstream calls, plus the error-message normalizer the
//! auth endpoints use.
//!
//! Retrying is allow-listed: only messages that look like transport trouble
//! ("fetch", HTTP 521, "Network request failed", "Web server is down") are
//! worth a second attempt. User errors such as a wrong password must surface
//! on the first try.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);

const TRANSIENT_MARKERS: [&str; 4] = [
    "fetch",
    "521",
    "Network request failed",
    "Web server is down",
];

/// Does this error message look like a transient transport failure?
pub fn is_transient(message: &str) -> bool {
    TRANSIENT_MARKERS.iter().any(|m| message.contains(m))
}

/// Run `op` up to `max_attempts` times with doubling delays in between.
/// Non-transient errors and the final attempt's error are returned as-is.
pub async fn retry_with_backoff<T, E, F, Fut>(
    max_attempts: u32,
    initial_delay: Duration,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = initial_delay;
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= max_attempts || !is_transient(&err.to_string()) {
                    return Err(err);
                }
                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient upstream error, backing off"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
    }
}

/// Map a raw upstream error to something a citizen can act on. Short
/// messages that are not HTML pass through untouched; everything else gets a
/// canned text keyed off known substrings.
pub fn friendly_error_message(raw: &str) -> String {
    if raw.contains("fetch") && raw.contains("failed") {
        return "Unable to connect to the authentication service. The service may be initializing. \
Please wait a moment and try again."
            .to_string();
    }
    if raw.contains("Unexpected token") || raw.contains("not valid JSON") {
        return "Authentication service is temporarily unavailable. Please try again in a few minutes."
            .to_string();
    }
    if raw.contains("User already registered") {
        return "An account with this email already exists. Please login instead.".to_string();
    }
    if raw.contains("Invalid login credentials") {
        return "Invalid email or password. Please check your credentials and try again.".to_string();
    }
    if raw.contains("Email not confirmed") {
        return "Please verify your email address before logging in. Check your inbox for the \
confirmation link."
            .to_string();
    }
    if raw.contains("Network request failed") || raw.contains("521") {
        return "Network error: Unable to reach the authentication service. Please try again shortly."
            .to_string();
    }
    if raw.len() < 100 && !raw.contains("<!DOCTYPE") {
        return raw.to_string();
    }
    "An unexpected error occurred. Please try again or contact support if the issue persists."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<&str, String> =
            retry_with_backoff(DEFAULT_MAX_ATTEMPTS, DEFAULT_INITIAL_DELAY, move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("fetch failed: connection refused".to_string())
                    } else {
                        Ok("signed in")
                    }
                }
            })
            .await;

        assert_eq!(result, Ok("signed in"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn delays_double_between_attempts() {
        let t0 = tokio::time::Instant::now();
        let result: Result<(), String> =
            retry_with_backoff(DEFAULT_MAX_ATTEMPTS, DEFAULT_INITIAL_DELAY, || async {
                Err("521 origin down".to_string())
            })
            .await;

        assert!(result.is_err());
        // 1s after the first attempt, 2s after the second, none after the last.
        assert_eq!(t0.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn user_errors_are_never_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), String> =
            retry_with_backoff(DEFAULT_MAX_ATTEMPTS, DEFAULT_INITIAL_DELAY, move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err("Invalid login credentials".to_string())
                }
            })
            .await;

        assert_eq!(result.unwrap_err(), "Invalid login credentials");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn transient_marker_detection() {
        assert!(is_transient("fetch failed"));
        assert!(is_transient("error 521 from origin"));
        assert!(is_transient("Network request failed"));
        assert!(is_transient("Web server is down"));
        assert!(!is_transient("User already registered"));
        assert!(!is_transient("timeout"));
    }

    #[test]
    fn known_upstream_errors_get_friendly_texts() {
        assert!(friendly_error_message("TypeError: fetch failed").contains("Unable to connect"));
        assert!(
            friendly_error_message("Unexpected token < in JSON").contains("temporarily unavailable")
        );
        assert_eq!(
            friendly_error_message("User already registered"),
            "An account with this email already exists. Please login instead."
        );
        assert_eq!(
            friendly_error_message("Invalid login credentials"),
            "Invalid email or password. Please check your credentials and try again."
        );
        assert!(friendly_error_message("Email not confirmed").contains("verify your email"));
        assert!(friendly_error_message("Network request failed").starts_with("Network error:"));
        assert!(friendly_error_message("error 521").starts_with("Network error:"));
    }

    #[test]
    fn short_plain_messages_pass_through() {
        assert_eq!(
            friendly_error_message("Password should be at least 6 characters"),
            "Password should be at least 6 characters"
        );
    }

    #[test]
    fn html_and_walls_of_text_become_generic() {
        let html = "<!DOCTYPE html><html><body>502 Bad Gateway</body></html>";
        assert!(friendly_error_message(html).starts_with("An unexpected error occurred"));

        let wall = "x".repeat(200);
        assert!(friendly_error_message(&wall).starts_with("An unexpected error occurred"));
    }
}
