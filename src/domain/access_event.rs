//! Access event model for asynchronous access recording.

/// An in-memory representation of one successful resolution, queued for
/// asynchronous processing.
///
/// Decouples the redirect response from the database write: the resolver
/// sends the event to a bounded channel and returns immediately, while
/// [`crate::domain::access_worker::run_access_worker`] applies the increment.
#[derive(Debug, Clone)]
pub struct AccessEvent {
    pub short_code: String,
    /// Client IP as reported by the embedding HTTP layer, if any.
    pub ip: Option<String>,
}

impl AccessEvent {
    pub fn new(short_code: impl Into<String>, ip: Option<String>) -> Self {
        Self {
            short_code: short_code.into(),
            ip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_event_creation() {
        let event = AccessEvent::new("abc123", Some("192.168.1.1".to_string()));
        assert_eq!(event.short_code, "abc123");
        assert_eq!(event.ip.as_deref(), Some("192.168.1.1"));

        let anonymous = AccessEvent::new("xyz", None);
        assert!(anonymous.ip.is_none());
    }
}
