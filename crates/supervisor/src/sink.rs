//! Destination for decoded notifications.

/// Displays agent notifications to the user.
///
/// Called from the stdout pump task, once per decoded line, in arrival
/// order. Implementations must not block for long; the agent stalls when
/// its stdout pipe fills.
pub trait NotificationSink: Send + Sync + 'static {
    fn notify(&self, message: &str);
}

impl<F> NotificationSink for F
where
    F: Fn(&str) + Send + Sync + 'static,
{
    fn notify(&self, message: &str) {
        self(message)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn closure_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        let sink: Arc<dyn NotificationSink> =
            Arc::new(move |msg: &str| seen2.lock().unwrap().push(msg.to_string()));

        sink.notify("a");
        sink.notify("b");
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    }
}
