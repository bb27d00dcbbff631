/// Notifications the server pushes over the persistent channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
pub enum Notification {
    #[strum(serialize = "queue_updated")]
    QueueUpdated,
    #[strum(serialize = "settings")]
    Settings,
}

/// Receiver of the refreshes a notification asks for
pub trait RefreshSink {
    fn refresh_queue(&self);
    fn refresh_settings(&self);
}

/// Map one inbound frame to its refresh. Matching is exact and case-sensitive
/// after trimming; every call triggers its own refresh.
pub fn dispatch<S: RefreshSink + ?Sized>(message: &str, sink: &S) -> Option<Notification> {
    let command = message.trim();
    log::debug!("websocket message: {}", command);

    let Ok(notification) = command.parse::<Notification>() else {
        log::info!("unknown command: {}", command);
        return None;
    };

    match notification {
        Notification::QueueUpdated => sink.refresh_queue(),
        Notification::Settings => sink.refresh_settings(),
    }
    Some(notification)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct Counter {
        queue: Cell<u32>,
        settings: Cell<u32>,
    }

    impl RefreshSink for Counter {
        fn refresh_queue(&self) {
            self.queue.set(self.queue.get() + 1);
        }

        fn refresh_settings(&self) {
            self.settings.set(self.settings.get() + 1);
        }
    }

    #[test]
    fn trimmed_queue_updated_refreshes_queue_once() {
        let counter = Counter::default();
        assert_eq!(
            dispatch(" queue_updated \n", &counter),
            Some(Notification::QueueUpdated)
        );
        assert_eq!(counter.queue.get(), 1);
        assert_eq!(counter.settings.get(), 0);
    }

    #[test]
    fn matching_is_case_sensitive_and_exact() {
        let counter = Counter::default();
        assert_eq!(dispatch("QUEUE_UPDATED", &counter), None);
        assert_eq!(dispatch("queue_updated_now", &counter), None);
        assert_eq!(dispatch("queue", &counter), None);
        assert_eq!(dispatch("", &counter), None);
        assert_eq!(counter.queue.get(), 0);
        assert_eq!(counter.settings.get(), 0);
    }

    #[test]
    fn repeated_notifications_are_not_coalesced() {
        let counter = Counter::default();
        for _ in 0..3 {
            dispatch("settings", &counter);
        }
        dispatch("queue_updated", &counter);
        assert_eq!(counter.settings.get(), 3);
        assert_eq!(counter.queue.get(), 1);
    }
}
