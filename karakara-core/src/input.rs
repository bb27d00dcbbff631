use strum::EnumIter;

use crate::queue::QueueItemStatus;

/// Local controls of the player display
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum KeyAction {
    /// `s`
    Skip,
    /// `Enter`
    Confirm,
    /// `Escape`
    Cancel,
    /// `Space`
    Toggle,
}

impl KeyAction {
    /// Look up a key by its browser-style name
    pub fn from_key_name(key: &str) -> Option<Self> {
        match key {
            "s" => Some(KeyAction::Skip),
            "Enter" => Some(KeyAction::Confirm),
            "Escape" => Some(KeyAction::Cancel),
            " " | "Space" => Some(KeyAction::Toggle),
            _ => None,
        }
    }

    pub fn status(self) -> QueueItemStatus {
        match self {
            KeyAction::Skip => QueueItemStatus::Skipped,
            KeyAction::Confirm => QueueItemStatus::Playing,
            KeyAction::Cancel => QueueItemStatus::Pending,
            KeyAction::Toggle => QueueItemStatus::Paused,
        }
    }
}

/// Receiver of status-change requests
pub trait StatusSink {
    fn request_status_change(&self, status: QueueItemStatus);
}

/// Apply a key press. Returns true when the key was handled and its default should be suppressed.
pub fn handle_key<S: StatusSink + ?Sized>(action: Option<KeyAction>, sink: &S) -> bool {
    match action {
        Some(action) => {
            log::debug!("key {:?} -> {}", action, action.status());
            sink.request_status_change(action.status());
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use strum::IntoEnumIterator;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<QueueItemStatus>>);

    impl StatusSink for Recorder {
        fn request_status_change(&self, status: QueueItemStatus) {
            self.0.borrow_mut().push(status);
        }
    }

    #[test]
    fn named_keys_map_to_statuses() {
        let recorder = Recorder::default();
        for key in ["s", "Enter", "Escape", " "] {
            assert!(handle_key(KeyAction::from_key_name(key), &recorder));
        }
        assert_eq!(
            *recorder.0.borrow(),
            vec![
                QueueItemStatus::Skipped,
                QueueItemStatus::Playing,
                QueueItemStatus::Pending,
                QueueItemStatus::Paused,
            ]
        );
    }

    #[test]
    fn unmapped_keys_pass_through() {
        let recorder = Recorder::default();
        assert!(!handle_key(KeyAction::from_key_name("ArrowLeft"), &recorder));
        assert!(!handle_key(KeyAction::from_key_name("S"), &recorder));
        assert!(recorder.0.borrow().is_empty());
    }

    #[test]
    fn every_action_targets_a_distinct_status() {
        let statuses: HashSet<_> = KeyAction::iter().map(KeyAction::status).collect();
        assert_eq!(statuses.len(), KeyAction::iter().count());
    }
}
