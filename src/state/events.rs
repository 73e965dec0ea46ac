//! Notifications raised by the image manager
//!
//! Observers register a callback with the `Notifier`; every event is
//! delivered synchronously, in the order the manager raised it.

use super::data::ImageRecord;

#[derive(Debug, Clone, PartialEq)]
pub enum ManagerEvent {
    /// An image was selected (`true`) or unselected (`false`)
    SelectionChanged(ImageRecord, bool),
    /// Number of selected images after a selection change or removal
    SelectionCountChanged(usize),
    ImageAdded(ImageRecord),
    ImageRemoved(ImageRecord),
    /// A generation job started (`true`) or its outcome was applied (`false`)
    LoadingChanged(bool),
    /// A generation request was dropped
    GenerationFailed(String),
}

type Listener = Box<dyn FnMut(&ManagerEvent) + Send>;

/// Observer registry
#[derive(Default)]
pub struct Notifier {
    listeners: Vec<Listener>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&ManagerEvent) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn emit(&mut self, event: ManagerEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_every_listener_sees_events_in_order() {
        let mut notifier = Notifier::new();
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&first);
        notifier.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
        let sink = Arc::clone(&second);
        notifier.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        notifier.emit(ManagerEvent::LoadingChanged(true));
        notifier.emit(ManagerEvent::SelectionCountChanged(1));

        let expected = vec![
            ManagerEvent::LoadingChanged(true),
            ManagerEvent::SelectionCountChanged(1),
        ];
        assert_eq!(*first.lock().unwrap(), expected);
        assert_eq!(*second.lock().unwrap(), expected);
    }
}
