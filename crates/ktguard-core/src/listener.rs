//! Run listeners.
//!
//! Listeners observe a run: the file list up front, each file before and
//! after processing, and the end of the run. Callbacks may arrive from
//! several worker threads at once.

use crate::types::Violation;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Observer of a run.
pub trait ProcessorListener: Send + Sync {
    /// Called once with every file that will be processed.
    fn before_all(&self, files: &[PathBuf]) {
        let _ = files;
    }

    /// Called before a file is read.
    fn before(&self, file: &Path) {
        let _ = file;
    }

    /// Called with the final violations of a file, after baseline
    /// filtering. `file` is relative to the run root.
    fn after(&self, file: &Path, violations: &[Violation]) {
        let _ = (file, violations);
    }

    /// Called once when every file has been handled.
    fn after_all(&self) {}
}

/// Shared listener handle.
pub type ListenerRef = Arc<dyn ProcessorListener>;

/// Forwards every callback to each listener in order.
#[derive(Default, Clone)]
pub struct ListenerSet {
    listeners: Vec<ListenerRef>,
}

impl ListenerSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener.
    pub fn push(&mut self, listener: ListenerRef) {
        self.listeners.push(listener);
    }

    /// Number of listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Returns `true` if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl ProcessorListener for ListenerSet {
    fn before_all(&self, files: &[PathBuf]) {
        self.listeners.iter().for_each(|l| l.before_all(files));
    }

    fn before(&self, file: &Path) {
        self.listeners.iter().for_each(|l| l.before(file));
    }

    fn after(&self, file: &Path, violations: &[Violation]) {
        self.listeners.iter().for_each(|l| l.after(file, violations));
    }

    fn after_all(&self) {
        self.listeners.iter().for_each(|l| l.after_all());
    }
}

/// Logs progress at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingListener;

impl ProcessorListener for LoggingListener {
    fn before_all(&self, files: &[PathBuf]) {
        debug!("Processing {} file(s)", files.len());
    }

    fn before(&self, file: &Path) {
        debug!("Analyzing: {}", file.display());
    }

    fn after(&self, file: &Path, violations: &[Violation]) {
        debug!("{}: {} violation(s)", file.display(), violations.len());
    }

    fn after_all(&self) {
        debug!("All files processed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ProcessorListener for Recorder {
        fn before_all(&self, files: &[PathBuf]) {
            self.events.lock().unwrap().push(format!("before_all {}", files.len()));
        }

        fn after(&self, file: &Path, violations: &[Violation]) {
            self.events
                .lock()
                .unwrap()
                .push(format!("after {} {}", file.display(), violations.len()));
        }

        fn after_all(&self) {
            self.events.lock().unwrap().push("after_all".to_string());
        }
    }

    #[test]
    fn listener_set_forwards_in_order() {
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let mut set = ListenerSet::new();
        set.push(first.clone());
        set.push(Arc::new(LoggingListener));
        set.push(second.clone());
        assert_eq!(set.len(), 3);

        set.before_all(&[PathBuf::from("A.kt")]);
        set.before(Path::new("A.kt"));
        set.after(Path::new("A.kt"), &[]);
        set.after_all();

        let expected = ["before_all 1", "after A.kt 0", "after_all"];
        assert_eq!(*first.events.lock().unwrap(), expected);
        assert_eq!(*second.events.lock().unwrap(), expected);
    }
}
