//! Page-level change notifications.

use std::{cell::RefCell, rc::Rc};

use crate::view::ViewUpdate;

/// Receives per-page notifications from a [`Tree`](super::Tree).
///
/// Each page has its own row space, so updates are addressed by page path.
/// Within one bracket, pages are reported bottom-up: a child page's update
/// arrives before its parent's. All methods default to doing nothing.
pub trait TreeObserver {
    fn begin_structural_change(&mut self) {}

    fn end_structural_change(&mut self) {}

    /// The visible children of the page at `path` changed.
    fn page_updated(&mut self, _path: &str, _update: &ViewUpdate) {}

    /// Everything at and below `path` was rebuilt; cached rows are void.
    fn page_reset(&mut self, _path: &str) {}
}

/// One tree event, as recorded by [`TreeRecorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    Begin,
    End,
    PageUpdated { path: String, update: ViewUpdate },
    PageReset(String),
}

/// Observer that appends every notification to a shared log.
#[derive(Debug, Clone, Default)]
pub struct TreeRecorder {
    log: Rc<RefCell<Vec<TreeEvent>>>,
}

impl TreeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains the recorded events.
    pub fn take(&self) -> Vec<TreeEvent> {
        std::mem::take(&mut *self.log.borrow_mut())
    }

    /// Paths of the pages updated so far, in notification order.
    pub fn updated_paths(&self) -> Vec<String> {
        self.log
            .borrow()
            .iter()
            .filter_map(|event| match event {
                TreeEvent::PageUpdated { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }
}

impl TreeObserver for TreeRecorder {
    fn begin_structural_change(&mut self) {
        self.log.borrow_mut().push(TreeEvent::Begin);
    }

    fn end_structural_change(&mut self) {
        self.log.borrow_mut().push(TreeEvent::End);
    }

    fn page_updated(&mut self, path: &str, update: &ViewUpdate) {
        self.log.borrow_mut().push(TreeEvent::PageUpdated {
            path: path.to_string(),
            update: update.clone(),
        });
    }

    fn page_reset(&mut self, path: &str) {
        self.log
            .borrow_mut()
            .push(TreeEvent::PageReset(path.to_string()));
    }
}
