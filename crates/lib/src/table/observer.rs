//! Row-level change notifications.

use std::ops::Range;

use crate::view::PositionMap;

/// Receives row-addressed notifications from a [`Table`](super::Table).
///
/// Every structural change is bracketed by [`begin_structural_change`] and
/// [`end_structural_change`]; the bracket closes even when the change fails.
/// Inside the bracket, notifications arrive in this order: removed count,
/// inserted count, position remap, changed ranges. Each is skipped when it
/// would be empty.
///
/// All methods default to doing nothing.
///
/// [`begin_structural_change`]: ViewObserver::begin_structural_change
/// [`end_structural_change`]: ViewObserver::end_structural_change
pub trait ViewObserver {
    fn begin_structural_change(&mut self) {}

    fn end_structural_change(&mut self) {}

    fn rows_removed(&mut self, _count: usize) {}

    fn rows_inserted(&mut self, _count: usize) {}

    /// Old visible rows moved; `positions` maps each old row to its new one.
    fn rows_remapped(&mut self, _positions: &PositionMap) {}

    /// Rows whose content changed in place, as new-row ranges.
    fn rows_changed(&mut self, _ranges: &[Range<usize>]) {}
}

/// One structural event, as recorded by [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Begin,
    End,
    Removed(usize),
    Inserted(usize),
    Remapped(PositionMap),
    Changed(Vec<Range<usize>>),
}

/// Observer that appends every notification to a shared log.
///
/// Handy for tests and debugging: keep a clone of [`RecordingObserver::log`]
/// and subscribe the observer itself.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    log: std::rc::Rc<std::cell::RefCell<Vec<ViewEvent>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> std::rc::Rc<std::cell::RefCell<Vec<ViewEvent>>> {
        self.log.clone()
    }

    /// Drains the recorded events.
    pub fn take(&self) -> Vec<ViewEvent> {
        std::mem::take(&mut *self.log.borrow_mut())
    }
}

impl ViewObserver for RecordingObserver {
    fn begin_structural_change(&mut self) {
        self.log.borrow_mut().push(ViewEvent::Begin);
    }

    fn end_structural_change(&mut self) {
        self.log.borrow_mut().push(ViewEvent::End);
    }

    fn rows_removed(&mut self, count: usize) {
        self.log.borrow_mut().push(ViewEvent::Removed(count));
    }

    fn rows_inserted(&mut self, count: usize) {
        self.log.borrow_mut().push(ViewEvent::Inserted(count));
    }

    fn rows_remapped(&mut self, positions: &PositionMap) {
        self.log
            .borrow_mut()
            .push(ViewEvent::Remapped(positions.clone()));
    }

    fn rows_changed(&mut self, ranges: &[Range<usize>]) {
        self.log.borrow_mut().push(ViewEvent::Changed(ranges.to_vec()));
    }
}
