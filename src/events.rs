use serde::Serialize;

use crate::shape::BlockShape;

/// Host-side change notification.
///
/// The slot model never emits events on its own; the reconciler brackets
/// a rebuild with `set_enabled(false)` / `set_enabled(true)` and then reports
/// the net change once.
pub trait ChangeSink {
    fn set_enabled(&mut self, enabled: bool);
    fn shape_changed(&mut self, change: &ShapeChange);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeSummary {
    pub case_count: usize,
    pub has_else: bool,
    pub slot_ids: Vec<String>,
}

impl ShapeSummary {
    pub fn of(shape: &BlockShape) -> Self {
        Self {
            case_count: shape.case_count(),
            has_else: shape.has_else(),
            slot_ids: shape.slot_ids(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapeChange {
    pub before: ShapeSummary,
    pub after: ShapeSummary,
}

impl ShapeChange {
    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ChangeSink for NullSink {
    fn set_enabled(&mut self, _enabled: bool) {}

    fn shape_changed(&mut self, _change: &ShapeChange) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Disabled,
    Enabled,
    ShapeChanged(ShapeChange),
}

/// Sink that keeps every call, in order.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    pub events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changes(&self) -> impl Iterator<Item = &ShapeChange> {
        self.events.iter().filter_map(|event| match event {
            Event::ShapeChanged(change) => Some(change),
            _ => None,
        })
    }
}

impl ChangeSink for EventLog {
    fn set_enabled(&mut self, enabled: bool) {
        self.events.push(if enabled {
            Event::Enabled
        } else {
            Event::Disabled
        });
    }

    fn shape_changed(&mut self, change: &ShapeChange) {
        self.events.push(Event::ShapeChanged(change.clone()));
    }
}

/// Keeps notifications off until dropped.
pub(crate) struct Suspended<'a, S: ChangeSink + ?Sized> {
    sink: &'a mut S,
}

impl<'a, S: ChangeSink + ?Sized> Suspended<'a, S> {
    pub(crate) fn new(sink: &'a mut S) -> Self {
        sink.set_enabled(false);
        Self { sink }
    }
}

impl<S: ChangeSink + ?Sized> Drop for Suspended<'_, S> {
    fn drop(&mut self) {
        self.sink.set_enabled(true);
    }
}
