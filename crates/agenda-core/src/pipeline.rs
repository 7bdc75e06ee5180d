use crate::widget::CalendarWidget;
use crate::{AgendaError, NormalizedEvent};

/// Durable slot holding the last rendered event set.
///
/// Only used to seed the view before the first live snapshot, so reads never
/// fail: missing or unreadable content loads as an empty set.
pub trait FallbackStore {
    fn load(&self) -> Vec<NormalizedEvent>;
    fn save(&mut self, events: &[NormalizedEvent]) -> Result<(), AgendaError>;
}

impl<S: FallbackStore + ?Sized> FallbackStore for Box<S> {
    fn load(&self) -> Vec<NormalizedEvent> {
        (**self).load()
    }

    fn save(&mut self, events: &[NormalizedEvent]) -> Result<(), AgendaError> {
        (**self).save(events)
    }
}

pub struct RenderPipeline;

impl RenderPipeline {
    /// Replaces the widget's events with `events`, then persists them.
    ///
    /// The widget is updated even when persisting fails; the error is
    /// returned for the caller to report.
    pub fn apply<W, S>(
        widget: &mut W,
        store: &mut S,
        events: &[NormalizedEvent],
    ) -> Result<(), AgendaError>
    where
        W: CalendarWidget + ?Sized,
        S: FallbackStore + ?Sized,
    {
        widget.clear();
        widget.create_events(events);
        store.save(events)
    }
}
