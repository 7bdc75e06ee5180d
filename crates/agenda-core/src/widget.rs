use crate::calendar::ViewKind;
use crate::NormalizedEvent;

/// Capabilities the sync core needs from a calendar rendering surface.
///
/// The widget owns layout and drawing; the core only replaces its event set,
/// asks for re-layout and moves the visible period.
pub trait CalendarWidget {
    /// Drops every event currently held by the widget.
    fn clear(&mut self);
    /// Re-lays out the current view without touching data.
    fn render(&mut self);
    fn create_events(&mut self, events: &[NormalizedEvent]);
    fn change_view(&mut self, view: ViewKind, force: bool);
    fn prev(&mut self);
    fn next(&mut self);
    fn today(&mut self);
}
