use crate::calendar::ViewKind;
use crate::widget::CalendarWidget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavCommand {
    Prev,
    Next,
    Today,
    ChangeView(ViewKind),
}

impl NavCommand {
    pub fn from_key(key: char) -> Option<Self> {
        match key {
            'k' => Some(NavCommand::Prev),
            'j' => Some(NavCommand::Next),
            't' => Some(NavCommand::Today),
            'd' => Some(NavCommand::ChangeView(ViewKind::Day)),
            'w' => Some(NavCommand::ChangeView(ViewKind::Week)),
            'm' => Some(NavCommand::ChangeView(ViewKind::Month)),
            _ => None,
        }
    }

    pub fn apply<W: CalendarWidget + ?Sized>(self, widget: &mut W) {
        match self {
            NavCommand::Prev => widget.prev(),
            NavCommand::Next => widget.next(),
            NavCommand::Today => widget.today(),
            NavCommand::ChangeView(view) => widget.change_view(view, true),
        }
    }
}

/// Runs the navigation bound to `key`. Keys typed into a focused text input
/// are never interpreted.
pub fn on_key<W: CalendarWidget + ?Sized>(
    widget: &mut W,
    key: char,
    text_input_focused: bool,
) -> Option<NavCommand> {
    if text_input_focused {
        return None;
    }
    let command = NavCommand::from_key(key)?;
    command.apply(widget);
    Some(command)
}
