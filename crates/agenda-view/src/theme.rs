use agenda_core::{CalendarGroup, ConnectionState, NormalizedEvent};
use ratatui::style::{Color, Modifier, Style};

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Rgb(142, 192, 124))
    .add_modifier(Modifier::BOLD);
pub const TODAY_STYLE: Style = Style::new()
    .fg(Color::Rgb(250, 189, 47))
    .add_modifier(Modifier::BOLD);
pub const NOW_STYLE: Style = Style::new()
    .fg(Color::Rgb(251, 73, 52))
    .add_modifier(Modifier::BOLD);
pub const MUTED_STYLE: Style = Style::new().fg(Color::Rgb(146, 131, 116));
pub const HOUR_STYLE: Style = Style::new().fg(Color::Rgb(168, 153, 132));
pub const STATUS_STYLE: Style = Style::new()
    .bg(Color::Rgb(24, 27, 34))
    .fg(Color::Rgb(189, 174, 147));

const FALLBACK_ACCENT: Color = Color::Rgb(131, 165, 152);

/// Parses `#rrggbb` (or `rrggbb`) into an RGB color.
pub fn parse_hex_color(raw: &str) -> Option<Color> {
    let hex = raw.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

/// Event colors win over the group's; unknown groups get a neutral accent.
pub fn event_style(event: &NormalizedEvent, groups: &[CalendarGroup]) -> Style {
    let (fg, bg) = match &event.colors {
        Some(colors) => (colors.color.as_str(), colors.bg_color.as_str()),
        None => match CalendarGroup::find(groups, &event.calendar_id) {
            Some(group) => (group.color.as_str(), group.bg_color.as_str()),
            None => ("", ""),
        },
    };
    let accent = parse_hex_color(bg).unwrap_or(FALLBACK_ACCENT);
    if event.is_all_day() {
        let text = parse_hex_color(fg).unwrap_or(Color::White);
        Style::new().bg(accent).fg(text)
    } else {
        Style::new().fg(accent)
    }
}

pub fn connection_color(state: ConnectionState) -> Color {
    match state {
        ConnectionState::Open => Color::Rgb(184, 187, 38),
        ConnectionState::Connecting => Color::Rgb(250, 189, 47),
        ConnectionState::Closed => Color::Rgb(146, 131, 116),
        ConnectionState::Errored => Color::Rgb(251, 73, 52),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agenda_core::{EventCategory, EventColors, GroupingPolicy};

    fn event(calendar_id: &str, colors: Option<EventColors>) -> NormalizedEvent {
        NormalizedEvent {
            id: None,
            calendar_id: calendar_id.to_string(),
            title: None,
            category: EventCategory::Time,
            colors,
            start: None,
            end: None,
        }
    }

    #[test]
    fn hex_colors_parse() {
        assert_eq!(parse_hex_color("#9e5fff"), Some(Color::Rgb(0x9e, 0x5f, 0xff)));
        assert_eq!(parse_hex_color("00a9ff"), Some(Color::Rgb(0, 0xa9, 0xff)));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }

    #[test]
    fn event_colors_override_group_colors() {
        let groups = CalendarGroup::defaults_for(GroupingPolicy::Schedule);
        let inherited = event_style(&event("1", None), &groups);
        assert_eq!(inherited.fg, Some(Color::Rgb(0x9e, 0x5f, 0xff)));

        let painted = event_style(
            &event("1", Some(EventColors::accent("#ffffff", "#03bd9e"))),
            &groups,
        );
        assert_eq!(painted.fg, Some(Color::Rgb(0x03, 0xbd, 0x9e)));

        let unknown = event_style(&event("9", None), &groups);
        assert_eq!(unknown.fg, Some(FALLBACK_ACCENT));
    }
}
