use crate::transform::GroupingPolicy;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const GROUP_PRIMARY: &str = "1";
pub const GROUP_SECONDARY: &str = "2";

const GROUP_TEXT_COLOR: &str = "#ffffff";
const PRIMARY_ACCENT: &str = "#9e5fff";
const SECONDARY_ACCENT: &str = "#00a9ff";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    Day,
    #[default]
    Week,
    Month,
}

impl ViewKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKind::Day => "day",
            ViewKind::Week => "week",
            ViewKind::Month => "month",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewKind {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "day" | "d" => Ok(ViewKind::Day),
            "week" | "w" => Ok(ViewKind::Week),
            "month" | "m" => Ok(ViewKind::Month),
            other => Err(format!("Unknown view: {other}")),
        }
    }
}

/// Visual partition events are bucketed into. Static configuration only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarGroup {
    pub id: String,
    pub name: String,
    pub color: String,
    pub bg_color: String,
    pub drag_bg_color: String,
    pub border_color: String,
}

impl CalendarGroup {
    fn new(id: &str, name: &str, accent: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            color: GROUP_TEXT_COLOR.to_string(),
            bg_color: accent.to_string(),
            drag_bg_color: accent.to_string(),
            border_color: accent.to_string(),
        }
    }

    pub fn defaults_for(policy: GroupingPolicy) -> Vec<CalendarGroup> {
        match policy {
            GroupingPolicy::Schedule => vec![
                CalendarGroup::new(GROUP_PRIMARY, "Scheduled Items", PRIMARY_ACCENT),
                CalendarGroup::new(GROUP_SECONDARY, "Timestamped Items", SECONDARY_ACCENT),
            ],
            GroupingPolicy::Category => vec![
                CalendarGroup::new(GROUP_PRIMARY, "Tasks", PRIMARY_ACCENT),
                CalendarGroup::new(
                    GROUP_SECONDARY,
                    "Scheduled/Timestamped Items",
                    SECONDARY_ACCENT,
                ),
            ],
        }
    }

    pub fn find<'a>(groups: &'a [CalendarGroup], id: &str) -> Option<&'a CalendarGroup> {
        groups.iter().find(|group| group.id == id)
    }
}

/// Layout options handed to the rendering widget. The view is always read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarOptions {
    pub default_view: ViewKind,
    pub start_day_of_week: Weekday,
    pub hour_start: u32,
    pub narrow_weekend: bool,
    pub groups: Vec<CalendarGroup>,
}

impl CalendarOptions {
    pub fn for_policy(policy: GroupingPolicy) -> Self {
        Self {
            groups: CalendarGroup::defaults_for(policy),
            ..Self::default()
        }
    }

    pub fn is_read_only(&self) -> bool {
        true
    }
}

impl Default for CalendarOptions {
    fn default() -> Self {
        Self {
            default_view: ViewKind::Week,
            start_day_of_week: Weekday::Mon,
            hour_start: 8,
            narrow_weekend: true,
            groups: CalendarGroup::defaults_for(GroupingPolicy::Schedule),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_kind_parses_names_and_shortcuts() {
        assert_eq!("week".parse::<ViewKind>(), Ok(ViewKind::Week));
        assert_eq!(" Month ".parse::<ViewKind>(), Ok(ViewKind::Month));
        assert_eq!("d".parse::<ViewKind>(), Ok(ViewKind::Day));
        assert!("year".parse::<ViewKind>().is_err());
    }

    #[test]
    fn default_groups_follow_grouping_policy() {
        let schedule = CalendarGroup::defaults_for(GroupingPolicy::Schedule);
        assert_eq!(schedule[0].name, "Scheduled Items");
        assert_eq!(schedule[0].bg_color, "#9e5fff");
        assert_eq!(schedule[1].name, "Timestamped Items");

        let category = CalendarGroup::defaults_for(GroupingPolicy::Category);
        assert_eq!(category[0].name, "Tasks");
        assert_eq!(
            CalendarGroup::find(&category, "2").map(|g| g.bg_color.as_str()),
            Some("#00a9ff")
        );
        assert!(CalendarGroup::find(&category, "3").is_none());
    }

    #[test]
    fn default_options_match_read_only_week_layout() {
        let options = CalendarOptions::default();
        assert_eq!(options.default_view, ViewKind::Week);
        assert_eq!(options.start_day_of_week, Weekday::Mon);
        assert_eq!(options.hour_start, 8);
        assert!(options.narrow_weekend);
        assert!(options.is_read_only());
    }
}
