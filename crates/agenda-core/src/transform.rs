use crate::calendar::{GROUP_PRIMARY, GROUP_SECONDARY};
use crate::{AgendaItem, EventCategory, EventColors, NormalizedEvent};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

const ACCENT_TEXT: &str = "#ffffff";
const ALLDAY_ACCENT: &str = "#ff5583";
const TASK_ACCENT: &str = "#03bd9e";
const TIME_ACCENT: &str = "#00a9ff";

/// How items are split between the two calendar groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupingPolicy {
    /// Items carrying a `SCHEDULED` marker go to group 1, timestamped items to 2.
    #[default]
    Schedule,
    /// Items with `CATEGORY == "tasks"` go to group 1, everything else to 2.
    Category,
}

impl GroupingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupingPolicy::Schedule => "schedule",
            GroupingPolicy::Category => "category",
        }
    }

    pub fn group_for(&self, item: &AgendaItem) -> &'static str {
        let primary = match self {
            GroupingPolicy::Schedule => item.is_scheduled(),
            GroupingPolicy::Category => item.is_task(),
        };
        if primary {
            GROUP_PRIMARY
        } else {
            GROUP_SECONDARY
        }
    }
}

impl fmt::Display for GroupingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupingPolicy {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "schedule" | "scheduled" => Ok(GroupingPolicy::Schedule),
            "category" | "tasks" => Ok(GroupingPolicy::Category),
            other => Err(format!("Unknown grouping policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorPolicy {
    /// No per-event colors; the widget paints events with their group color.
    #[default]
    Inherit,
    /// All-day, task and timed events each get their own accent.
    Classification,
}

impl ColorPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorPolicy::Inherit => "inherit",
            ColorPolicy::Classification => "classification",
        }
    }

    pub fn colors_for(&self, item: &AgendaItem) -> Option<EventColors> {
        match self {
            ColorPolicy::Inherit => None,
            ColorPolicy::Classification => {
                let accent = if item.is_all_day() {
                    ALLDAY_ACCENT
                } else if item.is_task() {
                    TASK_ACCENT
                } else {
                    TIME_ACCENT
                };
                Some(EventColors::accent(ACCENT_TEXT, accent))
            }
        }
    }
}

impl fmt::Display for ColorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorPolicy {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "inherit" | "group" => Ok(ColorPolicy::Inherit),
            "classification" | "category" => Ok(ColorPolicy::Classification),
            other => Err(format!("Unknown color policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransformPolicy {
    pub grouping: GroupingPolicy,
    pub colors: ColorPolicy,
}

/// Maps a snapshot to renderable events, one per item, in input order.
pub fn transform(items: &[AgendaItem], policy: &TransformPolicy) -> Vec<NormalizedEvent> {
    items.iter().map(|item| normalize(item, policy)).collect()
}

fn normalize(item: &AgendaItem, policy: &TransformPolicy) -> NormalizedEvent {
    let category = if item.is_all_day() {
        EventCategory::Allday
    } else {
        EventCategory::Time
    };
    NormalizedEvent {
        id: item.id.clone(),
        calendar_id: policy.grouping.group_for(item).to_string(),
        title: item.item.as_deref().map(sanitize_title),
        category,
        colors: policy.colors.colors_for(item),
        start: item.start_date.clone(),
        end: item.end_date.clone(),
    }
}

fn link_markup() -> &'static Regex {
    static LINK_MARKUP: OnceLock<Regex> = OnceLock::new();
    LINK_MARKUP.get_or_init(|| Regex::new(r"\[\[[^\[\]]*\]\[|\]\]").expect("valid regex"))
}

/// Strips org link wrappers (`[[target][label]]` and stray `]]`), keeping the
/// readable label. Repeats until nothing matches, so the result is stable.
pub fn sanitize_title(raw: &str) -> String {
    let pattern = link_markup();
    let mut current = raw.to_string();
    loop {
        let next = pattern.replace_all(&current, "");
        if next == current {
            return current;
        }
        current = next.into_owned();
    }
}
