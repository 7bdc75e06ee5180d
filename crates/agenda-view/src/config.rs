use agenda_core::{CalendarOptions, ColorPolicy, GroupingPolicy, TransformPolicy, ViewKind};
use clap::Parser;
use std::{env, path::PathBuf, time::Duration};
use url::Url;

pub const DEFAULT_AGENDA_URL: &str = "ws://127.0.0.1:44445";
pub const DEFAULT_REFRESH_SECS: u64 = 300;
const STATE_DB_FILE: &str = "agenda.db";

#[derive(Parser, Debug, Default)]
#[command(name = "agenda-view", about = "Read-only live calendar for an org agenda")]
pub struct Args {
    /// WebSocket endpoint of the agenda server.
    #[arg(long, default_value = "")]
    pub url: String,
    #[arg(long, default_value = "")]
    pub state_dir: String,
    #[arg(long, default_value = "")]
    pub log_dir: String,
    /// `schedule` or `category`.
    #[arg(long, default_value = "")]
    pub grouping: String,
    /// `inherit` or `classification`.
    #[arg(long, default_value = "")]
    pub colors: String,
    #[arg(long, default_value = "week")]
    pub view: String,
    #[arg(long, default_value_t = DEFAULT_REFRESH_SECS)]
    pub refresh_secs: u64,
    /// Stay disconnected after the first close or error.
    #[arg(long)]
    pub no_reconnect: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    Disabled,
    Backoff { initial: Duration, max: Duration },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::Backoff {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(10),
        }
    }
}

impl ReconnectPolicy {
    pub fn next_backoff(&self, current: Duration) -> Option<Duration> {
        match self {
            ReconnectPolicy::Disabled => None,
            ReconnectPolicy::Backoff { max, .. } => {
                let next = current + current;
                if next > *max {
                    Some(*max)
                } else {
                    Some(next)
                }
            }
        }
    }

    pub fn initial_backoff(&self) -> Option<Duration> {
        match self {
            ReconnectPolicy::Disabled => None,
            ReconnectPolicy::Backoff { initial, .. } => Some(*initial),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub url: Url,
    pub state_path: PathBuf,
    pub log_dir: String,
    pub log_stdout: bool,
    pub policy: TransformPolicy,
    pub calendar: CalendarOptions,
    pub refresh_interval: Duration,
    pub reconnect: ReconnectPolicy,
}

pub fn load_config(args: Args) -> Result<RuntimeConfig, String> {
    let url = resolve_url(&args.url)?;
    let state_dir = resolve_state_dir(&args.state_dir);
    let log_dir = resolve_log_dir(&args.log_dir, &state_dir);
    let grouping = resolve_setting(&args.grouping, "AGENDA_GROUPING")
        .map(|value| value.parse::<GroupingPolicy>())
        .transpose()?
        .unwrap_or_default();
    let colors = resolve_setting(&args.colors, "AGENDA_COLORS")
        .map(|value| value.parse::<ColorPolicy>())
        .transpose()?
        .unwrap_or_default();
    let view = args.view.parse::<ViewKind>()?;
    let reconnect = if args.no_reconnect || env_true("AGENDA_NO_RECONNECT") {
        ReconnectPolicy::Disabled
    } else {
        ReconnectPolicy::default()
    };
    let calendar = CalendarOptions {
        default_view: view,
        ..CalendarOptions::for_policy(grouping)
    };
    Ok(RuntimeConfig {
        url,
        state_path: state_dir.join(STATE_DB_FILE),
        log_dir,
        log_stdout: env_true("AGENDA_LOG_STDOUT"),
        policy: TransformPolicy { grouping, colors },
        calendar,
        refresh_interval: Duration::from_secs(args.refresh_secs.max(1)),
        reconnect,
    })
}

fn resolve_setting(flag: &str, key: &str) -> Option<String> {
    if !flag.trim().is_empty() {
        return Some(flag.trim().to_string());
    }
    if let Ok(value) = env::var(key) {
        if !value.trim().is_empty() {
            return Some(value.trim().to_string());
        }
    }
    None
}

fn resolve_url(flag: &str) -> Result<Url, String> {
    let raw =
        resolve_setting(flag, "AGENDA_URL").unwrap_or_else(|| DEFAULT_AGENDA_URL.to_string());
    let url = Url::parse(&raw).map_err(|err| format!("invalid agenda url {raw}: {err}"))?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(format!("unsupported agenda url scheme: {other}")),
    }
}

fn resolve_state_dir(flag: &str) -> PathBuf {
    if let Some(value) = resolve_setting(flag, "AGENDA_STATE_DIR") {
        return PathBuf::from(value);
    }
    if let Ok(home) = env::var("HOME") {
        if !home.trim().is_empty() {
            return PathBuf::from(home).join(".local/state/agenda-view");
        }
    }
    PathBuf::from(".agenda-view")
}

fn resolve_log_dir(flag: &str, state_dir: &std::path::Path) -> String {
    if let Some(value) = resolve_setting(flag, "AGENDA_LOG_DIR") {
        return value;
    }
    state_dir.join("logs").to_string_lossy().to_string()
}

fn env_true(key: &str) -> bool {
    if let Ok(value) = env::var(key) {
        return matches!(value.trim(), "1" | "true" | "TRUE" | "yes" | "YES");
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Args {
        Args {
            view: "week".to_string(),
            refresh_secs: DEFAULT_REFRESH_SECS,
            state_dir: "/tmp/agenda-view-test".to_string(),
            log_dir: "/tmp/agenda-view-test/logs".to_string(),
            url: DEFAULT_AGENDA_URL.to_string(),
            grouping: "schedule".to_string(),
            colors: "inherit".to_string(),
            ..Args::default()
        }
    }

    #[test]
    fn flags_win_over_defaults() {
        let config = load_config(Args {
            url: "ws://127.0.0.1:5000".to_string(),
            grouping: "category".to_string(),
            colors: "classification".to_string(),
            view: "month".to_string(),
            refresh_secs: 60,
            no_reconnect: true,
            ..args()
        })
        .expect("config");
        assert_eq!(config.url.as_str(), "ws://127.0.0.1:5000/");
        assert_eq!(config.policy.grouping, GroupingPolicy::Category);
        assert_eq!(config.policy.colors, ColorPolicy::Classification);
        assert_eq!(config.calendar.default_view, ViewKind::Month);
        assert_eq!(config.calendar.groups[0].name, "Tasks");
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
        assert_eq!(config.reconnect, ReconnectPolicy::Disabled);
        assert_eq!(
            config.state_path,
            PathBuf::from("/tmp/agenda-view-test/agenda.db")
        );
    }

    #[test]
    fn bad_values_are_reported() {
        assert!(load_config(Args {
            url: "http://127.0.0.1:44445".to_string(),
            ..args()
        })
        .is_err());
        assert!(load_config(Args {
            grouping: "priority".to_string(),
            ..args()
        })
        .is_err());
        assert!(load_config(Args {
            view: "year".to_string(),
            ..args()
        })
        .is_err());
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        let policy = ReconnectPolicy::default();
        let mut delay = policy.initial_backoff().expect("enabled");
        let mut seen = vec![delay];
        for _ in 0..5 {
            delay = policy.next_backoff(delay).expect("enabled");
            seen.push(delay);
        }
        let secs: Vec<u64> = seen.iter().map(Duration::as_secs).collect();
        assert_eq!(secs, vec![1, 2, 4, 8, 10, 10]);
        assert_eq!(ReconnectPolicy::Disabled.next_backoff(delay), None);
        assert_eq!(ReconnectPolicy::Disabled.initial_backoff(), None);
    }
}
