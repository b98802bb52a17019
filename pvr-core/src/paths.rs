//! Virtual path surface for file-browsing consumers.
//!
//! Channels and timers are exposed as a small directory tree:
//! `channels/tv/all`, `channels/tv/<group>`, `channels/tv/.hidden`, the
//! same under `channels/radio`, and `timers`. Listing a directory
//! returns plain entries; no filesystem is involved.

use crate::channels::ChannelRegistry;
use crate::timers::TimerScheduler;

/// A parsed virtual path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PvrPath {
    Root,
    Channels,
    ChannelKind { radio: bool },
    AllChannels { radio: bool },
    HiddenChannels { radio: bool },
    Group { radio: bool, name: String },
    Timers,
}

fn kind_radio(segment: &str) -> Option<bool> {
    match segment {
        "tv" => Some(false),
        "radio" => Some(true),
        _ => None,
    }
}

fn kind_segment(radio: bool) -> &'static str {
    if radio {
        "radio"
    } else {
        "tv"
    }
}

impl PvrPath {
    /// Parse a slash-separated virtual path. Leading and trailing
    /// slashes are ignored. Returns `None` for paths outside the tree.
    pub fn parse(path: &str) -> Option<Self> {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return Some(PvrPath::Root);
        }
        let parts: Vec<&str> = trimmed.split('/').collect();
        match parts.as_slice() {
            ["channels"] => Some(PvrPath::Channels),
            ["timers"] => Some(PvrPath::Timers),
            ["channels", kind] => Some(PvrPath::ChannelKind {
                radio: kind_radio(kind)?,
            }),
            ["channels", kind, "all"] => Some(PvrPath::AllChannels {
                radio: kind_radio(kind)?,
            }),
            ["channels", kind, ".hidden"] => Some(PvrPath::HiddenChannels {
                radio: kind_radio(kind)?,
            }),
            ["channels", kind, group] => Some(PvrPath::Group {
                radio: kind_radio(kind)?,
                name: (*group).to_string(),
            }),
            _ => None,
        }
    }

    /// The canonical string form of this path.
    pub fn to_path(&self) -> String {
        match self {
            PvrPath::Root => String::new(),
            PvrPath::Channels => "channels".to_string(),
            PvrPath::ChannelKind { radio } => format!("channels/{}", kind_segment(*radio)),
            PvrPath::AllChannels { radio } => {
                format!("channels/{}/all", kind_segment(*radio))
            }
            PvrPath::HiddenChannels { radio } => {
                format!("channels/{}/.hidden", kind_segment(*radio))
            }
            PvrPath::Group { radio, name } => {
                format!("channels/{}/{}", kind_segment(*radio), name)
            }
            PvrPath::Timers => "timers".to_string(),
        }
    }
}

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    pub path: String,
    pub label: String,
    pub is_directory: bool,
}

impl PathEntry {
    fn dir(path: String, label: &str) -> Self {
        Self {
            path,
            label: label.to_string(),
            is_directory: true,
        }
    }

    fn file(path: String, label: &str) -> Self {
        Self {
            path,
            label: label.to_string(),
            is_directory: false,
        }
    }
}

/// List a directory of the virtual tree.
pub fn list(path: &PvrPath, registry: &ChannelRegistry, timers: &TimerScheduler) -> Vec<PathEntry> {
    match path {
        PvrPath::Root => vec![
            PathEntry::dir("channels".to_string(), "channels"),
            PathEntry::dir("timers".to_string(), "timers"),
        ],
        PvrPath::Channels => vec![
            PathEntry::dir("channels/tv".to_string(), "tv"),
            PathEntry::dir("channels/radio".to_string(), "radio"),
        ],
        PvrPath::ChannelKind { radio } => {
            let base = format!("channels/{}", kind_segment(*radio));
            let mut entries = vec![PathEntry::dir(format!("{}/all", base), "all")];
            for group in registry.get_groups(*radio) {
                entries.push(PathEntry::dir(
                    format!("{}/{}", base, group.name),
                    &group.name,
                ));
            }
            entries.push(PathEntry::dir(format!("{}/.hidden", base), ".hidden"));
            entries
        }
        PvrPath::AllChannels { radio } => {
            let base = path.to_path();
            registry
                .get_channels(*radio)
                .iter()
                .filter(|c| !c.hidden)
                .map(|c| {
                    PathEntry::file(
                        format!("{}/{}", base, c.number),
                        &format!("{} {}", c.number, c.name),
                    )
                })
                .collect()
        }
        PvrPath::HiddenChannels { radio } => {
            let base = path.to_path();
            registry
                .get_channels(*radio)
                .iter()
                .filter(|c| c.hidden)
                .map(|c| PathEntry::file(format!("{}/{}", base, c.id), &c.name))
                .collect()
        }
        PvrPath::Group { radio, name } => {
            let base = path.to_path();
            let Some(group) = registry
                .get_groups(*radio)
                .into_iter()
                .find(|g| g.name == *name)
            else {
                return Vec::new();
            };
            registry
                .get_channels(*radio)
                .iter()
                .filter(|c| !c.hidden && c.group_id == group.id)
                .map(|c| {
                    PathEntry::file(
                        format!("{}/{}", base, c.number),
                        &format!("{} {}", c.number, c.name),
                    )
                })
                .collect()
        }
        PvrPath::Timers => {
            let mut entries = vec![PathEntry::file(
                "timers/add.timer".to_string(),
                "add timer...",
            )];
            for timer in timers.get_timers() {
                entries.push(PathEntry::file(
                    format!("timers/{}.{}.timer", timer.client_id, timer.index),
                    &timer.title,
                ));
            }
            entries
        }
    }
}
