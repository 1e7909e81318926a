//! Tasklets and their lifecycle events

use std::fmt;

use chrono::{DateTime, Local, TimeDelta, Utc};
use serde::Serialize;

use crate::time::{format_abs_time, format_rel_time, non_negative};

/// Name of the terminal lifecycle event
pub const FINISHED: &str = "finished";

/// Conventional name of the first lifecycle event
pub const SCHEDULED: &str = "scheduled";

/// Events after which a tasklet is considered busy
pub const RUNNING_EVENTS: [&str; 2] = ["running", "before co_await"];

/// One timestamped lifecycle event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskletEvent {
    pub name: String,
    pub when: DateTime<Utc>,
    pub details: String,
}

impl TaskletEvent {
    pub fn new(name: impl Into<String>, when: DateTime<Utc>, details: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            when,
            details: details.into(),
        }
    }

    fn is_running_state(&self) -> bool {
        RUNNING_EVENTS.contains(&self.name.as_str())
    }
}

/// A server-side unit of concurrent work
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tasklet {
    pub own_id: i64,
    /// Tasklet this one works on behalf of
    pub client_id: Option<i64>,
    pub pool_name: String,
    pub description: String,
    /// Append-only, in order of occurrence
    pub events: Vec<TaskletEvent>,
}

impl Tasklet {
    /// A tasklet is finished once its last event is `finished`
    pub fn is_finished(&self) -> bool {
        self.events.last().is_some_and(|e| e.name == FINISHED)
    }

    /// First event with the given name
    pub fn event(&self, name: &str) -> Option<&TaskletEvent> {
        self.events.iter().find(|e| e.name == name)
    }

    /// Start reference point for relative times
    pub fn anchor(&self) -> Option<&TaskletEvent> {
        self.events.first()
    }

    /// Derive the display timeline as of `captured_at`
    ///
    /// The first event is the anchor. Later events carry their offset from
    /// the anchor. Running-state events also carry how long the tasklet has
    /// been busy since: up to `captured_at` while unfinished, up to the
    /// terminal event once finished.
    pub fn timeline(&self, captured_at: DateTime<Utc>) -> Vec<TimelineEntry<'_>> {
        let Some(anchor) = self.anchor() else {
            return Vec::new();
        };
        let finished = self.is_finished();
        let end = match self.events.last() {
            Some(last) if finished => last.when,
            _ => captured_at,
        };

        self.events
            .iter()
            .enumerate()
            .map(|(index, event)| {
                let offset = (index > 0).then(|| non_negative(event.when - anchor.when));
                let progress = (index > 0 && event.is_running_state()).then(|| {
                    let elapsed = non_negative(end - event.when);
                    if finished {
                        Progress::Took(elapsed)
                    } else {
                        Progress::Taking(elapsed)
                    }
                });
                TimelineEntry {
                    event,
                    offset,
                    progress,
                }
            })
            .collect()
    }

    /// One-line description with the full timeline
    pub fn render(&self, captured_at: DateTime<Utc>, with_pool_name: bool) -> String {
        let mut text = format!("Task {}", self.own_id);
        if with_pool_name {
            text.push_str(&format!(" on pool {}", self.pool_name));
        }
        text.push_str(&format!(" [{}", self.description));
        if let Some(client_id) = self.client_id {
            text.push_str(&format!(" on behalf of {client_id}"));
        }
        text.push(']');

        if self.events.is_empty() {
            text.push_str(" (no events)");
            return text;
        }
        for entry in self.timeline(captured_at) {
            match entry.offset {
                None => text.push(' '),
                Some(_) => text.push_str("; "),
            }
            text.push_str(&entry.to_string());
        }
        text
    }
}

/// Elapsed time annotation on a running-state event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Still in progress as of the snapshot
    Taking(TimeDelta),
    /// Completed; duration up to the terminal event
    Took(TimeDelta),
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Taking(d) => write!(f, "taking {}", format_rel_time(*d)),
            Self::Took(d) => write!(f, "took {}", format_rel_time(*d)),
        }
    }
}

/// One event as positioned on a tasklet's timeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry<'a> {
    pub event: &'a TaskletEvent,
    /// Offset from the anchor; `None` for the anchor itself
    pub offset: Option<TimeDelta>,
    pub progress: Option<Progress>,
}

impl TimelineEntry<'_> {
    /// Anchor time of day, or `+<offset>` for later events
    pub fn when_text(&self) -> String {
        match self.offset {
            None => format_abs_time(&self.event.when.with_timezone(&Local)),
            Some(offset) => format!("+{}", format_rel_time(offset)),
        }
    }
}

impl fmt::Display for TimelineEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.when_text(), self.event.name)?;
        if let Some(progress) = self.progress {
            write!(f, " ({progress})")?;
        }
        if !self.event.details.is_empty() {
            write!(f, " {}", self.event.details)?;
        }
        Ok(())
    }
}
