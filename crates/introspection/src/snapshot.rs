//! Point-in-time view of the server's tasklets

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rmpv::Value;
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, Result};
use crate::tasklet::{Tasklet, TaskletEvent};
use crate::time::from_millis;

/// Tasklets as reported by one introspection status query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    captured_at: DateTime<Utc>,
    tasklets: Vec<Tasklet>,
}

// Wire records of an introspection status response
#[derive(Deserialize)]
struct SnapshotRecord {
    now: i64,
    tasklets: Vec<TaskletRecord>,
}

#[derive(Deserialize)]
struct TaskletRecord {
    pool_name: String,
    tasklet_id: i64,
    #[serde(default)]
    client_id: Option<i64>,
    description: String,
    events: Vec<EventRecord>,
}

#[derive(Deserialize)]
struct EventRecord {
    when: i64,
    what: String,
    #[serde(default)]
    details: String,
}

impl Snapshot {
    pub fn new(captured_at: DateTime<Utc>, tasklets: Vec<Tasklet>) -> Self {
        Self {
            captured_at,
            tasklets,
        }
    }

    /// Decode `{now, tasklets: [...]}` with millisecond timestamps
    pub fn from_value(value: Value) -> Result<Self> {
        let record: SnapshotRecord = rmpv::ext::from_value(value)?;
        let captured_at = timestamp(record.now)?;
        let tasklets = record
            .tasklets
            .into_iter()
            .map(|t| {
                let events = t
                    .events
                    .into_iter()
                    .map(|e| Ok(TaskletEvent::new(e.what, timestamp(e.when)?, e.details)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Tasklet {
                    own_id: t.tasklet_id,
                    client_id: t.client_id,
                    pool_name: t.pool_name,
                    description: t.description,
                    events,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(captured_at, tasklets))
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Tasklets in the order the server reported them
    pub fn tasklets(&self) -> &[Tasklet] {
        &self.tasklets
    }

    /// Tasklets grouped by pool
    ///
    /// Pools are ordered by name; tasklets within a pool keep snapshot order.
    pub fn pools(&self) -> BTreeMap<&str, Vec<&Tasklet>> {
        let mut pools: BTreeMap<&str, Vec<&Tasklet>> = BTreeMap::new();
        for tasklet in &self.tasklets {
            pools.entry(tasklet.pool_name.as_str()).or_default().push(tasklet);
        }
        pools
    }

    /// Tasklets belonging to one pool, in snapshot order
    pub fn pool(&self, pool_name: &str) -> Vec<&Tasklet> {
        self.tasklets
            .iter()
            .filter(|t| t.pool_name == pool_name)
            .collect()
    }

    /// Per-pool summary lines, optionally followed by each tasklet's timeline
    pub fn render(&self, include_tasklets: bool) -> String {
        let mut lines = Vec::new();
        for (pool_name, tasklets) in self.pools() {
            let mut line = format!("Pool {pool_name} has {} task(s):", tasklets.len());
            for tasklet in &tasklets {
                line.push_str(&format!(" {}", tasklet.own_id));
            }
            lines.push(line);

            if include_tasklets {
                for tasklet in tasklets {
                    lines.push(format!("    {}", tasklet.render(self.captured_at, false)));
                }
            }
        }
        lines.join("\n")
    }
}

fn timestamp(millis: i64) -> Result<DateTime<Utc>> {
    from_millis(millis).ok_or(DecodeError::Timestamp(millis))
}
