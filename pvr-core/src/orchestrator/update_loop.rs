//! Background update loop.
//!
//! One dedicated thread, single cadence: each task carries its own due
//! timestamp so a slow task never starves the others, and a failing task
//! logs and continues. Shutdown is a stop flag plus condvar so the loop
//! exits without waiting out a full tick.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use super::Orchestrator;

/// Per-task due timestamps.
#[derive(Debug, Clone, Copy)]
pub(super) struct TaskDue {
    tv_channels: Instant,
    radio_channels: Instant,
    recordings: Instant,
    epg: Instant,
    epg_cleanup: Instant,
}

impl TaskDue {
    /// All tasks due immediately.
    pub(super) fn new(now: Instant) -> Self {
        Self {
            tv_channels: now,
            radio_channels: now,
            recordings: now,
            epg: now,
            epg_cleanup: now,
        }
    }
}

pub(super) fn run(orchestrator: Arc<Orchestrator>) {
    let tick = orchestrator.config().updates.tick;
    log::info!(
        "Update loop started (tick {}s)",
        tick.as_secs()
    );

    let mut due = TaskDue::new(Instant::now());
    loop {
        if orchestrator.is_stopped() {
            break;
        }
        orchestrator.run_due_tasks(Instant::now(), &mut due);

        let guard = orchestrator
            .stop
            .stopped
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let (guard, _) = orchestrator
            .stop
            .condvar
            .wait_timeout(guard, tick)
            .unwrap_or_else(|e| e.into_inner());
        if *guard {
            break;
        }
    }
    log::info!("Update loop stopped");
}

impl Orchestrator {
    /// Run every task whose due timestamp has passed and reschedule it.
    pub(super) fn run_due_tasks(&self, now: Instant, due: &mut TaskDue) {
        let intervals = self.config().updates;

        if now >= due.tv_channels {
            due.tv_channels = now + intervals.tv_channels;
            if let Err(e) = self.registry().load_from_clients(false) {
                log::warn!("TV channel update failed: {}", e);
            }
        }

        if now >= due.radio_channels {
            due.radio_channels = now + intervals.radio_channels;
            if let Err(e) = self.registry().load_from_clients(true) {
                log::warn!("Radio channel update failed: {}", e);
            }
        }

        if now >= due.recordings {
            due.recordings = now + intervals.recordings;
            self.refresh_recordings();
            self.timers().refresh();
        }

        if now >= due.epg {
            due.epg = now + intervals.epg;
            self.update_guide();
        }

        if now >= due.epg_cleanup {
            due.epg_cleanup = now + intervals.epg_cleanup;
            if let Err(e) = self.epg().cleanup(Utc::now(), self.config().epg.linger) {
                log::warn!("Guide cleanup failed: {}", e);
            }
        }
    }

    /// Grab the guide window for every channel of both kinds, then
    /// re-attach timers to their broadcasts.
    fn update_guide(&self) {
        let now = Utc::now();
        let window_end = now + self.config().epg.window;

        let mut channels = self.registry().get_channels(false);
        channels.extend(self.registry().get_channels(true));
        let grabbed = self.epg().update_all(&channels, now, window_end);
        if grabbed > 0 {
            log::debug!("Guide update grabbed {} channels", grabbed);
        }

        self.timers().match_to_guide(|timer| {
            channels
                .iter()
                .find(|c| {
                    c.client_id == timer.client_id && c.client_number == timer.channel_number
                })
                .map(|c| self.epg().table(c.id).entries())
                .unwrap_or_default()
        });

        if let Err(e) = self.store().set_last_epg_scan(now.timestamp()) {
            log::warn!("Failed to persist last guide scan time: {}", e);
        }
    }
}
