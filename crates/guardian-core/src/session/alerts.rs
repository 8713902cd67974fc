//! Self-expiring operator alerts.
//!
//! Every alert gets its own expiry timer.  Alerts of the same kind are never
//! merged: two threats a second apart are two alerts with two timers.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::domain::alert::{Alert, AlertId, AlertKind, AlertTtls};
use crate::session::ports::Renderer;
use crate::session::scheduler::{Scheduler, TimerHandle, TimerTask};

/// Holds the live alerts and the timers that remove them.
#[derive(Debug)]
pub struct AlertPresenter {
    ttls: AlertTtls,
    next_id: u64,
    active: BTreeMap<AlertId, (Alert, TimerHandle)>,
}

impl AlertPresenter {
    pub fn new(ttls: AlertTtls) -> Self {
        Self {
            ttls,
            next_id: 0,
            active: BTreeMap::new(),
        }
    }

    /// Shows an alert with the TTL its kind's policy prescribes.
    pub fn present(
        &mut self,
        scheduler: &mut dyn Scheduler,
        renderer: &mut dyn Renderer,
        kind: AlertKind,
        title: impl Into<String>,
        data: Value,
    ) -> AlertId {
        let ttl = self.ttls.ttl_for(kind.ttl_policy());
        self.present_with_ttl(scheduler, renderer, kind, title, data, ttl)
    }

    /// Shows an alert that is removed `ttl` after now.
    pub fn present_with_ttl(
        &mut self,
        scheduler: &mut dyn Scheduler,
        renderer: &mut dyn Renderer,
        kind: AlertKind,
        title: impl Into<String>,
        data: Value,
        ttl: Duration,
    ) -> AlertId {
        self.next_id += 1;
        let id = AlertId::new(self.next_id);
        let alert = Alert {
            id,
            kind,
            title: title.into(),
            data,
            created_at: scheduler.now(),
            ttl,
        };
        let timer = scheduler.schedule(ttl, TimerTask::AlertExpiry(id));
        renderer.render_alert(&alert);
        debug!(alert = %id, ?kind, "alert shown: {}", alert.title);
        self.active.insert(id, (alert, timer));
        id
    }

    /// Removes an alert whose expiry timer fired.
    pub fn expire(&mut self, id: AlertId, renderer: &mut dyn Renderer) -> bool {
        match self.active.remove(&id) {
            Some(_) => {
                renderer.remove_alert(id);
                debug!(alert = %id, "alert expired");
                true
            }
            None => false,
        }
    }

    /// Removes an alert early and cancels its timer.
    pub fn dismiss(
        &mut self,
        id: AlertId,
        scheduler: &mut dyn Scheduler,
        renderer: &mut dyn Renderer,
    ) -> bool {
        match self.active.remove(&id) {
            Some((_, timer)) => {
                scheduler.cancel(timer);
                renderer.remove_alert(id);
                debug!(alert = %id, "alert dismissed");
                true
            }
            None => false,
        }
    }

    /// Removes every alert and cancels every expiry timer.
    pub fn clear(&mut self, scheduler: &mut dyn Scheduler, renderer: &mut dyn Renderer) {
        for (id, (_, timer)) in std::mem::take(&mut self.active) {
            scheduler.cancel(timer);
            renderer.remove_alert(id);
        }
    }

    pub fn get(&self, id: AlertId) -> Option<&Alert> {
        self.active.get(&id).map(|(alert, _)| alert)
    }

    /// Live alerts, oldest first.
    pub fn active(&self) -> impl Iterator<Item = &Alert> + '_ {
        self.active.values().map(|(alert, _)| alert)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

impl Default for AlertPresenter {
    fn default() -> Self {
        Self::new(AlertTtls::default())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
