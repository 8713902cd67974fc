//! Last known agent monitoring status.

use crate::protocol::messages::StatusUpdate;

/// What the console knows about the agent's monitoring state.
///
/// Fields stay `None` until the agent reports them; a later update that omits
/// a field keeps the earlier value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitoringStatus {
    pub active: Option<bool>,
    pub agent_id: Option<String>,
    pub agent_status: Option<String>,
    pub monitor_directory: Option<String>,
}

impl MonitoringStatus {
    /// Folds a status update into the current view.
    pub fn apply(&mut self, update: &StatusUpdate) {
        if let Some(active) = update.monitoring_active {
            self.active = Some(active);
        }
        if let Some(id) = &update.agent_id {
            self.agent_id = Some(id.clone());
        }
        if let Some(status) = &update.status {
            self.agent_status = Some(status.clone());
        }
        if let Some(dir) = &update.monitor_directory {
            self.monitor_directory = Some(dir.clone());
        }
    }
}
