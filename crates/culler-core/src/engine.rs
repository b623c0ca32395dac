//! Culling engine

use chrono::{DateTime, Utc};
use culler_api::{
    CullMode, CullReport, CullResult, CullerSettings, CullerStatus, SettingsUpdate,
    TerminalConnections, WorkspaceView,
};
use culler_host_api::HostManagers;
use culler_util::{Result, TerminalName, now_utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::{
    CullEvent, KernelPolicy, PassFn, ScheduledTask, Scheduler, SessionPolicy, TerminalPolicy,
    WorkspacePolicy, check_period,
};

const EVENT_CHANNEL_CAPACITY: usize = 64;

struct EngineState {
    settings: CullerSettings,
    active_terminals: HashSet<TerminalName>,
    last_result: CullResult,
    /// True once `last_result` has been handed out
    consumed: bool,
    task: Option<Box<dyn ScheduledTask>>,
}

/// Owns culler settings and state and runs culling passes
pub struct CullingEngine {
    managers: HostManagers,
    scheduler: Arc<dyn Scheduler>,
    state: Mutex<EngineState>,
    /// Held for the duration of a pass
    in_flight: tokio::sync::Mutex<()>,
    events: broadcast::Sender<CullEvent>,
    this: Weak<CullingEngine>,
}

impl CullingEngine {
    pub fn new(
        managers: HostManagers,
        settings: CullerSettings,
        scheduler: Arc<dyn Scheduler>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        info!(
            kernel_enabled = settings.kernel_cull_enabled,
            terminal_enabled = settings.terminal_cull_enabled,
            session_enabled = settings.session_cull_enabled,
            workspace_enabled = settings.workspace_cull_enabled,
            interval_minutes = settings.cull_check_interval,
            "Culling engine initialized"
        );

        Arc::new_cyclic(|this| Self {
            managers,
            scheduler,
            state: Mutex::new(EngineState {
                settings,
                active_terminals: HashSet::new(),
                last_result: CullResult::default(),
                consumed: true,
                task: None,
            }),
            in_flight: tokio::sync::Mutex::new(()),
            events,
            this: this.clone(),
        })
    }

    /// Subscribe to engine events
    pub fn subscribe(&self) -> broadcast::Receiver<CullEvent> {
        self.events.subscribe()
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        // Every write is a single assignment, so a poisoned lock still holds
        // consistent state
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: CullEvent) {
        event.log();
        let _ = self.events.send(event);
    }

    /// Attach the scheduler at the current check interval
    pub fn start(&self) {
        let mut state = self.lock_state();
        if state.task.is_some() {
            warn!("Culler already running, ignoring start request");
            return;
        }
        let interval_minutes = self.attach(&mut state);
        drop(state);

        self.emit(CullEvent::Started { interval_minutes });
    }

    /// Detach the scheduler. Does nothing when stopped.
    pub fn stop(&self) {
        let task = self.lock_state().task.take();
        if let Some(task) = task {
            task.cancel();
            self.emit(CullEvent::Stopped);
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_state().task.is_some()
    }

    fn attach(&self, state: &mut EngineState) -> u64 {
        let interval_minutes = state.settings.cull_check_interval;
        let this = self.this.clone();
        let pass: PassFn = Arc::new(move || {
            let this = this.clone();
            Box::pin(async move {
                if let Some(engine) = this.upgrade() {
                    engine.scheduled_pass().await;
                }
            })
        });

        state.task = Some(self.scheduler.attach(check_period(interval_minutes), pass));
        interval_minutes
    }

    /// Apply a partial settings update.
    ///
    /// A changed check interval restarts a running scheduler at the new
    /// period. Other changes take effect on the next pass.
    pub fn update_settings(&self, update: &SettingsUpdate) -> Result<()> {
        update.validate()?;

        let mut restarted = None;
        let interval_changed = {
            let mut state = self.lock_state();
            let interval_changed = state.settings.apply(update);

            if interval_changed && let Some(task) = state.task.take() {
                debug!(
                    previous_period_secs = task.period().as_secs(),
                    "Restarting culling timer"
                );
                task.cancel();
                restarted = Some(self.attach(&mut state));
            }

            let s = &state.settings;
            info!(
                kernel_enabled = s.kernel_cull_enabled,
                kernel_timeout = s.kernel_cull_idle_timeout,
                terminal_enabled = s.terminal_cull_enabled,
                terminal_timeout = s.terminal_cull_idle_timeout,
                disconnected_only = s.terminal_cull_disconnected_only,
                session_enabled = s.session_cull_enabled,
                session_timeout = s.session_cull_idle_timeout,
                workspace_enabled = s.workspace_cull_enabled,
                workspace_timeout = s.workspace_cull_idle_timeout,
                interval_minutes = s.cull_check_interval,
                "Settings updated"
            );
            interval_changed
        };

        if let Some(interval_minutes) = restarted {
            self.emit(CullEvent::Stopped);
            self.emit(CullEvent::Started { interval_minutes });
        }
        self.emit(CullEvent::SettingsUpdated { interval_changed });
        Ok(())
    }

    pub fn get_settings(&self) -> CullerSettings {
        self.lock_state().settings.clone()
    }

    pub fn get_status(&self) -> CullerStatus {
        let state = self.lock_state();
        CullerStatus {
            running: state.task.is_some(),
            settings: state.settings.clone(),
        }
    }

    /// Replace the set of terminals that have an open client tab
    pub fn set_active_terminals(&self, terminals: Vec<String>) {
        let active: HashSet<TerminalName> = terminals.into_iter().map(TerminalName::new).collect();
        debug!(count = active.len(), "Active terminals updated");
        self.lock_state().active_terminals = active;
    }

    /// Take the most recent non-empty result. Returns it once; later calls
    /// get an empty result until another pass evicts something.
    pub fn get_last_cull_result(&self) -> CullResult {
        let mut state = self.lock_state();
        if state.consumed {
            return CullResult::default();
        }
        state.consumed = true;
        state.last_result.clone()
    }

    /// Run one pass now, waiting for any pass already in flight
    pub async fn cull_idle_resources(&self, now: DateTime<Utc>) -> CullResult {
        let _guard = self.in_flight.lock().await;
        self.run_pass(now).await
    }

    async fn scheduled_pass(&self) {
        let Ok(_guard) = self.in_flight.try_lock() else {
            self.emit(CullEvent::PassSkipped);
            return;
        };
        self.run_pass(now_utc()).await;
    }

    /// Caller must hold `in_flight`
    async fn run_pass(&self, now: DateTime<Utc>) -> CullResult {
        let started = Instant::now();
        let (settings, active) = {
            let state = self.lock_state();
            (state.settings.clone(), state.active_terminals.clone())
        };

        let mut result = CullResult::default();

        if settings.kernel_cull_enabled {
            result.kernels_culled = KernelPolicy::new(self.managers.kernels.as_ref())
                .run(now, settings.kernel_cull_idle_timeout)
                .await
                .into_iter()
                .map(|id| id.to_string())
                .collect();
        }

        if settings.terminal_cull_enabled {
            let exempt = if settings.terminal_cull_disconnected_only {
                active
            } else {
                HashSet::new()
            };
            result.terminals_culled = TerminalPolicy::new(self.managers.terminals.as_deref())
                .run(now, settings.terminal_cull_idle_timeout, &exempt)
                .await
                .into_iter()
                .map(|name| name.to_string())
                .collect();
        }

        if settings.session_cull_enabled {
            result.sessions_culled = SessionPolicy::new(
                self.managers.sessions.as_ref(),
                self.managers.kernels.as_ref(),
            )
            .run(now, settings.session_cull_idle_timeout)
            .await
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        }

        if settings.workspace_cull_enabled {
            result.workspaces_culled = WorkspacePolicy::new(&self.managers.workspaces)
                .run(now, settings.workspace_cull_idle_timeout)
                .await
                .into_iter()
                .map(|id| id.to_string())
                .collect();
        }

        if !result.is_empty() {
            let mut state = self.lock_state();
            state.last_result = result.clone();
            state.consumed = false;
        }

        self.emit(CullEvent::pass_completed(&result, started.elapsed()));
        result
    }

    /// Terminal name to "has an open client tab" for every listed terminal
    pub async fn get_terminals_connection_status(&self) -> TerminalConnections {
        let mut connections = TerminalConnections::new();
        let Some(manager) = self.managers.terminals.as_ref() else {
            return connections;
        };

        let terminals = match manager.list().await {
            Ok(terminals) => terminals,
            Err(e) => {
                debug!(error = %e, "Failed to list terminals for connection status");
                return connections;
            }
        };

        let state = self.lock_state();
        for name in terminals.into_iter().filter_map(|t| t.name) {
            let active = state.active_terminals.contains(&name);
            connections.insert(name.to_string(), active);
        }
        connections
    }

    /// All workspaces with their timestamps, empty when unavailable
    pub async fn list_workspaces(&self) -> Vec<WorkspaceView> {
        let Some(manager) = self.managers.workspaces.get().await else {
            return Vec::new();
        };

        match manager.list_workspaces().await {
            Ok(workspaces) => workspaces
                .into_iter()
                .map(|w| WorkspaceView {
                    id: w.metadata.id.to_string(),
                    last_modified: w.metadata.last_modified.map(|t| t.to_string()),
                    created: w.metadata.created.map(|t| t.to_string()),
                })
                .collect(),
            Err(e) => {
                error!(error = %e, "Failed to list workspaces");
                Vec::new()
            }
        }
    }

    /// Evaluate workspaces against an explicit timeout without touching
    /// engine settings. Deletes only when `dry_run` is false.
    pub async fn preview_workspace_cull(
        &self,
        now: DateTime<Utc>,
        timeout_minutes: u64,
        dry_run: bool,
    ) -> Vec<CullReport> {
        WorkspacePolicy::new(&self.managers.workspaces)
            .evaluate(now, timeout_minutes, CullMode::from_dry_run(dry_run))
            .await
    }
}

impl Drop for CullingEngine {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = state.task.take() {
            task.cancel();
        }
    }
}
