//! # Command Surface
//!
//! External control over the engine, as JSON envelopes that a popup, a devtools panel or the CLI
//! can send. The router also keeps the log of compatibility findings for whoever wants to show
//! them to the user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dom::Document;
use crate::engine::{log_failure, RetroTransformer};
use crate::probe::IncompatibilityReport;
use crate::settings::{Settings, SettingsStore};

/// Default number of findings kept before the oldest are dropped
pub const DEFAULT_LOG_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    GetSettings,
    UpdateSettings(Settings),
    ToggleExtension,
    Activate,
    Deactivate,
    IncompatibilityDetected(IncompatibilityReport),
    GetIncompatibilities,
    ClearIncompatibilities,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum CommandResponse {
    Settings { settings: Settings },
    State { active: bool },
    Incompatibilities { entries: Vec<IncompatibilityEntry> },
    Ack,
    Error { message: String },
}

/// One compatibility report with where and when it was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncompatibilityEntry {
    pub detected_at: DateTime<Utc>,
    pub location: String,
    pub report: IncompatibilityReport,
}

/// Bounded, oldest-first record of compatibility findings
#[derive(Debug, Clone)]
pub struct IncompatibilityLog {
    entries: Vec<IncompatibilityEntry>,
    capacity: usize,
}

impl IncompatibilityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&mut self, location: &str, report: IncompatibilityReport) {
        self.entries.push(IncompatibilityEntry {
            detected_at: Utc::now(),
            location: location.to_string(),
            report,
        });
        if self.entries.len() > self.capacity {
            let excess = self.entries.len() - self.capacity;
            self.entries.drain(..excess);
        }
    }

    pub fn entries(&self) -> &[IncompatibilityEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for IncompatibilityLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

/// Routes commands to the engine, the settings store and the incompatibility log
pub struct CommandRouter<D: Document> {
    engine: RetroTransformer<D>,
    store: Box<dyn SettingsStore>,
    log: IncompatibilityLog,
}

impl<D: Document> CommandRouter<D> {
    /// Wire up a router; the engine starts from whatever the store holds
    pub fn new(engine: RetroTransformer<D>, store: Box<dyn SettingsStore>) -> Self {
        let engine = match store.load() {
            Ok(settings) => engine.with_settings(settings),
            Err(e) => {
                warn!("Settings store unreadable, keeping defaults: {}", e);
                engine
            }
        };
        Self {
            engine,
            store,
            log: IncompatibilityLog::default(),
        }
    }

    pub fn engine(&self) -> &RetroTransformer<D> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut RetroTransformer<D> {
        &mut self.engine
    }

    pub fn into_engine(self) -> RetroTransformer<D> {
        self.engine
    }

    pub fn log(&self) -> &IncompatibilityLog {
        &self.log
    }

    fn active(&self) -> CommandResponse {
        CommandResponse::State {
            active: self.engine.is_active(),
        }
    }

    /// Settings as the store currently holds them; the engine's copy if the store is unreadable
    fn stored_settings(&self) -> Settings {
        match self.store.load() {
            Ok(settings) => settings,
            Err(e) => {
                log_failure("Loading settings", &e);
                self.engine.settings().clone()
            }
        }
    }

    fn persist(&mut self, settings: &Settings) {
        if let Err(e) = self.store.save(settings) {
            log_failure("Saving settings", &e);
        }
    }

    async fn activate(&mut self) {
        if self.engine.is_active() {
            return;
        }
        self.engine.activate().await;
        if let Some(report) = self.engine.last_report() {
            if report.has_issues {
                let location = self.engine.document().location();
                self.log.record(&location, report.clone());
            }
        }
    }

    pub async fn dispatch(&mut self, command: Command) -> CommandResponse {
        debug!("Command: {:?}", command);
        match command {
            Command::GetSettings => CommandResponse::Settings {
                settings: self.stored_settings(),
            },
            Command::UpdateSettings(settings) => {
                self.persist(&settings);
                self.engine.update_settings(settings).await;
                self.active()
            }
            Command::ToggleExtension => {
                let mut settings = self.engine.settings().clone();
                settings.enabled = !settings.enabled;
                info!(
                    "Retro skin {}",
                    if settings.enabled { "enabled" } else { "disabled" }
                );
                self.persist(&settings);
                let enable = settings.enabled;
                self.engine.update_settings(settings).await;
                if enable {
                    self.activate().await;
                }
                self.active()
            }
            Command::Activate => {
                self.activate().await;
                self.active()
            }
            Command::Deactivate => {
                self.engine.deactivate();
                self.active()
            }
            Command::IncompatibilityDetected(report) => {
                let location = self.engine.document().location();
                self.log.record(&location, report);
                CommandResponse::Ack
            }
            Command::GetIncompatibilities => CommandResponse::Incompatibilities {
                entries: self.log.entries().to_vec(),
            },
            Command::ClearIncompatibilities => {
                self.log.clear();
                CommandResponse::Ack
            }
        }
    }

    /// Decode a JSON command, run it, and encode the response
    pub async fn dispatch_json(&mut self, json: &str) -> String {
        let response = match serde_json::from_str::<Command>(json) {
            Ok(command) => self.dispatch(command).await,
            Err(e) => CommandResponse::Error {
                message: format!("Malformed command: {}", e),
            },
        };
        serde_json::to_string(&response).unwrap_or_else(|e| {
            format!("{{\"status\":\"error\",\"message\":\"{}\"}}", e)
        })
    }
}
