use crate::client::{GenerationClient, GenerationRequest};
use crate::context::Scope;
use crate::editor::{locate_editor, locate_form, write_and_maybe_submit, WriteOutcome};
use crate::host::HostSurface;
use crate::session::store::{HistoryStore, KeyValueStore};
use crate::session::{History, Turn};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Per-panel lifecycle. `Ready` holds the artifact that a later
/// generate-and-run will execute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PanelState {
    #[default]
    Idle,
    Generating,
    Ready(String),
    Failed(String),
}

impl PanelState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Generating => "generating",
            Self::Ready(_) => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Generate,
    GenerateAndRun,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEvent {
    HistoryChanged(History),
    StateChanged(PanelState),
    TriggerRejected(Action),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// No data source or empty prompt; nothing recorded, nothing sent.
    Skipped,
    Generated(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    NoArtifact,
    EditorMissing,
    Ran(WriteOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Generate(GenerateOutcome),
    Run(RunOutcome),
}

pub struct Orchestrator<C, S, H> {
    scope: Scope,
    client: C,
    store: HistoryStore<S>,
    host: H,
    history: History,
    state: PanelState,
    events: Option<Sender<PanelEvent>>,
}

impl<C, S, H> Orchestrator<C, S, H>
where
    C: GenerationClient,
    S: KeyValueStore,
    H: HostSurface,
{
    /// Loads the persisted history; a fresh mount never carries an artifact.
    pub fn mount(scope: Scope, client: C, store: HistoryStore<S>, host: H) -> Self {
        let history = store.load();
        info!(
            scope = %scope.describe(),
            key = store.key(),
            turns = history.len(),
            "assistant panel mounted"
        );
        Self {
            scope,
            client,
            store,
            host,
            history,
            state: PanelState::Idle,
            events: None,
        }
    }

    pub fn with_events(mut self, events: Sender<PanelEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn artifact(&self) -> Option<&str> {
        match &self.state {
            PanelState::Ready(sql) => Some(sql),
            _ => None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    fn publish(&self, event: PanelEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    fn transition(&mut self, state: PanelState) {
        info!(from = self.state.name(), to = state.name(), "panel state changed");
        self.state = state;
        self.publish(PanelEvent::StateChanged(self.state.clone()));
    }

    fn append(&mut self, turn: Turn) {
        self.history.push(turn);
        // Best effort: a failed write never interrupts the conversation.
        if let Err(err) = self.store.save(&self.history) {
            warn!(key = self.store.key(), error = %err, "history not persisted");
        }
        self.publish(PanelEvent::HistoryChanged(self.history.clone()));
    }

    pub async fn generate(&mut self, prompt: &str) -> GenerateOutcome {
        let prompt = prompt.trim();
        let Some(db) = self.scope.data_source.clone() else {
            return GenerateOutcome::Skipped;
        };
        if prompt.is_empty() {
            return GenerateOutcome::Skipped;
        }

        self.append(Turn::user(prompt));
        self.transition(PanelState::Generating);

        let request = GenerationRequest {
            db,
            table: self.scope.table.clone(),
            prompt: prompt.to_string(),
            history: self.history.clone(),
        };

        match self.client.generate(&request).await {
            Ok(sql) => {
                self.append(Turn::assistant(sql.as_str()));
                self.transition(PanelState::Ready(sql.clone()));
                if let Some(editor) = locate_editor(&self.host) {
                    write_and_maybe_submit(&mut self.host, editor, None, &sql, false);
                }
                GenerateOutcome::Generated(sql)
            }
            Err(err) => {
                let message = err.to_string();
                warn!(error = %message, "sql generation failed");
                self.append(Turn::error(&message));
                self.transition(PanelState::Failed(message.clone()));
                GenerateOutcome::Failed(message)
            }
        }
    }

    /// Generates first only when no artifact is held, then writes the
    /// artifact into the editor and submits its form when there is one.
    pub async fn generate_and_run(&mut self, prompt: &str) -> RunOutcome {
        if self.artifact().is_none() {
            self.generate(prompt).await;
        }
        let Some(sql) = self.artifact().map(str::to_string) else {
            return RunOutcome::NoArtifact;
        };

        let Some(editor) = locate_editor(&self.host) else {
            return RunOutcome::EditorMissing;
        };
        let form = locate_form(&self.host, editor);
        let outcome = write_and_maybe_submit(&mut self.host, editor, form, &sql, true);
        info!(submitted = outcome == WriteOutcome::Submitted, "artifact handed to editor");
        RunOutcome::Ran(outcome)
    }

    pub async fn run_action(&mut self, action: Action, prompt: &str) -> ActionOutcome {
        match action {
            Action::Generate => ActionOutcome::Generate(self.generate(prompt).await),
            Action::GenerateAndRun => ActionOutcome::Run(self.generate_and_run(prompt).await),
        }
    }
}

/// Owns a mounted panel's orchestrator and lets one action run at a time.
/// A trigger that arrives while another is in flight is rejected.
pub struct PanelController<C, S, H> {
    orchestrator: Arc<Mutex<Orchestrator<C, S, H>>>,
    runtime: Handle,
    events: Sender<PanelEvent>,
}

impl<C, S, H> PanelController<C, S, H>
where
    C: GenerationClient + 'static,
    S: KeyValueStore + 'static,
    H: HostSurface + Send + 'static,
{
    pub fn new(
        orchestrator: Orchestrator<C, S, H>,
        runtime: Handle,
        events: Sender<PanelEvent>,
    ) -> Self {
        Self {
            orchestrator: Arc::new(Mutex::new(orchestrator.with_events(events.clone()))),
            runtime,
            events,
        }
    }

    pub fn trigger(&self, action: Action, prompt: String) -> Option<JoinHandle<ActionOutcome>> {
        let Ok(mut orchestrator) = Arc::clone(&self.orchestrator).try_lock_owned() else {
            warn!(?action, "action rejected, generation already in flight");
            let _ = self.events.send(PanelEvent::TriggerRejected(action));
            return None;
        };

        Some(
            self.runtime
                .spawn(async move { orchestrator.run_action(action, &prompt).await }),
        )
    }

    pub fn is_busy(&self) -> bool {
        self.orchestrator.try_lock().is_err()
    }
}
