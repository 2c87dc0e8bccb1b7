use crate::event::AppEvent;
use crate::rows::{cell_text, fetch_rows, QueryRows};
use crate::theme::Theme;
use eframe::egui::{self, RichText, ScrollArea};
use sqlwriter::client::HttpGenerationClient;
use sqlwriter::config::AppConfig;
use sqlwriter::context::Scope;
use sqlwriter::editor::{locate_editor, locate_form, EditorHandle, FormHandle};
use sqlwriter::host::mount::{mount, Mounted, PANEL_ELEMENT_ID, PANEL_LABEL};
use sqlwriter::host::page::{Page, SharedPage, ROWS_MARKER};
use sqlwriter::host::HostSurface;
use sqlwriter::orchestrator::{Action, Orchestrator, PanelController, PanelEvent, PanelState};
use sqlwriter::session::store::{FileStore, HistoryStore};
use sqlwriter::session::History;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::runtime::Handle;
use tracing::{info, warn};

type AssistantController = PanelController<HttpGenerationClient, Arc<FileStore>, SharedPage>;

struct MountedPanel {
    controller: AssistantController,
    events: Receiver<PanelEvent>,
    transcript: History,
    state: PanelState,
    prompt: String,
}

struct QueryView {
    sql: String,
    outcome: Result<QueryRows, String>,
}

enum Block {
    Heading(String),
    Panel,
    Editor {
        editor: EditorHandle,
        form: Option<FormHandle>,
    },
    Rows,
}

pub struct SqlWriterApp {
    runtime: Handle,
    config: AppConfig,
    client: HttpGenerationClient,
    store: Arc<FileStore>,
    http: reqwest::Client,
    tx: Sender<AppEvent>,
    rx: Receiver<AppEvent>,
    theme: Theme,
    location_input: String,
    scope: Scope,
    page: SharedPage,
    panel: Option<MountedPanel>,
    results: Option<QueryView>,
    query_running: bool,
    diagnostics_log: Vec<String>,
}

impl SqlWriterApp {
    pub fn new(
        runtime: Handle,
        config: AppConfig,
        client: HttpGenerationClient,
        store: Arc<FileStore>,
        theme: Theme,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let start_location = config.ui.start_location.clone();
        let mut app = Self {
            runtime,
            config,
            client,
            store,
            http: reqwest::Client::new(),
            tx,
            rx,
            theme,
            location_input: start_location.clone(),
            scope: Scope::default(),
            page: SharedPage::new(Page::new("/")),
            panel: None,
            results: None,
            query_running: false,
            diagnostics_log: Vec::new(),
        };
        let _ = app.navigate(&start_location);
        app
    }

    fn timestamp() -> String {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(duration) => duration.as_secs().to_string(),
            Err(_) => "0".to_string(),
        }
    }

    fn log_diagnostic(&mut self, message: impl Into<String>) {
        self.diagnostics_log
            .push(format!("[{}] {}", Self::timestamp(), message.into()));
    }

    /// Loads a fresh page for `location` and remounts the panel. The pending
    /// artifact of the previous panel is dropped with it. Refused while the
    /// current panel is generating, since its task still appends history.
    fn navigate(&mut self, location: &str) -> bool {
        if self.generation_in_flight() {
            warn!(location, "navigation refused while generation is in flight");
            self.log_diagnostic(format!("stay on page: generation in flight, {location} not loaded"));
            return false;
        }

        let location = match location.trim() {
            "" => "/",
            trimmed => trimmed,
        };
        self.scope = Scope::from_location(location);
        let mut page = Page::for_location(location);
        let placement = mount(&mut page, &self.scope);
        self.page = SharedPage::new(page);
        self.results = None;
        self.query_running = false;

        self.panel = match placement {
            Mounted::Skipped => None,
            _ => Some(self.mount_panel()),
        };

        info!(location, scope = %self.scope.describe(), ?placement, "page loaded");
        self.log_diagnostic(format!("loaded {location} ({placement:?})"));
        true
    }

    fn mount_panel(&self) -> MountedPanel {
        let (tx, events) = mpsc::channel();
        let history = HistoryStore::for_scope(
            Arc::clone(&self.store),
            self.config.storage.history_scope,
            &self.scope,
        );
        let orchestrator = Orchestrator::mount(
            self.scope.clone(),
            self.client.clone(),
            history,
            self.page.clone(),
        );
        let transcript = orchestrator.history().clone();

        MountedPanel {
            controller: PanelController::new(orchestrator, self.runtime.clone(), tx),
            events,
            transcript,
            state: PanelState::Idle,
            prompt: String::new(),
        }
    }

    fn drain_events(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.apply_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.log_diagnostic("event channel disconnected");
                    break;
                }
            }
        }

        let mut diagnostics = Vec::new();
        if let Some(panel) = self.panel.as_mut() {
            for event in panel.events.try_iter() {
                match event {
                    PanelEvent::HistoryChanged(history) => panel.transcript = history,
                    PanelEvent::StateChanged(state) => {
                        if let PanelState::Failed(message) = &state {
                            diagnostics.push(format!("generation failed: {message}"));
                        }
                        panel.state = state;
                    }
                    PanelEvent::TriggerRejected(action) => {
                        diagnostics.push(format!("{action:?} ignored while generating"));
                    }
                }
            }
        }
        for message in diagnostics {
            self.log_diagnostic(message);
        }
    }

    fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::QueryFinished {
                location,
                sql,
                result,
            } => {
                if location != self.page.lock().location() {
                    return;
                }
                if let Err(err) = &result {
                    self.log_diagnostic(format!("query failed: {err}"));
                }
                self.query_running = false;
                self.results = Some(QueryView {
                    sql,
                    outcome: result,
                });
            }
        }
    }

    /// Runs whatever forms were submitted since the last frame.
    fn run_submissions(&mut self) {
        let (location, submissions) = {
            let mut page = self.page.lock();
            (page.location().to_string(), page.take_submissions())
        };

        for submission in submissions {
            let Some(sql) = submission.sql().map(str::to_string) else {
                continue;
            };
            let Some(db) = self.scope.data_source.clone() else {
                warn!("submission without a database ignored");
                continue;
            };

            self.query_running = true;
            let http = self.http.clone();
            let base = self.config.endpoint.base().to_string();
            let tx = self.tx.clone();
            let location = location.clone();
            self.runtime.spawn(async move {
                let result = fetch_rows(&http, &base, &db, &sql)
                    .await
                    .map_err(|err| err.to_string());
                let _ = tx.send(AppEvent::QueryFinished {
                    location,
                    sql,
                    result,
                });
            });
        }
    }

    fn generation_in_flight(&self) -> bool {
        self.panel
            .as_ref()
            .is_some_and(|panel| panel.controller.is_busy())
    }

    fn is_busy(&self) -> bool {
        self.query_running || self.generation_in_flight()
    }

    fn layout(&self) -> Vec<Block> {
        let page = self.page.lock();
        let editor = locate_editor(&*page);
        let editor_form = editor.and_then(|editor| locate_form(&*page, editor));
        let mut blocks = Vec::new();

        for node in page.document_order() {
            match page.tag_name(node).as_deref() {
                Some("h1") => blocks.push(Block::Heading(page.text(node).unwrap_or_default())),
                Some("div") if page.attribute(node, "id") == Some(PANEL_ELEMENT_ID) => {
                    blocks.push(Block::Panel)
                }
                Some("div") if page.has_attribute(node, ROWS_MARKER) => {
                    if !page.panels().is_empty() {
                        blocks.push(Block::Panel);
                    }
                    blocks.push(Block::Rows);
                }
                Some("form") if editor_form.map(|form| form.0) == Some(node) => {
                    if let Some(editor) = editor {
                        blocks.push(Block::Editor {
                            editor,
                            form: editor_form,
                        });
                    }
                }
                _ => {}
            }
        }
        blocks
    }

    fn render_location_bar(&mut self, ctx: &egui::Context) {
        let can_navigate = !self.generation_in_flight();
        let mut go = false;
        egui::TopBottomPanel::top("location_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("SQL Writer");
                ui.separator();
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.location_input)
                        .desired_width(360.0)
                        .hint_text("/database/table"),
                );
                if can_navigate
                    && response.lost_focus()
                    && ui.input(|i| i.key_pressed(egui::Key::Enter))
                {
                    go = true;
                }
                go |= ui
                    .add_enabled(can_navigate, egui::Button::new("Go"))
                    .clicked();
                ui.separator();
                ui.label(RichText::new(self.config.endpoint.base()).color(self.theme.text_muted));
            });
        });

        if go {
            let location = self.location_input.clone();
            let _ = self.navigate(&location);
        }
    }

    fn render_panel(&mut self, ui: &mut egui::Ui) {
        let theme = self.theme.clone();
        let Some(panel) = self.panel.as_mut() else {
            return;
        };

        let mut action = None;
        theme.panel_frame().show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.strong(PANEL_LABEL);
                if ui.small_button("Copy log").clicked() {
                    ui.ctx().copy_text(panel.transcript.render_log());
                }
            });

            ScrollArea::vertical()
                .id_salt("chat_log")
                .max_height(140.0)
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    if panel.transcript.is_empty() {
                        ui.label(RichText::new("LLM chat log...").color(theme.text_muted));
                    }
                    for turn in panel.transcript.turns() {
                        ui.label(RichText::new(turn.log_line()).color(theme.turn_color(turn)));
                    }
                });

            ui.add(
                egui::TextEdit::multiline(&mut panel.prompt)
                    .desired_rows(3)
                    .desired_width(f32::INFINITY)
                    .hint_text("Describe the query you want..."),
            );

            let busy = panel.state == PanelState::Generating;
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(!busy, egui::Button::new("Generate Only"))
                    .clicked()
                {
                    action = Some(Action::Generate);
                }
                if ui
                    .add_enabled(!busy, egui::Button::new("Generate & Run"))
                    .clicked()
                {
                    action = Some(Action::GenerateAndRun);
                }
                if busy {
                    ui.spinner();
                }
                let (label, color) = theme.state_label(&panel.state);
                ui.label(RichText::new(label).color(color));
            });
        });

        if let Some(action) = action {
            let _ = panel.controller.trigger(action, panel.prompt.clone());
        }
    }

    fn render_editor(&mut self, ui: &mut egui::Ui, editor: EditorHandle, form: Option<FormHandle>) {
        let mut text = self.page.text(editor.0).unwrap_or_default();
        let mut submit = false;

        self.theme.editor_frame().show(ui, |ui| {
            let response = ui.add(
                egui::TextEdit::multiline(&mut text)
                    .code_editor()
                    .desired_rows(6)
                    .desired_width(f32::INFINITY)
                    .hint_text("select * from ..."),
            );
            if response.changed() {
                self.page.lock().set_text(editor.0, &text);
            }
            submit = ui
                .add_enabled(form.is_some(), egui::Button::new("Run SQL"))
                .clicked();
        });

        if let (true, Some(form)) = (submit, form) {
            self.page.lock().submit(form.0);
        }
    }

    fn render_rows(&self, ui: &mut egui::Ui) {
        if self.query_running {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Running query...");
            });
            return;
        }

        let Some(view) = &self.results else {
            ui.label(RichText::new("Run a query to see rows").color(self.theme.text_muted));
            return;
        };

        ui.label(RichText::new(&view.sql).monospace().color(self.theme.text_muted));
        match &view.outcome {
            Err(message) => {
                ui.label(RichText::new(message).color(self.theme.danger));
            }
            Ok(rows) => {
                ui.label(format!("{} rows", rows.rows.len()));
                ScrollArea::both()
                    .id_salt("query_rows")
                    .max_height(360.0)
                    .show(ui, |ui| {
                        egui::Grid::new("rows_grid").striped(true).show(ui, |ui| {
                            for column in &rows.columns {
                                ui.strong(column);
                            }
                            ui.end_row();
                            for row in &rows.rows {
                                for cell in row {
                                    ui.label(cell_text(cell));
                                }
                                ui.end_row();
                            }
                        });
                    });
            }
        }
    }

    fn render_page(&mut self, ctx: &egui::Context) {
        let blocks = self.layout();
        egui::CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical()
                .id_salt("page")
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    for block in blocks {
                        match block {
                            Block::Heading(text) => {
                                ui.heading(text);
                            }
                            Block::Panel => self.render_panel(ui),
                            Block::Editor { editor, form } => self.render_editor(ui, editor, form),
                            Block::Rows => self.render_rows(ui),
                        }
                        ui.add_space(self.theme.spacing_8);
                    }

                    ui.separator();
                    egui::CollapsingHeader::new("Diagnostics")
                        .default_open(false)
                        .show(ui, |ui| {
                            for entry in &self.diagnostics_log {
                                ui.label(entry);
                            }
                        });
                });
        });
    }
}

impl eframe::App for SqlWriterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();
        self.run_submissions();
        self.render_location_bar(ctx);
        self.render_page(ctx);
        if self.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SqlWriterApp;
    use crate::theme::Theme;
    use axum::extract::State;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use sqlwriter::client::{HttpGenerationClient, DEFAULT_GENERATE_PATH};
    use sqlwriter::config::AppConfig;
    use sqlwriter::orchestrator::Action;
    use sqlwriter::session::store::{FileStore, HistoryStore, GLOBAL_KEY};
    use sqlwriter::session::{History, Turn};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::sync::Notify;

    async fn gated_handler(State(gate): State<Arc<Notify>>, Json(_body): Json<Value>) -> Json<Value> {
        gate.notified().await;
        Json(json!({ "sql": "select count(*) from people" }))
    }

    async fn spawn_gated_endpoint(gate: Arc<Notify>) -> String {
        let app = Router::new()
            .route(DEFAULT_GENERATE_PATH, post(gated_handler))
            .with_state(gate);
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock endpoint listener");
        let address = listener.local_addr().expect("mock endpoint local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("run mock endpoint");
        });
        format!("http://{address}")
    }

    fn app_for(base_url: String, storage: &std::path::Path) -> (SqlWriterApp, Arc<FileStore>) {
        let mut config = AppConfig::default();
        config.endpoint.base_url = base_url;
        config.storage.dir = Some(storage.to_path_buf());
        config.ui.start_location = "/mydb/people".to_string();

        let client = HttpGenerationClient::new(config.endpoint.generate_url(), Duration::from_secs(5))
            .expect("client builds");
        let store = Arc::new(FileStore::new(config.storage.storage_dir()));
        let app = SqlWriterApp::new(
            tokio::runtime::Handle::current(),
            config,
            client,
            Arc::clone(&store),
            Theme::default(),
        );
        (app, store)
    }

    #[tokio::test]
    async fn navigation_waits_for_in_flight_generation() {
        let gate = Arc::new(Notify::new());
        let base_url = spawn_gated_endpoint(Arc::clone(&gate)).await;
        let storage = tempfile::tempdir().expect("temp dir should be created");
        let (mut app, store) = app_for(base_url, storage.path());

        let task = app
            .panel
            .as_ref()
            .expect("table page mounts a panel")
            .controller
            .trigger(Action::Generate, "count people".to_string())
            .expect("first trigger accepted");

        assert!(!app.navigate("/mydb/orders"));
        assert_eq!(app.page.lock().location(), "/mydb/people");

        gate.notify_one();
        task.await.expect("generation task should finish");

        assert!(app.navigate("/mydb/orders"));
        assert_eq!(app.page.lock().location(), "/mydb/orders");

        let expected = History::from(vec![
            Turn::user("count people"),
            Turn::assistant("select count(*) from people"),
        ]);
        let panel = app.panel.as_ref().expect("table page mounts a panel");
        assert_eq!(panel.transcript, expected);
        assert_eq!(HistoryStore::new(store, GLOBAL_KEY).load(), expected);
    }

    #[tokio::test]
    async fn idle_panel_navigates_immediately() {
        let storage = tempfile::tempdir().expect("temp dir should be created");
        let (mut app, _store) = app_for("http://127.0.0.1:9".to_string(), storage.path());

        assert!(app.navigate("/mydb/-/query"));
        assert_eq!(app.scope.table, None);
        assert!(app.panel.is_some());
        assert!(app.navigate("/"));
        assert!(app.panel.is_none());
    }
}
