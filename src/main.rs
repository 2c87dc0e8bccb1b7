mod app;
mod event;
mod rows;
mod theme;

use app::SqlWriterApp;
use eframe::egui;
use sqlwriter::client::HttpGenerationClient;
use sqlwriter::config::AppConfig;
use sqlwriter::session::store::FileStore;
use std::sync::Arc;
use theme::Theme;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.ui.log_filter);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("sqlwriter-runtime")
        .build()?;

    let client =
        HttpGenerationClient::new(config.endpoint.generate_url(), config.endpoint.timeout())?;
    let store = Arc::new(FileStore::new(config.storage.storage_dir()));
    info!(
        endpoint = client.endpoint(),
        storage = %config.storage.storage_dir().display(),
        history_scope = ?config.storage.history_scope,
        "sql writer starting"
    );

    let theme = Theme::default();
    let handle = runtime.handle().clone();
    let _runtime = runtime;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "SQL Writer",
        native_options,
        Box::new(move |creation_context| {
            theme.apply_visuals(&creation_context.egui_ctx);
            Ok(Box::new(SqlWriterApp::new(
                handle, config, client, store, theme,
            )))
        }),
    )?;

    Ok(())
}
