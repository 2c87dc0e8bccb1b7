use crate::rows::QueryRows;

/// Host-side work finishing on the runtime and reported back to the UI.
#[derive(Debug, Clone)]
pub enum AppEvent {
    QueryFinished {
        location: String,
        sql: String,
        result: Result<QueryRows, String>,
    },
}
