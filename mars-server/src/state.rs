//! Application state shared by the HTTP handlers

use mars_runner::JobRunner;
use mars_runner::service::ReportRenderer;
use std::sync::Arc;

use crate::service::session::SessionStore;

pub struct AppState {
    pub runner: JobRunner,
    pub renderer: Arc<dyn ReportRenderer>,
    pub sessions: SessionStore,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(runner: JobRunner) -> Self {
        let renderer = runner.pipeline().renderer();
        Self {
            runner,
            renderer,
            sessions: SessionStore::new(),
        }
    }
}
