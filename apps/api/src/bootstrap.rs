//! Service bootstrapping: all wiring between layers lives here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use verdict_core::{AppError, Logger, Scope, Service};
use verdict_http::Server;

use crate::config;
use crate::domain::WeightedDecisionService;
use crate::http::{decision, sys};

pub struct App {
    logger: Arc<Logger>,
    http: Option<Server>,
}

impl App {
    /// `logger` carries the bootstrap defaults; the configured logger
    /// replaces it during [`Service::init`].
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger, http: None }
    }
}

#[async_trait]
impl Service for App {
    fn code(&self) -> &str {
        "verdict"
    }

    async fn init(&mut self, _scope: &Scope) -> Result<(), AppError> {
        let cfg = config::load_config(&self.logger)?;

        // From here on everything logs through the configured logger; the
        // process sink is installed exactly once.
        self.logger = Arc::new(Logger::new(cfg.log.clone())?);
        self.logger.init_subscriber()?;

        let mut http = Server::new(cfg.http.clone(), Arc::clone(&self.logger))?;

        let service = WeightedDecisionService::new(Arc::clone(&self.logger));
        let decision_ctrl = decision::DecisionController::new(Arc::clone(&self.logger), service);
        let sys_ctrl = sys::SysController::new();

        let handler_timeout = Duration::from_secs(cfg.http.write_timeout_sec);
        http.register_routes(sys::routes(&sys_ctrl));
        http.register_routes(decision::routes(&decision_ctrl, handler_timeout));

        self.http = Some(http);
        Ok(())
    }

    async fn start(&mut self, _scope: &Scope) -> Result<(), AppError> {
        if let Some(http) = self.http.as_mut() {
            http.listen();
        }
        Ok(())
    }

    async fn close(&mut self, _scope: &Scope) {
        if let Some(http) = self.http.as_mut() {
            http.close();
            http.closed().await;
        }
    }
}
