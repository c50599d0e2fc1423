mod bootstrap;
mod config;
mod domain;
mod http;

use std::sync::Arc;

use tokio::signal;

use verdict_core::{LogConfig, Logger, RequestContext, Service};

#[tokio::main]
async fn main() {
    let logger = match Logger::new(LogConfig::default()) {
        Ok(logger) => Arc::new(logger),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let scope = RequestContext::new().with_new_request_id().attach();
    let mut app = bootstrap::App::new(Arc::clone(&logger));
    let log = logger.scoped().method("main");
    log.info("created");

    if let Err(e) = app.init(&scope).await {
        log.clone().with_error(&e).with_stack().error("initialization");
        std::process::exit(1);
    }
    log.info("initialized");

    if let Err(e) = app.start(&scope).await {
        log.clone().with_error(&e).with_stack().error("listen");
        std::process::exit(1);
    }
    log.info("listening");

    shutdown_signal().await;
    log.info("graceful shutdown");
    app.close(&scope).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
