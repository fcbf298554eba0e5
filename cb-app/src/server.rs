//! Chatterbox entrypoints: the WebChat server, the terminal chat, and doctor.

use crate::config::ChatterboxConfig;
use crate::conversation::Conversation;
use crate::driver::drive;
use crate::gateway::Gateway;
use crate::random::RngSource;
use crate::routes;
use crate::schedule::SystemClock;
use crate::sources::build_source;
use anyhow::Result;
use axum::Extension;
use axum::http::HeaderMap;
use axum::http::Request;
use axum::response::Response;
use cb_channels::{ConsoleSink, WebChatAdapter};
use cb_sources::ContentKind;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::trace::TraceLayer;

const INBOUND_CAPACITY: usize = 256;

pub async fn doctor(config_path: Option<PathBuf>) -> Result<()> {
    let (cfg, path) = ChatterboxConfig::load_with_path(config_path).await?;
    for kind in [ContentKind::Fact, ContentKind::Question, ContentKind::Excuse] {
        let resolved = cfg.sources.resolve(kind);
        let built = build_source(&resolved, cfg.http.timeout())?;
        tracing::info!(
            kind = %kind,
            mode = built.source.mode(),
            upstream = ?resolved.upstream,
            base_url = resolved
                .base_url
                .as_deref()
                .unwrap_or(resolved.upstream.default_base_url()),
            preload = built.preload.is_some(),
            "content source ok"
        );
    }
    tracing::info!(
        threshold_min = cfg.session.threshold_min,
        threshold_max = cfg.session.threshold_max,
        caption_delay_ms = cfg.session.caption_delay_ms,
        decorative_links = cfg.decorative_links().len(),
        config_path = %path.display(),
        "config ok"
    );
    Ok(())
}

/// Run one conversation on the terminal: stdin lines in, transcript out.
pub async fn chat(config_path: Option<PathBuf>) -> Result<()> {
    let cfg = ChatterboxConfig::load(config_path).await?;
    let conversation = Conversation::from_config(
        &cfg,
        Box::new(RngSource::from_entropy()),
        Arc::new(SystemClock::new()),
    )?;

    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(%e, "stdin read failed");
                    break;
                }
            }
        }
    });

    let sink = ConsoleSink::stdout();
    drive(conversation, &sink, rx).await
}

pub async fn serve(config_path: Option<PathBuf>) -> Result<()> {
    let (cfg, cfg_path) = ChatterboxConfig::load_with_path(config_path).await?;
    let addr: SocketAddr = format!("{}:{}", cfg.server.bind, cfg.server.port)
        .parse()
        .map_err(|e| {
            anyhow::anyhow!(
                "invalid server address {}:{}: {e}",
                cfg.server.bind,
                cfg.server.port
            )
        })?;
    tracing::info!(
        config_path = %cfg_path.display(),
        bind_addr = %addr,
        threshold_min = cfg.session.threshold_min,
        threshold_max = cfg.session.threshold_max,
        caption_delay_ms = cfg.session.caption_delay_ms,
        fact_mode = ?cfg.sources.fact.mode,
        question_mode = ?cfg.sources.question.mode,
        http_timeout_seconds = cfg.http.timeout_seconds,
        "server configuration loaded"
    );
    let listener = preflight_bind_listener(addr).await?;

    let webchat = Arc::new(WebChatAdapter::new());
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
    webchat.start(inbound_tx).await;

    let gateway = Arc::new(Gateway::new(Arc::new(cfg), webchat.clone(), inbound_rx));
    let shutdown = CancellationToken::new();
    let gateway_handle = gateway.clone().start(shutdown.child_token());
    tracing::info!("gateway started");

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
                request_id = %request_id_from_headers(request.headers())
            )
        })
        .on_request(|request: &Request<_>, _span: &tracing::Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "http request started"
            );
        })
        .on_response(
            |response: &Response, latency: Duration, _span: &tracing::Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis() as u64,
                    "http request completed"
                );
            },
        )
        .on_failure(
            |error: ServerErrorsFailureClass, latency: Duration, _span: &tracing::Span| {
                tracing::error!(
                    error_class = %error,
                    latency_ms = latency.as_millis() as u64,
                    "http request failed"
                );
            },
        );

    let app = webchat
        .clone()
        .router()
        .merge(routes::router().layer(Extension(gateway.clone())))
        .layer(trace_layer);

    tracing::info!(%addr, "chatterbox serving");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;
    tracing::info!("http server shutdown completed");

    shutdown.cancel();
    match gateway_handle.await {
        Ok(()) => tracing::info!("gateway shutdown completed"),
        Err(e) => tracing::error!(error = %e, "gateway task join failed during shutdown"),
    }

    Ok(())
}

async fn preflight_bind_listener(addr: SocketAddr) -> Result<tokio::net::TcpListener> {
    tracing::info!(%addr, "preflight bind check starting");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("preflight bind failed for {addr}: {e}"))?;
    tracing::info!(%addr, "preflight bind check passed");
    Ok(listener)
}

fn request_id_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "missing".to_string())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(sig) => sig,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler; falling back to ctrl_c only");
                if let Err(ctrlc_err) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %ctrlc_err, "failed to await ctrl-c signal");
                }
                shutdown.cancel();
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("received ctrl-c; beginning graceful shutdown");
            }
            _ = terminate.recv() => {
                tracing::warn!("received SIGTERM; beginning graceful shutdown");
            }
            _ = shutdown.cancelled() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::select! {
            res = tokio::signal::ctrl_c() => match res {
                Ok(()) => tracing::warn!("received ctrl-c; beginning graceful shutdown"),
                Err(e) => tracing::error!(error = %e, "failed to await ctrl-c signal"),
            },
            _ = shutdown.cancelled() => {}
        }
    }
    shutdown.cancel();
}
