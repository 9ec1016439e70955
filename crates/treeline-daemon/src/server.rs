//! Webhook and admin HTTP endpoint
//!
//! Inbound provider notifications land on `POST /notifications` (with
//! an optional connector id path segment as the routing fallback). The
//! provider only sees a non-200 for malformed requests - every internal
//! outcome is acknowledged so repeated "failures" never get the channel
//! disabled upstream.
//!
//! The same listener carries the small connector admin surface used by
//! the control plane: create, pause, resume, sync, and teardown,
//! dispatched through the provider registry.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use treeline_core::domain::newtypes::{ChannelId, ConnectorId};
use treeline_core::domain::{Connector, ConnectorError, ProviderKind};
use treeline_core::ports::IMirrorStore;
use treeline_core::usecases::{HandleNotificationUseCase, ProviderRegistry};

/// Header carrying the provider-assigned channel id
const CHANNEL_ID_HEADER: &str = "X-Goog-Channel-ID";

/// Header carrying the provider's change description
const RESOURCE_STATE_HEADER: &str = "X-Goog-Resource-State";

/// Shared state behind the HTTP endpoint
pub struct ServerState {
    pub store: Arc<dyn IMirrorStore>,
    pub registry: ProviderRegistry,
    pub notifications: HandleNotificationUseCase,
}

/// HTTP server for webhook notifications and connector admin calls
pub struct WebhookServer {
    state: Arc<ServerState>,
    addr: SocketAddr,
}

impl WebhookServer {
    /// Creates a new `WebhookServer`
    ///
    /// # Arguments
    /// * `state` - Shared use cases and registry
    /// * `endpoint` - Address to bind, e.g. `"127.0.0.1:8466"`
    pub fn new(state: Arc<ServerState>, endpoint: &str) -> anyhow::Result<Self> {
        let addr: SocketAddr = endpoint.parse()?;
        Ok(Self { state, addr })
    }

    /// Starts the HTTP server. This future runs until the provided
    /// cancellation token is triggered.
    ///
    /// Should be spawned as a background task.
    pub async fn run(&self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "Webhook server listening");

        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, _) = result?;
                    let io = TokioIo::new(stream);
                    let state = Arc::clone(&self.state);

                    tokio::spawn(async move {
                        let service = service_fn(move |req| {
                            let state = Arc::clone(&state);
                            async move { Ok::<_, hyper::Error>(handle_request(req, &state).await) }
                        });

                        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                            error!(error = %e, "Webhook HTTP connection error");
                        }
                    });
                }
                _ = shutdown.cancelled() => {
                    info!("Webhook server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Routes parsed from the request path
#[derive(Debug, PartialEq, Eq)]
enum Route {
    /// `POST /notifications[/{connector_id}]`
    Notification(Option<ConnectorId>),
    /// `POST /connectors?provider=...`
    CreateConnector,
    /// `POST /connectors/{id}/stop|resume|sync`, `DELETE /connectors/{id}`
    Connector(ConnectorId, ConnectorAction),
    /// Anything else
    Unknown,
}

#[derive(Debug, PartialEq, Eq)]
enum ConnectorAction {
    Stop,
    Resume,
    Sync,
    Delete,
}

/// Parses the method and path into a route
fn parse_route(method: &Method, path: &str) -> Route {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    match (method, segments.as_slice()) {
        (&Method::POST, ["notifications"]) => Route::Notification(None),
        (&Method::POST, ["notifications", id]) => {
            // A malformed id in the path is ignored rather than rejected:
            // the channel header alone may still resolve the connector.
            Route::Notification(ConnectorId::from_str(id).ok())
        }
        (&Method::POST, ["connectors"]) => Route::CreateConnector,
        (&Method::POST, ["connectors", id, action]) => match ConnectorId::from_str(id) {
            Ok(id) => match *action {
                "stop" => Route::Connector(id, ConnectorAction::Stop),
                "resume" => Route::Connector(id, ConnectorAction::Resume),
                "sync" => Route::Connector(id, ConnectorAction::Sync),
                _ => Route::Unknown,
            },
            Err(_) => Route::Unknown,
        },
        (&Method::DELETE, ["connectors", id]) => match ConnectorId::from_str(id) {
            Ok(id) => Route::Connector(id, ConnectorAction::Delete),
            Err(_) => Route::Unknown,
        },
        _ => Route::Unknown,
    }
}

/// Extracts the channel id from the notification headers
fn channel_id_from_headers(req: &Request<hyper::body::Incoming>) -> Option<ChannelId> {
    req.headers()
        .get(CHANNEL_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| ChannelId::new(v.to_string()).ok())
}

/// Extracts the `provider` query parameter
fn provider_from_query(query: Option<&str>) -> Option<ProviderKind> {
    let query = query?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "provider")
        .and_then(|(_, value)| ProviderKind::from_name(value).ok())
}

fn respond(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(body.into()))
        .unwrap_or_default()
}

/// Handles a single HTTP request
async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: &ServerState,
) -> Response<Full<Bytes>> {
    let route = parse_route(req.method(), req.uri().path());

    match route {
        Route::Notification(route_connector) => {
            handle_notification(&req, route_connector, state).await
        }
        Route::CreateConnector => {
            let provider = provider_from_query(req.uri().query());
            handle_create(provider, state).await
        }
        Route::Connector(id, action) => handle_connector_action(id, action, state).await,
        Route::Unknown => respond(StatusCode::NOT_FOUND, r#"{"error":"not_found"}"#),
    }
}

/// Webhook path: 400 only for a missing channel id, 200 for everything else
async fn handle_notification(
    req: &Request<hyper::body::Incoming>,
    route_connector: Option<ConnectorId>,
    state: &ServerState,
) -> Response<Full<Bytes>> {
    let Some(channel_id) = channel_id_from_headers(req) else {
        return respond(StatusCode::BAD_REQUEST, r#"{"error":"missing_channel_id"}"#);
    };

    let resource_state = req
        .headers()
        .get(RESOURCE_STATE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    match state
        .notifications
        .execute(&channel_id, route_connector.as_ref())
        .await
    {
        Ok(outcome) => {
            info!(
                channel_id = %channel_id,
                resource_state,
                ?outcome,
                "Notification handled"
            );
        }
        Err(e) => {
            // Acknowledged anyway: the provider disables channels that
            // keep seeing failures.
            warn!(
                channel_id = %channel_id,
                resource_state,
                error = %e,
                "Notification could not be resolved"
            );
        }
    }

    respond(StatusCode::OK, r#"{"status":"acknowledged"}"#)
}

/// `POST /connectors` - create and set up a new connector
async fn handle_create(provider: Option<ProviderKind>, state: &ServerState) -> Response<Full<Bytes>> {
    let Some(provider) = provider else {
        return respond(StatusCode::BAD_REQUEST, r#"{"error":"unknown_provider"}"#);
    };

    let Some(lifecycle) = state.registry.resolve(provider) else {
        return respond(StatusCode::BAD_REQUEST, r#"{"error":"provider_not_registered"}"#);
    };

    let connector = Connector::new(provider);
    match lifecycle.create(&connector).await {
        Ok(()) => {
            let body = format!(r#"{{"connector_id":"{}"}}"#, connector.id());
            respond(StatusCode::CREATED, body)
        }
        Err(e) => {
            error!(error = %e, "Connector creation failed");
            respond(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":"create_failed"}"#)
        }
    }
}

/// Lifecycle dispatch for an existing connector
async fn handle_connector_action(
    connector_id: ConnectorId,
    action: ConnectorAction,
    state: &ServerState,
) -> Response<Full<Bytes>> {
    // Resolve the provider once from the stored aggregate, then dispatch
    // through the registry - never per-provider branching here.
    let connector = match state.store.get_connector(&connector_id).await {
        Ok(Some(connector)) => connector,
        Ok(None) => return respond(StatusCode::NOT_FOUND, r#"{"error":"connector_not_found"}"#),
        Err(e) => {
            error!(error = %format!("{e:#}"), "Connector lookup failed");
            return respond(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":"store_failed"}"#);
        }
    };

    let Some(lifecycle) = state.registry.resolve(connector.provider()) else {
        return respond(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":"provider_not_registered"}"#);
    };

    let result = match action {
        ConnectorAction::Stop => lifecycle.stop(&connector_id).await,
        ConnectorAction::Resume => lifecycle.resume(&connector_id).await,
        ConnectorAction::Sync => lifecycle.sync(&connector_id).await,
        ConnectorAction::Delete => lifecycle.cleanup(&connector_id).await,
    };

    match result {
        Ok(()) => respond(StatusCode::OK, r#"{"status":"ok"}"#),
        Err(ConnectorError::ConnectorNotFound(_)) => {
            respond(StatusCode::NOT_FOUND, r#"{"error":"connector_not_found"}"#)
        }
        Err(ConnectorError::RateLimited(_)) => {
            respond(StatusCode::TOO_MANY_REQUESTS, r#"{"error":"rate_limited"}"#)
        }
        Err(ConnectorError::Domain(e)) => {
            respond(StatusCode::CONFLICT, format!(r#"{{"error":"{e}"}}"#))
        }
        Err(e) => {
            error!(connector_id = %connector_id, error = %e, "Connector action failed");
            respond(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":"action_failed"}"#)
        }
    }
}
