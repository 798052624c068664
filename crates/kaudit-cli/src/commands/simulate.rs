//! Simulate command implementation.
//!
//! Builds a request from the command line, runs it through the pipeline
//! against a policy file (or an inline level) and prints the resulting event.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{Request, StatusCode};
use clap::Args;
use tracing::{debug, info};

use kaudit_core::{AuditLevel, PolicyConfig, RequestInfo, UserInfo};
use kaudit_event::{EventDispatcher, TracingBackend};
use kaudit_pipeline::{
    Auditing, AuditingConfig, InMemoryPolicyStore, MemoryResponse, ResponseCapture,
    ResponseWriter,
};

/// Arguments for the simulate command.
#[derive(Args)]
pub struct SimulateArgs {
    /// Pipeline configuration file (YAML)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Policy file (YAML); overrides --level
    #[arg(long, short)]
    pub policy: Option<PathBuf>,

    /// Audit level of the well-known policy when no policy file is given
    #[arg(long, default_value = "Metadata")]
    pub level: AuditLevel,

    /// HTTP method
    #[arg(long, short = 'X', default_value = "GET")]
    pub method: String,

    /// Request path
    #[arg(default_value = "/")]
    pub path: String,

    /// Username of the principal
    #[arg(long, short)]
    pub user: Option<String>,

    /// Group of the principal (repeatable)
    #[arg(long = "group", short)]
    pub groups: Vec<String>,

    /// Value of the X-Client-IP header
    #[arg(long)]
    pub client_ip: Option<String>,

    /// Peer address of the connection
    #[arg(long)]
    pub remote_addr: Option<SocketAddr>,

    /// Routing verb (defaults to the lowercased method)
    #[arg(long)]
    pub verb: Option<String>,

    /// Resource kind; marks the request as a resource request
    #[arg(long)]
    pub resource: Option<String>,

    /// API group of the resource
    #[arg(long, default_value = "")]
    pub api_group: String,

    /// API version of the resource
    #[arg(long, default_value = "v1")]
    pub api_version: String,

    /// Object name
    #[arg(long)]
    pub name: Option<String>,

    /// Namespace of the object
    #[arg(long)]
    pub namespace: Option<String>,

    /// Workspace scope
    #[arg(long)]
    pub workspace: Option<String>,

    /// Response status the handler sends; omit to simulate an aborted request
    #[arg(long)]
    pub status: Option<u16>,

    /// Pretty-print the event
    #[arg(long)]
    pub pretty: bool,
}

/// Runs the simulate command.
pub fn run(args: &SimulateArgs) -> Result<()> {
    match simulate(args)? {
        Some(event) => println!("{event}"),
        None => info!("Auditing disabled by policy, no event emitted"),
    }
    Ok(())
}

fn simulate(args: &SimulateArgs) -> Result<Option<String>> {
    let config = match &args.config {
        Some(path) => AuditingConfig::from_file(path)?,
        None => AuditingConfig::default(),
    };

    let policies = match &args.policy {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            PolicyConfig::from_yaml(&content)?
        }
        None => vec![PolicyConfig::new(config.policy_name.as_str(), args.level)],
    };
    let store = Arc::new(InMemoryPolicyStore::with_policies(policies));

    let (channel, mut receiver) = config.channel_backend();
    let dispatcher = EventDispatcher::builder()
        .with_backend(Arc::new(channel))
        .with_backend(Arc::new(TracingBackend::new()))
        .build();
    let auditing = Auditing::new(&config, store, dispatcher)?;

    if !auditing.is_enabled() {
        return Ok(None);
    }

    let request = build_request(args)?;
    let user = args
        .user
        .as_ref()
        .map(|name| UserInfo::new(name.as_str()).with_groups(args.groups.iter().cloned()));
    let pending = auditing.on_request_received(&request, user.as_ref(), args.remote_addr);
    debug!(audit_id = %pending.audit_id(), "Request received");

    let mut capture = ResponseCapture::new(MemoryResponse::new());
    if let Some(code) = args.status {
        let status = StatusCode::from_u16(code).with_context(|| format!("invalid status {code}"))?;
        capture.write_header(status);
    }
    let (_, captured) = capture.into_parts();

    auditing.finish(pending, captured, &request_info(args));

    let Ok(json) = receiver.try_recv() else {
        anyhow::bail!("pipeline produced no event");
    };
    if args.pretty {
        let value: serde_json::Value = serde_json::from_str(&json)?;
        return Ok(Some(serde_json::to_string_pretty(&value)?));
    }
    Ok(Some(json))
}

fn build_request(args: &SimulateArgs) -> Result<Request<()>> {
    let mut builder = Request::builder()
        .method(args.method.as_str())
        .uri(args.path.as_str());
    if let Some(ip) = &args.client_ip {
        builder = builder.header(kaudit_pipeline::X_CLIENT_IP, ip.as_str());
    }
    builder.body(()).context("invalid request")
}

fn request_info(args: &SimulateArgs) -> RequestInfo {
    let verb = args
        .verb
        .clone()
        .unwrap_or_else(|| args.method.to_ascii_lowercase());
    let path = args.path.split('?').next().unwrap_or_default();

    let mut info = match &args.resource {
        Some(resource) => RequestInfo::resource(
            verb,
            args.api_group.as_str(),
            args.api_version.as_str(),
            resource.as_str(),
        )
        .with_path(path),
        None => RequestInfo::non_resource(verb, path),
    };
    if let Some(name) = &args.name {
        info = info.with_name(name.as_str());
    }
    if let Some(namespace) = &args.namespace {
        info = info.with_namespace(namespace.as_str());
    }
    if let Some(workspace) = &args.workspace {
        info = info.with_workspace(workspace.as_str());
    }
    info
}
