use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use mig_scheduler_function::adapters::gce::{
    GceComputeClient, GceSettings, DEFAULT_COMPUTE_ENDPOINT, DEFAULT_METADATA_HOST,
};
use mig_scheduler_function::handlers::trigger::handle_trigger_body;
use mig_scheduler_function::runtime::config::{
    SchedulerConfig, DEFAULT_GROUP_NAME, DEFAULT_REGION, DEFAULT_SCALE_UP_SIZE,
};
use mig_scheduler_function::runtime::contract::ScaleOutcome;
use mig_scheduler_function::telemetry::{init_tracing, LogFormat};
use tracing::info;

type Error = Box<dyn std::error::Error + Send + Sync>;

/// Scales a regional managed instance group in response to Pub/Sub messages
/// delivered as CloudEvents.
#[derive(Debug, Parser)]
#[command(name = "mig_scheduler", version)]
struct Cli {
    /// Port the CloudEvent endpoint listens on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
    /// Project used when a message carries no project_id
    #[arg(long, env = "GCP_PROJECT")]
    project_id: Option<String>,
    /// Group used when a message carries no mig_name
    #[arg(long, env = "MIG_NAME", default_value = DEFAULT_GROUP_NAME)]
    mig_name: String,
    /// Region used when a message carries no region
    #[arg(long, env = "MIG_REGION", default_value = DEFAULT_REGION)]
    mig_region: String,
    /// Target size used by scale_up when a message carries no scale_up_size
    #[arg(long, env = "MIG_SCALE_UP_SIZE", default_value_t = DEFAULT_SCALE_UP_SIZE)]
    scale_up_size: u64,
    #[arg(long, env = "COMPUTE_API_ENDPOINT", default_value = DEFAULT_COMPUTE_ENDPOINT)]
    compute_endpoint: String,
    #[arg(long, env = "GCE_METADATA_HOST", default_value = DEFAULT_METADATA_HOST)]
    metadata_host: String,
    /// Static bearer token; the metadata server is used when unset
    #[arg(long, env = "GOOGLE_OAUTH_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,
    #[arg(long, env = "COMPUTE_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

impl Cli {
    fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::new(
            self.project_id.clone(),
            Some(self.mig_name.clone()),
            Some(self.mig_region.clone()),
            Some(self.scale_up_size),
        )
    }

    fn gce_settings(&self) -> GceSettings {
        GceSettings {
            endpoint: self.compute_endpoint.clone(),
            metadata_host: self.metadata_host.clone(),
            access_token: self.access_token.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

struct AppState {
    config: SchedulerConfig,
    api: GceComputeClient,
}

async fn handle_event(State(state): State<Arc<AppState>>, body: Bytes) -> Json<ScaleOutcome> {
    Json(handle_trigger_body(&body, &state.config, &state.api))
}

async fn healthz() -> &'static str {
    "ok"
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(handle_event))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = cli.scheduler_config();
    let api = GceComputeClient::new(cli.gce_settings())?;
    let state = Arc::new(AppState { config, api });

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        %addr,
        project = state.config.project_id.as_deref().unwrap_or("<unset>"),
        mig = %state.config.group_name,
        region = %state.config.region,
        scale_up_size = state.config.scale_up_size,
        "MIG scheduler listening"
    );

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    async fn serve(config: SchedulerConfig) -> SocketAddr {
        let api = GceComputeClient::new(GceSettings {
            endpoint: "http://127.0.0.1:1/compute/v1".to_string(),
            metadata_host: "127.0.0.1:1".to_string(),
            access_token: Some("static-token".to_string()),
            request_timeout: Duration::from_secs(2),
        })
        .expect("client should build");
        let state = Arc::new(AppState { config, api });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let addr = listener.local_addr().expect("listener should have an address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app(state)).await;
        });
        addr
    }

    async fn post_body(addr: SocketAddr, body: Vec<u8>) -> (u16, Value) {
        let response = reqwest::Client::new()
            .post(format!("http://{addr}/"))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("request should reach the server");
        let status = response.status().as_u16();
        let record = response.json().await.expect("body should be JSON");
        (status, record)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn missing_project_is_a_200_record() {
        let addr = serve(SchedulerConfig::default()).await;

        for body in [scale_up_push_body(), b"not json at all".to_vec()] {
            let (status, record) = post_body(addr, body).await;
            assert_eq!(status, 200);
            assert_eq!(record, json!({"error": "Project ID not configured"}));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn malformed_body_is_processed_as_empty_request() {
        let addr = serve(SchedulerConfig::default().with_project_id("demo-project")).await;

        let (status, record) = post_body(addr, b"\x00\x01 binary".to_vec()).await;

        assert_eq!(status, 200);
        assert_eq!(record, json!({"error": "MIG oracle-linux-mig not found"}));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn healthz_answers_ok() {
        let addr = serve(SchedulerConfig::default()).await;

        let response = reqwest::get(format!("http://{addr}/healthz"))
            .await
            .expect("request should reach the server");

        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(response.text().await.expect("body should be text"), "ok");
    }

    fn scale_up_push_body() -> Vec<u8> {
        json!({
            "message": {
                // {"action":"scale_up","scale_up_size":5}
                "data": "eyJhY3Rpb24iOiJzY2FsZV91cCIsInNjYWxlX3VwX3NpemUiOjV9",
            }
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn flags_map_onto_scheduler_config() {
        let cli = Cli::try_parse_from([
            "mig_scheduler",
            "--project-id",
            "demo-project",
            "--mig-name",
            "batch-mig",
            "--mig-region",
            "europe-west4",
            "--scale-up-size",
            "6",
        ])
        .expect("flags should parse");

        assert_eq!(
            cli.scheduler_config(),
            SchedulerConfig {
                project_id: Some("demo-project".to_string()),
                group_name: "batch-mig".to_string(),
                region: "europe-west4".to_string(),
                scale_up_size: 6,
            }
        );
    }

    #[test]
    fn blank_project_flag_is_unset() {
        let cli = Cli::try_parse_from(["mig_scheduler", "--project-id", ""])
            .expect("flags should parse");
        assert_eq!(cli.scheduler_config().project_id, None);
    }

    #[test]
    fn adapter_settings_follow_flags() {
        let cli = Cli::try_parse_from([
            "mig_scheduler",
            "--compute-endpoint",
            "http://127.0.0.1:9090/compute/v1",
            "--access-token",
            "local-token",
            "--request-timeout-secs",
            "5",
        ])
        .expect("flags should parse");

        let settings = cli.gce_settings();
        assert_eq!(settings.endpoint, "http://127.0.0.1:9090/compute/v1");
        assert_eq!(settings.access_token.as_deref(), Some("local-token"));
        assert_eq!(settings.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn rejects_non_numeric_scale_up_size() {
        assert!(Cli::try_parse_from(["mig_scheduler", "--scale-up-size", "three"]).is_err());
    }
}
