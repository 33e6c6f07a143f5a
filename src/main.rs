use atlas::{
    AppState, Config, DaedraSearchClient, LLMClient, LLMClientFactory, PipelineRunner,
    SearchClient, api::routes,
};
use clap::Parser;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "atlas-server", version, about = "A.T.L.A.S research pipeline server")]
struct Cli {
    /// Bind address (overrides ATLAS_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides ATLAS_PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atlas=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let provider = config.llm.provider()?;
    tracing::info!(
        provider = provider.name(),
        model = provider.model(),
        "creating language collaborator"
    );
    let factory = LLMClientFactory::new(provider);
    let llm: Arc<dyn LLMClient> = Arc::from(factory.create_default());
    let search: Arc<dyn SearchClient> = Arc::new(DaedraSearchClient::new());

    let runner = Arc::new(PipelineRunner::new(
        llm,
        search,
        config.search.max_results,
        config.pipeline.runner_settings(),
    ));

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState {
        config: Arc::new(config),
        runner,
    };

    let app = routes::create_router()
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    tracing::info!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
