use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mr_combiner::combine::Combiner;
use mr_combiner::config::Config;
use mr_combiner::git::SystemGit;
use mr_combiner::gitlab::GitLabClient;
use mr_combiner::server::{AppState, build_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mr_combiner=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    let api = GitLabClient::new(&config.gitlab_url, config.gitlab_token.clone())
        .context("failed to build GitLab client")?;
    let git = SystemGit::new(config.commit_identity.clone());
    let combiner = Combiner::new(
        Arc::new(api),
        Arc::new(git),
        config.workspace_dir.clone(),
        config.trigger_tag.clone(),
    );
    let state = AppState::new(
        combiner,
        config.trigger_rules(),
        config.target_branch.clone(),
        config.secret_token.clone(),
    );
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(
        %addr,
        gitlab = %config.gitlab_url,
        target_branch = %config.target_branch,
        workspace = %config.workspace_dir.display(),
        token_check = config.secret_token.is_some(),
        "listening"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
