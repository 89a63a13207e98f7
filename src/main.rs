mod config;
mod export;
mod lang;
mod render;

use std::error::Error;
use std::sync::Arc;

use commit_stats_engine::github::directory;
use commit_stats_engine::model::RepoRef;
use commit_stats_engine::{EngineContext, RepoSource, run_report};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables from .env when present; the process
    // environment always wins.
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,commit_stats_engine=info"))
        .unwrap();

    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cfg = config::AppConfig::from_env();

    let ctx = Arc::new(EngineContext::new(cfg.github.clone(), cfg.settings.clone())?);

    let mut developers = config::load_list_file(&cfg.devs_file)?;
    let (mut source, mut malformed) = match (cfg.use_org_repos, &cfg.organization) {
        (true, Some(org)) => (RepoSource::Organization(org.clone()), Vec::new()),
        _ => {
            let text = std::fs::read_to_string(&cfg.repos_file)?;
            let (repos, dropped) = directory::parse_repo_list(&text);
            (RepoSource::Explicit(repos), dropped)
        }
    };

    if cfg.debug_mode {
        if let (Some(dev), Some(repo)) = (&cfg.debug_dev, &cfg.debug_repo) {
            match RepoRef::parse(repo) {
                Some(r) => {
                    info!(dev, repo, "debug mode: restricting run");
                    developers = vec![dev.clone()];
                    source = RepoSource::Explicit(vec![r]);
                    malformed.clear();
                }
                None => warn!(repo, "debug mode ignored: DEBUG_REPO is not owner/name"),
            }
        } else {
            warn!("debug mode ignored: DEBUG_DEV and DEBUG_REPO are both required");
        }
    }

    let mut run = run_report(ctx, developers, source, &cfg.window).await?;
    run.summary.dropped_repositories.extend(malformed);

    render::print_report(&run.report);
    render::print_summary(&run.summary);

    if let Some(path) = &cfg.csv_out {
        export::write_csv(path, &run.file_rows)?;
        info!(path = %path.display(), rows = run.file_rows.len(), "CSV export written");
    }

    Ok(())
}
