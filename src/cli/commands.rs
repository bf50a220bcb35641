//! CLI command implementations

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::auth::SessionManager;
use crate::config::{AppConfig, StoreBackend};
use crate::http_server::{AppState, HttpServer};
use crate::observability::init_tracing;
use crate::search::{Pipeline, QueryBuilder, SearchRequest};
use crate::store::{mongo, MongoSessionRepository, MongoStore};

use super::args::{Cli, Command, ExplainArgs};
use super::errors::{CliError, CliResult};

/// How often expired sessions are swept
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Parse arguments and run the selected command
pub async fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command).await
}

/// Run the appropriate command based on CLI args
pub async fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, port } => serve(config.as_deref(), port).await,
        Command::Explain(args) => {
            let pipeline = explain(&args)?;
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &pipeline.to_json())?;
            writeln!(stdout)?;
            Ok(())
        }
    }
}

/// Load config, build the stores, serve until shutdown
pub async fn serve(config_path: Option<&Path>, port: Option<u16>) -> CliResult<()> {
    let mut config = AppConfig::load(config_path)?;
    if let Some(port) = port {
        config.http.port = port;
    }
    init_tracing(config.logging.format);

    let state = Arc::new(build_state(&config).await?);
    spawn_session_sweeper(state.accounts.sessions().clone());

    info!(
        backend = ?config.database.backend,
        addr = %config.http.socket_addr(),
        "starting quoteversation"
    );
    HttpServer::new(config.http.clone(), state).start().await?;
    Ok(())
}

/// The stage sequence for a search, without touching a store
pub fn explain(args: &ExplainArgs) -> CliResult<Pipeline> {
    let request = SearchRequest::try_from(args.to_query())?;
    Ok(QueryBuilder::new(args.index.as_str()).build(&request))
}

/// Construct the stores for the configured backend
pub async fn build_state(config: &AppConfig) -> CliResult<AppState> {
    let db = &config.database;
    match db.backend {
        StoreBackend::Memory => {
            warn!("using in-memory stores; data is lost on exit");
            Ok(AppState::in_memory(&db.search_index, config.session.clone()))
        }
        StoreBackend::Mongo => {
            let uri = db
                .uri
                .as_deref()
                .ok_or_else(|| CliError::config_error("the mongo backend requires a uri"))?;
            let client = mongo::connect(uri).await?;

            let store = Arc::new(MongoStore::new(&client.database(&db.database)));
            store.ensure_indexes().await?;
            let sessions = Arc::new(MongoSessionRepository::new(
                &client.database(&db.session_database),
            ));
            sessions.ensure_indexes().await?;

            info!(database = %db.database, sessions = %db.session_database, "connected to MongoDB");
            Ok(AppState::new(
                store.clone(),
                store,
                sessions,
                &db.search_index,
                config.session.clone(),
            ))
        }
    }
}

fn spawn_session_sweeper(sessions: SessionManager) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(n) => info!(removed = n, "expired sessions purged"),
                Err(e) => warn!(error = %e, "session purge failed"),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::Stage;

    #[test]
    fn test_explain_without_filters() {
        let pipeline = explain(&ExplainArgs {
            index: "postsIndex".into(),
            ..Default::default()
        })
        .unwrap();

        assert!(pipeline.filter_stage().is_none());
        assert_eq!(pipeline.limit(), Some(20));
    }

    #[test]
    fn test_explain_with_source() {
        let pipeline = explain(&ExplainArgs {
            source: Some("Seneca".into()),
            index: "quotes".into(),
            ..Default::default()
        })
        .unwrap();

        let Stage::Search(search) = &pipeline.stages()[0] else {
            panic!("expected a search stage first");
        };
        assert_eq!(search.index, "quotes");
    }

    #[test]
    fn test_explain_rejects_bad_date() {
        let result = explain(&ExplainArgs {
            before: Some("last tuesday".into()),
            index: "postsIndex".into(),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_memory_backend_state() {
        let config = AppConfig::default();
        assert!(build_state(&config).await.is_ok());
    }
}
