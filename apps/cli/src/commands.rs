use anvil_ssg::{BuildConfig, BuildMode, ServeConfig, build_site};
use axum::Router;
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{RecvTimeoutError, channel};
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;

const DEBOUNCE_DURATION: Duration = Duration::from_millis(300);

pub async fn run(
    config_path: &Path,
    mode: Option<BuildMode>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = BuildConfig::load(config_path, mode)?;
    build_site(&config)?;

    match config.serve.clone() {
        Some(serve) => serve_site(config, serve).await,
        None => Ok(()),
    }
}

fn watch_paths(config: &BuildConfig) -> Vec<(PathBuf, RecursiveMode)> {
    let mut paths = vec![
        (config.source.clone(), RecursiveMode::Recursive),
        (config.templates.directory.clone(), RecursiveMode::Recursive),
        (config.templates.partials.clone(), RecursiveMode::Recursive),
    ];

    if let Some(assets) = &config.assets {
        paths.push((assets.source.clone(), RecursiveMode::Recursive));
    }

    paths.push((config.config_path.clone(), RecursiveMode::NonRecursive));

    paths.retain(|(path, _)| path.exists());
    paths
}

async fn serve_site(
    config: BuildConfig,
    serve: ServeConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let (reload_tx, _) = broadcast::channel::<()>(16);
    let reload_tx = Arc::new(reload_tx);
    let reload_tx_clone = reload_tx.clone();

    let (notify_tx, notify_rx) = channel();

    let mut watcher = RecommendedWatcher::new(
        notify_tx,
        Config::default().with_poll_interval(Duration::from_millis(200)),
    )?;

    for (path, mode) in watch_paths(&config) {
        log::debug!("watching {}", path.display());
        watcher.watch(&path, mode)?;
    }

    let output_dir = config.destination.clone();

    std::thread::spawn(move || {
        loop {
            match notify_rx.recv() {
                Ok(_event) => {
                    loop {
                        match notify_rx.recv_timeout(DEBOUNCE_DURATION) {
                            Ok(_) => continue,
                            Err(RecvTimeoutError::Timeout) => break,
                            Err(RecvTimeoutError::Disconnected) => return,
                        }
                    }

                    log::info!("changes detected, rebuilding");

                    match build_site(&config) {
                        Ok(_) => {
                            let _ = reload_tx_clone.send(());
                        }
                        Err(error) => log::error!("rebuild failed: {error}"),
                    }
                }
                Err(error) => {
                    log::error!("watch error: {error}");
                    break;
                }
            }
        }
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], serve.port));
    log::info!("serving at http://{addr}");

    if serve.open {
        let url = format!("http://localhost:{}", serve.port);
        if let Err(error) = open::that(&url) {
            log::warn!("failed to open browser: {error}");
        }
    }

    let livereload = tower_livereload::LiveReloadLayer::new();
    let reloader = livereload.reloader();

    let mut reload_rx = reload_tx.subscribe();
    tokio::spawn(async move {
        loop {
            if reload_rx.recv().await.is_ok() {
                reloader.reload();
            }
        }
    });

    let serve_dir = ServeDir::new(output_dir).append_index_html_on_directories(true);

    let app = Router::new().fallback_service(serve_dir).layer(livereload);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    // Keeps the watcher alive for as long as the server runs.
    drop(watcher);

    Ok(())
}
