mod codec;
mod compositor;
mod config;
mod encoder;
mod error;
mod handlers_composite;
mod handlers_health;
mod handlers_removal;
mod handlers_sheet;
mod matting;
mod sheet_layout;
mod warp_helpers;

use log::{error, info};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use warp::Filter;

use matting::MattingEngine;
use warp_helpers::{cors, handle_rejection, with_matting};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = config::Config::from_env()?;
    let port = config.port;

    info!("Starting SnapSheet server on port {}", port);
    info!(
        "Upload limit: {} MiB, matting backend: {}",
        config.max_upload_bytes / (1024 * 1024),
        config.matting.backend
    );

    // Check if port is available BEFORE initializing services
    if !is_port_available(port) {
        error!(
            "Port {} is already in use. Please stop any existing SnapSheet instances or use a different port.",
            port
        );
        return Err(format!("Port {} is already in use", port).into());
    }

    let matting_engine = matting::from_config(&config.matting)?;
    info!(
        "Background matting engine '{}' initialized",
        matting_engine.name()
    );

    let health_routes = build_health_routes();
    let api_routes = build_api_routes(matting_engine, config.max_upload_bytes);

    let routes = health_routes
        .or(api_routes)
        .with(cors())
        .with(warp::log("snapsheet"))
        .recover(handle_rejection);

    let addr: SocketAddr = format!("{}:{}", config.host, port).parse()?;
    info!(
        "Server started successfully, listening on http://{}",
        addr
    );

    warp::serve(routes).run(addr).await;

    Ok(())
}

fn is_port_available(port: u16) -> bool {
    TcpListener::bind(("0.0.0.0", port)).is_ok()
}

fn build_health_routes() -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone
{
    warp::path("health")
        .and(warp::get())
        .and_then(handlers_health::health_check)
}

fn build_api_routes(
    matting: Arc<dyn MattingEngine>,
    max_upload_bytes: u64,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let api_remove_background = warp::path("api")
        .and(warp::path("remove-background"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(max_upload_bytes))
        .and(warp::body::json::<handlers_removal::RemovalRequest>())
        .and(with_matting(matting))
        .and_then(handlers_removal::remove_background);

    let api_process_photo = warp::path("api")
        .and(warp::path("process-photo"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(max_upload_bytes))
        .and(warp::body::json::<handlers_composite::CompositeRequest>())
        .and_then(handlers_composite::process_photo);

    let api_generate_sheet = warp::path("api")
        .and(warp::path("generate-sheet"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(max_upload_bytes))
        .and(warp::body::json::<handlers_sheet::SheetRequest>())
        .and_then(handlers_sheet::generate_sheet);

    api_remove_background
        .or(api_process_photo)
        .or(api_generate_sheet)
}
