use std::io;

use actix_files as fs;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use log::info;

use hand_brain_server::config::{ServerArgs, ServerConfig};
use hand_brain_server::routes::configure_routes;
use hand_brain_server::AppState;

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = ServerConfig::from(ServerArgs::parse());
    info!(
        "Starting Hand & Brain server at http://{} (lobby ttl {:?}, stale after {:?}, cooldown {:?})",
        config.bind, config.rules.lobby_ttl, config.rules.stale_after, config.rules.role_cooldown
    );

    // Rooms and sessions live only as long as this process.
    let app_state = web::Data::new(AppState::in_memory(config.rules));
    let static_dir = config.static_dir.clone();

    HttpServer::new(move || {
        let mut app = App::new()
            .app_data(app_state.clone())
            .configure(configure_routes);
        if let Some(dir) = &static_dir {
            app = app.service(fs::Files::new("/", dir).index_file("index.html"));
        }
        app
    })
    .bind(config.bind)?
    .run()
    .await
}
