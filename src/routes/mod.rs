pub mod api;

use actix_web::web;

/// Configure the HTTP routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws").route(web::get().to(crate::websocket::ws_index)))
        .service(web::resource("/health").route(web::get().to(api::health)))
        .service(
            web::scope("/api")
                .service(web::resource("/lobbies").route(web::post().to(api::create_lobby)))
                .service(web::resource("/lobbies/{id}").route(web::get().to(api::get_lobby)))
                .service(web::resource("/lobbies/{id}/join").route(web::post().to(api::join_lobby)))
                .service(web::resource("/lobbies/{id}/ready").route(web::post().to(api::toggle_ready)))
                .service(web::resource("/lobbies/{id}/role").route(web::post().to(api::select_role)))
                .service(web::resource("/lobbies/{id}/start").route(web::post().to(api::start_game)))
                .service(web::resource("/games/{id}").route(web::get().to(api::get_game))),
        );
}
