//! Request/response mirror of the lobby operations for clients without a
//! persistent connection. Same coordinators, same validation.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::HandBrainError;
use crate::models::{PlayerInfo, RoleSelection};
use crate::state::AppState;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateLobbyRequest {
    pub player: PlayerInfo,
    pub base_time_seconds: u32,
    #[serde(default)]
    pub increment_seconds: u32,
}

#[derive(Deserialize, Debug)]
pub struct JoinRequest {
    pub player: PlayerInfo,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRequest {
    pub player_id: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoleRequest {
    pub player_id: String,
    #[serde(default)]
    pub selection: Option<RoleSelection>,
}

pub async fn create_lobby(
    app: web::Data<AppState>,
    body: web::Json<CreateLobbyRequest>,
) -> Result<HttpResponse, HandBrainError> {
    let body = body.into_inner();
    let lobby = app
        .lobbies()
        .create(body.player, body.base_time_seconds, body.increment_seconds)
        .await?;
    Ok(HttpResponse::Created().json(lobby))
}

pub async fn get_lobby(
    app: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, HandBrainError> {
    let lobby = app.lobbies().get(&path).await?;
    Ok(HttpResponse::Ok().json(lobby))
}

pub async fn join_lobby(
    app: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<JoinRequest>,
) -> Result<HttpResponse, HandBrainError> {
    let lobby = app
        .lobbies()
        .join(&path, body.into_inner().player, None)
        .await?;
    Ok(HttpResponse::Ok().json(lobby))
}

pub async fn toggle_ready(
    app: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<PlayerRequest>,
) -> Result<HttpResponse, HandBrainError> {
    let lobby = app.lobbies().toggle_ready(&path, &body.player_id).await?;
    Ok(HttpResponse::Ok().json(lobby))
}

pub async fn select_role(
    app: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<RoleRequest>,
) -> Result<HttpResponse, HandBrainError> {
    let lobby = app
        .lobbies()
        .select_role(&path, &body.player_id, body.selection)
        .await?;
    Ok(HttpResponse::Ok().json(lobby))
}

pub async fn start_game(
    app: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<PlayerRequest>,
) -> Result<HttpResponse, HandBrainError> {
    let game = app.lobbies().start_game(&path, &body.player_id).await?;
    Ok(HttpResponse::Created().json(game))
}

pub async fn get_game(
    app: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, HandBrainError> {
    let game = app.games().get(&path).await?;
    Ok(HttpResponse::Ok().json(game))
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}
