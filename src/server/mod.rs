//! HTTP surface over the battle engine: battle commands, data listings, the
//! SSE notification stream, the matchup simulator, and the ability
//! assignment seam. Handlers stay thin over the pure builders in [api] and
//! the session registry in [sessions].

pub mod api;
pub mod sessions;

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use tower_http::services::ServeDir;
use tracing::info;
use uuid::Uuid;

use crate::battle::events::EventKind;
use crate::battle::export_csv::battle_to_csv;
use crate::battle::rng::Rng;
use crate::battle::turn::{Battle, TurnAction};
use crate::data::{assign_ability, DataRegistry, MemoryPetStore, PetStore};
use crate::server::api::{
    battle_view, build_pet_from_spec, health_payload, skills_payload, species_payload,
    AssignAbilityRequest, CommandOutcome, CreateBattleRequest, ErrorResponse, TurnResponse,
    UseItemRequest, UseSkillRequest,
};
use crate::server::sessions::{BattleSession, SessionRegistry, AI_SIDE, PLAYER_SIDE};
use crate::sim::{run_matchup, MatchupSpec};

pub const STATIC_UI_DIR: &str = "web";

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<DataRegistry>,
    pub sessions: Arc<SessionRegistry>,
    pub store: Arc<dyn PetStore>,
}

impl AppState {
    pub fn new(registry: Arc<DataRegistry>) -> AppState {
        AppState {
            registry,
            sessions: Arc::new(SessionRegistry::new()),
            store: Arc::new(MemoryPetStore::new()),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message)))
}

fn not_found(id: Uuid) -> ApiError {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new(format!("no battle {id}"))))
}

fn conflict(message: impl Into<String>) -> ApiError {
    (StatusCode::CONFLICT, Json(ErrorResponse::new(message)))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/species", get(list_species))
        .route("/api/skills", get(list_skills))
        .route("/api/battle", post(create_battle))
        .route("/api/battle/:id", get(get_battle))
        .route("/api/battle/:id/skill", post(use_skill))
        .route("/api/battle/:id/item", post(use_item))
        .route("/api/battle/:id/switch", post(switch_pet))
        .route("/api/battle/:id/catch", post(attempt_catch))
        .route("/api/battle/:id/escape", post(escape_battle))
        .route("/api/battle/:id/export.csv", get(export_csv))
        .route("/api/battle/:id/stream", get(stream_events))
        .route("/api/matchup", post(matchup))
        .route("/api/ability", post(ability))
        .nest_service("/ui", ServeDir::new(STATIC_UI_DIR))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(health_payload())
}

async fn list_species(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(species_payload(&state.registry))
}

async fn list_skills(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(skills_payload(&state.registry))
}

async fn create_battle(
    State(state): State<AppState>,
    Json(request): Json<CreateBattleRequest>,
) -> Result<Json<api::BattleView>, ApiError> {
    let player = build_pet_from_spec(&state.registry, 1, &request.player)
        .map_err(|e| bad_request(e.to_string()))?;
    let opponent = build_pet_from_spec(&state.registry, 2, &request.opponent)
        .map_err(|e| bad_request(e.to_string()))?;
    let seed = request.seed.unwrap_or_else(|| Rng::from_entropy().next_u64());
    let battle = Battle::new(
        [player, opponent],
        state.registry.catalog(),
        state.registry.chart(),
        seed,
    );
    let view = battle_view(&battle);
    let id = state.sessions.insert(BattleSession::new(battle, seed));
    info!(battle = %id, "battle session created");
    Ok(Json(view))
}

fn with_live_session<T>(
    state: &AppState,
    id: Uuid,
    f: impl FnOnce(&mut BattleSession) -> Result<T, ApiError>,
) -> Result<T, ApiError> {
    state
        .sessions
        .with_session(id, |session| {
            if session.battle.over {
                return Err(conflict("battle already finished"));
            }
            f(session)
        })
        .ok_or_else(|| not_found(id))?
}

async fn get_battle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<api::BattleView>, ApiError> {
    state
        .sessions
        .with_session(id, |session| Json(battle_view(&session.battle)))
        .ok_or_else(|| not_found(id))
}

async fn use_skill(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UseSkillRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    with_live_session(&state, id, |session| {
        if request.slot >= session.battle.pets[PLAYER_SIDE].skills.len() {
            return Err(bad_request(format!("no skill in slot {}", request.slot)));
        }
        let (report, events) = session.play_turn(TurnAction::UseSkill(request.slot));
        Ok(Json(api::turn_response(&session.battle, report, events)))
    })
}

async fn use_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UseItemRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    with_live_session(&state, id, |session| {
        let turn = session.battle.turn;
        let player = &mut session.battle.pets[PLAYER_SIDE];
        let message = match request.item.as_str() {
            "potion" => {
                let healed = player.apply_heal(player.max_hp() / 2);
                format!("{} drinks a potion ({healed} HP)", player.name)
            }
            "elixir" => {
                for learned in &mut player.skills {
                    learned.pp = (learned.pp + 10).min(learned.skill.max_pp);
                }
                format!("{}'s moves are refreshed", player.name)
            }
            "antidote" => {
                player.clear_status();
                format!("{} is cured", player.name)
            }
            other => return Err(bad_request(format!("unknown item '{other}'"))),
        };
        session.battle.events.push(crate::battle::events::BattleEvent::new(
            turn,
            Some(PLAYER_SIDE),
            EventKind::Info,
            message,
        ));
        // Spending the turn on an item leaves the move to the AI.
        let (report, events) = session.play_turn(TurnAction::Pass);
        Ok(Json(api::turn_response(&session.battle, report, events)))
    })
}

async fn switch_pet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CommandOutcome>, ApiError> {
    with_live_session(&state, id, |_session| {
        Ok(Json(CommandOutcome {
            command: "switch",
            success: false,
            chance: None,
            message: "exhibition duels field a single pet per side".to_string(),
            events: Vec::new(),
        }))
    })
}

async fn attempt_catch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CommandOutcome>, ApiError> {
    with_live_session(&state, id, |session| {
        let chance = session.catch_chance();
        let caught = session.battle.rng.chance(chance);
        let target = session.battle.pets[AI_SIDE].name.clone();
        let (message, events) = if caught {
            let from = session.battle.events.len();
            session.battle.winner = Some(PLAYER_SIDE);
            session.battle.over = true;
            session.battle.on_battle_end();
            (format!("{target} was caught"), session.publish_events_from(from))
        } else {
            // The failed throw costs the turn.
            let (_, events) = session.play_turn(TurnAction::Pass);
            (format!("{target} broke free"), events)
        };
        Ok(Json(CommandOutcome {
            command: "catch",
            success: caught,
            chance: Some(chance),
            message,
            events,
        }))
    })
}

async fn escape_battle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CommandOutcome>, ApiError> {
    with_live_session(&state, id, |session| {
        let chance = session.escape_chance();
        let escaped = session.battle.rng.chance(chance);
        let events = if escaped {
            let from = session.battle.events.len();
            session.battle.over = true;
            session.battle.on_battle_end();
            session.publish_events_from(from)
        } else {
            let (_, events) = session.play_turn(TurnAction::Pass);
            events
        };
        Ok(Json(CommandOutcome {
            command: "escape",
            success: escaped,
            chance: Some(chance),
            message: if escaped {
                "got away safely".to_string()
            } else {
                "couldn't escape".to_string()
            },
            events,
        }))
    })
}

async fn export_csv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let csv = state
        .sessions
        .with_session(id, |session| battle_to_csv(&session.battle))
        .ok_or_else(|| not_found(id))?
        .map_err(|e| bad_request(e.to_string()))?;
    Ok(([("content-type", "text/csv")], csv))
}

async fn stream_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let receiver = state.sessions.subscribe(id).ok_or_else(|| not_found(id))?;
    let stream = BroadcastStream::new(receiver).filter_map(|message| async move {
        message.ok().map(|payload| Ok(Event::default().event("battle").data(payload)))
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn matchup(
    State(state): State<AppState>,
    Json(spec): Json<MatchupSpec>,
) -> Result<Json<crate::sim::MatchupSummary>, ApiError> {
    let registry = Arc::clone(&state.registry);
    let summary = tokio::task::spawn_blocking(move || run_matchup(&registry, &spec))
        .await
        .map_err(|e| bad_request(e.to_string()))?
        .map_err(|e| bad_request(e.to_string()))?;
    Ok(Json(summary))
}

async fn ability(
    State(state): State<AppState>,
    Json(request): Json<AssignAbilityRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    assign_ability(state.store.as_ref(), request.owner_id, request.captured_at, &request.ability)
        .map_err(|e| bad_request(e.to_string()))?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

/// Blocking entry point used by the CLI: builds the runtime, loads data, and
/// serves until interrupted.
pub fn run_server(bind_addr: &str) -> std::io::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let state = AppState::new(DataRegistry::load());
        let router = build_router(state);
        let listener = tokio::net::TcpListener::bind(bind_addr).await?;
        info!(%bind_addr, "menagerie server listening");
        println!("menagerie server listening on http://{bind_addr}");
        axum::serve(listener, router).await
    })
}
