use actix_web::{web, HttpResponse};
use std::sync::Arc;
use tracing::info;

use crate::AppState;
use keiba::core::{build_race_card, build_score_sheet, Session, SortOrder};
use keiba::models::{
    AdjustmentRequest, CardQuery, ChangeRaceRequest, CreateSessionRequest, HorseAnnotation,
    MarkerRequest, SessionInfo,
};
use keiba::{KeibaError, RaceKey};

fn session_info(session: &Session) -> SessionInfo {
    SessionInfo {
        session_id: session.id.to_string(),
        race: session.race.clone(),
        meta: session.meta.clone(),
        entries: session.entries.len(),
    }
}

fn horse_annotation(session: &mut Session, name: &str) -> Result<HorseAnnotation, KeibaError> {
    let base_score = session.horse(name)?.base_score;
    let annotation = session.annotations.get_annotation(name);

    Ok(HorseAnnotation {
        name: name.to_string(),
        marker: annotation.marker,
        manual_adjustment: annotation.manual_adjustment,
        base_score,
        total_score: session.annotations.compute_display_score(name, base_score),
    })
}

/// Open a session; without a body the sample race for today is loaded
pub async fn create_session(
    state: web::Data<Arc<AppState>>,
    req: Option<web::Json<CreateSessionRequest>>,
) -> Result<HttpResponse, KeibaError> {
    let req = req.map(|r| r.into_inner()).unwrap_or_default();

    let race = match req.race {
        Some(race) => {
            race.validate()?;
            race
        }
        None => RaceKey::today()?,
    };

    let mut sessions = state.sessions()?;
    let session = sessions.create(race, req.meta.unwrap_or_default(), state.source.as_ref())?;

    Ok(HttpResponse::Created().json(session_info(session)))
}

pub async fn delete_session(
    state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> Result<HttpResponse, KeibaError> {
    state.sessions()?.remove(&path)?;
    Ok(HttpResponse::NoContent().finish())
}

/// Clear every marker and adjustment in the session
pub async fn reset_session(
    state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> Result<HttpResponse, KeibaError> {
    let mut sessions = state.sessions()?;
    sessions.reset(&path)?;
    Ok(HttpResponse::Ok().json(session_info(sessions.get(&path)?)))
}

/// Load another race into the session
pub async fn change_race(
    state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    req: web::Json<ChangeRaceRequest>,
) -> Result<HttpResponse, KeibaError> {
    let req = req.into_inner();
    req.race.validate()?;

    let mut sessions = state.sessions()?;
    let session = sessions.get_mut(&path)?;
    session.load_race(req.race, state.source.as_ref())?;
    if let Some(meta) = req.meta {
        session.meta = meta;
    }

    info!(session = %session.id, race = %session.race, "race changed");
    Ok(HttpResponse::Ok().json(session_info(session)))
}

/// Race card in the requested order, top rows emphasized
pub async fn race_card(
    state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    query: web::Query<CardQuery>,
) -> Result<HttpResponse, KeibaError> {
    let sort: SortOrder = match query.sort.as_deref() {
        Some(s) => s.parse()?,
        None => SortOrder::default(),
    };

    let mut sessions = state.sessions()?;
    let session = sessions.get_mut(&path)?;
    let card = build_race_card(&session.entries, &session.annotations, sort, true);

    Ok(HttpResponse::Ok().json(card))
}

pub async fn score_sheet(
    state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> Result<HttpResponse, KeibaError> {
    let mut sessions = state.sessions()?;
    let session = sessions.get_mut(&path)?;

    Ok(HttpResponse::Ok().json(build_score_sheet(&session.entries, &session.annotations)))
}

pub async fn get_horse(
    state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, KeibaError> {
    let (id, name) = path.into_inner();
    let mut sessions = state.sessions()?;
    let session = sessions.get_mut(&id)?;

    Ok(HttpResponse::Ok().json(horse_annotation(session, &name)?))
}

pub async fn set_marker(
    state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
    req: web::Json<MarkerRequest>,
) -> Result<HttpResponse, KeibaError> {
    let (id, name) = path.into_inner();
    let mut sessions = state.sessions()?;
    let session = sessions.get_mut(&id)?;

    session.horse(&name)?;
    session.annotations.set_marker_symbol(&name, &req.marker)?;
    session.touch();

    Ok(HttpResponse::Ok().json(horse_annotation(session, &name)?))
}

pub async fn set_adjustment(
    state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
    req: web::Json<AdjustmentRequest>,
) -> Result<HttpResponse, KeibaError> {
    let (id, name) = path.into_inner();
    let mut sessions = state.sessions()?;
    let session = sessions.get_mut(&id)?;

    session.horse(&name)?;
    session.annotations.set_manual_adjustment(&name, req.value)?;
    session.touch();

    Ok(HttpResponse::Ok().json(horse_annotation(session, &name)?))
}
