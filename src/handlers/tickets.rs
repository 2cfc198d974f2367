use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use chrono::Utc;
use futures_util::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId};
use mongodb::Collection;
use validator::Validate;

use crate::errors::{AppError, Result};
use crate::models::ticket::{
    CreateReply, CreateTicket, ReplyResponse, Ticket, TicketQuery, TicketReply, TicketResponse,
    TicketStatus, TicketThread, UpdateTicketStatus,
};
use crate::models::user::Claims;
use crate::state::AppState;

pub const TICKETS_COLLECTION: &str = "tickets";
pub const TICKET_REPLIES_COLLECTION: &str = "ticket_replies";

const DEFAULT_CATEGORY: &str = "general";

fn tickets(state: &AppState) -> Collection<Ticket> {
    state.db.collection(TICKETS_COLLECTION)
}

fn replies(state: &AppState) -> Collection<TicketReply> {
    state.db.collection(TICKET_REPLIES_COLLECTION)
}

/// Loads a ticket the caller may see: its owner or any admin.
async fn load_visible(state: &AppState, claims: &Claims, id: &str) -> Result<Ticket> {
    let ticket_id = ObjectId::parse_str(id)?;
    let ticket = tickets(state)
        .find_one(doc! { "_id": ticket_id })
        .await?
        .ok_or_else(|| AppError::not_found("Ticket"))?;

    if !claims.is_admin() && ticket.user_id != claims.user_id()? {
        return Err(AppError::forbidden("You do not have access to this ticket"));
    }
    Ok(ticket)
}

pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTicket>,
) -> Result<Json<TicketResponse>> {
    payload.validate()?;

    let now = Utc::now();
    let mut ticket = Ticket {
        id: None,
        user_id: claims.user_id()?,
        user_email: claims.email.clone(),
        user_name: claims.name.clone(),
        subject: payload.subject.trim().to_string(),
        message: payload.message,
        category: payload
            .category
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        status: TicketStatus::Open,
        reply_count: 0,
        created_at: now,
        updated_at: now,
    };

    let result = tickets(&state).insert_one(&ticket).await?;
    ticket.id = result.inserted_id.as_object_id();

    tracing::info!("🎫 Ticket opened by {}: {}", claims.sub, ticket.subject);
    Ok(Json(TicketResponse::from(ticket)))
}

pub async fn my_tickets(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<TicketResponse>>> {
    let found: Vec<Ticket> = tickets(&state)
        .find(doc! { "user_id": claims.user_id()? })
        .sort(doc! { "created_at": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(Json(found.into_iter().map(TicketResponse::from).collect()))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<TicketThread>> {
    let ticket = load_visible(&state, &claims, &id).await?;

    let thread: Vec<TicketReply> = replies(&state)
        .find(doc! { "ticket_id": ticket.id })
        .sort(doc! { "created_at": 1 })
        .await?
        .try_collect()
        .await?;

    Ok(Json(TicketThread {
        ticket: TicketResponse::from(ticket),
        replies: thread.into_iter().map(ReplyResponse::from).collect(),
    }))
}

pub async fn reply_to_ticket(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(payload): Json<CreateReply>,
) -> Result<Json<ReplyResponse>> {
    payload.validate()?;

    let ticket = load_visible(&state, &claims, &id).await?;
    if !ticket.status.accepts_replies() {
        return Err(AppError::invalid_data("Ticket is closed"));
    }
    let ticket_id = ticket.id.ok_or_else(|| AppError::not_found("Ticket"))?;

    let now = Utc::now();
    let mut reply = TicketReply {
        id: None,
        ticket_id,
        author_id: claims.user_id()?,
        author_name: claims.name.clone(),
        author_role: claims.role,
        message: payload.message,
        created_at: now,
    };
    let result = replies(&state).insert_one(&reply).await?;
    reply.id = result.inserted_id.as_object_id();

    let status = ticket.status.after_reply(claims.role);
    tickets(&state)
        .update_one(
            doc! { "_id": ticket_id },
            doc! {
                "$inc": { "reply_count": 1 },
                "$set": {
                    "status": status.as_str(),
                    "updated_at": bson::DateTime::from_chrono(now),
                },
            },
        )
        .await?;

    if status != ticket.status {
        tracing::info!(
            "🎫 Ticket {} moved {} -> {}",
            ticket_id,
            ticket.status.as_str(),
            status.as_str()
        );
    }
    Ok(Json(ReplyResponse::from(reply)))
}

pub async fn admin_list_tickets(
    State(state): State<AppState>,
    Query(query): Query<TicketQuery>,
) -> Result<Json<Vec<TicketResponse>>> {
    let filter = match query.status {
        Some(status) => doc! { "status": status.as_str() },
        None => doc! {},
    };

    let found: Vec<Ticket> = tickets(&state)
        .find(filter)
        .sort(doc! { "updated_at": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(Json(found.into_iter().map(TicketResponse::from).collect()))
}

pub async fn admin_set_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateTicketStatus>,
) -> Result<Json<TicketResponse>> {
    let ticket_id = ObjectId::parse_str(&id)?;

    let result = tickets(&state)
        .update_one(
            doc! { "_id": ticket_id },
            doc! { "$set": {
                "status": payload.status.as_str(),
                "updated_at": bson::DateTime::from_chrono(Utc::now()),
            } },
        )
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::not_found("Ticket"));
    }

    let ticket = tickets(&state)
        .find_one(doc! { "_id": ticket_id })
        .await?
        .ok_or_else(|| AppError::not_found("Ticket"))?;

    tracing::info!(
        "Admin {} set ticket {} to {}",
        claims.sub,
        ticket_id,
        payload.status.as_str()
    );
    Ok(Json(TicketResponse::from(ticket)))
}
