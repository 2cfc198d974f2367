use chrono::{DateTime, Utc};
use mongodb::bson;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }

    pub fn accepts_replies(&self) -> bool {
        !matches!(self, TicketStatus::Closed)
    }

    /// Status after a reply by someone with `role`.
    pub fn after_reply(self, role: Role) -> TicketStatus {
        match (self, role) {
            (TicketStatus::Open, Role::Admin) => TicketStatus::InProgress,
            // A student answering a resolved ticket reopens it.
            (TicketStatus::Resolved, Role::Student) => TicketStatus::Open,
            (status, _) => status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub user_email: String,
    pub user_name: String,
    pub subject: String,
    pub message: String,
    pub category: String,
    pub status: TicketStatus,
    pub reply_count: i32,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketReply {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub ticket_id: ObjectId,
    pub author_id: ObjectId,
    pub author_name: String,
    pub author_role: Role,
    pub message: String,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub id: String,
    pub user_email: String,
    pub user_name: String,
    pub subject: String,
    pub message: String,
    pub category: String,
    pub status: TicketStatus,
    pub reply_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Ticket> for TicketResponse {
    fn from(t: Ticket) -> Self {
        TicketResponse {
            id: t.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_email: t.user_email,
            user_name: t.user_name,
            subject: t.subject,
            message: t.message,
            category: t.category,
            status: t.status,
            reply_count: t.reply_count,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReplyResponse {
    pub id: String,
    pub author_name: String,
    pub author_role: Role,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<TicketReply> for ReplyResponse {
    fn from(r: TicketReply) -> Self {
        ReplyResponse {
            id: r.id.map(|id| id.to_hex()).unwrap_or_default(),
            author_name: r.author_name,
            author_role: r.author_role,
            message: r.message,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TicketThread {
    pub ticket: TicketResponse,
    pub replies: Vec<ReplyResponse>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTicket {
    #[validate(length(min = 3, max = 200, message = "Subject must be 3-200 characters"))]
    pub subject: String,
    #[validate(length(min = 1, max = 5000, message = "Message must be 1-5000 characters"))]
    pub message: String,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReply {
    #[validate(length(min = 1, max = 5000, message = "Message must be 1-5000 characters"))]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTicketStatus {
    pub status: TicketStatus,
}

#[derive(Debug, Deserialize)]
pub struct TicketQuery {
    pub status: Option<TicketStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_tickets_reject_replies() {
        assert!(TicketStatus::Open.accepts_replies());
        assert!(TicketStatus::Resolved.accepts_replies());
        assert!(!TicketStatus::Closed.accepts_replies());
    }

    #[test]
    fn test_status_after_reply() {
        assert_eq!(TicketStatus::Open.after_reply(Role::Admin), TicketStatus::InProgress);
        assert_eq!(TicketStatus::Open.after_reply(Role::Student), TicketStatus::Open);
        assert_eq!(TicketStatus::Resolved.after_reply(Role::Student), TicketStatus::Open);
        assert_eq!(TicketStatus::InProgress.after_reply(Role::Admin), TicketStatus::InProgress);
    }
}
