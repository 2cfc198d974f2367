use chrono::{DateTime, Utc};
use mongodb::bson;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// An announcement in the platform feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub link: Option<String>,
    pub created_by: String,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// Marks that one user has seen one update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRead {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub update_id: ObjectId,
    pub user_id: ObjectId,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub read_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct FeedItem {
    pub id: String,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Serialize)]
pub struct Feed {
    pub items: Vec<FeedItem>,
    pub unread_count: usize,
}

impl Feed {
    pub fn build(updates: Vec<Update>, read_ids: &[ObjectId]) -> Self {
        let items: Vec<FeedItem> = updates
            .into_iter()
            .filter_map(|u| {
                let id = u.id?;
                Some(FeedItem {
                    id: id.to_hex(),
                    read: read_ids.contains(&id),
                    title: u.title,
                    body: u.body,
                    link: u.link,
                    created_at: u.created_at,
                })
            })
            .collect();
        let unread_count = items.iter().filter(|i| !i.read).count();
        Feed { items, unread_count }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUpdate {
    #[validate(length(min = 3, max = 200, message = "Title must be 3-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 10000))]
    pub body: String,
    #[validate(url)]
    pub link: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(title: &str) -> Update {
        Update {
            id: Some(ObjectId::new()),
            title: title.to_string(),
            body: "body".to_string(),
            link: None,
            created_by: "admin@example.com".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_feed_marks_read_items() {
        let first = update("first");
        let second = update("second");
        let read = vec![first.id.unwrap()];

        let feed = Feed::build(vec![first, second], &read);
        assert_eq!(feed.items.len(), 2);
        assert!(feed.items[0].read);
        assert!(!feed.items[1].read);
        assert_eq!(feed.unread_count, 1);
    }
}
