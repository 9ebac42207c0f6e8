//! Comment domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::Timestamped;

/// A stored `comments` row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    #[serde(default)]
    pub id: Option<String>,
    pub application_id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Timestamped for Comment {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Input model for posting a comment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewComment {
    pub application_id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Comment as shown in list views, with the author's display name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub content: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}
