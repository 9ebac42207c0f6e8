use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};

use super::comments_model::{Comment, CommentView, NewComment};
use crate::audit::{audit_fields, AuditLogService, NewAuditLogEntry};
use crate::constants::COMMENTS_TABLE;
use crate::errors::{Error, Result};
use crate::profiles::ProfileCache;
use crate::store::{decode_rows, encode_row, select_for_ids, DataStore, SelectQuery};
use crate::utils::require_non_empty;

pub struct CommentService {
    store: Arc<dyn DataStore>,
    profiles: Arc<ProfileCache>,
    audit: Arc<AuditLogService>,
}

impl CommentService {
    pub fn new(
        store: Arc<dyn DataStore>,
        profiles: Arc<ProfileCache>,
        audit: Arc<AuditLogService>,
    ) -> Self {
        Self {
            store,
            profiles,
            audit,
        }
    }

    /// Up to `limit` most recent comments per application, newest first.
    /// Applications without comments are absent from the result.
    pub async fn recent_many(
        &self,
        ids: &HashSet<String>,
        limit: usize,
    ) -> HashMap<String, Vec<CommentView>> {
        if ids.is_empty() || limit == 0 {
            return HashMap::new();
        }
        let rows = match select_for_ids(
            self.store.as_ref(),
            SelectQuery::from(COMMENTS_TABLE).order_desc("created_at"),
            "application_id",
            ids,
        )
        .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Failed to fetch comments: {}", e);
                return HashMap::new();
            }
        };

        let mut grouped: HashMap<String, Vec<Comment>> = HashMap::new();
        for comment in decode_rows::<Comment>(COMMENTS_TABLE, rows) {
            grouped
                .entry(comment.application_id.clone())
                .or_default()
                .push(comment);
        }
        for comments in grouped.values_mut() {
            comments.truncate(limit);
        }

        let authors: HashSet<String> = grouped
            .values()
            .flatten()
            .map(|c| c.user_id.clone())
            .collect();
        let names = self.profiles.resolve_many(&authors).await;

        grouped
            .into_iter()
            .map(|(id, comments)| {
                let views = comments
                    .into_iter()
                    .map(|c| CommentView {
                        author_name: names
                            .get(&c.user_id)
                            .cloned()
                            .unwrap_or_else(|| c.user_id.clone()),
                        content: c.content,
                        created_at: c.created_at,
                    })
                    .collect();
                (id, views)
            })
            .collect()
    }

    /// Posts a comment on `application_id`. Blank content is rejected.
    pub async fn add_comment(&self, application_id: &str, content: &str, actor_id: &str) -> bool {
        match self.try_add_comment(application_id, content, actor_id).await {
            Ok(()) => true,
            Err(Error::Validation(e)) => {
                warn!("Rejected comment on '{}': {}", application_id, e);
                false
            }
            Err(e) => {
                error!("Failed to save comment on {}: {}", application_id, e);
                false
            }
        }
    }

    async fn try_add_comment(
        &self,
        application_id: &str,
        content: &str,
        actor_id: &str,
    ) -> Result<()> {
        require_non_empty("application_id", application_id)?;
        require_non_empty("content", content)?;
        require_non_empty("user_id", actor_id)?;

        let comment = NewComment {
            application_id: application_id.to_string(),
            user_id: actor_id.to_string(),
            content: content.trim().to_string(),
            created_at: Utc::now(),
        };
        self.store
            .insert(COMMENTS_TABLE, encode_row(COMMENTS_TABLE, &comment)?)
            .await?;
        info!("Comment added on {}", application_id);

        self.audit
            .record_best_effort(NewAuditLogEntry::change(
                application_id,
                audit_fields::COMMENT,
                None,
                Some(comment.content),
                actor_id,
            ))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{AUDIT_LOGS_TABLE, PROFILES_TABLE};
    use crate::store::{InMemoryDataStore, Row};
    use serde_json::{json, Value};

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn service(store: Arc<InMemoryDataStore>) -> CommentService {
        let profiles = Arc::new(ProfileCache::new(store.clone()));
        let audit = Arc::new(AuditLogService::new(store.clone(), profiles.clone()));
        CommentService::new(store, profiles, audit)
    }

    fn ids(values: &[&str]) -> HashSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_recent_many_limits_and_orders() {
        let store = Arc::new(InMemoryDataStore::new());
        store.seed(
            PROFILES_TABLE,
            vec![row(json!({ "id": "u1", "full_name": "Asha Rao" }))],
        );
        store.seed(
            COMMENTS_TABLE,
            vec![
                row(json!({ "application_id": "A", "user_id": "u1", "content": "first", "created_at": "2025-07-01T09:00:00Z" })),
                row(json!({ "application_id": "A", "user_id": "u1", "content": "second", "created_at": "2025-07-02T09:00:00Z" })),
                row(json!({ "application_id": "A", "user_id": "u2", "content": "third", "created_at": "2025-07-03T09:00:00Z" })),
                row(json!({ "application_id": "A", "user_id": "u1", "content": "fourth", "created_at": "2025-07-04T09:00:00Z" })),
                row(json!({ "application_id": "B", "user_id": "u1", "content": "other", "created_at": "2025-07-01T09:00:00Z" })),
            ],
        );
        let service = service(store);

        let recent = service.recent_many(&ids(&["A", "C"]), 3).await;
        let contents: Vec<&str> = recent["A"].iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["fourth", "third", "second"]);
        assert_eq!(recent["A"][0].author_name, "Asha Rao");
        assert_eq!(recent["A"][1].author_name, crate::constants::UNKNOWN_USER_NAME);
        assert!(!recent.contains_key("B"));
        assert!(!recent.contains_key("C"));
    }

    #[tokio::test]
    async fn test_add_comment_rejects_blank_content() {
        let store = Arc::new(InMemoryDataStore::new());
        let service = service(store.clone());

        assert!(!service.add_comment("A", "   ", "u1").await);
        assert!(store.rows(COMMENTS_TABLE).is_empty());

        assert!(service.add_comment("A", " called, will pay friday ", "u1").await);
        let rows = store.rows(COMMENTS_TABLE);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["content"], json!("called, will pay friday"));
        assert_eq!(store.rows(AUDIT_LOGS_TABLE).len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades_to_empty() {
        let store = Arc::new(InMemoryDataStore::new());
        store.fail_table(COMMENTS_TABLE);
        let service = service(store);
        assert!(service.recent_many(&ids(&["A"]), 3).await.is_empty());
    }
}
