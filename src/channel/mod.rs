/// Channel directory: read-only aggregation queries over accounts,
/// subscriptions, and watch history.
use crate::{
    db::account::PublicProfile,
    error::{ApiError, ApiResult},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// A channel profile as seen by an (optionally authenticated) viewer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub username: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub subscriber_count: i64,
    pub subscribed_to_count: i64,
    pub is_subscribed: bool,
}

/// One watch-history entry with its owner resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchHistoryEntry {
    pub video_id: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub watched_at: DateTime<Utc>,
    pub owner: PublicProfile,
}

/// Read-side queries for channel pages
pub struct ChannelDirectory {
    db: SqlitePool,
}

impl ChannelDirectory {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Channel profile by username (case-insensitive), with subscription
    /// aggregates relative to the optional viewer
    pub async fn channel_profile(
        &self,
        username: &str,
        viewer_id: Option<&str>,
    ) -> ApiResult<ChannelProfile> {
        let row = sqlx::query(
            "SELECT id, username, full_name, avatar_url, cover_image_url,
                    (SELECT COUNT(*) FROM subscription WHERE channel_id = account.id) AS subscriber_count,
                    (SELECT COUNT(*) FROM subscription WHERE subscriber_id = account.id) AS subscribed_to_count
             FROM account WHERE username = ?1",
        )
        .bind(username.to_lowercase())
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFound(format!("Channel {} does not exist", username)))?;

        let channel_id: String = row.get("id");

        let is_subscribed = match viewer_id {
            Some(viewer) => {
                let count: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM subscription WHERE channel_id = ?1 AND subscriber_id = ?2",
                )
                .bind(&channel_id)
                .bind(viewer)
                .fetch_one(&self.db)
                .await
                .map_err(ApiError::Database)?;
                count > 0
            }
            None => false,
        };

        Ok(ChannelProfile {
            username: row.get("username"),
            full_name: row.get("full_name"),
            avatar_url: row.get("avatar_url"),
            cover_image_url: row.get("cover_image_url"),
            subscriber_count: row.get("subscriber_count"),
            subscribed_to_count: row.get("subscribed_to_count"),
            is_subscribed,
        })
    }

    /// Watch history for an account, most recent first, each entry's owner
    /// resolved to a minimal public profile
    pub async fn watch_history(&self, account_id: &str) -> ApiResult<Vec<WatchHistoryEntry>> {
        let rows = sqlx::query(
            "SELECT v.id AS video_id, v.title, v.thumbnail_url, w.watched_at,
                    o.username, o.full_name, o.avatar_url
             FROM watch_history w
             JOIN video v ON v.id = w.video_id
             JOIN account o ON o.id = v.owner_id
             WHERE w.account_id = ?1
             ORDER BY w.watched_at DESC",
        )
        .bind(account_id)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| WatchHistoryEntry {
                video_id: row.get("video_id"),
                title: row.get("title"),
                thumbnail_url: row.get("thumbnail_url"),
                watched_at: row.get("watched_at"),
                owner: PublicProfile {
                    username: row.get("username"),
                    full_name: row.get("full_name"),
                    avatar_url: row.get("avatar_url"),
                },
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::Duration;
    use tempfile::{tempdir, TempDir};
    use uuid::Uuid;

    async fn test_directory() -> (ChannelDirectory, SqlitePool, TempDir) {
        let dir = tempdir().unwrap();
        let pool = db::create_pool(
            &dir.path().join("accounts.sqlite"),
            db::DatabaseOptions::default(),
        )
        .await
        .unwrap();
        db::run_migrations(&pool).await.unwrap();

        (ChannelDirectory::new(pool.clone()), pool, dir)
    }

    async fn insert_account(pool: &SqlitePool, username: &str) -> String {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO account (id, username, email, full_name, password_hash, avatar_url, cover_image_url, refresh_token, created_at)
             VALUES (?1, ?2, ?3, ?4, 'x', 'http://localhost/media/a.png', NULL, NULL, ?5)",
        )
        .bind(&id)
        .bind(username)
        .bind(format!("{}@example.com", username))
        .bind(username)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
        id
    }

    async fn subscribe(pool: &SqlitePool, subscriber: &str, channel: &str) {
        sqlx::query(
            "INSERT INTO subscription (subscriber_id, channel_id, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(subscriber)
        .bind(channel)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn profile_aggregates_subscriptions() {
        let (directory, pool, _dir) = test_directory().await;
        let ana = insert_account(&pool, "ana").await;
        let bob = insert_account(&pool, "bob").await;
        let cat = insert_account(&pool, "cat").await;

        subscribe(&pool, &bob, &ana).await;
        subscribe(&pool, &cat, &ana).await;
        subscribe(&pool, &ana, &bob).await;

        let profile = directory.channel_profile("ana", Some(&bob)).await.unwrap();
        assert_eq!(profile.subscriber_count, 2);
        assert_eq!(profile.subscribed_to_count, 1);
        assert!(profile.is_subscribed);

        let profile = directory.channel_profile("ana", None).await.unwrap();
        assert!(!profile.is_subscribed);

        // Lookup is case-insensitive
        let profile = directory.channel_profile("ANA", Some(&cat)).await.unwrap();
        assert!(profile.is_subscribed);
    }

    #[tokio::test]
    async fn missing_channel_is_not_found() {
        let (directory, _pool, _dir) = test_directory().await;

        let err = directory.channel_profile("ghost", None).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn watch_history_resolves_owners_most_recent_first() {
        let (directory, pool, _dir) = test_directory().await;
        let viewer = insert_account(&pool, "viewer").await;
        let owner = insert_account(&pool, "owner").await;

        let now = Utc::now();
        for (n, title) in ["older", "newer"].iter().enumerate() {
            let video_id = Uuid::new_v4().to_string();
            sqlx::query(
                "INSERT INTO video (id, owner_id, title, thumbnail_url, created_at) VALUES (?1, ?2, ?3, NULL, ?4)",
            )
            .bind(&video_id)
            .bind(&owner)
            .bind(title)
            .bind(now)
            .execute(&pool)
            .await
            .unwrap();

            sqlx::query(
                "INSERT INTO watch_history (account_id, video_id, watched_at) VALUES (?1, ?2, ?3)",
            )
            .bind(&viewer)
            .bind(&video_id)
            .bind(now + Duration::seconds(n as i64))
            .execute(&pool)
            .await
            .unwrap();
        }

        let history = directory.watch_history(&viewer).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].title, "newer");
        assert_eq!(history[1].title, "older");
        assert_eq!(history[0].owner.username, "owner");

        // An account with no history gets an empty list
        let empty = directory.watch_history(&owner).await.unwrap();
        assert!(empty.is_empty());
    }
}
