use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Error as SqlxError;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::db::store::{RoomStore, StoreError};
use crate::models::{ChatMessage, MessageKind, Room, RoomPatch};

/// Room row from the database
#[derive(Debug, Clone, sqlx::FromRow)]
struct RoomRow {
    room_id: String,
    name: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    last_activity: DateTime<Utc>,
    is_active: bool,
    auto_delete: bool,
    participants: Vec<String>,
    text_content: String,
    live_sync: bool,
    is_private: bool,
    password_proof: Option<String>,
}

impl From<RoomRow> for Room {
    fn from(row: RoomRow) -> Self {
        Room {
            room_id: row.room_id,
            name: row.name,
            created_by: row.created_by,
            created_at: row.created_at,
            expires_at: row.expires_at,
            last_activity: row.last_activity,
            is_active: row.is_active,
            auto_delete: row.auto_delete,
            participants: row.participants,
            text_content: row.text_content,
            live_sync: row.live_sync,
            is_private: row.is_private,
            password_proof: row.password_proof,
        }
    }
}

/// Message row from the database
#[derive(Debug, Clone, sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    room_id: String,
    user_id: String,
    username: String,
    body: String,
    kind: String,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for ChatMessage {
    fn from(row: MessageRow) -> Self {
        ChatMessage {
            id: row.id,
            room_id: row.room_id,
            user_id: row.user_id,
            username: row.username,
            body: row.body,
            kind: if row.kind == "system" {
                MessageKind::System
            } else {
                MessageKind::User
            },
            timestamp: row.created_at,
        }
    }
}

fn kind_str(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::User => "user",
        MessageKind::System => "system",
    }
}

/// Postgres-backed durable store
pub struct DbRooms {
    pool: PgPool,
}

impl DbRooms {
    /// Create a new database connection pool and ensure the schema exists
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    ///
    /// # Returns
    /// * `Result<Self, SqlxError>` - Database connection pool or error
    pub async fn connect(database_url: &str) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        let db = Self { pool };
        db.ensure_schema().await?;
        Ok(db)
    }

    async fn ensure_schema(&self) -> Result<(), SqlxError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rooms (
                room_id        TEXT PRIMARY KEY,
                name           TEXT,
                created_by     TEXT NOT NULL,
                created_at     TIMESTAMPTZ NOT NULL,
                expires_at     TIMESTAMPTZ,
                last_activity  TIMESTAMPTZ NOT NULL,
                is_active      BOOLEAN NOT NULL DEFAULT TRUE,
                auto_delete    BOOLEAN NOT NULL DEFAULT TRUE,
                participants   TEXT[] NOT NULL DEFAULT '{}',
                text_content   TEXT NOT NULL DEFAULT '',
                live_sync      BOOLEAN NOT NULL DEFAULT TRUE,
                is_private     BOOLEAN NOT NULL DEFAULT FALSE,
                password_proof TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id         UUID PRIMARY KEY,
                room_id    TEXT NOT NULL,
                user_id    TEXT NOT NULL,
                username   TEXT NOT NULL,
                body       TEXT NOT NULL,
                kind       TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Indexes backing the cleanup sweep queries
        sqlx::query("CREATE INDEX IF NOT EXISTS rooms_expiry_idx ON rooms (is_active, expires_at)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS rooms_activity_idx ON rooms (is_active, last_activity)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS messages_room_idx ON messages (room_id, created_at)",
        )
        .execute(&self.pool)
        .await?;

        info!("Database schema ensured");
        Ok(())
    }
}

fn db_err(e: SqlxError) -> StoreError {
    StoreError::Database(e.to_string())
}

#[async_trait]
impl RoomStore for DbRooms {
    async fn insert_room(&self, room: Room) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO rooms (
                room_id, name, created_by, created_at, expires_at, last_activity,
                is_active, auto_delete, participants, text_content, live_sync,
                is_private, password_proof
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(&room.room_id)
        .bind(&room.name)
        .bind(&room.created_by)
        .bind(room.created_at)
        .bind(room.expires_at)
        .bind(room.last_activity)
        .bind(room.is_active)
        .bind(room.auto_delete)
        .bind(&room.participants)
        .bind(&room.text_content)
        .bind(room.live_sync)
        .bind(room.is_private)
        .bind(&room.password_proof)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_room(&self, room_id: &str) -> Result<Option<Room>, StoreError> {
        let row = sqlx::query_as::<_, RoomRow>("SELECT * FROM rooms WHERE room_id = $1")
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Room::from))
    }

    async fn update_room(
        &self,
        room_id: &str,
        patch: RoomPatch,
    ) -> Result<Option<Room>, StoreError> {
        // Participant add mirrors a set-add; remove tolerates absence.
        let row = sqlx::query_as::<_, RoomRow>(
            r#"
            UPDATE rooms SET
                is_active     = COALESCE($2, is_active),
                last_activity = COALESCE($3, last_activity),
                text_content  = COALESCE($4, text_content),
                participants  = CASE
                    WHEN $5::TEXT IS NOT NULL AND NOT participants @> ARRAY[$5::TEXT]
                        THEN array_append(participants, $5::TEXT)
                    WHEN $6::TEXT IS NOT NULL
                        THEN array_remove(participants, $6::TEXT)
                    ELSE participants
                END
            WHERE room_id = $1
            RETURNING *
            "#,
        )
        .bind(room_id)
        .bind(patch.is_active)
        .bind(patch.last_activity)
        .bind(patch.text_content)
        .bind(patch.add_participant)
        .bind(patch.remove_participant)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Room::from))
    }

    async fn delete_room(&self, room_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM rooms WHERE room_id = $1")
            .bind(room_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn append_message(&self, msg: &ChatMessage) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, room_id, user_id, username, body, kind, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(msg.id)
        .bind(&msg.room_id)
        .bind(&msg.user_id)
        .bind(&msg.username)
        .bind(&msg.body)
        .bind(kind_str(msg.kind))
        .bind(msg.timestamp)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn delete_messages(&self, room_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM messages WHERE room_id = $1")
            .bind(room_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
    }

    async fn list_messages(&self, room_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT * FROM messages WHERE room_id = $1 ORDER BY created_at ASC",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }

    async fn list_reclaimable_rooms(
        &self,
        now: DateTime<Utc>,
        inactivity_threshold: Duration,
    ) -> Result<Vec<Room>, StoreError> {
        let cutoff = now
            - chrono::Duration::from_std(inactivity_threshold)
                .map_err(|e| StoreError::Database(e.to_string()))?;
        let rows = sqlx::query_as::<_, RoomRow>(
            r#"
            SELECT * FROM rooms
            WHERE (NOT is_active)
               OR (expires_at IS NOT NULL AND expires_at <= $1)
               OR (auto_delete AND last_activity <= $2)
            "#,
        )
        .bind(now)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(Room::from).collect())
    }
}
