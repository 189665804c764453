//! Persistent mapping store (spec §6: "assumed transactional key/value-style
//! access"). Collaborator trait interfaces plus one concrete implementation,
//! [`SqliteStore`], built the same way the teacher's `Db` is: a blocking
//! `rusqlite::Connection` behind a `std::sync::Mutex`, with idempotent
//! `CREATE TABLE IF NOT EXISTS` migrations run at construction time. Since
//! the portal core's handlers are async and `rusqlite` is blocking, every
//! call here goes through `tokio::task::spawn_blocking`.

use crate::ids::{
    EmojiId, LocalUserId, LoginId, NetworkChatId, PartId, PortalKey, Receiver, RemoteMessageId,
    RemoteUserId, RoomEventId, RoomId, RowId,
};
use crate::model::{Message, Portal, Reaction, UserPortal};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

#[async_trait]
pub trait PortalStore: Send + Sync {
    async fn get_by_key(&self, key: &PortalKey) -> Result<Option<Portal>>;
    async fn get_by_room_id(&self, room_id: &RoomId) -> Result<Option<Portal>>;
    /// Try the exact key first, then the receiver-less form (spec §4.1
    /// `get_existing_by_key`, §3 PortalKey fallback rule).
    async fn get_by_id_with_uncertain_receiver(&self, chat_id: &NetworkChatId) -> Result<Option<Portal>>;
    async fn insert(&self, portal: &Portal) -> Result<()>;
    async fn update(&self, portal: &Portal) -> Result<()>;
    async fn delete(&self, key: &PortalKey) -> Result<()>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn get_by_mxid(&self, room_event_id: &RoomEventId) -> Result<Option<Message>>;
    async fn get_part_by_id(&self, remote_message_id: &RemoteMessageId, part_id: &PartId) -> Result<Option<Message>>;
    async fn get_first_part_by_id(&self, remote_message_id: &RemoteMessageId) -> Result<Option<Message>>;
    async fn get_all_parts_by_id(&self, remote_message_id: &RemoteMessageId) -> Result<Vec<Message>>;
    async fn insert(&self, message: &Message) -> Result<RowId>;
    async fn update(&self, message: &Message) -> Result<()>;
    async fn delete_part(&self, remote_message_id: &RemoteMessageId, part_id: &PartId) -> Result<()>;
}

#[async_trait]
pub trait ReactionStore: Send + Sync {
    async fn get_by_key(
        &self,
        remote_message_id: &RemoteMessageId,
        part_id: &PartId,
        sender: &RemoteUserId,
        emoji_id: &EmojiId,
    ) -> Result<Option<Reaction>>;
    async fn get_by_room_event_id(&self, room_event_id: &RoomEventId) -> Result<Option<Reaction>>;
    async fn get_all_to_message_by_sender(
        &self,
        remote_message_id: &RemoteMessageId,
        part_id: &PartId,
        sender: &RemoteUserId,
    ) -> Result<Vec<Reaction>>;
    async fn upsert(&self, reaction: &Reaction) -> Result<()>;
    async fn delete(
        &self,
        remote_message_id: &RemoteMessageId,
        part_id: &PartId,
        sender: &RemoteUserId,
        emoji_id: &EmojiId,
    ) -> Result<()>;
}

#[async_trait]
pub trait UserPortalStore: Send + Sync {
    async fn get(&self, user_id: &LocalUserId, portal_key: &PortalKey) -> Result<Option<UserPortal>>;
    async fn upsert(&self, user_portal: &UserPortal) -> Result<()>;
}

/// `rusqlite`-backed implementation of all four store traits, sharing one
/// connection the way the teacher's `Db` shares one `Connection` across all
/// route handlers. The connection lives behind an `Arc` so each call can hand
/// a cheap clone to `spawn_blocking` instead of holding the lock across an
/// await point.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open portal store database")?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .context("failed to set pragmas")?;
        let store = SqliteStore { conn: Arc::new(Mutex::new(conn)) };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory store")?;
        let store = SqliteStore { conn: Arc::new(Mutex::new(conn)) };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS portals (
                chat_id TEXT NOT NULL,
                receiver TEXT NOT NULL DEFAULT '',
                room_id TEXT,
                parent_chat_id TEXT,
                parent_receiver TEXT,
                name TEXT NOT NULL DEFAULT '',
                topic TEXT NOT NULL DEFAULT '',
                avatar_id TEXT NOT NULL DEFAULT '',
                avatar_url TEXT,
                avatar_content_hash BLOB,
                name_set INTEGER NOT NULL DEFAULT 0,
                topic_set INTEGER NOT NULL DEFAULT 0,
                avatar_set INTEGER NOT NULL DEFAULT 0,
                is_direct INTEGER NOT NULL DEFAULT 0,
                is_space INTEGER NOT NULL DEFAULT 0,
                disappear_type TEXT,
                disappear_timer_secs INTEGER,
                relay_login_id TEXT,
                PRIMARY KEY (chat_id, receiver)
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_portals_room_id ON portals(room_id);

            CREATE TABLE IF NOT EXISTS messages (
                row_id INTEGER PRIMARY KEY AUTOINCREMENT,
                remote_message_id TEXT NOT NULL,
                part_id TEXT NOT NULL DEFAULT '',
                room_id TEXT NOT NULL,
                room_event_id TEXT NOT NULL,
                sender_remote_id TEXT NOT NULL,
                sender_room_user_id TEXT,
                timestamp TEXT NOT NULL,
                relates_to_row_id INTEGER,
                edit_count INTEGER NOT NULL DEFAULT 0,
                metadata TEXT NOT NULL DEFAULT '{}',
                UNIQUE (remote_message_id, part_id),
                UNIQUE (room_event_id)
            );

            CREATE TABLE IF NOT EXISTS reactions (
                remote_message_id TEXT NOT NULL,
                part_id TEXT NOT NULL DEFAULT '',
                sender_remote_id TEXT NOT NULL,
                emoji_id TEXT NOT NULL DEFAULT '',
                room_event_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                emoji TEXT,
                PRIMARY KEY (remote_message_id, part_id, sender_remote_id, emoji_id)
            );

            CREATE TABLE IF NOT EXISTS user_portals (
                user_id TEXT NOT NULL,
                chat_id TEXT NOT NULL,
                receiver TEXT NOT NULL DEFAULT '',
                last_read TEXT,
                in_remote_chat INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, chat_id, receiver)
            );",
        )
        .context("failed to run portal store migrations")?;
        Ok(())
    }
}

fn row_to_portal(row: &rusqlite::Row) -> rusqlite::Result<Portal> {
    let chat_id: String = row.get("chat_id")?;
    let receiver: String = row.get("receiver")?;
    let room_id: Option<String> = row.get("room_id")?;
    let parent_chat_id: Option<String> = row.get("parent_chat_id")?;
    let parent_receiver: Option<String> = row.get("parent_receiver")?;
    let avatar_content_hash: Option<Vec<u8>> = row.get("avatar_content_hash")?;
    let disappear_type: Option<String> = row.get("disappear_type")?;
    let disappear_timer_secs: Option<i64> = row.get("disappear_timer_secs")?;
    let relay_login_id: Option<String> = row.get("relay_login_id")?;

    let disappear = disappear_type.zip(disappear_timer_secs).map(|(t, secs)| {
        let disappear_type = if t == "after_read" {
            crate::model::DisappearType::AfterRead
        } else {
            crate::model::DisappearType::AfterSend
        };
        crate::model::DisappearSetting {
            disappear_type,
            timer: chrono::Duration::seconds(secs),
        }
    });

    Ok(Portal {
        key: PortalKey {
            chat_id: NetworkChatId(chat_id),
            receiver: Receiver(receiver),
        },
        room_id: room_id.map(RoomId),
        parent_key: parent_chat_id.map(|c| PortalKey {
            chat_id: NetworkChatId(c),
            receiver: Receiver(parent_receiver.unwrap_or_default()),
        }),
        name: row.get("name")?,
        topic: row.get("topic")?,
        avatar_id: row.get("avatar_id")?,
        avatar_url: row.get("avatar_url")?,
        avatar_content_hash: avatar_content_hash.and_then(|v| v.try_into().ok()),
        name_set: row.get::<_, i64>("name_set")? != 0,
        topic_set: row.get::<_, i64>("topic_set")? != 0,
        avatar_set: row.get::<_, i64>("avatar_set")? != 0,
        is_direct: row.get::<_, i64>("is_direct")? != 0,
        is_space: row.get::<_, i64>("is_space")? != 0,
        disappear,
        relay_login_id: relay_login_id.map(LoginId),
    })
}

fn write_portal(conn: &Connection, portal: &Portal) -> rusqlite::Result<()> {
    let (disappear_type, disappear_secs) = match &portal.disappear {
        Some(d) => (
            Some(match d.disappear_type {
                crate::model::DisappearType::AfterRead => "after_read",
                crate::model::DisappearType::AfterSend => "after_send",
            }),
            Some(d.timer.num_seconds()),
        ),
        None => (None, None),
    };
    conn.execute(
        "INSERT INTO portals (
            chat_id, receiver, room_id, parent_chat_id, parent_receiver, name, topic,
            avatar_id, avatar_url, avatar_content_hash, name_set, topic_set, avatar_set,
            is_direct, is_space, disappear_type, disappear_timer_secs, relay_login_id
        ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18)
        ON CONFLICT(chat_id, receiver) DO UPDATE SET
            room_id = excluded.room_id,
            parent_chat_id = excluded.parent_chat_id,
            parent_receiver = excluded.parent_receiver,
            name = excluded.name,
            topic = excluded.topic,
            avatar_id = excluded.avatar_id,
            avatar_url = excluded.avatar_url,
            avatar_content_hash = excluded.avatar_content_hash,
            name_set = excluded.name_set,
            topic_set = excluded.topic_set,
            avatar_set = excluded.avatar_set,
            is_direct = excluded.is_direct,
            is_space = excluded.is_space,
            disappear_type = excluded.disappear_type,
            disappear_timer_secs = excluded.disappear_timer_secs,
            relay_login_id = excluded.relay_login_id",
        params![
            portal.key.chat_id.0,
            portal.key.receiver.0,
            portal.room_id.as_ref().map(|r| &r.0),
            portal.parent_key.as_ref().map(|k| k.chat_id.0.clone()),
            portal.parent_key.as_ref().map(|k| k.receiver.0.clone()),
            portal.name,
            portal.topic,
            portal.avatar_id,
            portal.avatar_url,
            portal.avatar_content_hash.map(|h| h.to_vec()),
            portal.name_set as i64,
            portal.topic_set as i64,
            portal.avatar_set as i64,
            portal.is_direct as i64,
            portal.is_space as i64,
            disappear_type,
            disappear_secs,
            portal.relay_login_id.as_ref().map(|l| &l.0),
        ],
    )?;
    Ok(())
}

fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<Message> {
    let metadata_str: String = row.get("metadata")?;
    let timestamp: String = row.get("timestamp")?;
    let sender_room_user_id: Option<String> = row.get("sender_room_user_id")?;
    let relates_to_row_id: Option<i64> = row.get("relates_to_row_id")?;
    Ok(Message {
        row_id: RowId(row.get("row_id")?),
        remote_message_id: RemoteMessageId(row.get("remote_message_id")?),
        part_id: PartId(row.get("part_id")?),
        room_id: RoomId(row.get("room_id")?),
        room_event_id: RoomEventId(row.get("room_event_id")?),
        sender_remote_id: RemoteUserId(row.get("sender_remote_id")?),
        sender_room_user_id: sender_room_user_id.map(crate::ids::RoomUserId),
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        relates_to_row_id: relates_to_row_id.map(RowId),
        edit_count: row.get::<_, i64>("edit_count")? as u32,
        metadata: serde_json::from_str(&metadata_str).unwrap_or(serde_json::Value::Null),
    })
}

fn row_to_reaction(row: &rusqlite::Row) -> rusqlite::Result<Reaction> {
    let timestamp: String = row.get("timestamp")?;
    Ok(Reaction {
        remote_message_id: RemoteMessageId(row.get("remote_message_id")?),
        part_id: PartId(row.get("part_id")?),
        sender_remote_id: RemoteUserId(row.get("sender_remote_id")?),
        emoji_id: EmojiId(row.get("emoji_id")?),
        room_event_id: RoomEventId(row.get("room_event_id")?),
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        emoji: row.get("emoji")?,
    })
}

/// Runs a blocking closure on the blocking thread pool and flattens the
/// `JoinError` into the closure's own `anyhow::Result`.
async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.context("blocking store task panicked")?
}

#[async_trait]
impl PortalStore for SqliteStore {
    async fn get_by_key(&self, key: &PortalKey) -> Result<Option<Portal>> {
        let conn = self.conn.clone();
        let key = key.clone();
        blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            conn.query_row(
                "SELECT * FROM portals WHERE chat_id = ?1 AND receiver = ?2",
                params![key.chat_id.0, key.receiver.0],
                row_to_portal,
            )
            .optional()
            .context("get_by_key failed")
        })
        .await
    }

    async fn get_by_room_id(&self, room_id: &RoomId) -> Result<Option<Portal>> {
        let conn = self.conn.clone();
        let room_id = room_id.clone();
        blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            conn.query_row(
                "SELECT * FROM portals WHERE room_id = ?1",
                params![room_id.0],
                row_to_portal,
            )
            .optional()
            .context("get_by_room_id failed")
        })
        .await
    }

    async fn get_by_id_with_uncertain_receiver(&self, chat_id: &NetworkChatId) -> Result<Option<Portal>> {
        let conn = self.conn.clone();
        let chat_id = chat_id.clone();
        blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            conn.query_row(
                "SELECT * FROM portals WHERE chat_id = ?1 ORDER BY (receiver = '') DESC LIMIT 1",
                params![chat_id.0],
                row_to_portal,
            )
            .optional()
            .context("get_by_id_with_uncertain_receiver failed")
        })
        .await
    }

    async fn insert(&self, portal: &Portal) -> Result<()> {
        let conn = self.conn.clone();
        let portal = portal.clone();
        blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            write_portal(&conn, &portal).context("insert portal failed")
        })
        .await
    }

    async fn update(&self, portal: &Portal) -> Result<()> {
        let conn = self.conn.clone();
        let portal = portal.clone();
        blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            write_portal(&conn, &portal).context("update portal failed")
        })
        .await
    }

    async fn delete(&self, key: &PortalKey) -> Result<()> {
        let conn = self.conn.clone();
        let key = key.clone();
        blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            conn.execute(
                "DELETE FROM portals WHERE chat_id = ?1 AND receiver = ?2",
                params![key.chat_id.0, key.receiver.0],
            )
            .context("delete portal failed")?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn get_by_mxid(&self, room_event_id: &RoomEventId) -> Result<Option<Message>> {
        let conn = self.conn.clone();
        let room_event_id = room_event_id.clone();
        blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            conn.query_row(
                "SELECT * FROM messages WHERE room_event_id = ?1",
                params![room_event_id.0],
                row_to_message,
            )
            .optional()
            .context("get_by_mxid failed")
        })
        .await
    }

    async fn get_part_by_id(&self, remote_message_id: &RemoteMessageId, part_id: &PartId) -> Result<Option<Message>> {
        let conn = self.conn.clone();
        let remote_message_id = remote_message_id.clone();
        let part_id = part_id.clone();
        blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            conn.query_row(
                "SELECT * FROM messages WHERE remote_message_id = ?1 AND part_id = ?2",
                params![remote_message_id.0, part_id.0],
                row_to_message,
            )
            .optional()
            .context("get_part_by_id failed")
        })
        .await
    }

    async fn get_first_part_by_id(&self, remote_message_id: &RemoteMessageId) -> Result<Option<Message>> {
        let conn = self.conn.clone();
        let remote_message_id = remote_message_id.clone();
        blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            conn.query_row(
                "SELECT * FROM messages WHERE remote_message_id = ?1 ORDER BY row_id ASC LIMIT 1",
                params![remote_message_id.0],
                row_to_message,
            )
            .optional()
            .context("get_first_part_by_id failed")
        })
        .await
    }

    async fn get_all_parts_by_id(&self, remote_message_id: &RemoteMessageId) -> Result<Vec<Message>> {
        let conn = self.conn.clone();
        let remote_message_id = remote_message_id.clone();
        blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            let mut stmt = conn.prepare(
                "SELECT * FROM messages WHERE remote_message_id = ?1 ORDER BY row_id ASC",
            )?;
            let rows = stmt
                .query_map(params![remote_message_id.0], row_to_message)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("get_all_parts_by_id failed")?;
            Ok(rows)
        })
        .await
    }

    async fn insert(&self, message: &Message) -> Result<RowId> {
        let conn = self.conn.clone();
        let message = message.clone();
        blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            conn.execute(
                "INSERT INTO messages (
                    remote_message_id, part_id, room_id, room_event_id, sender_remote_id,
                    sender_room_user_id, timestamp, relates_to_row_id, edit_count, metadata
                ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
                params![
                    message.remote_message_id.0,
                    message.part_id.0,
                    message.room_id.0,
                    message.room_event_id.0,
                    message.sender_remote_id.0,
                    message.sender_room_user_id.as_ref().map(|u| &u.0),
                    message.timestamp.to_rfc3339(),
                    message.relates_to_row_id.map(|r| r.0),
                    message.edit_count as i64,
                    serde_json::to_string(&message.metadata).unwrap_or_else(|_| "{}".to_string()),
                ],
            )
            .context("insert message failed")?;
            Ok(RowId(conn.last_insert_rowid()))
        })
        .await
    }

    async fn update(&self, message: &Message) -> Result<()> {
        let conn = self.conn.clone();
        let message = message.clone();
        blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            conn.execute(
                "UPDATE messages SET edit_count = ?1, metadata = ?2 WHERE row_id = ?3",
                params![
                    message.edit_count as i64,
                    serde_json::to_string(&message.metadata).unwrap_or_else(|_| "{}".to_string()),
                    message.row_id.0,
                ],
            )
            .context("update message failed")?;
            Ok(())
        })
        .await
    }

    async fn delete_part(&self, remote_message_id: &RemoteMessageId, part_id: &PartId) -> Result<()> {
        let conn = self.conn.clone();
        let remote_message_id = remote_message_id.clone();
        let part_id = part_id.clone();
        blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            conn.execute(
                "DELETE FROM messages WHERE remote_message_id = ?1 AND part_id = ?2",
                params![remote_message_id.0, part_id.0],
            )
            .context("delete_part failed")?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl ReactionStore for SqliteStore {
    async fn get_by_key(
        &self,
        remote_message_id: &RemoteMessageId,
        part_id: &PartId,
        sender: &RemoteUserId,
        emoji_id: &EmojiId,
    ) -> Result<Option<Reaction>> {
        let conn = self.conn.clone();
        let remote_message_id = remote_message_id.clone();
        let part_id = part_id.clone();
        let sender = sender.clone();
        let emoji_id = emoji_id.clone();
        blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            conn.query_row(
                "SELECT * FROM reactions WHERE remote_message_id = ?1 AND part_id = ?2 AND sender_remote_id = ?3 AND emoji_id = ?4",
                params![remote_message_id.0, part_id.0, sender.0, emoji_id.0],
                row_to_reaction,
            )
            .optional()
            .context("reaction get_by_key failed")
        })
        .await
    }

    async fn get_by_room_event_id(&self, room_event_id: &RoomEventId) -> Result<Option<Reaction>> {
        let conn = self.conn.clone();
        let room_event_id = room_event_id.clone();
        blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            conn.query_row(
                "SELECT * FROM reactions WHERE room_event_id = ?1",
                params![room_event_id.0],
                row_to_reaction,
            )
            .optional()
            .context("reaction get_by_room_event_id failed")
        })
        .await
    }

    async fn get_all_to_message_by_sender(
        &self,
        remote_message_id: &RemoteMessageId,
        part_id: &PartId,
        sender: &RemoteUserId,
    ) -> Result<Vec<Reaction>> {
        let conn = self.conn.clone();
        let remote_message_id = remote_message_id.clone();
        let part_id = part_id.clone();
        let sender = sender.clone();
        blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            let mut stmt = conn.prepare(
                "SELECT * FROM reactions WHERE remote_message_id = ?1 AND part_id = ?2 AND sender_remote_id = ?3 ORDER BY timestamp ASC",
            )?;
            let rows = stmt
                .query_map(params![remote_message_id.0, part_id.0, sender.0], row_to_reaction)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("get_all_to_message_by_sender failed")?;
            Ok(rows)
        })
        .await
    }

    async fn upsert(&self, reaction: &Reaction) -> Result<()> {
        let conn = self.conn.clone();
        let reaction = reaction.clone();
        blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            conn.execute(
                "INSERT INTO reactions (remote_message_id, part_id, sender_remote_id, emoji_id, room_event_id, timestamp, emoji)
                 VALUES (?1,?2,?3,?4,?5,?6,?7)
                 ON CONFLICT(remote_message_id, part_id, sender_remote_id, emoji_id) DO UPDATE SET
                    room_event_id = excluded.room_event_id,
                    timestamp = excluded.timestamp,
                    emoji = excluded.emoji",
                params![
                    reaction.remote_message_id.0,
                    reaction.part_id.0,
                    reaction.sender_remote_id.0,
                    reaction.emoji_id.0,
                    reaction.room_event_id.0,
                    reaction.timestamp.to_rfc3339(),
                    reaction.emoji,
                ],
            )
            .context("reaction upsert failed")?;
            Ok(())
        })
        .await
    }

    async fn delete(
        &self,
        remote_message_id: &RemoteMessageId,
        part_id: &PartId,
        sender: &RemoteUserId,
        emoji_id: &EmojiId,
    ) -> Result<()> {
        let conn = self.conn.clone();
        let remote_message_id = remote_message_id.clone();
        let part_id = part_id.clone();
        let sender = sender.clone();
        let emoji_id = emoji_id.clone();
        blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            conn.execute(
                "DELETE FROM reactions WHERE remote_message_id = ?1 AND part_id = ?2 AND sender_remote_id = ?3 AND emoji_id = ?4",
                params![remote_message_id.0, part_id.0, sender.0, emoji_id.0],
            )
            .context("reaction delete failed")?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl UserPortalStore for SqliteStore {
    async fn get(&self, user_id: &LocalUserId, portal_key: &PortalKey) -> Result<Option<UserPortal>> {
        let conn = self.conn.clone();
        let user_id = user_id.clone();
        let portal_key = portal_key.clone();
        blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            conn.query_row(
                "SELECT * FROM user_portals WHERE user_id = ?1 AND chat_id = ?2 AND receiver = ?3",
                params![user_id.0, portal_key.chat_id.0, portal_key.receiver.0],
                |row| {
                    let last_read: Option<String> = row.get("last_read")?;
                    Ok(UserPortal {
                        user_id: LocalUserId(row.get("user_id")?),
                        portal_key: PortalKey {
                            chat_id: NetworkChatId(row.get("chat_id")?),
                            receiver: Receiver(row.get("receiver")?),
                        },
                        last_read: last_read.and_then(|s| {
                            DateTime::parse_from_rfc3339(&s).ok().map(|dt| dt.with_timezone(&Utc))
                        }),
                        in_remote_chat: row.get::<_, i64>("in_remote_chat")? != 0,
                    })
                },
            )
            .optional()
            .context("user_portal get failed")
        })
        .await
    }

    async fn upsert(&self, user_portal: &UserPortal) -> Result<()> {
        let conn = self.conn.clone();
        let user_portal = user_portal.clone();
        blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            conn.execute(
                "INSERT INTO user_portals (user_id, chat_id, receiver, last_read, in_remote_chat)
                 VALUES (?1,?2,?3,?4,?5)
                 ON CONFLICT(user_id, chat_id, receiver) DO UPDATE SET
                    last_read = excluded.last_read,
                    in_remote_chat = excluded.in_remote_chat",
                params![
                    user_portal.user_id.0,
                    user_portal.portal_key.chat_id.0,
                    user_portal.portal_key.receiver.0,
                    user_portal.last_read.map(|d| d.to_rfc3339()),
                    user_portal.in_remote_chat as i64,
                ],
            )
            .context("user_portal upsert failed")?;
            Ok(())
        })
        .await
    }
}
