//! Shared fakes for driving the portal core without a real Matrix server or
//! network client (spec §6a: "hand-rolled fake MatrixApi/NetworkApi/Storage
//! implementations... a hand-rolled double, not a mocking framework").

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portal_core::apis::{
    ChatInfo, CreateRoomRequest, DisappearingSweeper, EditResult, GhostApi, HandledMessage,
    LoginCache, MatrixApi, MatrixSendError, NetworkApi, PreHandledReaction, RoomMember,
    RoomSideCapabilities,
};
use portal_core::capabilities::Capabilities;
use portal_core::config::BridgeConfig;
use portal_core::error::MessageStatus;
use portal_core::ids::{
    EmojiId, LocalUserId, LoginId, PartId, PortalKey, RemoteMessageId, RemoteUserId, RoomEventId,
    RoomId, RoomUserId,
};
use portal_core::intent::Intent;
use portal_core::model::{DisappearingMessage, Message, NetworkLogin, Portal, Reaction};
use portal_core::remote_event::{
    ConvertedEdit, ConvertedMessage, EventSender, ReceiptTarget, RemoteChatMute, RemoteChatTag,
    RemoteEdit, RemoteMarkUnread, RemoteMessage, RemoteMessageRemove, RemoteReaction,
    RemoteReactionRemove, RemoteReadReceipt,
};
use portal_core::room_event::{MessageContent, RelatesTo};
use portal_core::storage::{MessageStore, PortalStore, ReactionStore, SqliteStore, UserPortalStore};
use portal_core::Bridge;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub room_id: RoomId,
    pub intent: Intent,
    pub content: MessageContent,
    pub relates_to: RelatesTo,
}

#[derive(Debug, Clone)]
pub struct SentReaction {
    pub room_id: RoomId,
    pub intent: Intent,
    pub target_event_id: RoomEventId,
    pub emoji: String,
}

#[derive(Debug, Clone)]
pub struct Redaction {
    pub room_id: RoomId,
    pub intent: Intent,
    pub event_id: RoomEventId,
}

/// Records every call it receives instead of talking to a real homeserver.
#[derive(Default)]
pub struct FakeMatrixApi {
    pub sent_messages: Mutex<Vec<SentMessage>>,
    pub sent_reactions: Mutex<Vec<SentReaction>>,
    pub redactions: Mutex<Vec<Redaction>>,
    pub statuses: Mutex<Vec<(RoomId, MessageStatus)>>,
    pub members: Mutex<HashMap<RoomId, Vec<RoomMember>>>,
    pub created_rooms: Mutex<Vec<CreateRoomRequest>>,
    pub kicks: Mutex<Vec<(RoomId, RoomUserId)>>,
    pub invites: Mutex<Vec<(RoomId, RoomUserId)>>,
    pub marks_read: Mutex<Vec<(RoomId, DateTime<Utc>)>>,
    pub unreads: Mutex<Vec<(RoomId, bool)>>,
    pub tags: Mutex<Vec<(RoomId, String, bool)>>,
    pub mutes: Mutex<Vec<(RoomId, bool)>>,
    pub state_calls: Mutex<Vec<(RoomId, Intent, String, serde_json::Value)>>,
    pub next_id: AtomicU64,
    pub room_capabilities: RoomSideCapabilities,
    pub next_created_room_id: Option<RoomId>,
    pub forbid_non_bot_state: bool,
    pub fail_reupload: bool,
}

impl FakeMatrixApi {
    fn next_event_id(&self) -> RoomEventId {
        RoomEventId(format!("$evt{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
    }
}

#[async_trait]
impl MatrixApi for FakeMatrixApi {
    async fn send_message(&self, room_id: &RoomId, intent: &Intent, content: &MessageContent, relates_to: &RelatesTo) -> anyhow::Result<RoomEventId> {
        let id = self.next_event_id();
        self.sent_messages.lock().unwrap().push(SentMessage {
            room_id: room_id.clone(),
            intent: intent.clone(),
            content: content.clone(),
            relates_to: relates_to.clone(),
        });
        Ok(id)
    }

    async fn send_reaction(&self, room_id: &RoomId, intent: &Intent, target_event_id: &RoomEventId, emoji: &str) -> anyhow::Result<RoomEventId> {
        let id = self.next_event_id();
        self.sent_reactions.lock().unwrap().push(SentReaction {
            room_id: room_id.clone(),
            intent: intent.clone(),
            target_event_id: target_event_id.clone(),
            emoji: emoji.to_string(),
        });
        Ok(id)
    }

    async fn send_state(&self, room_id: &RoomId, intent: &Intent, event_type: &str, _state_key: &str, content: serde_json::Value) -> Result<RoomEventId, MatrixSendError> {
        self.state_calls.lock().unwrap().push((room_id.clone(), intent.clone(), event_type.to_string(), content));
        if self.forbid_non_bot_state && !matches!(intent, Intent::Bot) {
            return Err(MatrixSendError::Forbidden);
        }
        Ok(self.next_event_id())
    }

    async fn get_members(&self, room_id: &RoomId) -> anyhow::Result<Vec<RoomMember>> {
        Ok(self.members.lock().unwrap().get(room_id).cloned().unwrap_or_default())
    }

    async fn ensure_joined(&self, _room_id: &RoomId, _intent: &Intent) -> anyhow::Result<()> {
        Ok(())
    }

    async fn invite_user(&self, room_id: &RoomId, user_id: &RoomUserId) -> anyhow::Result<()> {
        self.invites.lock().unwrap().push((room_id.clone(), user_id.clone()));
        Ok(())
    }

    async fn kick_user(&self, room_id: &RoomId, user_id: &RoomUserId, _reason: &str) -> anyhow::Result<()> {
        self.kicks.lock().unwrap().push((room_id.clone(), user_id.clone()));
        Ok(())
    }

    async fn create_room(&self, req: CreateRoomRequest) -> anyhow::Result<RoomId> {
        let room_id = self
            .next_created_room_id
            .clone()
            .unwrap_or_else(|| RoomId(format!("!room{}:test", self.next_id.fetch_add(1, Ordering::SeqCst))));
        self.created_rooms.lock().unwrap().push(req);
        Ok(room_id)
    }

    async fn mark_read(&self, room_id: &RoomId, _intent: &Intent, up_to: DateTime<Utc>) -> anyhow::Result<()> {
        self.marks_read.lock().unwrap().push((room_id.clone(), up_to));
        Ok(())
    }

    async fn mark_typing(&self, _room_id: &RoomId, _intent: &Intent, _typing: bool) -> anyhow::Result<()> {
        Ok(())
    }

    async fn mark_unread(&self, room_id: &RoomId, _intent: &Intent, unread: bool) -> anyhow::Result<()> {
        self.unreads.lock().unwrap().push((room_id.clone(), unread));
        Ok(())
    }

    async fn tag_room(&self, room_id: &RoomId, _intent: &Intent, tag: &str, tagged: bool) -> anyhow::Result<()> {
        self.tags.lock().unwrap().push((room_id.clone(), tag.to_string(), tagged));
        Ok(())
    }

    async fn mute_room(&self, room_id: &RoomId, _intent: &Intent, muted: bool) -> anyhow::Result<()> {
        self.mutes.lock().unwrap().push((room_id.clone(), muted));
        Ok(())
    }

    async fn redact(&self, room_id: &RoomId, intent: &Intent, event_id: &RoomEventId, _reason: Option<&str>) -> anyhow::Result<()> {
        self.redactions.lock().unwrap().push(Redaction {
            room_id: room_id.clone(),
            intent: intent.clone(),
            event_id: event_id.clone(),
        });
        Ok(())
    }

    async fn reupload(&self, _intent: &Intent, _avatar_id: &str, known_hash: Option<[u8; 32]>) -> anyhow::Result<([u8; 32], Option<String>)> {
        if self.fail_reupload {
            anyhow::bail!("reupload failed");
        }
        Ok((known_hash.unwrap_or([1u8; 32]), Some("mxc://test/avatar".to_string())))
    }

    fn get_capabilities(&self) -> RoomSideCapabilities {
        self.room_capabilities.clone()
    }

    fn server_name(&self) -> String {
        "test.example.org".to_string()
    }

    async fn send_message_status(&self, room_id: &RoomId, status: &MessageStatus) -> anyhow::Result<()> {
        self.statuses.lock().unwrap().push((room_id.clone(), status.clone()));
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct HandledMessageCall {
    pub portal_key: PortalKey,
    pub login: NetworkLogin,
    pub content_debug: String,
}

/// Configurable fake network client. Construct with [`FakeNetworkApi::new`]
/// and override fields before wrapping in an `Arc` to steer capability gates.
pub struct FakeNetworkApi {
    pub capabilities: Mutex<Capabilities>,
    pub chat_info: Mutex<ChatInfo>,
    pub handled_messages: Mutex<Vec<HandledMessageCall>>,
    pub handled_edits: Mutex<Vec<(PortalKey, NetworkLogin)>>,
    pub handled_reactions: Mutex<Vec<(PortalKey, NetworkLogin, String)>>,
    pub handled_reaction_removes: Mutex<Vec<(PortalKey, NetworkLogin)>>,
    pub handled_message_removes: Mutex<Vec<(PortalKey, NetworkLogin)>>,
    pub handled_read_receipts: Mutex<Vec<(PortalKey, NetworkLogin, DateTime<Utc>)>>,
    pub handled_typing: Mutex<Vec<(PortalKey, NetworkLogin, bool)>>,
    pub next_id: AtomicU64,
    pub edit_result: EditResult,
    pub max_reactions: u32,
    pub fail_handle_message: bool,
}

impl FakeNetworkApi {
    pub fn new(capabilities: Capabilities) -> Self {
        FakeNetworkApi {
            capabilities: Mutex::new(capabilities),
            chat_info: Mutex::new(ChatInfo::default()),
            handled_messages: Mutex::new(Vec::new()),
            handled_edits: Mutex::new(Vec::new()),
            handled_reactions: Mutex::new(Vec::new()),
            handled_reaction_removes: Mutex::new(Vec::new()),
            handled_message_removes: Mutex::new(Vec::new()),
            handled_read_receipts: Mutex::new(Vec::new()),
            handled_typing: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            edit_result: EditResult { edit_count: 1, metadata: serde_json::Value::Null },
            max_reactions: 0,
            fail_handle_message: false,
        }
    }
}

#[async_trait]
impl NetworkApi for FakeNetworkApi {
    fn get_capabilities(&self, _portal_key: &PortalKey) -> Capabilities {
        *self.capabilities.lock().unwrap()
    }

    async fn get_chat_info(&self, _portal_key: &PortalKey) -> anyhow::Result<ChatInfo> {
        Ok(self.chat_info.lock().unwrap().clone())
    }

    async fn handle_message(&self, portal_key: &PortalKey, login: &NetworkLogin, content: &MessageContent, _relates_to: &RelatesTo) -> anyhow::Result<HandledMessage> {
        if self.fail_handle_message {
            anyhow::bail!("network refused the message");
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.handled_messages.lock().unwrap().push(HandledMessageCall {
            portal_key: portal_key.clone(),
            login: login.clone(),
            content_debug: format!("{content:?}"),
        });
        Ok(HandledMessage {
            remote_message_id: portal_core::ids::RemoteMessageId(format!("remote-msg-{n}")),
            part_id: portal_core::ids::PartId::only(),
            sender_remote_id: RemoteUserId(format!("remote:{}", login.user_id)),
            timestamp: None,
            metadata: serde_json::Value::Null,
        })
    }

    async fn handle_edit(&self, portal_key: &PortalKey, login: &NetworkLogin, _target: &Message, _content: &MessageContent) -> anyhow::Result<EditResult> {
        self.handled_edits.lock().unwrap().push((portal_key.clone(), login.clone()));
        Ok(self.edit_result.clone())
    }

    async fn pre_handle_reaction(&self, _portal_key: &PortalKey, target: &Message, emoji: &str) -> anyhow::Result<PreHandledReaction> {
        Ok(PreHandledReaction {
            sender_remote_id: target.sender_remote_id.clone(),
            emoji_id: EmojiId::none(),
            emoji: Some(emoji.to_string()),
            max_reactions: self.max_reactions,
        })
    }

    async fn handle_reaction(&self, portal_key: &PortalKey, login: &NetworkLogin, _target: &Message, pre: &PreHandledReaction, _existing_to_keep: &[Reaction]) -> anyhow::Result<()> {
        self.handled_reactions
            .lock()
            .unwrap()
            .push((portal_key.clone(), login.clone(), pre.emoji.clone().unwrap_or_default()));
        Ok(())
    }

    async fn handle_reaction_remove(&self, portal_key: &PortalKey, login: &NetworkLogin, _reaction: &Reaction) -> anyhow::Result<()> {
        self.handled_reaction_removes.lock().unwrap().push((portal_key.clone(), login.clone()));
        Ok(())
    }

    async fn handle_message_remove(&self, portal_key: &PortalKey, login: &NetworkLogin, _target: &Message) -> anyhow::Result<()> {
        self.handled_message_removes.lock().unwrap().push((portal_key.clone(), login.clone()));
        Ok(())
    }

    async fn handle_read_receipt(&self, portal_key: &PortalKey, login: &NetworkLogin, read_up_to: DateTime<Utc>) -> anyhow::Result<()> {
        self.handled_read_receipts.lock().unwrap().push((portal_key.clone(), login.clone(), read_up_to));
        Ok(())
    }

    async fn handle_typing(&self, portal_key: &PortalKey, login: &NetworkLogin, typing: bool) -> anyhow::Result<()> {
        self.handled_typing.lock().unwrap().push((portal_key.clone(), login.clone(), typing));
        Ok(())
    }
}

pub struct FakeGhostApi;

#[async_trait]
impl GhostApi for FakeGhostApi {
    async fn get_or_create_ghost(&self, remote_user_id: &RemoteUserId) -> anyhow::Result<Intent> {
        Ok(Intent::Ghost(remote_user_id.clone()))
    }

    fn trigger_ghost_info_refresh(&self, _remote_user_id: &RemoteUserId) {}
}

#[derive(Default)]
pub struct FakeLoginCache {
    pub logins: Mutex<HashMap<LocalUserId, Vec<NetworkLogin>>>,
    pub double_puppets: Mutex<HashMap<LocalUserId, Intent>>,
    pub room_user_to_local: Mutex<HashMap<RoomUserId, LocalUserId>>,
}

impl FakeLoginCache {
    pub fn add_login(&self, login: NetworkLogin) {
        self.logins.lock().unwrap().entry(login.user_id.clone()).or_default().push(login);
    }

    pub fn set_double_puppet(&self, user_id: LocalUserId, intent: Intent) {
        self.double_puppets.lock().unwrap().insert(user_id, intent);
    }

    pub fn map_room_user(&self, room_user: RoomUserId, local_user: LocalUserId) {
        self.room_user_to_local.lock().unwrap().insert(room_user, local_user);
    }
}

impl LoginCache for FakeLoginCache {
    fn logins_for_user(&self, user_id: &LocalUserId) -> Vec<NetworkLogin> {
        self.logins.lock().unwrap().get(user_id).cloned().unwrap_or_default()
    }

    fn login_by_id(&self, login_id: &LoginId) -> Option<NetworkLogin> {
        self.logins
            .lock()
            .unwrap()
            .values()
            .flatten()
            .find(|l| &l.login_id == login_id)
            .cloned()
    }

    fn double_puppet_intent(&self, user_id: &LocalUserId) -> Option<Intent> {
        self.double_puppets.lock().unwrap().get(user_id).cloned()
    }

    fn user_for_login(&self, login_id: &LoginId) -> Option<LocalUserId> {
        self.logins
            .lock()
            .unwrap()
            .iter()
            .find(|(_, logins)| logins.iter().any(|l| &l.login_id == login_id))
            .map(|(user, _)| user.clone())
    }

    fn local_user_for_room_user(&self, room_user: &RoomUserId) -> Option<LocalUserId> {
        self.room_user_to_local.lock().unwrap().get(room_user).cloned()
    }
}

#[derive(Default)]
pub struct FakeSweeper {
    pub scheduled: Mutex<Vec<DisappearingMessage>>,
    pub kicked: Mutex<Vec<RoomId>>,
}

impl DisappearingSweeper for FakeSweeper {
    fn schedule(&self, entry: DisappearingMessage) {
        self.scheduled.lock().unwrap().push(entry);
    }

    fn kick(&self, room_id: &RoomId) {
        self.kicked.lock().unwrap().push(room_id.clone());
    }
}

/// Everything a test needs a handle to, bundled so assertions can reach past
/// the `Arc<dyn Trait>` erasure on [`Bridge`].
pub struct TestEnv {
    pub bridge: Arc<Bridge>,
    pub matrix_api: Arc<FakeMatrixApi>,
    pub network_api: Arc<FakeNetworkApi>,
    pub login_cache: Arc<FakeLoginCache>,
    pub sweeper: Arc<FakeSweeper>,
}

pub fn build_env(capabilities: Capabilities) -> TestEnv {
    build_env_with_config(capabilities, BridgeConfig::default())
}

pub fn build_env_with_matrix_api(capabilities: Capabilities, matrix_api: Arc<FakeMatrixApi>) -> TestEnv {
    build_env_with(capabilities, BridgeConfig::default(), matrix_api)
}

pub fn build_env_with_config(capabilities: Capabilities, config: BridgeConfig) -> TestEnv {
    build_env_with(capabilities, config, Arc::new(FakeMatrixApi::default()))
}

fn build_env_with(capabilities: Capabilities, config: BridgeConfig, matrix_api: Arc<FakeMatrixApi>) -> TestEnv {
    let store = Arc::new(SqliteStore::open_in_memory().expect("open in-memory store"));
    let network_api = Arc::new(FakeNetworkApi::new(capabilities));
    let ghost_api = Arc::new(FakeGhostApi);
    let login_cache = Arc::new(FakeLoginCache::default());
    let sweeper = Arc::new(FakeSweeper::default());

    let bridge = Bridge::new(
        config,
        store.clone() as Arc<dyn PortalStore>,
        store.clone() as Arc<dyn MessageStore>,
        store.clone() as Arc<dyn ReactionStore>,
        store as Arc<dyn UserPortalStore>,
        matrix_api.clone() as Arc<dyn MatrixApi>,
        network_api.clone() as Arc<dyn NetworkApi>,
        ghost_api as Arc<dyn GhostApi>,
        login_cache.clone() as Arc<dyn LoginCache>,
        Some(sweeper.clone() as Arc<dyn DisappearingSweeper>),
    );

    TestEnv { bridge, matrix_api, network_api, login_cache, sweeper }
}

// --- Remote event fakes ---

pub fn event_sender(remote: &str) -> EventSender {
    EventSender {
        sender: RemoteUserId(remote.to_string()),
        sender_login: None,
        is_from_me: false,
    }
}

pub struct FakeRemoteMessage {
    pub sender: EventSender,
    pub remote_message_id: RemoteMessageId,
    pub timestamp: DateTime<Utc>,
    pub parts: Vec<ConvertedTextPart>,
    pub reply_to: Option<RemoteMessageId>,
    pub fail_conversion: bool,
}

/// Shorthand for a plain single-part text message.
pub struct ConvertedTextPart(pub String);

impl FakeRemoteMessage {
    pub fn text(remote_message_id: &str, sender: &str, body: &str) -> Self {
        FakeRemoteMessage {
            sender: event_sender(sender),
            remote_message_id: RemoteMessageId(remote_message_id.to_string()),
            timestamp: Utc::now(),
            parts: vec![ConvertedTextPart(body.to_string())],
            reply_to: None,
            fail_conversion: false,
        }
    }
}

#[async_trait]
impl RemoteMessage for FakeRemoteMessage {
    fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    fn remote_message_id(&self) -> RemoteMessageId {
        self.remote_message_id.clone()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    async fn convert_message(&self, _portal: &Portal, _intent: &Intent) -> anyhow::Result<ConvertedMessage> {
        if self.fail_conversion {
            anyhow::bail!("conversion failed");
        }
        Ok(ConvertedMessage {
            parts: self
                .parts
                .iter()
                .map(|p| portal_core::remote_event::ConvertedPart {
                    part_id: PartId::only(),
                    content: MessageContent::Text(p.0.clone()),
                })
                .collect(),
            reply_to: self.reply_to.clone(),
            thread_root: None,
            disappear: None,
        })
    }
}

pub struct FakeRemoteEdit {
    pub sender: EventSender,
    pub target_remote_message_id: RemoteMessageId,
    pub new_body: String,
}

#[async_trait]
impl RemoteEdit for FakeRemoteEdit {
    fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    fn target_remote_message_id(&self) -> RemoteMessageId {
        self.target_remote_message_id.clone()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn convert_edit(&self, _portal: &Portal, _intent: &Intent, existing_parts: &[Message]) -> anyhow::Result<ConvertedEdit> {
        Ok(ConvertedEdit {
            modified_parts: existing_parts
                .iter()
                .map(|m| portal_core::remote_event::ConvertedPart {
                    part_id: m.part_id.clone(),
                    content: MessageContent::Text(self.new_body.clone()),
                })
                .collect(),
            deleted_parts: Vec::new(),
        })
    }
}

pub struct FakeRemoteReaction {
    pub sender: EventSender,
    pub target_remote_message_id: RemoteMessageId,
    pub emoji: String,
}

#[async_trait]
impl RemoteReaction for FakeRemoteReaction {
    fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    fn target_remote_message_id(&self) -> RemoteMessageId {
        self.target_remote_message_id.clone()
    }

    fn emoji(&self) -> Option<String> {
        Some(self.emoji.clone())
    }

    fn timestamp(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct FakeRemoteReactionRemove {
    pub sender: EventSender,
    pub target_remote_message_id: RemoteMessageId,
}

#[async_trait]
impl RemoteReactionRemove for FakeRemoteReactionRemove {
    fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    fn target_remote_message_id(&self) -> RemoteMessageId {
        self.target_remote_message_id.clone()
    }
}

pub struct FakeRemoteMessageRemove {
    pub sender: EventSender,
    pub target_remote_message_id: RemoteMessageId,
}

#[async_trait]
impl RemoteMessageRemove for FakeRemoteMessageRemove {
    fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    fn target_remote_message_id(&self) -> RemoteMessageId {
        self.target_remote_message_id.clone()
    }
}

pub struct FakeRemoteReadReceipt {
    pub sender: EventSender,
    pub target: RemoteMessageId,
}

#[async_trait]
impl RemoteReadReceipt for FakeRemoteReadReceipt {
    fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn last_receipt_target(&self) -> Option<RemoteMessageId> {
        Some(self.target.clone())
    }

    fn receipt_targets(&self) -> Vec<ReceiptTarget> {
        vec![ReceiptTarget { remote_message_id: self.target.clone(), timestamp: Utc::now() }]
    }
}

pub struct FakeRemoteMarkUnread {
    pub sender: EventSender,
    pub unread: bool,
}

#[async_trait]
impl RemoteMarkUnread for FakeRemoteMarkUnread {
    fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    fn unread(&self) -> bool {
        self.unread
    }
}

pub struct FakeRemoteChatTag {
    pub sender: EventSender,
    pub tag: String,
    pub tagged: bool,
}

#[async_trait]
impl RemoteChatTag for FakeRemoteChatTag {
    fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    fn tag(&self) -> String {
        self.tag.clone()
    }

    fn tagged(&self) -> bool {
        self.tagged
    }
}

pub struct FakeRemoteChatMute {
    pub sender: EventSender,
    pub muted: bool,
}

#[async_trait]
impl RemoteChatMute for FakeRemoteChatMute {
    fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    fn muted(&self) -> bool {
        self.muted
    }
}
