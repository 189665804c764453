//! Room-side event handling (spec §4.5): translating events that already
//! happened in the room into calls on the network collaborator.

mod common;

use chrono::Utc;
use common::build_env;
use portal_core::capabilities::{Capabilities, ClientCapabilities, RoomCapabilities};
use portal_core::error::StatusKind;
use portal_core::ids::{LocalUserId, LoginId, PortalKey, RoomEventId, RoomId, RoomUserId};
use portal_core::model::NetworkLogin;
use portal_core::room_event::{
    MessageContent, RelatesTo, RoomEvent, RoomMessageEvent, RoomReactionEvent, RoomReceiptEvent,
    RoomRedactionEvent, RoomTypingEvent,
};

fn full_caps() -> Capabilities {
    Capabilities {
        client: ClientCapabilities {
            edit: true,
            reaction: true,
            redaction: true,
            read_receipt: true,
            typing: true,
        },
        room: RoomCapabilities {
            captions: false,
            location_messages: false,
            edits: true,
            threads: true,
            replies: true,
            max_reactions: 0,
            edit_max_age: None,
            edit_max_count: None,
        },
    }
}

fn message_event(room_id: &RoomId, event_id: &str, sender: &RoomUserId, content: MessageContent) -> RoomMessageEvent {
    RoomMessageEvent {
        event_id: RoomEventId(event_id.to_string()),
        room_id: room_id.clone(),
        sender: sender.clone(),
        timestamp: Utc::now(),
        content,
        relates_to: RelatesTo::default(),
    }
}

// --- Messages ---

#[tokio::test]
async fn test_handle_message_forwards_to_network_and_reports_success() {
    let env = build_env(full_caps());
    env.login_cache.add_login(NetworkLogin {
        login_id: LoginId("login1".into()),
        user_id: LocalUserId("alice".into()),
        connected: true,
        has_double_puppet: false,
    });

    let key = PortalKey::shared("chat1");
    let actor = env.bridge.registry.get_by_key(&env.bridge, &key, true).await.unwrap().unwrap();
    let room_id = RoomId("!room:test".into());
    let sender = RoomUserId("@alice:test".into());
    let msg = message_event(&room_id, "$m1", &sender, MessageContent::Text("hi".into()));

    portal_core::room_handler::handle_room_event(&env.bridge, &actor, &LocalUserId("alice".into()), RoomEvent::Message(msg))
        .await
        .unwrap();

    assert_eq!(env.network_api.handled_messages.lock().unwrap().len(), 1);
    let statuses = env.matrix_api.statuses.lock().unwrap();
    assert_eq!(statuses.len(), 1);
    assert!(matches!(statuses[0].1.kind, StatusKind::Success));

    let row = env
        .bridge
        .message_store
        .get_by_mxid(&RoomEventId("$m1".into()))
        .await
        .unwrap()
        .expect("message row inserted");
    assert_eq!(row.sender_room_user_id, Some(sender));
}

#[tokio::test]
async fn test_handle_message_rejects_caption_without_capability() {
    let mut caps = full_caps();
    caps.room.captions = false;
    let env = build_env(caps);
    env.login_cache.add_login(NetworkLogin {
        login_id: LoginId("login1".into()),
        user_id: LocalUserId("alice".into()),
        connected: true,
        has_double_puppet: false,
    });

    let key = PortalKey::shared("chat1");
    let actor = env.bridge.registry.get_by_key(&env.bridge, &key, true).await.unwrap().unwrap();
    let room_id = RoomId("!room:test".into());
    let sender = RoomUserId("@alice:test".into());
    let msg = message_event(
        &room_id,
        "$m1",
        &sender,
        MessageContent::Caption { body: "pic".into(), media_url: "mxc://x".into() },
    );

    portal_core::room_handler::handle_room_event(&env.bridge, &actor, &LocalUserId("alice".into()), RoomEvent::Message(msg))
        .await
        .unwrap();

    assert!(env.network_api.handled_messages.lock().unwrap().is_empty());
    let statuses = env.matrix_api.statuses.lock().unwrap();
    assert!(matches!(statuses[0].1.kind, StatusKind::Fail));
    assert_eq!(statuses[0].1.reason, Some("CaptionsNotAllowed"));
}

#[tokio::test]
async fn test_handle_message_fails_without_a_logged_in_user() {
    let env = build_env(full_caps());
    let key = PortalKey::shared("chat1");
    let actor = env.bridge.registry.get_by_key(&env.bridge, &key, true).await.unwrap().unwrap();
    let room_id = RoomId("!room:test".into());
    let sender = RoomUserId("@alice:test".into());
    let msg = message_event(&room_id, "$m1", &sender, MessageContent::Text("hi".into()));

    portal_core::room_handler::handle_room_event(&env.bridge, &actor, &LocalUserId("alice".into()), RoomEvent::Message(msg))
        .await
        .unwrap();

    let statuses = env.matrix_api.statuses.lock().unwrap();
    assert_eq!(statuses[0].1.reason, Some("NotLoggedIn"));
}

// --- Edits ---

#[tokio::test]
async fn test_handle_edit_updates_edit_count() {
    let env = build_env(full_caps());
    env.login_cache.add_login(NetworkLogin {
        login_id: LoginId("login1".into()),
        user_id: LocalUserId("alice".into()),
        connected: true,
        has_double_puppet: false,
    });
    let key = PortalKey::shared("chat1");
    let actor = env.bridge.registry.get_by_key(&env.bridge, &key, true).await.unwrap().unwrap();
    let room_id = RoomId("!room:test".into());
    let sender = RoomUserId("@alice:test".into());
    let user = LocalUserId("alice".into());

    let original = message_event(&room_id, "$m1", &sender, MessageContent::Text("original".into()));
    portal_core::room_handler::handle_room_event(&env.bridge, &actor, &user, RoomEvent::Message(original))
        .await
        .unwrap();

    let mut edit = message_event(&room_id, "$m2", &sender, MessageContent::Text("edited".into()));
    edit.relates_to.replaces = Some(RoomEventId("$m1".into()));
    portal_core::room_handler::handle_room_event(&env.bridge, &actor, &user, RoomEvent::Message(edit))
        .await
        .unwrap();

    assert_eq!(env.network_api.handled_edits.lock().unwrap().len(), 1);
    let row = env.bridge.message_store.get_by_mxid(&RoomEventId("$m1".into())).await.unwrap().unwrap();
    assert_eq!(row.edit_count, 1);
}

// --- Reactions ---

#[tokio::test]
async fn test_handle_reaction_happy_path() {
    let env = build_env(full_caps());
    env.login_cache.add_login(NetworkLogin {
        login_id: LoginId("login1".into()),
        user_id: LocalUserId("alice".into()),
        connected: true,
        has_double_puppet: false,
    });
    let key = PortalKey::shared("chat1");
    let actor = env.bridge.registry.get_by_key(&env.bridge, &key, true).await.unwrap().unwrap();
    let room_id = RoomId("!room:test".into());
    let sender = RoomUserId("@alice:test".into());
    let user = LocalUserId("alice".into());

    let original = message_event(&room_id, "$m1", &sender, MessageContent::Text("hi".into()));
    portal_core::room_handler::handle_room_event(&env.bridge, &actor, &user, RoomEvent::Message(original))
        .await
        .unwrap();

    let reaction = RoomReactionEvent {
        event_id: RoomEventId("$r1".into()),
        room_id: room_id.clone(),
        sender: sender.clone(),
        timestamp: Utc::now(),
        target_event_id: RoomEventId("$m1".into()),
        emoji: "👍".into(),
        from_relay: false,
    };
    portal_core::room_handler::handle_room_event(&env.bridge, &actor, &user, RoomEvent::Reaction(reaction))
        .await
        .unwrap();

    assert_eq!(env.network_api.handled_reactions.lock().unwrap().len(), 1);
    let statuses = env.matrix_api.statuses.lock().unwrap();
    assert!(matches!(statuses.last().unwrap().1.kind, StatusKind::Success));
}

#[tokio::test]
async fn test_handle_reaction_from_relay_is_forbidden() {
    let env = build_env(full_caps());
    env.login_cache.add_login(NetworkLogin {
        login_id: LoginId("login1".into()),
        user_id: LocalUserId("alice".into()),
        connected: true,
        has_double_puppet: false,
    });
    let key = PortalKey::shared("chat1");
    let actor = env.bridge.registry.get_by_key(&env.bridge, &key, true).await.unwrap().unwrap();
    let room_id = RoomId("!room:test".into());
    let sender = RoomUserId("@alice:test".into());
    let user = LocalUserId("alice".into());

    let reaction = RoomReactionEvent {
        event_id: RoomEventId("$r1".into()),
        room_id,
        sender,
        timestamp: Utc::now(),
        target_event_id: RoomEventId("$m1".into()),
        emoji: "👍".into(),
        from_relay: true,
    };
    portal_core::room_handler::handle_room_event(&env.bridge, &actor, &user, RoomEvent::Reaction(reaction))
        .await
        .unwrap();

    assert!(env.network_api.handled_reactions.lock().unwrap().is_empty());
    let statuses = env.matrix_api.statuses.lock().unwrap();
    assert_eq!(statuses[0].1.reason, Some("RelayedReactionForbidden"));
}

// --- Redactions ---

#[tokio::test]
async fn test_handle_redaction_removes_message() {
    let env = build_env(full_caps());
    env.login_cache.add_login(NetworkLogin {
        login_id: LoginId("login1".into()),
        user_id: LocalUserId("alice".into()),
        connected: true,
        has_double_puppet: false,
    });
    let key = PortalKey::shared("chat1");
    let actor = env.bridge.registry.get_by_key(&env.bridge, &key, true).await.unwrap().unwrap();
    let room_id = RoomId("!room:test".into());
    let sender = RoomUserId("@alice:test".into());
    let user = LocalUserId("alice".into());

    let original = message_event(&room_id, "$m1", &sender, MessageContent::Text("hi".into()));
    portal_core::room_handler::handle_room_event(&env.bridge, &actor, &user, RoomEvent::Message(original))
        .await
        .unwrap();

    let redaction = RoomRedactionEvent {
        event_id: RoomEventId("$red1".into()),
        room_id,
        sender,
        timestamp: Utc::now(),
        target_event_id: RoomEventId("$m1".into()),
    };
    portal_core::room_handler::handle_room_event(&env.bridge, &actor, &user, RoomEvent::Redaction(redaction))
        .await
        .unwrap();

    assert_eq!(env.network_api.handled_message_removes.lock().unwrap().len(), 1);
    assert!(env
        .bridge
        .message_store
        .get_by_mxid(&RoomEventId("$m1".into()))
        .await
        .unwrap()
        .is_none());
}

// --- Typing ---

#[tokio::test]
async fn test_handle_typing_only_sends_on_transition() {
    let env = build_env(full_caps());
    env.login_cache.add_login(NetworkLogin {
        login_id: LoginId("login1".into()),
        user_id: LocalUserId("alice".into()),
        connected: true,
        has_double_puppet: false,
    });
    let room_user = RoomUserId("@alice:test".into());
    env.login_cache.map_room_user(room_user.clone(), LocalUserId("alice".into()));

    let key = PortalKey::shared("chat1");
    let actor = env.bridge.registry.get_by_key(&env.bridge, &key, true).await.unwrap().unwrap();
    let room_id = RoomId("!room:test".into());

    let typing_on = RoomTypingEvent { room_id: room_id.clone(), user_ids: vec![room_user.clone()] };
    portal_core::room_handler::handle_room_event(&env.bridge, &actor, &LocalUserId("alice".into()), RoomEvent::Typing(typing_on.clone()))
        .await
        .unwrap();
    // Repeat of the same state: no new transition.
    portal_core::room_handler::handle_room_event(&env.bridge, &actor, &LocalUserId("alice".into()), RoomEvent::Typing(typing_on))
        .await
        .unwrap();

    assert_eq!(env.network_api.handled_typing.lock().unwrap().len(), 1);
    assert!(env.network_api.handled_typing.lock().unwrap()[0].2);

    let typing_off = RoomTypingEvent { room_id, user_ids: vec![] };
    portal_core::room_handler::handle_room_event(&env.bridge, &actor, &LocalUserId("alice".into()), RoomEvent::Typing(typing_off))
        .await
        .unwrap();
    // Stopping typing doesn't re-announce through the network client.
    assert_eq!(env.network_api.handled_typing.lock().unwrap().len(), 1);
}

// --- Read receipts ---

#[tokio::test]
async fn test_handle_read_receipt_kicks_sweeper() {
    let env = build_env(full_caps());
    env.login_cache.add_login(NetworkLogin {
        login_id: LoginId("login1".into()),
        user_id: LocalUserId("alice".into()),
        connected: true,
        has_double_puppet: false,
    });
    let key = PortalKey::shared("chat1");
    let actor = env.bridge.registry.get_by_key(&env.bridge, &key, true).await.unwrap().unwrap();
    let room_id = RoomId("!room:test".into());
    let sender = RoomUserId("@alice:test".into());
    let user = LocalUserId("alice".into());

    let original = message_event(&room_id, "$m1", &sender, MessageContent::Text("hi".into()));
    portal_core::room_handler::handle_room_event(&env.bridge, &actor, &user, RoomEvent::Message(original))
        .await
        .unwrap();

    let receipt = RoomReceiptEvent {
        room_id: room_id.clone(),
        sender,
        event_id: Some(RoomEventId("$m1".into())),
        timestamp: Utc::now(),
    };
    portal_core::room_handler::handle_room_event(&env.bridge, &actor, &user, RoomEvent::Receipt(receipt))
        .await
        .unwrap();

    assert_eq!(env.network_api.handled_read_receipts.lock().unwrap().len(), 1);
    assert_eq!(*env.sweeper.kicked.lock().unwrap(), vec![room_id]);
}
