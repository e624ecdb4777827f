//! Chat, polls, gifts, analytics and signaling through the hub
//!
//! Run with: cargo test -p livehub-api --test interaction_tests

mod common;

use common::{Client, Harness, ROOM, STREAMER};
use chrono::{Duration, Utc};
use livehub_core::models::{NewPoll, PollView, UserId};
use livehub_core::repository::HubStore;
use livehub_session::{ErrorCode, ServerEvent};
use serde_json::json;

/// A streamer and one signed-in viewer, both seated in the test room
async fn seated() -> (Harness, Client, Client) {
    let harness = Harness::new();
    let mut streamer = harness.connect();
    let mut viewer = harness.connect();
    harness.join(&mut streamer, STREAMER, ROOM).await;
    harness.join(&mut viewer, "viewer", ROOM).await;
    streamer.drain();
    (harness, streamer, viewer)
}

fn error_code(event: ServerEvent) -> ErrorCode {
    match event {
        ServerEvent::Error { code, .. } => code,
        other => panic!("expected an error event, got {other:?}"),
    }
}

fn poll_of(event: ServerEvent) -> PollView {
    match event {
        ServerEvent::PollCreated { poll }
        | ServerEvent::PollUpdated { poll }
        | ServerEvent::PollEnded { poll } => poll,
        other => panic!("expected a poll event, got {other:?}"),
    }
}

async fn create_poll(harness: &Harness, streamer: &mut Client, multiple: bool) -> PollView {
    harness
        .send(
            streamer,
            json!({
                "type": "create_poll",
                "question": "Next game?",
                "options": ["A", "B"],
                "allowMultipleVotes": multiple,
            }),
        )
        .await;
    poll_of(streamer.next())
}

#[tokio::test]
async fn test_chat_reaches_everyone_including_sender() {
    let (harness, mut streamer, mut viewer) = seated().await;

    harness
        .send(&viewer, json!({"type": "chat_message", "text": "  hello  "}))
        .await;

    for client in [&mut streamer, &mut viewer] {
        match client.next() {
            ServerEvent::ChatMessage {
                user_id, message, ..
            } => {
                assert_eq!(user_id.as_str(), "viewer");
                assert_eq!(message, "hello");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert_eq!(harness.store.inner.chat_messages(&Harness::room()).len(), 1);
}

#[tokio::test]
async fn test_empty_chat_is_dropped() {
    let (harness, mut streamer, mut viewer) = seated().await;
    let writes = harness.store.writes();

    harness
        .send(&viewer, json!({"type": "chat_message", "text": ""}))
        .await;
    harness
        .send(&viewer, json!({"type": "chat_message", "text": "   "}))
        .await;

    assert!(streamer.is_idle());
    assert!(viewer.is_idle());
    assert_eq!(harness.store.writes(), writes);
}

#[tokio::test]
async fn test_overlong_chat_is_rejected() {
    let (harness, mut streamer, mut viewer) = seated().await;

    harness
        .send(
            &viewer,
            json!({"type": "chat_message", "text": "x".repeat(2001)}),
        )
        .await;

    assert_eq!(error_code(viewer.next()), ErrorCode::Validation);
    assert!(streamer.is_idle());
}

#[tokio::test]
async fn test_chat_requires_a_room() {
    let harness = Harness::new();
    let mut client = harness.connect();
    harness
        .send(&client, json!({"type": "authenticate", "token": "viewer"}))
        .await;
    client.drain();

    harness
        .send(&client, json!({"type": "chat_message", "text": "hi"}))
        .await;
    match client.next() {
        ServerEvent::Error { code, message } => {
            assert_eq!(code, ErrorCode::NotInRoom);
            assert_eq!(message, "Not in a stream");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_chat_storage_failure_is_advisory() {
    let (harness, mut streamer, mut viewer) = seated().await;
    harness.store.fail_writes(true);

    harness
        .send(&viewer, json!({"type": "chat_message", "text": "hello"}))
        .await;

    assert!(matches!(streamer.next(), ServerEvent::ChatMessage { .. }));
    assert!(streamer.is_idle());
    assert!(matches!(viewer.next(), ServerEvent::ChatMessage { .. }));
    assert_eq!(error_code(viewer.next()), ErrorCode::Storage);
}

#[tokio::test]
async fn test_reaction_add_then_remove_round_trips() {
    let (harness, mut streamer, mut viewer) = seated().await;
    let reaction = |action: &str| {
        json!({
            "type": "chat_reaction",
            "messageId": "msg-1",
            "emoji": "🔥",
            "action": action,
        })
    };

    harness.send(&viewer, reaction("add")).await;
    match streamer.next() {
        ServerEvent::ChatReactionUpdate {
            message_id,
            reactions,
        } => {
            assert_eq!(message_id, "msg-1");
            assert_eq!(reactions.len(), 1);
            assert_eq!(reactions[0].emoji, "🔥");
            assert_eq!(reactions[0].count, 1);
            assert_eq!(reactions[0].users[0].user_id.as_str(), "viewer");
        }
        other => panic!("unexpected event: {other:?}"),
    }
    viewer.drain();

    harness.send(&viewer, reaction("remove")).await;
    match streamer.next() {
        ServerEvent::ChatReactionUpdate { reactions, .. } => assert!(reactions.is_empty()),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_unsupported_reaction_is_rejected() {
    let (harness, mut streamer, mut viewer) = seated().await;

    harness
        .send(
            &viewer,
            json!({"type": "chat_reaction", "messageId": "msg-1", "emoji": "🦀", "action": "add"}),
        )
        .await;

    assert_eq!(error_code(viewer.next()), ErrorCode::Validation);
    assert!(streamer.is_idle());
}

#[tokio::test]
async fn test_single_choice_vote_moves_between_options() {
    let (harness, mut streamer, mut viewer) = seated().await;
    let poll = create_poll(&harness, &mut streamer, false).await;
    viewer.drain();
    let (first, second) = (poll.options[0].id.clone(), poll.options[1].id.clone());

    harness
        .send(
            &viewer,
            json!({"type": "vote_poll", "pollId": poll.id, "optionIds": [first]}),
        )
        .await;
    harness
        .send(
            &viewer,
            json!({"type": "vote_poll", "pollId": poll.id, "optionIds": [second]}),
        )
        .await;

    let updated = poll_of(streamer.next());
    assert_eq!(updated.total_votes, 1);
    let updated = poll_of(streamer.next());
    assert_eq!(updated.options[0].votes, 0);
    assert_eq!(updated.options[1].votes, 1);
    assert_eq!(updated.total_votes, 1);

    let holders = updated
        .options
        .iter()
        .filter(|option| option.voters.iter().any(|v| v.as_str() == "viewer"))
        .count();
    assert_eq!(holders, 1);

    let active = harness.hub.active_poll(&Harness::room()).unwrap();
    assert_eq!(active.total_votes, 1);
    let stored = harness.store.inner.poll(&poll.id).unwrap();
    assert_eq!(stored.total_votes, 1);
}

#[tokio::test]
async fn test_vote_reply_lists_counted_options() {
    let (harness, mut streamer, mut viewer) = seated().await;
    let poll = create_poll(&harness, &mut streamer, true).await;
    viewer.drain();

    harness
        .send(
            &viewer,
            json!({"type": "vote_poll", "pollId": poll.id, "optionIds": ["option_1", "option_2", "nope"]}),
        )
        .await;

    let updated = poll_of(viewer.next());
    let option_votes: u32 = updated.options.iter().map(|option| option.votes).sum();
    assert_eq!(updated.total_votes, option_votes);
    assert_eq!(updated.total_votes, 2);
    match viewer.next() {
        ServerEvent::VoteRecorded {
            voted_option_ids, ..
        } => assert_eq!(voted_option_ids, vec!["option_1", "option_2"]),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_vote_on_unknown_poll() {
    let (harness, _streamer, mut viewer) = seated().await;

    harness
        .send(
            &viewer,
            json!({"type": "vote_poll", "pollId": "missing", "optionIds": ["option_1"]}),
        )
        .await;

    assert_eq!(error_code(viewer.next()), ErrorCode::PollNotFound);
}

#[tokio::test]
async fn test_only_streamer_manages_polls() {
    let (harness, mut streamer, mut viewer) = seated().await;

    harness
        .send(
            &viewer,
            json!({"type": "create_poll", "question": "Q", "options": ["A", "B"]}),
        )
        .await;
    match viewer.next() {
        ServerEvent::Error { code, message } => {
            assert_eq!(code, ErrorCode::NotStreamer);
            assert_eq!(message, "Only streamers can create polls");
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(streamer.is_idle());
}

#[tokio::test]
async fn test_poll_needs_two_options() {
    let (harness, mut streamer, _viewer) = seated().await;

    harness
        .send(
            &streamer,
            json!({"type": "create_poll", "question": "Q", "options": ["only"]}),
        )
        .await;

    assert_eq!(error_code(streamer.next()), ErrorCode::Validation);
}

#[tokio::test]
async fn test_ended_poll_reveals_results() {
    let (harness, mut streamer, mut viewer) = seated().await;
    let poll = create_poll(&harness, &mut streamer, false).await;
    assert!(poll.expires_at.is_none());
    viewer.drain();

    harness
        .send(&streamer, json!({"type": "end_poll", "pollId": poll.id}))
        .await;

    for client in [&mut streamer, &mut viewer] {
        let ended = match client.next() {
            ServerEvent::PollEnded { poll } => poll,
            other => panic!("unexpected event: {other:?}"),
        };
        assert!(ended.show_results);
        assert!(!ended.is_active);
    }
    assert!(harness.hub.active_poll(&Harness::room()).is_none());
    assert!(!harness.store.inner.poll(&poll.id).unwrap().is_active);

    harness
        .send(
            &viewer,
            json!({"type": "vote_poll", "pollId": poll.id, "optionIds": ["option_1"]}),
        )
        .await;
    assert_eq!(error_code(viewer.next()), ErrorCode::PollNotFound);
}

#[tokio::test]
async fn test_new_poll_replaces_active_one() {
    let (harness, mut streamer, _viewer) = seated().await;
    let first = create_poll(&harness, &mut streamer, false).await;
    let second = create_poll(&harness, &mut streamer, false).await;

    assert!(!harness.store.inner.poll(&first.id).unwrap().is_active);
    let active = harness.hub.active_poll(&Harness::room()).unwrap();
    assert_eq!(active.id, second.id);
}

#[tokio::test]
async fn test_votes_during_replacement_cannot_reopen_old_poll() {
    let (harness, mut streamer, mut viewer) = seated().await;
    let mut other = harness.connect();
    harness.join(&mut other, "other", ROOM).await;
    let first = create_poll(&harness, &mut streamer, false).await;
    streamer.drain();
    viewer.drain();
    other.drain();

    let gate = harness.store.hold_poll_deactivation();
    let replace = harness.send(
        &streamer,
        json!({"type": "create_poll", "question": "Again?", "options": ["C", "D"]}),
    );
    let vote_while_held = async {
        gate.reached.notified().await;
        for voter in [&viewer, &other] {
            harness
                .send(
                    voter,
                    json!({"type": "vote_poll", "pollId": first.id, "optionIds": ["option_1"]}),
                )
                .await;
        }
        gate.release.notify_one();
    };
    tokio::join!(replace, vote_while_held);

    assert_eq!(error_code(viewer.next()), ErrorCode::PollNotFound);
    assert_eq!(error_code(other.next()), ErrorCode::PollNotFound);

    let stored_first = harness.store.inner.poll(&first.id).unwrap();
    assert!(!stored_first.is_active);
    assert_eq!(stored_first.total_votes, 0);

    let second = poll_of(streamer.next());
    assert!(harness.store.inner.poll(&second.id).unwrap().is_active);
    assert_eq!(
        harness.hub.active_poll(&Harness::room()).unwrap().id,
        second.id
    );
}

#[tokio::test]
async fn test_vote_after_expiry_closes_poll_quietly() {
    let (harness, mut streamer, mut viewer) = seated().await;
    let mut poll = NewPoll {
        room_id: Harness::room(),
        creator_id: UserId::from(STREAMER),
        creator_username: "streamer-name".to_string(),
        question: "Quick one?".to_string(),
        options: vec!["A".to_string(), "B".to_string()],
        allow_multiple_votes: false,
        duration_seconds: Some(30),
    }
    .into_poll()
    .unwrap();
    poll.expires_at = Some(Utc::now() - Duration::seconds(1));
    harness.store.inner.create_poll(&poll).await.unwrap();

    harness
        .send(
            &viewer,
            json!({"type": "vote_poll", "pollId": poll.id, "optionIds": ["option_1"]}),
        )
        .await;

    assert_eq!(error_code(viewer.next()), ErrorCode::PollExpired);
    assert!(viewer.is_idle());
    assert!(streamer.is_idle());

    let stored = harness.store.inner.poll(&poll.id).unwrap();
    assert!(!stored.is_active);
    assert_eq!(stored.total_votes, 0);
    assert!(harness.hub.active_poll(&Harness::room()).is_none());
}

#[tokio::test]
async fn test_gift_reaches_room() {
    let (harness, mut streamer, mut viewer) = seated().await;

    harness
        .send(
            &viewer,
            json!({
                "type": "send_gift",
                "giftId": "heart",
                "amount": 3,
                "recipientId": STREAMER,
                "giftMessage": "gg",
            }),
        )
        .await;

    match streamer.next() {
        ServerEvent::GiftSent { gift } => {
            assert_eq!(gift.gift_type.id, "heart");
            assert_eq!(gift.amount, 3);
            assert_eq!(gift.total_value, gift.gift_type.price * 3);
            assert_eq!(gift.recipient_username, "streamer-name");
            assert_eq!(gift.message, "gg");
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(matches!(viewer.next(), ServerEvent::GiftSent { .. }));
    match viewer.next() {
        ServerEvent::GiftSentConfirmation { total_value, .. } => assert_eq!(total_value, 30),
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(harness.store.inner.gifts(&Harness::room()).len(), 1);
}

#[tokio::test]
async fn test_gift_amount_out_of_range() {
    let (harness, mut streamer, mut viewer) = seated().await;
    let writes = harness.store.writes();

    for amount in [json!(0), json!(101), json!(-1), json!(2.5)] {
        harness
            .send(
                &viewer,
                json!({"type": "send_gift", "giftId": "heart", "amount": amount, "recipientId": STREAMER}),
            )
            .await;
        assert_eq!(error_code(viewer.next()), ErrorCode::Validation);
    }

    assert!(streamer.is_idle());
    assert_eq!(harness.store.writes(), writes);
}

#[tokio::test]
async fn test_gift_to_absent_recipient() {
    let (harness, mut streamer, mut viewer) = seated().await;
    let writes = harness.store.writes();

    harness
        .send(
            &viewer,
            json!({"type": "send_gift", "giftId": "heart", "recipientId": "nobody"}),
        )
        .await;

    assert_eq!(error_code(viewer.next()), ErrorCode::RecipientNotFound);
    assert!(viewer.is_idle());
    assert!(streamer.is_idle());
    assert_eq!(harness.store.writes(), writes);
}

#[tokio::test]
async fn test_unknown_gift_type() {
    let (harness, _streamer, mut viewer) = seated().await;

    harness
        .send(
            &viewer,
            json!({"type": "send_gift", "giftId": "yacht", "recipientId": STREAMER}),
        )
        .await;

    assert_eq!(error_code(viewer.next()), ErrorCode::GiftTypeNotFound);
}

#[tokio::test]
async fn test_guests_cannot_send_gifts() {
    let (harness, mut streamer, _viewer) = seated().await;
    let mut guest = harness.connect();
    harness
        .send(&guest, json!({"type": "join_stream_guest", "streamId": ROOM}))
        .await;
    guest.drain();
    streamer.drain();

    harness
        .send(
            &guest,
            json!({"type": "send_gift", "giftId": "heart", "recipientId": STREAMER}),
        )
        .await;

    assert_eq!(error_code(guest.next()), ErrorCode::SignInRequired);
    assert!(streamer.is_idle());
}

#[tokio::test]
async fn test_gift_catalog() {
    let (harness, _streamer, mut viewer) = seated().await;

    harness.send(&viewer, json!({"type": "get_gift_types"})).await;

    match viewer.next() {
        ServerEvent::GiftTypes { gift_types } => {
            assert_eq!(gift_types.len(), 14);
            assert_eq!(gift_types[0].id, "heart");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_analytics_for_streamer_only() {
    let (harness, mut streamer, mut viewer) = seated().await;
    harness
        .send(&viewer, json!({"type": "chat_message", "text": "hi"}))
        .await;
    streamer.drain();
    viewer.drain();

    harness.send(&streamer, json!({"type": "get_analytics"})).await;
    match streamer.next() {
        ServerEvent::AnalyticsData { analytics } => {
            assert_eq!(analytics.current_viewers, 2);
            assert_eq!(analytics.counters.total_messages, 1);
            assert_eq!(analytics.counters.peak_viewers, 2);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    harness.send(&viewer, json!({"type": "get_analytics"})).await;
    assert_eq!(error_code(viewer.next()), ErrorCode::NotStreamer);
}

#[tokio::test]
async fn test_signaling_is_relayed_to_others() {
    let (harness, mut streamer, mut viewer) = seated().await;

    harness
        .send(
            &viewer,
            json!({
                "type": "webrtc_offer",
                "targetUserId": STREAMER,
                "sdp": {"type": "offer", "sdp": "v=0"},
                "fromUserId": "spoofed",
            }),
        )
        .await;

    let relayed = streamer.next_json();
    assert_eq!(relayed["type"], "webrtc_offer");
    assert_eq!(relayed["fromUserId"], "viewer");
    assert_eq!(relayed["fromUsername"], "viewer-name");
    assert_eq!(relayed["targetUserId"], STREAMER);
    assert_eq!(relayed["sdp"]["sdp"], "v=0");
    assert!(viewer.is_idle());
}

#[tokio::test]
async fn test_signaling_outside_a_room() {
    let harness = Harness::new();
    let mut client = harness.connect();
    harness
        .send(&client, json!({"type": "authenticate", "token": "viewer"}))
        .await;
    client.drain();

    harness
        .send(
            &client,
            json!({"type": "webrtc_ice_candidate", "targetUserId": STREAMER, "candidate": {}}),
        )
        .await;

    assert_eq!(error_code(client.next()), ErrorCode::NotInRoom);
}
