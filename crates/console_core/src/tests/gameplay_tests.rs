use super::*;
use std::sync::Arc;

use crate::{
    frames::GIF_SIZE,
    test_support::{CountingFrames, FakeSigner, PLAYER, RULE_ID},
    wallet::wallet_channel,
    WalletFeed,
};

fn rule(score_function: &str) -> RuleInfo {
    serde_json::from_value(serde_json::json!({
        "id": RULE_ID,
        "name": "contest",
        "cartridge_id": "cafe",
        "score_function": score_function,
    }))
    .expect("rule")
}

fn begin() -> RunBegin {
    RunBegin {
        width: 256,
        height: 256,
        target_fps: 60,
        total_frames: 3600,
        info: Vec::new(),
    }
}

fn finish(outcard: &[u8]) -> RunFinish {
    RunFinish {
        log: vec![1, 2, 3],
        outcard: outcard.to_vec(),
        outhash: "ab".repeat(32),
    }
}

fn connected_session(score_function: &str) -> (GameplaySession, WalletFeed, CountingFrames) {
    let (feed, wallet) = wallet_channel();
    feed.connect(Arc::new(FakeSigner::new()));
    let frames = CountingFrames::default();
    let session = GameplaySession::new(
        &rule(score_function),
        Box::new(frames.clone()),
        GameplayStore::new(),
        wallet,
    );
    (session, feed, frames)
}

#[test]
fn json_outcard_scores_live_and_final() {
    let (mut session, _feed, _frames) = connected_session("score");
    let outcard = br#"JSON{"score":42}"#;

    session.on_begin(&begin()).expect("begin");
    session.on_frame(&FrameTick::new(outcard.to_vec(), 1, 60));
    assert_eq!(session.live_score(), Some(42));

    let record = session.on_finish(finish(outcard)).expect("finish");
    assert_eq!(record.score, Some(42));
    assert_eq!(record.outcard.value, outcard.to_vec());
    assert_eq!(record.rule_id.as_str(), RULE_ID);
    assert_eq!(record.cartridge_id.as_str(), "cafe");
    assert_eq!(session.store().player().map(|p| p.0), Some(PLAYER.to_string()));
}

#[test]
fn outcard_without_marker_leaves_score_undefined() {
    let (mut session, _feed, _frames) = connected_session("score");

    session.on_begin(&begin()).expect("begin");
    session.on_frame(&FrameTick::new(br#"{"score":42}"#.to_vec(), 1, 60));
    assert_eq!(session.live_score(), None);

    let record = session.on_finish(finish(br#"{"score":42}"#)).expect("finish");
    assert_eq!(record.score, None);
    assert_eq!(*session.last_outcome(), ScoreOutcome::NoJsonMarker);
    assert_eq!(chain::verify_payload(&record).claimed_score, 0);
}

#[test]
fn malformed_live_output_does_not_abort_the_run() {
    let (mut session, _feed, _frames) = connected_session("score");

    session.on_begin(&begin()).expect("begin");
    session.on_frame(&FrameTick::new(b"JSON{oops".to_vec(), 1, 60));
    assert_eq!(session.live_score(), None);
    assert!(matches!(session.last_outcome(), ScoreOutcome::Malformed(_)));

    session.on_frame(&FrameTick::new(br#"JSON{"score":3}"#.to_vec(), 2, 60));
    assert_eq!(session.live_score(), Some(3));
}

#[test]
fn frames_are_sampled_every_quarter_second_and_capped() {
    let (mut session, _feed, frames) = connected_session("");
    session.on_begin(&begin()).expect("begin");

    for frame in 0..60 {
        session.on_frame(&FrameTick::new(Vec::new(), frame, 60));
    }
    assert_eq!(*frames.captures.lock().expect("captures"), 4);

    for frame in 60..(60 * 10) {
        session.on_frame(&FrameTick::new(Vec::new(), frame, 60));
    }
    let preview = session.gif_parameters().expect("preview");
    assert_eq!((preview.width, preview.height), (256, 256));
    assert_eq!(preview.frames.len(), GIF_SIZE);
    // 40 captures total; the 20 most recent remain, oldest first
    let first = EncodedFrame::from_capture(&crate::CapturedFrame {
        mime_type: "image/png".into(),
        bytes: 21u32.to_be_bytes().to_vec(),
    });
    assert_eq!(preview.frames[0], first);
}

#[test]
fn preview_is_unavailable_before_resolution_or_frames() {
    let (mut session, _feed, frames) = connected_session("");

    session.on_frame(&FrameTick::new(Vec::new(), 0, 60));
    assert_eq!(*frames.captures.lock().expect("captures"), 0);
    assert_eq!(
        session.gif_parameters(),
        Err(PreviewUnavailable::NoResolution)
    );

    session.on_begin(&begin()).expect("begin");
    assert_eq!(session.gif_parameters(), Err(PreviewUnavailable::NoFrames));
}

#[test]
fn no_score_function_keeps_score_undefined() {
    let (mut session, _feed, _frames) = connected_session("");
    session.on_begin(&begin()).expect("begin");
    let record = session
        .on_finish(finish(br#"JSON{"score":42}"#))
        .expect("finish");
    assert_eq!(record.score, None);
    assert_eq!(*session.last_outcome(), ScoreOutcome::NotConfigured);
}

#[test]
fn begin_without_wallet_fails_fast() {
    let (feed, wallet) = wallet_channel();
    let mut session = GameplaySession::new(
        &rule("score"),
        Box::new(CountingFrames::default()),
        GameplayStore::new(),
        wallet,
    );
    assert_eq!(
        session.on_begin(&begin()),
        Err(SessionError::WalletNotConnected)
    );
    assert_eq!(
        session.on_finish(finish(b"")).map(|_| ()),
        Err(SessionError::WalletNotConnected)
    );
    drop(feed);
}

#[test]
fn finish_after_wallet_disconnect_fails_fast() {
    let (mut session, feed, _frames) = connected_session("score");
    session.on_begin(&begin()).expect("begin");
    feed.disconnect();

    assert_eq!(
        session
            .on_finish(finish(br#"JSON{"score":42}"#))
            .map(|_| ()),
        Err(SessionError::WalletNotConnected)
    );
    assert!(session.store().current().is_none());
}

#[test]
fn published_record_is_stable_until_cleared() {
    let (mut session, _feed, _frames) = connected_session("score");
    session.on_begin(&begin()).expect("begin");
    let record = session
        .on_finish(finish(br#"JSON{"score":1}"#))
        .expect("finish");

    let store = session.store().clone();
    let first = store.current().expect("record");
    let second = store.current().expect("record");
    assert!(Arc::ptr_eq(&first, &record));
    assert!(Arc::ptr_eq(&first, &second));

    store.clear();
    assert!(store.current().is_none());
    assert!(store.player().is_none());
}

#[test]
fn new_run_replaces_rather_than_mutates() {
    let (mut session, _feed, _frames) = connected_session("score");
    session.on_begin(&begin()).expect("begin");
    let first = session
        .on_finish(finish(br#"JSON{"score":1}"#))
        .expect("first");

    session.on_begin(&begin()).expect("second begin");
    assert!(session.store().current().is_none());
    let second = session
        .on_finish(finish(br#"JSON{"score":2}"#))
        .expect("second");

    assert_eq!(first.score, Some(1));
    assert_eq!(second.score, Some(2));
    assert!(!Arc::ptr_eq(&first, &second));
}
