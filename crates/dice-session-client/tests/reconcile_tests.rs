// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
use std::sync::mpsc;

use dice_core::{Point2, Simulator};
use dice_session_client::tool::{ChannelSession, SessionPort};
use dice_session_client::{Reconciliation, Replica};
use dice_session_proto::{encode_server, AppearanceTable, ClientMessage, ServerMessage};
use serde_json::json;

const TAP: Point2 = Point2 { x: 0.25, y: 0.0 };

fn joined(authority: &Simulator) -> Replica {
    let mut replica = Replica::new("viewer-a", authority.len(), authority.walls());
    let outcome = replica
        .apply(ServerMessage::Init {
            state: authority.current_state(),
            appearance: AppearanceTable::new(authority.len()),
        })
        .expect("init");
    assert_eq!(outcome, Reconciliation::Initialized);
    replica
}

fn echo(authority: &Simulator, client_id: Option<&str>) -> ServerMessage {
    ServerMessage::Cubes {
        state: authority.current_state(),
        client_id: client_id.map(str::to_owned),
    }
}

#[test]
fn echo_of_same_frame_tap_is_confirmed() {
    let mut authority = Simulator::new(2, None);
    let mut replica = joined(&authority);

    let msg = replica.tap(TAP).expect("cube under tap");
    assert!(matches!(msg, ClientMessage::Tap { client_id: Some(ref id), .. } if id == "viewer-a"));
    authority.tap_position(TAP);

    let outcome = replica.apply(echo(&authority, Some("viewer-a"))).expect("apply");
    assert_eq!(outcome, Reconciliation::Confirmed { max_diff: 0.0 });
    assert!(!replica.has_pending_prediction());
}

#[test]
fn prediction_is_advanced_to_the_echo_frame() {
    let mut authority = Simulator::new(2, None);
    let mut replica = joined(&authority);
    replica.tap(TAP).expect("cube under tap");
    authority.tap_position(TAP);
    for _ in 0..12 {
        authority.update();
    }
    let outcome = replica.apply(echo(&authority, Some("viewer-a"))).expect("apply");
    assert_eq!(outcome, Reconciliation::Confirmed { max_diff: 0.0 });
}

#[test]
fn late_authority_tap_is_corrected_and_overwrites() {
    let mut authority = Simulator::new(2, None);
    let mut replica = joined(&authority);
    replica.tap(TAP).expect("cube under tap");
    for _ in 0..12 {
        authority.update();
    }
    authority.tap_position(TAP);

    let outcome = replica.apply(echo(&authority, Some("viewer-a"))).expect("apply");
    assert!(matches!(outcome, Reconciliation::Corrected { .. }));
    assert_eq!(replica.simulator().current_state(), authority.current_state());
}

#[test]
fn other_viewers_and_resyncs_are_foreign() {
    let mut authority = Simulator::new(2, None);
    let mut replica = joined(&authority);
    authority.tap_position(TAP);
    assert_eq!(
        replica.apply(echo(&authority, Some("viewer-b"))).expect("apply"),
        Reconciliation::Foreign
    );
    authority.update();
    assert_eq!(
        replica.apply(echo(&authority, None)).expect("apply"),
        Reconciliation::Foreign
    );
    assert_eq!(replica.simulator().current_state(), authority.current_state());
}

#[test]
fn init_adopts_the_hub_slot_count() {
    let authority = Simulator::new(3, None);
    let replica = {
        let mut r = Replica::new("viewer-a", 1, None);
        r.apply(ServerMessage::Init {
            state: authority.current_state(),
            appearance: AppearanceTable::new(3),
        })
        .expect("init");
        r
    };
    assert_eq!(replica.simulator().len(), 3);
    assert_eq!(replica.appearance().len(), 3);
}

#[test]
fn channel_session_feeds_the_replica() {
    let mut authority = Simulator::new(2, None);
    let mut replica = joined(&authority);
    let (in_tx, in_rx) = mpsc::channel();
    let (out_tx, out_rx) = mpsc::channel();
    let mut session = ChannelSession::new();
    session.set_channels(in_rx, out_tx);

    let msg = replica.set_appearance(1, Some(vec![json!("blue")]));
    assert!(session.send(&msg));
    let sent = out_rx.try_recv().expect("queued");
    assert!(sent.contains(r#""type":"update""#));

    authority.update();
    in_tx
        .send(encode_server(&echo(&authority, None)).expect("encode"))
        .expect("send");
    let outcomes = replica.sync_from(&mut session, 16);
    assert_eq!(outcomes, vec![Reconciliation::Foreign]);
    assert_eq!(replica.simulator().frame(), authority.frame());
}

#[test]
fn older_snapshot_after_newer_one_is_ignored() {
    let mut authority = Simulator::new(2, None);
    let mut replica = joined(&authority);
    authority.update();
    let older = echo(&authority, None);
    for _ in 0..5 {
        authority.update();
    }
    let newer = echo(&authority, None);

    assert_eq!(replica.apply(newer).expect("apply"), Reconciliation::Foreign);
    assert_eq!(
        replica.apply(older).expect("apply"),
        Reconciliation::Stale { frame: 1 }
    );
    assert_eq!(replica.simulator().current_state(), authority.current_state());
}

#[test]
fn same_frame_snapshots_are_both_applied() {
    let mut authority = Simulator::new(2, None);
    let mut replica = joined(&authority);
    authority.update();
    replica.apply(echo(&authority, None)).expect("apply");
    authority.hide(&[0]);
    assert_eq!(
        replica.apply(echo(&authority, None)).expect("apply"),
        Reconciliation::Foreign
    );
    assert!(replica.simulator().cube(0).expect("slot").is_hidden());
}

#[test]
fn loose_tolerance_accepts_a_late_authority_tap() {
    let mut authority = Simulator::new(2, None);
    let mut replica = joined(&authority).with_tolerance(f64::INFINITY);
    replica.tap(TAP).expect("cube under tap");
    for _ in 0..12 {
        authority.update();
    }
    authority.tap_position(TAP);

    let outcome = replica.apply(echo(&authority, Some("viewer-a"))).expect("apply");
    assert!(matches!(outcome, Reconciliation::Confirmed { .. }));
}
