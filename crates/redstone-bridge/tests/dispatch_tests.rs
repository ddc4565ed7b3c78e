//! Integration tests for event dispatch
//!
//! Runs every event kind through a [`Bridge`] backed by a recording mock
//! runtime and checks defaults, argument delivery, and the enter/scope
//! bracketing around each handler call.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p redstone-bridge --test dispatch_tests
//! ```

mod common;

use common::{harness, running, RuntimeCall};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use redstone_bridge::LifecycleState;
use redstone_sdk::{
    ActionResult, BlockBreakResult, BlockPos, EventKind, EventResult, InteractResult, ProxyTarget,
};

// ===== Defaults =====

#[test]
fn test_unregistered_events_return_defaults() {
    let h = running();
    let b = &h.bridge;

    assert_eq!(b.dispatch_block_break(BlockPos::new(1, 2, 3), 7), BlockBreakResult::Allow);
    assert_eq!(b.dispatch_block_interact(BlockPos::ORIGIN, 7, 0), InteractResult::Allow);
    assert!(b.dispatch_proxy_block_break(ProxyTarget::default(), 7));
    assert_eq!(b.dispatch_proxy_block_use(ProxyTarget::default(), 7, 0), ActionResult::Pass);
    assert!(b.dispatch_block_place(7, BlockPos::ORIGIN, "minecraft:stone"));
    b.dispatch_player_join(7);
    b.dispatch_player_leave(7);
    b.dispatch_player_respawn(7, false);
    assert!(b.dispatch_player_death(7, "fell").is_pass_through());
    assert!(b.dispatch_entity_damage(9, "lava", 4.0));
    b.dispatch_entity_death(9, "lava");
    assert!(b.dispatch_player_attack_entity(7, 9));
    assert!(b.dispatch_player_chat(7, "hello").is_pass_through());
    assert!(b.dispatch_player_command(7, "/help"));
    assert!(b.dispatch_item_use(7, "minecraft:apple", 1, 0));
    assert_eq!(
        b.dispatch_item_use_on_block(7, "minecraft:bone_meal", 3, 0, BlockPos::ORIGIN, 1),
        EventResult::Allow
    );
    assert_eq!(
        b.dispatch_item_use_on_entity(7, "minecraft:lead", 1, 1, 9),
        EventResult::Allow
    );
    assert!(b.dispatch_player_pickup_item(7, 42));
    assert!(b.dispatch_player_drop_item(7, "minecraft:dirt", 64));
    b.dispatch_server_starting();
    b.dispatch_server_started();
    b.dispatch_server_stopping();

    // Unregistered kinds never touch the runtime
    assert_eq!(h.runtime.call_count(), 0);

    // Tick is the exception: it always drains
    b.dispatch_tick(1);
    assert_eq!(
        h.runtime.calls(),
        vec![
            RuntimeCall::EnterIsolate,
            RuntimeCall::EnterScope,
            RuntimeCall::DrainMicrotasks,
            RuntimeCall::ExitScope,
            RuntimeCall::ExitIsolate,
        ]
    );
}

#[test]
fn test_dispatch_before_init_returns_default_without_calling_handler() {
    let h = harness();
    let called = Arc::new(AtomicUsize::new(0));
    let c = called.clone();
    h.bridge.registry().set_block_break(move |_, _| {
        c.fetch_add(1, Ordering::SeqCst);
        BlockBreakResult::Cancel
    });

    assert_eq!(h.bridge.state(), LifecycleState::Uninitialized);
    assert_eq!(
        h.bridge.dispatch_block_break(BlockPos::ORIGIN, 7),
        BlockBreakResult::Allow
    );
    assert_eq!(called.load(Ordering::SeqCst), 0);
    assert_eq!(h.runtime.call_count(), 0);
}

#[test]
fn test_cleared_registry_restores_defaults() {
    let h = running();
    h.bridge.registry().set_player_command(|_, _| false);
    h.bridge.registry().set_proxy_block_use(|_, _, _| ActionResult::Success);
    assert!(!h.bridge.dispatch_player_command(1, "/stop"));

    h.bridge.registry().clear();
    assert!(h.bridge.dispatch_player_command(1, "/stop"));
    assert_eq!(
        h.bridge.dispatch_proxy_block_use(ProxyTarget::default(), 1, 0),
        ActionResult::Pass
    );
}

// ===== Argument Delivery =====

#[test]
fn test_block_break_protects_origin() {
    let h = running();
    h.bridge.registry().set_block_break(|pos, _player| {
        if pos == BlockPos::ORIGIN {
            BlockBreakResult::Cancel
        } else {
            BlockBreakResult::Allow
        }
    });

    assert_eq!(
        h.bridge.dispatch_block_break(BlockPos::new(0, 0, 0), 7),
        BlockBreakResult::Cancel
    );
    assert_eq!(
        h.bridge.dispatch_block_break(BlockPos::new(1, 0, 0), 7),
        BlockBreakResult::Allow
    );
}

#[test]
fn test_chat_replacement_uppercases() {
    let h = running();
    h.bridge
        .registry()
        .set_player_chat(|_player, message: &str| message.to_uppercase().into());

    let text = h.bridge.dispatch_player_chat(3, "hello");
    assert_eq!(text.into_string().as_deref(), Some("HELLO"));
}

#[test]
fn test_chat_without_handler_passes_through() {
    let h = running();
    assert!(h.bridge.dispatch_player_chat(3, "hello").into_string().is_none());
}

#[test]
fn test_death_message_replacement() {
    let h = running();
    h.bridge.registry().set_player_death(|player_id, source: &str| {
        if source == "fall" {
            format!("player {player_id} forgot their wings").into()
        } else {
            None::<String>.into()
        }
    });

    assert_eq!(
        h.bridge.dispatch_player_death(5, "fall").into_string().as_deref(),
        Some("player 5 forgot their wings")
    );
    assert!(h.bridge.dispatch_player_death(5, "drown").is_pass_through());
}

#[test]
fn test_proxy_block_arguments() {
    let h = running();
    let seen = Arc::new(Mutex::new(None));
    let s = seen.clone();
    h.bridge.registry().set_proxy_block_use(move |target, player_id, hand| {
        *s.lock() = Some((target, player_id, hand));
        ActionResult::Consume
    });
    h.bridge
        .registry()
        .set_proxy_block_break(|target, _| target.handler_id != 99);

    let target = ProxyTarget::new(12, -3, BlockPos::new(10, 64, -20));
    assert_eq!(
        h.bridge.dispatch_proxy_block_use(target, 1001, 1),
        ActionResult::Consume
    );
    assert_eq!(*seen.lock(), Some((target, 1001, 1)));

    assert!(h.bridge.dispatch_proxy_block_break(target, 1001));
    assert!(!h
        .bridge
        .dispatch_proxy_block_break(ProxyTarget::new(99, 0, BlockPos::ORIGIN), 1001));
}

#[test]
fn test_item_events_arguments() {
    let h = running();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let s = seen.clone();
    h.bridge
        .registry()
        .set_item_use_on_block(move |player, item: &str, count, hand, pos, face| {
            s.lock()
                .push(format!("{player}:{item}:{count}:{hand}:{},{},{}:{face}", pos.x, pos.y, pos.z));
            EventResult::Deny
        });
    let s = seen.clone();
    h.bridge
        .registry()
        .set_item_use_on_entity(move |player, item: &str, count, hand, target| {
            s.lock().push(format!("{player}:{item}:{count}:{hand}:{target}"));
            EventResult::Allow
        });
    h.bridge
        .registry()
        .set_item_use(|_, item: &str, _, _| item != "minecraft:ender_pearl");
    h.bridge
        .registry()
        .set_player_drop_item(|_, item: &str, count| !(item == "minecraft:diamond" && count > 1));

    assert_eq!(
        h.bridge.dispatch_item_use_on_block(4, "minecraft:bone_meal", 2, 0, BlockPos::new(1, 2, 3), 5),
        EventResult::Deny
    );
    assert_eq!(
        h.bridge.dispatch_item_use_on_entity(4, "minecraft:name_tag", 1, 1, 88),
        EventResult::Allow
    );
    assert!(!h.bridge.dispatch_item_use(4, "minecraft:ender_pearl", 16, 0));
    assert!(h.bridge.dispatch_item_use(4, "minecraft:apple", 1, 0));
    assert!(!h.bridge.dispatch_player_drop_item(4, "minecraft:diamond", 2));
    assert!(h.bridge.dispatch_player_drop_item(4, "minecraft:diamond", 1));

    assert_eq!(
        *seen.lock(),
        vec![
            "4:minecraft:bone_meal:2:0:1,2,3:5".to_string(),
            "4:minecraft:name_tag:1:1:88".to_string(),
        ]
    );
}

#[test]
fn test_entity_and_player_events() {
    let h = running();
    let log = Arc::new(Mutex::new(Vec::new()));

    let l = log.clone();
    h.bridge.registry().set_player_join(move |id| l.lock().push(format!("join {id}")));
    let l = log.clone();
    h.bridge.registry().set_player_leave(move |id| l.lock().push(format!("leave {id}")));
    let l = log.clone();
    h.bridge
        .registry()
        .set_player_respawn(move |id, end| l.lock().push(format!("respawn {id} {end}")));
    let l = log.clone();
    h.bridge
        .registry()
        .set_entity_death(move |id, source: &str| l.lock().push(format!("death {id} {source}")));
    h.bridge
        .registry()
        .set_entity_damage(|_, source: &str, amount| source != "fire" || amount < 5.0);
    h.bridge
        .registry()
        .set_player_attack_entity(|player, target| player != target);
    h.bridge.registry().set_player_pickup_item(|_, item| item % 2 == 0);
    h.bridge
        .registry()
        .set_block_place(|_, pos, block: &str| !(block == "minecraft:tnt" && pos.y < 0));

    h.bridge.dispatch_player_join(1);
    h.bridge.dispatch_player_respawn(1, true);
    h.bridge.dispatch_entity_death(20, "arrow");
    h.bridge.dispatch_player_leave(1);

    assert!(h.bridge.dispatch_entity_damage(20, "fire", 2.5));
    assert!(!h.bridge.dispatch_entity_damage(20, "fire", 7.5));
    assert!(!h.bridge.dispatch_player_attack_entity(3, 3));
    assert!(h.bridge.dispatch_player_attack_entity(3, 4));
    assert!(h.bridge.dispatch_player_pickup_item(1, 10));
    assert!(!h.bridge.dispatch_player_pickup_item(1, 11));
    assert!(!h.bridge.dispatch_block_place(1, BlockPos::new(0, -5, 0), "minecraft:tnt"));
    assert!(h.bridge.dispatch_block_place(1, BlockPos::new(0, 5, 0), "minecraft:tnt"));

    assert_eq!(
        *log.lock(),
        vec!["join 1", "respawn 1 true", "death 20 arrow", "leave 1"]
    );
}

#[test]
fn test_server_lifecycle_events_in_order() {
    let h = running();
    let log = Arc::new(Mutex::new(Vec::new()));

    let l = log.clone();
    h.bridge.registry().set_server_starting(move || l.lock().push("starting"));
    let l = log.clone();
    h.bridge.registry().set_server_started(move || l.lock().push("started"));
    let l = log.clone();
    h.bridge.registry().set_server_stopping(move || l.lock().push("stopping"));

    h.bridge.dispatch_server_starting();
    h.bridge.dispatch_server_started();
    h.bridge.dispatch_server_stopping();

    assert_eq!(*log.lock(), vec!["starting", "started", "stopping"]);
}

#[test]
fn test_block_interact_hand() {
    let h = running();
    h.bridge.registry().set_block_interact(|_, _, hand| {
        if hand == 1 {
            InteractResult::Consume
        } else {
            InteractResult::Cancel
        }
    });

    assert_eq!(
        h.bridge.dispatch_block_interact(BlockPos::ORIGIN, 7, 1),
        InteractResult::Consume
    );
    assert_eq!(
        h.bridge.dispatch_block_interact(BlockPos::ORIGIN, 7, 0),
        InteractResult::Cancel
    );
}

// ===== Runtime Bracketing =====

#[test]
fn test_handler_runs_inside_isolate_and_scope() {
    let h = running();
    let runtime = h.runtime.clone();
    let observed = Arc::new(Mutex::new(Vec::new()));
    let o = observed.clone();
    h.bridge.registry().set_player_join(move |_| {
        *o.lock() = runtime.calls();
    });

    h.bridge.dispatch_player_join(1);

    assert_eq!(
        *observed.lock(),
        vec![RuntimeCall::EnterIsolate, RuntimeCall::EnterScope]
    );
    assert_eq!(
        h.runtime.calls(),
        vec![
            RuntimeCall::EnterIsolate,
            RuntimeCall::EnterScope,
            RuntimeCall::ExitScope,
            RuntimeCall::ExitIsolate,
        ]
    );
    assert!(!h.runtime.is_entered());
}

#[test]
fn test_tick_handler_drains_microtasks() {
    let h = running();
    let ticks = Arc::new(Mutex::new(Vec::new()));
    let t = ticks.clone();
    h.bridge.registry().set_tick(move |tick| t.lock().push(tick));

    h.bridge.dispatch_tick(100);
    h.bridge.dispatch_tick(101);

    assert_eq!(*ticks.lock(), vec![100, 101]);
    assert_eq!(h.runtime.count(&RuntimeCall::DrainMicrotasks), 2);
    assert_eq!(
        &h.runtime.calls()[..5],
        &[
            RuntimeCall::EnterIsolate,
            RuntimeCall::EnterScope,
            RuntimeCall::DrainMicrotasks,
            RuntimeCall::ExitScope,
            RuntimeCall::ExitIsolate,
        ]
    );
}

#[test]
fn test_tick_without_handler_still_drains() {
    let h = running();
    assert!(!h.bridge.registry().is_registered(EventKind::Tick));

    h.bridge.dispatch_tick(1);
    h.bridge.dispatch_tick(2);

    assert_eq!(h.runtime.count(&RuntimeCall::DrainMicrotasks), 2);
    assert_eq!(h.runtime.count(&RuntimeCall::EnterScope), 2);
    assert_eq!(h.runtime.count(&RuntimeCall::ExitScope), 2);
    assert!(!h.runtime.is_entered());
}

#[test]
fn test_tick_without_handler_is_noop_after_shutdown() {
    let h = running();
    h.bridge.shutdown();
    h.runtime.clear_calls();

    h.bridge.dispatch_tick(1);
    assert_eq!(h.runtime.call_count(), 0);
}

#[test]
fn test_tick_drain_failure_is_not_fatal() {
    let h = running();
    h.runtime.fail_drain.store(true, Ordering::SeqCst);
    h.bridge.registry().set_tick(|_| {});

    h.bridge.dispatch_tick(1);
    h.bridge.tick();

    assert_eq!(h.bridge.state(), LifecycleState::Running);
    assert!(h.bridge.registry().is_registered(EventKind::Tick));
}

#[test]
fn test_lifecycle_tick_drains_without_scope() {
    let h = running();
    h.bridge.tick();
    assert_eq!(
        h.runtime.calls(),
        vec![
            RuntimeCall::EnterIsolate,
            RuntimeCall::DrainMicrotasks,
            RuntimeCall::ExitIsolate,
        ]
    );
}

#[test]
fn test_last_registration_wins() {
    let h = running();
    h.bridge.registry().set_block_break(|_, _| BlockBreakResult::Cancel);
    h.bridge.registry().set_block_break(|_, _| BlockBreakResult::AllowWithoutDrops);

    assert_eq!(
        h.bridge.dispatch_block_break(BlockPos::ORIGIN, 1),
        BlockBreakResult::AllowWithoutDrops
    );
    assert_eq!(h.bridge.registry().registered_count(), 1);
}
