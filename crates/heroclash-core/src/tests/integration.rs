//! End-to-end battles through the registry surface.
//!
//! Deterministic traces use defend-only scripted generators (DEFEND always
//! hits, never crits), so whole battles replay exactly: 12 damage per turn,
//! the first actor's target falls on turn 17, the winner keeps 4 health.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::action::ActionKind;
use crate::combatant::CombatantId;
use crate::effect::EffectKind;
use crate::engine::BattleConfig;
use crate::error::BattleError;
use crate::record::BattleId;

use super::helpers::{
    defend_generator, fast_config, hero, neutral_judge, registry_with, wait_for_end,
    CollectingNotifier, FailingGenerator, FixedJudge, SlowJudge,
};

fn heroes() -> [crate::combatant::HeroConfig; 2] {
    [hero("Pyra"), hero("Galen")]
}

// =============================================================================
// Deterministic full battles
// =============================================================================

#[test]
fn defend_only_battle_runs_to_completion() {
    let (registry, sink) = registry_with(defend_generator(), neutral_judge(), fast_config());
    let handle = registry.create_battle("b1", heroes()).unwrap();
    handle.start().unwrap();

    let terminal = wait_for_end(&registry, handle.id());

    // 12 damage per turn, alternating targets: the 9th hit on the slower
    // side lands on turn 17.
    let records = registry.changes_since(handle.id(), 0).unwrap();
    assert_eq!(records.len(), 17);
    for (index, record) in records.iter().enumerate() {
        assert_eq!(record.turn, index as u32 + 1);
        assert_eq!(record.action.kind(), ActionKind::Defend);
        assert_eq!(record.action.damage(), 12);
        assert!(!record.action.crit());
        assert!(!record.action.miss());
    }

    let winner = terminal.status.winner().expect("battle ended");
    let (winner_snap, loser_snap) = if terminal.combatants[0].id == winner {
        (&terminal.combatants[0], &terminal.combatants[1])
    } else {
        (&terminal.combatants[1], &terminal.combatants[0])
    };
    assert_eq!(loser_snap.health, 0);
    assert_eq!(winner_snap.health, 4);

    let summary = terminal.summary.expect("terminal snapshot carries summary");
    assert_eq!(summary.turns, 17);
    assert_eq!(summary.most_used_kind, ActionKind::Defend);
    assert_eq!(summary.highest_hit_damage, 12);
    assert_eq!(summary.highest_hit_turn, 1);
    assert_eq!(summary.effects_applied, 0);
    assert_eq!(summary.special_uses, 0);

    // The persistence sink saw the same ordered history plus the ending.
    assert_eq!(sink.records().len(), 17);
    assert_eq!(sink.ended(), vec![(handle.id().clone(), winner)]);
}

#[test]
fn judge_effects_shape_the_whole_battle() {
    // Every turn the judge attaches BURN to the defender, so from turn 2 on
    // each attacker carries a burn: (12 + 5) * 0.9 -> 15 damage.
    let judge = Arc::new(FixedJudge::new(1.0, EffectKind::Burn));
    let (registry, _sink) = registry_with(defend_generator(), judge, fast_config());
    let handle = registry.create_battle("b-burn", heroes()).unwrap();
    handle.start().unwrap();

    let terminal = wait_for_end(&registry, handle.id());

    let records = registry.changes_since(handle.id(), 0).unwrap();
    assert_eq!(records.len(), 13);
    assert_eq!(records[0].action.damage(), 12);
    for record in &records[1..] {
        assert_eq!(record.action.damage(), 15);
        assert_eq!(record.action.effect(), EffectKind::Burn);
    }

    let winner = terminal.status.winner().expect("battle ended");
    let winner_health = terminal
        .combatants
        .iter()
        .find(|c| c.id == winner)
        .map(|c| c.health)
        .unwrap();
    assert_eq!(winner_health, 10);

    let summary = terminal.summary.unwrap();
    assert_eq!(summary.effects_applied, 13);
    assert_eq!(summary.highest_hit_damage, 15);
    assert_eq!(summary.highest_hit_turn, 2);
}

// =============================================================================
// Degradation paths
// =============================================================================

#[test]
fn failing_generator_falls_back_to_basic_attack() {
    let (registry, _sink) = registry_with(
        Arc::new(FailingGenerator),
        neutral_judge(),
        fast_config(),
    );
    let handle = registry.create_battle("b-fallback", heroes()).unwrap();
    handle.start().unwrap();

    let terminal = wait_for_end(&registry, handle.id());

    let records = registry.changes_since(handle.id(), 0).unwrap();
    assert!(!records.is_empty());
    for record in &records {
        assert_eq!(record.action.kind(), ActionKind::Attack);
        assert_eq!(record.action.action().description(), "Performs a basic attack");
        // A miss deals exactly zero; anything that lands deals at least one.
        if record.action.miss() {
            assert_eq!(record.action.damage(), 0);
        } else {
            assert!(record.action.damage() >= 1);
        }
    }
    assert!(terminal
        .combatants
        .iter()
        .any(|combatant| combatant.health == 0));
}

#[test]
fn slow_judge_degrades_to_neutral_verdict() {
    let config = BattleConfig {
        call_timeout: Duration::from_millis(10),
        ..fast_config()
    };
    let judge = Arc::new(SlowJudge::new(Duration::from_millis(200)));
    let (registry, _sink) = registry_with(defend_generator(), judge, config);
    let handle = registry.create_battle("b-slow", heroes()).unwrap();
    handle.start().unwrap();

    let terminal = wait_for_end(&registry, handle.id());

    // The slow judge's 2.0/STUN verdict is never observed: the battle plays
    // out exactly like the neutral defend-only trace.
    let records = registry.changes_since(handle.id(), 0).unwrap();
    assert_eq!(records.len(), 17);
    for record in &records {
        assert_eq!(record.action.damage(), 12);
        assert_eq!(record.action.effect(), EffectKind::None);
    }
    assert!(terminal.status.is_ended());
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn created_battle_reports_initialized_state() {
    let (registry, _sink) = registry_with(defend_generator(), neutral_judge(), fast_config());
    let handle = registry.create_battle("b-init", heroes()).unwrap();

    let state = registry.get_state(handle.id()).unwrap();
    assert_eq!(state.status, crate::record::BattleStatus::Initialized);
    assert_eq!(state.turn, 0);
    assert_eq!(state.combatants[0].health, 100);
    assert_eq!(state.combatants[1].health, 100);
}

#[test]
fn duplicate_battle_id_is_rejected() {
    let (registry, _sink) = registry_with(defend_generator(), neutral_judge(), fast_config());
    let handle = registry.create_battle("dup", heroes()).unwrap();
    assert!(matches!(
        registry.create_battle("dup", heroes()),
        Err(BattleError::DuplicateBattleId(_))
    ));

    // Still a duplicate after the battle has ended: its history remains.
    handle.start().unwrap();
    wait_for_end(&registry, handle.id());
    assert!(matches!(
        registry.create_battle("dup", heroes()),
        Err(BattleError::DuplicateBattleId(_))
    ));
}

#[test]
fn empty_hero_name_is_rejected() {
    let (registry, _sink) = registry_with(defend_generator(), neutral_judge(), fast_config());
    let result = registry.create_battle("b-bad", [hero(""), hero("Galen")]);
    assert!(matches!(result, Err(BattleError::InvalidConfig(_))));
}

#[test]
fn unknown_battle_is_not_found() {
    let (registry, _sink) = registry_with(defend_generator(), neutral_judge(), fast_config());
    let missing = BattleId::new("missing");
    assert!(matches!(
        registry.get_state(&missing),
        Err(BattleError::BattleNotFound(_))
    ));
    assert!(matches!(
        registry.changes_since(&missing, 0),
        Err(BattleError::BattleNotFound(_))
    ));
    assert!(matches!(
        registry.delete(&missing),
        Err(BattleError::BattleNotFound(_))
    ));
}

#[test]
fn starting_twice_fails() {
    let (registry, _sink) = registry_with(defend_generator(), neutral_judge(), fast_config());
    let handle = registry.create_battle("b-twice", heroes()).unwrap();
    handle.start().unwrap();
    assert!(matches!(
        handle.start(),
        Err(BattleError::AlreadyStarted(_))
    ));
    wait_for_end(&registry, handle.id());
}

#[test]
fn delete_stops_further_turns_but_keeps_history() {
    let config = BattleConfig {
        turn_delay: Duration::from_millis(40),
        ..fast_config()
    };
    let (registry, _sink) = registry_with(defend_generator(), neutral_judge(), config);
    let handle = registry.create_battle("b-del", heroes()).unwrap();
    handle.start().unwrap();

    // Let a few turns commit, then tear the battle down.
    thread::sleep(Duration::from_millis(130));
    registry.delete(handle.id()).unwrap();

    assert!(matches!(
        registry.get_state(handle.id()),
        Err(BattleError::BattleNotFound(_))
    ));

    // At most the already in-flight turn may still land; after that the
    // record count stays frozen.
    thread::sleep(Duration::from_millis(50));
    let frozen = registry.changes_since(handle.id(), 0).unwrap().len();
    thread::sleep(Duration::from_millis(150));
    assert_eq!(registry.changes_since(handle.id(), 0).unwrap().len(), frozen);
    assert!(frozen < 17, "battle should have been cut short");
}

#[test]
fn concurrent_battles_do_not_interfere() {
    let (registry, sink) = registry_with(defend_generator(), neutral_judge(), fast_config());
    let one = registry.create_battle("one", heroes()).unwrap();
    let two = registry.create_battle("two", heroes()).unwrap();

    assert_eq!(
        registry.active_battles(),
        vec![BattleId::new("one"), BattleId::new("two")]
    );

    one.start().unwrap();
    two.start().unwrap();
    wait_for_end(&registry, one.id());
    wait_for_end(&registry, two.id());

    for id in ["one", "two"] {
        let records = registry.changes_since(&BattleId::new(id), 0).unwrap();
        assert_eq!(records.len(), 17);
        assert!(records.iter().all(|r| r.battle_id.as_str() == id));
    }
    assert_eq!(sink.ended().len(), 2);
    assert!(registry.active_battles().is_empty());
}

// =============================================================================
// Polling and notification
// =============================================================================

#[test]
fn poller_observes_strictly_increasing_prefix() {
    let config = BattleConfig {
        turn_delay: Duration::from_millis(3),
        ..fast_config()
    };
    let (registry, _sink) = registry_with(defend_generator(), neutral_judge(), config);
    let registry = Arc::new(registry);
    let handle = registry.create_battle("b-poll", heroes()).unwrap();

    let poller = {
        let registry = Arc::clone(&registry);
        let id = handle.id().clone();
        thread::spawn(move || {
            let mut last_seen = 0;
            loop {
                if let Ok(batch) = registry.changes_since(&id, last_seen) {
                    for record in batch {
                        assert_eq!(record.turn, last_seen + 1, "gap or reorder observed");
                        last_seen = record.turn;
                    }
                }
                if last_seen == 17 {
                    return;
                }
                thread::sleep(Duration::from_millis(1));
            }
        })
    };

    handle.start().unwrap();
    wait_for_end(&registry, handle.id());
    poller.join().unwrap();

    let tail = registry.changes_since(handle.id(), 10).unwrap();
    let turns: Vec<u32> = tail.iter().map(|r| r.turn).collect();
    assert_eq!(turns, (11..=17).collect::<Vec<u32>>());
    assert!(registry.changes_since(handle.id(), 17).unwrap().is_empty());
}

#[test]
fn subscribers_get_every_material_change_once() {
    let (registry, _sink) = registry_with(defend_generator(), neutral_judge(), fast_config());
    let notifier = Arc::new(CollectingNotifier::default());
    registry.subscribe(notifier.clone());

    let handle = registry.create_battle("b-sub", heroes()).unwrap();
    handle.start().unwrap();
    wait_for_end(&registry, handle.id());

    // Opening (status flip), 17 health-changing turns, terminal status flip.
    let snapshots = notifier.snapshots();
    assert_eq!(snapshots.len(), 19);
    assert!(snapshots
        .iter()
        .all(|s| s.battle_id == *handle.id()));
    let last = snapshots.last().unwrap();
    assert!(last.status.is_ended());
    assert!(last.summary.is_some());

    // No two consecutive notifications carry materially identical state.
    for pair in snapshots.windows(2) {
        assert!(pair[1].materially_differs(&pair[0]));
    }
}

#[test]
fn pacing_delay_is_observed_between_turns() {
    let config = BattleConfig {
        turn_delay: Duration::from_millis(10),
        ..fast_config()
    };
    let (registry, _sink) = registry_with(defend_generator(), neutral_judge(), config);
    let handle = registry.create_battle("b-pace", heroes()).unwrap();

    let started = Instant::now();
    handle.start().unwrap();
    wait_for_end(&registry, handle.id());

    // 17 turns, each preceded by a 10ms pacing sleep.
    assert!(started.elapsed() >= Duration::from_millis(170));
}

#[test]
fn fixed_seed_replays_identically() {
    let run = || {
        let (registry, _sink) = registry_with(
            Arc::new(FailingGenerator),
            neutral_judge(),
            fast_config(),
        );
        let handle = registry.create_battle("b-seed", heroes()).unwrap();
        handle.start().unwrap();
        wait_for_end(&registry, handle.id());
        registry
            .changes_since(handle.id(), 0)
            .unwrap()
            .into_iter()
            .map(|r| (r.turn, r.action.actor(), r.action.damage(), r.action.crit()))
            .collect::<Vec<(u32, CombatantId, u32, bool)>>()
    };

    assert_eq!(run(), run());
}
