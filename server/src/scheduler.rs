//! The round state machine.
//!
//! Transitions are plain functions over the locked game; callers hold the
//! mutex and the functions never take it themselves. Each transition bumps
//! the ledger generation and arms one timer task for the phase it entered;
//! a timer that wakes up to a different generation is a no-op.

use chrono::Utc;
use hilo_protocol::*;
use std::time::Duration;
use tokio::time;
use tracing::info;

use crate::game::{Game, SharedGame};

type Transition = fn(&SharedGame, &mut Game);

/// Join-path check: starts a round as soon as enough players are waiting.
pub fn maybe_start(game: &SharedGame, g: &mut Game) {
    if g.ledger.phase == Phase::WaitingPlayers && g.registry.count() >= g.config.min_players {
        start_betting(game, g);
    }
}

/// Opens the table: clears the bet map and counts down from the betting
/// window.
pub fn start_betting(game: &SharedGame, g: &mut Game) {
    let gen = g.ledger.bump_generation();
    g.ledger.phase = Phase::Betting;
    g.ledger.countdown = g.config.betting_secs;
    g.ledger.clear_bets();
    info!(countdown = g.ledger.countdown, players = g.registry.count(), "betting open");
    g.gateway.publish(ServerToClient::PhaseChange {
        phase: Phase::Betting,
        countdown: g.ledger.countdown,
    });
    spawn_countdown(game.clone(), gen, lock_bets);
}

/// Closes the table. Dice land after a short settle delay.
pub fn lock_bets(game: &SharedGame, g: &mut Game) {
    let gen = g.ledger.bump_generation();
    g.ledger.phase = Phase::Locked;
    g.ledger.countdown = 0;
    info!(bets = g.ledger.bets.len(), "bets locked");
    g.gateway.publish(ServerToClient::PhaseChange {
        phase: Phase::Locked,
        countdown: 0,
    });
    spawn_delay(game.clone(), gen, g.config.lock_delay, start_reveal);
}

/// Draws the round result, records it, and fans it out with fresh history.
pub fn start_reveal(game: &SharedGame, g: &mut Game) {
    let gen = g.ledger.bump_generation();
    let result = roll_dice();
    g.ledger.phase = Phase::Reveal;
    g.ledger.countdown = g.config.reveal_secs;
    g.ledger.record_result(result);
    g.ledger.push_history(HistoryEntry {
        result,
        at: Utc::now().timestamp_millis(),
    });
    info!(dice = ?result.dice, total = result.total, side = %result.side, "dice revealed");
    g.gateway.publish(ServerToClient::PhaseChange {
        phase: Phase::Reveal,
        countdown: g.ledger.countdown,
    });
    g.gateway.publish(ServerToClient::Reveal { result });
    g.gateway
        .publish(ServerToClient::History(g.ledger.history_tail(g.config.history_broadcast)));
    spawn_countdown(game.clone(), gen, start_payout);
}

/// Settles bets, dispatches reward credits, and shows the winners and the
/// refreshed leaderboard.
pub fn start_payout(game: &SharedGame, g: &mut Game) {
    let gen = g.ledger.bump_generation();
    g.ledger.phase = Phase::Payout;
    g.ledger.countdown = g.config.payout_secs;
    g.gateway.publish(ServerToClient::PhaseChange {
        phase: Phase::Payout,
        countdown: g.ledger.countdown,
    });

    let winners = g.settle_bets();
    for w in &winners {
        g.rewards.credit(&w.user_id, w.win_amount);
    }
    info!(winners = winners.len(), "round settled");
    g.gateway.publish(ServerToClient::Payout { winners });
    g.gateway.publish(ServerToClient::Leaderboard {
        entries: g.ledger.top_streaks(g.config.leaderboard_cap),
    });
    spawn_countdown(game.clone(), gen, return_to_waiting);
}

/// Back to idle. If enough players stayed, a fresh round starts after a
/// short grace, unless a join already started one.
pub fn return_to_waiting(game: &SharedGame, g: &mut Game) {
    let gen = g.ledger.bump_generation();
    g.ledger.phase = Phase::WaitingPlayers;
    g.ledger.countdown = 0;
    g.gateway.publish(ServerToClient::PhaseChange {
        phase: Phase::WaitingPlayers,
        countdown: 0,
    });
    if g.registry.count() >= g.config.min_players {
        spawn_delay(game.clone(), gen, g.config.restart_grace, grace_restart);
    }
}

fn grace_restart(game: &SharedGame, g: &mut Game) {
    if g.ledger.phase == Phase::WaitingPlayers && g.registry.count() >= g.config.min_players {
        start_betting(game, g);
    }
}

/// One tick per period: decrement, broadcast, hand off to `next` at zero.
fn spawn_countdown(game: SharedGame, gen: u64, next: Transition) {
    tokio::spawn(async move {
        let tick = game.lock().config.tick;
        let mut interval = time::interval(tick);
        interval.tick().await; // the first tick completes immediately
        loop {
            interval.tick().await;
            let mut g = game.lock();
            if g.ledger.generation != gen {
                return;
            }
            g.ledger.countdown = g.ledger.countdown.saturating_sub(1);
            g.gateway.publish(ServerToClient::Countdown {
                countdown: g.ledger.countdown,
            });
            if g.ledger.countdown == 0 {
                next(&game, &mut g);
                return;
            }
        }
    });
}

fn spawn_delay(game: SharedGame, gen: u64, delay: Duration, next: Transition) {
    tokio::spawn(async move {
        time::sleep(delay).await;
        let mut g = game.lock();
        if g.ledger.generation != gen {
            return;
        }
        next(&game, &mut g);
    });
}
