use hilo_protocol::*;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{GameConfig, StreakPolicy};
use crate::gateway::Gateway;
use crate::reward::RewardNotifier;

pub type SharedGame = Arc<Mutex<Game>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bet {
    pub side: Side,
    pub amount: u64,
}

/// Why a bet was dropped. Rejections are logged, never sent to the client.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RejectReason {
    #[error("player is not identified")]
    NotIdentified,
    #[error("bets are closed in phase {0}")]
    BetsClosed(Phase),
    #[error("unknown side {0:?}")]
    UnknownSide(String),
}

/// Identified players currently connected. Set semantics: identifying twice
/// with the same id counts once.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    members: HashSet<String>,
}

impl PlayerRegistry {
    pub fn join(&mut self, id: &str) -> bool {
        self.members.insert(id.to_string())
    }

    pub fn leave(&mut self, id: &str) -> bool {
        self.members.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    pub fn count(&self) -> usize {
        self.members.len()
    }
}

/// All mutable round state: phase, countdown, the open bet map, the last
/// result, bounded history and win streaks. Only ever touched behind the
/// game mutex.
#[derive(Debug)]
pub struct RoundLedger {
    history_cap: usize,
    streak_policy: StreakPolicy,
    pub phase: Phase,
    pub countdown: u32,
    /// Bumped on every transition; stale timers compare against it and bail.
    pub generation: u64,
    pub bets: HashMap<String, Bet>,
    pub last_result: Option<RoundResult>,
    pub history: VecDeque<HistoryEntry>,
    pub streaks: HashMap<String, u32>,
}

impl RoundLedger {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            history_cap: config.history_cap,
            streak_policy: config.streak_policy,
            phase: Phase::WaitingPlayers,
            countdown: 0,
            generation: 0,
            bets: HashMap::new(),
            last_result: None,
            history: VecDeque::new(),
            streaks: HashMap::new(),
        }
    }

    pub fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn clear_bets(&mut self) {
        self.bets.clear();
    }

    pub fn set_bet(&mut self, player: &str, side: Side, amount: u64) {
        self.bets.insert(player.to_string(), Bet { side, amount });
    }

    pub fn record_result(&mut self, result: RoundResult) {
        self.last_result = Some(result);
    }

    pub fn push_history(&mut self, entry: HistoryEntry) {
        self.history.push_back(entry);
        while self.history.len() > self.history_cap {
            self.history.pop_front();
        }
    }

    /// Newest `n` entries, oldest first.
    pub fn history_tail(&self, n: usize) -> Vec<HistoryEntry> {
        self.history.iter().rev().take(n).rev().copied().collect()
    }

    pub fn update_streak(&mut self, player: &str, won: bool) {
        if won {
            *self.streaks.entry(player.to_string()).or_insert(0) += 1;
        } else {
            match self.streak_policy {
                StreakPolicy::AllBettors => {
                    self.streaks.insert(player.to_string(), 0);
                }
                StreakPolicy::WinnersOnly => {
                    if let Some(streak) = self.streaks.get_mut(player) {
                        *streak = 0;
                    }
                }
            }
        }
    }

    /// Top streak holders, descending, zero entries filtered out. Ties are
    /// broken by player id so equal streaks render in a stable order.
    pub fn top_streaks(&self, n: usize) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .streaks
            .iter()
            .filter(|(_, streak)| **streak > 0)
            .map(|(id, streak)| LeaderboardEntry {
                user_id: id.clone(),
                streak: *streak,
            })
            .collect();
        entries.sort_by(|a, b| {
            b.streak
                .cmp(&a.streak)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        entries.truncate(n);
        entries
    }
}

/// The one shared game. Everything the socket handlers and phase timers
/// touch lives here, behind a single mutex.
pub struct Game {
    pub config: GameConfig,
    pub ledger: RoundLedger,
    pub registry: PlayerRegistry,
    pub gateway: Gateway,
    pub rewards: RewardNotifier,
}

impl Game {
    pub fn new(config: GameConfig, rewards: RewardNotifier) -> Self {
        Self {
            ledger: RoundLedger::new(&config),
            registry: PlayerRegistry::default(),
            gateway: Gateway::default(),
            rewards,
            config,
        }
    }

    /// Stores a bet if the player is identified, the table is open and the
    /// side parses. Anything else is dropped without a client-visible event.
    pub fn accept_bet(&mut self, player: &str, side_raw: &str, amount: u64) -> Result<Bet, RejectReason> {
        if !self.registry.contains(player) {
            return Err(RejectReason::NotIdentified);
        }
        if self.ledger.phase != Phase::Betting {
            return Err(RejectReason::BetsClosed(self.ledger.phase));
        }
        let side = Side::parse(side_raw)
            .ok_or_else(|| RejectReason::UnknownSide(side_raw.to_string()))?;
        self.ledger.set_bet(player, side, amount);
        Ok(Bet { side, amount })
    }

    /// Settles every open bet against the last result, updating streaks on
    /// the way. Returns the winners sorted by id.
    pub fn settle_bets(&mut self) -> Vec<Winner> {
        let Some(result) = self.ledger.last_result else {
            return Vec::new();
        };
        let bets: Vec<(String, Bet)> = self
            .ledger
            .bets
            .iter()
            .map(|(id, bet)| (id.clone(), *bet))
            .collect();
        let mut winners = Vec::new();
        for (user_id, bet) in bets {
            let won = bet.side == result.side;
            self.ledger.update_streak(&user_id, won);
            if won {
                winners.push(Winner {
                    user_id,
                    // Stakes are client-supplied and unbounded.
                    win_amount: bet.amount.saturating_mul(self.config.payout_multiplier),
                });
            }
        }
        winners.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        winners
    }

    pub fn snapshot(&self) -> ServerToClient {
        let result = self.ledger.last_result;
        ServerToClient::GameState {
            phase: self.ledger.phase,
            countdown: self.ledger.countdown,
            dice: result.map(|r| r.dice),
            total: result.map(|r| r.total),
            side: result.map(|r| r.side),
        }
    }
}
