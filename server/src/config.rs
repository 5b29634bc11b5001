use std::time::Duration;

/// Process-level settings sourced from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub reward_base_url: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: read_u16("WS_PORT", 3002),
            reward_base_url: std::env::var("REWARD_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        }
    }
}

fn read_u16(key: &str, fallback: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<u16>().ok())
        .unwrap_or(fallback)
}

/// Whether a losing bettor without a streak entry gets one pinned at zero,
/// or entries only ever appear on a first win.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakPolicy {
    AllBettors,
    WinnersOnly,
}

/// Pace and policy knobs for the round loop. Countdowns are counts of
/// `tick`-sized steps, so tests can shrink `tick` and run whole rounds in
/// milliseconds without touching the wire-visible numbers.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub min_players: usize,
    pub betting_secs: u32,
    pub reveal_secs: u32,
    pub payout_secs: u32,
    pub tick: Duration,
    pub lock_delay: Duration,
    pub restart_grace: Duration,
    pub history_cap: usize,
    pub history_broadcast: usize,
    pub leaderboard_cap: usize,
    pub payout_multiplier: u64,
    pub streak_policy: StreakPolicy,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            betting_secs: 40,
            reveal_secs: 5,
            payout_secs: 10,
            tick: Duration::from_secs(1),
            lock_delay: Duration::from_secs(2),
            restart_grace: Duration::from_secs(2),
            history_cap: 20,
            history_broadcast: 5,
            leaderboard_cap: 10,
            payout_multiplier: 2,
            streak_policy: StreakPolicy::AllBettors,
        }
    }
}
