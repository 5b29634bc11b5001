use rand::Rng;
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// ---- Round phases ----
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    WaitingPlayers,
    Betting,
    Locked,
    Reveal,
    Payout,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::WaitingPlayers => "waiting_players",
            Phase::Betting => "betting",
            Phase::Locked => "locked",
            Phase::Reveal => "reveal",
            Phase::Payout => "payout",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ---- Bet sides ----
/// "tai" (high) wins on totals above 10, "xiu" (low) on 10 and below.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Side {
    #[serde(rename = "tai")]
    High,
    #[serde(rename = "xiu")]
    Low,
}

impl Side {
    /// Wire string to side; anything but "tai"/"xiu" is unrecognized.
    pub fn parse(raw: &str) -> Option<Side> {
        match raw {
            "tai" => Some(Side::High),
            "xiu" => Some(Side::Low),
            _ => None,
        }
    }

    pub fn of_total(total: u8) -> Side {
        if total > 10 {
            Side::High
        } else {
            Side::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::High => "tai",
            Side::Low => "xiu",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ---- Dice ----
pub const DICE_PER_ROLL: usize = 3;
pub const DIE_FACES: u8 = 6;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundResult {
    pub dice: [u8; DICE_PER_ROLL],
    pub total: u8,
    #[serde(rename = "type")]
    pub side: Side,
}

impl RoundResult {
    pub fn from_dice(dice: [u8; DICE_PER_ROLL]) -> Self {
        let total: u8 = dice.iter().sum();
        RoundResult {
            dice,
            total,
            side: Side::of_total(total),
        }
    }
}

/// Rolls three independent dice and derives total and side.
pub fn roll_dice() -> RoundResult {
    let mut rng = thread_rng();
    let mut dice = [0u8; DICE_PER_ROLL];
    for d in dice.iter_mut() {
        *d = rng.gen_range(1..=DIE_FACES);
    }
    RoundResult::from_dice(dice)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub result: RoundResult,
    /// Unix millis at reveal time.
    pub at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Winner {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "winAmount")]
    pub win_amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardEntry {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub streak: u32,
}

/// ---- Wire events ----
/// Every frame is `{"event": "...", "data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientToServer {
    Identify {
        #[serde(rename = "userId")]
        user_id: String,
    },
    /// `bet` carries the raw side string so unknown sides can be dropped
    /// server-side instead of failing the whole frame.
    Bet { bet: String, amount: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerToClient {
    PhaseChange {
        phase: Phase,
        countdown: u32,
    },
    Countdown {
        countdown: u32,
    },
    Reveal {
        #[serde(flatten)]
        result: RoundResult,
    },
    Payout {
        winners: Vec<Winner>,
    },
    History(Vec<HistoryEntry>),
    Leaderboard {
        entries: Vec<LeaderboardEntry>,
    },
    PlayerCount {
        count: usize,
    },
    /// One-shot snapshot for a client that just identified. The result
    /// fields stay absent until a first round has been revealed.
    GameState {
        phase: Phase,
        countdown: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dice: Option<[u8; DICE_PER_ROLL]>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total: Option<u8>,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        side: Option<Side>,
    },
    BetOk {
        bet: String,
        amount: u64,
    },
    Notify {
        message: String,
        #[serde(rename = "newScore")]
        new_score: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn side_threshold_splits_at_ten() {
        for total in 3..=10u8 {
            assert_eq!(Side::of_total(total), Side::Low, "total {total}");
        }
        for total in 11..=18u8 {
            assert_eq!(Side::of_total(total), Side::High, "total {total}");
        }
    }

    #[test]
    fn rolled_dice_are_consistent() {
        for _ in 0..200 {
            let r = roll_dice();
            assert!(r.dice.iter().all(|&d| (1..=6).contains(&d)));
            assert_eq!(r.total, r.dice.iter().sum::<u8>());
            assert_eq!(r.side, Side::of_total(r.total));
        }
    }

    #[test]
    fn side_parse_accepts_only_wire_names() {
        assert_eq!(Side::parse("tai"), Some(Side::High));
        assert_eq!(Side::parse("xiu"), Some(Side::Low));
        assert_eq!(Side::parse("TAI"), None);
        assert_eq!(Side::parse("high"), None);
        assert_eq!(Side::parse(""), None);
    }

    #[test]
    fn bet_frame_shape() {
        let frame = serde_json::to_value(ClientToServer::Bet {
            bet: "tai".into(),
            amount: 100,
        })
        .unwrap();
        assert_eq!(
            frame,
            json!({"event": "bet", "data": {"bet": "tai", "amount": 100}})
        );

        let parsed: ClientToServer =
            serde_json::from_value(json!({"event": "identify", "data": {"userId": "alice"}}))
                .unwrap();
        match parsed {
            ClientToServer::Identify { user_id } => assert_eq!(user_id, "alice"),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn reveal_frame_inlines_the_result() {
        let result = RoundResult::from_dice([2, 3, 6]);
        let frame = serde_json::to_value(ServerToClient::Reveal { result }).unwrap();
        assert_eq!(
            frame,
            json!({"event": "reveal", "data": {"dice": [2, 3, 6], "total": 11, "type": "tai"}})
        );
    }

    #[test]
    fn game_state_omits_result_until_first_reveal() {
        let fresh = serde_json::to_value(ServerToClient::GameState {
            phase: Phase::WaitingPlayers,
            countdown: 0,
            dice: None,
            total: None,
            side: None,
        })
        .unwrap();
        assert_eq!(
            fresh,
            json!({"event": "game_state", "data": {"phase": "waiting_players", "countdown": 0}})
        );

        let warm = serde_json::to_value(ServerToClient::GameState {
            phase: Phase::Betting,
            countdown: 40,
            dice: Some([1, 1, 2]),
            total: Some(4),
            side: Some(Side::Low),
        })
        .unwrap();
        assert_eq!(
            warm,
            json!({
                "event": "game_state",
                "data": {"phase": "betting", "countdown": 40, "dice": [1, 1, 2], "total": 4, "type": "xiu"}
            })
        );
    }

    #[test]
    fn history_frame_is_a_bare_array() {
        let entry = HistoryEntry {
            result: RoundResult::from_dice([6, 6, 6]),
            at: 1_700_000_000_000,
        };
        let frame = serde_json::to_value(ServerToClient::History(vec![entry])).unwrap();
        assert_eq!(
            frame,
            json!({
                "event": "history",
                "data": [{"dice": [6, 6, 6], "total": 18, "type": "tai", "at": 1_700_000_000_000i64}]
            })
        );
    }
}
