use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use futures_util::{SinkExt, StreamExt};
use serde_json;
use hilo_protocol::{ClientToServer, ServerToClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🎲 Hi-Lo Dice CLI Client");
    println!("========================");

    // Get player id
    print!("Enter your user id: ");
    io::stdout().flush()?;
    let mut user_id = String::new();
    io::stdin().read_line(&mut user_id)?;
    let user_id = user_id.trim().to_string();

    if user_id.is_empty() {
        println!("❌ User id cannot be empty");
        return Ok(());
    }

    // Connect to server
    let port = std::env::var("WS_PORT").unwrap_or_else(|_| "3002".to_string());
    let url = format!("ws://127.0.0.1:{}/ws", port);
    println!("🔗 Connecting to {}...", url);

    let (ws_stream, _) = connect_async(&url).await?;
    println!("✅ Connected to server!");

    let (mut write, mut read) = ws_stream.split();

    // Identify ourselves
    let identify_msg = ClientToServer::Identify {
        user_id: user_id.clone(),
    };
    let identify_json = serde_json::to_string(&identify_msg)?;
    write.send(Message::Text(identify_json)).await?;

    println!("🪪 Identifying as '{}'...", user_id);

    // Handle incoming messages
    tokio::spawn({
        let user_id = user_id.clone();
        async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if let Ok(server_msg) = serde_json::from_str::<ServerToClient>(&text) {
                            handle_server_message(server_msg, &user_id);
                        }
                    }
                    Ok(Message::Close(_)) => {
                        println!("🔌 Connection closed by server");
                        break;
                    }
                    Err(e) => {
                        println!("❌ WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
        }
    });

    println!("\n📋 Commands available:");
    println!("  bet tai <amount>  - Bet on high (total 11-18)");
    println!("  bet xiu <amount>  - Bet on low (total 3-10)");
    println!("  quit              - Exit the game");
    println!("\nType commands and press Enter:");

    // Handle user input
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();

        if line == "quit" {
            break;
        }

        if let Some(msg) = parse_command(line) {
            let json = serde_json::to_string(&msg)?;
            write.send(Message::Text(json)).await?;
        } else {
            println!("❓ Unknown command: {}", line);
        }
    }

    println!("👋 Goodbye!");
    Ok(())
}

fn handle_server_message(msg: ServerToClient, user_id: &str) {
    match msg {
        ServerToClient::PhaseChange { phase, countdown } => match phase {
            hilo_protocol::Phase::WaitingPlayers => {
                println!("🕹️  Waiting for players...");
            }
            hilo_protocol::Phase::Betting => {
                println!("🕹️  Bets are OPEN for {} seconds!", countdown);
            }
            hilo_protocol::Phase::Locked => {
                println!("🔒 Bets are locked");
            }
            hilo_protocol::Phase::Reveal => {
                println!("🕹️  Rolling the dice...");
            }
            hilo_protocol::Phase::Payout => {
                println!("🕹️  Paying out...");
            }
        },
        ServerToClient::Countdown { countdown } => {
            if countdown > 0 && (countdown <= 5 || countdown % 10 == 0) {
                println!("⏱️  {} seconds left", countdown);
            }
        }
        ServerToClient::Reveal { result } => {
            println!(
                "🎲 Dice: {:?} → total {} ({})",
                result.dice, result.total, result.side
            );
        }
        ServerToClient::Payout { winners } => {
            if winners.is_empty() {
                println!("💸 No winners this round");
            } else {
                for winner in &winners {
                    if winner.user_id == user_id {
                        println!("🎉 YOU WON {}!", winner.win_amount);
                    } else {
                        println!("💰 {} won {}", winner.user_id, winner.win_amount);
                    }
                }
            }
        }
        ServerToClient::History(entries) => {
            let line: Vec<String> = entries
                .iter()
                .map(|e| format!("{}({})", e.result.total, e.result.side))
                .collect();
            println!("📜 Recent rounds: {}", line.join(" "));
        }
        ServerToClient::Leaderboard { entries } => {
            if !entries.is_empty() {
                println!("🏆 Streak leaderboard:");
                for (i, entry) in entries.iter().enumerate() {
                    println!("  {}. {} - {} in a row", i + 1, entry.user_id, entry.streak);
                }
            }
        }
        ServerToClient::PlayerCount { count } => {
            println!("👥 Players online: {}", count);
        }
        ServerToClient::GameState {
            phase,
            countdown,
            dice,
            total,
            side,
        } => {
            println!("\n🎯 === TABLE STATE ===");
            println!("🕹️  Phase: {} (countdown {})", phase, countdown);
            if let (Some(dice), Some(total), Some(side)) = (dice, total, side) {
                println!("🎲 Last roll: {:?} → {} ({})", dice, total, side);
            } else {
                println!("🎲 No rounds played yet");
            }
            println!("====================\n");
        }
        ServerToClient::BetOk { bet, amount } => {
            println!("✅ Bet accepted: {} on {}", amount, bet);
        }
        ServerToClient::Notify { message, new_score } => {
            println!("📣 {} (score: {})", message, new_score);
        }
    }
}

fn parse_command(input: &str) -> Option<ClientToServer> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    if parts.is_empty() {
        return None;
    }

    match parts[0].to_lowercase().as_str() {
        "bet" => {
            if parts.len() == 3 {
                let side = parts[1].to_lowercase();
                let amount = parts[2].parse::<u64>().ok()?;
                Some(ClientToServer::Bet { bet: side, amount })
            } else {
                None
            }
        }
        _ => None,
    }
}
