use clap::{Parser, Subcommand};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "hilo-combined")]
#[command(about = "Hi-Lo Dice - Combined server and client launcher")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run both server and multiple CLI clients
    Both {
        /// Number of clients to start
        #[arg(short, long, default_value = "2")]
        clients: u32,
        /// Port for the server
        #[arg(short, long, default_value = "3002")]
        port: u16,
    },
    /// Run only the server
    Server {
        /// Port for the server
        #[arg(short, long, default_value = "3002")]
        port: u16,
    },
    /// Run only a client
    Client {
        /// Port the server listens on
        #[arg(short, long, default_value = "3002")]
        port: u16,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Both { clients, port } => {
            run_both(clients, port);
        }
        Commands::Server { port } => {
            run_server(port);
        }
        Commands::Client { port } => {
            run_client(port);
        }
    }
}

fn run_both(clients: u32, port: u16) {
    println!("🚀 Starting Hi-Lo Dice - server + {} clients on port {}", clients, port);

    // Start the game server in background
    println!("📡 Starting game server on port {}...", port);
    let server_handle = thread::spawn(move || {
        run_server(port);
    });

    // Wait a moment for server to start
    thread::sleep(Duration::from_millis(1500));

    // Start clients
    let mut client_handles = Vec::new();
    for i in 1..=clients {
        println!("🎮 Starting client {}...", i);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(500 * i as u64)); // Stagger client starts
            run_client(port);
        });
        client_handles.push(handle);
    }

    println!("✅ All processes started.");
    println!("💡 Tip: bets are open for 40 seconds each round, minimum 2 players");
    println!("Press Ctrl+C to stop.");

    // Wait for all clients to finish (they won't unless killed)
    for handle in client_handles {
        let _ = handle.join();
    }

    // Wait for server to finish
    let _ = server_handle.join();
}

fn run_server(port: u16) {
    let status = Command::new("cargo")
        .args(&["run", "-p", "hilo-server"])
        .env("WS_PORT", port.to_string())
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status();

    match status {
        Ok(exit_status) => {
            if !exit_status.success() {
                eprintln!("❌ Server exited with error: {}", exit_status);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("❌ Failed to start server: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_client(port: u16) {
    let status = Command::new("cargo")
        .args(&["run", "--bin", "cli_client"])
        .env("WS_PORT", port.to_string())
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status();

    match status {
        Ok(exit_status) => {
            if !exit_status.success() {
                eprintln!("❌ Client exited with error: {}", exit_status);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("❌ Failed to start client: {}", e);
            std::process::exit(1);
        }
    }
}
