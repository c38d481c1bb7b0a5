//! roomwatch-admin CLI tool
//!
//! Provisions rooms on a running Roomwatch node.
//!
//! Usage:
//!   roomwatch-admin add-room <name> <capacity> <token>
//!   roomwatch-admin update-room <id> [--name N] [--capacity C] [--token T]
//!   roomwatch-admin remove-room <id>
//!   roomwatch-admin list-rooms
//!   roomwatch-admin presence <room_id>
//!   roomwatch-admin ping

use roomwatch_node::admin_socket::{default_socket_path, AdminCommand, AdminResponse};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::process::exit;

fn print_usage() {
    eprintln!("roomwatch-admin - Manage Roomwatch rooms");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  roomwatch-admin add-room <name> <capacity> <token>   Create a room");
    eprintln!("  roomwatch-admin update-room <id> [--name N] [--capacity C] [--token T]");
    eprintln!("                                                       Change a room");
    eprintln!("  roomwatch-admin remove-room <id>                     Delete an empty room");
    eprintln!("  roomwatch-admin list-rooms                           List all rooms");
    eprintln!("  roomwatch-admin presence <room_id>                   Cards inside a room");
    eprintln!("  roomwatch-admin ping                                 Check if daemon is running");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  ROOMWATCH_SOCKET  Path to admin socket (default: ./roomwatch-data/admin.sock)");
}

fn get_socket_path() -> PathBuf {
    std::env::var("ROOMWATCH_SOCKET")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_socket_path())
}

fn send_command(cmd: &AdminCommand) -> Result<AdminResponse, String> {
    let socket_path = get_socket_path();

    let mut stream = UnixStream::connect(&socket_path).map_err(|e| {
        format!(
            "Failed to connect to roomwatch-node at {:?}: {}\n\
             Is the roomwatch-node running?",
            socket_path, e
        )
    })?;

    let cmd_json = serde_json::to_string(cmd).map_err(|e| e.to_string())?;
    writeln!(stream, "{}", cmd_json).map_err(|e| e.to_string())?;

    let mut reader = BufReader::new(&stream);
    let mut response_line = String::new();
    reader
        .read_line(&mut response_line)
        .map_err(|e| e.to_string())?;

    serde_json::from_str(&response_line).map_err(|e| format!("Invalid response: {}", e))
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {}", message);
    exit(1);
}

fn parse_num<T: std::str::FromStr>(value: Option<&String>, what: &str) -> T {
    match value.map(|v| v.parse()) {
        Some(Ok(n)) => n,
        Some(Err(_)) => fail(&format!("{} must be a non-negative integer", what)),
        None => fail(&format!("missing {} argument", what)),
    }
}

fn parse_update(args: &[String]) -> AdminCommand {
    let id = parse_num(args.first(), "id");
    let mut name = None;
    let mut capacity = None;
    let mut token = None;

    let mut rest = args[1..].iter();
    while let Some(flag) = rest.next() {
        match flag.as_str() {
            "--name" => name = rest.next().cloned(),
            "--capacity" => capacity = Some(parse_num(rest.next(), "capacity")),
            "--token" => token = rest.next().cloned(),
            other => fail(&format!("unknown option {}", other)),
        }
    }

    AdminCommand::UpdateRoom {
        id,
        name,
        capacity,
        token,
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        exit(1);
    }

    let cmd = match args[1].as_str() {
        "add-room" => {
            if args.len() < 5 {
                fail("add-room requires <name> <capacity> <token>");
            }
            AdminCommand::AddRoom {
                name: args[2].clone(),
                capacity: parse_num(args.get(3), "capacity"),
                token: args[4].clone(),
            }
        }
        "update-room" => {
            if args.len() < 3 {
                fail("update-room requires an id argument");
            }
            parse_update(&args[2..])
        }
        "remove-room" => AdminCommand::RemoveRoom {
            id: parse_num(args.get(2), "id"),
        },
        "list-rooms" => AdminCommand::ListRooms,
        "presence" => AdminCommand::Presence {
            room_id: parse_num(args.get(2), "room_id"),
        },
        "ping" => AdminCommand::Ping,
        "-h" | "--help" | "help" => {
            print_usage();
            exit(0);
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            exit(1);
        }
    };

    match send_command(&cmd) {
        Ok(response) => match response {
            AdminResponse::Ok { message } => {
                println!("{}", message);
            }
            AdminResponse::Error { error } => fail(&error),
            AdminResponse::Room { room } => {
                println!("{}\t{}\t{}", room.id, room.name, room.capacity);
            }
            AdminResponse::Rooms { rooms } => {
                if rooms.is_empty() {
                    println!("(none)");
                }
                for room in rooms {
                    println!("{}\t{}\t{}", room.id, room.name, room.capacity);
                }
            }
            AdminResponse::List { items } => {
                if items.is_empty() {
                    println!("(none)");
                } else {
                    for item in items {
                        println!("{}", item);
                    }
                }
            }
            AdminResponse::Pong => {
                println!("pong - roomwatch-node is running");
            }
        },
        Err(e) => {
            eprintln!("{}", e);
            exit(1);
        }
    }
}
