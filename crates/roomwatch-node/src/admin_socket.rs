//! Unix socket server for admin commands.
//!
//! Provides a local IPC interface for provisioning rooms and inspecting
//! live presence. Device ingestion never goes through here.

use crate::error::{Error, Result};
use crate::storage::Storage;
use roomwatch_core::{Room, RoomId, RoomPatch, TokenPolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

/// Admin command sent over the socket.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum AdminCommand {
    /// Create a room
    AddRoom {
        name: String,
        capacity: u32,
        token: String,
    },
    /// Change name, capacity or token of a room
    UpdateRoom {
        id: RoomId,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        capacity: Option<u32>,
        #[serde(default)]
        token: Option<String>,
    },
    /// Delete an empty room
    RemoveRoom { id: RoomId },
    /// List all rooms
    ListRooms,
    /// Cards currently inside a room
    Presence { room_id: RoomId },
    /// Ping (health check)
    Ping,
}

/// Response from admin command.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdminResponse {
    Ok { message: String },
    Error { error: String },
    Room { room: Room },
    Rooms { rooms: Vec<Room> },
    List { items: Vec<String> },
    Pong,
}

impl AdminResponse {
    fn error(e: impl std::fmt::Display) -> Self {
        AdminResponse::Error {
            error: e.to_string(),
        }
    }
}

/// Admin socket server.
pub struct AdminSocket {
    storage: Arc<Storage>,
    socket_path: PathBuf,
    token_policy: TokenPolicy,
}

impl AdminSocket {
    /// Create a new admin socket server.
    pub fn new(storage: Arc<Storage>, socket_path: PathBuf, token_policy: TokenPolicy) -> Self {
        Self {
            storage,
            socket_path,
            token_policy,
        }
    }

    /// Run the admin socket server.
    pub async fn run(&self) -> Result<()> {
        // Remove stale socket file from a previous run
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        tracing::info!("Admin socket listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let storage = Arc::clone(&self.storage);
                    let policy = self.token_policy;
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, storage, policy).await {
                            tracing::error!("Admin connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept admin connection: {}", e);
                }
            }
        }
    }

    /// Get the socket path.
    pub fn socket_path(&self) -> &PathBuf {
        &self.socket_path
    }
}

async fn handle_connection(
    stream: UnixStream,
    storage: Arc<Storage>,
    policy: TokenPolicy,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let response = match serde_json::from_str::<AdminCommand>(&line) {
            Ok(cmd) => {
                let storage = Arc::clone(&storage);
                tokio::task::spawn_blocking(move || execute_command(cmd, &storage, &policy))
                    .await
                    .unwrap_or_else(AdminResponse::error)
            }
            Err(e) => AdminResponse::Error {
                error: format!("Invalid command: {}", e),
            },
        };

        let response_json = serde_json::to_string(&response)? + "\n";
        writer.write_all(response_json.as_bytes()).await?;
        line.clear();
    }

    Ok(())
}

fn add_room(
    storage: &Storage,
    policy: &TokenPolicy,
    name: String,
    capacity: u32,
    token: String,
) -> Result<Room> {
    let draft = Room::new(0, name, capacity, token);
    draft.validate(policy)?;
    storage.create_room(&draft.name, draft.capacity, &draft.token)
}

fn update_room(
    storage: &Storage,
    policy: &TokenPolicy,
    id: RoomId,
    patch: RoomPatch,
) -> Result<Room> {
    let mut candidate = storage
        .get_room(id)?
        .ok_or_else(|| Error::NotFound(format!("room {}", id)))?;
    patch.apply(&mut candidate);
    candidate.validate(policy)?;
    storage.update_room(id, &patch)
}

fn execute_command(cmd: AdminCommand, storage: &Storage, policy: &TokenPolicy) -> AdminResponse {
    match cmd {
        AdminCommand::AddRoom {
            name,
            capacity,
            token,
        } => match add_room(storage, policy, name, capacity, token) {
            Ok(room) => {
                tracing::info!("Added room {} ({})", room.id, room.name);
                AdminResponse::Room { room }
            }
            Err(e) => AdminResponse::error(e),
        },

        AdminCommand::UpdateRoom {
            id,
            name,
            capacity,
            token,
        } => {
            let patch = RoomPatch {
                name,
                capacity,
                token,
            };
            if patch.is_empty() {
                return AdminResponse::error("nothing to update");
            }
            match update_room(storage, policy, id, patch) {
                Ok(room) => {
                    tracing::info!("Updated room {}", room.id);
                    AdminResponse::Room { room }
                }
                Err(e) => AdminResponse::error(e),
            }
        }

        AdminCommand::RemoveRoom { id } => match storage.delete_room(id) {
            Ok(()) => {
                tracing::info!("Removed room {}", id);
                AdminResponse::Ok {
                    message: format!("Removed room {}", id),
                }
            }
            Err(e) => AdminResponse::error(e),
        },

        AdminCommand::ListRooms => match storage.list_rooms() {
            Ok(rooms) => AdminResponse::Rooms { rooms },
            Err(e) => AdminResponse::error(e),
        },

        AdminCommand::Presence { room_id } => match storage.get_room(room_id) {
            Ok(Some(_)) => match storage.list_members(room_id) {
                Ok(members) => AdminResponse::List {
                    items: members.into_iter().map(|m| m.card.to_string()).collect(),
                },
                Err(e) => AdminResponse::error(e),
            },
            Ok(None) => AdminResponse::error(Error::NotFound(format!("room {}", room_id))),
            Err(e) => AdminResponse::error(e),
        },

        AdminCommand::Ping => AdminResponse::Pong,
    }
}

/// Default socket path.
pub fn default_socket_path() -> PathBuf {
    let data_dir =
        std::env::var("ROOMWATCH_DATA_DIR").unwrap_or_else(|_| "./roomwatch-data".to_string());
    PathBuf::from(data_dir).join("admin.sock")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use roomwatch_core::{CardId, MembershipRecord};
    use tempfile::tempdir;

    fn add(storage: &Storage, name: &str, token: char) -> AdminResponse {
        execute_command(
            AdminCommand::AddRoom {
                name: name.into(),
                capacity: 30,
                token: token.to_string().repeat(32),
            },
            storage,
            &TokenPolicy::default(),
        )
    }

    #[test]
    fn add_and_list_rooms() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        assert!(matches!(add(&storage, "Lab 1", 'A'), AdminResponse::Room { .. }));
        assert!(matches!(add(&storage, "Lab 2", 'B'), AdminResponse::Room { .. }));

        match execute_command(AdminCommand::ListRooms, &storage, &TokenPolicy::default()) {
            AdminResponse::Rooms { rooms } => {
                assert_eq!(rooms.len(), 2);
                assert_eq!(rooms[1].name, "Lab 2");
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn add_room_validates_token_and_uniqueness() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        let short = execute_command(
            AdminCommand::AddRoom {
                name: "Lab".into(),
                capacity: 1,
                token: "short".into(),
            },
            &storage,
            &TokenPolicy::default(),
        );
        assert!(matches!(short, AdminResponse::Error { .. }));

        add(&storage, "Lab 1", 'A');
        assert!(matches!(add(&storage, "Lab 1 copy", 'A'), AdminResponse::Error { .. }));
    }

    #[test]
    fn update_room_rejects_empty_patch_and_bad_name() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        add(&storage, "Lab 1", 'A');

        let empty = AdminCommand::UpdateRoom {
            id: 1,
            name: None,
            capacity: None,
            token: None,
        };
        assert!(matches!(
            execute_command(empty, &storage, &TokenPolicy::default()),
            AdminResponse::Error { .. }
        ));

        let blank = AdminCommand::UpdateRoom {
            id: 1,
            name: Some(String::new()),
            capacity: None,
            token: None,
        };
        assert!(matches!(
            execute_command(blank, &storage, &TokenPolicy::default()),
            AdminResponse::Error { .. }
        ));

        let resize = AdminCommand::UpdateRoom {
            id: 1,
            name: None,
            capacity: Some(40),
            token: None,
        };
        match execute_command(resize, &storage, &TokenPolicy::default()) {
            AdminResponse::Room { room } => assert_eq!(room.capacity, 40),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn presence_lists_cards() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        add(&storage, "Lab 1", 'A');

        let txn = storage.begin();
        txn.put_membership(&MembershipRecord::new(CardId::new("C1").unwrap(), 1, Utc::now()))
            .unwrap();
        txn.commit().unwrap();

        match execute_command(AdminCommand::Presence { room_id: 1 }, &storage, &TokenPolicy::default()) {
            AdminResponse::List { items } => assert_eq!(items, vec!["C1".to_string()]),
            other => panic!("unexpected response: {:?}", other),
        }
        assert!(matches!(
            execute_command(AdminCommand::Presence { room_id: 9 }, &storage, &TokenPolicy::default()),
            AdminResponse::Error { .. }
        ));
    }

    #[test]
    fn command_wire_format() {
        let cmd: AdminCommand =
            serde_json::from_str(r#"{"cmd":"update_room","id":3,"capacity":10}"#).unwrap();
        assert!(matches!(
            cmd,
            AdminCommand::UpdateRoom { id: 3, capacity: Some(10), name: None, token: None }
        ));
        let pong = serde_json::to_string(&AdminResponse::Pong).unwrap();
        assert_eq!(pong, r#"{"status":"pong"}"#);
    }

    #[tokio::test]
    async fn socket_round_trip() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(Storage::open(dir.path().join("db")).unwrap());
        let socket_path = dir.path().join("admin.sock");
        let server = AdminSocket::new(storage, socket_path.clone(), TokenPolicy::default());
        tokio::spawn(async move {
            let _ = server.run().await;
        });

        let mut stream = None;
        for _ in 0..50 {
            if let Ok(s) = UnixStream::connect(&socket_path).await {
                stream = Some(s);
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        let stream = stream.expect("admin socket did not come up");
        let (reader, mut writer) = stream.into_split();
        writer.write_all(b"{\"cmd\":\"ping\"}\n").await.unwrap();

        let mut line = String::new();
        BufReader::new(reader).read_line(&mut line).await.unwrap();
        assert!(matches!(
            serde_json::from_str::<AdminResponse>(&line).unwrap(),
            AdminResponse::Pong
        ));
    }
}
