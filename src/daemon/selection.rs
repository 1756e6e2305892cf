//! Opening newly live rooms in the browser.
//!
//! The poll loop hands each cycle's batch of newly live rooms to a background
//! worker over a channel, so waiting on the user never delays the next poll.

use crate::common::types::{room_url, LiveRoom};
use colored::*;
use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;
use tracing::{error, info, warn};

/// Receives the rooms that went live in one cycle
pub trait SelectionHandler {
    fn offer(&self, rooms: Vec<LiveRoom>);
}

/// Open a room's page in the default browser
pub fn open_room(room_id: &str) -> bool {
    let url = room_url(room_id);
    match open::that(&url) {
        Ok(()) => {
            info!("Opened {}", url);
            true
        }
        Err(e) => {
            error!("Failed to open {}: {}", url, e);
            false
        }
    }
}

/// Decide which room to open. A single room needs no prompt; several rooms
/// get a numbered menu where `0` opens nothing.
pub fn choose_room<R: BufRead, W: Write>(
    rooms: &[LiveRoom],
    input: &mut R,
    output: &mut W,
) -> io::Result<Option<String>> {
    match rooms {
        [] => return Ok(None),
        [(room_id, _)] => return Ok(Some(room_id.clone())),
        _ => {}
    }

    writeln!(
        output,
        "\n{}",
        "Several streamers just went live. Pick a room to open:".bold()
    )?;
    for (i, (_, info)) in rooms.iter().enumerate() {
        writeln!(output, "{}. {} - {}", i + 1, info.owner_name, info.room_name)?;
    }
    writeln!(output, "0. Open nothing")?;
    write!(output, "Choice: ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    match line.trim().parse::<usize>() {
        Ok(0) => Ok(None),
        Ok(n) if n <= rooms.len() => Ok(Some(rooms[n - 1].0.clone())),
        Ok(_) => {
            writeln!(output, "{}", "Invalid choice".red())?;
            Ok(None)
        }
        Err(_) => {
            writeln!(output, "{}", "Please enter a number".red())?;
            Ok(None)
        }
    }
}

/// Background worker that prompts on the terminal and opens the chosen room
pub struct BrowserSelector {
    tx: mpsc::Sender<Vec<LiveRoom>>,
}

impl BrowserSelector {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<Vec<LiveRoom>>();
        thread::spawn(move || {
            // Ends once the poll loop drops its sender
            for batch in rx {
                let stdin = io::stdin();
                let mut input = stdin.lock();
                let mut output = io::stdout();
                match choose_room(&batch, &mut input, &mut output) {
                    Ok(Some(room_id)) => {
                        open_room(&room_id);
                    }
                    Ok(None) => {}
                    Err(e) => error!("Room selection failed: {}", e),
                }
            }
        });
        Self { tx }
    }
}

impl SelectionHandler for BrowserSelector {
    fn offer(&self, rooms: Vec<LiveRoom>) {
        if self.tx.send(rooms).is_err() {
            warn!("Room selection worker is gone, skipping");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::{InfoSource, RoomInfo};
    use std::io::Cursor;

    fn live(room_id: &str, owner: &str) -> LiveRoom {
        (
            room_id.to_string(),
            RoomInfo {
                room_id: room_id.to_string(),
                room_name: format!("{}'s room", owner),
                owner_name: owner.to_string(),
                live: true,
                source: InfoSource::OpenApi,
            },
        )
    }

    fn choose(rooms: &[LiveRoom], typed: &str) -> (Option<String>, String) {
        let mut input = Cursor::new(typed.as_bytes().to_vec());
        let mut output = Vec::new();
        let choice = choose_room(rooms, &mut input, &mut output).unwrap();
        (choice, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_single_room_opens_without_prompt() {
        let (choice, printed) = choose(&[live("1", "Alice")], "");
        assert_eq!(choice.as_deref(), Some("1"));
        assert!(printed.is_empty());
    }

    #[test]
    fn test_menu_lists_every_room() {
        let (choice, printed) = choose(&[live("1", "Alice"), live("2", "Bob")], "2\n");
        assert_eq!(choice.as_deref(), Some("2"));
        assert!(printed.contains("1. Alice - Alice's room"));
        assert!(printed.contains("2. Bob - Bob's room"));
        assert!(printed.contains("0. Open nothing"));
    }

    #[test]
    fn test_zero_opens_nothing() {
        let (choice, _) = choose(&[live("1", "Alice"), live("2", "Bob")], "0\n");
        assert_eq!(choice, None);
    }

    #[test]
    fn test_out_of_range_and_garbage() {
        let rooms = [live("1", "Alice"), live("2", "Bob")];
        let (choice, printed) = choose(&rooms, "7\n");
        assert_eq!(choice, None);
        assert!(printed.contains("Invalid choice"));

        let (choice, printed) = choose(&rooms, "abc\n");
        assert_eq!(choice, None);
        assert!(printed.contains("Please enter a number"));
    }

    #[test]
    fn test_empty_batch() {
        assert_eq!(choose(&[], "1\n").0, None);
    }
}
