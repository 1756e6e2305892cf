mod common;
mod daemon;
mod resolver;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use common::http::{HttpClient, ReqwestClient};
use common::logging::init_logging;
use common::names::NameCache;
use common::persistence::{
    add_room_ids, load_push_key, load_room_ids, remove_room_ids, save_push_key, save_room_ids,
    ConfigPaths,
};
use daemon::notifier::{CommandNotifier, NotificationDispatcher, PushRelay, APP_NAME};
use daemon::poller::PollLoop;
use daemon::selection::{BrowserSelector, SelectionHandler};
use daemon::state::{MonitorConfig, MonitorContext, DEFAULT_INTERVAL};
use resolver::RoomInfoResolver;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "douyu-watch")]
#[command(about = "Desktop and push alerts when Douyu streamers go live or offline")]
struct Args {
    /// Directory holding room_ids.json, room_names.json and server_chan.json
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Show debug output on the console
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the configured rooms and notify on changes (default)
    Watch(WatchArgs),

    /// Edit the list of monitored rooms
    Rooms {
        #[command(subcommand)]
        action: RoomsAction,
    },

    /// Configure ServerChan push notifications
    Push {
        #[command(subcommand)]
        action: PushAction,
    },

    /// Look up one room and print what was found
    Check {
        room_id: String,
    },
}

#[derive(clap::Args, Debug, Default)]
struct WatchArgs {
    /// Seconds between checks (default: 60)
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// Never open live rooms in the browser
    #[arg(long)]
    no_open: bool,

    /// Skip push notifications even if a key is configured
    #[arg(long)]
    no_push: bool,
}

#[derive(Subcommand, Debug)]
enum RoomsAction {
    /// Show the monitored rooms
    List,
    /// Add one or more room ids
    Add {
        #[arg(required = true)]
        room_ids: Vec<String>,
    },
    /// Remove one or more room ids
    Remove {
        #[arg(required = true)]
        room_ids: Vec<String>,
    },
    /// Remove every room
    Clear,
}

#[derive(Subcommand, Debug)]
enum PushAction {
    /// Store the ServerChan send key
    SetKey { key: String },
    /// Forget the stored key
    Clear,
    /// Send a test message with the stored key
    Test,
}

fn print_rooms(room_ids: &[String]) {
    if room_ids.is_empty() {
        println!("{}", "No rooms configured".dimmed());
        return;
    }
    for (i, room_id) in room_ids.iter().enumerate() {
        println!("{}. {}", i + 1, room_id);
    }
}

fn rooms(paths: &ConfigPaths, action: RoomsAction) -> Result<()> {
    let path = paths.room_ids();
    let mut room_ids = load_room_ids(&path);

    match action {
        RoomsAction::List => {
            print_rooms(&room_ids);
            return Ok(());
        }
        RoomsAction::Add { room_ids: new_ids } => {
            let added = add_room_ids(&mut room_ids, &new_ids);
            if added.is_empty() {
                println!("{}", "Nothing added: ids were blank or already present".yellow());
            }
            for id in &added {
                println!("{} {}", "Added".green(), id);
            }
        }
        RoomsAction::Remove { room_ids: to_remove } => {
            let missing = remove_room_ids(&mut room_ids, &to_remove);
            for id in &missing {
                println!("{} {}", "Not monitored:".yellow(), id);
            }
        }
        RoomsAction::Clear => room_ids.clear(),
    }

    save_room_ids(&path, &room_ids)?;
    println!("Saved {} room(s) to {}", room_ids.len(), path.display());
    print_rooms(&room_ids);
    Ok(())
}

fn push(paths: &ConfigPaths, action: PushAction) -> Result<()> {
    let path = paths.push_key();
    match action {
        PushAction::SetKey { key } => {
            let key = key.trim();
            if key.is_empty() {
                bail!("Push key must not be empty");
            }
            save_push_key(&path, Some(key))?;
            println!("{}", "Push key saved".green());
        }
        PushAction::Clear => {
            save_push_key(&path, None)?;
            println!("Push key cleared");
        }
        PushAction::Test => {
            let Some(key) = load_push_key(&path) else {
                bail!("No push key configured. Set one with `douyu-watch push set-key <KEY>`");
            };
            let http: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new()?);
            PushRelay::new(key, http)
                .push(
                    &format!("{} - test message", APP_NAME),
                    "If you received this, push notifications are working!",
                )
                .context("Push test failed")?;
            println!("{}", "Push test succeeded".green());
        }
    }
    Ok(())
}

fn check(paths: &ConfigPaths, room_id: &str) -> Result<()> {
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new()?);
    let resolver = RoomInfoResolver::new(http).context("Invalid page pattern")?;
    let names = NameCache::load(&paths.room_names());
    let info = resolver.resolve(room_id, &names);

    let status = if info.live {
        "live".green().bold()
    } else {
        "offline".dimmed()
    };
    println!("Room:   {} ({})", info.room_name, info.room_id);
    println!("Owner:  {}", info.owner_name);
    println!("Status: {}", status);
    println!("Source: {}", info.source);
    Ok(())
}

/// Watching nothing is a setup mistake, not an idle run
fn require_rooms(room_ids: Vec<String>) -> Result<Vec<String>> {
    if room_ids.is_empty() {
        bail!("No rooms configured. Add some with `douyu-watch rooms add <ROOM_ID>`");
    }
    Ok(room_ids)
}

fn watch(paths: &ConfigPaths, args: WatchArgs) -> Result<()> {
    let room_ids = require_rooms(load_room_ids(&paths.room_ids()))?;

    let mut config = MonitorConfig::new(room_ids);
    config.interval = args
        .interval
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_INTERVAL);
    config.auto_open = !args.no_open;
    config.push_key = if args.no_push {
        None
    } else {
        load_push_key(&paths.push_key())
    };

    let http: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new()?);
    let resolver = RoomInfoResolver::new(http.clone()).context("Invalid page pattern")?;
    let relay = config
        .push_key
        .clone()
        .map(|key| PushRelay::new(key, http.clone()));
    let dispatcher = NotificationDispatcher::new(Box::new(CommandNotifier::default()), relay);
    let selector = config
        .auto_open
        .then(|| Box::new(BrowserSelector::spawn()) as Box<dyn SelectionHandler>);

    // Set up signal handler for graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl-C handler")?;

    println!(
        "Watching {} room(s): {}",
        config.room_ids.len(),
        config.room_ids.join(", ").bold()
    );
    println!(
        "Auto-open: {}  Push: {}  Log: {}",
        if config.auto_open { "on" } else { "off" },
        if config.push_key.is_some() { "on" } else { "off" },
        paths.log_file().display()
    );
    println!("{}", "Press Ctrl+C to stop".dimmed());

    let names = NameCache::load(&paths.room_names());
    tracing::debug!("Loaded {} cached room name(s)", names.len());
    let mut ctx = MonitorContext::new(config, names, Some(paths.room_names()));
    PollLoop::new(&mut ctx, resolver, dispatcher, selector).run(&running);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let paths = ConfigPaths::resolve(args.config_dir);
    init_logging(&paths.log_file(), args.verbose);

    match args.command.unwrap_or(Command::Watch(WatchArgs::default())) {
        Command::Watch(watch_args) => watch(&paths, watch_args),
        Command::Rooms { action } => rooms(&paths, action),
        Command::Push { action } => push(&paths, action),
        Command::Check { room_id } => check(&paths, &room_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_watch() {
        let args = Args::try_parse_from(["douyu-watch"]).unwrap();
        assert!(args.command.is_none());
    }

    #[test]
    fn test_watch_flags() {
        let args =
            Args::try_parse_from(["douyu-watch", "watch", "-i", "30", "--no-open"]).unwrap();
        match args.command {
            Some(Command::Watch(w)) => {
                assert_eq!(w.interval, Some(30));
                assert!(w.no_open);
                assert!(!w.no_push);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(Args::try_parse_from(["douyu-watch", "watch", "-i", "0"]).is_err());
    }

    #[test]
    fn test_rooms_add_requires_ids() {
        assert!(Args::try_parse_from(["douyu-watch", "rooms", "add"]).is_err());
        let args = Args::try_parse_from(["douyu-watch", "rooms", "add", "1", "2"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Command::Rooms {
                action: RoomsAction::Add { ref room_ids }
            }) if room_ids.len() == 2
        ));
    }

    #[test]
    fn test_global_config_dir() {
        let args =
            Args::try_parse_from(["douyu-watch", "push", "test", "--config-dir", "/tmp/x"])
                .unwrap();
        assert_eq!(args.config_dir, Some(PathBuf::from("/tmp/x")));
    }

    #[test]
    fn test_empty_room_list_is_fatal() {
        let err = require_rooms(Vec::new()).unwrap_err();
        assert!(err.to_string().contains("rooms add"));
        assert_eq!(
            require_rooms(vec!["63136".to_string()]).unwrap(),
            vec!["63136".to_string()]
        );
    }

    #[test]
    fn test_watch_without_rooms_fails_before_polling() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::resolve(Some(dir.path().to_path_buf()));
        assert!(watch(&paths, WatchArgs::default()).is_err());
    }
}
