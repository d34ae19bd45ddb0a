//! lyre CLI: terminal front end for the lyre player.
//!
//! usage: lyre [--config <file>] [--headless] [track ...]
//!
//! Commands (one per line on stdin):
//!   play | p            Toggle play/pause
//!   next | n            Next track (wraps)
//!   prev | b            Previous track (wraps)
//!   loop | l            Toggle looping the current track
//!   seek <percent>      Jump to a position, 0-100
//!   select <n>          Make track n current (1-based)
//!   list | now          Redraw playlist and status
//!   playlist            Show/hide the playlist
//!   state               Print the player state as JSON
//!   help                Show commands
//!   quit | q            Exit

mod terminal;

use std::io::BufRead;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use lyre_core::effects::probe::probe_track;
use lyre_core::effects::ticker::ThreadTicker;
use lyre_core::{ControllerOptions, MediaBackend, NoopBackend, PlayerConfig, PlayerController, PlayerEvent, Track};

use terminal::TerminalView;

/// Everything the event loop can receive.
#[derive(Debug, Clone, PartialEq)]
enum Input {
    Player(PlayerEvent),
    State,
    Help,
    Quit,
}

#[derive(Debug, Default, PartialEq)]
struct CliOptions {
    config: Option<String>,
    headless: bool,
    help: bool,
    tracks: Vec<String>,
}

impl CliOptions {
    fn parse(args: &[String]) -> Result<Self, String> {
        let mut opts = CliOptions::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    let path = iter.next().ok_or("--config needs a file")?;
                    opts.config = Some(path.clone());
                }
                "--headless" => opts.headless = true,
                "--help" | "-h" => opts.help = true,
                flag if flag.starts_with("--") => return Err(format!("unknown option: {}", flag)),
                track => opts.tracks.push(track.to_string()),
            }
        }
        Ok(opts)
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let opts = match CliOptions::parse(&args) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("{}", e);
            print_usage();
            std::process::exit(2);
        }
    };
    if opts.help {
        print_usage();
        return;
    }

    let config = match load_config(&opts) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("lyre: {}", e);
            std::process::exit(1);
        }
    };

    let (tx, rx) = mpsc::channel();
    spawn_stdin_reader(tx.clone());
    let ticker = ThreadTicker::new(tx, Input::Player(PlayerEvent::Tick));

    if opts.headless {
        run(&config, NoopBackend, ticker, rx);
    } else {
        run(&config, lyre_core::effects::audio::AudioEffect::new(), ticker, rx);
    }
}

fn load_config(opts: &CliOptions) -> lyre_core::PlayerResult<PlayerConfig> {
    let mut config = match &opts.config {
        Some(path) => PlayerConfig::load(path)?,
        None => PlayerConfig::from_env()?,
    };
    if !opts.tracks.is_empty() {
        config.tracks = opts.tracks.clone();
        config.start_index = 0;
    }
    config.validate()?;
    Ok(config)
}

/// Local files are probed for artist and title; anything else keeps its name.
fn build_tracks(config: &PlayerConfig) -> Vec<Track> {
    config
        .tracks
        .iter()
        .map(|source| {
            if Path::new(source).is_file() {
                let probed = probe_track(source);
                Track::with_title(source.as_str(), probed.label())
            } else {
                Track::from_source(source)
            }
        })
        .collect()
}

fn run<B: MediaBackend>(config: &PlayerConfig, backend: B, ticker: ThreadTicker<Input>, rx: Receiver<Input>) {
    let view = TerminalView::new(std::io::stdout());
    let mut player = match PlayerController::new(
        build_tracks(config),
        ControllerOptions::from(config),
        backend,
        view,
        ticker,
    ) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("lyre: {}", e);
            return;
        }
    };
    player.view_mut().print_message("type `help` for commands");

    for input in rx.iter() {
        match input {
            Input::Quit => break,
            Input::Help => player.view_mut().print_message(HELP),
            Input::State => {
                let json = serde_json::to_string_pretty(&player.snapshot()).unwrap_or_default();
                player.view_mut().print_message(&json);
            }
            Input::Player(PlayerEvent::Render) => {
                player.render();
                player.view_mut().print_playlist();
            }
            Input::Player(event) => player.dispatch(event),
        }
    }
    println!();
}

fn spawn_stdin_reader(tx: Sender<Input>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    log::warn!("lyre: stdin read failed: {}", e);
                    break;
                }
            };
            match parse_command(&line) {
                Ok(Some(input)) => {
                    if tx.send(input).is_err() {
                        return;
                    }
                }
                Ok(None) => {}
                Err(msg) => eprintln!("{}", msg),
            }
        }
        let _ = tx.send(Input::Quit);
    });
}

/// Parse one stdin line. Blank lines are `Ok(None)`.
fn parse_command(line: &str) -> Result<Option<Input>, String> {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let input = match cmd.to_lowercase().as_str() {
        "play" | "pause" | "p" => Input::Player(PlayerEvent::PlayPause),
        "next" | "n" => Input::Player(PlayerEvent::Next),
        "prev" | "previous" | "b" => Input::Player(PlayerEvent::Previous),
        "loop" | "l" => Input::Player(PlayerEvent::ToggleLoop),
        "playlist" => Input::Player(PlayerEvent::TogglePlaylist),
        "list" | "now" => Input::Player(PlayerEvent::Render),
        "seek" => {
            let percent: f64 = arg
                .and_then(|a| a.trim_end_matches('%').parse().ok())
                .ok_or("usage: seek <percent>")?;
            Input::Player(PlayerEvent::Seek { fraction: percent / 100.0 })
        }
        "select" | "s" => {
            let n: usize = arg
                .and_then(|a| a.parse().ok())
                .filter(|&n| n >= 1)
                .ok_or("usage: select <n>  (1-based)")?;
            Input::Player(PlayerEvent::SelectTrack { index: n - 1 })
        }
        "state" => Input::State,
        "help" | "?" => Input::Help,
        "quit" | "q" | "exit" => Input::Quit,
        other => return Err(format!("unknown command: {} (try `help`)", other)),
    };
    Ok(Some(input))
}

const HELP: &str = "\
commands:
  play | p            Toggle play/pause
  next | n            Next track
  prev | b            Previous track
  loop | l            Toggle loop
  seek <percent>      Jump to position (0-100)
  select <n>          Make track n current
  list | now          Redraw playlist and status
  playlist            Show/hide playlist
  state               Print player state as JSON
  quit | q            Exit";

fn print_usage() {
    println!("lyre - terminal music player");
    println!();
    println!("usage: lyre [--config <file>] [--headless] [track ...]");
    println!();
    println!("  --config <file>   JSON player config (default: $LYRE_CONFIG, then built-in)");
    println!("  --headless        No audio output; state and display only");
    println!();
    println!("{}", HELP);
}
