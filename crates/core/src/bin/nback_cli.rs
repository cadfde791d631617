//! CLI client for the `nbackd` daemon.
//!
//! Examples:
//!   nback-cli status
//!   nback-cli start
//!   nback-cli respond 1
//!   nback-cli theme light
//!   nback-cli export
//!   nback-cli watch
//!
//! By default it talks to 127.0.0.1:9876; override with `--addr host:port`
//! or `NBACKD_ADDR`.

use nback::clock::SessionEvent;
use nback::codec;
use nback::engine::StimulusFrame;
use nback::session::{SessionSnapshot, Verdict};
use nback::settings::Settings;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::process;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum Request {
    GetState,
    GetSettings,
    StartSession { settings: Option<Settings> },
    StopSession,
    Respond { box_index: usize },
    KeyPress { key: String },
    ExportSettings,
    ImportSettings { token: String },
    SetIntensity { intensity: u32 },
    SetThemePreset { preset: String },
    Subscribe,
    Shutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
#[allow(clippy::large_enum_variant)]
enum Response {
    State(Box<SessionSnapshot>),
    Settings { settings: Settings },
    SettingsToken { token: String },
    Frame { frame: StimulusFrame },
    Verdict { verdict: Verdict, message: String },
    Event { event: SessionEvent },
    Success { message: String },
    Error { message: String },
}

fn usage() -> ! {
    eprintln!("nback-cli (talks to nbackd @ 127.0.0.1:9876 by default)");
    eprintln!("Usage: nback-cli [--addr host:port] <command> [args]\n");
    eprintln!("Commands:");
    eprintln!("  status                      Show session state");
    eprintln!("  settings                    Show current settings");
    eprintln!("  start [token]               Start a session (optionally with exported settings)");
    eprintln!("  stop                        Stop the session");
    eprintln!("  respond <box>               Claim a match in box <box> (1-based)");
    eprintln!("  key <k>                     Send a keypress (1-9 claim boxes 1-9)");
    eprintln!("  export                      Print the settings token");
    eprintln!("  import <token>              Replace settings from a token");
    eprintln!("  intensity <0-100>           Set background intensity");
    eprintln!("  theme <amoled|dark|light>   Apply a theme preset");
    eprintln!("  watch                       Stream frame and hide events");
    eprintln!("  shutdown                    Save and exit daemon");
    process::exit(1);
}

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        usage();
    }

    let mut addr = std::env::var("NBACKD_ADDR").unwrap_or_else(|_| "127.0.0.1:9876".to_string());
    if args.len() >= 2 && args[0] == "--addr" {
        addr = args[1].clone();
        args.drain(0..2);
    }

    if args.is_empty() {
        usage();
    }

    (addr, args)
}

fn connect(addr: &str, req: &Request) -> Result<(TcpStream, BufReader<TcpStream>), String> {
    let mut stream = TcpStream::connect(addr).map_err(|e| format!("connect: {e}"))?;
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .map_err(|e| format!("set_read_timeout: {e}"))?;
    let reader = BufReader::new(stream.try_clone().map_err(|e| format!("clone: {e}"))?);

    let line = serde_json::to_string(req).map_err(|e| format!("serialize: {e}"))?;
    stream
        .write_all(line.as_bytes())
        .and_then(|_| stream.write_all(b"\n"))
        .map_err(|e| format!("send: {e}"))?;
    Ok((stream, reader))
}

fn read_response(reader: &mut BufReader<TcpStream>) -> Result<Option<Response>, String> {
    let mut resp_line = String::new();
    let n = reader
        .read_line(&mut resp_line)
        .map_err(|e| format!("recv: {e}"))?;
    if n == 0 {
        return Ok(None);
    }
    serde_json::from_str(&resp_line)
        .map(Some)
        .map_err(|e| format!("parse response: {e}"))
}

fn send_request(addr: &str, req: &Request) -> Result<Response, String> {
    let (_stream, mut reader) = connect(addr, req)?;
    read_response(&mut reader)?.ok_or_else(|| "recv: connection closed".to_string())
}

/// Subscribe and print events until the daemon hangs up.
fn watch(addr: &str) -> Result<(), String> {
    let (stream, mut reader) = connect(addr, &Request::Subscribe)?;
    match read_response(&mut reader)? {
        Some(Response::Success { message }) => println!("{message}"),
        Some(Response::Error { message }) => return Err(message),
        other => return Err(format!("unexpected response: {other:?}")),
    }
    stream
        .set_read_timeout(None)
        .map_err(|e| format!("set_read_timeout: {e}"))?;

    while let Some(resp) = read_response(&mut reader)? {
        match resp {
            Response::Event { event } => print_event(&event),
            other => println!("{other:?}"),
        }
    }
    Ok(())
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::Frame { turn, cells } => {
            let lit: Vec<String> = cells
                .iter()
                .enumerate()
                .map(|(b, c)| format!("{}:{}", b + 1, c))
                .collect();
            println!("turn {turn:>4}  {}", lit.join(" "));
        }
        SessionEvent::Hide {
            turn,
            box_index,
            cell,
        } => println!("turn {turn:>4}  hide box {} cell {}", box_index + 1, cell),
        SessionEvent::Stopped => println!("stopped"),
    }
}

fn print_settings(s: &Settings) {
    println!(
        "n={} grid={}x{} res={} intensity={} interval={}ms flash={}ms",
        s.n, s.grid_rows, s.grid_cols, s.grid_res, s.intensity, s.interval_ms, s.flash_ms,
    );
}

fn print_state(s: SessionSnapshot) {
    let turn = s
        .turn
        .map(|t| t.to_string())
        .unwrap_or_else(|| "-".to_string());
    let pct = |v: Option<f32>| {
        v.map(|r| format!("{:.1}%", r * 100.0))
            .unwrap_or_else(|| "-".to_string())
    };
    println!(
        "running={} turn={} steps={} responses={} correct={} incorrect={} acc={} recent={}",
        s.running,
        turn,
        s.step,
        s.stats.responses,
        s.stats.correct,
        s.stats.incorrect,
        pct(s.stats.accuracy()),
        pct(s.stats.recent_rate()),
    );
    print!("settings: ");
    print_settings(&s.settings);
    if s.session_settings != s.settings {
        print!("session:  ");
        print_settings(&s.session_settings);
    }
    if let Some(frame) = s.last_frame {
        println!("last frame: turn={} cells={:?}", frame.turn, frame.cells);
    }
}

fn main() {
    let (addr, args) = parse_args();
    let cmd = &args[0];

    let make_error = |msg: &str| -> ! {
        eprintln!("{}", msg);
        process::exit(1);
    };

    let req = match cmd.as_str() {
        "status" => Request::GetState,
        "settings" => Request::GetSettings,
        "start" => {
            let settings = args.get(1).map(|token| {
                codec::decode(token).unwrap_or_else(|e| make_error(&format!("token: {e}")))
            });
            Request::StartSession { settings }
        }
        "stop" => Request::StopSession,
        "respond" => {
            if args.len() < 2 {
                usage();
            }
            let box_number: usize = args[1]
                .parse()
                .unwrap_or_else(|_| make_error("box must be a number starting at 1"));
            if box_number == 0 {
                make_error("box numbers start at 1");
            }
            Request::Respond {
                box_index: box_number - 1,
            }
        }
        "key" => {
            if args.len() < 2 {
                usage();
            }
            Request::KeyPress {
                key: args[1].clone(),
            }
        }
        "export" => Request::ExportSettings,
        "import" => {
            if args.len() < 2 {
                usage();
            }
            Request::ImportSettings {
                token: args[1].clone(),
            }
        }
        "intensity" => {
            if args.len() < 2 {
                usage();
            }
            let intensity = args[1]
                .parse::<u32>()
                .unwrap_or_else(|_| make_error("intensity must be a number (0-100)"));
            Request::SetIntensity { intensity }
        }
        "theme" => {
            if args.len() < 2 {
                usage();
            }
            Request::SetThemePreset {
                preset: args[1].clone(),
            }
        }
        "watch" => {
            if let Err(e) = watch(&addr) {
                eprintln!("Failed: {e}");
                process::exit(1);
            }
            process::exit(0);
        }
        "shutdown" => Request::Shutdown,
        _ => usage(),
    };

    match send_request(&addr, &req) {
        Ok(Response::State(s)) => print_state(*s),
        Ok(Response::Settings { settings }) => print_settings(&settings),
        Ok(Response::SettingsToken { token }) => println!("{token}"),
        Ok(Response::Frame { frame }) => {
            println!("started: turn={} cells={:?}", frame.turn, frame.cells)
        }
        Ok(Response::Verdict { verdict, message }) => {
            if verdict.is_refused() {
                eprintln!("Refused: {message}");
                process::exit(2);
            }
            println!("{message}");
        }
        Ok(Response::Event { event }) => print_event(&event),
        Ok(Response::Success { message }) => println!("{message}"),
        Ok(Response::Error { message }) => {
            eprintln!("Error: {message}");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Failed: {e}");
            process::exit(1);
        }
    }
}
