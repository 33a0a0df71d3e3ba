//! Command-line entry point: `samtext [-v] [+cmd] [--] [file ...]`.
//!
//! Terminal UI drawing and key decoding are out of scope for this core
//! (see `editor::Editor`'s doc comment); this binary drives the core
//! through a line-oriented loop reading `:`-commands from standard input,
//! which is enough to exercise open/edit/write/sam end to end without a
//! curses layer.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use samtext::editor::Editor;

struct Args {
    files: Vec<String>,
    startup_cmd: Option<String>,
    print_version: bool,
}

fn parse_args(argv: impl Iterator<Item = String>) -> Args {
    let mut files = Vec::new();
    let mut startup_cmd = None;
    let mut print_version = false;
    let mut opts_done = false;
    for arg in argv {
        if !opts_done && arg == "--" {
            opts_done = true;
            continue;
        }
        if !opts_done && arg == "-v" {
            print_version = true;
            continue;
        }
        if !opts_done && arg.starts_with('+') {
            startup_cmd = Some(arg[1..].to_string());
            continue;
        }
        files.push(arg);
    }
    Args { files, startup_cmd, print_version }
}

fn run() -> Result<(), String> {
    let args = parse_args(std::env::args().skip(1));
    if args.print_version {
        println!("samtext {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut editor = Editor::new();
    for path in &args.files {
        if path == "-" {
            let mut bytes = Vec::new();
            io::Read::read_to_end(&mut io::stdin(), &mut bytes).map_err(|e| e.to_string())?;
            editor.load_stdin(&bytes).map_err(|e| e.to_string())?;
            continue;
        }
        editor.open_file(path).map_err(|e| e.to_string())?;
    }

    if let Some(cmd) = &args.startup_cmd {
        editor.run_startup_command(cmd, 0).map_err(|e| e.to_string())?;
    }

    let stdin = io::stdin();
    let mut timestamp = 1u64;
    for line in stdin.lock().lines() {
        let line = line.map_err(|e| e.to_string())?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match editor.execute_line(line, timestamp) {
            Ok(_) => {}
            Err(e) => eprintln!("{e}"),
        }
        timestamp += 1;
        if editor.should_quit {
            break;
        }
        io::stdout().flush().ok();
    }
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("samtext: {e}");
            ExitCode::FAILURE
        }
    }
}
