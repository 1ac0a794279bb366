//! Interactive inspector over a loaded heap image.

use std::io::Write;

use lexp::{Inspector, SnapshotHost};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::commands::{run_dump, run_print, run_render};

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Render(String),
    Dump { expr: String, indent: usize },
    Print(String),
    Symbols,
    Help,
    Quit,
}

const HELP: &str = "\
Commands:
  render <expr>          one-line rendering of a value
  dump <expr> [indent]   structure dump, one line per node
  print <expr>           Lisp notation
  symbols                list named roots
  help                   show this message
  quit                   leave
<expr> is a symbol name, cell[N], cell[N + 1] or a 0x word literal.
A bare <expr> is the same as `render <expr>`.";

/// Parse one input line. A trailing number after `dump <expr>` is the indent.
pub fn parse_command(line: &str) -> Result<ReplCommand, String> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((h, r)) => (h, r.trim()),
        None => (line, ""),
    };
    let need_expr = |what: &str| {
        if rest.is_empty() {
            Err(format!("{what}: missing expression"))
        } else {
            Ok(rest.to_string())
        }
    };
    match head {
        "quit" | "exit" | "(exit)" => Ok(ReplCommand::Quit),
        "help" | "?" => Ok(ReplCommand::Help),
        "symbols" => Ok(ReplCommand::Symbols),
        "render" | "p" => need_expr("render").map(ReplCommand::Render),
        "print" => need_expr("print").map(ReplCommand::Print),
        "dump" => {
            let rest = need_expr("dump")?;
            if let Some((expr, last)) = rest.rsplit_once(char::is_whitespace) {
                if let Ok(indent) = last.parse::<usize>() {
                    return Ok(ReplCommand::Dump {
                        expr: expr.trim().to_string(),
                        indent,
                    });
                }
            }
            Ok(ReplCommand::Dump {
                expr: rest,
                indent: 0,
            })
        }
        _ => Ok(ReplCommand::Render(line.to_string())),
    }
}

/// Run one command. Returns `false` when the session should end.
pub fn execute<W: Write>(
    inspector: &Inspector<SnapshotHost>,
    command: ReplCommand,
    out: &mut W,
) -> Result<bool, String> {
    match command {
        ReplCommand::Render(expr) => run_render(inspector, &expr, out)?,
        ReplCommand::Dump { expr, indent } => run_dump(inspector, &expr, indent, out)?,
        ReplCommand::Print(expr) => run_print(inspector, &expr, out)?,
        ReplCommand::Symbols => {
            for (name, word) in inspector.host().symbols().iter() {
                writeln!(out, "{name} = {word}").map_err(|e| e.to_string())?;
            }
        }
        ReplCommand::Help => writeln!(out, "{HELP}").map_err(|e| e.to_string())?,
        ReplCommand::Quit => return Ok(false),
    }
    Ok(true)
}

pub fn run(inspector: &Inspector<SnapshotHost>) -> Result<(), String> {
    println!("lexpscope");
    println!("Type `help` for commands, `quit` to leave");
    println!();

    let mut rl = DefaultEditor::new().map_err(|e| e.to_string())?;
    let stdout = std::io::stdout();

    loop {
        match rl.readline("lexp> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);
                let result = parse_command(line)
                    .and_then(|cmd| execute(inspector, cmd, &mut stdout.lock()));
                match result {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => eprintln!("Error: {e}"),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.to_string()),
        }
    }
    Ok(())
}
