//! Interactive REPL.

use crate::commands::render;
use crate::config::Config;
use crate::engine::Engine;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config as EditorConfig, Editor};
use std::path::Path;

const HELP_TEXT: &str = r#"
Available commands:
  help                      Show this help

  send <message>...         Send one or more messages
  force <state>             Move to a state without a transition
  reset                     Return to the initial state

  state                     Show current and previous state
  states                    List all states
  messages                  List all messages
  transitions               List transitions out of the current state

  show                      Print the machine as a document
  checksum                  Print the document checksum

  quit, exit                Exit the REPL
"#;

pub fn run(path: &Path, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let doc = crate::commands::read_document(path, &config.parser)?;
    let mut engine = Engine::load(&doc, &config.engine)?;

    println!("{}", "tablefsm REPL".bold().cyan());
    println!(
        "Loaded {} ({:?} engine, {} states)",
        path.display(),
        engine.kind(),
        engine.states().len()
    );

    let editor_config = EditorConfig::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(editor_config)?;

    let history_path = std::env::var("HOME")
        .map(|h| std::path::PathBuf::from(h).join(".tablefsm_history"))
        .unwrap_or_else(|_| ".tablefsm_history".into());
    let _ = rl.load_history(&history_path);

    println!("Type 'help' for available commands.\n");

    loop {
        let prompt = format!("{} ", format!("{}>", engine.current()).cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match execute_repl_command(&mut engine, config, line) {
                    Ok(Some(output)) => println!("{}\n", output),
                    Ok(None) => break,
                    Err(e) => println!("{}: {}\n", "Error".red(), e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);

    Ok(())
}

/// Runs one REPL line. Returns `None` when the session should end.
fn execute_repl_command(
    engine: &mut Engine,
    config: &Config,
    line: &str,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.is_empty() {
        return Ok(Some(String::new()));
    }

    let cmd = parts[0].to_lowercase();
    let args = &parts[1..];

    match cmd.as_str() {
        "help" | "?" => Ok(Some(HELP_TEXT.to_string())),

        "quit" | "exit" | "q" => Ok(None),

        "send" | "s" => {
            if args.is_empty() {
                return Ok(Some("Usage: send <message>...".to_string()));
            }
            let mut output = Vec::new();
            for message in args {
                if !engine.has_message(message) {
                    output.push(format!("{} {}", "Unknown message".red(), message));
                    continue;
                }
                let from = engine.current();
                if engine.send(message) {
                    output.push(format!(
                        "{} {} → {}",
                        message.cyan(),
                        from,
                        engine.current().yellow()
                    ));
                } else {
                    output.push(format!("{} {}", message.cyan(), "(no transition)".dimmed()));
                }
            }
            Ok(Some(output.join("\n")))
        }

        "force" | "f" => {
            let Some(state) = args.first() else {
                return Ok(Some("Usage: force <state>".to_string()));
            };
            if !engine.has_state(state) {
                return Ok(Some(format!("{} {}", "Unknown state".red(), state)));
            }
            let from = engine.current();
            if engine.force(state) {
                Ok(Some(format!("{} → {}", from, engine.current().yellow())))
            } else {
                Ok(Some(format!("Already in {}", state.yellow())))
            }
        }

        "reset" | "r" => {
            engine.reset();
            Ok(Some(format!("{} {}", "Reset to".green(), engine.current().yellow())))
        }

        "state" => Ok(Some(format!(
            "  Current: {}\n  Previous: {}",
            engine.current().yellow(),
            engine.prev()
        ))),

        "states" => Ok(Some(list(engine.states()))),

        "messages" => Ok(Some(list(engine.messages()))),

        "transitions" | "t" => {
            let outgoing = engine.outgoing();
            if outgoing.is_empty() {
                return Ok(Some("No transitions".yellow().to_string()));
            }
            Ok(Some(
                outgoing
                    .iter()
                    .map(|(message, target)| format!("  {} → {}", message.cyan(), target))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ))
        }

        "show" => {
            let doc = engine.to_document()?;
            Ok(Some(render(
                &doc,
                config.output.format,
                config.output.include_empty_blocks,
            )?))
        }

        "checksum" => Ok(Some(engine.to_document()?.checksum()?)),

        _ => Ok(Some(format!(
            "Unknown command: {}. Type 'help' for help.",
            cmd
        ))),
    }
}

fn list(names: Vec<String>) -> String {
    names
        .iter()
        .map(|name| format!("  {}", name))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablefsm_document::TransitionDocument;

    fn session() -> (Engine, Config) {
        colored::control::set_override(false);
        let mut doc = TransitionDocument::new("Idle")
            .with_states(["Idle", "Walking"])
            .with_messages(["Walk", "Stop"]);
        doc.add_transition("Idle", "Walk", "Walking")
            .add_transition("Walking", "Stop", "Idle");
        let config = Config::default();
        (Engine::load(&doc, &config.engine).unwrap(), config)
    }

    fn run_line(engine: &mut Engine, config: &Config, line: &str) -> Option<String> {
        execute_repl_command(engine, config, line).unwrap()
    }

    #[test]
    fn test_send_and_state() {
        let (mut engine, config) = session();
        let out = run_line(&mut engine, &config, "send Walk Walk Jump").unwrap();
        assert_eq!(
            out,
            "Walk Idle → Walking\nWalk (no transition)\nUnknown message Jump"
        );
        let out = run_line(&mut engine, &config, "state").unwrap();
        assert!(out.contains("Current: Walking"));
        assert!(out.contains("Previous: Idle"));
    }

    #[test]
    fn test_force_and_reset() {
        let (mut engine, config) = session();
        assert_eq!(
            run_line(&mut engine, &config, "force Walking").unwrap(),
            "Idle → Walking"
        );
        assert_eq!(
            run_line(&mut engine, &config, "force Walking").unwrap(),
            "Already in Walking"
        );
        assert!(run_line(&mut engine, &config, "force Nowhere")
            .unwrap()
            .contains("Unknown state"));
        assert_eq!(
            run_line(&mut engine, &config, "reset").unwrap(),
            "Reset to Idle"
        );
    }

    #[test]
    fn test_inspection() {
        let (mut engine, config) = session();
        assert_eq!(
            run_line(&mut engine, &config, "transitions").unwrap(),
            "  Walk → Walking"
        );
        assert_eq!(
            run_line(&mut engine, &config, "states").unwrap(),
            "  Idle\n  Walking"
        );
        let checksum = run_line(&mut engine, &config, "checksum").unwrap();
        assert_eq!(checksum.len(), 8);
        let shown = run_line(&mut engine, &config, "show").unwrap();
        assert!(shown.contains("StateMachine"));
    }

    #[test]
    fn test_quit_and_unknown() {
        let (mut engine, config) = session();
        assert!(run_line(&mut engine, &config, "EXIT").is_none());
        assert!(run_line(&mut engine, &config, "fly")
            .unwrap()
            .starts_with("Unknown command"));
    }
}
