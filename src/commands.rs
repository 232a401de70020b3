//! Command execution.

use crate::config::{Config, OutputFormat};
use crate::engine::Engine;
use crate::Commands;
use colored::Colorize;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use tablefsm_core::{IndexedMachine, NamedMachine, StateChange};
use tablefsm_document::{DocumentWriter, ParserConfig, TransitionDocument};

/// Executes a command and returns the formatted output.
pub fn execute(config: &Config, cmd: Commands) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        Commands::Repl { .. } => Err("the repl command runs interactively".into()),

        Commands::Check { file } => {
            let doc = read_document(&file, &config.parser)?;
            let indexed = IndexedMachine::from_document(&doc, config.engine.message_offset)?;
            let named = NamedMachine::from_document(&doc)?;

            Ok(format!(
                "{} {}: {} states, {} messages, {} transitions, initial {} (checksum: {})",
                "OK".green(),
                file.display().to_string().cyan(),
                indexed.num_states(),
                indexed.num_messages(),
                named.to_document()?.transition_count(),
                doc.initial.yellow(),
                doc.checksum()?
            ))
        }

        Commands::Normalize { file, output } => {
            let doc = read_document(&file, &config.parser)?;
            emit(config, &doc, output.as_deref(), None)
        }

        Commands::Convert { file, to, output } => {
            let doc = read_document(&file, &config.parser)?;
            emit(config, &doc, output.as_deref(), Some(to))
        }

        Commands::Run {
            file,
            engine,
            messages,
        } => {
            let doc = read_document(&file, &config.parser)?;
            let mut engine_config = config.engine.clone();
            if let Some(kind) = engine {
                engine_config.kind = kind;
            }
            let mut engine = Engine::load(&doc, &engine_config)?;
            run_messages(&mut engine, &messages)
        }

        Commands::Merge {
            base,
            fragments,
            output,
        } => {
            let mut machine = NamedMachine::from_document(&read_document(&base, &config.parser)?)?;
            for fragment in &fragments {
                let doc = read_document(fragment, &config.parser)?;
                machine.add_state_machine(&doc)?;
                tracing::info!("Merged {}", fragment.display());
            }
            emit(config, &machine.to_document()?, output.as_deref(), None)
        }
    }
}

/// Reads a document, choosing JSON or YAML from the file extension.
pub fn read_document(
    path: &Path,
    parser: &ParserConfig,
) -> Result<TransitionDocument, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {}", path.display(), e))?;
    let doc = match OutputFormat::from_path(path) {
        OutputFormat::Json => TransitionDocument::parse_json(&text, parser)?,
        OutputFormat::Yaml => TransitionDocument::parse_yaml(&text, parser)?,
    };
    tracing::debug!(
        "Loaded {} ({} states, {} messages)",
        path.display(),
        doc.state_names.len(),
        doc.message_names.len()
    );
    Ok(doc)
}

/// Renders a document in canonical form.
pub fn render(
    doc: &TransitionDocument,
    format: OutputFormat,
    include_empty_blocks: bool,
) -> Result<String, tablefsm_document::DocumentError> {
    let tree = DocumentWriter::new()
        .with_empty_blocks(include_empty_blocks)
        .write(doc);
    match format {
        OutputFormat::Json => tree.to_json_string(),
        OutputFormat::Yaml => tree.to_yaml_string(),
    }
}

/// Writes a document to `output` or returns it for stdout.
///
/// The format is `format` if given, else the output file's extension, else
/// the configured output format.
fn emit(
    config: &Config,
    doc: &TransitionDocument,
    output: Option<&Path>,
    format: Option<OutputFormat>,
) -> Result<String, Box<dyn std::error::Error>> {
    let format = format
        .or_else(|| output.map(OutputFormat::from_path))
        .unwrap_or(config.output.format);
    let text = render(doc, format, config.output.include_empty_blocks)?;

    match output {
        Some(path) => {
            std::fs::write(path, &text)
                .map_err(|e| format!("failed to write '{}': {}", path.display(), e))?;
            Ok(format!(
                "{} {} (checksum: {})",
                "Wrote".green(),
                path.display().to_string().cyan(),
                doc.checksum()?
            ))
        }
        None => Ok(text),
    }
}

/// Sends messages in order and reports every state change.
pub fn run_messages(
    engine: &mut Engine,
    messages: &[String],
) -> Result<String, Box<dyn std::error::Error>> {
    let changes: Rc<RefCell<Vec<StateChange<String>>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = changes.clone();
    engine.on_state_changed(move |change| sink.borrow_mut().push(change.clone()));

    let mut lines = vec![format!("{} {}", "Start".bold(), engine.current().yellow())];
    for message in messages {
        if !engine.has_message(message) {
            lines.push(format!("  {} {}", "Unknown message".red(), message));
            continue;
        }
        if engine.send(message) {
            if let Some(change) = changes.borrow().last() {
                lines.push(format!(
                    "  {} {} → {}",
                    message.cyan(),
                    change.old,
                    change.new.yellow()
                ));
            }
        } else {
            lines.push(format!("  {} {}", message.cyan(), "(no transition)".dimmed()));
        }
    }
    lines.push(format!(
        "{} {} (prev: {}, {} transitions)",
        "End".bold(),
        engine.current().yellow(),
        engine.prev(),
        changes.borrow().len()
    ));
    Ok(lines.join("\n"))
}
