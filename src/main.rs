//! Blockwise - load, edit and check block documents from the command line.
//!
//! # Usage
//!
//! ```bash
//! blockwise doc.json
//! blockwise --types quote.json --apply edits.json --pretty doc.json
//! blockwise --report doc.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use serde_json::Value;

use blockwise::block::{BlockId, BlockType};
use blockwise::builtin;
use blockwise::config::{
    ConfigFlags, clear_config_flags, global_config_path, load_config_flags, local_override_path,
    parse_flag_tokens, save_config_flags,
};
use blockwise::editor::{Editor, EditorState, SequentialIds};
use blockwise::perf;

/// Load a block document, apply edits and check it against its block types
#[derive(Parser, Debug)]
#[command(name = "blockwise", version, about, long_about = None)]
struct Cli {
    /// Persisted document (JSON)
    #[arg(value_name = "STATE")]
    state: PathBuf,

    /// Register block types from a JSON array of descriptors (repeatable)
    #[arg(long, value_name = "FILE")]
    types: Vec<PathBuf>,

    /// Do not register the built-in text and image types
    #[arg(long)]
    no_builtins: bool,

    /// Apply a JSON array of editor commands before mounting
    #[arg(long, value_name = "SCRIPT")]
    apply: Option<PathBuf>,

    /// Print the validation report instead of refusing invalid documents
    #[arg(long)]
    report: bool,

    /// Write the resulting document here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Print timing for dispatch and mount
    #[arg(long)]
    perf: bool,

    /// Write a JSON-lines journal of dispatches, subscriber failures and mounts
    #[arg(long, value_name = "PATH")]
    debug_log: Option<PathBuf>,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

/// One step of an `--apply` script.
#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
enum Command {
    Create {
        name: String,
        #[serde(default)]
        after: Option<BlockId>,
    },
    Delete {
        id: BlockId,
    },
    Update {
        id: BlockId,
        data: Value,
    },
    UpdateState {
        id: BlockId,
        state: Value,
    },
    Focus {
        id: BlockId,
    },
    Blur,
    ShowToolbar {
        #[serde(default)]
        after: Option<BlockId>,
    },
    HideToolbar,
    CreateFromToolbar {
        name: String,
    },
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {what} {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {what} {}", path.display()))
}

/// New ids continue after the largest numeric id so that scripts can refer
/// to the blocks they create. `None` when that id is already `u64::MAX`.
fn first_free_id(state: &EditorState) -> Option<u64> {
    state
        .ids()
        .filter_map(|id| match id {
            BlockId::Number(n) => Some(*n),
            BlockId::OtherNumber(_) | BlockId::Text(_) => None,
        })
        .max()
        .map_or(Some(1), |max| max.checked_add(1))
}

fn apply(editor: &mut Editor, command: Command) -> Result<()> {
    match command {
        Command::Create { name, after } => {
            let id = editor.create_block(&name, after)?;
            tracing::info!(%id, name = %name, "created block");
        }
        Command::Delete { id } => editor.delete_block(id)?,
        Command::Update { id, data } => editor.update_block(id, data)?,
        Command::UpdateState { id, state } => editor.update_block_state(id, state)?,
        Command::Focus { id } => editor.focus_block(id)?,
        Command::Blur => editor.blur_block(),
        Command::ShowToolbar { after } => editor.show_toolbar(after)?,
        Command::HideToolbar => editor.hide_toolbar(),
        Command::CreateFromToolbar { name } => {
            let id = editor.create_from_toolbar(&name)?;
            tracing::info!(%id, name = %name, "created block from toolbar");
        }
    }
    Ok(())
}

/// The validation report with `report`, otherwise the mounted document.
fn render(editor: &mut Editor, report: bool, pretty: bool) -> Result<String> {
    let mut text = if report {
        to_json(&editor.validate_all()?, pretty)?
    } else {
        to_json(
            editor.mount().context("Refusing to mount document")?,
            pretty,
        )?
    };
    text.push('\n');
    Ok(text)
}

fn to_json(value: &impl serde::Serialize, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}

fn write_output(out: Option<&Path>, text: &str) -> Result<()> {
    match out {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    perf::set_enabled(effective.perf);
    let debug_log_path = effective
        .debug_log
        .clone()
        .or_else(|| std::env::var_os("BLOCKWISE_DEBUG_LOG").map(PathBuf::from));
    if let Err(err) = perf::open_journal(debug_log_path.as_deref()) {
        tracing::warn!(
            "Failed to open journal {}: {err}",
            debug_log_path
                .as_ref()
                .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string())
        );
    }

    let state: EditorState = read_json(&cli.state, "document")?;
    let first_id = first_free_id(&state);
    let mut editor = Editor::with_state(state);
    match first_id {
        Some(first) => editor = editor.with_id_source(SequentialIds::starting_at(first)),
        None => tracing::warn!("numeric ids are used up; new blocks get clock ids"),
    }
    editor.subscribe(|state: &EditorState, action| {
        tracing::debug!(action = action.kind(), blocks = state.len(), "state changed");
        Ok(())
    });

    if !effective.no_builtins {
        for block_type in builtin::all() {
            editor.register_block_type(block_type)?;
        }
    }
    for path in &effective.types {
        let descriptors: Vec<BlockType> = read_json(path, "block types")?;
        for block_type in descriptors {
            editor
                .register_block_type(block_type)
                .with_context(|| format!("In block types {}", path.display()))?;
        }
    }

    if let Some(script) = &cli.apply {
        let commands: Vec<Command> = read_json(script, "script")?;
        for (step, command) in commands.into_iter().enumerate() {
            apply(&mut editor, command)
                .with_context(|| format!("Script {} step {}", script.display(), step + 1))?;
        }
    }

    let text = render(&mut editor, cli.report, effective.pretty)?;
    write_output(cli.out.as_deref(), &text)
}
