use crate::config::load_config;
use crate::mutation::{export_extra_state, export_mutation};
use crate::reconcile::Reconciler;
use crate::render::{render_outline, write_output};
use crate::script::{Replay, Session};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "ifshape",
    version,
    about = "Replay drag sessions against a dynamic if/else-if/else block"
)]
pub struct Args {
    /// Session file (.json/.json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "xml")]
    pub output_format: OutputFormat,

    /// Config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Show the outline or event log as replayed, skipping the export finalize
    #[arg(long = "no-finalize")]
    pub no_finalize: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Canonical `<mutation>` element
    Xml,
    /// JSON extra state
    Json,
    /// Slot-by-slot listing
    Outline,
    /// Host event log
    Events,
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let input = read_input(args.input.as_deref())?;
    let session = Session::parse(&input)?;
    let mut replay = session.replay(&config.shape)?;
    let reconciler = Reconciler::new(config.shape);

    let text = render_replay(&mut replay, &reconciler, args.output_format, args.no_finalize)?;
    write_output(&text, args.output.as_deref())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn render_replay(
    replay: &mut Replay,
    reconciler: &Reconciler,
    format: OutputFormat,
    no_finalize: bool,
) -> Result<String> {
    let text = match format {
        OutputFormat::Xml => export_mutation(&mut replay.shape, reconciler, &mut replay.events)
            .map(|xml| xml + "\n")
            .unwrap_or_default(),
        OutputFormat::Json => {
            let state = export_extra_state(&mut replay.shape, reconciler, &mut replay.events);
            serde_json::to_string_pretty(&state)? + "\n"
        }
        OutputFormat::Outline => {
            if !no_finalize {
                reconciler.finalize(&mut replay.shape, &mut replay.events);
            }
            render_outline(&replay.shape)
        }
        OutputFormat::Events => {
            if !no_finalize {
                reconciler.finalize(&mut replay.shape, &mut replay.events);
            }
            serde_json::to_string_pretty(&replay.events.events)? + "\n"
        }
    };
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShapeConfig;

    fn replay(text: &str) -> Replay {
        Session::parse(text)
            .unwrap()
            .replay(&ShapeConfig::default())
            .unwrap()
    }

    const SESSION: &str = r#"{"steps": [
        {"op": "attach", "slot": "IF0", "block": "a"},
        {"op": "hover", "slot": "IF0"},
        {"op": "hover_next"}
    ]}"#;

    #[test]
    fn xml_output_is_finalized() {
        let mut replay = replay(SESSION);
        let text =
            render_replay(&mut replay, &Reconciler::default(), OutputFormat::Xml, false).unwrap();
        assert_eq!(text, "");
        assert_eq!(replay.shape.slot_ids(), vec!["IF0", "DO0"]);
    }

    #[test]
    fn outline_can_skip_finalize() {
        let mut replay = replay(SESSION);
        let text =
            render_replay(&mut replay, &Reconciler::default(), OutputFormat::Outline, true)
                .unwrap();
        assert_eq!(text.lines().count(), 5);
        assert!(replay.events.events.is_empty());
    }

    #[test]
    fn json_output_for_else_block() {
        let mut replay = replay(
            r#"{"mutation": "<mutation else=\"1\"/>",
                "steps": [{"op": "attach", "slot": "ELSE", "block": "b"}]}"#,
        );
        let text =
            render_replay(&mut replay, &Reconciler::default(), OutputFormat::Json, false).unwrap();
        assert_eq!(text, "{\n  \"hasElse\": true\n}\n");
    }

    #[test]
    fn events_output_lists_suspension() {
        let mut replay = replay(r#"{"steps": []}"#);
        let text =
            render_replay(&mut replay, &Reconciler::default(), OutputFormat::Events, false)
                .unwrap();
        let events: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(events[0]["event"], "disabled");
        assert_eq!(events[1]["event"], "enabled");
        assert_eq!(events[2]["event"], "shape_changed");
    }
}
