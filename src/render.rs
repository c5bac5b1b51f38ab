use crate::ir::{AttachmentKind, SlotRole};
use crate::shape::BlockShape;
use anyhow::Result;
use std::io::Write;
use std::path::Path;

/// One line per slot: role, slot id, and what is attached.
pub fn render_outline(shape: &BlockShape) -> String {
    let width = shape
        .slots()
        .iter()
        .map(|slot| slot.id.len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for slot in shape.slots() {
        let role = match slot.role {
            SlotRole::Condition => "if",
            SlotRole::Branch => "do",
            SlotRole::Else => "else",
        };
        let target = match &slot.attachment {
            None => "(empty)".to_string(),
            Some(attachment) => match attachment.kind {
                AttachmentKind::Real => attachment.subtree.to_string(),
                AttachmentKind::Preview => format!("{} (preview)", attachment.subtree),
            },
        };
        out.push_str(&format!("{role:<4} {:<width$}  {target}\n", slot.id));
    }
    out
}

pub fn write_output(text: &str, output: Option<&Path>) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, text)?;
    } else {
        let mut stdout = std::io::stdout();
        stdout.write_all(text.as_bytes())?;
    }
    Ok(())
}
