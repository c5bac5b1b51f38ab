//! Replayable drag sessions.
//!
//! A session names an initial persisted shape and a list of host events,
//! which makes a drag reproducible outside the editor:
//!
//! ```json
//! {
//!   "mutation": "<mutation elseif=\"1\"></mutation>",
//!   "steps": [
//!     { "op": "attach", "slot": "IF0", "block": "is_ready" },
//!     { "op": "hover", "slot": "IF0" },
//!     { "op": "attach", "slot": "IFp1", "block": "marker", "preview": true },
//!     { "op": "finalize" }
//!   ]
//! }
//! ```

use serde::Deserialize;
use tracing::debug;

use crate::config::ShapeConfig;
use crate::error::{ScriptError, ShapeError};
use crate::events::EventLog;
use crate::ir::{Attachment, AttachmentKind, SubtreeId};
use crate::mutation::{ShapeDescriptor, parse_mutation_element};
use crate::reconcile::{PendingOutcome, Reconciler};
use crate::shape::BlockShape;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub mutation: Option<String>,
    #[serde(default)]
    pub extra_state: Option<serde_json::Value>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Attach {
        slot: String,
        block: String,
        #[serde(default)]
        preview: bool,
    },
    Detach {
        slot: String,
    },
    Hover {
        slot: String,
    },
    HoverNext,
    Finalize,
}

#[derive(Debug)]
pub struct Replay {
    pub shape: BlockShape,
    pub events: EventLog,
    pub hovers: Vec<PendingOutcome>,
}

impl Session {
    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        match serde_json::from_str(text) {
            Ok(session) => Ok(session),
            Err(json_err) => {
                json5::from_str(text).map_err(|_| ScriptError::Syntax(json_err.to_string()))
            }
        }
    }

    pub fn initial_shape(&self, config: &ShapeConfig) -> Result<BlockShape, ScriptError> {
        let descriptor = if let Some(xml) = &self.mutation {
            ShapeDescriptor::from_attributes(&parse_mutation_element(xml)?, config)
        } else if let Some(state) = &self.extra_state {
            ShapeDescriptor::from_extra_state(state, config)?
        } else {
            ShapeDescriptor::default()
        };
        Ok(descriptor.build())
    }

    pub fn replay(&self, config: &ShapeConfig) -> Result<Replay, ScriptError> {
        let reconciler = Reconciler::new(config.clone());
        let mut shape = self.initial_shape(config)?;
        let mut events = EventLog::new();
        let mut hovers = Vec::new();

        for (step, op) in self.steps.iter().enumerate() {
            let fail = |source: ShapeError| ScriptError::Step { step, source };
            match op {
                Step::Attach {
                    slot,
                    block,
                    preview,
                } => {
                    let attachment = Attachment {
                        subtree: SubtreeId::new(block.as_str()),
                        kind: if *preview {
                            AttachmentKind::Preview
                        } else {
                            AttachmentKind::Real
                        },
                    };
                    shape.attach(slot, attachment).map_err(fail)?;
                }
                Step::Detach { slot } => {
                    shape.detach(slot).map_err(fail)?;
                }
                Step::Hover { slot } => {
                    let target = shape
                        .slot(slot)
                        .map(|slot| slot.connection_ref())
                        .ok_or_else(|| fail(ShapeError::UnknownSlot(slot.clone())))?;
                    hovers.push(reconciler.on_pending_connection(&mut shape, target));
                }
                Step::HoverNext => {
                    let target = shape.tail_connection();
                    hovers.push(reconciler.on_pending_connection(&mut shape, target));
                }
                Step::Finalize => {
                    reconciler.finalize(&mut shape, &mut events);
                }
            }
            debug!(step, slots = shape.slots().len(), "replayed step");
        }

        Ok(Replay {
            shape,
            events,
            hovers,
        })
    }
}
