#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod ir;
pub mod mutation;
pub mod reconcile;
pub mod render;
pub mod script;
pub mod shape;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, ShapeConfig, load_config};
pub use error::{MutationError, ScriptError, ShapeError};
pub use events::{ChangeSink, EventLog, NullSink, ShapeChange, ShapeSummary};
pub use ir::{
    Attachment, AttachmentKind, CaseHandles, CaseKey, ConnectionId, ConnectionKind, ConnectionRef,
    Slot, SlotRole, SubtreeId,
};
pub use mutation::{
    ExtraState, ShapeDescriptor, export_extra_state, export_mutation, parse_mutation_element,
};
pub use reconcile::{PendingOutcome, Reconciler};
pub use render::render_outline;
pub use script::{Replay, Session, Step};
pub use shape::{BlockShape, CaseView};
