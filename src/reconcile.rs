use tracing::{debug, trace, warn};

use crate::config::ShapeConfig;
use crate::events::{ChangeSink, ShapeChange, ShapeSummary, Suspended};
use crate::ir::{Attachment, AttachmentKind, CaseHandles, CaseKey, ConnectionRef, SlotRole};
use crate::shape::BlockShape;

/// Drives a [`BlockShape`] from the host's drag events.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    pub config: ShapeConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingOutcome {
    pub else_added: bool,
    pub inserted_case: Option<CaseHandles>,
}

impl PendingOutcome {
    pub fn changed(&self) -> bool {
        self.else_added || self.inserted_case.is_some()
    }
}

impl Reconciler {
    pub fn new(config: ShapeConfig) -> Self {
        Self { config }
    }

    /// Speculative growth while a block hovers over `connection`.
    ///
    /// Safe to call once per pointer sample: a repeated call on unchanged
    /// state never adds slots.
    pub fn on_pending_connection(
        &self,
        shape: &mut BlockShape,
        connection: ConnectionRef,
    ) -> PendingOutcome {
        let mut outcome = PendingOutcome::default();

        if self.config.auto_else && connection.kind.is_statement_chaining() && !shape.has_else() {
            shape.append_else_slot(None);
            outcome.else_added = true;
            debug!(connection = connection.id.0, "added provisional else slot");
        }

        let Some(index) = shape.index_of(connection) else {
            trace!(connection = connection.id.0, "hover outside case slots");
            return outcome;
        };
        let hovered = &shape.slots()[index];
        if hovered.role != SlotRole::Condition || hovered.real_attachment().is_none() {
            return outcome;
        }

        let insert_at = index + 2;
        let needs_case = match shape.slots().get(insert_at) {
            None => true,
            Some(next) if next.role == SlotRole::Else => true,
            Some(next) => matches!(
                next.attachment,
                Some(Attachment {
                    kind: AttachmentKind::Preview,
                    ..
                })
            ),
        };
        if !needs_case {
            return outcome;
        }

        let key = shape.fresh_token();
        match shape.insert_case_pair_before(insert_at, key) {
            Ok(handles) => {
                debug!(index = insert_at, "inserted provisional case");
                outcome.inserted_case = Some(handles);
            }
            Err(err) => warn!(%err, "provisional case not inserted"),
        }
        outcome
    }

    /// Rebuilds the shape into canonical form from what is actually attached.
    ///
    /// Empty cases are dropped, survivors are renumbered `0..n` in their
    /// current order and keep their attachments. Preview attachments do not
    /// survive. `sink` sees the rebuild suspended, then one change report.
    pub fn finalize(&self, shape: &mut BlockShape, sink: &mut dyn ChangeSink) -> ShapeChange {
        let before = ShapeSummary::of(shape);
        {
            let _suspended = Suspended::new(&mut *sink);
            rebuild(shape);
        }
        let change = ShapeChange {
            before,
            after: ShapeSummary::of(shape),
        };
        debug!(
            cases = change.after.case_count,
            has_else = change.after.has_else,
            noop = change.is_noop(),
            "finalized shape"
        );
        sink.shape_changed(&change);
        change
    }
}

fn rebuild(shape: &mut BlockShape) {
    let case_slots = shape.case_count() * 2;
    let mut recorded = Vec::new();
    for index in (0..case_slots).step_by(2) {
        let condition = take_real(shape, index);
        let branch = take_real(shape, index + 1);
        if condition.is_none() && branch.is_none() {
            continue;
        }
        recorded.push((condition, branch));
    }
    let else_target = if shape.has_else() {
        let last = shape.slots().len() - 1;
        take_real(shape, last)
    } else {
        None
    };

    shape.remove_all_dynamic_slots();
    shape.rekey_first_case(CaseKey::Index(0));

    let mut recorded = recorded.into_iter();
    if let Some((condition, branch)) = recorded.next() {
        set_attachment(shape, 0, condition);
        set_attachment(shape, 1, branch);
    }
    for (offset, (condition, branch)) in recorded.enumerate() {
        shape.push_case(CaseKey::Index(offset + 1), condition, branch);
    }
    if let Some(target) = else_target {
        shape.append_else_slot(Some(target));
    }
}

fn take_real(shape: &mut BlockShape, index: usize) -> Option<Attachment> {
    let taken = shape.slot_at_mut(index)?.attachment.take()?;
    if taken.is_real() {
        Some(taken)
    } else {
        trace!(subtree = %taken.subtree, "dropping preview attachment");
        None
    }
}

fn set_attachment(shape: &mut BlockShape, index: usize, attachment: Option<Attachment>) {
    if let Some(slot) = shape.slot_at_mut(index) {
        slot.attachment = attachment;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, EventLog, NullSink};

    fn reconciler() -> Reconciler {
        Reconciler::default()
    }

    fn condition_ref(shape: &BlockShape, id: &str) -> ConnectionRef {
        shape.slot(id).unwrap().connection_ref()
    }

    #[test]
    fn hover_on_filled_condition_inserts_after_its_branch() {
        let mut shape = BlockShape::new();
        shape.attach("IF0", Attachment::real("cond")).unwrap();
        let target = condition_ref(&shape, "IF0");
        let outcome = reconciler().on_pending_connection(&mut shape, target);
        let handles = outcome.inserted_case.unwrap();
        assert!(!outcome.else_added);
        assert_eq!(shape.index_of(handles.condition), Some(2));
        assert_eq!(shape.case_count(), 2);
    }

    #[test]
    fn hover_on_empty_condition_does_nothing() {
        let mut shape = BlockShape::new();
        let target = condition_ref(&shape, "IF0");
        let outcome = reconciler().on_pending_connection(&mut shape, target);
        assert!(!outcome.changed());
        assert_eq!(shape.slot_ids(), vec!["IF0", "DO0"]);
    }

    #[test]
    fn preview_in_hovered_condition_is_not_a_fill() {
        let mut shape = BlockShape::new();
        shape.attach("IF0", Attachment::preview("marker")).unwrap();
        let target = condition_ref(&shape, "IF0");
        let outcome = reconciler().on_pending_connection(&mut shape, target);
        assert!(!outcome.changed());
    }

    #[test]
    fn repeated_hover_is_idempotent() {
        let mut shape = BlockShape::new();
        shape.attach("IF0", Attachment::real("cond")).unwrap();
        let target = condition_ref(&shape, "IF0");
        reconciler().on_pending_connection(&mut shape, target);
        let after_first = shape.slot_ids();
        let second = reconciler().on_pending_connection(&mut shape, target);
        assert!(!second.changed());
        assert_eq!(shape.slot_ids(), after_first);
    }

    #[test]
    fn statement_hover_adds_else_once() {
        let mut shape = BlockShape::new();
        let branch = shape.slot("DO0").unwrap().connection_ref();
        assert!(reconciler().on_pending_connection(&mut shape, branch).else_added);
        assert!(!reconciler().on_pending_connection(&mut shape, branch).else_added);
        assert_eq!(shape.slot_ids(), vec!["IF0", "DO0", "ELSE"]);
    }

    #[test]
    fn tail_hover_adds_else() {
        let mut shape = BlockShape::new();
        let tail = shape.tail_connection();
        let outcome = reconciler().on_pending_connection(&mut shape, tail);
        assert!(outcome.else_added);
        assert!(outcome.inserted_case.is_none());
        assert!(shape.has_else());
    }

    #[test]
    fn auto_else_can_be_disabled() {
        let mut shape = BlockShape::new();
        let reconciler = Reconciler::new(ShapeConfig {
            auto_else: false,
            ..ShapeConfig::default()
        });
        let tail = shape.tail_connection();
        assert!(!reconciler.on_pending_connection(&mut shape, tail).changed());
        assert!(!shape.has_else());
    }

    #[test]
    fn next_case_with_real_block_blocks_growth() {
        let mut shape = BlockShape::new();
        shape.insert_case_pair_before(2, CaseKey::Index(1)).unwrap();
        shape.attach("IF0", Attachment::real("a")).unwrap();
        shape.attach("IF1", Attachment::real("b")).unwrap();
        let target = condition_ref(&shape, "IF0");
        let outcome = reconciler().on_pending_connection(&mut shape, target);
        assert!(outcome.inserted_case.is_none());
        assert_eq!(shape.case_count(), 2);
    }

    #[test]
    fn next_case_holding_preview_still_grows() {
        let mut shape = BlockShape::new();
        shape.insert_case_pair_before(2, CaseKey::Index(1)).unwrap();
        shape.attach("IF0", Attachment::real("a")).unwrap();
        shape.attach("IF1", Attachment::preview("marker")).unwrap();
        let target = condition_ref(&shape, "IF0");
        let outcome = reconciler().on_pending_connection(&mut shape, target);
        assert!(outcome.inserted_case.is_some());
        assert_eq!(shape.case_count(), 3);
        assert_eq!(shape.slots()[4].id, "IF1");
    }

    #[test]
    fn growth_lands_before_else() {
        let mut shape = BlockShape::new();
        shape.append_else_slot(Some(Attachment::real("fallback")));
        shape.attach("IF0", Attachment::real("a")).unwrap();
        let target = condition_ref(&shape, "IF0");
        reconciler().on_pending_connection(&mut shape, target);
        assert_eq!(shape.slots().len(), 5);
        assert_eq!(shape.slots()[4].id, "ELSE");
    }

    #[test]
    fn finalize_fresh_block_keeps_first_case() {
        let mut shape = BlockShape::new();
        let change = reconciler().finalize(&mut shape, &mut NullSink);
        assert_eq!(shape.slot_ids(), vec!["IF0", "DO0"]);
        assert!(change.is_noop());
    }

    #[test]
    fn finalize_renumbers_and_prunes() {
        let mut shape = BlockShape::new();
        shape.insert_case_pair_before(2, CaseKey::Token("x".into())).unwrap();
        shape.insert_case_pair_before(4, CaseKey::Token("y".into())).unwrap();
        shape.attach("DO0", Attachment::real("s0")).unwrap();
        shape.attach("IFy", Attachment::real("c2")).unwrap();
        reconciler().finalize(&mut shape, &mut NullSink);
        assert_eq!(shape.slot_ids(), vec!["IF0", "DO0", "IF1", "DO1"]);
        assert_eq!(shape.slot("DO0").unwrap().attachment, Some(Attachment::real("s0")));
        assert_eq!(shape.slot("IF1").unwrap().attachment, Some(Attachment::real("c2")));
        assert_eq!(shape.slot("DO1").unwrap().attachment, None);
    }

    #[test]
    fn finalize_moves_attachments_into_first_case_when_it_was_empty() {
        let mut shape = BlockShape::new();
        shape.insert_case_pair_before(2, CaseKey::Index(1)).unwrap();
        shape.attach("IF1", Attachment::real("c")).unwrap();
        shape.attach("DO1", Attachment::real("s")).unwrap();
        reconciler().finalize(&mut shape, &mut NullSink);
        assert_eq!(shape.slot_ids(), vec!["IF0", "DO0"]);
        assert_eq!(shape.slot("IF0").unwrap().attachment, Some(Attachment::real("c")));
        assert_eq!(shape.slot("DO0").unwrap().attachment, Some(Attachment::real("s")));
    }

    #[test]
    fn finalize_drops_empty_else_and_previews() {
        let mut shape = BlockShape::new();
        shape.append_else_slot(Some(Attachment::preview("marker")));
        shape.attach("DO0", Attachment::preview("marker")).unwrap();
        reconciler().finalize(&mut shape, &mut NullSink);
        assert_eq!(shape.slot_ids(), vec!["IF0", "DO0"]);
        assert!(shape.slot("DO0").unwrap().attachment.is_none());
    }

    #[test]
    fn finalize_keeps_attached_else() {
        let mut shape = BlockShape::new();
        shape.append_else_slot(Some(Attachment::real("fallback")));
        reconciler().finalize(&mut shape, &mut NullSink);
        assert_eq!(
            shape.else_slot().and_then(|slot| slot.attachment.clone()),
            Some(Attachment::real("fallback"))
        );
    }

    #[test]
    fn finalize_reports_once_after_resuming() {
        let mut shape = BlockShape::new();
        shape.insert_case_pair_before(2, CaseKey::Index(1)).unwrap();
        let mut log = EventLog::new();
        reconciler().finalize(&mut shape, &mut log);
        assert_eq!(log.events.len(), 3);
        assert_eq!(log.events[0], Event::Disabled);
        assert_eq!(log.events[1], Event::Enabled);
        let change = log.changes().next().unwrap();
        assert_eq!(change.before.case_count, 2);
        assert_eq!(change.after.case_count, 1);
    }
}
