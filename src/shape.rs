use crate::error::ShapeError;
use crate::ir::{
    Attachment, CaseHandles, CaseKey, ConnectionId, ConnectionKind, ConnectionRef, Slot, SlotRole,
};

/// Ordered slot list of one conditional block.
///
/// Slots always start with the mandatory first case; an else slot, when
/// present, is last. Counts are derived from the list on every call.
#[derive(Debug, Clone)]
pub struct BlockShape {
    slots: Vec<Slot>,
    tail: ConnectionId,
    next_connection: u64,
    next_token: u64,
}

/// Borrowed view of one condition/branch pair.
#[derive(Debug, Clone, Copy)]
pub struct CaseView<'a> {
    pub condition: &'a Slot,
    pub branch: &'a Slot,
}

impl CaseView<'_> {
    pub fn key(&self) -> Option<&CaseKey> {
        self.condition.key.as_ref()
    }

    pub fn is_populated(&self) -> bool {
        self.condition.real_attachment().is_some() || self.branch.real_attachment().is_some()
    }
}

impl BlockShape {
    pub fn new() -> Self {
        let mut shape = Self {
            slots: Vec::new(),
            tail: ConnectionId(0),
            next_connection: 1,
            next_token: 0,
        };
        let condition = shape.make_slot(SlotRole::Condition, Some(CaseKey::Index(0)));
        let branch = shape.make_slot(SlotRole::Branch, Some(CaseKey::Index(0)));
        shape.slots.push(condition);
        shape.slots.push(branch);
        shape
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, id: &str) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.id == id)
    }

    /// Position of the slot owning `connection`, if it belongs to this block's slots.
    pub fn index_of(&self, connection: ConnectionRef) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.connection == connection.id)
    }

    /// The block's own next-statement connection.
    pub fn tail_connection(&self) -> ConnectionRef {
        ConnectionRef {
            id: self.tail,
            kind: ConnectionKind::Next,
        }
    }

    pub fn case_count(&self) -> usize {
        self.case_slot_count() / 2
    }

    pub fn else_if_count(&self) -> usize {
        self.case_count().saturating_sub(1)
    }

    pub fn has_else(&self) -> bool {
        self.else_slot().is_some()
    }

    pub fn else_slot(&self) -> Option<&Slot> {
        self.slots.last().filter(|slot| slot.role == SlotRole::Else)
    }

    pub fn cases(&self) -> impl Iterator<Item = CaseView<'_>> {
        self.slots[..self.case_slot_count()]
            .chunks_exact(2)
            .map(|pair| CaseView {
                condition: &pair[0],
                branch: &pair[1],
            })
    }

    pub fn slot_ids(&self) -> Vec<String> {
        self.slots.iter().map(|slot| slot.id.clone()).collect()
    }

    /// Inserts a condition/branch pair in front of the slot at `index`.
    ///
    /// `index` must be a case boundary: never inside a pair, never ahead of
    /// the first case and never behind the else slot.
    pub fn insert_case_pair_before(
        &mut self,
        index: usize,
        key: CaseKey,
    ) -> Result<CaseHandles, ShapeError> {
        let max = self.case_slot_count();
        if index < 2 || index > max || index % 2 != 0 {
            return Err(ShapeError::InvalidInsertIndex { index, max });
        }
        for role in [SlotRole::Condition, SlotRole::Branch] {
            let id = format!("{}{}", role.prefix(), key);
            if self.slot(&id).is_some() {
                return Err(ShapeError::DuplicateSlot(id));
            }
        }
        let condition = self.make_slot(SlotRole::Condition, Some(key.clone()));
        let branch = self.make_slot(SlotRole::Branch, Some(key));
        let handles = CaseHandles {
            condition: condition.connection_ref(),
            branch: branch.connection_ref(),
        };
        self.slots.insert(index, branch);
        self.slots.insert(index, condition);
        Ok(handles)
    }

    /// Drops every slot behind the mandatory first case.
    pub fn remove_all_dynamic_slots(&mut self) {
        self.slots.truncate(2);
    }

    /// Appends the else slot, or returns the existing one untouched.
    pub fn append_else_slot(&mut self, target: Option<Attachment>) -> &Slot {
        if !self.has_else() {
            let mut slot = self.make_slot(SlotRole::Else, None);
            slot.attachment = target;
            self.slots.push(slot);
        }
        &self.slots[self.slots.len() - 1]
    }

    /// Records a host connection, returning whatever it displaced.
    pub fn attach(
        &mut self,
        slot_id: &str,
        attachment: Attachment,
    ) -> Result<Option<Attachment>, ShapeError> {
        let slot = self.slot_mut(slot_id)?;
        Ok(slot.attachment.replace(attachment))
    }

    pub fn detach(&mut self, slot_id: &str) -> Result<Option<Attachment>, ShapeError> {
        let slot = self.slot_mut(slot_id)?;
        Ok(slot.attachment.take())
    }

    /// A provisional key no slot on this block uses yet.
    pub fn fresh_token(&mut self) -> CaseKey {
        loop {
            self.next_token += 1;
            let key = CaseKey::Token(format!("p{}", self.next_token));
            if self.slot(&format!("IF{key}")).is_none() && self.slot(&format!("DO{key}")).is_none()
            {
                return key;
            }
        }
    }

    pub(crate) fn slot_at_mut(&mut self, index: usize) -> Option<&mut Slot> {
        self.slots.get_mut(index)
    }

    /// Appends a case behind the existing ones; the caller keeps keys unique.
    pub(crate) fn push_case(
        &mut self,
        key: CaseKey,
        condition: Option<Attachment>,
        branch: Option<Attachment>,
    ) {
        let at = self.case_slot_count();
        let mut condition_slot = self.make_slot(SlotRole::Condition, Some(key.clone()));
        condition_slot.attachment = condition;
        let mut branch_slot = self.make_slot(SlotRole::Branch, Some(key));
        branch_slot.attachment = branch;
        self.slots.insert(at, branch_slot);
        self.slots.insert(at, condition_slot);
    }

    /// Renames the mandatory first case, keeping its connections.
    pub(crate) fn rekey_first_case(&mut self, key: CaseKey) {
        for (slot, role) in self.slots.iter_mut().zip([SlotRole::Condition, SlotRole::Branch]) {
            slot.id = format!("{}{}", role.prefix(), key);
            slot.key = Some(key.clone());
        }
    }

    fn case_slot_count(&self) -> usize {
        if self.has_else() {
            self.slots.len() - 1
        } else {
            self.slots.len()
        }
    }

    fn slot_mut(&mut self, slot_id: &str) -> Result<&mut Slot, ShapeError> {
        self.slots
            .iter_mut()
            .find(|slot| slot.id == slot_id)
            .ok_or_else(|| ShapeError::UnknownSlot(slot_id.to_string()))
    }

    fn make_slot(&mut self, role: SlotRole, key: Option<CaseKey>) -> Slot {
        let connection = ConnectionId(self.next_connection);
        self.next_connection += 1;
        Slot::new(role, key, connection)
    }
}

impl Default for BlockShape {
    fn default() -> Self {
        Self::new()
    }
}
