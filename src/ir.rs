use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotRole {
    Condition,
    Branch,
    Else,
}

impl SlotRole {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Condition => "IF",
            Self::Branch => "DO",
            Self::Else => "ELSE",
        }
    }

    pub fn connection_kind(self) -> ConnectionKind {
        match self {
            Self::Condition => ConnectionKind::Value,
            Self::Branch | Self::Else => ConnectionKind::Statement,
        }
    }
}

/// Discriminator shared by the two slots of a case.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CaseKey {
    Index(usize),
    Token(String),
}

impl CaseKey {
    /// Reads a persisted discriminator, keeping plain numeric ones as indices.
    pub fn from_token(token: &str) -> Self {
        match token.parse::<usize>() {
            Ok(index) if index.to_string() == token => Self::Index(index),
            _ => Self::Token(token.to_string()),
        }
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Token(_) => None,
        }
    }
}

impl fmt::Display for CaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Token(token) => f.write_str(token),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    /// Expression input, used by condition slots.
    Value,
    /// Statement input, used by branch and else slots.
    Statement,
    /// The block's own tail connection.
    Next,
}

impl ConnectionKind {
    pub fn is_statement_chaining(self) -> bool {
        matches!(self, Self::Statement | Self::Next)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionRef {
    pub id: ConnectionId,
    pub kind: ConnectionKind,
}

/// Host-owned block id. The shape only ever holds it as a reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubtreeId(pub String);

impl SubtreeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubtreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Real,
    /// Insertion marker shown while a drag is in flight.
    Preview,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub subtree: SubtreeId,
    pub kind: AttachmentKind,
}

impl Attachment {
    pub fn real(id: impl Into<String>) -> Self {
        Self {
            subtree: SubtreeId::new(id),
            kind: AttachmentKind::Real,
        }
    }

    pub fn preview(id: impl Into<String>) -> Self {
        Self {
            subtree: SubtreeId::new(id),
            kind: AttachmentKind::Preview,
        }
    }

    pub fn is_real(&self) -> bool {
        self.kind == AttachmentKind::Real
    }
}

#[derive(Debug, Clone)]
pub struct Slot {
    pub id: String,
    pub role: SlotRole,
    pub key: Option<CaseKey>,
    pub connection: ConnectionId,
    pub attachment: Option<Attachment>,
}

impl Slot {
    pub fn new(role: SlotRole, key: Option<CaseKey>, connection: ConnectionId) -> Self {
        let id = match &key {
            Some(key) => format!("{}{}", role.prefix(), key),
            None => role.prefix().to_string(),
        };
        Self {
            id,
            role,
            key,
            connection,
            attachment: None,
        }
    }

    pub fn connection_ref(&self) -> ConnectionRef {
        ConnectionRef {
            id: self.connection,
            kind: self.role.connection_kind(),
        }
    }

    pub fn real_attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref().filter(|attachment| attachment.is_real())
    }
}

/// Connection handles of a freshly inserted case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseHandles {
    pub condition: ConnectionRef,
    pub branch: ConnectionRef,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_ids_follow_role_and_key() {
        let slot = Slot::new(SlotRole::Condition, Some(CaseKey::Index(3)), ConnectionId(1));
        assert_eq!(slot.id, "IF3");
        let slot = Slot::new(SlotRole::Branch, Some(CaseKey::Token("p2".into())), ConnectionId(2));
        assert_eq!(slot.id, "DOp2");
        let slot = Slot::new(SlotRole::Else, None, ConnectionId(3));
        assert_eq!(slot.id, "ELSE");
    }

    #[test]
    fn numeric_tokens_become_indices() {
        assert_eq!(CaseKey::from_token("7"), CaseKey::Index(7));
        assert_eq!(CaseKey::from_token("abc"), CaseKey::Token("abc".into()));
        assert_eq!(CaseKey::from_token("-1"), CaseKey::Token("-1".into()));
        assert_eq!(CaseKey::from_token("07"), CaseKey::Token("07".into()));
    }

    #[test]
    fn statement_kinds_chain() {
        assert!(ConnectionKind::Statement.is_statement_chaining());
        assert!(ConnectionKind::Next.is_statement_chaining());
        assert!(!ConnectionKind::Value.is_statement_chaining());
    }

    #[test]
    fn preview_is_not_a_real_attachment() {
        let mut slot = Slot::new(SlotRole::Condition, Some(CaseKey::Index(0)), ConnectionId(0));
        slot.attachment = Some(Attachment::preview("marker"));
        assert!(slot.real_attachment().is_none());
        slot.attachment = Some(Attachment::real("cond"));
        assert_eq!(slot.real_attachment().map(|a| a.subtree.as_str()), Some("cond"));
    }
}
