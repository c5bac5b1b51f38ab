use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

use crate::config::ShapeConfig;
use crate::error::MutationError;
use crate::events::ChangeSink;
use crate::ir::CaseKey;
use crate::reconcile::Reconciler;
use crate::shape::BlockShape;

pub type Attributes = BTreeMap<String, String>;

static ELEMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<mutation\b(?P<attrs>[^>]*?)/?>").unwrap());
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?P<name>[A-Za-z_][\w.:-]*)\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#).unwrap()
});

/// Persisted shape of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeDescriptor {
    /// `elseif="n" else="1"`.
    Counts { else_if: usize, has_else: bool },
    /// `inputs="0,3,7" else="true"`, read-only.
    Legacy { keys: Vec<CaseKey>, has_else: bool },
}

impl Default for ShapeDescriptor {
    fn default() -> Self {
        Self::Counts {
            else_if: 0,
            has_else: false,
        }
    }
}

impl ShapeDescriptor {
    pub fn from_attributes(attrs: &Attributes, config: &ShapeConfig) -> Self {
        if let Some(inputs) = attrs.get("inputs").filter(|inputs| !inputs.is_empty()) {
            let mut seen = HashSet::new();
            let mut keys = Vec::new();
            for token in inputs.split(',').map(str::trim) {
                if token.is_empty() {
                    continue;
                }
                if !seen.insert(token) {
                    warn!(token, "duplicate legacy case key dropped");
                    continue;
                }
                keys.push(CaseKey::from_token(token));
            }
            let limit = config.max_else_if.saturating_add(1);
            if keys.len() > limit {
                warn!(cases = keys.len(), limit, "legacy case list truncated");
                keys.truncate(limit);
            }
            return Self::Legacy {
                keys,
                has_else: attrs.get("else").map(String::as_str) == Some("true"),
            };
        }

        let mut else_if = parse_count(attrs.get("elseif").map(String::as_str), "elseif");
        if else_if > config.max_else_if {
            warn!(else_if, limit = config.max_else_if, "else-if count clamped");
            else_if = config.max_else_if;
        }
        Self::Counts {
            else_if,
            has_else: parse_count(attrs.get("else").map(String::as_str), "else") > 0,
        }
    }

    /// Reads either a JSON extra-state object or a string holding a mutation element.
    pub fn from_extra_state(
        state: &serde_json::Value,
        config: &ShapeConfig,
    ) -> Result<Self, MutationError> {
        match state {
            serde_json::Value::Null => Ok(Self::default()),
            serde_json::Value::String(xml) => {
                let attrs = parse_mutation_element(xml)?;
                Ok(Self::from_attributes(&attrs, config))
            }
            serde_json::Value::Object(map) => {
                let mut else_if = match map.get("elseIfCount") {
                    None | Some(serde_json::Value::Null) => 0,
                    Some(serde_json::Value::String(raw)) => {
                        parse_count(Some(raw.as_str()), "elseIfCount")
                    }
                    Some(value) => parse_count(Some(value.to_string().as_str()), "elseIfCount"),
                };
                if else_if > config.max_else_if {
                    warn!(else_if, limit = config.max_else_if, "else-if count clamped");
                    else_if = config.max_else_if;
                }
                let has_else = map
                    .get("hasElse")
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(false);
                Ok(Self::Counts { else_if, has_else })
            }
            other => Err(MutationError::UnsupportedExtraState(json_kind(other).to_string())),
        }
    }

    /// Canonical descriptor of the shape as it stands; does not finalize.
    pub fn of(shape: &BlockShape) -> Self {
        Self::Counts {
            else_if: shape.else_if_count(),
            has_else: shape.has_else(),
        }
    }

    pub fn case_count(&self) -> usize {
        match self {
            Self::Counts { else_if, .. } => else_if + 1,
            Self::Legacy { keys, .. } => keys.len().max(1),
        }
    }

    pub fn has_else(&self) -> bool {
        match self {
            Self::Counts { has_else, .. } | Self::Legacy { has_else, .. } => *has_else,
        }
    }

    pub fn build(&self) -> BlockShape {
        let mut shape = BlockShape::new();
        match self {
            Self::Counts { else_if, .. } => {
                for index in 1..=*else_if {
                    shape.push_case(CaseKey::Index(index), None, None);
                }
            }
            Self::Legacy { keys, .. } => {
                let mut keys = keys.iter().cloned();
                if let Some(first) = keys.next() {
                    shape.rekey_first_case(first);
                }
                for key in keys {
                    shape.push_case(key, None, None);
                }
            }
        }
        if self.has_else() {
            shape.append_else_slot(None);
        }
        shape
    }

    /// Canonical attributes, `None` for the default one-case shape.
    pub fn to_attributes(&self) -> Option<Attributes> {
        let else_if = self.case_count() - 1;
        let mut attrs = Attributes::new();
        if else_if > 0 {
            attrs.insert("elseif".to_string(), else_if.to_string());
        }
        if self.has_else() {
            attrs.insert("else".to_string(), "1".to_string());
        }
        (!attrs.is_empty()).then_some(attrs)
    }

    pub fn to_xml(&self) -> Option<String> {
        let attrs = self.to_attributes()?;
        let mut xml = String::from("<mutation");
        for name in ["elseif", "else"] {
            if let Some(value) = attrs.get(name) {
                xml.push_str(&format!(" {name}=\"{value}\""));
            }
        }
        xml.push_str("></mutation>");
        Some(xml)
    }

    pub fn to_extra_state(&self) -> Option<ExtraState> {
        self.to_attributes()?;
        Some(ExtraState {
            else_if_count: self.case_count() - 1,
            has_else: self.has_else(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraState {
    #[serde(skip_serializing_if = "is_zero")]
    pub else_if_count: usize,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub has_else: bool,
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

/// Finalizes `shape`, then writes its canonical mutation element.
pub fn export_mutation(
    shape: &mut BlockShape,
    reconciler: &Reconciler,
    sink: &mut dyn ChangeSink,
) -> Option<String> {
    reconciler.finalize(shape, sink);
    ShapeDescriptor::of(shape).to_xml()
}

/// Finalizes `shape`, then writes its JSON extra state.
pub fn export_extra_state(
    shape: &mut BlockShape,
    reconciler: &Reconciler,
    sink: &mut dyn ChangeSink,
) -> Option<ExtraState> {
    reconciler.finalize(shape, sink);
    ShapeDescriptor::of(shape).to_extra_state()
}

/// Attributes of the first `<mutation>` element in `text`.
pub fn parse_mutation_element(text: &str) -> Result<Attributes, MutationError> {
    let caps = ELEMENT_RE
        .captures(text)
        .ok_or(MutationError::MissingElement)?;
    let body = caps.name("attrs").map_or("", |m| m.as_str());

    let mut attrs = Attributes::new();
    let mut cursor = 0;
    for attr in ATTR_RE.captures_iter(body) {
        let Some(whole) = attr.get(0) else {
            continue;
        };
        let gap = &body[cursor..whole.start()];
        if !gap.trim().is_empty() {
            return Err(MutationError::MalformedAttribute(gap.trim().to_string()));
        }
        cursor = whole.end();
        let value = attr
            .name("dq")
            .or_else(|| attr.name("sq"))
            .map_or("", |m| m.as_str());
        attrs.insert(attr["name"].to_string(), unescape(value));
    }
    let rest = body[cursor..].trim();
    if !rest.is_empty() {
        return Err(MutationError::MalformedAttribute(rest.to_string()));
    }
    Ok(attrs)
}

fn parse_count(raw: Option<&str>, attribute: &str) -> usize {
    let Some(raw) = raw else {
        return 0;
    };
    match raw.trim().parse::<i64>() {
        Ok(value) if value >= 0 => usize::try_from(value).unwrap_or(usize::MAX),
        _ => {
            warn!(attribute, value = raw, "malformed count treated as 0");
            0
        }
    }
}

fn unescape(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
