// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message templates.
//!
//! A template is literal text with `%property%` references, parsed once
//! at configuration time. Rendering modes follow the module's
//! declaration: text through the template, the full record as JSON, or
//! the message object itself.

use crate::error::EngineError;
use crate::module::{RenderMode, Rendered};
use sm_core::{Message, Property};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Prop(Property),
}

#[derive(Debug, Clone)]
pub struct Template {
    text: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse `%property%` references out of literal text. `%%` is a
    /// literal percent sign.
    pub fn parse(text: &str) -> Result<Self, EngineError> {
        let mut segments = Vec::new();
        let mut lit = String::new();
        let mut rest = text;
        while let Some(start) = rest.find('%') {
            lit.push_str(&rest[..start]);
            rest = &rest[start + 1..];
            if let Some(stripped) = rest.strip_prefix('%') {
                lit.push('%');
                rest = stripped;
                continue;
            }
            let Some(end) = rest.find('%') else {
                return Err(EngineError::Template(format!(
                    "unterminated property reference in {text:?}"
                )));
            };
            let name = &rest[..end];
            let prop = Property::parse(name)
                .map_err(|e| EngineError::Template(format!("{e} in {text:?}")))?;
            if !lit.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut lit)));
            }
            segments.push(Segment::Prop(prop));
            rest = &rest[end + 1..];
        }
        lit.push_str(rest);
        if !lit.is_empty() {
            segments.push(Segment::Literal(lit));
        }
        Ok(Self { text: text.to_string(), segments })
    }

    /// The traditional forwarding shape.
    pub fn forward_default() -> Self {
        #[allow(clippy::expect_used)]
        Self::parse("%pri-text%%timereported% %hostname% %syslogtag% %msg%")
            .expect("default template parses")
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Render to text.
    pub fn render(&self, msg: &Message) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Literal(l) => out.push_str(l),
                Segment::Prop(p) => {
                    if let Some(v) = p.resolve(msg) {
                        out.push_str(&v);
                    }
                }
            }
        }
        out
    }

    /// Render per the module's declared mode.
    pub fn render_for(&self, msg: &Arc<Message>, mode: RenderMode) -> Result<Rendered, EngineError> {
        match mode {
            RenderMode::AsBytes => Ok(Rendered::Bytes(self.render(msg).into_bytes())),
            RenderMode::AsJson => {
                let value = serde_json::to_value(msg.to_record())
                    .map_err(|e| EngineError::Template(e.to_string()))?;
                Ok(Rendered::Json(value))
            }
            RenderMode::AsMsg => Ok(Rendered::Msg(Arc::clone(msg))),
        }
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
