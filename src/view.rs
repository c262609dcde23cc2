//! Template helpers over the request's subject.
//!
//! Templates receive a [`ViewArgs`]; the helpers here read the session
//! through the subject stored in it. String values are HTML-escaped before
//! they reach a template.

use std::collections::HashMap;

use serde_json::Value;

use crate::subject::Subject;

/// View argument key the subject is published under.
pub const KEY_SUBJECT: &str = "_aahSubject";

/// Arguments handed to a template.
#[derive(Debug, Default)]
pub struct ViewArgs<'a> {
    subject: Option<&'a mut Subject>,
    values: HashMap<String, Value>,
}

impl<'a> ViewArgs<'a> {
    /// Creates arguments without a subject.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates arguments carrying `subject`.
    pub fn with_subject(subject: &'a mut Subject) -> Self {
        Self {
            subject: Some(subject),
            values: HashMap::new(),
        }
    }

    /// Stores a template value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Template value for `key`. [`KEY_SUBJECT`] is reserved for the subject
    /// and never found here.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Subject stored under [`KEY_SUBJECT`].
    pub fn subject(&self) -> Option<&Subject> {
        self.subject.as_deref()
    }
}

/// Session value for `key`, escaped; `None` without a subject.
pub fn session_value(args: &ViewArgs<'_>, key: &str) -> Option<Value> {
    args.subject()
        .and_then(|s| s.session().get(key))
        .map(|v| sanitize_value(v.clone()))
}

/// Flash value for `key`, escaped. Reading consumes the flash entry.
pub fn flash_value(args: &mut ViewArgs<'_>, key: &str) -> Option<Value> {
    args.subject
        .as_deref_mut()
        .and_then(|s| s.session_mut().get_flash(key))
        .map(sanitize_value)
}

/// The session's authenticated flag; false without a subject.
pub fn is_authenticated(args: &ViewArgs<'_>) -> bool {
    args.subject().is_some_and(Subject::is_authenticated)
}

fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(escape_html(&s)),
        other => other,
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
