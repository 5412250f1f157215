//! Template evaluation against an event
//!
//! Templates are Handlebars, evaluated in strict mode so a reference to a
//! field no Sensu entity or check has is an error rather than an empty
//! string. Known fields the event leaves unset render as their zero value.
//! Sensu-style field references such as `{{.Entity.Name}}` are rewritten to
//! their Handlebars spelling before parsing, so existing handler
//! configurations keep working.

use handlebars::Handlebars;
use lazy_regex::regex;
use regex::Captures;
use serde_json::{Value, json};

use crate::error::{HandlerError, Result};
use crate::event::Event;

/// Render `template` against `event`
pub fn render(name: &str, template: &str, event: &Event) -> Result<String> {
    let source = rewrite_sensu_syntax(template);
    let mut handlebars = create_handlebars();

    handlebars
        .register_template_string(name, &source)
        .map_err(|e| HandlerError::TemplateSyntax {
            template: template.to_string(),
            source: Box::new(e),
        })?;

    handlebars
        .render(name, &context(event))
        .map_err(|e| HandlerError::TemplateRender {
            template: template.to_string(),
            source: Box::new(e),
        })
}

fn create_handlebars() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    // Output goes into JSON, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars
}

/// Build the template context
///
/// Entity and check are exposed as their full JSON form laid over zero values
/// for the fields every Sensu entity and check has, so an unset `namespace`
/// renders empty instead of failing strict mode. `metadata` fields are also
/// lifted one level, so `{{entity.name}}` and `{{entity.metadata.name}}` both
/// resolve.
fn context(event: &Event) -> Value {
    let mut entity = json!({
        "metadata": zero_metadata(),
        "entity_class": "",
    });
    overlay(&mut entity, serde_json::to_value(&event.entity).unwrap_or(Value::Null));
    lift_metadata(&mut entity);

    let mut check = json!({
        "metadata": zero_metadata(),
        "output": "",
        "status": 0,
    });
    overlay(&mut check, serde_json::to_value(&event.check).unwrap_or(Value::Null));
    lift_metadata(&mut check);

    json!({
        "entity": entity,
        "check": check,
        "timestamp": event.timestamp.unwrap_or_default(),
        "id": event.id.as_deref().unwrap_or_default(),
    })
}

fn zero_metadata() -> Value {
    json!({
        "name": "",
        "namespace": "",
        "labels": {},
        "annotations": {},
    })
}

/// Merge `raw` into `base`, recursing into objects present in both
fn overlay(base: &mut Value, raw: Value) {
    match (base, raw) {
        (Value::Object(base), Value::Object(raw)) => {
            for (key, value) in raw {
                match base.get_mut(&key) {
                    Some(existing) => overlay(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, raw) => *base = raw,
    }
}

fn lift_metadata(object: &mut Value) {
    let Some(map) = object.as_object_mut() else {
        return;
    };
    let lifted: Vec<(String, Value)> = map
        .get("metadata")
        .and_then(Value::as_object)
        .map(|meta| {
            ["name", "namespace", "labels", "annotations"]
                .iter()
                .filter_map(|key| meta.get(*key).map(|v| (key.to_string(), v.clone())))
                .collect()
        })
        .unwrap_or_default();
    for (key, value) in lifted {
        map.entry(key).or_insert(value);
    }
}

/// Rewrite `{{ .Entity.Name }}` style references to `{{entity.name}}`
///
/// Only bare field paths are rewritten; anything else is left for Handlebars
/// to accept or reject.
pub fn rewrite_sensu_syntax(template: &str) -> String {
    let re = regex!(r"\{\{-?\s*\.([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)\s*-?\}\}");
    re.replace_all(template, |caps: &Captures| {
        let path = caps[1].split('.').map(field_to_key).collect::<Vec<_>>().join(".");
        format!("{{{{{}}}}}", path)
    })
    .into_owned()
}

/// Map a Go field name to its JSON key: `EntityClass` -> `entity_class`
fn field_to_key(field: &str) -> String {
    if field == "ObjectMeta" {
        return "metadata".to_string();
    }

    let chars: Vec<char> = field.chars().collect();
    let mut key = String::with_capacity(field.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                key.push('_');
            }
        }
        key.extend(c.to_lowercase());
    }
    key
}
