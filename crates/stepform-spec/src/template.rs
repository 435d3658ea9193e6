use std::sync::OnceLock;

use handlebars::Handlebars;
use serde_json::{Map, Value};

static ENGINE: OnceLock<Handlebars<'static>> = OnceLock::new();

fn engine() -> &'static Handlebars<'static> {
    ENGINE.get_or_init(|| {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry
    })
}

/// Renders a validation message template such as `"{{path}} is a required field"`.
///
/// Templates that fail to render fall back to their raw text.
pub fn render_message(template: &str, params: &Map<String, Value>) -> String {
    if !template.contains("{{") {
        return template.to_string();
    }
    engine()
        .render_template(template, params)
        .unwrap_or_else(|err| {
            tracing::warn!(%err, template, "failed to render validation message");
            template.to_string()
        })
}

/// Formats a bound without a trailing `.0` for whole numbers.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn substitutes_placeholders_without_escaping() {
        let rendered = render_message(
            "{{path}} can't be < {{min}}",
            &params(json!({ "path": "money", "min": "10" })),
        );
        assert_eq!(rendered, "money can't be < 10");
    }

    #[test]
    fn broken_templates_fall_back() {
        let rendered = render_message("{{#if path}}unterminated", &Map::new());
        assert_eq!(rendered, "{{#if path}}unterminated");
    }

    #[test]
    fn whole_numbers_drop_fraction() {
        assert_eq!(format_number(1_000_000.0), "1000000");
        assert_eq!(format_number(2.5), "2.5");
    }
}
