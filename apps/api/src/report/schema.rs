//! Schema enforcement. Reconciles whatever JSON the extraction step produced
//! against the fixed candidate shape, so every declared field is always present.

use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use tracing::debug;

/// A node of the required document shape.
///
/// `Sequence` holds the template for every element; `Mapping` keeps the
/// declared key order so the schema example handed to the LLM reads naturally.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Scalar(&'static str),
    Sequence(Box<SchemaNode>),
    Mapping(Vec<(&'static str, SchemaNode)>),
}

impl SchemaNode {
    fn seq(item: SchemaNode) -> Self {
        SchemaNode::Sequence(Box::new(item))
    }

    fn map(fields: &[&'static str]) -> Self {
        SchemaNode::Mapping(
            fields
                .iter()
                .map(|&k| (k, SchemaNode::Scalar("")))
                .collect(),
        )
    }

    fn with(mut self, key: &'static str, node: SchemaNode) -> Self {
        if let SchemaNode::Mapping(fields) = &mut self {
            fields.push((key, node));
        }
        self
    }

    /// The canonical filled-in default for this node: empty strings for scalars,
    /// a one-element placeholder list for sequences.
    pub fn default_value(&self) -> Value {
        match self {
            SchemaNode::Scalar(default) => Value::String((*default).to_string()),
            SchemaNode::Sequence(item) => Value::Array(vec![item.default_value()]),
            SchemaNode::Mapping(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, node)| ((*k).to_string(), node.default_value()))
                    .collect(),
            ),
        }
    }
}

/// The shape every candidate document is reconciled against.
pub static CANDIDATE_SCHEMA: Lazy<SchemaNode> = Lazy::new(|| {
    let task = SchemaNode::map(&["task"]);
    let job_post = SchemaNode::map(&["job_title", "start_date", "end_date"])
        .with("job_tasks", SchemaNode::seq(task));
    let line_item = SchemaNode::map(&["cdd_company", "company_desc"])
        .with("job_posts", SchemaNode::seq(job_post));
    let academic = SchemaNode::map(&[
        "academic_course",
        "academic_institution",
        "academic_conclusion",
    ]);
    let language = SchemaNode::map(&["language", "language_level"]);

    SchemaNode::map(&[
        "company",
        "company_title",
        "cdd_name",
        "cdd_email",
        "cdd_city",
        "cdd_state",
        "cdd_cel",
        "cdd_age",
        "cdd_nationality",
        "abt_background",
        "bhv_profile",
        "job_bond",
        "job_wage",
        "job_variable",
        "job_meal",
        "job_food",
        "job_health",
        "job_dental",
        "job_life",
        "job_pension",
        "job_others",
        "job_expectation",
        "last_company",
        "report_lang",
        "report_date",
    ])
    .with("line_items", SchemaNode::seq(line_item))
    .with("academics", SchemaNode::seq(academic))
    .with("languages", SchemaNode::seq(language))
});

/// Pretty-printed default document, embedded in the extraction prompt.
pub fn schema_example() -> String {
    serde_json::to_string_pretty(&CANDIDATE_SCHEMA.default_value()).unwrap_or_default()
}

/// Reconciles `value` against `schema`, returning a value with exactly the schema's shape.
///
/// Shape mismatches are resolved strictly:
/// - scalar slot: strings are kept, numbers and booleans are stringified,
///   anything else becomes the default;
/// - mapping slot: a non-object yields the filled-in default mapping, extra keys are dropped;
/// - sequence slot: anything but a non-empty array yields the one-element placeholder list.
pub fn enforce(value: &Value, schema: &SchemaNode) -> Value {
    match schema {
        SchemaNode::Mapping(fields) => {
            let incoming = value.as_object();
            if incoming.is_none() && !value.is_null() {
                debug!("Expected an object, got {}; using defaults", kind(value));
            }
            let mut out = Map::with_capacity(fields.len());
            for (key, node) in fields {
                let field = match incoming.and_then(|obj| obj.get(*key)) {
                    Some(v) => enforce(v, node),
                    None => node.default_value(),
                };
                out.insert((*key).to_string(), field);
            }
            Value::Object(out)
        }
        SchemaNode::Sequence(item) => match value.as_array() {
            Some(items) if !items.is_empty() => {
                Value::Array(items.iter().map(|v| enforce(v, item)).collect())
            }
            _ => schema.default_value(),
        },
        SchemaNode::Scalar(default) => match value {
            Value::String(s) => Value::String(s.clone()),
            Value::Number(n) => Value::String(n.to_string()),
            Value::Bool(b) => Value::String(b.to_string()),
            Value::Null => Value::String((*default).to_string()),
            other => {
                debug!("Expected a scalar, got {}; using default", kind(other));
                Value::String((*default).to_string())
            }
        },
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// True when `value` has exactly the keys and nesting of `schema`.
    fn conforms(value: &Value, schema: &SchemaNode) -> bool {
        match schema {
            SchemaNode::Scalar(_) => value.is_string(),
            SchemaNode::Sequence(item) => value
                .as_array()
                .map(|items| !items.is_empty() && items.iter().all(|v| conforms(v, item)))
                .unwrap_or(false),
            SchemaNode::Mapping(fields) => value
                .as_object()
                .map(|obj| {
                    obj.len() == fields.len()
                        && fields
                            .iter()
                            .all(|(k, node)| obj.get(*k).is_some_and(|v| conforms(v, node)))
                })
                .unwrap_or(false),
        }
    }

    #[test]
    fn test_any_input_conforms() {
        let inputs = [
            json!(null),
            json!(42),
            json!("just text"),
            json!([1, 2, 3]),
            json!({}),
            json!({"unexpected": true, "line_items": "not a list"}),
            json!({"line_items": [{"job_posts": {"job_title": "x"}}, 7, null]}),
            json!({"languages": [{"language": ["en"], "language_level": {"x": 1}}]}),
            json!({"academics": [], "cdd_age": 34, "cdd_name": null}),
        ];
        for input in inputs {
            let out = enforce(&input, &CANDIDATE_SCHEMA);
            assert!(conforms(&out, &CANDIDATE_SCHEMA), "did not conform: {input}");
        }
    }

    #[test]
    fn test_missing_keys_get_canonical_defaults() {
        let out = enforce(&json!({"cdd_name": "Ana"}), &CANDIDATE_SCHEMA);
        assert_eq!(out["cdd_name"], "Ana");
        assert_eq!(out["cdd_email"], "");
        assert_eq!(
            out["line_items"][0]["job_posts"][0]["job_tasks"][0]["task"],
            ""
        );
    }

    #[test]
    fn test_empty_list_becomes_placeholder() {
        let out = enforce(&json!({"academics": []}), &CANDIDATE_SCHEMA);
        let academics = out["academics"].as_array().unwrap();
        assert_eq!(academics.len(), 1);
        assert_eq!(academics[0]["academic_course"], "");
    }

    #[test]
    fn test_list_items_are_each_enforced() {
        let input = json!({"languages": [
            {"language": "English", "language_level": "fluent", "extra": 1},
            {"language": "Spanish"}
        ]});
        let out = enforce(&input, &CANDIDATE_SCHEMA);
        let langs = out["languages"].as_array().unwrap();
        assert_eq!(langs.len(), 2);
        assert!(langs[0].get("extra").is_none());
        assert_eq!(langs[1]["language_level"], "");
    }

    #[test]
    fn test_scalar_policy() {
        let schema = SchemaNode::Scalar("fallback");
        assert_eq!(enforce(&json!(34), &schema), json!("34"));
        assert_eq!(enforce(&json!(true), &schema), json!("true"));
        assert_eq!(enforce(&json!(null), &schema), json!("fallback"));
        assert_eq!(enforce(&json!(["a"]), &schema), json!("fallback"));
        assert_eq!(enforce(&json!("kept"), &schema), json!("kept"));
    }

    #[test]
    fn test_key_order_follows_schema() {
        let out = enforce(&json!({"languages": [], "company": "X"}), &CANDIDATE_SCHEMA);
        let keys: Vec<_> = out.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.first().map(String::as_str), Some("company"));
        assert_eq!(keys.last().map(String::as_str), Some("languages"));
    }

    #[test]
    fn test_schema_example_is_valid_json() {
        let example: Value = serde_json::from_str(&schema_example()).unwrap();
        assert!(conforms(&example, &CANDIDATE_SCHEMA));
    }
}
