// Configuration validation and default application against a `Block`.

use serde_json::{Map, Value};

use super::{AttrType, Attribute, Block, NestedBlock, Nesting, Presence, Validator};
use crate::diagnostics::{Diagnostics, index_path, join_path};

/// Attribute or block value counts as set when present and not null.
fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

impl Block {
    /// Check a configuration object, reporting every problem with the
    /// attribute path it concerns.
    pub fn validate(&self, config: &Value) -> Diagnostics {
        let mut diags = Diagnostics::new();
        self.validate_at(config, "", &mut diags);
        diags
    }

    fn validate_at(&self, value: &Value, path: &str, diags: &mut Diagnostics) {
        let Some(object) = value.as_object() else {
            diags.error(path, "Expected an object");
            return;
        };

        for key in object.keys() {
            if !self.attributes.contains_key(key.as_str()) && !self.blocks.contains_key(key.as_str())
            {
                diags.error_with_detail(
                    join_path(path, key),
                    "Unsupported argument",
                    format!("An argument named \"{key}\" is not expected here."),
                );
            }
        }

        for (name, attribute) in &self.attributes {
            let attr_path = join_path(path, name);
            validate_attribute(attribute, object, name, &attr_path, diags);
        }

        for (name, nested) in &self.blocks {
            let block_path = join_path(path, name);
            validate_nested(nested, object.get(*name), &block_path, diags);
        }

        for group in &self.exactly_one_of {
            let set: Vec<&str> = group
                .iter()
                .copied()
                .filter(|n| is_set(object.get(*n)))
                .collect();
            if set.len() != 1 {
                let names = group.join(", ");
                let detail = if set.is_empty() {
                    format!("exactly one of [{names}] must be specified")
                } else {
                    format!(
                        "only one of [{names}] may be specified, got [{}]",
                        set.join(", ")
                    )
                };
                diags.error_with_detail(
                    join_path(path, group.first().copied().unwrap_or_default()),
                    "Invalid combination of arguments",
                    detail,
                );
            }
        }
    }

    /// Fill in declared defaults for every absent attribute, recursing into
    /// nested blocks that are present.
    pub fn apply_defaults(&self, value: &mut Value) {
        let Some(object) = value.as_object_mut() else {
            return;
        };

        for (name, attribute) in &self.attributes {
            if let Some(default) = &attribute.default {
                let absent = matches!(object.get(*name), None | Some(Value::Null));
                if absent {
                    object.insert((*name).to_owned(), default.clone());
                }
            }
        }

        for (name, nested) in &self.blocks {
            match object.get_mut(*name) {
                Some(Value::Array(items)) => {
                    for item in items {
                        nested.block.apply_defaults(item);
                    }
                }
                Some(item @ Value::Object(_)) => nested.block.apply_defaults(item),
                _ => {}
            }
        }
    }

    /// Give every absent required attribute and required block a
    /// placeholder so a partial state (an imported id) deserializes.
    /// Defaults are applied first.
    pub fn fill_required(&self, value: &mut Value) {
        self.apply_defaults(value);
        let Some(object) = value.as_object_mut() else {
            return;
        };

        for (name, attribute) in &self.attributes {
            if attribute.presence == Presence::Required && !object.contains_key(*name) {
                object.insert((*name).to_owned(), placeholder(attribute));
            }
        }

        for (name, nested) in &self.blocks {
            let absent = matches!(object.get(*name), None | Some(Value::Null));
            if !absent || nested.min_items == 0 {
                continue;
            }
            let filled = match nested.nesting {
                Nesting::Single => {
                    let mut item = Value::Object(Map::new());
                    nested.block.fill_required(&mut item);
                    item
                }
                Nesting::List => Value::Array(Vec::new()),
            };
            object.insert((*name).to_owned(), filled);
        }
    }
}

/// Zero value of an attribute's type; enumerated strings take their first
/// allowed value.
fn placeholder(attribute: &Attribute) -> Value {
    match &attribute.kind {
        AttrType::String => {
            let first = attribute.validators.iter().find_map(|v| match v {
                Validator::OneOf(values) => values.first().copied(),
                _ => None,
            });
            Value::String(first.unwrap_or_default().to_owned())
        }
        AttrType::Bool => Value::Bool(false),
        AttrType::Int => Value::from(0),
        AttrType::List(_) => Value::Array(Vec::new()),
        AttrType::Map(_) | AttrType::Object(_) => Value::Object(Map::new()),
    }
}

fn validate_attribute(
    attribute: &Attribute,
    object: &Map<String, Value>,
    name: &str,
    path: &str,
    diags: &mut Diagnostics,
) {
    let value = object.get(name).filter(|v| !v.is_null());

    let Some(value) = value else {
        if attribute.presence == Presence::Required {
            diags.error_with_detail(
                path,
                "Missing required argument",
                format!("The argument \"{name}\" is required, but no definition was found."),
            );
        }
        return;
    };

    if attribute.presence == Presence::Computed {
        diags.error_with_detail(
            path,
            "Value for unconfigurable attribute",
            format!("\"{name}\" is computed by the server and cannot be set."),
        );
        return;
    }

    if !check_type(&attribute.kind, value, path, diags) {
        return;
    }

    for validator in &attribute.validators {
        check_validator(validator, value, path, diags);
    }

    for other in attribute.conflicts_with {
        if is_set(object.get(*other)) {
            diags.error_with_detail(
                path,
                "Conflicting configuration arguments",
                format!("\"{name}\" cannot be specified when \"{other}\" is specified"),
            );
        }
    }
}

fn validate_nested(nested: &NestedBlock, value: Option<&Value>, path: &str, diags: &mut Diagnostics) {
    let value = value.filter(|v| !v.is_null());

    match (nested.nesting, value) {
        (_, None) => {
            if nested.min_items > 0 {
                diags.error(path, "Missing required block");
            }
        }
        (Nesting::Single, Some(item)) => nested.block.validate_at(item, path, diags),
        (Nesting::List, Some(Value::Array(items))) => {
            if items.len() < nested.min_items {
                diags.error(
                    path,
                    format!("At least {} block(s) required", nested.min_items),
                );
            }
            if let Some(max) = nested.max_items.filter(|max| items.len() > *max) {
                diags.error(path, format!("No more than {max} block(s) allowed"));
            }
            for (i, item) in items.iter().enumerate() {
                nested.block.validate_at(item, &index_path(path, i), diags);
            }
        }
        (Nesting::List, Some(_)) => diags.error(path, "Expected a list of blocks"),
    }
}

/// Report a type mismatch; returns `false` when the value has the wrong type.
fn check_type(kind: &AttrType, value: &Value, path: &str, diags: &mut Diagnostics) -> bool {
    let ok = match (kind, value) {
        (AttrType::String, Value::String(_)) | (AttrType::Bool, Value::Bool(_)) => true,
        (AttrType::Int, Value::Number(n)) => n.is_i64() || n.is_u64(),
        (AttrType::List(inner), Value::Array(items)) => {
            let mut all = true;
            for (i, item) in items.iter().enumerate() {
                all &= check_type(inner, item, &index_path(path, i), diags);
            }
            return all;
        }
        (AttrType::Map(inner), Value::Object(entries)) => {
            let mut all = true;
            for (key, item) in entries {
                all &= check_type(inner, item, &join_path(path, key), diags);
            }
            return all;
        }
        (AttrType::Object(fields), Value::Object(entries)) => {
            let mut all = true;
            for (key, item) in entries {
                match fields.get(key.as_str()) {
                    Some(field) => all &= check_type(field, item, &join_path(path, key), diags),
                    None => {
                        diags.error(join_path(path, key), "Unsupported object field");
                        all = false;
                    }
                }
            }
            return all;
        }
        _ => false,
    };

    if !ok {
        diags.error_with_detail(
            path,
            "Incorrect attribute value type",
            format!("expected {}", type_name(kind)),
        );
    }
    ok
}

fn type_name(kind: &AttrType) -> String {
    match kind {
        AttrType::String => "string".into(),
        AttrType::Bool => "bool".into(),
        AttrType::Int => "number".into(),
        AttrType::List(inner) => format!("list of {}", type_name(inner)),
        AttrType::Map(inner) => format!("map of {}", type_name(inner)),
        AttrType::Object(_) => "object".into(),
    }
}

fn check_validator(validator: &Validator, value: &Value, path: &str, diags: &mut Diagnostics) {
    match validator {
        Validator::OneOf(allowed) => {
            if let Some(s) = value.as_str().filter(|s| !allowed.contains(s)) {
                diags.error_with_detail(
                    path,
                    format!("Invalid value {s:?}"),
                    format!("expected one of [{}]", allowed.join(", ")),
                );
            }
        }
        Validator::EachOneOf(allowed) => {
            for (i, item) in value.as_array().into_iter().flatten().enumerate() {
                if let Some(s) = item.as_str().filter(|s| !allowed.contains(s)) {
                    diags.error_with_detail(
                        index_path(path, i),
                        format!("Invalid value {s:?}"),
                        format!("expected one of [{}]", allowed.join(", ")),
                    );
                }
            }
        }
        Validator::NonEmpty => {
            let empty = match value {
                Value::String(s) => s.trim().is_empty(),
                Value::Array(items) => items.is_empty(),
                _ => false,
            };
            if empty {
                diags.error(path, "Value must not be empty");
            }
        }
        Validator::Range(min, max) => {
            if let Some(n) = value.as_i64().filter(|n| n < min || n > max) {
                diags.error(path, format!("Value {n} is outside the range {min}..={max}"));
            }
        }
        Validator::Duration => {
            if let Some(s) = value.as_str() {
                if let Err(e) = humantime::parse_duration(s) {
                    diags.error_with_detail(path, format!("Invalid duration {s:?}"), e.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::schema::{Attribute, NestedBlock};

    fn target_block() -> Block {
        Block::new()
            .id()
            .attr("name", Attribute::string().required())
            .attr("port", Attribute::int().default(22))
            .attr(
                "participation",
                Attribute::string().one_of(&["Untenanted", "Tenanted"]),
            )
            .attr(
                "roles",
                Attribute::string_list()
                    .required()
                    .validate(Validator::NonEmpty),
            )
            .block(
                "authentication",
                NestedBlock::single(Block::new().attr("account_id", Attribute::string())),
            )
            .block(
                "pod_authentication",
                NestedBlock::single(
                    Block::new().attr("token_path", Attribute::string().required()),
                ),
            )
            .exactly_one_of(&["authentication", "pod_authentication"])
    }

    fn attributes_with_errors(diags: &Diagnostics) -> Vec<String> {
        diags
            .errors()
            .filter_map(|d| d.attribute.clone())
            .collect()
    }

    #[test]
    fn accepts_valid_config() {
        let diags = target_block().validate(&json!({
            "name": "web-01",
            "roles": ["web"],
            "authentication": { "account_id": "Accounts-1" }
        }));
        assert!(!diags.has_errors(), "{diags}");
    }

    #[test]
    fn reports_each_problem_by_path() {
        let diags = target_block().validate(&json!({
            "id": "Machines-1",
            "port": "22",
            "participation": "Sometimes",
            "roles": [],
            "colour": "blue",
            "pod_authentication": {}
        }));

        assert_eq!(
            attributes_with_errors(&diags),
            vec![
                "colour",
                "id",
                "name",
                "port",
                "participation",
                "roles",
                "pod_authentication.token_path",
            ]
        );
    }

    #[test]
    fn exactly_one_of_rejects_none_and_many() {
        let none = target_block().validate(&json!({ "name": "a", "roles": ["r"] }));
        assert_eq!(attributes_with_errors(&none), vec!["authentication"]);

        let both = target_block().validate(&json!({
            "name": "a",
            "roles": ["r"],
            "authentication": {},
            "pod_authentication": { "token_path": "/t" }
        }));
        assert_eq!(attributes_with_errors(&both), vec!["authentication"]);
    }

    #[test]
    fn defaults_fill_absent_and_null_attributes() {
        let mut config = json!({ "name": "a", "port": null });
        target_block().apply_defaults(&mut config);
        assert_eq!(config["port"], 22);

        let mut explicit = json!({ "name": "a", "port": 2222 });
        target_block().apply_defaults(&mut explicit);
        assert_eq!(explicit["port"], 2222);
    }

    #[test]
    fn defaults_recurse_into_list_blocks() {
        let block = Block::new().block(
            "package",
            NestedBlock::list(
                Block::new().attr("feed_id", Attribute::string().default("feeds-builtin")),
            ),
        );
        let mut config = json!({ "package": [{}, { "feed_id": "feeds-1" }] });
        block.apply_defaults(&mut config);
        assert_eq!(
            config,
            json!({ "package": [{ "feed_id": "feeds-builtin" }, { "feed_id": "feeds-1" }] })
        );
    }

    #[test]
    fn fill_required_seeds_a_partial_state() {
        let block = target_block()
            .attr(
                "style",
                Attribute::string().required().one_of(&["Ssh", "TentaclePassive"]),
            )
            .block(
                "endpoint",
                NestedBlock::single(Block::new().attr("host", Attribute::string().required()))
                    .required(),
            )
            .block("step", NestedBlock::list(Block::new()).min_items(1));
        let mut state = json!({ "id": "Machines-1" });
        block.fill_required(&mut state);
        assert_eq!(
            state,
            json!({
                "id": "Machines-1",
                "name": "",
                "port": 22,
                "roles": [],
                "style": "Ssh",
                "endpoint": { "host": "" },
                "step": []
            })
        );
    }
}
