// ── Schema declarations ──
//
// Static description of a resource's configuration surface: attribute
// names, types, presence, defaults and validators, plus nested blocks.
// Schemas are built once per call with the builder methods below and
// are pure data; `validate` and `apply_defaults` live in `validate.rs`.

mod validate;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

// ── Types ────────────────────────────────────────────────────────────

/// Value type of an attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrType {
    String,
    Bool,
    Int,
    List(Box<AttrType>),
    Map(Box<AttrType>),
    Object(IndexMap<&'static str, AttrType>),
}

impl AttrType {
    pub fn list_of(inner: AttrType) -> Self {
        Self::List(Box::new(inner))
    }

    pub fn map_of(inner: AttrType) -> Self {
        Self::Map(Box::new(inner))
    }

    pub fn object(fields: impl IntoIterator<Item = (&'static str, AttrType)>) -> Self {
        Self::Object(fields.into_iter().collect())
    }
}

/// Whether an attribute is set by configuration, by the server, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Required,
    Optional,
    /// Server-populated; rejected in configuration.
    Computed,
    /// Configurable, filled in by the server when omitted.
    OptionalComputed,
}

/// Value checks beyond the type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    /// String must be one of the listed values.
    OneOf(&'static [&'static str]),
    /// Every list element must be one of the listed values.
    EachOneOf(&'static [&'static str]),
    /// String or list must not be empty.
    NonEmpty,
    /// Integer must fall in the inclusive range.
    Range(i64, i64),
    /// String must parse as a human-readable duration (`90s`, `5m`).
    Duration,
}

// ── Attributes ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub kind: AttrType,
    pub presence: Presence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sensitive: bool,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub description: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
    #[serde(skip_serializing_if = "no_names")]
    pub conflicts_with: &'static [&'static str],
}

impl Attribute {
    pub fn new(kind: AttrType) -> Self {
        Self {
            kind,
            presence: Presence::Optional,
            default: None,
            sensitive: false,
            description: "",
            validators: Vec::new(),
            conflicts_with: &[],
        }
    }

    pub fn string() -> Self {
        Self::new(AttrType::String)
    }

    pub fn bool() -> Self {
        Self::new(AttrType::Bool)
    }

    pub fn int() -> Self {
        Self::new(AttrType::Int)
    }

    pub fn string_list() -> Self {
        Self::new(AttrType::list_of(AttrType::String))
    }

    pub fn string_map() -> Self {
        Self::new(AttrType::map_of(AttrType::String))
    }

    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    pub fn computed(mut self) -> Self {
        self.presence = Presence::Computed;
        self
    }

    pub fn optional_computed(mut self) -> Self {
        self.presence = Presence::OptionalComputed;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn description(mut self, text: &'static str) -> Self {
        self.description = text;
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Shorthand for `validate(Validator::OneOf(values))`.
    pub fn one_of(self, values: &'static [&'static str]) -> Self {
        self.validate(Validator::OneOf(values))
    }

    pub fn conflicts_with(mut self, names: &'static [&'static str]) -> Self {
        self.conflicts_with = names;
        self
    }

    pub fn is_configurable(&self) -> bool {
        self.presence != Presence::Computed
    }
}

// ── Blocks ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Nesting {
    /// At most one object.
    Single,
    /// Ordered list of objects.
    List,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NestedBlock {
    pub nesting: Nesting,
    #[serde(skip_serializing_if = "is_zero")]
    pub min_items: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    pub block: Block,
}

fn no_names(names: &&'static [&'static str]) -> bool {
    names.is_empty()
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl NestedBlock {
    pub fn single(block: Block) -> Self {
        Self {
            nesting: Nesting::Single,
            min_items: 0,
            max_items: Some(1),
            block,
        }
    }

    pub fn list(block: Block) -> Self {
        Self {
            nesting: Nesting::List,
            min_items: 0,
            max_items: None,
            block,
        }
    }

    pub fn required(mut self) -> Self {
        self.min_items = self.min_items.max(1);
        self
    }

    pub fn min_items(mut self, n: usize) -> Self {
        self.min_items = n;
        self
    }
}

/// Attributes and nested blocks of one object level.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Block {
    #[serde(skip_serializing_if = "str::is_empty")]
    pub description: &'static str,
    pub attributes: IndexMap<&'static str, Attribute>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub blocks: IndexMap<&'static str, NestedBlock>,
    /// Groups of attribute/block names of which exactly one must be set.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exactly_one_of: Vec<&'static [&'static str]>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, text: &'static str) -> Self {
        self.description = text;
        self
    }

    /// Add or replace an attribute.
    pub fn attr(mut self, name: &'static str, attribute: Attribute) -> Self {
        self.attributes.insert(name, attribute);
        self
    }

    pub fn block(mut self, name: &'static str, block: NestedBlock) -> Self {
        self.blocks.insert(name, block);
        self
    }

    pub fn exactly_one_of(mut self, names: &'static [&'static str]) -> Self {
        self.exactly_one_of.push(names);
        self
    }

    /// Computed `id` attribute.
    pub fn id(self) -> Self {
        self.attr(
            "id",
            Attribute::string()
                .computed()
                .description("The unique ID of this resource."),
        )
    }

    /// Optional `space_id`, falling back to the provider's space.
    pub fn space_id(self) -> Self {
        self.attr(
            "space_id",
            Attribute::string()
                .optional_computed()
                .description("The space ID associated with this resource."),
        )
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn nested(&self, name: &str) -> Option<&NestedBlock> {
        self.blocks.get(name)
    }

    /// This block as a value type, for computed lists of objects.
    pub fn object_type(&self) -> AttrType {
        let attributes = self
            .attributes
            .iter()
            .map(|(name, attribute)| (*name, attribute.kind.clone()));
        let blocks = self.blocks.iter().map(|(name, nested)| {
            let inner = nested.block.object_type();
            let kind = match nested.nesting {
                Nesting::Single => inner,
                Nesting::List => AttrType::list_of(inner),
            };
            (*name, kind)
        });
        AttrType::object(attributes.chain(blocks))
    }
}

// ── Schema ───────────────────────────────────────────────────────────

/// Versioned root block of a resource, data source or the provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub version: u32,
    pub block: Block,
}

impl Schema {
    pub fn new(block: Block) -> Self {
        Self { version: 0, block }
    }

    pub fn validate(&self, config: &Value) -> crate::Diagnostics {
        self.block.validate(config)
    }

    pub fn apply_defaults(&self, config: &mut Value) {
        self.block.apply_defaults(config);
    }
}
