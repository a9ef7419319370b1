//! Instruction and expression signatures consumed by the parsers and the
//! generator.
//!
//! The catalog itself lives outside the compiler; [`MetadataProvider`] is
//! the lookup seam and [`MetadataRegistry`] an in-memory implementation
//! that can be built in code or loaded from JSON.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ExpressionKind;

// ══════════════════════════════════════════════════════════════════════════════
// Parameters
// ══════════════════════════════════════════════════════════════════════════════

/// Declared type of an instruction or expression parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterType {
    Expression,
    String,
    Object,
    Behavior,
    #[serde(rename = "objectvar")]
    ObjectVar,
    #[serde(rename = "scenevar")]
    SceneVar,
    #[serde(rename = "globalvar")]
    GlobalVar,
    RelationalOperator,
    Operator,
    Key,
    Mouse,
    Color,
    Layer,
    #[serde(rename = "yesorno")]
    YesOrNo,
    #[serde(rename = "trueorfalse")]
    TrueOrFalse,
    /// Any number of trailing math arguments.
    Variadic,
    // ── Code-only kinds, never written by users ──
    CurrentScene,
    ObjectList,
    ObjectListOrEmptyIfJustDeclared,
    ObjectListWithoutPicking,
    ObjectPtr,
    InlineCode,
    ConditionInverted,
    #[serde(other)]
    Unknown,
}

impl ParameterType {
    /// Whether the generator synthesizes this parameter itself.
    pub fn is_code_only(self) -> bool {
        matches!(
            self,
            Self::CurrentScene
                | Self::ObjectList
                | Self::ObjectListOrEmptyIfJustDeclared
                | Self::ObjectListWithoutPicking
                | Self::ObjectPtr
                | Self::InlineCode
                | Self::ConditionInverted
        )
    }

    /// Whether the parameter names an object of the layout.
    pub fn is_object(self) -> bool {
        matches!(
            self,
            Self::Object
                | Self::ObjectList
                | Self::ObjectListOrEmptyIfJustDeclared
                | Self::ObjectListWithoutPicking
                | Self::ObjectPtr
        )
    }

    pub fn is_variable(self) -> bool {
        matches!(self, Self::ObjectVar | Self::SceneVar | Self::GlobalVar)
    }

    /// How user text written for this parameter is parsed.
    pub fn expression_kind(self) -> Option<ExpressionKind> {
        match self {
            Self::Expression | Self::Variadic => Some(ExpressionKind::Math),
            Self::String => Some(ExpressionKind::String),
            Self::ObjectVar | Self::SceneVar | Self::GlobalVar => {
                Some(ExpressionKind::VariablePath)
            }
            t if t.is_code_only() => Some(ExpressionKind::CodeOnly),
            _ => None,
        }
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterMetadata {
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub default_value: String,
    /// Object parameters: the object type they accept (empty = any).
    /// Inline code: the code to paste.
    #[serde(default)]
    pub extra_info: String,
    /// Synthesized by the generator even if the type is user-facing.
    #[serde(default)]
    pub code_only: bool,
}

impl ParameterMetadata {
    pub fn new(param_type: ParameterType) -> Self {
        Self {
            param_type,
            optional: false,
            default_value: String::new(),
            extra_info: String::new(),
            code_only: param_type.is_code_only(),
        }
    }

    /// Make the parameter optional with `default_value`.
    pub fn optional(mut self, default_value: impl Into<String>) -> Self {
        self.optional = true;
        self.default_value = default_value.into();
        self
    }

    pub fn with_extra_info(mut self, extra_info: impl Into<String>) -> Self {
        self.extra_info = extra_info.into();
        self
    }

    pub fn code_only(mut self) -> Self {
        self.code_only = true;
        self
    }

    pub fn is_code_only(&self) -> bool {
        self.code_only || self.param_type.is_code_only()
    }
}

/// Number of user-written arguments a parameter list accepts,
/// counted from `first` (object and behavior expressions take their
/// leading parameters implicitly).
///
/// `max` is `usize::MAX` when a variadic parameter is declared.
pub fn arity_window(parameters: &[ParameterMetadata], first: usize) -> (usize, usize) {
    let written = parameters.iter().skip(first);
    let declared = written.clone().count();
    let optional = written
        .clone()
        .filter(|p| p.optional && !p.is_code_only())
        .count();
    let code_only = written.clone().filter(|p| p.is_code_only()).count();
    if let Some(variadic) = written
        .clone()
        .find(|p| p.param_type == ParameterType::Variadic)
    {
        let min = declared - optional - code_only;
        // The variadic slot itself may be left empty; an optional one is
        // already excluded from `min`.
        let empty_slot = usize::from(!variadic.optional && !variadic.is_code_only());
        return (min.saturating_sub(empty_slot), usize::MAX);
    }
    (declared - optional - code_only, declared - code_only)
}

// ══════════════════════════════════════════════════════════════════════════════
// Instructions and expressions
// ══════════════════════════════════════════════════════════════════════════════

/// What an instruction operates on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InstructionOwner {
    #[default]
    Free,
    /// First parameter is the object.
    Object,
    /// First parameters are the object and the behavior.
    Behavior,
}

/// Value manipulated by relational conditions and assignment actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    Number,
    String,
}

/// Signature and code binding of a condition or action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionMetadata {
    #[serde(default)]
    pub parameters: Vec<ParameterMetadata>,
    pub function_name: String,
    #[serde(default)]
    pub owner: InstructionOwner,
    /// Set for conditions comparing a value with a relational operator and
    /// actions modifying a value with an assignment operator.
    #[serde(default)]
    pub value_type: Option<ValueType>,
    /// Accessor used by assignment actions (`setter(getter() + x)`).
    #[serde(default)]
    pub getter: Option<String>,
    /// Function to call when the action is asynchronous.
    #[serde(default)]
    pub async_function_name: Option<String>,
    #[serde(default)]
    pub include_files: Vec<String>,
}

impl InstructionMetadata {
    pub fn free(function_name: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            ..Self::default()
        }
    }

    pub fn object(function_name: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            owner: InstructionOwner::Object,
            ..Self::default()
        }
    }

    pub fn behavior(function_name: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            owner: InstructionOwner::Behavior,
            ..Self::default()
        }
    }

    pub fn with_parameter(mut self, parameter: ParameterMetadata) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    pub fn with_getter(mut self, getter: impl Into<String>) -> Self {
        self.getter = Some(getter.into());
        self
    }

    pub fn with_async_function(mut self, name: impl Into<String>) -> Self {
        self.async_function_name = Some(name.into());
        self
    }

    pub fn with_include_file(mut self, file: impl Into<String>) -> Self {
        self.include_files.push(file.into());
        self
    }

    pub fn is_async(&self) -> bool {
        self.async_function_name.is_some()
    }
}

/// Signature and code binding of a free, object or behavior expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionMetadata {
    #[serde(default)]
    pub parameters: Vec<ParameterMetadata>,
    pub function_name: String,
    /// Object/behavior expressions bound to a static function instead of
    /// a method of the instance.
    #[serde(default)]
    pub static_function: bool,
    #[serde(default)]
    pub include_files: Vec<String>,
}

impl ExpressionMetadata {
    pub fn new(function_name: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            ..Self::default()
        }
    }

    pub fn with_parameter(mut self, parameter: ParameterMetadata) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_include_file(mut self, file: impl Into<String>) -> Self {
        self.include_files.push(file.into());
        self
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Lookup
// ══════════════════════════════════════════════════════════════════════════════

/// Which of the two expression tables a lookup goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Number,
    String,
}

impl ValueKind {
    pub fn of(kind: ExpressionKind) -> Self {
        match kind {
            ExpressionKind::String => Self::String,
            _ => Self::Number,
        }
    }
}

/// Read-only catalog of instructions and expressions.
pub trait MetadataProvider {
    fn condition(&self, type_name: &str) -> Option<&InstructionMetadata>;
    fn action(&self, type_name: &str) -> Option<&InstructionMetadata>;
    fn free_expression(&self, kind: ValueKind, name: &str) -> Option<&ExpressionMetadata>;
    /// `object_type` may be empty; implementations fall back to
    /// expressions available on every object.
    fn object_expression(
        &self,
        kind: ValueKind,
        object_type: &str,
        name: &str,
    ) -> Option<&ExpressionMetadata>;
    fn behavior_expression(
        &self,
        kind: ValueKind,
        behavior_type: &str,
        name: &str,
    ) -> Option<&ExpressionMetadata>;
}

/// Number and string expressions sharing a namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionTable {
    #[serde(default)]
    pub number: HashMap<String, ExpressionMetadata>,
    #[serde(default)]
    pub string: HashMap<String, ExpressionMetadata>,
}

impl ExpressionTable {
    fn get(&self, kind: ValueKind, name: &str) -> Option<&ExpressionMetadata> {
        match kind {
            ValueKind::Number => self.number.get(name),
            ValueKind::String => self.string.get(name),
        }
    }

    fn insert(&mut self, kind: ValueKind, name: String, metadata: ExpressionMetadata) {
        match kind {
            ValueKind::Number => self.number.insert(name, metadata),
            ValueKind::String => self.string.insert(name, metadata),
        };
    }
}

/// In-memory [`MetadataProvider`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRegistry {
    #[serde(default)]
    pub conditions: HashMap<String, InstructionMetadata>,
    #[serde(default)]
    pub actions: HashMap<String, InstructionMetadata>,
    #[serde(default)]
    pub expressions: ExpressionTable,
    /// Keyed by object type; the empty key holds base object expressions.
    #[serde(default)]
    pub object_expressions: HashMap<String, ExpressionTable>,
    /// Keyed by behavior type.
    #[serde(default)]
    pub behavior_expressions: HashMap<String, ExpressionTable>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_condition(&mut self, type_name: impl Into<String>, metadata: InstructionMetadata) {
        self.conditions.insert(type_name.into(), metadata);
    }

    pub fn add_action(&mut self, type_name: impl Into<String>, metadata: InstructionMetadata) {
        self.actions.insert(type_name.into(), metadata);
    }

    pub fn add_expression(
        &mut self,
        kind: ValueKind,
        name: impl Into<String>,
        metadata: ExpressionMetadata,
    ) {
        self.expressions.insert(kind, name.into(), metadata);
    }

    pub fn add_object_expression(
        &mut self,
        kind: ValueKind,
        object_type: impl Into<String>,
        name: impl Into<String>,
        metadata: ExpressionMetadata,
    ) {
        self.object_expressions
            .entry(object_type.into())
            .or_default()
            .insert(kind, name.into(), metadata);
    }

    pub fn add_behavior_expression(
        &mut self,
        kind: ValueKind,
        behavior_type: impl Into<String>,
        name: impl Into<String>,
        metadata: ExpressionMetadata,
    ) {
        self.behavior_expressions
            .entry(behavior_type.into())
            .or_default()
            .insert(kind, name.into(), metadata);
    }
}

impl MetadataProvider for MetadataRegistry {
    fn condition(&self, type_name: &str) -> Option<&InstructionMetadata> {
        self.conditions.get(type_name)
    }

    fn action(&self, type_name: &str) -> Option<&InstructionMetadata> {
        self.actions.get(type_name)
    }

    fn free_expression(&self, kind: ValueKind, name: &str) -> Option<&ExpressionMetadata> {
        self.expressions.get(kind, name)
    }

    fn object_expression(
        &self,
        kind: ValueKind,
        object_type: &str,
        name: &str,
    ) -> Option<&ExpressionMetadata> {
        self.object_expressions
            .get(object_type)
            .and_then(|t| t.get(kind, name))
            .or_else(|| self.object_expressions.get("").and_then(|t| t.get(kind, name)))
    }

    fn behavior_expression(
        &self,
        kind: ValueKind,
        behavior_type: &str,
        name: &str,
    ) -> Option<&ExpressionMetadata> {
        self.behavior_expressions
            .get(behavior_type)
            .and_then(|t| t.get(kind, name))
    }
}
