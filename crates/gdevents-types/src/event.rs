//! Event tree nodes, stored in an arena and addressed by [`EventId`].
//!
//! A sheet (layout or external events) is a `Vec<EventId>` of root events;
//! every event owns the ordered list of its sub-events. `Link` is the one
//! non-owning edge: it names another sheet and is resolved before code
//! generation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

// ══════════════════════════════════════════════════════════════════════════════
// Ids and expressions
// ══════════════════════════════════════════════════════════════════════════════

/// Index of an event in an [`EventArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u32);

impl EventId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Raw user-authored parameter text.
///
/// Its parsed form depends only on this text and on the parameter type
/// declared for its position, so nothing else is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Expression {
    text: String,
}

impl Expression {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl From<&str> for Expression {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Expression {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// Semantic kind an [`Expression`] is parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExpressionKind {
    Math,
    String,
    VariablePath,
    /// Synthesized by the generator (e.g. the current scene handle).
    CodeOnly,
}

impl fmt::Display for ExpressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Math => write!(f, "math"),
            Self::String => write!(f, "string"),
            Self::VariablePath => write!(f, "variable path"),
            Self::CodeOnly => write!(f, "code-only"),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Instructions
// ══════════════════════════════════════════════════════════════════════════════

/// A condition or action instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    /// Key into the metadata registry.
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub parameters: Vec<Expression>,
    /// Conditions only.
    #[serde(default)]
    pub inverted: bool,
    /// Children of compound conditions (`And`, `Or`, `Not`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_instructions: Vec<Instruction>,
}

impl Instruction {
    pub fn new<I, E>(type_name: impl Into<String>, parameters: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expression>,
    {
        Self {
            type_name: type_name.into(),
            parameters: parameters.into_iter().map(Into::into).collect(),
            inverted: false,
            sub_instructions: Vec::new(),
        }
    }

    /// Mark the condition as inverted.
    pub fn inverted(mut self) -> Self {
        self.inverted = true;
        self
    }

    pub fn with_sub_instructions(mut self, subs: Vec<Instruction>) -> Self {
        self.sub_instructions = subs;
        self
    }

    /// Parameter text at `index`, or `""` when the instance has fewer.
    pub fn parameter(&self, index: usize) -> &str {
        self.parameters.get(index).map_or("", Expression::as_str)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Events
// ══════════════════════════════════════════════════════════════════════════════

/// Which root events of the target sheet a `Link` includes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkInclude {
    #[default]
    All,
    /// Inclusive index range, clamped to the target's length.
    Range { start: usize, end: usize },
}

/// Per-kind payload of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventKind {
    Standard {
        #[serde(default)]
        conditions: Vec<Instruction>,
        #[serde(default)]
        actions: Vec<Instruction>,
    },
    Comment {
        #[serde(default)]
        text: String,
    },
    While {
        #[serde(default, rename = "whileConditions")]
        while_conditions: Vec<Instruction>,
        #[serde(default)]
        conditions: Vec<Instruction>,
        #[serde(default)]
        actions: Vec<Instruction>,
    },
    Repeat {
        count: Expression,
        #[serde(default)]
        conditions: Vec<Instruction>,
        #[serde(default)]
        actions: Vec<Instruction>,
    },
    /// Runs its conditions, actions and sub-events once per picked
    /// instance of `object`, each time with only that instance picked.
    ForEach {
        object: String,
        #[serde(default)]
        conditions: Vec<Instruction>,
        #[serde(default)]
        actions: Vec<Instruction>,
    },
    Group {
        name: String,
    },
    Link {
        target: String,
        #[serde(default)]
        include: LinkInclude,
    },
    /// Profiling marker. `previous` is the marker that came before it in
    /// the same list, whose timer this one stops.
    Profile {
        #[serde(default)]
        previous: Option<EventId>,
    },
}

/// A node of the event tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(flatten)]
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_events: Vec<EventId>,
    #[serde(default)]
    pub disabled: bool,
}

impl Event {
    fn of(kind: EventKind) -> Self {
        Self {
            kind,
            sub_events: Vec::new(),
            disabled: false,
        }
    }

    pub fn standard(conditions: Vec<Instruction>, actions: Vec<Instruction>) -> Self {
        Self::of(EventKind::Standard {
            conditions,
            actions,
        })
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Self::of(EventKind::Comment { text: text.into() })
    }

    pub fn while_loop(
        while_conditions: Vec<Instruction>,
        conditions: Vec<Instruction>,
        actions: Vec<Instruction>,
    ) -> Self {
        Self::of(EventKind::While {
            while_conditions,
            conditions,
            actions,
        })
    }

    pub fn repeat(
        count: impl Into<Expression>,
        conditions: Vec<Instruction>,
        actions: Vec<Instruction>,
    ) -> Self {
        Self::of(EventKind::Repeat {
            count: count.into(),
            conditions,
            actions,
        })
    }

    pub fn for_each(
        object: impl Into<String>,
        conditions: Vec<Instruction>,
        actions: Vec<Instruction>,
    ) -> Self {
        Self::of(EventKind::ForEach {
            object: object.into(),
            conditions,
            actions,
        })
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::of(EventKind::Group { name: name.into() })
    }

    pub fn link(target: impl Into<String>, include: LinkInclude) -> Self {
        Self::of(EventKind::Link {
            target: target.into(),
            include,
        })
    }

    pub fn profile(previous: Option<EventId>) -> Self {
        Self::of(EventKind::Profile { previous })
    }

    pub fn with_sub_events(mut self, sub_events: Vec<EventId>) -> Self {
        self.sub_events = sub_events;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Whether the event produces code at all.
    pub fn is_executable(&self) -> bool {
        !matches!(self.kind, EventKind::Comment { .. } | EventKind::Link { .. })
    }

    /// Whether sub-events of this kind are generated.
    pub fn can_have_sub_events(&self) -> bool {
        matches!(
            self.kind,
            EventKind::Standard { .. }
                | EventKind::While { .. }
                | EventKind::Repeat { .. }
                | EventKind::ForEach { .. }
                | EventKind::Group { .. }
        )
    }

    /// Short kind name, for logs.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            EventKind::Standard { .. } => "standard",
            EventKind::Comment { .. } => "comment",
            EventKind::While { .. } => "while",
            EventKind::Repeat { .. } => "repeat",
            EventKind::ForEach { .. } => "forEach",
            EventKind::Group { .. } => "group",
            EventKind::Link { .. } => "link",
            EventKind::Profile { .. } => "profile",
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Arena
// ══════════════════════════════════════════════════════════════════════════════

/// Owning storage for every event of a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventArena {
    nodes: Vec<Event>,
}

impl EventArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an event and return its id.
    pub fn push(&mut self, event: Event) -> EventId {
        let id = EventId(self.nodes.len() as u32);
        self.nodes.push(event);
        id
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.nodes.get(id.index())
    }

    pub fn get_mut(&mut self, id: EventId) -> Option<&mut Event> {
        self.nodes.get_mut(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append `child` to the sub-events of `parent`.
    pub fn add_sub_event(&mut self, parent: EventId, child: EventId) {
        if let Some(event) = self.nodes.get_mut(parent.index()) {
            event.sub_events.push(child);
        }
    }

    /// Copy the subtree rooted at `id` into fresh nodes.
    ///
    /// Returns `None` if `id` is not in the arena. The subtree must be
    /// acyclic.
    pub fn deep_clone(&mut self, id: EventId) -> Option<EventId> {
        let mut copy = self.get(id)?.clone();
        let children = std::mem::take(&mut copy.sub_events);
        copy.sub_events = children
            .into_iter()
            .filter_map(|child| self.deep_clone(child))
            .collect();
        Some(self.push(copy))
    }

    /// Ids of every event in `roots` and below, depth-first.
    pub fn walk(&self, roots: &[EventId]) -> Vec<EventId> {
        let mut out = Vec::new();
        let mut stack: Vec<EventId> = roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if let Some(event) = self.get(id) {
                out.push(id);
                stack.extend(event.sub_events.iter().rev().copied());
            }
        }
        out
    }
}

impl Index<EventId> for EventArena {
    type Output = Event;

    fn index(&self, id: EventId) -> &Event {
        &self.nodes[id.index()]
    }
}

impl IndexMut<EventId> for EventArena {
    fn index_mut(&mut self, id: EventId) -> &mut Event {
        &mut self.nodes[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(name: &str) -> Instruction {
        Instruction::new(name, ["1"])
    }

    #[test]
    fn test_push_and_sub_events() {
        let mut arena = EventArena::new();
        let parent = arena.push(Event::standard(vec![], vec![action("A")]));
        let child = arena.push(Event::comment("note"));
        arena.add_sub_event(parent, child);
        assert_eq!(arena[parent].sub_events, vec![child]);
        assert!(!arena[child].is_executable());
        assert!(arena[parent].can_have_sub_events());
    }

    #[test]
    fn test_deep_clone_copies_subtree() {
        let mut arena = EventArena::new();
        let leaf = arena.push(Event::standard(vec![], vec![action("Leaf")]));
        let root = arena.push(Event::group("G").with_sub_events(vec![leaf]));
        let copy = arena.deep_clone(root).unwrap();
        assert_ne!(copy, root);
        let copied_leaf = arena[copy].sub_events[0];
        assert_ne!(copied_leaf, leaf);
        assert_eq!(arena[copied_leaf], arena[leaf]);
        assert_eq!(arena.len(), 4);
    }

    #[test]
    fn test_walk_is_depth_first() {
        let mut arena = EventArena::new();
        let a1 = arena.push(Event::comment("a1"));
        let a = arena.push(Event::group("a").with_sub_events(vec![a1]));
        let b = arena.push(Event::comment("b"));
        assert_eq!(arena.walk(&[a, b]), vec![a, a1, b]);
    }

    #[test]
    fn test_instruction_parameter_padding() {
        let instr = Instruction::new("Create", ["", "Enemy"]);
        assert_eq!(instr.parameter(1), "Enemy");
        assert_eq!(instr.parameter(5), "");
    }

    #[test]
    fn test_event_json_shape() {
        let event = Event::while_loop(vec![action("C")], vec![], vec![]);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "while");
        assert_eq!(json["whileConditions"][0]["type"], "C");
        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_for_each_json() {
        let event: Event = serde_json::from_str(
            r#"{"type":"forEach","object":"Enemy","actions":[{"type":"A","parameters":["1"]}]}"#,
        )
        .unwrap();
        assert_eq!(event, Event::for_each("Enemy", vec![], vec![action("A")]));
        assert_eq!(event.kind_name(), "forEach");
        assert!(event.can_have_sub_events());
        assert!(event.is_executable());
    }

    #[test]
    fn test_link_include_json() {
        let event = Event::link("Common", LinkInclude::Range { start: 1, end: 3 });
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        let all: Event = serde_json::from_str(r#"{"type":"link","target":"X"}"#).unwrap();
        assert_eq!(
            all.kind,
            EventKind::Link {
                target: "X".into(),
                include: LinkInclude::All
            }
        );
    }
}
