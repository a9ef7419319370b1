//! Project containers: objects, groups, layouts and external events.

use serde::{Deserialize, Serialize};

use crate::{EventArena, EventId};

/// A behavior attached to an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub behavior_type: String,
}

/// An object declared in a layout or globally in the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(default)]
    pub behaviors: Vec<BehaviorDecl>,
}

impl ObjectDecl {
    pub fn new(name: impl Into<String>, object_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            object_type: object_type.into(),
            behaviors: Vec::new(),
        }
    }

    pub fn with_behavior(
        mut self,
        name: impl Into<String>,
        behavior_type: impl Into<String>,
    ) -> Self {
        self.behaviors.push(BehaviorDecl {
            name: name.into(),
            behavior_type: behavior_type.into(),
        });
        self
    }

    pub fn behavior(&self, name: &str) -> Option<&BehaviorDecl> {
        self.behaviors.iter().find(|b| b.name == name)
    }
}

/// A named set of objects usable wherever an object name is expected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectGroup {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<String>,
}

impl ObjectGroup {
    pub fn new<I, S>(name: impl Into<String>, objects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            objects: objects.into_iter().map(Into::into).collect(),
        }
    }
}

/// A scene with its own objects and root events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<ObjectDecl>,
    #[serde(default)]
    pub groups: Vec<ObjectGroup>,
    #[serde(default)]
    pub events: Vec<EventId>,
}

impl Layout {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// An event sheet shared between layouts through `Link` events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalEvents {
    pub name: String,
    /// Layout whose objects the sheet is compiled against.
    #[serde(default)]
    pub associated_layout: Option<String>,
    #[serde(default)]
    pub events: Vec<EventId>,
}

/// The two kinds of event sheets. A layout and external events may share a
/// name, so a sheet is identified by both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SheetKind {
    Layout,
    ExternalEvents,
}

/// A whole game: global objects, layouts, external events and the arena
/// holding every event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<ObjectDecl>,
    #[serde(default)]
    pub groups: Vec<ObjectGroup>,
    #[serde(default)]
    pub layouts: Vec<Layout>,
    #[serde(default)]
    pub external_events: Vec<ExternalEvents>,
    #[serde(default)]
    pub events: EventArena,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn layout(&self, name: &str) -> Option<&Layout> {
        self.layouts.iter().find(|l| l.name == name)
    }

    pub fn layout_mut(&mut self, name: &str) -> Option<&mut Layout> {
        self.layouts.iter_mut().find(|l| l.name == name)
    }

    pub fn external_events(&self, name: &str) -> Option<&ExternalEvents> {
        self.external_events.iter().find(|e| e.name == name)
    }

    /// Kind and root events of the sheet a `Link` named `target` refers
    /// to: external events first, then layouts.
    pub fn linked_sheet(&self, target: &str) -> Option<(SheetKind, &[EventId])> {
        self.external_events(target)
            .map(|e| (SheetKind::ExternalEvents, e.events.as_slice()))
            .or_else(|| {
                self.layout(target)
                    .map(|l| (SheetKind::Layout, l.events.as_slice()))
            })
    }
}
