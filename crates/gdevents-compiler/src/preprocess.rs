//! Event tree preprocessing, run before code generation.
//!
//! Works on a private copy of the project arena:
//! 1. `Link` events are replaced by deep copies of the events they name.
//! 2. Disabled and non-executable events are removed.
//! 3. Optionally, profiling markers are inserted around every event.
//!
//! The compiled sheet's own events are rewritten in place so diagnostics
//! keep pointing at the ids the caller knows. Trees are checked before
//! they are walked or copied, and splicing never nests events deeper than
//! [`MAX_EVENT_DEPTH`].

use gdevents_codegen::{check_tree, CodegenError, CodegenResult, MAX_EVENT_DEPTH};
use gdevents_types::{
    Diagnostic, DiagnosticLocation, Diagnostics, ErrorCode, Event, EventArena, EventId, EventKind,
    LinkInclude, Project, SheetKind,
};
use log::debug;

pub struct Preprocessor<'a> {
    project: &'a Project,
    arena: &'a mut EventArena,
    sheet: String,
    /// Sheets whose events are being expanded, outermost first.
    expanding: Vec<(SheetKind, String)>,
    diagnostics: Diagnostics,
}

impl<'a> Preprocessor<'a> {
    /// `arena` must be a copy of `project.events`.
    pub fn new(
        project: &'a Project,
        arena: &'a mut EventArena,
        kind: SheetKind,
        sheet: impl Into<String>,
    ) -> Self {
        let sheet = sheet.into();
        Self {
            project,
            arena,
            expanding: vec![(kind, sheet.clone())],
            sheet,
            diagnostics: Diagnostics::empty(),
        }
    }

    /// Preprocess the root list `roots` and return the new root list.
    ///
    /// Fails like code generation would on missing ids and on trees nested
    /// too deep, including cycles, whether in `roots` or in linked sheets.
    pub fn run(&mut self, roots: &[EventId], profiling: bool) -> CodegenResult<Vec<EventId>> {
        check_tree(self.arena, roots)?;
        let expanded = self.expand_links(roots.to_vec(), 1)?;
        let kept = remove_useless_events(self.arena, expanded);
        if !profiling {
            return Ok(kept);
        }
        let profiled = add_profiling_markers(self.arena, kept);
        debug!(
            "profiling markers inserted in \"{}\" ({} root entries)",
            self.sheet,
            profiled.len()
        );
        Ok(profiled)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    // ── Links ─────────────────────────────────────────────────────────────────

    /// Expand the links of `list`, whose events sit at nesting `depth`.
    fn expand_links(&mut self, list: Vec<EventId>, depth: usize) -> CodegenResult<Vec<EventId>> {
        let mut out = Vec::with_capacity(list.len());
        for id in list {
            if depth > MAX_EVENT_DEPTH {
                return Err(CodegenError::TooDeep {
                    event: id,
                    limit: MAX_EVENT_DEPTH,
                });
            }
            let Some(event) = self.arena.get(id) else {
                continue;
            };
            match &event.kind {
                EventKind::Link { target, include } if !event.disabled => {
                    let (target, include) = (target.clone(), *include);
                    out.extend(self.splice(id, &target, include, depth)?);
                }
                _ => {
                    let sub_events = std::mem::take(&mut self.arena[id].sub_events);
                    let sub_events = self.expand_links(sub_events, depth + 1)?;
                    self.arena[id].sub_events = sub_events;
                    out.push(id);
                }
            }
        }
        Ok(out)
    }

    /// Copies of the events `link` includes, already expanded. A link that
    /// cannot be followed is dropped with a diagnostic.
    fn splice(
        &mut self,
        link: EventId,
        target: &str,
        include: LinkInclude,
        depth: usize,
    ) -> CodegenResult<Vec<EventId>> {
        let project = self.project;
        let Some((kind, roots)) = project.linked_sheet(target) else {
            self.report(
                link,
                ErrorCode::UNKNOWN_LINK_TARGET,
                format!("No layout or external events named \"{target}\""),
            );
            return Ok(Vec::new());
        };
        if self
            .expanding
            .iter()
            .any(|(k, name)| *k == kind && name == target)
        {
            self.report(
                link,
                ErrorCode::CIRCULAR_LINK,
                format!("Link to \"{target}\" includes itself"),
            );
            return Ok(Vec::new());
        }
        let selected = included(roots, include);
        check_tree(self.arena, selected)?;
        let copies: Vec<EventId> = selected
            .iter()
            .filter_map(|&id| self.arena.deep_clone(id))
            .collect();
        debug!(
            "link {link} to \"{target}\" spliced {} events into \"{}\"",
            copies.len(),
            self.sheet
        );
        self.expanding.push((kind, target.to_string()));
        let expanded = self.expand_links(copies, depth);
        self.expanding.pop();
        expanded
    }

    fn report(&mut self, event: EventId, code: ErrorCode, message: String) {
        let location = DiagnosticLocation {
            sheet: self.sheet.clone(),
            event: Some(event),
            instruction: None,
        };
        self.diagnostics.push(Diagnostic::new(code, message, location));
    }
}

/// The part of `roots` a link includes; ranges are inclusive and clamped.
fn included(roots: &[EventId], include: LinkInclude) -> &[EventId] {
    match include {
        LinkInclude::All => roots,
        LinkInclude::Range { start, end } => {
            if start >= roots.len() || start > end {
                return &[];
            }
            let end = end.min(roots.len() - 1);
            &roots[start..=end]
        }
    }
}

/// Drop disabled and non-executable events, at every level.
pub fn remove_useless_events(arena: &mut EventArena, list: Vec<EventId>) -> Vec<EventId> {
    let mut out = Vec::with_capacity(list.len());
    for id in list {
        let keep = arena
            .get(id)
            .is_some_and(|event| !event.disabled && event.is_executable());
        if !keep {
            continue;
        }
        let sub_events = std::mem::take(&mut arena[id].sub_events);
        arena[id].sub_events = remove_useless_events(arena, sub_events);
        out.push(id);
    }
    out
}

/// Put a profiling marker before every event of every list and one after
/// the last, each marker linked to the previous one of its list.
pub fn add_profiling_markers(arena: &mut EventArena, list: Vec<EventId>) -> Vec<EventId> {
    let mut out = Vec::with_capacity(list.len() * 2 + 1);
    let mut previous = None;
    for id in list {
        if arena.get(id).is_none() {
            continue;
        }
        let sub_events = std::mem::take(&mut arena[id].sub_events);
        arena[id].sub_events = add_profiling_markers(arena, sub_events);
        let marker = arena.push(Event::profile(previous));
        out.push(marker);
        out.push(id);
        previous = Some(marker);
    }
    if previous.is_some() {
        out.push(arena.push(Event::profile(previous)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u32) -> Vec<EventId> {
        (0..n).map(EventId).collect()
    }

    #[test]
    fn test_range_is_clamped() {
        let roots = ids(3);
        assert_eq!(included(&roots, LinkInclude::Range { start: 1, end: 10 }), &roots[1..]);
        assert_eq!(included(&roots, LinkInclude::Range { start: 0, end: 0 }), &roots[..1]);
        assert!(included(&roots, LinkInclude::Range { start: 3, end: 4 }).is_empty());
        assert!(included(&roots, LinkInclude::Range { start: 2, end: 1 }).is_empty());
        assert_eq!(included(&roots, LinkInclude::All), &roots[..]);
    }

    #[test]
    fn test_useless_events_removed_recursively() {
        let mut arena = EventArena::new();
        let comment = arena.push(Event::comment("note"));
        let off = arena.push(Event::standard(vec![], vec![]).disabled());
        let kept_child = arena.push(Event::standard(vec![], vec![]));
        let parent = arena.push(
            Event::standard(vec![], vec![]).with_sub_events(vec![comment, kept_child, off]),
        );
        let kept = remove_useless_events(&mut arena, vec![comment, parent, off]);
        assert_eq!(kept, vec![parent]);
        assert_eq!(arena[parent].sub_events, vec![kept_child]);
    }

    #[test]
    fn test_markers_are_chained() {
        let mut arena = EventArena::new();
        let a = arena.push(Event::standard(vec![], vec![]));
        let b = arena.push(Event::standard(vec![], vec![]));
        let list = add_profiling_markers(&mut arena, vec![a, b]);
        assert_eq!(list.len(), 5);
        assert_eq!(list[1], a);
        assert_eq!(list[3], b);
        assert_eq!(arena[list[0]].kind, EventKind::Profile { previous: None });
        assert_eq!(arena[list[2]].kind, EventKind::Profile { previous: Some(list[0]) });
        assert_eq!(arena[list[4]].kind, EventKind::Profile { previous: Some(list[2]) });
    }

    #[test]
    fn test_no_markers_in_empty_list() {
        let mut arena = EventArena::new();
        assert!(add_profiling_markers(&mut arena, Vec::new()).is_empty());
        assert!(arena.is_empty());
    }
}
