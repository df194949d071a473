//! Resolution policy: which converter applies to an (application type,
//! wire type) request.
//!
//! ```text
//! level 0   Manager                 (Manager, TAG) > (Manager, any) > sole converter of Manager
//! level 1   Employee, Auditable     same order; newest registration wins within a level
//! level 2   Person                  ...
//! ```
//!
//! The first level holding a candidate decides. An unconstrained extraction
//! (no application type) goes to the default-for-wire-type table instead.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::converter::ConverterRef;
use crate::value::AppType;
use crate::wire::WireType;

/// Whether the wire type is a constraint (binding) or a hint (extraction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Binding,
    Extraction,
}

/// How a resolution was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Entry registered for the requested wire type.
    Tagged,
    /// Entry registered for any wire type.
    Any,
    /// The type's only converter, whatever tags it was registered under.
    Sole,
    /// Default-for-wire-type table.
    WireDefault,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchKind::Tagged => "tagged",
            MatchKind::Any => "any",
            MatchKind::Sole => "sole",
            MatchKind::WireDefault => "wire default",
        })
    }
}

/// Outcome of a resolution, with where it matched.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub converter: ConverterRef,
    /// Type whose entry matched; `None` for a wire default.
    pub matched_type: Option<AppType>,
    /// Tag the matching entry was registered under; `None` for "any".
    pub entry_tag: Option<WireType>,
    /// Hierarchy level of the match, 0 for the requested type itself.
    pub depth: usize,
    pub kind: MatchKind,
}

#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub converter: ConverterRef,
    pub seq: u64,
}

/// Registration state the policy runs over.
#[derive(Debug, Default)]
pub(crate) struct Table {
    pub entries: HashMap<AppType, HashMap<Option<WireType>, Entry>>,
    pub parents: HashMap<AppType, Vec<AppType>>,
    pub wire_defaults: HashMap<WireType, Entry>,
    pub next_seq: u64,
}

struct Candidate<'a> {
    app_type: &'a AppType,
    tag: Option<WireType>,
    entry: &'a Entry,
}

impl Table {
    pub fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Breadth-first ancestry of `root`; each type appears once, at its
    /// shallowest level.
    pub fn levels(&self, root: &AppType) -> Vec<Vec<AppType>> {
        let mut seen: HashSet<AppType> = HashSet::new();
        seen.insert(root.clone());
        let mut levels = vec![vec![root.clone()]];

        loop {
            let mut next = Vec::new();
            if let Some(current) = levels.last() {
                for ty in current {
                    for parent in self.parents.get(ty).into_iter().flatten() {
                        if seen.insert(parent.clone()) {
                            next.push(parent.clone());
                        }
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            levels.push(next);
        }
        levels
    }

    pub fn resolve(
        &self,
        app_type: Option<&AppType>,
        tag: Option<WireType>,
        mode: Mode,
    ) -> Option<Resolution> {
        let Some(app_type) = app_type else {
            if mode != Mode::Extraction {
                return None;
            }
            let tag = tag?;
            return self.wire_defaults.get(&tag).map(|entry| Resolution {
                converter: entry.converter.clone(),
                matched_type: None,
                entry_tag: Some(tag),
                depth: 0,
                kind: MatchKind::WireDefault,
            });
        };

        self.levels(app_type)
            .iter()
            .enumerate()
            .find_map(|(depth, level)| self.pick(level, tag, mode, depth))
    }

    fn pick(
        &self,
        level: &[AppType],
        tag: Option<WireType>,
        mode: Mode,
        depth: usize,
    ) -> Option<Resolution> {
        let compatible = |entry: &Entry| match (tag, mode) {
            (Some(t), Mode::Binding) => entry.converter.supports(t),
            _ => true,
        };

        if let Some(t) = tag {
            let tagged = level.iter().filter_map(|ty| {
                let entry = self.entries.get(ty)?.get(&Some(t))?;
                Some(Candidate { app_type: ty, tag: Some(t), entry })
            });
            if let Some(c) = newest(tagged) {
                return Some(c.resolved(MatchKind::Tagged, depth));
            }
        }

        let any = level.iter().filter_map(|ty| {
            let entry = self.entries.get(ty)?.get(&None)?;
            compatible(entry).then_some(Candidate { app_type: ty, tag: None, entry })
        });
        if let Some(c) = newest(any) {
            return Some(c.resolved(MatchKind::Any, depth));
        }

        let sole = level.iter().filter_map(|ty| {
            let (tag, entry) = sole_entry(self.entries.get(ty)?)?;
            compatible(entry).then_some(Candidate { app_type: ty, tag, entry })
        });
        newest(sole).map(|c| c.resolved(MatchKind::Sole, depth))
    }
}

impl Candidate<'_> {
    fn resolved(self, kind: MatchKind, depth: usize) -> Resolution {
        Resolution {
            converter: self.entry.converter.clone(),
            matched_type: Some(self.app_type.clone()),
            entry_tag: self.tag,
            depth,
            kind,
        }
    }
}

/// Latest registration among same-level candidates.
fn newest<'a>(candidates: impl Iterator<Item = Candidate<'a>>) -> Option<Candidate<'a>> {
    candidates.max_by_key(|c| c.entry.seq)
}

/// The newest entry of a type, if every entry of it shares one converter.
fn sole_entry(entries: &HashMap<Option<WireType>, Entry>) -> Option<(Option<WireType>, &Entry)> {
    let (tag, newest) = entries.iter().max_by_key(|(_, e)| e.seq)?;
    entries
        .values()
        .all(|e| Arc::ptr_eq(&e.converter, &newest.converter))
        .then_some((*tag, newest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{IntegerConverter, StringConverter};

    fn entry(table: &mut Table, converter: ConverterRef) -> Entry {
        Entry {
            converter,
            seq: table.next_seq(),
        }
    }

    fn add(table: &mut Table, ty: &str, tag: Option<WireType>, converter: ConverterRef) {
        let e = entry(table, converter);
        table
            .entries
            .entry(AppType::new(ty))
            .or_default()
            .insert(tag, e);
    }

    fn parent(table: &mut Table, child: &str, parents: &[&str]) {
        table.parents.insert(
            AppType::new(child),
            parents.iter().map(|p| AppType::new(*p)).collect(),
        );
    }

    #[test]
    fn test_levels_visit_diamond_once() {
        let mut table = Table::default();
        parent(&mut table, "D", &["B", "C"]);
        parent(&mut table, "B", &["A"]);
        parent(&mut table, "C", &["A"]);
        parent(&mut table, "A", &["D"]);

        let levels = table.levels(&AppType::new("D"));
        assert_eq!(
            levels,
            vec![
                vec![AppType::new("D")],
                vec![AppType::new("B"), AppType::new("C")],
                vec![AppType::new("A")],
            ]
        );
    }

    #[test]
    fn test_own_any_entry_beats_ancestor_tagged_entry() {
        let mut table = Table::default();
        let string: ConverterRef = Arc::new(StringConverter);
        add(&mut table, "Base", Some(WireType::Varchar), string.clone());
        add(&mut table, "Derived", None, string);
        parent(&mut table, "Derived", &["Base"]);

        let r = table
            .resolve(Some(&AppType::new("Derived")), Some(WireType::Varchar), Mode::Binding)
            .unwrap();
        assert_eq!(r.kind, MatchKind::Any);
        assert_eq!(r.depth, 0);
    }

    #[test]
    fn test_newest_wins_within_a_level() {
        let mut table = Table::default();
        let first: ConverterRef = Arc::new(StringConverter);
        let second: ConverterRef = Arc::new(StringConverter);
        add(&mut table, "Left", None, first);
        add(&mut table, "Right", None, second.clone());
        parent(&mut table, "Child", &["Left", "Right"]);

        let r = table
            .resolve(Some(&AppType::new("Child")), None, Mode::Binding)
            .unwrap();
        assert!(Arc::ptr_eq(&r.converter, &second));
        assert_eq!(r.matched_type, Some(AppType::new("Right")));
        assert_eq!(r.depth, 1);
    }

    #[test]
    fn test_binding_skips_any_entry_that_cannot_encode_tag() {
        let mut table = Table::default();
        add(&mut table, "Amount", None, Arc::new(IntegerConverter::I64));
        assert!(table
            .resolve(Some(&AppType::new("Amount")), Some(WireType::Blob), Mode::Binding)
            .is_none());
        // As an extraction hint the tag does not exclude the entry.
        assert!(table
            .resolve(Some(&AppType::new("Amount")), Some(WireType::Blob), Mode::Extraction)
            .is_some());
    }

    #[test]
    fn test_sole_converter_answers_untagged_request() {
        let mut table = Table::default();
        let string: ConverterRef = Arc::new(StringConverter);
        add(&mut table, "Code", Some(WireType::Char), string.clone());
        add(&mut table, "Code", Some(WireType::Varchar), string);

        let r = table
            .resolve(Some(&AppType::new("Code")), None, Mode::Binding)
            .unwrap();
        assert_eq!(r.kind, MatchKind::Sole);
        assert_eq!(r.entry_tag, Some(WireType::Varchar));
    }

    #[test]
    fn test_unconstrained_only_in_extraction() {
        let mut table = Table::default();
        let e = entry(&mut table, Arc::new(IntegerConverter::I32));
        table.wire_defaults.insert(WireType::Integer, e);

        assert!(table.resolve(None, Some(WireType::Integer), Mode::Binding).is_none());
        let r = table
            .resolve(None, Some(WireType::Integer), Mode::Extraction)
            .unwrap();
        assert_eq!(r.kind, MatchKind::WireDefault);
        assert!(table.resolve(None, None, Mode::Extraction).is_none());
    }
}
