//! Filtered view over the current results.
//!
//! [`FilterState`] is pure view state: a text query and a delta-only toggle.
//! [`Projection`] applies it to a slice of groups lazily. It never mutates
//! groups or marks, and can be iterated any number of times.
//!
//! Text matching is case-insensitive and compares Unicode NFC forms, so a
//! query typed on one platform matches paths stored decomposed (macOS NFD).

use std::slice;

use unicode_normalization::UnicodeNormalization;

use super::file::FileRef;
use super::group::DuplicateGroup;

/// Current filter settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    query: String,
    needle: Option<String>,
    delta_only: bool,
}

impl FilterState {
    /// Create a filter from a text query and the delta-only flag.
    ///
    /// A blank query matches everything.
    #[must_use]
    pub fn new(query: impl Into<String>, delta_only: bool) -> Self {
        let query = query.into();
        let needle = normalize(query.trim());
        Self {
            needle: (!needle.is_empty()).then_some(needle),
            query,
            delta_only,
        }
    }

    #[must_use]
    pub fn with_query(self, query: impl Into<String>) -> Self {
        Self::new(query, self.delta_only)
    }

    #[must_use]
    pub fn with_delta_only(mut self, delta_only: bool) -> Self {
        self.delta_only = delta_only;
        self
    }

    /// The query as typed.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn delta_only(&self) -> bool {
        self.delta_only
    }

    /// Whether this filter hides anything at all.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.needle.is_some() || self.delta_only
    }

    /// Whether a single file's display text contains the query.
    #[must_use]
    pub fn matches_file(&self, file: &FileRef) -> bool {
        match &self.needle {
            Some(needle) => normalize(&file.display_text()).contains(needle.as_str()),
            None => true,
        }
    }

    /// Project one group: `None` when the group is hidden, otherwise the
    /// members to show.
    #[must_use]
    pub fn view<'a>(&self, group: &'a DuplicateGroup) -> Option<GroupView<'a>> {
        if group.is_dissolved() {
            return None;
        }
        if self.delta_only && !group.has_size_delta() {
            return None;
        }
        let members: Vec<&FileRef> = group
            .members()
            .iter()
            .filter(|m| self.matches_file(m))
            .collect();
        if members.is_empty() {
            return None;
        }
        Some(GroupView { group, members })
    }
}

fn normalize(text: &str) -> String {
    text.nfc().collect::<String>().to_lowercase()
}

/// A visible group and its matching members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupView<'a> {
    pub group: &'a DuplicateGroup,
    pub members: Vec<&'a FileRef>,
}

/// Lazy, restartable projection of groups through a filter.
#[derive(Debug, Clone, Copy)]
pub struct Projection<'a> {
    groups: &'a [DuplicateGroup],
    filter: &'a FilterState,
}

impl<'a> Projection<'a> {
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup], filter: &'a FilterState) -> Self {
        Self { groups, filter }
    }

    /// Start a fresh pass over the visible groups.
    #[must_use]
    pub fn iter(&self) -> ProjectionIter<'a> {
        ProjectionIter {
            groups: self.groups.iter(),
            filter: self.filter,
        }
    }

    /// Number of visible groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.iter().count()
    }

    /// Number of visible files across all visible groups.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.iter().map(|v| v.members.len()).sum()
    }
}

impl<'a> IntoIterator for &Projection<'a> {
    type Item = GroupView<'a>;
    type IntoIter = ProjectionIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator returned by [`Projection::iter`].
#[derive(Debug, Clone)]
pub struct ProjectionIter<'a> {
    groups: slice::Iter<'a, DuplicateGroup>,
    filter: &'a FilterState,
}

impl<'a> Iterator for ProjectionIter<'a> {
    type Item = GroupView<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        for group in self.groups.by_ref() {
            if let Some(view) = self.filter.view(group) {
                log::trace!("Group {} visible ({} files)", group.id(), view.members.len());
                return Some(view);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.groups.len()))
    }
}
