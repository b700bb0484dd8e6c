//! Mark state across all duplicate groups.
//!
//! Marks are stored globally by [`FileKey`] but every change is validated
//! against the owning [`DuplicateGroup`]: a group must always keep at least
//! one unmarked file, so an action over marked files can never remove every
//! copy. Single-file marking reports a violation as
//! [`EngineError::WouldEmptyGroup`]; bulk operations instead leave the
//! group's reference unmarked.

use std::collections::HashSet;

use super::file::{FileKey, FileRef};
use super::group::DuplicateGroup;
use crate::error::EngineError;

/// Set of files currently marked for action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkSet {
    marked: HashSet<FileKey>,
}

impl MarkSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_marked(&self, key: FileKey) -> bool {
        self.marked.contains(&key)
    }

    /// Total number of marked files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.marked.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.marked.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = FileKey> + '_ {
        self.marked.iter().copied()
    }

    /// Number of members of `group` that are not marked.
    #[must_use]
    pub fn unmarked_count(&self, group: &DuplicateGroup) -> usize {
        group
            .members()
            .iter()
            .filter(|m| !self.is_marked(m.key()))
            .count()
    }

    /// Marked members of `group`, in discovery order.
    #[must_use]
    pub fn marked_in<'g>(&self, group: &'g DuplicateGroup) -> Vec<&'g FileRef> {
        group
            .members()
            .iter()
            .filter(|m| self.is_marked(m.key()))
            .collect()
    }

    /// Mark a single file.
    ///
    /// Returns `Ok(true)` if the mark changed and `Ok(false)` if the file was
    /// already marked.
    ///
    /// # Errors
    ///
    /// - `NotAMember` if the file is not in `group`
    /// - `WouldEmptyGroup` if it is the last unmarked member; nothing changes
    pub fn mark(&mut self, group: &DuplicateGroup, key: FileKey) -> Result<bool, EngineError> {
        ensure_member(group, key)?;
        if self.is_marked(key) {
            return Ok(false);
        }
        if self.unmarked_count(group) <= 1 {
            log::debug!("Refusing to mark {}: last unmarked file of group {}", key, group.id());
            return Err(EngineError::WouldEmptyGroup {
                group: group.id(),
                file: key,
            });
        }
        self.marked.insert(key);
        log::debug!("Marked {}", key);
        Ok(true)
    }

    /// Unmark a single file.
    ///
    /// # Errors
    ///
    /// Returns `NotAMember` if the file is not in `group`.
    pub fn unmark(&mut self, group: &DuplicateGroup, key: FileKey) -> Result<bool, EngineError> {
        ensure_member(group, key)?;
        let changed = self.marked.remove(&key);
        if changed {
            log::debug!("Unmarked {}", key);
        }
        Ok(changed)
    }

    /// Flip the mark of a single file.
    ///
    /// # Errors
    ///
    /// Same as [`MarkSet::mark`] when the file is currently unmarked.
    pub fn toggle(&mut self, group: &DuplicateGroup, key: FileKey) -> Result<bool, EngineError> {
        if self.is_marked(key) {
            self.unmark(group, key)
        } else {
            self.mark(group, key)
        }
    }

    /// Mark every member except the reference, and unmark the reference.
    ///
    /// Returns the number of files whose mark changed.
    pub fn mark_all(&mut self, group: &DuplicateGroup) -> usize {
        let reference = group.reference().key();
        let mut changed = 0;
        for member in group.members() {
            let key = member.key();
            let now = if key == reference {
                self.marked.remove(&key)
            } else {
                self.marked.insert(key)
            };
            changed += usize::from(now);
        }
        changed
    }

    /// Unmark every member of `group`.
    pub fn mark_none(&mut self, group: &DuplicateGroup) -> usize {
        group
            .members()
            .iter()
            .filter(|m| self.marked.remove(&m.key()))
            .count()
    }

    /// Flip every member's mark.
    ///
    /// If that would mark the whole group, the reference is left unmarked.
    pub fn invert(&mut self, group: &DuplicateGroup) -> usize {
        let flipped: Vec<FileKey> = group
            .members()
            .iter()
            .map(FileRef::key)
            .filter(|k| !self.is_marked(*k))
            .collect();
        let all_marked = flipped.len() == group.len();
        let reference = group.reference().key();

        let mut changed = self.mark_none(group);
        for key in flipped {
            if all_marked && key == reference {
                continue;
            }
            self.marked.insert(key);
            changed += 1;
        }
        changed
    }

    /// Restore the invariant after membership changed underneath the marks.
    ///
    /// Returns `true` if the reference had to be unmarked.
    pub fn repair(&mut self, group: &DuplicateGroup) -> bool {
        if self.unmarked_count(group) == 0 {
            let reference = group.reference().key();
            self.marked.remove(&reference);
            log::debug!("Unmarked reference {} of group {}", reference, group.id());
            true
        } else {
            false
        }
    }

    /// Drop marks for files that no longer exist in the results.
    pub fn forget(&mut self, key: FileKey) -> bool {
        self.marked.remove(&key)
    }

    /// Drop marks on every member of `group`.
    pub fn forget_group(&mut self, group: &DuplicateGroup) {
        for member in group.members() {
            self.marked.remove(&member.key());
        }
    }

    pub fn clear(&mut self) {
        self.marked.clear();
    }
}

fn ensure_member(group: &DuplicateGroup, key: FileKey) -> Result<(), EngineError> {
    if group.contains(key) {
        Ok(())
    } else {
        Err(EngineError::NotAMember {
            group: group.id(),
            file: key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::GroupId;
    use std::path::PathBuf;

    fn group(keys: &[u64]) -> DuplicateGroup {
        let members = keys
            .iter()
            .map(|k| FileRef::new(FileKey::new(*k), PathBuf::from(format!("/f{}", k)), 1, None))
            .collect();
        DuplicateGroup::new(GroupId::new(0), members).unwrap()
    }

    fn k(raw: u64) -> FileKey {
        FileKey::new(raw)
    }

    #[test]
    fn test_mark_and_unmark() {
        let g = group(&[1, 2, 3]);
        let mut marks = MarkSet::new();

        assert!(marks.mark(&g, k(2)).unwrap());
        assert!(!marks.mark(&g, k(2)).unwrap());
        assert!(marks.is_marked(k(2)));
        assert!(marks.unmark(&g, k(2)).unwrap());
        assert!(marks.is_empty());
    }

    #[test]
    fn test_mark_last_unmarked_rejected() {
        let g = group(&[1, 2, 3]);
        let mut marks = MarkSet::new();
        marks.mark(&g, k(1)).unwrap();
        marks.mark(&g, k(2)).unwrap();

        let err = marks.mark(&g, k(3)).unwrap_err();
        assert!(matches!(err, EngineError::WouldEmptyGroup { .. }));
        assert!(!marks.is_marked(k(3)));
        assert_eq!(marks.len(), 2);
    }

    #[test]
    fn test_reference_can_be_marked_while_another_is_unmarked() {
        let g = group(&[1, 2]);
        let mut marks = MarkSet::new();

        assert!(marks.mark(&g, k(1)).unwrap());
        assert!(marks.mark(&g, k(2)).is_err());
    }

    #[test]
    fn test_mark_not_a_member() {
        let g = group(&[1, 2]);
        let mut marks = MarkSet::new();
        assert!(matches!(
            marks.mark(&g, k(9)),
            Err(EngineError::NotAMember { .. })
        ));
        assert!(matches!(
            marks.unmark(&g, k(9)),
            Err(EngineError::NotAMember { .. })
        ));
    }

    #[test]
    fn test_toggle() {
        let g = group(&[1, 2]);
        let mut marks = MarkSet::new();
        marks.toggle(&g, k(2)).unwrap();
        assert!(marks.is_marked(k(2)));
        marks.toggle(&g, k(2)).unwrap();
        assert!(!marks.is_marked(k(2)));
    }

    #[test]
    fn test_mark_all_leaves_reference() {
        let mut g = group(&[1, 2, 3]);
        let mut marks = MarkSet::new();
        marks.mark(&g, k(1)).unwrap();
        g.set_reference(k(1)).unwrap();

        marks.mark_all(&g);
        assert!(!marks.is_marked(k(1)));
        assert!(marks.is_marked(k(2)));
        assert!(marks.is_marked(k(3)));
        assert_eq!(marks.unmarked_count(&g), 1);
    }

    #[test]
    fn test_mark_none() {
        let g = group(&[1, 2, 3]);
        let mut marks = MarkSet::new();
        marks.mark_all(&g);

        assert_eq!(marks.mark_none(&g), 2);
        assert!(marks.is_empty());
    }

    #[test]
    fn test_invert_partial() {
        let g = group(&[1, 2, 3]);
        let mut marks = MarkSet::new();
        marks.mark(&g, k(2)).unwrap();

        marks.invert(&g);
        assert!(marks.is_marked(k(1)));
        assert!(!marks.is_marked(k(2)));
        assert!(marks.is_marked(k(3)));
    }

    #[test]
    fn test_invert_from_nothing_keeps_reference() {
        let g = group(&[1, 2, 3]);
        let mut marks = MarkSet::new();

        marks.invert(&g);
        assert!(!marks.is_marked(k(1)));
        assert_eq!(marks.len(), 2);
    }

    #[test]
    fn test_repair() {
        let g = group(&[1, 2]);
        let mut marks = MarkSet::new();
        marks.mark(&g, k(2)).unwrap();
        assert!(!marks.repair(&g));

        // Simulate marks that went stale after membership changed
        marks.marked.insert(k(1));
        assert!(marks.repair(&g));
        assert!(!marks.is_marked(k(1)));
    }

    #[test]
    fn test_marked_in_order() {
        let g = group(&[5, 6, 7]);
        let mut marks = MarkSet::new();
        marks.mark(&g, k(7)).unwrap();
        marks.mark(&g, k(6)).unwrap();

        let marked: Vec<FileKey> = marks.marked_in(&g).iter().map(|f| f.key()).collect();
        assert_eq!(marked, vec![k(6), k(7)]);
    }
}
