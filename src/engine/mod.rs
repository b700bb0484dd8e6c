//! The duplicate group & marking engine.
//!
//! [`Engine`] owns the current results, the mark set, the view filter, the
//! power marker and the ignore list. The presentation layer talks to it
//! through [`Engine::execute`] with a [`Command`] and reads it through the
//! query methods. Every expected failure comes back as an [`EngineError`]
//! and leaves the state untouched.
//!
//! # Background actions
//!
//! File actions can run on a worker thread. [`Engine::begin_action`] hands
//! out an [`ActionBatch`] and locks the files it holds; while it runs,
//! commands touching those files (or the whole result set) are rejected
//! with `ActionInProgress`, but filtering and projection keep working.
//! [`Engine::complete_action`] folds the report back in.
//!
//! ```no_run
//! use dupemark::actions::{ActionKind, DeleteOptions, LocalFileOps};
//! use dupemark::engine::{Command, Engine};
//! use std::sync::Arc;
//!
//! let mut engine = Engine::new(Arc::new(LocalFileOps::new()));
//! engine.execute(Command::MarkAllGroups)?;
//!
//! let batch = engine.begin_action(ActionKind::Delete(DeleteOptions::trash()))?;
//! let ops = engine.file_operations();
//! let report = std::thread::spawn(move || batch.run(ops.as_ref()))
//!     .join()
//!     .expect("worker panicked");
//! let outcome = engine.complete_action(report)?;
//! # Ok::<(), dupemark::error::EngineError>(())
//! ```

pub mod command;

pub use command::{Command, Outcome};

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytesize::ByteSize;
use serde::Serialize;

use crate::actions::{ActionBatch, ActionKind, BatchReport, FileOperations};
use crate::error::EngineError;
use crate::results::{
    reprioritize, Criterion, Directories, DuplicateGroup, FileKey, FileRef, FilterState, GroupId,
    IgnoreList, MarkSet, PowerMarker, Projection, Removal,
};

/// Summary figures for the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Stats {
    pub groups: usize,
    pub files: usize,
    pub marked: usize,
    pub marked_bytes: u64,
    /// Bytes freed by removing every non-reference copy.
    pub reclaimable_bytes: u64,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} group(s), {} file(s); {} marked ({}); {} reclaimable",
            self.groups,
            self.files,
            self.marked,
            ByteSize(self.marked_bytes),
            ByteSize(self.reclaimable_bytes)
        )
    }
}

/// Files locked by a running batch.
#[derive(Debug)]
struct InFlight {
    keys: HashSet<FileKey>,
    kind: ActionKind,
}

/// Owner of duplicate groups and everything attached to them.
pub struct Engine {
    groups: Vec<DuplicateGroup>,
    /// File key -> position in `groups`.
    index: HashMap<FileKey, usize>,
    marks: MarkSet,
    filter: FilterState,
    power_marker: PowerMarker,
    ignore_list: IgnoreList,
    ignore_path: Option<PathBuf>,
    directories: Option<Directories>,
    ops: Arc<dyn FileOperations>,
    cancel: Arc<AtomicBool>,
    in_flight: Option<InFlight>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("groups", &self.groups.len())
            .field("marked", &self.marks.len())
            .field("filter", &self.filter)
            .field("power_marker", &self.power_marker)
            .field("ignored_pairs", &self.ignore_list.len())
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create an empty engine backed by `ops`.
    #[must_use]
    pub fn new(ops: Arc<dyn FileOperations>) -> Self {
        Self {
            groups: Vec::new(),
            index: HashMap::new(),
            marks: MarkSet::new(),
            filter: FilterState::default(),
            power_marker: PowerMarker::Off,
            ignore_list: IgnoreList::new(),
            ignore_path: None,
            directories: None,
            ops,
            cancel: Arc::new(AtomicBool::new(false)),
            in_flight: None,
        }
    }

    /// Use `list` as the ignore list, saving it to `path` on every change.
    #[must_use]
    pub fn with_ignore_list(mut self, list: IgnoreList, path: Option<PathBuf>) -> Self {
        self.ignore_list = list;
        self.ignore_path = path;
        self
    }

    #[must_use]
    pub fn with_directories(mut self, directories: Directories) -> Self {
        self.directories = Some(directories);
        self
    }

    /// Share a cancel flag with batches, e.g. a Ctrl+C handler's.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    #[must_use]
    pub fn with_power_marker(mut self, power_marker: PowerMarker) -> Self {
        self.power_marker = power_marker;
        self
    }

    // ==================== Queries ====================

    /// All current groups, in discovery order.
    #[must_use]
    pub fn groups(&self) -> &[DuplicateGroup] {
        &self.groups
    }

    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&DuplicateGroup> {
        self.groups.iter().find(|g| g.id() == id)
    }

    /// The group holding `key` and the file itself.
    #[must_use]
    pub fn find(&self, key: FileKey) -> Option<(&DuplicateGroup, &FileRef)> {
        let group = &self.groups[*self.index.get(&key)?];
        group.member(key).map(|file| (group, file))
    }

    /// Key of the file at `path`, if it is in the results.
    #[must_use]
    pub fn key_for_path(&self, path: &Path) -> Option<FileKey> {
        self.groups
            .iter()
            .flat_map(DuplicateGroup::members)
            .find(|m| m.path() == path)
            .map(FileRef::key)
    }

    #[must_use]
    pub fn is_marked(&self, key: FileKey) -> bool {
        self.marks.is_marked(key)
    }

    #[must_use]
    pub fn marks(&self) -> &MarkSet {
        &self.marks
    }

    /// Marked files in group and discovery order.
    #[must_use]
    pub fn marked_files(&self) -> Vec<&FileRef> {
        self.groups
            .iter()
            .flat_map(|g| self.marks.marked_in(g))
            .collect()
    }

    /// The filtered view of the results.
    #[must_use]
    pub fn projection(&self) -> Projection<'_> {
        Projection::new(&self.groups, &self.filter)
    }

    #[must_use]
    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    #[must_use]
    pub fn power_marker(&self) -> PowerMarker {
        self.power_marker
    }

    #[must_use]
    pub fn ignore_list(&self) -> &IgnoreList {
        &self.ignore_list
    }

    #[must_use]
    pub fn directories(&self) -> Option<&Directories> {
        self.directories.as_ref()
    }

    #[must_use]
    pub fn stats(&self) -> Stats {
        let marked = self.marked_files();
        Stats {
            groups: self.groups.len(),
            files: self.groups.iter().map(DuplicateGroup::len).sum(),
            marked: marked.len(),
            marked_bytes: marked.iter().map(|f| f.size()).sum(),
            reclaimable_bytes: self.groups.iter().map(DuplicateGroup::wasted_space).sum(),
        }
    }

    #[must_use]
    pub fn is_action_in_progress(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The file-operation provider, for running a batch elsewhere.
    #[must_use]
    pub fn file_operations(&self) -> Arc<dyn FileOperations> {
        Arc::clone(&self.ops)
    }

    // ==================== Commands ====================

    /// Run one command to completion.
    ///
    /// # Errors
    ///
    /// Returns the command's rejection; state is unchanged in that case.
    pub fn execute(&mut self, command: Command) -> Result<Outcome, EngineError> {
        log::trace!("Executing command: {}", command.name());

        match command {
            Command::LoadResults(groups) => self.load_results(groups),
            Command::ClearResults => {
                self.ensure_idle()?;
                self.groups.clear();
                self.index.clear();
                self.marks.clear();
                self.filter = FilterState::default();
                Ok(Outcome::Cleared)
            }

            Command::Mark(key) => self.mark_one(key, MarkSet::mark),
            Command::Unmark(key) => self.mark_one(key, MarkSet::unmark),
            Command::ToggleMark(key) => self.mark_one(key, MarkSet::toggle),
            Command::MarkSelected(keys) => self.mark_selected(&keys),
            Command::MarkAll(id) => self.mark_group(id, MarkSet::mark_all),
            Command::MarkNone(id) => {
                self.ensure_manual_marks()?;
                self.mark_group(id, MarkSet::mark_none)
            }
            Command::Invert(id) => {
                self.ensure_manual_marks()?;
                self.mark_group(id, MarkSet::invert)
            }
            Command::MarkAllGroups => self.mark_every_group(MarkSet::mark_all),
            Command::UnmarkAll => {
                self.ensure_idle()?;
                self.ensure_manual_marks()?;
                let changed = self.marks.len();
                self.marks.clear();
                Ok(Outcome::MarksChanged { changed })
            }
            Command::InvertAll => {
                self.ensure_manual_marks()?;
                self.mark_every_group(MarkSet::invert)
            }

            Command::SetFilter(filter) => {
                self.filter = filter;
                Ok(self.filtered())
            }
            Command::ToggleDelta => {
                let delta = !self.filter.delta_only();
                self.filter = self.filter.clone().with_delta_only(delta);
                Ok(self.filtered())
            }

            Command::Reprioritize(criteria) => self.reprioritize(&criteria),
            Command::TogglePowerMarker => {
                self.ensure_idle()?;
                self.power_marker = self.power_marker.toggled();
                log::info!("Power marker {:?}", self.power_marker);
                self.reapply_power_marker();
                Ok(Outcome::PowerMarker(self.power_marker))
            }
            Command::MakeReference(key) => self.make_reference(key),

            Command::RemoveMarked => {
                self.ensure_idle()?;
                let keys: Vec<FileKey> = self.marked_files().iter().map(|f| f.key()).collect();
                let (files, dissolved) = self.remove_files(&keys);
                Ok(Outcome::Removed { files, dissolved })
            }
            Command::RemoveSelected(keys) => {
                self.ensure_files_idle(&keys)?;
                for &key in &keys {
                    self.locate(key)?;
                }
                let (files, dissolved) = self.remove_files(&keys);
                Ok(Outcome::Removed { files, dissolved })
            }
            Command::IgnoreMarked => self.ignore_marked(),

            Command::ExecuteAction(kind) => {
                let batch = self.begin_action(kind)?;
                let report = batch.run(self.ops.as_ref());
                self.complete_action(report)
            }
            Command::Rename { file, new_name } => self.rename(file, &new_name),
            Command::Reveal(key) => {
                let (_, file) = self.find(key).ok_or(EngineError::UnknownFile(key))?;
                self.ops.reveal(file).map_err(|e| EngineError::OperationFailed {
                    path: file.path().to_path_buf(),
                    reason: e.to_string(),
                })?;
                Ok(Outcome::Revealed)
            }
        }
    }

    // ==================== Background Actions ====================

    /// Snapshot the marked files into a batch and lock them.
    ///
    /// # Errors
    ///
    /// Returns `ActionInProgress` if another batch has not completed.
    pub fn begin_action(&mut self, kind: ActionKind) -> Result<ActionBatch, EngineError> {
        self.ensure_idle()?;

        let files: Vec<FileRef> = self.marked_files().into_iter().cloned().collect();
        let keys = files.iter().map(FileRef::key).collect();
        log::debug!("Beginning {} on {} marked file(s)", kind, files.len());

        self.in_flight = Some(InFlight {
            keys,
            kind: kind.clone(),
        });
        Ok(ActionBatch::new(kind, files, Arc::clone(&self.cancel))
            .with_directories(self.directories.clone()))
    }

    /// Ask the running batch to stop. Files not yet attempted are skipped.
    pub fn cancel_action(&self) {
        if self.in_flight.is_some() {
            log::info!("Cancellation requested");
            self.cancel.store(true, Ordering::SeqCst);
        }
    }

    /// Fold a finished batch back into the results.
    ///
    /// Files the action removed from disk, and files found already gone, are
    /// dropped from their groups and from the marks. Copied files stay.
    ///
    /// # Errors
    ///
    /// Returns `NoActionInFlight` without a prior [`Engine::begin_action`].
    pub fn complete_action(&mut self, report: BatchReport) -> Result<Outcome, EngineError> {
        let in_flight = self.in_flight.take().ok_or(EngineError::NoActionInFlight)?;
        self.cancel.store(false, Ordering::SeqCst);

        let mut keys: Vec<FileKey> = report.gone().collect();
        if in_flight.kind.removes_files() {
            keys.extend(report.applied());
        }
        keys.retain(|k| in_flight.keys.contains(k));

        let (removed, dissolved) = self.remove_files(&keys);
        log::info!(
            "{}: {} file(s) left the results, {} group(s) dissolved",
            report.summary(),
            removed,
            dissolved.len()
        );
        Ok(Outcome::ActionCompleted {
            report,
            removed,
            dissolved,
        })
    }

    // ==================== Internals ====================

    fn ensure_idle(&self) -> Result<(), EngineError> {
        if self.in_flight.is_some() {
            return Err(EngineError::ActionInProgress);
        }
        Ok(())
    }

    /// While the power marker is on it owns every mark.
    fn ensure_manual_marks(&self) -> Result<(), EngineError> {
        if self.power_marker.is_on() {
            return Err(EngineError::PowerMarkerOn);
        }
        Ok(())
    }

    fn ensure_files_idle(&self, keys: &[FileKey]) -> Result<(), EngineError> {
        match &self.in_flight {
            Some(flight) if keys.iter().any(|k| flight.keys.contains(k)) => {
                Err(EngineError::ActionInProgress)
            }
            _ => Ok(()),
        }
    }

    fn ensure_group_idle(&self, group: &DuplicateGroup) -> Result<(), EngineError> {
        let keys: Vec<FileKey> = group.members().iter().map(FileRef::key).collect();
        self.ensure_files_idle(&keys)
    }

    /// Position of the group holding `key`.
    fn locate(&self, key: FileKey) -> Result<usize, EngineError> {
        self.index
            .get(&key)
            .copied()
            .ok_or(EngineError::UnknownFile(key))
    }

    fn position_of(&self, id: GroupId) -> Result<usize, EngineError> {
        self.groups
            .iter()
            .position(|g| g.id() == id)
            .ok_or(EngineError::UnknownGroup(id))
    }

    fn reindex(&mut self) {
        self.index = self
            .groups
            .iter()
            .enumerate()
            .flat_map(|(i, g)| g.members().iter().map(move |m| (m.key(), i)))
            .collect();
    }

    fn reapply_power_marker(&mut self) -> usize {
        if self.power_marker.is_on() {
            PowerMarker::apply(&self.groups, &mut self.marks)
        } else {
            0
        }
    }

    fn filtered(&self) -> Outcome {
        let visible = self.projection().group_count();
        log::debug!("Filter {:?}: {} group(s) visible", self.filter.query(), visible);
        Outcome::Filtered { visible }
    }

    fn load_results(&mut self, mut groups: Vec<DuplicateGroup>) -> Result<Outcome, EngineError> {
        self.ensure_idle()?;

        let mut seen = HashSet::new();
        let mut ids = HashSet::new();
        for group in &groups {
            if !ids.insert(group.id()) {
                return Err(EngineError::InvalidGroup(format!(
                    "group id {} is used more than once",
                    group.id()
                )));
            }
            if let Some(dup) = group.members().iter().find(|m| !seen.insert(m.key())) {
                return Err(EngineError::InvalidGroup(format!(
                    "file {} appears in more than one group",
                    dup.key()
                )));
            }
        }

        let ignored = self.ignore_list.apply(&mut groups);
        self.groups = groups;
        self.reindex();
        self.marks.clear();
        self.filter = FilterState::default();
        self.reapply_power_marker();

        log::info!(
            "Loaded {} duplicate group(s), {} reclaimable",
            self.groups.len(),
            ByteSize(self.stats().reclaimable_bytes)
        );
        Ok(Outcome::Loaded {
            groups: self.groups.len(),
            ignored,
        })
    }

    fn mark_one(
        &mut self,
        key: FileKey,
        op: fn(&mut MarkSet, &DuplicateGroup, FileKey) -> Result<bool, EngineError>,
    ) -> Result<Outcome, EngineError> {
        self.ensure_files_idle(&[key])?;
        self.ensure_manual_marks()?;
        let group = &self.groups[self.locate(key)?];
        let changed = op(&mut self.marks, group, key)?;
        log::debug!("Mark state of {} changed: {}", key, changed);
        Ok(Outcome::MarksChanged {
            changed: usize::from(changed),
        })
    }

    fn mark_selected(&mut self, keys: &[FileKey]) -> Result<Outcome, EngineError> {
        self.ensure_files_idle(keys)?;
        self.ensure_manual_marks()?;
        let mut marks = self.marks.clone();
        for &key in keys {
            let group = &self.groups[self.locate(key)?];
            marks.toggle(group, key)?;
        }
        self.marks = marks;
        Ok(Outcome::MarksChanged {
            changed: keys.len(),
        })
    }

    fn mark_group(
        &mut self,
        id: GroupId,
        op: fn(&mut MarkSet, &DuplicateGroup) -> usize,
    ) -> Result<Outcome, EngineError> {
        let group = &self.groups[self.position_of(id)?];
        self.ensure_group_idle(group)?;
        let changed = op(&mut self.marks, group);
        Ok(Outcome::MarksChanged { changed })
    }

    fn mark_every_group(
        &mut self,
        op: fn(&mut MarkSet, &DuplicateGroup) -> usize,
    ) -> Result<Outcome, EngineError> {
        self.ensure_idle()?;
        let changed = self.groups.iter().map(|g| op(&mut self.marks, g)).sum();
        Ok(Outcome::MarksChanged { changed })
    }

    fn reprioritize(&mut self, criteria: &[Criterion]) -> Result<Outcome, EngineError> {
        self.ensure_idle()?;
        let changed = reprioritize(&mut self.groups, criteria, self.directories.as_ref());
        if changed > 0 {
            self.reapply_power_marker();
        }
        Ok(Outcome::Reprioritized { changed })
    }

    fn make_reference(&mut self, key: FileKey) -> Result<Outcome, EngineError> {
        let position = self.locate(key)?;
        self.ensure_group_idle(&self.groups[position])?;

        let group = &mut self.groups[position];
        group.set_reference(key)?;
        self.marks.forget(key);
        if self.power_marker.is_on() {
            self.marks.mark_all(group);
        }
        log::debug!("Group {}: {} is now the reference", group.id(), key);
        Ok(Outcome::ReferenceChanged {
            group: group.id(),
            reference: key,
        })
    }

    fn ignore_marked(&mut self) -> Result<Outcome, EngineError> {
        self.ensure_idle()?;

        let mut list = self.ignore_list.clone();
        let mut keys = Vec::new();
        let mut pairs = 0;
        for group in &self.groups {
            let reference = group.reference();
            for member in self.marks.marked_in(group) {
                if member.key() == reference.key() {
                    continue;
                }
                pairs += usize::from(list.add(reference.path(), member.path()));
                keys.push(member.key());
            }
        }

        // Nothing changes unless the new list is on disk
        if pairs > 0 {
            if let Some(path) = &self.ignore_path {
                list.save(path).map_err(|e| EngineError::OperationFailed {
                    path: path.clone(),
                    reason: format!("{:#}", e),
                })?;
            }
        }
        self.ignore_list = list;
        let (_, dissolved) = self.remove_files(&keys);
        log::info!("Ignored {} new pair(s)", pairs);
        Ok(Outcome::Ignored { pairs, dissolved })
    }

    fn rename(&mut self, key: FileKey, new_name: &str) -> Result<Outcome, EngineError> {
        self.ensure_files_idle(&[key])?;
        let position = self.locate(key)?;
        let file = self.groups[position]
            .member(key)
            .ok_or(EngineError::UnknownFile(key))?
            .clone();

        let path = self
            .ops
            .rename(&file, new_name)
            .map_err(|e| EngineError::OperationFailed {
                path: file.path().to_path_buf(),
                reason: e.to_string(),
            })?;
        self.groups[position].replace(file.with_path(path.clone()))?;
        Ok(Outcome::Renamed { file: key, path })
    }

    /// Drop files from their groups and marks, dissolving groups that fall
    /// below two members.
    fn remove_files(&mut self, keys: &[FileKey]) -> (usize, Vec<GroupId>) {
        let mut removed = 0;
        let mut dissolved = Vec::new();

        for &key in keys {
            let Some(&position) = self.index.get(&key) else {
                continue;
            };
            let group = &mut self.groups[position];
            if group.is_dissolved() {
                continue;
            }
            match group.remove(key) {
                Ok(Removal::Removed) => {
                    removed += 1;
                    self.marks.forget(key);
                }
                Ok(Removal::Dissolved) => {
                    removed += 1;
                    self.marks.forget(key);
                    self.marks.forget_group(group);
                    dissolved.push(group.id());
                }
                Err(e) => log::warn!("Stale index entry: {}", e),
            }
        }

        for group in &self.groups {
            if !group.is_dissolved() {
                self.marks.repair(group);
            }
        }
        self.groups.retain(|g| !g.is_dissolved());
        self.reindex();
        self.reapply_power_marker();

        if removed > 0 {
            log::debug!(
                "Removed {} file(s), dissolved {} group(s)",
                removed,
                dissolved.len()
            );
        }
        (removed, dissolved)
    }
}
