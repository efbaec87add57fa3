use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use traj_core::id::{has_id_shape, TRAJECTORY_PREFIX};
use traj_core::{
    month_bucket, now_rfc3339, parse_trajectory, validate_trajectory, Result, TraceRecord,
    Trajectory, TrajectoryError, TrajectoryStatus,
};

use crate::config::StoreConfig;
use crate::index::{IndexEntry, StoreIndex};
use crate::lock::StoreLock;
use crate::paths::{markdown_sibling, trace_sibling, StorePaths};
use crate::query::{self, cmp_timestamps, ListQuery, TrajectorySummary};
use crate::{remove_if_exists, render, write_atomic};

/// Turns a terminal trajectory into the text of its `.md` sidecar.
pub type Renderer = Box<dyn Fn(&Trajectory) -> String + Send + Sync>;

/// File-backed trajectory store.
///
/// Layout under the root:
/// `index.json`, `active/<id>.json`, `completed/<YYYY-MM>/<id>.{json,md,trace.json}`.
pub struct FileStorage {
    paths: StorePaths,
    renderer: Renderer,
}

fn storage_err(path: &Path) -> impl FnOnce(io::Error) -> TrajectoryError + '_ {
    move |e| TrajectoryError::storage(path, e)
}

/// Read and validate one trajectory file. Missing, corrupt, or invalid files read as `None`.
fn read_trajectory(path: &Path) -> Result<Option<Trajectory>> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(TrajectoryError::storage(path, e)),
    };
    match parse_trajectory(&content) {
        Ok(t) => Ok(Some(t)),
        Err(report) => {
            tracing::warn!(path = %path.display(), error = %report, "skipping invalid trajectory file");
            Ok(None)
        }
    }
}

fn is_trajectory_json(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.starts_with(TRAJECTORY_PREFIX) && name.ends_with(".json") && !name.ends_with(".trace.json")
}

/// List trajectory JSON files directly inside `dir`. A missing directory yields nothing.
fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(TrajectoryError::storage(dir, e)),
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_trajectory_json(p))
        .collect();
    files.sort();
    Ok(files)
}

fn haystack_matches(t: &Trajectory, needle: &str) -> bool {
    let hit = |s: &str| s.to_lowercase().contains(needle);
    if let Some(r) = &t.retrospective {
        if hit(&r.summary) {
            return true;
        }
        if r
            .decisions
            .iter()
            .any(|d| hit(&d.question) || hit(&d.chosen) || hit(&d.reasoning))
        {
            return true;
        }
    }
    t.decision_events().any(|e| {
        hit(&e.content)
            || e.raw
                .as_ref()
                .and_then(|raw| raw.get("reasoning"))
                .and_then(|v| v.as_str())
                .is_some_and(hit)
    })
}

impl FileStorage {
    /// Store at `config.root` with the default markdown renderer.
    pub fn new(config: &StoreConfig) -> Self {
        Self::with_renderer(config, render::markdown)
    }

    pub fn with_renderer<F>(config: &StoreConfig, renderer: F) -> Self
    where
        F: Fn(&Trajectory) -> String + Send + Sync + 'static,
    {
        Self {
            paths: StorePaths::discover(&config.root),
            renderer: Box::new(renderer),
        }
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Create the directory layout and, if absent, an index built from existing files.
    pub fn initialize(&self) -> Result<()> {
        self.paths
            .ensure_layout()
            .map_err(storage_err(&self.paths.root))?;
        if !self.paths.index_json.exists() {
            self.rebuild_index()?;
        }
        Ok(())
    }

    /// Where a trajectory's JSON belongs given its current status.
    pub fn placement(&self, t: &Trajectory) -> PathBuf {
        if !t.status.is_terminal() {
            return self.paths.active_file(&t.id);
        }
        let bucket = t
            .completed_at
            .as_deref()
            .and_then(month_bucket)
            .or_else(|| month_bucket(&t.started_at))
            .or_else(|| month_bucket(&now_rfc3339()))
            .unwrap_or_else(|| "unknown".to_string());
        self.paths.completed_file(&bucket, &t.id)
    }

    /// Persist a trajectory, relocating it out of `active/` once terminal.
    ///
    /// The index update is the commit point of a relocation: the stale
    /// `active/` copy is removed only after the index names the new path,
    /// and readers trust the index over `active/`.
    pub fn save(&self, t: &Trajectory) -> Result<()> {
        validate_trajectory(t)?;
        self.paths
            .ensure_layout()
            .map_err(storage_err(&self.paths.root))?;
        let _lock = StoreLock::acquire(&self.paths).map_err(storage_err(&self.paths.lock_file))?;

        let target = self.placement(t);
        let data = serde_json::to_vec_pretty(t)
            .map_err(|e| TrajectoryError::storage(&target, e.into()))?;
        write_atomic(&target, &data).map_err(storage_err(&target))?;

        let stale = self.paths.active_file(&t.id);
        if t.status.is_terminal() {
            let md_path = markdown_sibling(&target);
            let md = (self.renderer)(t);
            write_atomic(&md_path, md.as_bytes()).map_err(storage_err(&md_path))?;

            let stale_trace = trace_sibling(&stale);
            if stale_trace.exists() {
                let dest = trace_sibling(&target);
                fs::rename(&stale_trace, &dest).map_err(storage_err(&stale_trace))?;
            }
        }

        let mut index = match StoreIndex::read(&self.paths.index_json)? {
            Some(index) => index,
            None => {
                tracing::warn!(root = %self.paths.root.display(), "rebuilding index before save");
                self.scan_index()?
            }
        };
        index.upsert(
            &t.id,
            IndexEntry::from_trajectory(t, self.paths.relative(&target)),
        );
        index.save(&self.paths.index_json)?;

        if t.status.is_terminal() {
            remove_if_exists(&stale).map_err(storage_err(&stale))?;
            tracing::debug!(id = %t.id, path = %target.display(), "filed terminal trajectory");
        }
        Ok(())
    }

    /// `completed/<YYYY-MM>/` directories in name order. A missing `completed/` yields nothing.
    fn month_dirs(&self) -> Result<Vec<PathBuf>> {
        match fs::read_dir(&self.paths.completed_dir) {
            Ok(months) => {
                let mut dirs: Vec<PathBuf> = months
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.is_dir())
                    .collect();
                dirs.sort();
                Ok(dirs)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(dir = %self.paths.completed_dir.display(), "no completed directory yet");
                Ok(Vec::new())
            }
            Err(e) => Err(TrajectoryError::storage(&self.paths.completed_dir, e)),
        }
    }

    /// First valid copy of `id`: the indexed path, then `active/`, then a
    /// scan of `completed/*/` as a last resort.
    fn locate(&self, id: &str, index: &StoreIndex) -> Result<Option<(PathBuf, Trajectory)>> {
        let try_path = |path: PathBuf| -> Result<Option<(PathBuf, Trajectory)>> {
            match read_trajectory(&path)? {
                Some(t) if t.id == id => Ok(Some((path, t))),
                _ => Ok(None),
            }
        };

        let indexed = index.get(id).map(|e| self.paths.resolve(&e.path));
        if let Some(path) = &indexed {
            if let Some(hit) = try_path(path.clone())? {
                return Ok(Some(hit));
            }
        }

        let active = self.paths.active_file(id);
        if indexed.as_ref() != Some(&active) {
            if let Some(hit) = try_path(active)? {
                return Ok(Some(hit));
            }
        }

        tracing::debug!(id = %id, "not at indexed or active path, scanning completed/");
        for dir in self.month_dirs()? {
            let path = dir.join(format!("{id}.json"));
            if indexed.as_ref() == Some(&path) {
                continue;
            }
            if let Some(hit) = try_path(path)? {
                return Ok(Some(hit));
            }
        }
        Ok(None)
    }

    /// Every existing file that may hold `id`. Used by `delete`, which removes all copies.
    fn all_copies(&self, id: &str, index: &StoreIndex) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut push = |p: PathBuf| {
            if p.is_file() && seen.insert(p.clone()) {
                out.push(p);
            }
        };
        push(self.paths.active_file(id));
        if let Some(entry) = index.get(id) {
            push(self.paths.resolve(&entry.path));
        }
        for dir in self.month_dirs()? {
            push(dir.join(format!("{id}.json")));
        }
        Ok(out)
    }

    /// Look up a trajectory by id. Tolerates a stale or missing index.
    pub fn get(&self, id: &str) -> Result<Option<Trajectory>> {
        if !has_id_shape(id, TRAJECTORY_PREFIX) {
            return Ok(None);
        }
        let index = StoreIndex::load(&self.paths.index_json)?;
        Ok(self.locate(id, &index)?.map(|(_, t)| t))
    }

    /// Like [`FileStorage::get`], but a missing trajectory is an error.
    pub fn load(&self, id: &str) -> Result<Trajectory> {
        self.get(id)?
            .ok_or_else(|| TrajectoryError::NotFound(id.to_string()))
    }

    /// The most recently started trajectory in `active/`, if any.
    ///
    /// Copies the index already records as terminal are leftovers of an
    /// interrupted relocation and are skipped.
    pub fn get_active(&self) -> Result<Option<Trajectory>> {
        let index = StoreIndex::load(&self.paths.index_json)?;
        let mut best: Option<Trajectory> = None;
        for path in json_files(&self.paths.active_dir)? {
            let Some(t) = read_trajectory(&path)? else {
                continue;
            };
            if t.status != TrajectoryStatus::Active {
                continue;
            }
            if index.get(&t.id).is_some_and(|e| e.status.is_terminal()) {
                tracing::debug!(id = %t.id, "ignoring stale active copy");
                continue;
            }
            let newer = match &best {
                Some(b) => cmp_timestamps(&t.started_at, &b.started_at).is_gt(),
                None => true,
            };
            if newer {
                best = Some(t);
            }
        }
        Ok(best)
    }

    /// Filter, sort, and page the index, then load each row for its derived counts.
    pub fn list(&self, q: &ListQuery) -> Result<Vec<TrajectorySummary>> {
        let index = StoreIndex::load(&self.paths.index_json)?;
        let mut rows: Vec<(&String, &IndexEntry)> = index
            .trajectories
            .iter()
            .filter(|(_, e)| query::matches(e, q))
            .collect();
        query::sort_entries(&mut rows, q);

        let page = rows
            .into_iter()
            .skip(q.offset)
            .take(q.limit.unwrap_or(usize::MAX));

        let mut out = Vec::new();
        for (id, _) in page {
            match self.locate(id, &index)? {
                Some((_, t)) => out.push(TrajectorySummary::from_trajectory(&t)),
                None => tracing::warn!(id = %id, "indexed trajectory could not be loaded"),
            }
        }
        Ok(out)
    }

    /// Case-insensitive substring search: titles first, then retrospective
    /// summaries and decisions. `limit == 0` means unlimited.
    pub fn search(&self, text: &str, limit: usize) -> Result<Vec<TrajectorySummary>> {
        let needle = text.to_lowercase();
        let limit = if limit == 0 { usize::MAX } else { limit };
        let index = StoreIndex::load(&self.paths.index_json)?;
        let mut rows: Vec<(&String, &IndexEntry)> = index.trajectories.iter().collect();
        query::sort_entries(&mut rows, &ListQuery::default());

        let mut out = Vec::new();
        let mut title_hits = HashSet::new();

        for (id, entry) in &rows {
            if out.len() >= limit {
                return Ok(out);
            }
            if entry.title.to_lowercase().contains(&needle) {
                title_hits.insert(id.as_str());
                if let Some((_, t)) = self.locate(id, &index)? {
                    out.push(TrajectorySummary::from_trajectory(&t));
                }
            }
        }

        for (id, _) in &rows {
            if out.len() >= limit {
                break;
            }
            if title_hits.contains(id.as_str()) {
                continue;
            }
            if let Some((_, t)) = self.locate(id, &index)? {
                if haystack_matches(&t, &needle) {
                    out.push(TrajectorySummary::from_trajectory(&t));
                }
            }
        }
        Ok(out)
    }

    /// Remove a trajectory's files (JSON, markdown, trace) and its index entry.
    pub fn delete(&self, id: &str) -> Result<()> {
        if !has_id_shape(id, TRAJECTORY_PREFIX) {
            return Err(TrajectoryError::NotFound(id.to_string()));
        }
        let _lock = StoreLock::acquire(&self.paths).map_err(storage_err(&self.paths.lock_file))?;

        let mut index = StoreIndex::load(&self.paths.index_json)?;
        let copies = self.all_copies(id, &index)?;
        for path in &copies {
            for p in [path.clone(), markdown_sibling(path), trace_sibling(path)] {
                remove_if_exists(&p).map_err(storage_err(&p))?;
            }
        }

        let had_entry = index.remove(id).is_some();
        if copies.is_empty() && !had_entry {
            return Err(TrajectoryError::NotFound(id.to_string()));
        }
        if had_entry {
            index.save(&self.paths.index_json)?;
        }
        tracing::debug!(id = %id, files = copies.len(), "deleted trajectory");
        Ok(())
    }

    /// Index built from the files on disk. Callers hold the lock.
    ///
    /// `active/` is read before `completed/`, so a terminal copy wins over a
    /// stale active one.
    fn scan_index(&self) -> Result<StoreIndex> {
        let mut files = json_files(&self.paths.active_dir)?;
        for dir in self.month_dirs()? {
            files.extend(json_files(&dir)?);
        }

        let mut index = StoreIndex::default();
        for path in files {
            if let Some(t) = read_trajectory(&path)? {
                index.upsert(
                    &t.id,
                    IndexEntry::from_trajectory(&t, self.paths.relative(&path)),
                );
            }
        }
        Ok(index)
    }

    /// Rewrite `index.json` from the files on disk. Returns the number of entries.
    pub fn rebuild_index(&self) -> Result<usize> {
        let _lock = StoreLock::acquire(&self.paths).map_err(storage_err(&self.paths.lock_file))?;
        let mut index = self.scan_index()?;
        let count = index.len();
        index.save(&self.paths.index_json)?;
        tracing::debug!(entries = count, "rebuilt index");
        Ok(count)
    }

    /// Write `<id>.trace.json` next to the trajectory's JSON.
    pub fn save_trace(&self, t: &Trajectory, record: &TraceRecord) -> Result<PathBuf> {
        let path = trace_sibling(&self.placement(t));
        let data = serde_json::to_vec_pretty(record)
            .map_err(|e| TrajectoryError::storage(&path, e.into()))?;
        write_atomic(&path, &data).map_err(storage_err(&path))?;
        Ok(path)
    }

    /// Read the trace sidecar for `id`. Missing or unreadable traces read as `None`.
    pub fn get_trace(&self, id: &str) -> Result<Option<TraceRecord>> {
        if !has_id_shape(id, TRAJECTORY_PREFIX) {
            return Ok(None);
        }
        let index = StoreIndex::load(&self.paths.index_json)?;
        let Some((json, _)) = self.locate(id, &index)? else {
            return Ok(None);
        };
        let path = trace_sibling(&json);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TrajectoryError::storage(&path, e)),
        };
        match serde_json::from_str(&content) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable trace");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use traj_core::trajectory::*;
    use traj_core::{Alternative, Decision};

    fn store() -> (tempfile::TempDir, FileStorage) {
        let tmp = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(&StoreConfig::new(tmp.path().join(".trajectories")));
        storage.initialize().unwrap();
        (tmp, storage)
    }

    fn started(title: &str) -> Trajectory {
        let t = create(CreateInput::new(title)).unwrap();
        add_chapter(&t, AddChapterInput::new("Work", "claude")).unwrap()
    }

    fn completed(title: &str) -> Trajectory {
        complete(&started(title), CompleteInput::new("done", "direct", 0.7)).unwrap()
    }

    #[test]
    fn initialize_is_idempotent() {
        let (_tmp, s) = store();
        s.initialize().unwrap();
        assert!(s.paths().active_dir.is_dir());
        assert!(s.paths().completed_dir.is_dir());
        let index = StoreIndex::load(&s.paths().index_json).unwrap();
        assert!(s.paths().index_json.exists());
        assert!(index.is_empty());
    }

    #[test]
    fn active_roundtrip() {
        let (_tmp, s) = store();
        let t = add_event(&started("Implement authentication"), AddEventInput::note("hi")).unwrap();
        s.save(&t).unwrap();
        assert!(s.paths().active_file(&t.id).exists());
        assert_eq!(s.get(&t.id).unwrap(), Some(t));
    }

    #[test]
    fn completed_roundtrip_and_placement() {
        let (_tmp, s) = store();
        let t = started("Implement authentication");
        s.save(&t).unwrap();
        assert!(s.paths().active_file(&t.id).exists());

        let done = complete(&t, CompleteInput::new("done", "direct", 0.7)).unwrap();
        s.save(&done).unwrap();

        let bucket = month_bucket(done.completed_at.as_deref().unwrap()).unwrap();
        let json = s.paths().completed_file(&bucket, &done.id);
        assert!(json.exists());
        assert!(markdown_sibling(&json).exists());
        assert!(!s.paths().active_file(&t.id).exists());
        assert_eq!(s.get(&done.id).unwrap(), Some(done.clone()));

        let index = StoreIndex::load(&s.paths().index_json).unwrap();
        let entry = index.get(&done.id).unwrap();
        assert_eq!(entry.status, TrajectoryStatus::Completed);
        assert_eq!(entry.path, format!("completed/{bucket}/{}.json", done.id));
    }

    #[test]
    fn abandoned_is_filed_under_completed() {
        let (_tmp, s) = store();
        let gone = abandon(&started("Spike"), Some("dead end")).unwrap();
        s.save(&gone).unwrap();
        assert!(s.placement(&gone).starts_with(&s.paths().completed_dir));
        assert_eq!(s.load(&gone.id).unwrap(), gone);
    }

    #[test]
    fn save_rejects_invalid_trajectory() {
        let (_tmp, s) = store();
        let mut t = started("x");
        t.task.title = String::new();
        assert!(matches!(
            s.save(&t).unwrap_err(),
            TrajectoryError::Validation(_)
        ));
    }

    #[test]
    fn get_falls_back_to_scan_without_index() {
        let (_tmp, s) = store();
        let done = completed("Fix database bug");
        s.save(&done).unwrap();
        fs::remove_file(&s.paths().index_json).unwrap();
        assert_eq!(s.get(&done.id).unwrap(), Some(done));
    }

    #[test]
    fn get_tolerates_stale_index_path() {
        let (_tmp, s) = store();
        let done = completed("Fix database bug");
        s.save(&done).unwrap();
        let mut index = StoreIndex::load(&s.paths().index_json).unwrap();
        index.trajectories.get_mut(&done.id).unwrap().path = "completed/1999-01/x.json".into();
        index.save(&s.paths().index_json).unwrap();
        assert_eq!(s.get(&done.id).unwrap(), Some(done));
    }

    #[test]
    fn get_unknown_and_malformed_ids() {
        let (_tmp, s) = store();
        assert!(s.get("traj_000000000000").unwrap().is_none());
        assert!(s.get("../../etc/passwd").unwrap().is_none());
        assert!(matches!(
            s.load("traj_000000000000").unwrap_err(),
            TrajectoryError::NotFound(_)
        ));
    }

    #[test]
    fn get_active_empty_store() {
        let (_tmp, s) = store();
        assert!(s.get_active().unwrap().is_none());
        let missing = FileStorage::new(&StoreConfig::new("/nonexistent/trajectories-store"));
        assert!(missing.get_active().unwrap().is_none());
    }

    #[test]
    fn get_active_prefers_most_recent() {
        let (_tmp, s) = store();
        let mut older = started("older");
        older.started_at = "2026-01-01T00:00:00Z".into();
        let mut newer = started("newer");
        newer.started_at = "2026-01-02T00:00:00Z".into();
        s.save(&newer).unwrap();
        s.save(&older).unwrap();
        assert_eq!(s.get_active().unwrap().unwrap().id, newer.id);
    }

    #[test]
    fn get_active_ignores_completed() {
        let (_tmp, s) = store();
        s.save(&completed("done")).unwrap();
        assert!(s.get_active().unwrap().is_none());
    }

    #[test]
    fn list_filters_sorts_and_pages() {
        let (_tmp, s) = store();
        for (i, title) in ["a", "b", "c"].iter().enumerate() {
            let mut t = started(title);
            t.started_at = format!("2026-01-0{}T00:00:00Z", i + 1);
            s.save(&t).unwrap();
        }
        let mut d = completed("d");
        d.started_at = "2026-01-04T00:00:00Z".into();
        s.save(&d).unwrap();

        let all = s.list(&ListQuery::default()).unwrap();
        let titles: Vec<&str> = all.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["d", "c", "b", "a"]);
        assert_eq!(all[0].confidence, Some(0.7));
        assert_eq!(all[0].chapter_count, 1);

        let active = s
            .list(&ListQuery {
                status: Some(TrajectoryStatus::Active),
                direction: query::SortDirection::Asc,
                offset: 1,
                limit: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].title, "b");

        let ranged = s
            .list(&ListQuery {
                since: Some("2026-01-02T00:00:00Z".into()),
                until: Some("2026-01-04T00:00:00Z".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ranged.len(), 2);
    }

    #[test]
    fn list_skips_corrupt_files() {
        let (_tmp, s) = store();
        let good = started("good");
        let bad = started("bad");
        s.save(&good).unwrap();
        s.save(&bad).unwrap();
        fs::write(s.paths().active_file(&bad.id), "{ not json").unwrap();

        let rows = s.list(&ListQuery::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, good.id);
        assert_eq!(s.get_active().unwrap().unwrap().id, good.id);
    }

    #[test]
    fn search_matches_titles() {
        let (_tmp, s) = store();
        s.save(&completed("Implement authentication")).unwrap();
        s.save(&completed("Fix database bug")).unwrap();
        let hits = s.search("auth", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Implement authentication");
    }

    #[test]
    fn search_falls_through_to_decisions_and_summary() {
        let (_tmp, s) = store();
        let t = add_decision(
            &started("Storage work"),
            Decision {
                question: "Cache layer".into(),
                chosen: "Redis".into(),
                alternatives: vec![Alternative::from("memcached")],
                reasoning: "pub/sub support".into(),
                confidence: None,
            },
        )
        .unwrap();
        s.save(&t).unwrap();
        let done = complete(
            &started("Cleanup"),
            CompleteInput::new("Removed the legacy OAuth shim", "delete", 0.9),
        )
        .unwrap();
        s.save(&done).unwrap();

        assert_eq!(s.search("redis", 10).unwrap()[0].id, t.id);
        assert_eq!(s.search("PUB/SUB", 10).unwrap()[0].id, t.id);
        assert_eq!(s.search("oauth", 10).unwrap()[0].id, done.id);
        assert!(s.search("kafka", 10).unwrap().is_empty());
    }

    #[test]
    fn search_respects_limit() {
        let (_tmp, s) = store();
        for i in 0..5 {
            s.save(&started(&format!("auth part {i}"))).unwrap();
        }
        assert_eq!(s.search("auth", 2).unwrap().len(), 2);
        assert_eq!(s.search("auth", 0).unwrap().len(), 5);
    }

    #[test]
    fn delete_removes_files_and_entry() {
        let (_tmp, s) = store();
        let done = completed("gone soon");
        s.save(&done).unwrap();
        let json = s.placement(&done);
        s.delete(&done.id).unwrap();
        assert!(!json.exists());
        assert!(!markdown_sibling(&json).exists());
        assert!(s.get(&done.id).unwrap().is_none());
        assert!(StoreIndex::load(&s.paths().index_json)
            .unwrap()
            .get(&done.id)
            .is_none());
        assert!(matches!(
            s.delete(&done.id).unwrap_err(),
            TrajectoryError::NotFound(_)
        ));
    }

    #[test]
    fn rebuild_index_recovers_from_loss() {
        let (_tmp, s) = store();
        let a = started("a");
        let b = completed("b");
        s.save(&a).unwrap();
        s.save(&b).unwrap();
        fs::remove_file(&s.paths().index_json).unwrap();
        assert!(s.list(&ListQuery::default()).unwrap().is_empty());

        assert_eq!(s.rebuild_index().unwrap(), 2);
        assert_eq!(s.list(&ListQuery::default()).unwrap().len(), 2);
    }

    #[test]
    fn save_rebuilds_lost_index() {
        let (_tmp, s) = store();
        for title in ["a", "b", "c"] {
            s.save(&started(title)).unwrap();
        }
        fs::remove_file(&s.paths().index_json).unwrap();
        s.save(&started("d")).unwrap();
        assert_eq!(s.list(&ListQuery::default()).unwrap().len(), 4);

        fs::write(&s.paths().index_json, "{{{").unwrap();
        s.save(&completed("e")).unwrap();
        assert_eq!(s.list(&ListQuery::default()).unwrap().len(), 5);
    }

    #[test]
    fn get_uses_indexed_location() {
        let (_tmp, s) = store();
        let done = completed("archived");
        s.save(&done).unwrap();

        let archived = s.paths().resolve(&format!("archive/{}.json", done.id));
        fs::create_dir_all(archived.parent().unwrap()).unwrap();
        fs::rename(s.placement(&done), &archived).unwrap();
        let mut index = StoreIndex::load(&s.paths().index_json).unwrap();
        index.trajectories.get_mut(&done.id).unwrap().path = format!("archive/{}.json", done.id);
        index.save(&s.paths().index_json).unwrap();

        assert_eq!(s.get(&done.id).unwrap(), Some(done.clone()));
        let rows = s.list(&ListQuery::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, done.id);
    }

    #[test]
    fn interrupted_relocation_prefers_indexed_copy() {
        let (_tmp, s) = store();
        let t = started("moving");
        s.save(&t).unwrap();
        let done = complete(&t, CompleteInput::new("done", "direct", 0.7)).unwrap();
        s.save(&done).unwrap();

        // Active copy left behind after the index already moved on.
        fs::write(
            s.paths().active_file(&t.id),
            serde_json::to_string_pretty(&t).unwrap(),
        )
        .unwrap();

        assert_eq!(s.get(&t.id).unwrap(), Some(done.clone()));
        assert!(s.get_active().unwrap().is_none());
        let rows = s.list(&ListQuery::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, TrajectoryStatus::Completed);

        s.delete(&t.id).unwrap();
        assert!(!s.paths().active_file(&t.id).exists());
        assert!(!s.placement(&done).exists());
    }

    #[test]
    fn saved_fields_roundtrip_exactly() {
        let (_tmp, s) = store();
        let mut t = add_event(&started("shapes"), AddEventInput::note("ran")).unwrap();
        t.chapters[0].events[0].raw = Some(serde_json::Value::Null);
        let mut input = CompleteInput::new("done", "direct", 0.7);
        input.decisions = vec![Decision {
            question: "Cache".into(),
            chosen: "none".into(),
            alternatives: vec![Alternative {
                option: "redis".into(),
                reason: Some(String::new()),
            }],
            reasoning: "not needed yet".into(),
            confidence: None,
        }];
        let done = complete(&t, input).unwrap();
        s.save(&done).unwrap();
        assert_eq!(s.get(&done.id).unwrap(), Some(done));
    }

    #[test]
    fn custom_renderer_is_used() {
        let tmp = tempfile::tempdir().unwrap();
        let s = FileStorage::with_renderer(&StoreConfig::new(tmp.path()), |t| {
            format!("custom {}", t.id)
        });
        let done = completed("x");
        s.save(&done).unwrap();
        let md = fs::read_to_string(markdown_sibling(&s.placement(&done))).unwrap();
        assert_eq!(md, format!("custom {}", done.id));
    }

    #[test]
    fn trace_sidecar_follows_trajectory() {
        let (_tmp, s) = store();
        let t = started("traced");
        s.save(&t).unwrap();
        let record = TraceRecord {
            id: "trace_abc".into(),
            timestamp: now_rfc3339(),
            trajectory: t.id.clone(),
            files: vec![],
        };
        let path = s.save_trace(&t, &record).unwrap();
        assert!(path.starts_with(&s.paths().active_dir));

        let done = complete(&t, CompleteInput::new("s", "a", 0.5)).unwrap();
        s.save(&done).unwrap();
        assert!(!path.exists());
        assert_eq!(s.get_trace(&t.id).unwrap(), Some(record));

        s.delete(&t.id).unwrap();
        assert!(!trace_sibling(&s.placement(&done)).exists());
    }
}
