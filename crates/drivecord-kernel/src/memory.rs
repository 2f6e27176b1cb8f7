//! In-memory drive.
//!
//! Used by tests and by the binary's offline mode. All data is lost when
//! the last handle is dropped.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use drivecord_types::{
    Instance, InstanceId, Member, MemoryUsage, Permissions, PulledObject,
    ROOT_NAME, ROOT_PATH, SnapshotEntry, TraceHop,
};

use crate::api::{ApiError, ApiResult, DriveApi};
use crate::output::format_size;

#[derive(Debug, Clone, Default)]
struct Dir {
    dirs: BTreeMap<String, Dir>,
    files: BTreeMap<String, Vec<u8>>,
}

impl Dir {
    fn dir(&self, segments: &[String]) -> Option<&Dir> {
        segments
            .iter()
            .try_fold(self, |dir, name| dir.dirs.get(name))
    }

    fn dir_mut(&mut self, segments: &[String]) -> Option<&mut Dir> {
        segments
            .iter()
            .try_fold(self, |dir, name| dir.dirs.get_mut(name))
    }

    fn file(&self, segments: &[String]) -> Option<&Vec<u8>> {
        let (name, parent) = segments.split_last()?;
        self.dir(parent)?.files.get(name)
    }

    fn contains(&self, name: &str) -> bool {
        self.dirs.contains_key(name) || self.files.contains_key(name)
    }

    /// Like `mkdir -p`.
    fn ensure_dir(&mut self, segments: &[String]) -> &mut Dir {
        segments.iter().fold(self, |dir, name| {
            dir.dirs.entry(name.clone()).or_default()
        })
    }

    fn snapshot(&self, name: &str, path: &str) -> SnapshotEntry {
        let mut entry = SnapshotEntry::dir(name, path);
        for (child, dir) in &self.dirs {
            entry = entry.with_dir(dir.snapshot(child, &format!("{path}{child}/")));
        }
        for (child, bytes) in &self.files {
            entry = entry.with_file(SnapshotEntry::file(
                child,
                format!("{path}{child}"),
                bytes.len() as u64,
            ));
        }
        entry
    }

    /// `(canonical path, size)` of every file, depth first.
    fn walk_files(&self, prefix: &str, out: &mut Vec<(String, u64)>) {
        for (name, bytes) in &self.files {
            out.push((format!("{prefix}{name}"), bytes.len() as u64));
        }
        for (name, dir) in &self.dirs {
            dir.walk_files(&format!("{prefix}{name}/"), out);
        }
    }
}

#[derive(Debug)]
struct Drive {
    instance: Instance,
    /// `None` makes every permission fetch fail as forbidden.
    permissions: Option<Permissions>,
    members: Vec<Member>,
    root: Dir,
    structure_override: Option<SnapshotEntry>,
}

#[derive(Debug, Default)]
struct State {
    drives: Vec<Drive>,
    logged_out: bool,
}

impl State {
    fn drive(&mut self, id: InstanceId) -> ApiResult<&mut Drive> {
        if self.logged_out {
            return Err(ApiError::Unauthorized);
        }
        self.drives
            .iter_mut()
            .find(|d| d.instance.id == id)
            .ok_or(ApiError::DriveNotFound)
    }
}

/// A complete [`DriveApi`] held in process memory.
///
/// Clones share state, so a test can keep a handle after giving one to a
/// session. Paths follow the server's rules: `cwd` is a canonical `~/...`
/// path and `path` is resolved relative to it (`~` first, `.`, `..`).
#[derive(Debug, Clone, Default)]
pub struct MemoryDrive {
    state: Arc<RwLock<State>>,
}

impl MemoryDrive {
    /// A drive service with no instances.
    pub fn new() -> Self {
        Self::default()
    }

    /// One owned drive with a few files and members, for offline use.
    pub fn demo() -> Self {
        let owner = Permissions::none().with_owner(true);
        Self::new()
            .with_instance(Instance::new(1, "demo"), owner)
            .with_member(1, "you", 1, Some(owner))
            .with_member(1, "friend", 2, Some(Permissions::none().with_read(true).with_write(true)))
            .with_member(1, "guest", 3, None)
            .with_file(1, "~/README.md", "# Demo drive\n\nTry `help`, `ls yes` and `cd docs`.\n")
            .with_file(1, "~/docs/notes.txt", "offline notes\n")
            .with_dir(1, "~/docs/archive/")
            .with_file(1, "~/media/playlist.m3u", "#EXTM3U\n")
    }

    // ========================================================================
    // Builders
    // ========================================================================

    /// Add a drive the user can open with `permissions`.
    pub fn with_instance(self, instance: Instance, permissions: Permissions) -> Self {
        self.add_drive(instance, Some(permissions));
        self
    }

    /// Add a drive whose permission fetch fails with [`ApiError::Forbidden`].
    pub fn with_forbidden_instance(self, instance: Instance) -> Self {
        self.add_drive(instance, None);
        self
    }

    /// Add a member to drive `drive`. Ignored if the drive does not exist.
    pub fn with_member(
        self,
        drive: u64,
        name: &str,
        id: u64,
        permissions: Option<Permissions>,
    ) -> Self {
        self.edit(drive, |d| {
            d.members.push(Member {
                name: name.to_string(),
                id,
                permissions,
            })
        });
        self
    }

    /// Create a directory and its parents. Ignored if the drive does not exist.
    pub fn with_dir(self, drive: u64, path: &str) -> Self {
        let segments = canonical_segments(path);
        self.edit(drive, |d| {
            d.root.ensure_dir(&segments);
        });
        self
    }

    /// Create a file and its parent directories. Ignored if the drive does
    /// not exist.
    pub fn with_file(self, drive: u64, path: &str, content: &str) -> Self {
        let segments = canonical_segments(path);
        self.edit(drive, |d| {
            if let Some((name, parent)) = segments.split_last() {
                d.root
                    .ensure_dir(parent)
                    .files
                    .insert(name.clone(), content.as_bytes().to_vec());
            }
        });
        self
    }

    /// Serve `snapshot` verbatim from `structure`, malformed or not.
    pub fn with_structure(self, drive: u64, snapshot: SnapshotEntry) -> Self {
        self.set_structure(drive, Some(snapshot));
        self
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Replace (or with `None`, stop replacing) the served snapshot.
    pub fn set_structure(&self, drive: u64, snapshot: Option<SnapshotEntry>) {
        self.edit(drive, |d| d.structure_override = snapshot);
    }

    pub fn is_logged_out(&self) -> bool {
        self.lock().logged_out
    }

    /// Text content of the file at canonical `path`.
    pub fn file_content(&self, drive: u64, path: &str) -> Option<String> {
        let segments = canonical_segments(path);
        let state = self.lock();
        let d = state.drives.iter().find(|d| d.instance.id == InstanceId(drive))?;
        d.root
            .file(&segments)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Whether anything exists at canonical `path`.
    pub fn exists(&self, drive: u64, path: &str) -> bool {
        let segments = canonical_segments(path);
        let state = self.lock();
        state
            .drives
            .iter()
            .find(|d| d.instance.id == InstanceId(drive))
            .is_some_and(|d| d.root.dir(&segments).is_some() || d.root.file(&segments).is_some())
    }

    /// Current permissions of member `member` of drive `drive`.
    pub fn member_permissions(&self, drive: u64, member: u64) -> Option<Permissions> {
        let state = self.lock();
        state
            .drives
            .iter()
            .find(|d| d.instance.id == InstanceId(drive))?
            .members
            .iter()
            .find(|m| m.id == member)?
            .permissions
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn lock(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn add_drive(&self, instance: Instance, permissions: Option<Permissions>) {
        self.lock().drives.push(Drive {
            instance,
            permissions,
            members: Vec::new(),
            root: Dir::default(),
            structure_override: None,
        });
    }

    fn edit(&self, drive: u64, f: impl FnOnce(&mut Drive)) {
        let mut state = self.lock();
        if let Some(d) = state.drives.iter_mut().find(|d| d.instance.id == InstanceId(drive)) {
            f(d);
        }
    }

    fn with_drive<R>(
        &self,
        id: InstanceId,
        f: impl FnOnce(&mut Drive) -> ApiResult<R>,
    ) -> ApiResult<R> {
        let mut state = self
            .state
            .write()
            .map_err(|_| ApiError::other("lock poisoned"))?;
        f(state.drive(id)?)
    }

    /// Create a file or directory at `path` relative to `cwd`.
    fn create(&self, id: InstanceId, cwd: &str, path: &str, entry: NewEntry) -> ApiResult<()> {
        let segments = resolve(cwd, path)?;
        self.with_drive(id, |d| {
            let (name, parent) = segments
                .split_last()
                .ok_or_else(|| ApiError::conflict(format!("Invalid path: {path}")))?;
            let dir = d
                .root
                .dir_mut(parent)
                .ok_or_else(|| ApiError::conflict(format!("Directory not found: {path}")))?;
            if dir.contains(name) {
                return Err(ApiError::conflict(format!("Object already exists: {path}")));
            }
            match entry {
                NewEntry::Dir => {
                    dir.dirs.insert(name.clone(), Dir::default());
                }
                NewEntry::File(bytes) => {
                    dir.files.insert(name.clone(), bytes);
                }
            }
            Ok(())
        })
    }
}

enum NewEntry {
    Dir,
    File(Vec<u8>),
}

/// Segments below the root of a canonical `~/a/b/` path.
fn canonical_segments(path: &str) -> Vec<String> {
    path.replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty() && *s != ROOT_NAME)
        .map(str::to_string)
        .collect()
}

/// Resolve `path` against canonical `cwd` into segments below the root.
fn resolve(cwd: &str, path: &str) -> ApiResult<Vec<String>> {
    let mut segments = canonical_segments(cwd);
    let normalized = path.replace('\\', "/");
    for (index, segment) in normalized.split('/').filter(|s| !s.is_empty()).enumerate() {
        match segment {
            ROOT_NAME if index == 0 => segments.clear(),
            ROOT_NAME => return Err(ApiError::conflict(format!("Invalid path: {path}"))),
            "." => {}
            ".." => {
                segments.pop();
            }
            name => segments.push(name.to_string()),
        }
    }
    Ok(segments)
}

fn not_found(path: &str) -> ApiError {
    ApiError::conflict(format!("Object not found: {path}"))
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && !matches!(name, "." | ".." | ROOT_NAME) && !name.contains(['/', '\\'])
}

impl DriveApi for MemoryDrive {
    fn instances(&self) -> ApiResult<Vec<Instance>> {
        let state = self
            .state
            .read()
            .map_err(|_| ApiError::other("lock poisoned"))?;
        if state.logged_out {
            return Err(ApiError::Unauthorized);
        }
        Ok(state.drives.iter().map(|d| d.instance.clone()).collect())
    }

    fn logout(&self) -> ApiResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| ApiError::other("lock poisoned"))?;
        if state.logged_out {
            return Err(ApiError::conflict("Already logged out."));
        }
        state.logged_out = true;
        Ok(())
    }

    fn permissions(&self, instance: InstanceId) -> ApiResult<Permissions> {
        self.with_drive(instance, |d| d.permissions.ok_or(ApiError::Forbidden))
    }

    fn members(&self, instance: InstanceId) -> ApiResult<Vec<Member>> {
        self.with_drive(instance, |d| Ok(d.members.clone()))
    }

    fn update_permissions(
        &self,
        instance: InstanceId,
        member_id: u64,
        permissions: Permissions,
    ) -> ApiResult<()> {
        self.with_drive(instance, |d| {
            let member = d
                .members
                .iter_mut()
                .find(|m| m.id == member_id)
                .ok_or_else(|| ApiError::conflict(format!("Member not found: {member_id}")))?;
            if member.permissions.is_none() {
                return Err(ApiError::conflict(format!(
                    "Member is not registered: {member_id}"
                )));
            }
            member.permissions = Some(permissions);
            Ok(())
        })
    }

    fn structure(&self, instance: InstanceId) -> ApiResult<SnapshotEntry> {
        self.with_drive(instance, |d| {
            Ok(match &d.structure_override {
                Some(snapshot) => snapshot.clone(),
                None => d.root.snapshot(ROOT_NAME, ROOT_PATH),
            })
        })
    }

    fn make_file(&self, instance: InstanceId, cwd: &str, path: &str) -> ApiResult<()> {
        self.create(instance, cwd, path, NewEntry::File(Vec::new()))
    }

    fn make_dir(&self, instance: InstanceId, cwd: &str, path: &str) -> ApiResult<()> {
        self.create(instance, cwd, path, NewEntry::Dir)
    }

    fn remove(&self, instance: InstanceId, cwd: &str, path: &str) -> ApiResult<()> {
        let segments = resolve(cwd, path)?;
        self.with_drive(instance, |d| {
            let (name, parent) = segments
                .split_last()
                .ok_or_else(|| ApiError::conflict("Cannot remove the root directory"))?;
            let dir = d.root.dir_mut(parent).ok_or_else(|| not_found(path))?;
            let removed = dir.dirs.remove(name).is_some() || dir.files.remove(name).is_some();
            if removed { Ok(()) } else { Err(not_found(path)) }
        })
    }

    fn rename(&self, instance: InstanceId, cwd: &str, path: &str, new_name: &str) -> ApiResult<()> {
        if !valid_name(new_name) {
            return Err(ApiError::conflict(format!("Invalid name: {new_name}")));
        }
        let segments = resolve(cwd, path)?;
        self.with_drive(instance, |d| {
            let (name, parent) = segments
                .split_last()
                .ok_or_else(|| ApiError::conflict("Cannot rename the root directory"))?;
            let dir = d.root.dir_mut(parent).ok_or_else(|| not_found(path))?;
            if !dir.contains(name) {
                return Err(not_found(path));
            }
            if dir.contains(new_name) {
                return Err(ApiError::conflict(format!("Name already taken: {new_name}")));
            }
            if let Some(moved) = dir.dirs.remove(name) {
                dir.dirs.insert(new_name.to_string(), moved);
            } else if let Some(moved) = dir.files.remove(name) {
                dir.files.insert(new_name.to_string(), moved);
            }
            Ok(())
        })
    }

    fn read_file(&self, instance: InstanceId, cwd: &str, path: &str) -> ApiResult<String> {
        let segments = resolve(cwd, path)?;
        self.with_drive(instance, |d| {
            d.root
                .file(&segments)
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .ok_or_else(|| not_found(path))
        })
    }

    fn pull(&self, instance: InstanceId, cwd: &str, path: &str) -> ApiResult<PulledObject> {
        let segments = resolve(cwd, path)?;
        self.with_drive(instance, |d| {
            if let Some(bytes) = d.root.file(&segments) {
                let name = segments.last().cloned().unwrap_or_default();
                return Ok(PulledObject {
                    name,
                    content: String::from_utf8_lossy(bytes).into_owned(),
                    is_zip: false,
                });
            }
            if d.root.dir(&segments).is_some() {
                return Err(ApiError::conflict(
                    "Directory downloads are not available offline",
                ));
            }
            Err(not_found(path))
        })
    }

    fn write_file(&self, instance: InstanceId, cwd: &str, path: &str, content: &str) -> ApiResult<()> {
        let segments = resolve(cwd, path)?;
        self.with_drive(instance, |d| {
            let (name, parent) = segments.split_last().ok_or_else(|| not_found(path))?;
            let file = d
                .root
                .dir_mut(parent)
                .and_then(|dir| dir.files.get_mut(name))
                .ok_or_else(|| not_found(path))?;
            *file = content.as_bytes().to_vec();
            Ok(())
        })
    }

    fn upload(&self, instance: InstanceId, cwd: &str, path: &str, content: &str) -> ApiResult<()> {
        let bytes = STANDARD
            .decode(content)
            .map_err(|_| ApiError::conflict("Invalid file content"))?;
        self.create(instance, cwd, path, NewEntry::File(bytes))
    }

    fn memory_usage(&self, instance: InstanceId) -> ApiResult<MemoryUsage> {
        self.with_drive(instance, |d| {
            let mut files = Vec::new();
            d.root.walk_files(ROOT_PATH, &mut files);
            let total = format_size(files.iter().map(|(_, size)| size).sum());
            Ok(MemoryUsage {
                per_bucket: BTreeMap::from([("data_0".to_string(), total.clone())]),
                total,
            })
        })
    }

    fn dump_cache(&self, instance: InstanceId, index: u64) -> ApiResult<String> {
        self.with_drive(instance, |d| {
            if index != 0 {
                return Err(ApiError::conflict(format!("Bucket not found: {index}")));
            }
            let mut files = Vec::new();
            d.root.walk_files(ROOT_PATH, &mut files);
            Ok(files
                .iter()
                .map(|(path, size)| format!("{path}: {size}B"))
                .collect::<Vec<_>>()
                .join("\n"))
        })
    }

    fn recache(&self, instance: InstanceId, index: u64) -> ApiResult<String> {
        self.dump_cache(instance, index)
    }

    fn trace(&self, instance: InstanceId, path: &str) -> ApiResult<Vec<TraceHop>> {
        let segments = resolve(ROOT_PATH, path)?;
        self.with_drive(instance, |d| {
            d.root.file(&segments).ok_or_else(|| not_found(path))?;
            let location = segments.join("/");
            Ok(vec![
                TraceHop {
                    id: "header".to_string(),
                    url: format!("memory://{}/{location}", d.instance.id),
                },
                TraceHop {
                    id: "chunk-0".to_string(),
                    url: format!("memory://{}/chunks/0", d.instance.id),
                },
            ])
        })
    }
}
