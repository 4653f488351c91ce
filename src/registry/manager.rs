//! The syntax registry façade.
//!
//! `SyntaxRegistry` owns both layers, the detection tables and a definition
//! cache. Everything readers look at lives in one immutable
//! `RegistrySnapshot` that writers rebuild from disk and swap in whole, so a
//! reader always sees either the state before a write or the state after it.
//!
//! Writers are serialized by `write_lock`. A write performs its filesystem
//! step first; only when that succeeds is the user layer rescanned and the new
//! snapshot committed. Subscribers are notified after the commit.

use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::codec;
use super::error::{InvalidName, SyntaxError};
use super::events::{ChangeNotifier, SyntaxChange};
use super::index::{MappingConflicts, MappingTables};
use super::layers::{BundledLayer, UserLayer};
use super::mapping::{load_snapshots, MappingKind};
use crate::config::RegistryConfig;
use crate::config_io::DirectoryContext;
use crate::model::definition::{caseless_cmp, Definition};
use crate::model::filesystem::{FileSystem, StdFileSystem};
use crate::primitives::sniffer;

/// Name meaning "no syntax". Always resolvable, never stored.
pub const NONE_NAME: &str = "None";

/// Name returned when a document is recognized by its XML declaration.
pub const XML_NAME: &str = "XML";

/// Where a syntax name comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SettingState {
    /// Shipped with the application
    pub is_bundled: bool,
    /// A bundled syntax overridden by a user file
    pub is_customized: bool,
}

/// Immutable view of the user layer at one point in time.
#[derive(Debug, Default)]
struct RegistrySnapshot {
    generation: u64,
    /// Bundled names plus loadable user names, case-insensitively sorted
    names: Vec<String>,
    /// Every user file found on the last scan, including unparsable ones
    user_files: HashMap<String, PathBuf>,
    tables: MappingTables,
    skipped: Vec<PathBuf>,
}

impl RegistrySnapshot {
    fn contains(&self, name: &str) -> bool {
        self.names
            .binary_search_by(|probe| caseless_cmp(probe, name))
            .is_ok()
    }
}

struct RegistryState {
    snapshot: Arc<RegistrySnapshot>,
    cache: HashMap<String, Arc<Definition>>,
    recent: LruCache<String, ()>,
}

/// Layered registry of syntax definitions.
pub struct SyntaxRegistry {
    fs: Arc<dyn FileSystem>,
    bundled: BundledLayer,
    bundled_names: Vec<String>,
    user: UserLayer,
    state: RwLock<RegistryState>,
    write_lock: Mutex<()>,
    notifier: ChangeNotifier,
}

impl SyntaxRegistry {
    /// Create a registry over `bundled` and the user syntaxes in `user_dir`.
    ///
    /// Legacy `.yaml` user files are migrated first when the config asks for
    /// it. A missing user directory is an empty user layer.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        bundled: BundledLayer,
        user_dir: PathBuf,
        config: &RegistryConfig,
    ) -> Self {
        let user = UserLayer::new(user_dir);
        if config.migrate_legacy_extension {
            let migrated = user.migrate_legacy(fs.as_ref());
            if migrated > 0 {
                tracing::info!("Migrated {} legacy syntax files", migrated);
            }
        }

        let capacity = NonZeroUsize::new(config.recent_capacity).unwrap_or(NonZeroUsize::MIN);
        let bundled_names = bundled.names();
        let registry = Self {
            fs,
            bundled,
            bundled_names,
            user,
            state: RwLock::new(RegistryState {
                snapshot: Arc::new(RegistrySnapshot::default()),
                cache: HashMap::new(),
                recent: LruCache::new(capacity),
            }),
            write_lock: Mutex::new(()),
            notifier: ChangeNotifier::new(),
        };
        registry.reload();
        registry
    }

    /// Registry using the embedded bundle, the real filesystem and the
    /// directories of `dir_context`.
    pub fn from_directories(dir_context: &DirectoryContext) -> Result<Self, SyntaxError> {
        let config = RegistryConfig::load_or_default(dir_context.registry_config_path());
        Ok(Self::new(
            Arc::new(StdFileSystem),
            BundledLayer::embedded()?,
            dir_context.syntaxes_dir(),
            &config,
        ))
    }

    fn read_state(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.read_state().snapshot)
    }

    /// Exact match against known names and user files.
    fn is_known(&self, name: &str) -> bool {
        let snapshot = self.snapshot();
        snapshot.contains(name) || snapshot.user_files.contains_key(name)
    }

    /// Directory holding user syntax files.
    pub fn user_dir(&self) -> &Path {
        self.user.dir()
    }

    /// Subscribe to committed changes.
    pub fn subscribe(&self) -> mpsc::Receiver<SyntaxChange> {
        self.notifier.subscribe()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// All known names: bundled names and loadable user names, sorted
    /// case-insensitively. The `None` sentinel is not included.
    pub fn setting_names(&self) -> Vec<String> {
        self.snapshot().names.clone()
    }

    /// Names shipped with the application, sorted case-insensitively.
    pub fn bundled_setting_names(&self) -> &[String] {
        &self.bundled_names
    }

    /// Most recently resolved names, newest first.
    pub fn recent_setting_names(&self) -> Vec<String> {
        self.read_state()
            .recent
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// User files that could not be read or parsed on the last reload.
    pub fn skipped_user_files(&self) -> Vec<PathBuf> {
        self.snapshot().skipped.clone()
    }

    /// Tokens declared by more than one syntax.
    pub fn mapping_conflicts(&self) -> MappingConflicts {
        self.snapshot().tables.conflicts()
    }

    pub fn state_of(&self, name: &str) -> SettingState {
        let is_bundled = self.bundled.contains(name);
        SettingState {
            is_bundled,
            is_customized: is_bundled && self.snapshot().user_files.contains_key(name),
        }
    }

    /// Check whether `name` may be used for a syntax.
    ///
    /// `original` is the name being edited, if any; it does not count as a
    /// clash with itself.
    pub fn validate_name(&self, name: &str, original: Option<&str>) -> Result<(), InvalidName> {
        validate_name_format(name)?;

        let lowered = name.to_lowercase();
        if original.is_some_and(|original| original.to_lowercase() == lowered) {
            return Ok(());
        }
        let snapshot = self.snapshot();
        let taken = std::iter::once(NONE_NAME)
            .chain(snapshot.names.iter().map(String::as_str))
            .chain(snapshot.user_files.keys().map(String::as_str))
            .find(|existing| existing.to_lowercase() == lowered);
        match taken {
            Some(existing) => Err(InvalidName::AlreadyExists(existing.to_string())),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Load the definition for `name`, user layer first.
    ///
    /// Successful loads are cached and move `name` to the front of the recent
    /// list. Failed loads are not cached.
    pub fn resolve_by_name(&self, name: &str) -> Result<Arc<Definition>, SyntaxError> {
        let (snapshot, cached) = {
            let state = self.read_state();
            (Arc::clone(&state.snapshot), state.cache.get(name).cloned())
        };

        let definition = match cached {
            Some(definition) => {
                tracing::trace!("Syntax cache hit for {}", name);
                definition
            }
            None if name == NONE_NAME => Arc::new(Definition::default()),
            None => {
                if !snapshot.contains(name) {
                    return Err(SyntaxError::NotFound(name.to_string()));
                }
                let definition = Arc::new(self.load(&snapshot, name)?);
                tracing::debug!("Loaded syntax {}", name);
                definition
            }
        };

        let mut state = self.write_state();
        // A write committed while loading; don't cache a possibly stale result
        if state.snapshot.generation == snapshot.generation && name != NONE_NAME {
            state
                .cache
                .entry(name.to_string())
                .or_insert_with(|| Arc::clone(&definition));
        }
        state.recent.put(name.to_string(), ());

        Ok(definition)
    }

    fn load(&self, snapshot: &RegistrySnapshot, name: &str) -> Result<Definition, SyntaxError> {
        let Some(path) = snapshot.user_files.get(name) else {
            return self.bundled.load(self.fs.as_ref(), name);
        };

        match self.fs.read_file(path) {
            Ok(bytes) => codec::parse_definition(&bytes).map_err(|source| SyntaxError::LoadFailed {
                name: name.to_string(),
                source,
            }),
            // Removed behind our back; fall back to the bundled copy if any
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && self.bundled.contains(name) => {
                tracing::warn!("User syntax {:?} disappeared, using bundled {}", path, name);
                self.bundled.load(self.fs.as_ref(), name)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("User syntax {:?} disappeared", path);
                Err(SyntaxError::NotFound(name.to_string()))
            }
            Err(e) => Err(SyntaxError::io(path, e)),
        }
    }

    /// Detect the syntax of a document.
    ///
    /// Tries the filename, then its extension (exact, then ignoring case),
    /// then the shebang interpreter and finally an XML declaration. Returns
    /// `None` when nothing matches.
    pub fn resolve_by_document(&self, filename: &str, content: &str) -> Option<String> {
        let snapshot = self.snapshot();
        let tables = &snapshot.tables;
        let path = Path::new(filename);

        if let Some(base) = path.file_name().and_then(|name| name.to_str()) {
            if let Some(name) = tables.lookup(MappingKind::Filename, base) {
                return Some(name.to_string());
            }
        }

        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            let name = tables
                .lookup(MappingKind::Extension, extension)
                .or_else(|| tables.lookup_extension_caseless(extension));
            if let Some(name) = name {
                return Some(name.to_string());
            }
        }

        if let Some(interpreter) = sniffer::scan_interpreter(content) {
            if let Some(name) = tables.lookup(MappingKind::Interpreter, interpreter) {
                return Some(name.to_string());
            }
        }

        if sniffer::is_xml_declaration(content) {
            return Some(XML_NAME.to_string());
        }

        None
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Persist `definition` under `name`, renaming from `old_name` first when
    /// it differs.
    ///
    /// A definition equal to the bundled one of the same name removes the user
    /// file instead of writing it.
    pub fn save(
        &self,
        definition: &Definition,
        name: &str,
        old_name: Option<&str>,
    ) -> Result<(), SyntaxError> {
        let change = {
            let _guard = self.lock_writes();
            self.save_locked(definition, name, old_name)?
        };
        self.notifier.notify(change);
        Ok(())
    }

    fn save_locked(
        &self,
        definition: &Definition,
        name: &str,
        old_name: Option<&str>,
    ) -> Result<SyntaxChange, SyntaxError> {
        ensure_not_reserved(name)?;
        let renamed_from = old_name.filter(|old| *old != name);
        if let Some(old) = renamed_from {
            ensure_not_reserved(old)?;
            if self.bundled.contains(old) {
                return Err(SyntaxError::Bundled(old.to_string()));
            }
        }
        match renamed_from {
            Some(old) => self.validate_name(name, Some(old))?,
            None if self.is_known(name) => validate_name_format(name)?,
            None => self.validate_name(name, None)?,
        }

        let existed = self.snapshot().contains(name);
        let target = self.user.path_for(name);

        let moved_from = match renamed_from {
            Some(old) => {
                let source = self.user.path_for(old);
                if self.fs.exists(&source) {
                    self.fs
                        .rename(&source, &target)
                        .map_err(|e| SyntaxError::io(&source, e))?;
                    Some(source)
                } else {
                    None
                }
            }
            None => None,
        };

        if let Err(e) = self.write_or_reset(definition, name, &target) {
            if let Some(source) = &moved_from {
                if let Err(rollback) = self.fs.rename(&target, source) {
                    tracing::error!("Failed to roll back rename of {:?}: {}", source, rollback);
                }
            }
            return Err(e);
        }

        let invalidated: Vec<&str> = std::iter::once(name).chain(renamed_from).collect();
        self.commit(&invalidated);

        Ok(match renamed_from {
            Some(old) => SyntaxChange::Updated {
                from: old.to_string(),
                to: name.to_string(),
            },
            None if existed => SyntaxChange::Updated {
                from: name.to_string(),
                to: name.to_string(),
            },
            None => SyntaxChange::Added(name.to_string()),
        })
    }

    /// Write the sanitized definition to `target`, or remove `target` when the
    /// definition matches the bundled one.
    fn write_or_reset(
        &self,
        definition: &Definition,
        name: &str,
        target: &Path,
    ) -> Result<(), SyntaxError> {
        let sanitized = definition.sanitized();

        if self.matches_bundled(name, &sanitized) {
            if self.fs.exists(target) {
                self.fs
                    .remove_file(target)
                    .map_err(|e| SyntaxError::io(target, e))?;
                tracing::info!("Reset syntax {} to bundled", name);
            }
            return Ok(());
        }

        let bytes = codec::serialize_definition(&sanitized)?;
        self.fs
            .create_dir_all(self.user.dir())
            .map_err(|e| SyntaxError::io(self.user.dir(), e))?;
        self.fs
            .write_file(target, &bytes)
            .map_err(|e| SyntaxError::io(target, e))?;
        tracing::info!("Saved syntax {} to {:?}", name, target);
        Ok(())
    }

    fn matches_bundled(&self, name: &str, sanitized: &Definition) -> bool {
        if !self.bundled.contains(name) {
            return false;
        }
        match self.bundled.load(self.fs.as_ref(), name) {
            Ok(bundled) => bundled.sanitized() == *sanitized,
            Err(e) => {
                tracing::warn!("Cannot compare {} with bundled copy: {}", name, e);
                false
            }
        }
    }

    /// Rename the user syntax `name` to `to`.
    pub fn rename(&self, name: &str, to: &str) -> Result<(), SyntaxError> {
        if name == to {
            return Ok(());
        }
        let change = {
            let _guard = self.lock_writes();
            ensure_not_reserved(name)?;
            if self.bundled.contains(name) {
                return Err(SyntaxError::Bundled(name.to_string()));
            }
            let source = self
                .snapshot()
                .user_files
                .get(name)
                .cloned()
                .ok_or_else(|| SyntaxError::NotFound(name.to_string()))?;
            self.validate_name(to, Some(name))?;

            let target = self.user.path_for(to);
            self.fs
                .rename(&source, &target)
                .map_err(|e| SyntaxError::io(&source, e))?;
            tracing::info!("Renamed syntax {} to {}", name, to);

            self.commit(&[name, to]);
            SyntaxChange::Updated {
                from: name.to_string(),
                to: to.to_string(),
            }
        };
        self.notifier.notify(change);
        Ok(())
    }

    /// Delete the user syntax `name`. Bundled syntaxes are restored with
    /// [`SyntaxRegistry::restore`] instead.
    pub fn delete(&self, name: &str) -> Result<(), SyntaxError> {
        {
            let _guard = self.lock_writes();
            ensure_not_reserved(name)?;
            if self.bundled.contains(name) {
                return Err(SyntaxError::Bundled(name.to_string()));
            }
            self.remove_user_file(name)?;
            tracing::info!("Deleted syntax {}", name);
            self.commit(&[name]);
        }
        self.notifier.notify(SyntaxChange::Removed(name.to_string()));
        Ok(())
    }

    /// Drop the user override of a bundled syntax.
    pub fn restore(&self, name: &str) -> Result<(), SyntaxError> {
        {
            let _guard = self.lock_writes();
            ensure_not_reserved(name)?;
            if !self.bundled.contains(name) {
                return Err(SyntaxError::NotFound(name.to_string()));
            }
            self.remove_user_file(name)?;
            tracing::info!("Restored bundled syntax {}", name);
            self.commit(&[name]);
        }
        self.notifier.notify(SyntaxChange::Updated {
            from: name.to_string(),
            to: name.to_string(),
        });
        Ok(())
    }

    fn remove_user_file(&self, name: &str) -> Result<(), SyntaxError> {
        let path = self
            .snapshot()
            .user_files
            .get(name)
            .cloned()
            .ok_or_else(|| SyntaxError::NotFound(name.to_string()))?;
        self.fs
            .remove_file(&path)
            .map_err(|e| SyntaxError::io(&path, e))
    }

    /// Copy `name` into a new user syntax and return the new name.
    pub fn duplicate(&self, name: &str) -> Result<String, SyntaxError> {
        let definition = self.resolve_by_name(name)?;
        let (new_name, change) = {
            let _guard = self.lock_writes();
            let new_name = self.copy_name(name);
            let change = self.save_locked(&definition, &new_name, None)?;
            (new_name, change)
        };
        self.notifier.notify(change);
        Ok(new_name)
    }

    fn copy_name(&self, name: &str) -> String {
        let base = format!("{name} copy");
        if self.validate_name(&base, None).is_ok() {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base} {n}");
            if self.validate_name(&candidate, None).is_ok() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Add the syntax file at `path` to the user layer, named after the file
    /// stem. Returns the imported name.
    pub fn import(&self, path: &Path) -> Result<String, SyntaxError> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or(SyntaxError::InvalidName(InvalidName::Empty))?
            .to_string();
        let bytes = self
            .fs
            .read_file(path)
            .map_err(|e| SyntaxError::io(path, e))?;
        let definition =
            codec::parse_definition(&bytes).map_err(|source| SyntaxError::LoadFailed {
                name: name.clone(),
                source,
            })?;

        let change = {
            let _guard = self.lock_writes();
            self.save_locked(&definition, &name, None)?
        };
        tracing::info!("Imported syntax {} from {:?}", name, path);
        self.notifier.notify(change);
        Ok(name)
    }

    /// Write the resolved definition of `name` to `path`.
    pub fn export(&self, name: &str, path: &Path) -> Result<(), SyntaxError> {
        let definition = self.resolve_by_name(name)?;
        let bytes = codec::serialize_definition(&definition)?;
        self.fs
            .write_file(path, &bytes)
            .map_err(|e| SyntaxError::io(path, e))?;
        tracing::info!("Exported syntax {} to {:?}", name, path);
        Ok(())
    }

    /// Rescan the user layer, for hosts that watch the directory themselves.
    /// Drops the whole cache and emits no notification.
    pub fn reload(&self) {
        let _guard = self.lock_writes();
        let snapshot = self.scan(self.snapshot().generation + 1);
        let mut state = self.write_state();
        state.cache.clear();
        retain_known(&mut state.recent, &snapshot);
        state.snapshot = Arc::new(snapshot);
    }

    /// Rebuild from disk after a successful write. Caller holds `write_lock`.
    fn commit(&self, invalidated: &[&str]) {
        let snapshot = self.scan(self.snapshot().generation + 1);
        let mut state = self.write_state();
        for name in invalidated {
            state.cache.remove(*name);
        }
        retain_known(&mut state.recent, &snapshot);
        state.snapshot = Arc::new(snapshot);
    }

    fn scan(&self, generation: u64) -> RegistrySnapshot {
        let files = self.user.scan(self.fs.as_ref());
        let batch = load_snapshots(self.fs.as_ref(), &files);
        let tables = MappingTables::build(self.bundled.snapshots(), &batch.snapshots);

        let mut names: Vec<String> = self
            .bundled_names
            .iter()
            .cloned()
            .chain(
                batch
                    .snapshots
                    .keys()
                    .filter(|name| !self.bundled.contains(name))
                    .cloned(),
            )
            .collect();
        names.sort_by(|a, b| caseless_cmp(a, b));

        tracing::debug!(
            "Reloaded user syntaxes from {:?}: {} files, {} skipped",
            self.user.dir(),
            files.len(),
            batch.skipped.len()
        );

        RegistrySnapshot {
            generation,
            names,
            user_files: files.into_iter().collect(),
            tables,
            skipped: batch.skipped,
        }
    }
}

fn ensure_not_reserved(name: &str) -> Result<(), SyntaxError> {
    if name == NONE_NAME {
        return Err(SyntaxError::Reserved(name.to_string()));
    }
    Ok(())
}

fn validate_name_format(name: &str) -> Result<(), InvalidName> {
    if name.trim().is_empty() {
        Err(InvalidName::Empty)
    } else if name.contains('/') {
        Err(InvalidName::ContainsSlash)
    } else if let Some(c) = name.chars().find(|c| matches!(*c, '\\' | '\0')) {
        Err(InvalidName::InvalidCharacter(c))
    } else if name.starts_with('.') {
        Err(InvalidName::StartsWithDot)
    } else {
        Ok(())
    }
}

fn retain_known(recent: &mut LruCache<String, ()>, snapshot: &RegistrySnapshot) {
    let gone: Vec<String> = recent
        .iter()
        .map(|(name, _)| name)
        .filter(|name| name.as_str() != NONE_NAME && !snapshot.names.contains(*name))
        .cloned()
        .collect();
    for name in gone {
        recent.pop(&name);
    }
}
