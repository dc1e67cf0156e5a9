//! Versioned system templates, laid out as `{domain}/{name}.{version}.txt`
//! under a base directory and memoized per relative path.
//!
//! The cache is owned by a [`TemplateStore`] instance rather than the process,
//! so tests and embedders can run several independent stores side by side.
//! Entries are never invalidated: shipping a new template means shipping a new
//! file name.

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use fs_err as fs;
use parking_lot::RwLock;

use crate::errors::TemplateError;

/// Parsed `{domain}/{name}.{version}.txt` path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplatePath {
    pub domain: String,
    pub name: String,
    pub version: String,
}

impl TemplatePath {
    pub fn new(domain: &str, name: &str, version: &str) -> Self {
        Self {
            domain: domain.to_string(),
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    pub fn parse(relative: &str) -> Result<Self, TemplateError> {
        let invalid = || TemplateError::InvalidPath { path: relative.to_string() };

        if !is_safe_relative(relative) {
            return Err(invalid());
        }
        let (domain, file) = relative.rsplit_once('/').ok_or_else(invalid)?;
        let stem = file.strip_suffix(".txt").ok_or_else(invalid)?;
        let (name, version) = stem.rsplit_once('.').ok_or_else(invalid)?;
        if domain.is_empty() || name.is_empty() || version.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(domain, name, version))
    }

    pub fn relative(&self) -> String {
        format!("{}/{}.{}.txt", self.domain, self.name, self.version)
    }
}

impl fmt::Display for TemplatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.relative())
    }
}

/// A loaded template. `body` is shared with the store's cache.
#[derive(Debug, Clone)]
pub struct SystemTemplate {
    pub domain: String,
    pub name: String,
    pub version: String,
    pub body: Arc<str>,
}

impl SystemTemplate {
    pub fn path(&self) -> TemplatePath {
        TemplatePath::new(&self.domain, &self.name, &self.version)
    }
}

/// Backing store for template bodies.
pub trait TemplateSource: Send + Sync {
    fn read(&self, relative: &str) -> Result<String, TemplateError>;
}

/// Reads templates from a directory on disk.
pub struct FsTemplateSource {
    base: PathBuf,
}

impl FsTemplateSource {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl TemplateSource for FsTemplateSource {
    fn read(&self, relative: &str) -> Result<String, TemplateError> {
        if !is_safe_relative(relative) {
            return Err(TemplateError::InvalidPath { path: relative.to_string() });
        }
        let full = self.base.join(relative);
        if !full.is_file() {
            return Err(TemplateError::NotFound { path: full.display().to_string() });
        }
        fs::read_to_string(&full).map_err(|source| TemplateError::Io {
            path: full.display().to_string(),
            source,
        })
    }
}

/// Read-through cache in front of a [`TemplateSource`].
pub struct TemplateStore {
    source: Box<dyn TemplateSource>,
    cache: RwLock<HashMap<String, Arc<str>>>,
}

impl TemplateStore {
    pub fn new(source: impl TemplateSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_dir(base: impl Into<PathBuf>) -> Self {
        Self::new(FsTemplateSource::new(base))
    }

    /// Body for `relative`, reading the backing store only on the first call.
    ///
    /// Concurrent first loads may each read the source; the first insert wins
    /// and every caller gets that same `Arc`. Paths that are not
    /// `{domain}/{name}.{version}.txt` never reach the source.
    pub fn load(&self, relative: &str) -> Result<Arc<str>, TemplateError> {
        if let Some(hit) = self.cache.read().get(relative) {
            return Ok(Arc::clone(hit));
        }

        TemplatePath::parse(relative)?;
        let body: Arc<str> = Arc::from(self.source.read(relative)?);
        let mut cache = self.cache.write();
        let entry = cache.entry(relative.to_string()).or_insert(body);
        Ok(Arc::clone(entry))
    }

    pub fn template(&self, path: &TemplatePath) -> Result<SystemTemplate, TemplateError> {
        let body = self.load(&path.relative())?;
        Ok(SystemTemplate {
            domain: path.domain.clone(),
            name: path.name.clone(),
            version: path.version.clone(),
            body,
        })
    }

    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }
}

/// Only plain relative segments; no `..`, roots, drive prefixes or backslashes.
fn is_safe_relative(candidate: &str) -> bool {
    if candidate.is_empty() || candidate.contains('\\') {
        return false;
    }
    Path::new(candidate)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    struct Counting {
        reads: Arc<AtomicUsize>,
    }

    impl TemplateSource for Counting {
        fn read(&self, relative: &str) -> Result<String, TemplateError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(format!("body of {relative}"))
        }
    }

    struct Slow {
        reads: Arc<AtomicUsize>,
    }

    impl TemplateSource for Slow {
        fn read(&self, relative: &str) -> Result<String, TemplateError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            Ok(format!("body of {relative}"))
        }
    }

    #[test]
    fn parses_versioned_paths() {
        let p = TemplatePath::parse("text/auditor.v1.txt").unwrap();
        assert_eq!(p, TemplatePath::new("text", "auditor", "v1"));
        assert_eq!(p.to_string(), "text/auditor.v1.txt");

        assert!(TemplatePath::parse("auditor.v1.txt").is_err());
        assert!(TemplatePath::parse("text/auditor.txt").is_err());
        assert!(TemplatePath::parse("../text/auditor.v1.txt").is_err());
        assert!(TemplatePath::parse("/etc/auditor.v1.txt").is_err());
    }

    #[test]
    fn second_load_is_served_from_cache() {
        let reads = Arc::new(AtomicUsize::new(0));
        let store = TemplateStore::new(Counting { reads: reads.clone() });

        let a = store.load("text/auditor.v1.txt").unwrap();
        let b = store.load("text/auditor.v1.txt").unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert_eq!(store.cached(), 1);
    }

    #[test]
    fn concurrent_first_loads_converge_on_one_entry() {
        const THREADS: usize = 8;
        let reads = Arc::new(AtomicUsize::new(0));
        let store = TemplateStore::new(Slow { reads: reads.clone() });
        let barrier = Barrier::new(THREADS);

        let bodies: Vec<Arc<str>> = thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        store.load("text/enhancer.v1.txt").unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(bodies.iter().all(|b| Arc::ptr_eq(b, &bodies[0])));
        assert_eq!(&*bodies[0], "body of text/enhancer.v1.txt");
        assert_eq!(store.cached(), 1);
        assert!(reads.load(Ordering::SeqCst) >= 1);

        // settled: later loads never touch the source
        let settled = reads.load(Ordering::SeqCst);
        store.load("text/enhancer.v1.txt").unwrap();
        assert_eq!(reads.load(Ordering::SeqCst), settled);
    }

    #[test]
    fn malformed_paths_never_reach_the_source() {
        let reads = Arc::new(AtomicUsize::new(0));
        let store = TemplateStore::new(Counting { reads: reads.clone() });
        for bad in ["../text/auditor.v1.txt", "auditor.v1.txt", "text/auditor.txt"] {
            let err = store.load(bad).unwrap_err();
            assert!(matches!(err, TemplateError::InvalidPath { .. }), "{bad}");
        }
        assert_eq!(reads.load(Ordering::SeqCst), 0);
        assert_eq!(store.cached(), 0);
    }

    #[test]
    fn stores_do_not_share_caches() {
        let reads = Arc::new(AtomicUsize::new(0));
        let one = TemplateStore::new(Counting { reads: reads.clone() });
        let two = TemplateStore::new(Counting { reads: reads.clone() });

        one.load("remix/synthesizer.v1.txt").unwrap();
        two.load("remix/synthesizer.v1.txt").unwrap();
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::from_dir(dir.path());
        let err = store.load("text/missing.v1.txt").unwrap_err();
        assert!(matches!(err, TemplateError::NotFound { .. }));
        assert_eq!(store.cached(), 0);
    }

    #[test]
    fn reads_from_disk_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("text")).unwrap();
        std::fs::write(dir.path().join("text/auditor.v1.txt"), "audit rules").unwrap();

        let store = TemplateStore::from_dir(dir.path());
        let first = store.load("text/auditor.v1.txt").unwrap();

        std::fs::write(dir.path().join("text/auditor.v1.txt"), "changed").unwrap();
        let second = store.load("text/auditor.v1.txt").unwrap();

        assert_eq!(&*first, "audit rules");
        assert_eq!(&*second, "audit rules");
    }

    #[test]
    fn template_carries_path_parts() {
        let reads = Arc::new(AtomicUsize::new(0));
        let store = TemplateStore::new(Counting { reads });
        let t = store.template(&TemplatePath::new("visual", "dalle", "v1")).unwrap();
        assert_eq!(t.name, "dalle");
        assert_eq!(&*t.body, "body of visual/dalle.v1.txt");
        assert_eq!(t.path().relative(), "visual/dalle.v1.txt");
    }
}
