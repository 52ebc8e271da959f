use crate::config::IndexingConfig;
use crate::error::IndexingError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::path::{Component, Path, PathBuf};

/// Which directories and files a walk leaves out
#[derive(Debug, Clone, Default)]
pub struct ExclusionPolicy {
    /// Directory names skipped at any depth
    pub dirs: Vec<String>,
    /// File name suffixes (`.min.js`, `.so`), infix fragments ending in a
    /// dot (`.bundle.`), or glob patterns (`**/*_pb2.py`)
    pub files: Vec<String>,
}

impl From<&IndexingConfig> for ExclusionPolicy {
    fn from(config: &IndexingConfig) -> Self {
        Self {
            dirs: config.exclude_dirs.clone(),
            files: config.exclude_files.clone(),
        }
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Compiled form of an [`ExclusionPolicy`]
struct ExclusionMatcher {
    dirs: Vec<String>,
    suffixes: Vec<String>,
    fragments: Vec<String>,
    globs: GlobSet,
}

impl ExclusionMatcher {
    fn new(policy: &ExclusionPolicy) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        let mut suffixes = Vec::new();
        let mut fragments = Vec::new();
        for pattern in &policy.files {
            if is_glob(pattern) {
                let glob = Glob::new(pattern)
                    .with_context(|| format!("Invalid exclusion pattern '{}'", pattern))?;
                builder.add(glob);
            } else if pattern.len() > 1 && pattern.ends_with('.') {
                fragments.push(pattern.clone());
            } else {
                suffixes.push(pattern.clone());
            }
        }
        Ok(Self {
            dirs: policy.dirs.clone(),
            suffixes,
            fragments,
            globs: builder.build().context("Failed to compile exclusion patterns")?,
        })
    }

    fn excludes(&self, relative: &Path) -> bool {
        let in_excluded_dir = relative
            .parent()
            .into_iter()
            .flat_map(|p| p.components())
            .any(|c| match c {
                Component::Normal(name) => {
                    let name = name.to_string_lossy();
                    self.dirs.iter().any(|d| *d == name)
                }
                _ => false,
            });
        if in_excluded_dir {
            return true;
        }

        let file_name = relative
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.suffixes.iter().any(|s| file_name.ends_with(s.as_str()))
            || self.fragments.iter().any(|f| file_name.contains(f.as_str()))
            || self.globs.is_match(relative)
    }
}

/// Access to the files of a repository checkout. Paths are relative to the
/// repository root and use `/` separators.
#[async_trait]
pub trait RepositorySource: Send + Sync {
    async fn read(&self, path: &str) -> Result<String>;

    /// Size in bytes
    async fn size(&self, path: &str) -> Result<u64>;

    /// Files under `dir` (relative, `""` for the root) whose extension is in
    /// `extensions` and which no exclusion covers, sorted
    async fn list(
        &self,
        dir: &str,
        extensions: &[String],
        exclusions: &ExclusionPolicy,
    ) -> Result<Vec<String>>;
}

/// A repository on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, IndexingError> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(IndexingError::DirectoryNotFound(root.display().to_string()));
        }
        if !root.is_dir() {
            return Err(IndexingError::NotADirectory(root.display().to_string()));
        }
        let root = root
            .canonicalize()
            .unwrap_or_else(|_| root.to_path_buf());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

fn relative_string(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn walk(
    root: &Path,
    dir: &str,
    extensions: &[String],
    exclusions: &ExclusionMatcher,
) -> Result<Vec<String>> {
    let start = root.join(dir);
    if !start.is_dir() {
        return Err(IndexingError::NotADirectory(start.display().to_string()).into());
    }

    let walker = WalkBuilder::new(&start)
        .standard_filters(true)
        .hidden(false)
        .git_ignore(true)
        .git_exclude(true)
        .git_global(true)
        .require_git(false)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| IndexingError::WalkFailed(e.to_string()))?;
        let path = entry.path();
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        if relative.components().any(|c| c.as_os_str() == ".git") {
            continue;
        }

        let matches_extension = relative
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)));
        if !matches_extension {
            continue;
        }
        if exclusions.excludes(relative) {
            tracing::debug!("Excluded {:?}", relative);
            continue;
        }

        files.push(relative_string(relative));
    }

    files.sort();
    Ok(files)
}

#[async_trait]
impl RepositorySource for LocalRepository {
    async fn read(&self, path: &str) -> Result<String> {
        tokio::fs::read_to_string(self.resolve(path))
            .await
            .map_err(|e| IndexingError::FileReadFailed {
                file: path.to_string(),
                reason: e.to_string(),
            })
            .map_err(Into::into)
    }

    async fn size(&self, path: &str) -> Result<u64> {
        let metadata = tokio::fs::metadata(self.resolve(path))
            .await
            .with_context(|| format!("Failed to stat {}", path))?;
        Ok(metadata.len())
    }

    async fn list(
        &self,
        dir: &str,
        extensions: &[String],
        exclusions: &ExclusionPolicy,
    ) -> Result<Vec<String>> {
        let matcher = ExclusionMatcher::new(exclusions)?;
        let root = self.root.clone();
        let dir = dir.to_string();
        let extensions = extensions.to_vec();

        let files = tokio::task::spawn_blocking(move || walk(&root, &dir, &extensions, &matcher))
            .await
            .context("Directory walk panicked")??;

        tracing::info!("Found {} files to index", files.len());
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn policy() -> ExclusionPolicy {
        ExclusionPolicy {
            dirs: vec!["node_modules".to_string(), "build".to_string()],
            files: vec![".min.js".to_string(), "**/*_pb2.py".to_string()],
        }
    }

    fn exts() -> Vec<String> {
        vec!["py".to_string(), "js".to_string()]
    }

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_missing_root() {
        let result = LocalRepository::new("/nonexistent/path/for/sure");
        assert!(matches!(result, Err(IndexingError::DirectoryNotFound(_))));
    }

    #[test]
    fn test_root_is_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.py");
        fs::write(&file, "x = 1").unwrap();
        assert!(matches!(
            LocalRepository::new(&file),
            Err(IndexingError::NotADirectory(_))
        ));
    }

    #[tokio::test]
    async fn test_list_applies_extensions_and_exclusions() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "app/main.py", "print('hi')");
        write(root, "app/ui.js", "let a = 1;");
        write(root, "app/ui.min.js", "let a=1;");
        write(root, "app/api_pb2.py", "X = 1");
        write(root, "node_modules/lib/index.js", "module.exports = {};");
        write(root, "build/out.py", "y = 2");
        write(root, "README.md", "# readme");

        let repo = LocalRepository::new(root).unwrap();
        let files = repo.list("", &exts(), &policy()).await.unwrap();
        assert_eq!(files, vec!["app/main.py", "app/ui.js"]);
    }

    #[tokio::test]
    async fn test_default_policy_keeps_dotted_source_names() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for name in [
            "src/user.actions.ts",
            "src/index.android.js",
            "src/site.mapper.js",
            "app/data.api.py",
            "app/foo.orm.py",
            "src/app.min.js",
            "src/app.bundle.js",
            "src/app.js.map",
        ] {
            write(root, name, "x");
        }

        let config = IndexingConfig::default();
        let policy = ExclusionPolicy::from(&config);
        let extensions = vec!["ts".to_string(), "js".to_string(), "py".to_string(), "map".to_string()];
        let repo = LocalRepository::new(root).unwrap();
        let files = repo.list("", &extensions, &policy).await.unwrap();
        assert_eq!(
            files,
            vec![
                "app/data.api.py",
                "app/foo.orm.py",
                "src/index.android.js",
                "src/site.mapper.js",
                "src/user.actions.ts",
            ]
        );
    }

    #[tokio::test]
    async fn test_list_subdirectory() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a/one.py", "a = 1");
        write(dir.path(), "b/two.py", "b = 2");

        let repo = LocalRepository::new(dir.path()).unwrap();
        let files = repo.list("b", &exts(), &policy()).await.unwrap();
        assert_eq!(files, vec!["b/two.py"]);
    }

    #[tokio::test]
    async fn test_read_and_size() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "empty.py", "");
        write(dir.path(), "code.py", "x = 1\n");

        let repo = LocalRepository::new(dir.path()).unwrap();
        assert_eq!(repo.size("empty.py").await.unwrap(), 0);
        assert_eq!(repo.size("code.py").await.unwrap(), 6);
        assert_eq!(repo.read("code.py").await.unwrap(), "x = 1\n");
        assert!(repo.read("missing.py").await.is_err());
    }
}
