//! Import resolution against the set of indexed files

use std::collections::HashSet;

const SCRIPT_EXTENSIONS: [&str; 5] = [".js", ".ts", ".jsx", ".tsx", ".py"];
const INDEX_FILES: [&str; 6] = [
    "index.js",
    "index.ts",
    "index.jsx",
    "index.tsx",
    "__init__.py",
    "mod.rs",
];

/// Resolves raw import strings to repository-relative paths. Only paths
/// present in the indexed file set are returned; everything else, external
/// packages included, is dropped.
pub struct ImportResolver<'a> {
    known: &'a HashSet<String>,
}

impl<'a> ImportResolver<'a> {
    pub fn new(known: &'a HashSet<String>) -> Self {
        Self { known }
    }

    pub fn resolve(&self, importer: &str, target: &str) -> Option<String> {
        let target = target.trim();
        if target.is_empty() {
            return None;
        }
        let dir = parent_dir(importer);

        if target.starts_with("./") || target.starts_with("../") {
            let base = normalize(&join(dir, target))?;
            return self.with_conventions(&base, extension(importer));
        }

        match extension(importer) {
            Some("py") => return self.resolve_python(dir, target),
            Some("java") => return self.resolve_jvm(target, &["java", "kt"]),
            Some("kt") => return self.resolve_jvm(target, &["kt", "java"]),
            Some("go") => return self.resolve_go(dir, target),
            Some("rs") => return self.resolve_rust(importer, target),
            _ => {}
        }

        // Plain includes and requires that name a file near the importer or
        // at the repository root
        if extension(target).is_some() {
            let candidates = [normalize(&join(dir, target)), normalize(target)];
            return candidates
                .into_iter()
                .flatten()
                .find(|c| self.known.contains(c));
        }
        None
    }

    fn resolve_python(&self, dir: &str, target: &str) -> Option<String> {
        let dots = target.chars().take_while(|c| *c == '.').count();
        let rest = &target[dots..];
        if rest.is_empty() || !rest.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
            return None;
        }
        let module_path = rest.replace('.', "/");

        let base = if dots > 0 {
            let mut base = dir.to_string();
            for _ in 1..dots {
                base = parent_dir(&base).to_string();
                if base.is_empty() && dir.is_empty() {
                    return None;
                }
            }
            normalize(&join(&base, &module_path))?
        } else {
            module_path
        };

        [format!("{}.py", base), format!("{}/__init__.py", base)]
            .into_iter()
            .find(|c| self.known.contains(c))
    }

    /// `com.acme.Util` names `.../com/acme/Util.java` under any source root.
    /// Trailing segments are dropped so nested classes and static members
    /// land on their file. Wildcard imports name a package and are dropped.
    fn resolve_jvm(&self, target: &str, extensions: &[&str]) -> Option<String> {
        if target.ends_with(".*") {
            return None;
        }
        let segments: Vec<&str> = target.split('.').filter(|s| !s.is_empty()).collect();
        for len in (2..=segments.len()).rev() {
            let module = segments[..len].join("/");
            for ext in extensions {
                if let Some(found) = self.find_suffix(&format!("{}.{}", module, ext)) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// A Go import path names a package directory. The longest directory
    /// that ends the import path wins, and the first non-test file in it
    /// stands for the package.
    fn resolve_go(&self, importer_dir: &str, target: &str) -> Option<String> {
        let target = target.trim_matches('/');
        self.known
            .iter()
            .filter(|k| k.ends_with(".go") && !k.ends_with("_test.go"))
            .filter_map(|k| {
                let dir = parent_dir(k);
                let matches = !dir.is_empty()
                    && dir != importer_dir
                    && (target == dir || target.ends_with(&format!("/{}", dir)));
                matches.then_some((dir.len(), k))
            })
            .min_by(|(a_len, a), (b_len, b)| b_len.cmp(a_len).then_with(|| a.cmp(b)))
            .map(|(_, k)| k.clone())
    }

    /// `crate::`, `self::` and `super::` paths map to `a/b.rs` or
    /// `a/b/mod.rs` below the matching module directory. The longest
    /// prefix naming a file wins since the tail is usually an item.
    fn resolve_rust(&self, importer: &str, target: &str) -> Option<String> {
        let segments: Vec<&str> = target.split("::").filter(|s| !s.is_empty()).collect();
        let (base, rest) = match segments.first() {
            Some(&"crate") => (rust_crate_root(importer), &segments[1..]),
            Some(&"self") => (rust_module_dir(importer).to_string(), &segments[1..]),
            Some(&"super") => {
                let mut base = rust_module_dir(importer);
                let mut skipped = 0;
                while segments.get(skipped) == Some(&"super") {
                    base = parent_dir(base);
                    skipped += 1;
                }
                (base.to_string(), &segments[skipped..])
            }
            _ => return None,
        };

        for len in (1..=rest.len()).rev() {
            let path = join(&base, &rest[..len].join("/"));
            let candidates = [format!("{}.rs", path), format!("{}/mod.rs", path)];
            if let Some(found) = candidates.into_iter().find(|c| self.known.contains(c)) {
                return Some(found);
            }
        }
        None
    }

    fn find_suffix(&self, path: &str) -> Option<String> {
        let tail = format!("/{}", path);
        self.known
            .iter()
            .filter(|k| k.as_str() == path || k.ends_with(&tail))
            .min()
            .cloned()
    }

    /// Try the path as-is, then with extensions, then as a directory with an
    /// index file
    fn with_conventions(&self, base: &str, importer_extension: Option<&str>) -> Option<String> {
        if self.known.contains(base) {
            return Some(base.to_string());
        }

        let own = importer_extension.map(|e| format!(".{}", e));
        let extensions = own
            .iter()
            .map(String::as_str)
            .chain(SCRIPT_EXTENSIONS.iter().copied());
        for ext in extensions {
            let candidate = format!("{}{}", base, ext);
            if self.known.contains(&candidate) {
                return Some(candidate);
            }
        }

        INDEX_FILES
            .iter()
            .map(|index| join(base, index))
            .find(|c| self.known.contains(c))
    }
}

fn parent_dir(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

/// Directory holding the children of the module defined by a `.rs` file
fn rust_module_dir(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name {
        "mod.rs" | "lib.rs" | "main.rs" => parent_dir(path),
        _ => path.strip_suffix(".rs").unwrap_or(path),
    }
}

/// The innermost `src` directory above the file, else the file's directory
fn rust_crate_root(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').collect();
    let dirs = &parts[..parts.len().saturating_sub(1)];
    match dirs.iter().rposition(|p| *p == "src") {
        Some(i) => dirs[..=i].join("/"),
        None => dirs.join("/"),
    }
}

fn extension(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.rfind('.')
        .filter(|i| *i > 0 && *i + 1 < name.len())
        .map(|i| &name[i + 1..])
}

fn join(dir: &str, path: &str) -> String {
    if dir.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", dir, path)
    }
}

/// Collapse `.` and `..` segments. `None` when the path climbs above the
/// repository root.
fn normalize(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
