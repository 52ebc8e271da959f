//! Language detection from file extensions

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Closed set of languages the parser distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Java,
    C,
    Cpp,
    Go,
    Rust,
    Ruby,
    Php,
    Swift,
    Kotlin,
    CSharp,
    Unknown,
}

impl Language {
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_lowercase().as_str() {
            "py" => Self::Python,
            "js" | "jsx" => Self::JavaScript,
            "ts" | "tsx" => Self::TypeScript,
            "java" => Self::Java,
            "c" | "h" => Self::C,
            "cpp" | "hpp" | "cc" | "cxx" => Self::Cpp,
            "go" => Self::Go,
            "rs" => Self::Rust,
            "rb" => Self::Ruby,
            "php" => Self::Php,
            "swift" => Self::Swift,
            "kt" => Self::Kotlin,
            "cs" => Self::CSharp,
            _ => Self::Unknown,
        }
    }

    pub fn from_path(path: &str) -> Self {
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Java => "java",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Go => "go",
            Self::Rust => "rust",
            Self::Ruby => "ruby",
            Self::Php => "php",
            Self::Swift => "swift",
            Self::Kotlin => "kotlin",
            Self::CSharp => "csharp",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Self::Unknown
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_mapping() {
        assert_eq!(Language::from_extension("py"), Language::Python);
        assert_eq!(Language::from_extension("jsx"), Language::JavaScript);
        assert_eq!(Language::from_extension("tsx"), Language::TypeScript);
        assert_eq!(Language::from_extension("h"), Language::C);
        assert_eq!(Language::from_extension("cxx"), Language::Cpp);
        assert_eq!(Language::from_extension("kt"), Language::Kotlin);
        assert_eq!(Language::from_extension("cs"), Language::CSharp);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(Language::from_extension("RS"), Language::Rust);
        assert_eq!(Language::from_extension("Py"), Language::Python);
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(Language::from_extension("xyz"), Language::Unknown);
        assert_eq!(Language::from_path("Makefile"), Language::Unknown);
        assert!(!Language::Unknown.is_known());
    }

    #[test]
    fn test_from_path() {
        assert_eq!(Language::from_path("src/app/main.go"), Language::Go);
        assert_eq!(Language::from_path("lib/thing.rb"), Language::Ruby);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&Language::CSharp).unwrap(),
            "\"csharp\""
        );
        assert_eq!(Language::Cpp.as_str(), "cpp");
    }
}
