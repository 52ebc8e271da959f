//! Declaration and import rules per language family

use super::language::Language;
use super::rules::{DeclRule, Emit, ImportRule, RuleSet, keyword_visibility};
use super::scan::Lexical;
use super::types::{SymbolKind, Visibility};
use crate::error::ParseError;

use Emit::*;
use SymbolKind::*;

pub(crate) fn javascript(language: Language) -> Result<RuleSet, ParseError> {
    let mut decls = vec![
        DeclRule::new(
            r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+(\w+)(?:\s*<[^>]*>)?(?:\s+extends\s+([\w.]+))?",
            Container(Class),
        )?
        .bases(2),
        DeclRule::new(
            r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(\w+)\s*[<(]",
            Callable,
        )?,
        DeclRule::new(
            r"^\s*(?:export\s+)?(?:const|let|var)\s+(\w+)\s*(?::\s*[^=]+)?=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*(?::\s*[^=]+)?=>|\w+\s*=>)",
            Callable,
        )?,
        DeclRule::new(
            r"^\s*(?:(?:public|private|protected|static|readonly|override)\s+)*#?(\w+)\s*(?::\s*[^=]+)?=\s*(?:async\s+)?(?:\([^)]*\)|\w+)\s*=>",
            Member(Method),
        )?,
        DeclRule::new(
            r"^\s*(?:(?:public|private|protected|static|async|abstract|override|get|set)\s+)*\*?#?(\w+)\s*(?:<[^>]*>)?\s*\([^)]*\)?\s*(?::\s*[^{;]+)?\{",
            Member(Method),
        )?,
        DeclRule::new(
            r"^\s*(?:(?:public|private|protected|static|readonly|declare)\s+)*#?(\w+)\s*[?!]?\s*(?::\s*[^=;]+)?\s*(?:=|;)",
            Member(Property),
        )?,
    ];

    if language == Language::TypeScript {
        decls.extend([
            DeclRule::new(
                r"^\s*(?:export\s+)?(?:declare\s+)?interface\s+(\w+)(?:\s*<[^>]*>)?(?:\s+extends\s+([\w.,\s<>]+?))?\s*\{?\s*$",
                Container(Interface),
            )?
            .bases(2),
            DeclRule::new(
                r"^\s*(?:export\s+)?(?:declare\s+)?(?:const\s+)?enum\s+(\w+)",
                Container(Enum),
            )?,
            DeclRule::new(
                r"^\s*(?:export\s+)?(?:declare\s+)?type\s+(\w+)\s*(?:<[^>]*>)?\s*=",
                Plain(Interface),
            )?,
        ]);
    }

    decls.push(DeclRule::new(
        r"^\s*(?:export\s+)?(?:const|let|var)\s+(\w+)",
        Binding,
    )?);

    Ok(RuleSet {
        language,
        lexical: Lexical::JS,
        decls,
        imports: vec![
            ImportRule::line(r#"(?:^|[\s}])from\s+['"]([^'"]+)['"]"#)?,
            ImportRule::line(r#"^\s*import\s+['"]([^'"]+)['"]"#)?,
            ImportRule::line(r#"\brequire\s*\(\s*['"]([^'"]+)['"]\s*\)"#)?,
            ImportRule::line(r#"\bimport\s*\(\s*['"]([^'"]+)['"]\s*\)"#)?,
        ],
        visibility: |line, name| {
            if name.starts_with('#') || line.contains(&format!("#{}", name)) {
                Some(Visibility::Private)
            } else {
                Visibility::from_keywords(line)
            }
        },
    })
}

pub(crate) fn java() -> Result<RuleSet, ParseError> {
    const MODS: &str = r"(?:(?:public|private|protected|static|final|abstract|sealed|non-sealed|strictfp)\s+)*";
    Ok(RuleSet {
        language: Language::Java,
        lexical: Lexical::C_LIKE,
        decls: vec![
            DeclRule::new(
                &format!(r"^\s*{MODS}class\s+(\w+)(?:<[^>]*>)?(?:\s+extends\s+([\w.]+))?"),
                Container(Class),
            )?
            .bases(2),
            DeclRule::new(
                &format!(r"^\s*{MODS}record\s+(\w+)"),
                Container(Class),
            )?,
            DeclRule::new(
                &format!(r"^\s*{MODS}@?interface\s+(\w+)(?:<[^>]*>)?(?:\s+extends\s+([\w.,\s]+?))?\s*\{{?\s*$"),
                Container(Interface),
            )?
            .bases(2),
            DeclRule::new(&format!(r"^\s*{MODS}enum\s+(\w+)"), Container(Enum))?,
            DeclRule::new(
                r"^\s*(?:(?:public|private|protected|static|final|abstract|synchronized|native|default)\s+)*(?:<[^>]+>\s+)?[\w.\[\]?]+(?:<[^()]*>)?(?:\[\])*\s+(\w+)\s*\(",
                Member(Method),
            )?,
            DeclRule::new(
                r"^\s*(?:public|private|protected)\s+(\w+)\s*\(",
                Member(Method),
            )?,
            DeclRule::new(
                r"^\s*(?:(?:public|private|protected|static|final|transient|volatile)\s+)*[\w.\[\]?]+(?:<[^()]*>)?\s+(\w+)\s*(?:=|;)",
                Member(Property),
            )?,
        ],
        imports: vec![ImportRule::line(r"^\s*import\s+(?:static\s+)?([\w.*]+)\s*;")?],
        visibility: keyword_visibility,
    })
}

pub(crate) fn c_family(language: Language) -> Result<RuleSet, ParseError> {
    let mut decls = Vec::new();
    if language == Language::Cpp {
        decls.push(DeclRule::new(r"^\s*namespace\s+([\w:]+)\s*\{?", Namespace)?);
    }
    decls.extend([
        DeclRule::new(
            r"^\s*(?:typedef\s+)?(?:template\s*<[^>]*>\s*)?class\s+(\w+)(?:\s+final)?(?:\s*:\s*((?:(?:public|private|protected|virtual)\s+)*[\w:<>, ]+))?[^;]*$",
            Container(Class),
        )?
        .bases(2),
        DeclRule::new(
            r"^\s*(?:typedef\s+)?struct\s+(\w+)(?:\s*:\s*((?:(?:public|private|protected)\s+)*[\w:<>, ]+))?[^;]*$",
            Container(Struct),
        )?
        .bases(2),
        DeclRule::new(r"^\s*(?:typedef\s+)?enum\s+(?:class\s+)?(\w+)", Container(Enum))?,
        DeclRule::new(r"^\s*#\s*define\s+(\w+)", Plain(Constant))?,
        DeclRule::new(
            r"^\s*(?:[\w:*&<>,~]+\s+)+[*&]*((?:\w+::)*~?\w+)\s*\([^;]*\)\s*(?:const\s*)?(?:noexcept\s*)?(?:override\s*)?(?:\{.*)?$",
            Callable,
        )?,
        DeclRule::new(
            r"^(?:(?:static|const|extern|constexpr|volatile)\s+)*(?:unsigned\s+|signed\s+)?(?:int|float|double|char|bool|long|short|size_t|auto|[A-Z]\w*)\s*\**\s*(\w+)\s*(?:\[[^\]]*\])?\s*(?:=|;)",
            TopLevelBinding,
        )?,
    ]);
    Ok(RuleSet {
        language,
        lexical: Lexical::C_LIKE,
        decls,
        imports: vec![ImportRule::line(r#"^\s*#\s*include\s*[<"]([^>"]+)[>"]"#)?],
        visibility: keyword_visibility,
    })
}

pub(crate) fn go() -> Result<RuleSet, ParseError> {
    Ok(RuleSet {
        language: Language::Go,
        lexical: Lexical::GO,
        decls: vec![
            DeclRule::new(
                r"^func\s+\(\s*\w*\s+\*?\s*(\w+)(?:\[[^\]]*\])?\s*\)\s*(\w+)\s*[\[(]",
                Plain(Method),
            )?
            .name_group(2)
            .scope(1),
            DeclRule::new(r"^func\s+(\w+)\s*[\[(]", Callable)?,
            DeclRule::new(r"^type\s+(\w+)(?:\[[^\]]*\])?\s+struct\b", Plain(Struct))?,
            DeclRule::new(r"^type\s+(\w+)(?:\[[^\]]*\])?\s+interface\b", Plain(Interface))?,
            DeclRule::new(r"^const\s*\(\s*$", Group(Constant))?.name_group(0),
            DeclRule::new(r"^var\s*\(\s*$", Group(Variable))?.name_group(0),
            DeclRule::new(r"^const\s+(\w+)", Plain(Constant))?,
            DeclRule::new(r"^var\s+(\w+)", Binding)?,
        ],
        imports: vec![
            ImportRule::line(r#"^import\s+(?:[\w.]+\s+)?"([^"]+)""#)?,
            ImportRule::group(
                r"^import\s*\(\s*$",
                r#"^\s*(?:[\w.]+\s+)?"([^"]+)""#,
                r"^\s*\)",
            )?,
        ],
        visibility: |_line, name| {
            name.chars().next().map(|c| {
                if c.is_uppercase() {
                    Visibility::Public
                } else {
                    Visibility::Private
                }
            })
        },
    })
}

pub(crate) fn rust() -> Result<RuleSet, ParseError> {
    const VIS: &str = r"(?:pub(?:\s*\([^)]*\))?\s+)?";
    Ok(RuleSet {
        language: Language::Rust,
        lexical: Lexical::C_LIKE,
        decls: vec![
            DeclRule::new(
                r"^\s*(?:unsafe\s+)?impl(?:\s*<[^{]*?>)?\s+(?:[\w:]+(?:<[^{]*?>)?\s+for\s+)?(?:[\w]+::)*(\w+)",
                ScopeOnly,
            )?,
            DeclRule::new(
                &format!(r"^\s*{VIS}(?:unsafe\s+)?trait\s+(\w+)(?:<[^>]*>)?(?:\s*:\s*([\w\s+:'<>]+?))?\s*(?:where\b.*)?\{{?\s*$"),
                Container(Trait),
            )?
            .bases(2),
            DeclRule::new(&format!(r"^\s*{VIS}mod\s+(\w+)\s*\{{"), Container(Module))?,
            DeclRule::new(&format!(r"^\s*{VIS}mod\s+(\w+)\s*;"), Plain(Module))?,
            DeclRule::new(
                &format!(r#"^\s*{VIS}(?:(?:const|async|unsafe|extern(?:\s+"[^"]*")?)\s+)*fn\s+(\w+)"#),
                Callable,
            )?,
            DeclRule::new(&format!(r"^\s*{VIS}struct\s+(\w+)"), Container(Struct))?,
            DeclRule::new(&format!(r"^\s*{VIS}enum\s+(\w+)"), Container(Enum))?,
            DeclRule::new(&format!(r"^\s*{VIS}union\s+(\w+)"), Container(Struct))?,
            DeclRule::new(
                &format!(r"^\s*{VIS}(?:const|static)\s+(?:mut\s+)?(\w+)\s*:"),
                Plain(Constant),
            )?,
        ],
        imports: vec![
            ImportRule::line_with(r"^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+([\w:]+)", |path| {
                path.trim_end_matches("::").to_string()
            })?,
            ImportRule::line_with(r"^\s*(?:pub(?:\([^)]*\))?\s+)?mod\s+(\w+)\s*;", |name| {
                format!("./{}", name)
            })?,
        ],
        visibility: |line, _name| {
            let decl = line.trim_start();
            if decl.starts_with("pub(") || decl.starts_with("pub (") {
                Some(Visibility::Internal)
            } else if decl.starts_with("pub ") {
                Some(Visibility::Public)
            } else {
                Some(Visibility::Private)
            }
        },
    })
}

pub(crate) fn php() -> Result<RuleSet, ParseError> {
    Ok(RuleSet {
        language: Language::Php,
        lexical: Lexical::PHP,
        decls: vec![
            DeclRule::new(r"^\s*namespace\s+([\w\\]+)\s*\{", Namespace)?,
            DeclRule::new(
                r"^\s*(?:(?:abstract|final|readonly)\s+)*class\s+(\w+)(?:\s+extends\s+\\?([\w\\]+))?",
                Container(Class),
            )?
            .bases(2),
            DeclRule::new(r"^\s*interface\s+(\w+)", Container(Interface))?,
            DeclRule::new(r"^\s*trait\s+(\w+)", Container(Trait))?,
            DeclRule::new(r"^\s*enum\s+(\w+)", Container(Enum))?,
            DeclRule::new(
                r"^\s*(?:(?:public|private|protected|static|abstract|final)\s+)*function\s+&?(\w+)\s*\(",
                Callable,
            )?,
            DeclRule::new(
                r"^\s*(?:(?:public|private|protected|final)\s+)*const\s+(?:\w+\s+)?(\w+)\s*=",
                Plain(Constant),
            )?,
            DeclRule::new(r#"\bdefine\s*\(\s*['"](\w+)['"]"#, Plain(Constant))?,
            DeclRule::new(
                r"^\s*(?:public|private|protected|var)\s+(?:static\s+|readonly\s+)*(?:\??[\w\\]+\s+)?\$(\w+)",
                Member(Property),
            )?,
        ],
        imports: vec![
            ImportRule::line(r"^use\s+\\?([\w\\]+)")?,
            ImportRule::line_with(
                r#"\b(?:require|include)(?:_once)?\s*\(?\s*__DIR__\s*\.\s*['"]([^'"]+)['"]"#,
                |path| format!("./{}", path.trim_start_matches('/')),
            )?,
            ImportRule::line(r#"\b(?:require|include)(?:_once)?\s*\(?\s*['"]([^'"]+)['"]"#)?,
        ],
        visibility: keyword_visibility,
    })
}

pub(crate) fn swift() -> Result<RuleSet, ParseError> {
    const MODS: &str = r"(?:(?:@\w+|public|private|fileprivate|internal|open|final|static|class|override|mutating|nonmutating|convenience|required|indirect)\s+)*";
    Ok(RuleSet {
        language: Language::Swift,
        lexical: Lexical::C_LIKE,
        decls: vec![
            DeclRule::new(
                &format!(r"^\s*{MODS}class\s+(\w+)(?:<[^>]*>)?(?:\s*:\s*([\w\s,.]+?))?\s*(?:where\b.*)?\{{?\s*$"),
                Container(Class),
            )?
            .bases(2),
            DeclRule::new(
                &format!(r"^\s*{MODS}actor\s+(\w+)"),
                Container(Class),
            )?,
            DeclRule::new(&format!(r"^\s*{MODS}struct\s+(\w+)"), Container(Struct))?,
            DeclRule::new(&format!(r"^\s*{MODS}protocol\s+(\w+)"), Container(Interface))?,
            DeclRule::new(&format!(r"^\s*{MODS}enum\s+(\w+)"), Container(Enum))?,
            DeclRule::new(&format!(r"^\s*{MODS}extension\s+([\w.]+)"), ScopeOnly)?,
            DeclRule::new(&format!(r"^\s*{MODS}func\s+(\w+)"), Callable)?,
            DeclRule::new(&format!(r"^\s*{MODS}(init)\s*[?!]?\s*\("), Member(Method))?,
            DeclRule::new(&format!(r"^\s*{MODS}(?:let|var)\s+(\w+)"), Binding)?,
        ],
        imports: vec![ImportRule::line(r"^\s*import\s+(?:(?:class|struct|enum|protocol|func)\s+)?([\w.]+)")?],
        visibility: keyword_visibility,
    })
}

pub(crate) fn kotlin() -> Result<RuleSet, ParseError> {
    const MODS: &str = r"(?:(?:public|private|protected|internal|open|final|abstract|sealed|data|inner|override|suspend|inline|operator|infix|tailrec|external|annotation|value)\s+)*";
    Ok(RuleSet {
        language: Language::Kotlin,
        lexical: Lexical::JS,
        decls: vec![
            DeclRule::new(&format!(r"^\s*{MODS}enum\s+class\s+(\w+)"), Container(Enum))?,
            DeclRule::new(
                &format!(r"^\s*{MODS}class\s+(\w+)(?:<[^>]*>)?(?:\s*(?:\([^)]*\))?\s*:\s*([\w\s,.()<>]+?))?\s*\{{?\s*$"),
                Container(Class),
            )?
            .bases(2),
            DeclRule::new(&format!(r"^\s*{MODS}(?:fun\s+)?interface\s+(\w+)"), Container(Interface))?,
            DeclRule::new(&format!(r"^\s*{MODS}(?:companion\s+)?object\s+(\w+)"), Container(Class))?,
            DeclRule::new(
                &format!(r"^\s*{MODS}fun\s+(?:<[^>]+>\s+)?(?:[\w.<>]+\.)?(\w+)\s*\("),
                Callable,
            )?,
            DeclRule::new(&format!(r"^\s*{MODS}const\s+val\s+(\w+)"), Plain(Constant))?,
            DeclRule::new(&format!(r"^\s*{MODS}(?:val|var)\s+(\w+)"), Binding)?,
        ],
        imports: vec![ImportRule::line(r"^\s*import\s+([\w.*]+)")?],
        visibility: keyword_visibility,
    })
}

pub(crate) fn csharp() -> Result<RuleSet, ParseError> {
    const MODS: &str = r"(?:(?:public|private|protected|internal|static|sealed|abstract|partial|readonly|unsafe|new|file)\s+)*";
    Ok(RuleSet {
        language: Language::CSharp,
        lexical: Lexical::C_LIKE,
        decls: vec![
            DeclRule::new(r"^\s*namespace\s+([\w.]+)", Namespace)?,
            DeclRule::new(
                &format!(r"^\s*{MODS}(?:class|record)\s+(\w+)(?:<[^>]*>)?(?:\s*:\s*([\w\s,.<>]+?))?\s*(?:where\b.*)?\{{?\s*$"),
                Container(Class),
            )?
            .bases(2),
            DeclRule::new(&format!(r"^\s*{MODS}(?:record\s+)?struct\s+(\w+)"), Container(Struct))?,
            DeclRule::new(&format!(r"^\s*{MODS}interface\s+(\w+)"), Container(Interface))?,
            DeclRule::new(&format!(r"^\s*{MODS}enum\s+(\w+)"), Container(Enum))?,
            DeclRule::new(
                r"^\s*(?:(?:public|private|protected|internal)\s+)?(?:const)\s+[\w<>\[\],.?]+\s+(\w+)\s*=",
                Plain(Constant),
            )?,
            DeclRule::new(
                r"^\s*(?:\[[^\]]*\]\s*)*(?:(?:public|private|protected|internal|static|virtual|override|abstract|async|sealed|extern|partial|new|unsafe)\s+)+[\w<>\[\],.?]+\s+(\w+)\s*\{\s*(?:get|set|init)",
                Member(Property),
            )?,
            DeclRule::new(
                r"^\s*(?:\[[^\]]*\]\s*)*(?:(?:public|private|protected|internal|static|virtual|override|abstract|async|sealed|extern|partial|new|unsafe)\s+)+(?:[\w<>\[\],.?]+\s+)?(\w+)\s*(?:<[^>]*>)?\s*\(",
                Member(Method),
            )?,
        ],
        imports: vec![ImportRule::line(r"^\s*using\s+(?:static\s+)?([\w.]+)\s*;")?],
        visibility: keyword_visibility,
    })
}

/// Fallback for unknown extensions: function-like declarations and
/// top-level assignments
pub(crate) fn generic() -> Result<RuleSet, ParseError> {
    Ok(RuleSet {
        language: Language::Unknown,
        lexical: Lexical::SCRIPT,
        decls: vec![
            DeclRule::new(r"^\s*(?:class|struct|interface)\s+(\w+)", Container(Class))?,
            DeclRule::new(
                r"^\s*(?:(?:export|public|private|static|async|local)\s+)*(?:def|function|func|fn|fun|sub|proc)\s+(\w+)",
                Callable,
            )?,
            DeclRule::new(
                r"^\s*(?:(?:export|const|let|var|val|local|readonly|declare)\s+)*([A-Za-z_]\w*)\s*:?=[^=]",
                Binding,
            )?,
        ],
        imports: vec![
            ImportRule::line(r#"^\s*(?:import|require|include|source|use)\s*\(?\s*['"]?([\w./@-]+)['"]?"#)?,
        ],
        visibility: keyword_visibility,
    })
}
