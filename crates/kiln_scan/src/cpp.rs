//! Built-in scanner for C, C++ and Objective-C++ sources.
//!
//! The scanner does not preprocess. It lexes the file once, dropping comments
//! and blanking string literals, and reads three kinds of facts off the token
//! stream: `#include`/`#import` directives, Qt meta-object macros, and C++20
//! module declarations.

use std::path::Path;

use kiln_cache::{ModuleFacts, ScanDependency};
use tracing::trace;

use crate::plugin::{ScanFlags, ScanSession, ScannerPlugin};

const OBJECT_MACROS: &[&str] = &["Q_OBJECT", "Q_GADGET", "Q_NAMESPACE"];
const PLUGIN_MACRO: &str = "Q_PLUGIN_METADATA";
const RAW_STRING_PREFIXES: &[&str] = &["R", "LR", "uR", "UR", "u8R"];

/// Scanner for the `hpp`, `cpp`, `c`, `objcpp` and `cpp.combine` tags.
#[derive(Clone, Copy, Debug, Default)]
pub struct CppScanner;

impl CppScanner {
    /// Creates the scanner.
    pub fn new() -> Self {
        Self
    }
}

impl ScannerPlugin for CppScanner {
    fn id(&self) -> &str {
        "cpp"
    }

    fn file_tags(&self) -> &[&str] {
        &["hpp", "cpp", "c", "objcpp", "cpp.combine"]
    }

    fn open(&self, path: &Path, tags: &[&str], flags: ScanFlags) -> Option<Box<dyn ScanSession>> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                trace!(path = %path.display(), error = %e, "cannot open file for scanning");
                return None;
            }
        };
        let facts = SourceFacts::extract(&String::from_utf8_lossy(&bytes));

        let mut additional_tags = Vec::new();
        if flags.contains(ScanFlags::FILE_TAGS) {
            if tags.contains(&"hpp") {
                if facts.has_plugin_macro {
                    additional_tags.push("moc_plugin_hpp".to_string());
                } else if facts.has_object_macro {
                    additional_tags.push("moc_hpp".to_string());
                }
            } else if tags.contains(&"cpp") && facts.has_object_macro {
                additional_tags.push("moc_cpp".to_string());
            }
        }

        let deps = if flags.contains(ScanFlags::DEPENDENCIES) {
            facts.deps
        } else {
            Vec::new()
        };

        Some(Box::new(CppSession {
            additional_tags,
            deps: deps.into_iter(),
            module: facts.module,
        }))
    }
}

struct CppSession {
    additional_tags: Vec<String>,
    deps: std::vec::IntoIter<ScanDependency>,
    module: ModuleFacts,
}

impl ScanSession for CppSession {
    fn additional_file_tags(&self) -> Vec<String> {
        self.additional_tags.clone()
    }

    fn next_dependency(&mut self) -> Option<ScanDependency> {
        self.deps.next()
    }

    fn module_information(&self) -> Option<ModuleFacts> {
        Some(self.module.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Punct(char),
    /// A preprocessor include, kept in the stream to preserve source order.
    Include(ScanDependency),
}

#[derive(Debug, Default)]
struct SourceFacts {
    deps: Vec<ScanDependency>,
    has_object_macro: bool,
    has_plugin_macro: bool,
    module: ModuleFacts,
}

impl SourceFacts {
    fn extract(source: &str) -> Self {
        let tokens = lex(source);
        let mut facts = Self::default();

        for token in &tokens {
            if let Token::Ident(name) = token {
                if OBJECT_MACROS.contains(&name.as_str()) {
                    facts.has_object_macro = true;
                } else if name == PLUGIN_MACRO {
                    facts.has_plugin_macro = true;
                }
            }
        }

        let mut stmt_start = true;
        for (i, token) in tokens.iter().enumerate() {
            if let Token::Include(dep) = token {
                facts.add_dependency(dep.clone());
                continue;
            }
            if stmt_start {
                facts.statement(&tokens, i);
            }
            stmt_start = matches!(token, Token::Punct(';' | '{' | '}'));
        }
        facts
    }

    fn add_dependency(&mut self, dep: ScanDependency) {
        if !dep.file_path.is_empty() && !self.deps.contains(&dep) {
            self.deps.push(dep);
        }
    }

    fn owning_module(&self) -> Option<String> {
        self.module
            .belongs_to_module
            .clone()
            .or_else(|| self.module.exports_module.clone())
    }

    /// Interprets a statement starting at `tokens[i]` as a module
    /// declaration or import, if it is one.
    fn statement(&mut self, tokens: &[Token], i: usize) {
        let exported = is_ident(tokens.get(i), "export");
        let j = if exported { i + 1 } else { i };

        if is_ident(tokens.get(j), "module") {
            // `module;` and `module :private;` yield no name.
            let Some((name, _)) = module_name(tokens, j + 1) else {
                return;
            };
            let primary = name.split(':').next().unwrap_or(&name).to_string();
            if exported {
                if name.contains(':') {
                    self.module.belongs_to_module = Some(primary);
                }
                self.module.exports_module = Some(name);
            } else {
                self.module.belongs_to_module = Some(primary);
            }
        } else if is_ident(tokens.get(j), "import") {
            match tokens.get(j + 1) {
                Some(Token::Str(path)) => self.add_dependency(ScanDependency::new(path.as_str(), true)),
                Some(Token::Punct('<')) => {
                    let mut path = String::new();
                    for token in &tokens[j + 2..] {
                        match token {
                            Token::Punct('>') => break,
                            Token::Punct(c) => path.push(*c),
                            Token::Ident(s) | Token::Str(s) => path.push_str(s),
                            Token::Include(_) => return,
                        }
                    }
                    self.add_dependency(ScanDependency::new(path, false));
                }
                Some(Token::Punct(':')) => {
                    if let Some((partition, _)) = module_name(tokens, j + 2) {
                        let qualified = match self.owning_module() {
                            Some(owner) => format!("{owner}:{partition}"),
                            None => partition,
                        };
                        push_unique(&mut self.module.imports_submodules, qualified);
                    }
                }
                _ => {
                    if let Some((name, _)) = module_name(tokens, j + 1) {
                        push_unique(&mut self.module.imports_modules, name);
                    }
                }
            }
        }
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

fn is_ident(token: Option<&Token>, word: &str) -> bool {
    matches!(token, Some(Token::Ident(s)) if s == word)
}

/// Parses `a.b.c` or `a.b:c.d` starting at `tokens[i]`.
fn module_name(tokens: &[Token], mut i: usize) -> Option<(String, usize)> {
    let Some(Token::Ident(first)) = tokens.get(i) else {
        return None;
    };
    let mut name = first.clone();
    i += 1;
    let mut seen_partition = false;
    loop {
        match (tokens.get(i), tokens.get(i + 1)) {
            (Some(Token::Punct('.')), Some(Token::Ident(part))) => {
                name.push('.');
                name.push_str(part);
            }
            (Some(Token::Punct(':')), Some(Token::Ident(part))) if !seen_partition => {
                seen_partition = true;
                name.push(':');
                name.push_str(part);
            }
            _ => break,
        }
        i += 2;
    }
    Some((name, i))
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn lex(source: &str) -> Vec<Token> {
    let chars: Vec<char> = source.chars().collect();
    let len = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line_start = true;

    while i < len {
        let c = chars[i];
        match c {
            '\n' => {
                line_start = true;
                i += 1;
            }
            c if c.is_whitespace() => i += 1,
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < len && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < len && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i = (i + 2).min(len);
            }
            '#' if line_start => {
                let end = directive_end(&chars, i);
                let line: String = chars[i + 1..end].iter().collect();
                if let Some(dep) = parse_directive(&line) {
                    tokens.push(Token::Include(dep));
                }
                i = end;
            }
            '"' => {
                let (content, next) = read_string(&chars, i + 1);
                tokens.push(Token::Str(content));
                i = next;
                line_start = false;
            }
            '\'' => {
                let (_, next) = read_quoted(&chars, i + 1, '\'');
                i = next;
                line_start = false;
            }
            c if c.is_ascii_digit() => {
                while i < len && (is_ident_continue(chars[i]) || chars[i] == '.' || chars[i] == '\'') {
                    i += 1;
                }
                line_start = false;
            }
            c if is_ident_start(c) => {
                let start = i;
                while i < len && is_ident_continue(chars[i]) {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                if chars.get(i) == Some(&'"') && RAW_STRING_PREFIXES.contains(&ident.as_str()) {
                    let (content, next) = read_raw_string(&chars, i + 1);
                    tokens.push(Token::Str(content));
                    i = next;
                } else {
                    tokens.push(Token::Ident(ident));
                }
                line_start = false;
            }
            c => {
                tokens.push(Token::Punct(c));
                i += 1;
                line_start = false;
            }
        }
    }
    tokens
}

/// Index of the newline ending the directive at `start`, honouring
/// backslash continuations.
fn directive_end(chars: &[char], start: usize) -> usize {
    let mut i = start;
    while i < chars.len() {
        if chars[i] == '\n' && (i == 0 || chars[i - 1] != '\\') {
            return i;
        }
        i += 1;
    }
    chars.len()
}

fn parse_directive(line: &str) -> Option<ScanDependency> {
    let rest = line.trim_start();
    let rest = rest
        .strip_prefix("include")
        .or_else(|| rest.strip_prefix("import"))?
        .trim_start();
    let (close, is_local) = match rest.chars().next()? {
        '"' => ('"', true),
        '<' => ('>', false),
        _ => return None,
    };
    let body = &rest[1..];
    let end = body.find(close)?;
    let path = &body[..end];
    if path.is_empty() {
        return None;
    }
    Some(ScanDependency::new(path, is_local))
}

fn read_string(chars: &[char], start: usize) -> (String, usize) {
    read_quoted(chars, start, '"')
}

/// Reads a quoted literal body starting after the opening quote. Returns the
/// content and the index after the closing quote. Stops at end of line for
/// unterminated literals.
fn read_quoted(chars: &[char], start: usize, quote: char) -> (String, usize) {
    let mut content = String::new();
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                if let Some(next) = chars.get(i + 1) {
                    content.push('\\');
                    content.push(*next);
                }
                i += 2;
            }
            '\n' => return (content, i),
            c if c == quote => return (content, i + 1),
            c => {
                content.push(c);
                i += 1;
            }
        }
    }
    (content, chars.len())
}

/// Reads `delim( ... )delim"` starting after the opening quote.
fn read_raw_string(chars: &[char], start: usize) -> (String, usize) {
    let mut i = start;
    let mut delimiter = String::new();
    while i < chars.len() && chars[i] != '(' {
        delimiter.push(chars[i]);
        i += 1;
    }
    i += 1;
    let terminator: Vec<char> = std::iter::once(')')
        .chain(delimiter.chars())
        .chain(std::iter::once('"'))
        .collect();
    let body_start = i.min(chars.len());
    while i < chars.len() {
        if chars[i..].starts_with(&terminator) {
            let content = chars[body_start..i].iter().collect();
            return (content, i + terminator.len());
        }
        i += 1;
    }
    (chars[body_start..].iter().collect(), chars.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep_paths(facts: &SourceFacts) -> Vec<(&str, bool)> {
        facts
            .deps
            .iter()
            .map(|d| (d.file_path.as_str(), d.is_local))
            .collect()
    }

    #[test]
    fn includes_in_order_with_locality() {
        let facts = SourceFacts::extract(
            "#include <QObject>\n#include \"widget.h\"\n  #  import \"legacy.h\"\n#include \"moc_widget.cpp\"\n",
        );
        assert_eq!(
            dep_paths(&facts),
            vec![
                ("QObject", false),
                ("widget.h", true),
                ("legacy.h", true),
                ("moc_widget.cpp", true)
            ]
        );
    }

    #[test]
    fn includes_in_comments_are_ignored() {
        let facts = SourceFacts::extract("// #include \"a.h\"\n/* #include \"b.h\" */\n#include \"c.h\"\n");
        assert_eq!(dep_paths(&facts), vec![("c.h", true)]);
    }

    #[test]
    fn duplicate_includes_are_reported_once() {
        let facts = SourceFacts::extract("#include \"a.h\"\n#include \"a.h\"\n");
        assert_eq!(facts.deps.len(), 1);
    }

    #[test]
    fn object_macro_detection() {
        let facts = SourceFacts::extract("class W : public QObject {\n    Q_OBJECT\npublic:\n};\n");
        assert!(facts.has_object_macro);
        assert!(!facts.has_plugin_macro);
    }

    #[test]
    fn macros_in_comments_and_strings_do_not_count() {
        let facts = SourceFacts::extract(
            "// Q_OBJECT\n/* Q_GADGET */\nconst char *s = \"Q_OBJECT\";\nconst char *r = R\"x(Q_NAMESPACE)x\";\n",
        );
        assert!(!facts.has_object_macro);
    }

    #[test]
    fn macro_inside_define_does_not_count() {
        let facts = SourceFacts::extract("#define DECLARE Q_OBJECT\nclass A {};\n");
        assert!(!facts.has_object_macro);
    }

    #[test]
    fn plugin_macro_detection() {
        let facts = SourceFacts::extract(
            "class P : public QObject {\n  Q_OBJECT\n  Q_PLUGIN_METADATA(IID \"org.kiln.Plugin\" FILE \"p.json\")\n};\n",
        );
        assert!(facts.has_object_macro);
        assert!(facts.has_plugin_macro);
    }

    #[test]
    fn primary_interface_unit() {
        let facts = SourceFacts::extract(
            "module;\n#include <cstdio>\nexport module app.core;\nimport std;\nexport import app.util;\nimport :detail;\n",
        );
        assert_eq!(facts.module.exports_module.as_deref(), Some("app.core"));
        assert_eq!(facts.module.belongs_to_module, None);
        assert_eq!(facts.module.imports_modules, vec!["std", "app.util"]);
        assert_eq!(facts.module.imports_submodules, vec!["app.core:detail"]);
        assert_eq!(dep_paths(&facts), vec![("cstdio", false)]);
    }

    #[test]
    fn partition_unit_belongs_to_primary() {
        let facts = SourceFacts::extract("export module app:detail;\nimport :base;\n");
        assert_eq!(facts.module.exports_module.as_deref(), Some("app:detail"));
        assert_eq!(facts.module.belongs_to_module.as_deref(), Some("app"));
        assert_eq!(facts.module.imports_submodules, vec!["app:base"]);
    }

    #[test]
    fn implementation_unit() {
        let facts = SourceFacts::extract("module app;\nimport <vector>;\nimport \"config.h\";\nint f() { return 1; }\n");
        assert_eq!(facts.module.belongs_to_module.as_deref(), Some("app"));
        assert_eq!(facts.module.exports_module, None);
        assert_eq!(dep_paths(&facts), vec![("vector", false), ("config.h", true)]);
    }

    #[test]
    fn private_fragment_is_ignored() {
        let facts = SourceFacts::extract("export module m;\nmodule :private;\n");
        assert_eq!(facts.module.exports_module.as_deref(), Some("m"));
        assert_eq!(facts.module.belongs_to_module, None);
    }

    #[test]
    fn import_as_member_is_not_a_module_import() {
        let facts = SourceFacts::extract("void f() { loader.import(x); }\n");
        assert!(facts.module.is_empty());
    }

    #[test]
    fn session_tags_for_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("widget.hpp");
        std::fs::write(&path, "#include \"moc_other.cpp\"\nclass W { Q_OBJECT };\n").unwrap();

        let scanner = CppScanner::new();
        let session = scanner.open(&path, &["hpp"], ScanFlags::FILE_TAGS).unwrap();
        assert_eq!(session.additional_file_tags(), vec!["moc_hpp"]);

        let mut session = scanner.open(&path, &[], ScanFlags::DEPENDENCIES).unwrap();
        assert!(session.additional_file_tags().is_empty());
        assert_eq!(
            session.next_dependency(),
            Some(ScanDependency::new("moc_other.cpp", true))
        );
        assert_eq!(session.next_dependency(), None);
    }

    #[test]
    fn session_tags_for_source_and_plugin() {
        let dir = tempfile::tempdir().unwrap();
        let unit = dir.path().join("main.cpp");
        std::fs::write(&unit, "struct Local { Q_OBJECT };\n#include \"main.moc\"\n").unwrap();
        let plugin = dir.path().join("plugin.hpp");
        std::fs::write(&plugin, "class P { Q_OBJECT Q_PLUGIN_METADATA(IID \"x\") };\n").unwrap();

        let scanner = CppScanner::new();
        let tags = scanner
            .open(&unit, &["cpp"], ScanFlags::FILE_TAGS)
            .unwrap()
            .additional_file_tags();
        assert_eq!(tags, vec!["moc_cpp"]);
        let tags = scanner
            .open(&plugin, &["hpp"], ScanFlags::FILE_TAGS)
            .unwrap()
            .additional_file_tags();
        assert_eq!(tags, vec!["moc_plugin_hpp"]);
    }

    #[test]
    fn unreadable_file_has_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.hpp");
        assert!(CppScanner::new()
            .open(&missing, &["hpp"], ScanFlags::FILE_TAGS)
            .is_none());
    }
}
