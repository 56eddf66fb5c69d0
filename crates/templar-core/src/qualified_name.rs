use std::fmt;

use crate::TypeHash;

/// Fully qualified name of a declaration: the enclosing scope path
/// (namespaces and classes, outermost first) plus the simple name.
///
/// # Examples
///
/// ```
/// use templar_core::QualifiedName;
///
/// let callme = QualifiedName::new("callme", vec!["TemplateHiding".into(), "Derived".into()]);
/// assert_eq!(callme.to_string(), "TemplateHiding::Derived::callme");
/// assert_eq!(QualifiedName::from_qualified_string("::std::vector"), QualifiedName::new("vector", vec!["std".into()]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QualifiedName {
    /// Simple name (e.g. "vector", "get_size")
    pub name: String,
    /// Enclosing scope path, empty for the global namespace
    pub scope: Vec<String>,
}

impl QualifiedName {
    pub fn new(name: impl Into<String>, scope: Vec<String>) -> Self {
        Self { name: name.into(), scope }
    }

    /// A name in the global namespace.
    pub fn global(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// Split `"a::b::c"` on top-level `::`. Separators nested inside
    /// template argument lists (`"A<std::string>::f"`) are not split points,
    /// and a leading `::` is normalized away.
    pub fn from_qualified_string(s: &str) -> Self {
        let mut parts = split_scope(s);
        match parts.pop() {
            Some(name) => Self::new(name, parts),
            None => Self::global(""),
        }
    }

    pub fn is_global(&self) -> bool {
        self.scope.is_empty()
    }

    pub fn simple_name(&self) -> &str {
        &self.name
    }

    pub fn scope_path(&self) -> &[String] {
        &self.scope
    }

    /// Identity hash of this name.
    pub fn to_type_hash(&self) -> TypeHash {
        TypeHash::from_name(&self.to_string())
    }

    /// A name nested one level inside this one.
    ///
    /// `Game::Core` + `Player` = `Game::Core::Player`
    pub fn child(&self, name: impl Into<String>) -> Self {
        Self::new(name, self.full_path())
    }

    /// Scope path plus the name itself.
    pub fn full_path(&self) -> Vec<String> {
        let mut path = self.scope.clone();
        path.push(self.name.clone());
        path
    }

    pub fn parent(&self) -> Option<Self> {
        let (name, rest) = self.scope.split_last()?;
        Some(Self::new(name.clone(), rest.to_vec()))
    }
}

/// Split a qualified spelling on `::` outside of angle brackets.
pub fn split_scope(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ':' if depth == 0 && chars.peek() == Some(&':') => {
                chars.next();
                let part = std::mem::take(&mut current);
                let part = part.trim();
                if !part.is_empty() {
                    parts.push(part.to_string());
                }
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    let last = current.trim();
    if !last.is_empty() {
        parts.push(last.to_string());
    }
    parts
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.scope {
            write!(f, "{segment}::")?;
        }
        f.write_str(&self.name)
    }
}

impl From<&str> for QualifiedName {
    fn from(s: &str) -> Self {
        Self::from_qualified_string(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_respects_template_arguments() {
        assert_eq!(split_scope("A<std::string>::f"), vec!["A<std::string>", "f"]);
        assert_eq!(split_scope("::std::vector"), vec!["std", "vector"]);
        assert_eq!(split_scope("plain"), vec!["plain"]);
        assert!(split_scope("").is_empty());
    }

    #[test]
    fn child_and_parent() {
        let ns = QualifiedName::global("TemplatedTypedefs");
        let class = ns.child("DerivedWithUsing");
        assert_eq!(class.to_string(), "TemplatedTypedefs::DerivedWithUsing");
        assert_eq!(class.parent(), Some(ns));
        assert_eq!(QualifiedName::global("x").parent(), None);
    }
}
