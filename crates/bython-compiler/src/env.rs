//! Lexical scopes for name resolution.
//!
//! Scopes live in a [`ScopeArena`] and refer to their enclosing scope by
//! [`ScopeId`]. The arena owns every binding; dropping it frees them all.

use std::collections::HashMap;

use bython_types::{Span, Type};

// ══════════════════════════════════════════════════════════════════════════════
// Bindings
// ══════════════════════════════════════════════════════════════════════════════

/// Handle to a scope inside a [`ScopeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

/// What kind of code context a scope represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Host builtins.
    Root,
    /// User functions of the compilation unit.
    Module,
    /// Parameters and top-level statements of one function.
    Function,
    /// Inside an `if`/`elif`/`else`/`while` body.
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Variable,
    Function,
    Builtin,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub ty: Type,
    /// Where the name was introduced. Builtins use `1:1`.
    pub span: Span,
    pub kind: BindingKind,
}

impl Binding {
    pub fn variable(ty: Type, span: Span) -> Self {
        Self {
            ty,
            span,
            kind: BindingKind::Variable,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.kind, BindingKind::Function | BindingKind::Builtin)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// ScopeArena
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
struct Scope {
    parent: Option<ScopeId>,
    kind: ScopeKind,
    bindings: HashMap<String, Binding>,
}

/// Arena of scopes. Index 0 is always the root scope.
#[derive(Debug)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

impl Default for ScopeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeArena {
    /// Create an arena holding only an empty root scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                parent: None,
                kind: ScopeKind::Root,
                bindings: HashMap::new(),
            }],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Open a new scope nested in `parent`.
    pub fn push(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent: Some(parent),
            kind,
            bindings: HashMap::new(),
        });
        id
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.get(scope).and_then(|s| s.parent)
    }

    pub fn kind(&self, scope: ScopeId) -> Option<ScopeKind> {
        self.get(scope).map(|s| s.kind)
    }

    /// Number of scopes ever opened, root included.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Bind `name` in `scope`.
    ///
    /// Fails with the span of the earlier binding if `name` already exists
    /// in that same scope. Shadowing an outer scope is fine.
    pub fn define(&mut self, scope: ScopeId, name: &str, binding: Binding) -> Result<(), Span> {
        let Some(target) = self.scopes.get_mut(scope.0 as usize) else {
            return Ok(());
        };
        if let Some(existing) = target.bindings.get(name) {
            return Err(existing.span);
        }
        target.bindings.insert(name.to_string(), binding);
        Ok(())
    }

    /// Look `name` up from `scope` outward.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Binding> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.get(id)?;
            if let Some(binding) = s.bindings.get(name) {
                return Some(binding);
            }
            current = s.parent;
        }
        None
    }

    /// Look `name` up in `scope` only.
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<&Binding> {
        self.get(scope)?.bindings.get(name)
    }

    fn get(&self, scope: ScopeId) -> Option<&Scope> {
        self.scopes.get(scope.0 as usize)
    }
}
