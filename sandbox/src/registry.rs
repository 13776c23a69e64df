//! Import registry: maps `(namespace, name)` to host function bindings.
//!
//! Bindings are registered before a module is linked. Linking resolves every
//! import the module declares; a missing or mistyped import is a hard
//! [`LinkError`], never a silently stubbed no-op.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bridge_hostapi::{HostError, InvocationContext};

use crate::memory::MemoryView;

/// Host function body.
///
/// Receives the current invocation context, a view of the calling
/// instance's memory, and the raw i32 arguments. Returns the i32 result,
/// if the signature has one.
pub type HostFn = Arc<
    dyn Fn(&mut InvocationContext, &mut MemoryView<'_>, &[i32]) -> Result<Option<i32>, HostError>
        + Send
        + Sync,
>;

/// Function type in the bridge ABI. Every param and result is an i32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    pub params: usize,
    pub results: usize,
}

impl Signature {
    pub const fn new(params: usize, results: usize) -> Self {
        Self { params, results }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |n: usize| vec!["i32"; n].join(", ");
        write!(f, "({}) -> ({})", list(self.params), list(self.results))
    }
}

/// Type of an import or export as declared by a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredType {
    /// A function whose params and results are all i32.
    Function(Signature),
    /// Anything the bridge ABI cannot express; the string describes it.
    Unsupported(String),
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(sig) => fmt::Display::fmt(sig, f),
            Self::Unsupported(desc) => f.write_str(desc),
        }
    }
}

/// One import declared by a compiled module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    pub namespace: String,
    pub name: String,
    pub ty: DeclaredType,
}

/// A registered host function.
#[derive(Clone)]
pub struct ImportBinding {
    pub namespace: String,
    pub name: String,
    pub signature: Signature,
    handler: HostFn,
}

impl ImportBinding {
    /// Run the handler for one guest call.
    pub fn call(
        &self,
        context: &mut InvocationContext,
        memory: &mut MemoryView<'_>,
        args: &[i32],
    ) -> Result<Option<i32>, HostError> {
        (self.handler)(context, memory, args)
    }
}

impl fmt::Debug for ImportBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportBinding")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Linking failure. Fatal: the module is never instantiated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("unresolved import {namespace}::{name}")]
    Unresolved { namespace: String, name: String },

    #[error("import {namespace}::{name} declared as {declared}, host provides {provided}")]
    SignatureMismatch {
        namespace: String,
        name: String,
        declared: String,
        provided: Signature,
    },

    /// The import is not an all-i32 function (a memory, global, table, or
    /// a function over other value types).
    #[error("import {namespace}::{name} has unsupported type {declared}")]
    NotAFunction {
        namespace: String,
        name: String,
        declared: String,
    },
}

/// Table of host functions available to guest modules.
#[derive(Clone, Default)]
pub struct ImportRegistry {
    bindings: HashMap<(String, String), ImportBinding>,
}

impl ImportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the four `env` bridge imports.
    pub fn with_bridge() -> Self {
        let mut registry = Self::new();
        crate::bridge::register_bridge(&mut registry);
        registry
    }

    /// Register a host function. A later registration of the same
    /// `(namespace, name)` replaces the earlier one.
    pub fn register<F>(
        &mut self,
        namespace: &str,
        name: &str,
        signature: Signature,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(&mut InvocationContext, &mut MemoryView<'_>, &[i32]) -> Result<Option<i32>, HostError>
            + Send
            + Sync
            + 'static,
    {
        let binding = ImportBinding {
            namespace: namespace.to_string(),
            name: name.to_string(),
            signature,
            handler: Arc::new(handler),
        };
        self.bindings
            .insert((namespace.to_string(), name.to_string()), binding);
        self
    }

    /// Look up one binding.
    pub fn resolve(&self, namespace: &str, name: &str) -> Result<&ImportBinding, LinkError> {
        self.bindings
            .get(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| LinkError::Unresolved {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    /// Resolve every declared import, in declaration order.
    ///
    /// Fails on the first import that is missing or whose declared type
    /// differs from the registered signature.
    pub fn link(&self, imports: &[ImportDecl]) -> Result<Vec<ImportBinding>, LinkError> {
        imports
            .iter()
            .map(|decl| {
                let binding = self.resolve(&decl.namespace, &decl.name)?;
                match &decl.ty {
                    DeclaredType::Function(sig) if *sig == binding.signature => Ok(binding.clone()),
                    DeclaredType::Function(sig) => Err(LinkError::SignatureMismatch {
                        namespace: decl.namespace.clone(),
                        name: decl.name.clone(),
                        declared: sig.to_string(),
                        provided: binding.signature,
                    }),
                    DeclaredType::Unsupported(desc) => Err(LinkError::NotAFunction {
                        namespace: decl.namespace.clone(),
                        name: decl.name.clone(),
                        declared: desc.clone(),
                    }),
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl fmt::Debug for ImportRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self
            .bindings
            .keys()
            .map(|(ns, name)| format!("{}::{}", ns, name))
            .collect();
        keys.sort();
        f.debug_struct("ImportRegistry")
            .field("bindings", &keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_hostapi::{LogLimits, SerializedReason};

    fn decl(namespace: &str, name: &str, ty: DeclaredType) -> ImportDecl {
        ImportDecl {
            namespace: namespace.into(),
            name: name.into(),
            ty,
        }
    }

    fn constant(value: i32) -> impl Fn(&mut InvocationContext, &mut MemoryView<'_>, &[i32]) -> Result<Option<i32>, HostError>
           + Send
           + Sync
           + 'static {
        move |_, _, _| Ok(Some(value))
    }

    #[test]
    fn test_resolve_missing_is_link_error() {
        let registry = ImportRegistry::new();
        let err = registry.resolve("env", "_reason").unwrap_err();
        assert_eq!(
            err,
            LinkError::Unresolved {
                namespace: "env".into(),
                name: "_reason".into()
            }
        );
    }

    #[test]
    fn test_link_reports_first_missing_import() {
        let mut registry = ImportRegistry::new();
        registry.register("env", "a", Signature::new(0, 1), constant(1));
        let imports = [
            decl("env", "a", DeclaredType::Function(Signature::new(0, 1))),
            decl("env", "b", DeclaredType::Function(Signature::new(0, 0))),
        ];
        let err = registry.link(&imports).unwrap_err();
        assert!(matches!(err, LinkError::Unresolved { name, .. } if name == "b"));
    }

    #[test]
    fn test_link_rejects_signature_mismatch() {
        let mut registry = ImportRegistry::new();
        registry.register("env", "a", Signature::new(1, 0), constant(0));
        let imports = [decl("env", "a", DeclaredType::Function(Signature::new(2, 0)))];
        let err = registry.link(&imports).unwrap_err();
        assert!(matches!(err, LinkError::SignatureMismatch { .. }));
        assert!(err.to_string().contains("(i32, i32) -> ()"));
    }

    #[test]
    fn test_link_rejects_non_function_import() {
        let mut registry = ImportRegistry::new();
        registry.register("env", "g", Signature::new(0, 1), constant(0));
        let imports = [decl("env", "g", DeclaredType::Unsupported("global i32".into()))];
        assert!(matches!(
            registry.link(&imports),
            Err(LinkError::NotAFunction { .. })
        ));
    }

    #[test]
    fn test_link_preserves_declaration_order() {
        let mut registry = ImportRegistry::new();
        registry
            .register("env", "x", Signature::new(0, 1), constant(1))
            .register("env", "y", Signature::new(0, 1), constant(2));
        let imports = [
            decl("env", "y", DeclaredType::Function(Signature::new(0, 1))),
            decl("env", "x", DeclaredType::Function(Signature::new(0, 1))),
        ];
        let linked = registry.link(&imports).unwrap();
        let names: Vec<_> = linked.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["y", "x"]);
    }

    #[test]
    fn test_register_replaces_and_call_dispatches() {
        let mut registry = ImportRegistry::new();
        registry.register("env", "x", Signature::new(0, 1), constant(1));
        registry.register("env", "x", Signature::new(0, 1), constant(2));
        assert_eq!(registry.len(), 1);

        let mut ctx = InvocationContext::new(SerializedReason::from(vec![]), LogLimits::default());
        let mut mem = vec![0u8; 4];
        let mut view = MemoryView::new(&mut mem);
        let result = registry
            .resolve("env", "x")
            .unwrap()
            .call(&mut ctx, &mut view, &[])
            .unwrap();
        assert_eq!(result, Some(2));
    }

    #[test]
    fn test_signature_display() {
        assert_eq!(Signature::new(0, 0).to_string(), "() -> ()");
        assert_eq!(Signature::new(2, 1).to_string(), "(i32, i32) -> (i32)");
    }
}
