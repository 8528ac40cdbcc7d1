//! Immutable environments for identifier resolution during typechecking and
//! evaluation.
//!
//! An environment is a persistent linked list of bindings: prepending is
//! O(1) and never disturbs earlier references, which is what lets the
//! checker thread scopes left-to-right while section bodies extend them
//! privately. Newer bindings shadow older ones of the same name. Namespaced
//! names are dot-separated (`ns.task_out`).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// One binding of a name to a value, with optional provenance info.
///
/// `T` is a [`crate::types::Type`] in type environments and a
/// [`crate::value::Value`] in evaluation contexts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding<T> {
    name: String,
    value: T,
    info: Option<String>,
}

impl<T> Binding<T> {
    pub fn new(name: String, value: T, info: Option<String>) -> Self {
        Self { name, value, info }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    /// Provenance of the binding ("input", "scatter", a call name, ...).
    pub fn info(&self) -> Option<&String> {
        self.info.as_ref()
    }
}

impl<T: fmt::Display> fmt::Display for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.value)
    }
}

/// Immutable environment: a linked list of bindings with shadowing.
#[derive(Debug, Clone)]
pub struct Bindings<T>
where
    T: Clone,
{
    binding: Option<Binding<T>>,
    next: Option<Box<Bindings<T>>>,
}

impl<T: Clone> Default for Bindings<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Bindings<T>
where
    T: Clone,
{
    pub fn new() -> Self {
        Self {
            binding: None,
            next: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Number of unique (unshadowed) bindings.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// A new environment with `name` bound; any previous binding of the same
    /// name is shadowed.
    pub fn bind(&self, name: String, value: T, info: Option<String>) -> Self {
        assert!(!name.is_empty() && !name.starts_with('.') && !name.ends_with('.'));
        Self {
            binding: Some(Binding::new(name, value, info)),
            next: Some(Box::new(self.clone())),
        }
    }

    pub fn resolve_binding(&self, name: &str) -> Option<&Binding<T>> {
        self.iter().find(|b| b.name() == name)
    }

    pub fn resolve(&self, name: &str) -> Option<&T> {
        self.resolve_binding(name).map(|b| b.value())
    }

    pub fn has_binding(&self, name: &str) -> bool {
        self.resolve_binding(name).is_some()
    }

    /// Transform each binding, dropping those mapped to `None`. Binding
    /// order is preserved.
    pub fn map<U, F>(&self, f: F) -> Bindings<U>
    where
        U: Clone,
        F: Fn(&Binding<T>) -> Option<Binding<U>>,
    {
        let mut mapped = Vec::new();
        for binding in self.iter() {
            if let Some(out) = f(binding) {
                mapped.push(out);
            }
        }
        let mut result = Bindings::new();
        for binding in mapped.into_iter().rev() {
            let Binding { name, value, info } = binding;
            result = result.bind(name, value, info);
        }
        result
    }

    pub fn filter<F>(&self, pred: F) -> Self
    where
        F: Fn(&Binding<T>) -> bool,
    {
        self.map(|b| if pred(b) { Some(b.clone()) } else { None })
    }

    /// Remove bindings whose names are bound in `other`.
    pub fn subtract<U: Clone>(&self, other: &Bindings<U>) -> Self {
        self.filter(|b| !other.has_binding(b.name()))
    }

    /// Dot-separated namespace prefixes of all binding names, each ending
    /// with a dot.
    pub fn namespaces(&self) -> HashSet<String> {
        let mut namespaces = HashSet::new();
        for binding in self.iter() {
            let parts: Vec<&str> = binding.name().split('.').collect();
            for i in 0..parts.len().saturating_sub(1) {
                namespaces.insert(parts[..=i].join(".") + ".");
            }
        }
        namespaces
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        let ns = if namespace.ends_with('.') {
            namespace.to_string()
        } else {
            format!("{}.", namespace)
        };
        self.namespaces().contains(&ns)
    }

    /// Restrict to one namespace, stripping its prefix from binding names.
    pub fn enter_namespace(&self, namespace: &str) -> Self {
        let ns = if namespace.ends_with('.') {
            namespace.to_string()
        } else {
            format!("{}.", namespace)
        };
        self.map(|b| {
            b.name().strip_prefix(&ns).map(|stripped| {
                Binding::new(stripped.to_string(), b.value().clone(), b.info().cloned())
            })
        })
    }

    /// Prefix every binding name with a namespace.
    pub fn wrap_namespace(&self, namespace: &str) -> Self {
        let ns = if namespace.ends_with('.') {
            namespace.to_string()
        } else {
            format!("{}.", namespace)
        };
        self.map(|b| {
            Some(Binding::new(
                format!("{}{}", ns, b.name()),
                b.value().clone(),
                b.info().cloned(),
            ))
        })
    }

    /// The bindings added on top of `base`, newest first.
    ///
    /// `base` must be an ancestor of `self` (a section typechecker clones
    /// the outer environment, extends the clone, then collects what the body
    /// introduced). Shadowed and pre-existing names are excluded.
    pub fn bindings_since(&self, base: &Bindings<T>) -> Vec<(String, T)> {
        let mut added = Vec::new();
        for binding in self.iter() {
            if base.has_binding(binding.name()) {
                continue;
            }
            added.push((binding.name().to_string(), binding.value().clone()));
        }
        added
    }

    /// Iterate unique bindings, newest first; shadowed entries are skipped.
    pub fn iter(&self) -> BindingIterator<'_, T> {
        BindingIterator {
            current: Some(self),
            seen: HashSet::new(),
        }
    }
}

pub struct BindingIterator<'a, T: Clone> {
    current: Option<&'a Bindings<T>>,
    seen: HashSet<String>,
}

impl<'a, T: Clone> Iterator for BindingIterator<'a, T> {
    type Item = &'a Binding<T>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(env) = self.current {
            self.current = env.next.as_deref();
            if let Some(ref binding) = env.binding {
                if self.seen.insert(binding.name().to_string()) {
                    return Some(binding);
                }
            }
        }
        None
    }
}
