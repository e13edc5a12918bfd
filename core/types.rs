//! Polymorphic types (C1).
//!
//! A [`Type`] is one of a type variable, a data type applied to zero or
//! more argument types, or a right-associative composed (function) type.
//! Types are value types here rather than the teacher's garbage-collected
//! pointer tree (`type.h`'s `PType`): ownership of children is simply
//! structural sharing through `Box`, and "don't delete, call free_memory"
//! becomes "drop the value".

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};

use super::error::{ProverError, Result};

/// Process-unique counter for fresh type variables, mirroring
/// `type.cpp`'s static `nextvarindex`.
static NEXT_TYPEVAR: AtomicI64 = AtomicI64::new(0);

/// Allocates a fresh type-variable index.
pub fn fresh_typevar_index() -> i64 {
    NEXT_TYPEVAR.fetch_add(1, Ordering::Relaxed)
}

/// Resets the type-variable counter. Only valid between independent proof
/// attempts (see the concurrency model: at most one attempt is live).
pub fn reset_typevar_counter() {
    NEXT_TYPEVAR.store(0, Ordering::Relaxed);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    /// A type variable, identified by a process-unique integer.
    Var(i64),
    /// A named constructor applied to zero or more argument types.
    Data { constructor: String, args: Vec<Type> },
    /// A right-associative function type `domain -> codomain`.
    Composed { domain: Box<Type>, codomain: Box<Type> },
}

/// A substitution from type-variable indices to types, applied
/// destructively (conceptually) but expressed here as a pure function
/// since `Type` is a value type. Idempotent once saturated: applying a
/// fully-resolved substitution twice gives the same result.
#[derive(Debug, Clone, Default)]
pub struct TypeSubstitution {
    map: std::collections::HashMap<i64, Type>,
}

impl TypeSubstitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: i64) -> Option<&Type> {
        self.map.get(&index)
    }

    pub fn insert(&mut self, index: i64, ty: Type) {
        self.map.insert(index, ty);
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Type {
    pub fn data(constructor: impl Into<String>, args: Vec<Type>) -> Type {
        Type::Data { constructor: constructor.into(), args }
    }

    pub fn base(constructor: impl Into<String>) -> Type {
        Type::Data { constructor: constructor.into(), args: Vec::new() }
    }

    pub fn fresh_var() -> Type {
        Type::Var(fresh_typevar_index())
    }

    pub fn arrow(domain: Type, codomain: Type) -> Type {
        Type::Composed { domain: Box::new(domain), codomain: Box::new(codomain) }
    }

    /// Curries a list of argument types onto a result type: `arrow_many([a,
    /// b], c) = a -> b -> c`.
    pub fn arrow_many(args: Vec<Type>, result: Type) -> Type {
        args.into_iter().rev().fold(result, |acc, arg| Type::arrow(arg, acc))
    }

    pub fn query_data(&self) -> bool {
        matches!(self, Type::Data { .. })
    }

    pub fn query_composed(&self) -> bool {
        matches!(self, Type::Composed { .. })
    }

    pub fn query_typevar(&self) -> bool {
        matches!(self, Type::Var(_))
    }

    /// Splits a composed type into (argument types, base result type),
    /// following the right-associative arrow convention.
    pub fn split_arrows(&self) -> (Vec<&Type>, &Type) {
        let mut args = Vec::new();
        let mut cur = self;
        while let Type::Composed { domain, codomain } = cur {
            args.push(domain.as_ref());
            cur = codomain.as_ref();
        }
        (args, cur)
    }

    pub fn arity(&self) -> usize {
        self.split_arrows().0.len()
    }

    /// Structural equality, matching `Type::equals` in `type.cpp`.
    pub fn equals(&self, other: &Type) -> bool {
        self == other
    }

    /// Replaces every data type by the canonical base type `o`, preserving
    /// arrow structure (`type.cpp`'s `collapse`).
    pub fn collapse(&self) -> Type {
        match self {
            Type::Var(_) => Type::base("o"),
            Type::Data { .. } => Type::base("o"),
            Type::Composed { domain, codomain } => {
                Type::arrow(domain.collapse(), codomain.collapse())
            }
        }
    }

    /// Applies the given substitution, recursively.
    pub fn substitute(&self, theta: &TypeSubstitution) -> Type {
        match self {
            Type::Var(index) => match theta.get(*index) {
                Some(replacement) => replacement.clone(),
                None => self.clone(),
            },
            Type::Data { constructor, args } => Type::Data {
                constructor: constructor.clone(),
                args: args.iter().map(|a| a.substitute(theta)).collect(),
            },
            Type::Composed { domain, codomain } => Type::Composed {
                domain: Box::new(domain.substitute(theta)),
                codomain: Box::new(codomain.substitute(theta)),
            },
        }
    }

    /// Extends `theta` so that `self.substitute(theta) == target`. Fails on
    /// constructor mismatch, arity mismatch, or a typevar already bound to
    /// something incompatible.
    pub fn instantiate(&self, target: &Type, theta: &mut TypeSubstitution) -> bool {
        match self {
            Type::Var(index) => match theta.get(*index).cloned() {
                None => {
                    theta.insert(*index, target.clone());
                    true
                }
                Some(bound) => bound.equals(target),
            },
            Type::Data { constructor, args } => {
                let Type::Data { constructor: oc, args: oargs } = target else { return false };
                if oc != constructor || oargs.len() != args.len() {
                    return false;
                }
                args.iter().zip(oargs.iter()).all(|(a, b)| a.instantiate(b, theta))
            }
            Type::Composed { domain, codomain } => {
                let Type::Composed { domain: od, codomain: oc } = target else { return false };
                domain.instantiate(od, theta) && codomain.instantiate(oc, theta)
            }
        }
    }

    /// Type variables occurring in this type, in order of first occurrence.
    pub fn free_vars(&self) -> BTreeSet<i64> {
        let mut out = BTreeSet::new();
        self.collect_free_vars(&mut out);
        out
    }

    fn collect_free_vars(&self, out: &mut BTreeSet<i64>) {
        match self {
            Type::Var(i) => {
                out.insert(*i);
            }
            Type::Data { args, .. } => {
                for a in args {
                    a.collect_free_vars(out);
                }
            }
            Type::Composed { domain, codomain } => {
                domain.collect_free_vars(out);
                codomain.collect_free_vars(out);
            }
        }
    }

    /// Renders the type to a string, using a short-name table for type
    /// variables ("$a", "$b", ... in insertion order), matching
    /// `type.cpp`'s `to_string(TypeNaming&, ...)`.
    pub fn to_string_named(&self, naming: &mut TypeNaming) -> String {
        self.to_string_inner(Some(naming), false)
    }

    /// Renders the type using each type variable's raw index as its name.
    pub fn to_string_raw(&self) -> String {
        self.to_string_inner(None, false)
    }

    fn to_string_inner(&self, naming: Option<&mut TypeNaming>, brackets: bool) -> String {
        match self {
            Type::Var(index) => match naming {
                Some(n) => n.name_for(*index),
                None => pretty_name(*index),
            },
            Type::Data { constructor, args } => {
                if args.is_empty() {
                    constructor.clone()
                } else {
                    let mut naming = naming;
                    let mut parts = Vec::with_capacity(args.len());
                    for a in args {
                        let piece = match naming.as_deref_mut() {
                            Some(n) => a.to_string_inner(Some(n), false),
                            None => a.to_string_inner(None, false),
                        };
                        parts.push(piece);
                    }
                    format!("{constructor}({})", parts.join(","))
                }
            }
            Type::Composed { domain, codomain } => {
                let mut naming = naming;
                let l = match naming.as_deref_mut() {
                    Some(n) => domain.to_string_inner(Some(n), true),
                    None => domain.to_string_inner(None, true),
                };
                let r = match naming.as_deref_mut() {
                    Some(n) => codomain.to_string_inner(Some(n), false),
                    None => codomain.to_string_inner(None, false),
                };
                let middle = format!("{l} -> {r}");
                if brackets { format!("({middle})") } else { middle }
            }
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_raw())
    }
}

/// Assigns each type-variable index a short, stable display name
/// (`$a`, `$b`, ..., `$z`, `$aa`, ...), in order of first request.
#[derive(Debug, Default)]
pub struct TypeNaming {
    names: std::collections::HashMap<i64, String>,
}

impl TypeNaming {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name_for(&mut self, index: i64) -> String {
        if let Some(existing) = self.names.get(&index) {
            return existing.clone();
        }
        let k = self.names.len();
        let name = pretty_name_base26(k);
        self.names.insert(index, name.clone());
        name
    }
}

fn pretty_name(index: i64) -> String {
    pretty_name_base26(index.max(0) as usize)
}

fn pretty_name_base26(mut k: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'a' + (k % 26) as u8) as char);
        if k < 26 {
            break;
        }
        k = k / 26 - 1;
    }
    format!("${}", letters.into_iter().collect::<String>())
}

/// Checks that `name` was actually declared in an alphabet before use;
/// `ProverError::malformed` is the standard way callers surface this.
pub fn require_known(name: &str, known: bool) -> Result<()> {
    if known {
        Ok(())
    } else {
        Err(ProverError::malformed(format!("unknown constant: {name}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_is_structurally_equal() {
        let ty = Type::arrow(Type::base("Nat"), Type::base("Nat"));
        let copy = ty.clone();
        assert!(ty.equals(&copy));
    }

    #[test]
    fn collapse_preserves_arrow_structure() {
        let ty = Type::arrow(Type::data("List", vec![Type::base("Nat")]), Type::base("Nat"));
        let collapsed = ty.collapse();
        assert_eq!(collapsed, Type::arrow(Type::base("o"), Type::base("o")));
    }

    #[test]
    fn instantiate_finds_substitution() {
        let alpha = Type::Var(100);
        let target = Type::base("Nat");
        let mut theta = TypeSubstitution::new();
        assert!(alpha.instantiate(&target, &mut theta));
        assert_eq!(theta.get(100), Some(&Type::base("Nat")));
    }

    #[test]
    fn instantiate_fails_on_constructor_mismatch() {
        let pattern = Type::base("Nat");
        let target = Type::base("Bool");
        let mut theta = TypeSubstitution::new();
        assert!(!pattern.instantiate(&target, &mut theta));
    }

    #[test]
    fn instantiate_fails_on_arity_mismatch() {
        let pattern = Type::data("List", vec![Type::Var(1)]);
        let target = Type::data("List", vec![Type::base("Nat"), Type::base("Nat")]);
        let mut theta = TypeSubstitution::new();
        assert!(!pattern.instantiate(&target, &mut theta));
    }

    #[test]
    fn free_vars_collects_all_typevars() {
        let ty = Type::arrow(Type::Var(1), Type::data("Pair", vec![Type::Var(2), Type::Var(1)]));
        assert_eq!(ty.free_vars(), BTreeSet::from([1, 2]));
    }

    #[test]
    fn to_string_named_is_stable_across_calls() {
        let ty = Type::arrow(Type::Var(7), Type::Var(7));
        let mut naming = TypeNaming::new();
        let s = ty.to_string_named(&mut naming);
        assert_eq!(s, "$a -> $a");
    }
}
