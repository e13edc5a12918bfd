//! Typed meta-terms (C2): constants, variables, abstractions, applications
//! and meta-applications, plus matching, substitution and positions.
//!
//! Every subterm carries its own computed [`Type`] (the teacher's `PTerm`
//! pointer tree becomes an owned tree of [`Term`] values here: no manual
//! `free_memory`, `copy()` is just `Clone`). Bound variables are renamed to
//! fresh, globally-unique indices on every [`Term::fresh_copy`], which is
//! what makes substitution capture-avoiding "by construction" rather than
//! by a runtime freshness check, matching spec.md's invariant.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};

use super::types::{Type, TypeSubstitution};

static NEXT_VAR: AtomicI64 = AtomicI64::new(0);

/// Allocates a fresh (ordinary or meta-) variable index.
pub fn fresh_var_index() -> i64 {
    NEXT_VAR.fetch_add(1, Ordering::Relaxed)
}

pub fn reset_var_counter() {
    NEXT_VAR.store(0, Ordering::Relaxed);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Term {
    /// A function symbol, identified by name and its (possibly
    /// type-substituted) instance type. The same name may appear with
    /// different instance types if the symbol is polymorphic.
    Constant { name: String, ty: Type },
    /// A variable, identified by a process-unique integer. Whether it is
    /// free or bound is purely structural (determined by whether an
    /// enclosing `Abstraction` binds the same index), not stored here.
    Variable { index: i64, ty: Type },
    /// `λx:τ.t`
    Abstraction { var_index: i64, var_type: Type, body: Box<Term>, ty: Type },
    /// `s·t`
    Application { func: Box<Term>, arg: Box<Term>, ty: Type },
    /// `Z[t1,...,tn]`, a meta-variable applied to n argument terms (n ≥ 0).
    MetaApplication { metavar: i64, args: Vec<Term>, ty: Type },
}

impl Term {
    pub fn constant(name: impl Into<String>, ty: Type) -> Term {
        Term::Constant { name: name.into(), ty }
    }

    pub fn var(index: i64, ty: Type) -> Term {
        Term::Variable { index, ty }
    }

    pub fn fresh_var(ty: Type) -> Term {
        Term::Variable { index: fresh_var_index(), ty }
    }

    pub fn lambda(var_index: i64, var_type: Type, body: Term) -> Term {
        let ty = Type::arrow(var_type.clone(), body.query_type().clone());
        Term::Abstraction { var_index, var_type, body: Box::new(body), ty }
    }

    /// Builds `func·arg`, checking that `func`'s type is a composed type
    /// whose domain matches `arg`'s type. Returns `None` on a type clash —
    /// callers in the parser/rule layer turn this into
    /// `ProverError::malformed`.
    pub fn apply(func: Term, arg: Term) -> Option<Term> {
        let Type::Composed { domain, codomain } = func.query_type() else { return None };
        if !domain.equals(arg.query_type()) {
            return None;
        }
        let ty = (**codomain).clone();
        Some(Term::Application { func: Box::new(func), arg: Box::new(arg), ty })
    }

    /// Applies a sequence of arguments left-to-right, failing if any step
    /// doesn't type-check.
    pub fn apply_many(head: Term, args: Vec<Term>) -> Option<Term> {
        args.into_iter().try_fold(head, Term::apply)
    }

    pub fn meta(metavar: i64, args: Vec<Term>, ty: Type) -> Term {
        Term::MetaApplication { metavar, args, ty }
    }

    pub fn query_type(&self) -> &Type {
        match self {
            Term::Constant { ty, .. }
            | Term::Variable { ty, .. }
            | Term::Abstraction { ty, .. }
            | Term::Application { ty, .. }
            | Term::MetaApplication { ty, .. } => ty,
        }
    }

    pub fn query_constant(&self) -> bool {
        matches!(self, Term::Constant { .. })
    }
    pub fn query_variable(&self) -> bool {
        matches!(self, Term::Variable { .. })
    }
    pub fn query_abstraction(&self) -> bool {
        matches!(self, Term::Abstraction { .. })
    }
    pub fn query_application(&self) -> bool {
        matches!(self, Term::Application { .. })
    }
    pub fn query_meta(&self) -> bool {
        matches!(self, Term::MetaApplication { .. })
    }

    pub fn apply_type_substitution(&mut self, theta: &TypeSubstitution) {
        match self {
            Term::Constant { ty, .. } | Term::Variable { ty, .. } => {
                *ty = ty.substitute(theta);
            }
            Term::Abstraction { var_type, body, ty, .. } => {
                *var_type = var_type.substitute(theta);
                body.apply_type_substitution(theta);
                *ty = ty.substitute(theta);
            }
            Term::Application { func, arg, ty } => {
                func.apply_type_substitution(theta);
                arg.apply_type_substitution(theta);
                *ty = ty.substitute(theta);
            }
            Term::MetaApplication { args, ty, .. } => {
                for a in args.iter_mut() {
                    a.apply_type_substitution(theta);
                }
                *ty = ty.substitute(theta);
            }
        }
    }

    /// Returns the head of an application spine (`s0` for `s0 s1 ... sn`).
    /// Not a copy: further use should clone if ownership is needed.
    pub fn query_head(&self) -> &Term {
        match self {
            Term::Application { func, .. } => func.query_head(),
            other => other,
        }
    }

    /// Splits an application into its spine: `(s0 s1) s2` becomes
    /// `[s0, s1, s2]`. Non-applications return `[self]`.
    pub fn split(&self) -> Vec<&Term> {
        let mut parts = Vec::new();
        self.split_into(&mut parts);
        parts
    }

    fn split_into<'a>(&'a self, out: &mut Vec<&'a Term>) {
        if let Term::Application { func, arg, .. } = self {
            func.split_into(out);
            out.push(arg);
        } else {
            out.push(self);
        }
    }

    /// Free (ordinary or meta-) variables, per spec.md's `free_var`.
    pub fn free_var(&self, metavars: bool) -> BTreeSet<i64> {
        let mut out = BTreeSet::new();
        self.collect_free_var(metavars, &mut out);
        out
    }

    fn collect_free_var(&self, metavars: bool, out: &mut BTreeSet<i64>) {
        match self {
            Term::Constant { .. } => {}
            Term::Variable { index, .. } => {
                if !metavars {
                    out.insert(*index);
                }
            }
            Term::Abstraction { var_index, body, .. } => {
                let mut inner = BTreeSet::new();
                body.collect_free_var(metavars, &mut inner);
                inner.remove(var_index);
                out.extend(inner);
            }
            Term::Application { func, arg, .. } => {
                func.collect_free_var(metavars, out);
                arg.collect_free_var(metavars, out);
            }
            Term::MetaApplication { metavar, args, .. } => {
                if metavars {
                    out.insert(*metavar);
                }
                for a in args {
                    a.collect_free_var(metavars, out);
                }
            }
        }
    }

    pub fn free_typevar(&self) -> BTreeSet<i64> {
        let mut out = BTreeSet::new();
        self.collect_free_typevar(&mut out);
        out
    }

    fn collect_free_typevar(&self, out: &mut BTreeSet<i64>) {
        out.extend(self.query_type().free_vars());
        match self {
            Term::Constant { .. } | Term::Variable { .. } => {}
            Term::Abstraction { var_type, body, .. } => {
                out.extend(var_type.free_vars());
                body.collect_free_typevar(out);
            }
            Term::Application { func, arg, .. } => {
                func.collect_free_typevar(out);
                arg.collect_free_typevar(out);
            }
            Term::MetaApplication { args, .. } => {
                for a in args {
                    a.collect_free_typevar(out);
                }
            }
        }
    }

    /// A meta-term is a pattern iff every meta-application's arguments are
    /// pairwise distinct (bound) variables.
    pub fn query_pattern(&self) -> bool {
        match self {
            Term::Constant { .. } | Term::Variable { .. } => true,
            Term::Abstraction { body, .. } => body.query_pattern(),
            Term::Application { func, arg, .. } => func.query_pattern() && arg.query_pattern(),
            Term::MetaApplication { args, .. } => {
                let mut seen = BTreeSet::new();
                for a in args {
                    match a {
                        Term::Variable { index, .. } => {
                            if !seen.insert(*index) {
                                return false;
                            }
                        }
                        _ => return false,
                    }
                }
                true
            }
        }
    }

    /// A deep, alpha-fresh copy: every bound variable introduced by an
    /// `Abstraction` is renamed to a fresh index, with all occurrences
    /// inside the body renamed correspondingly.
    pub fn fresh_copy(&self) -> Term {
        let mut renaming = HashMap::new();
        self.copy_recursive(&mut renaming)
    }

    fn copy_recursive(&self, renaming: &mut HashMap<i64, i64>) -> Term {
        match self {
            Term::Constant { name, ty } => Term::Constant { name: name.clone(), ty: ty.clone() },
            Term::Variable { index, ty } => {
                let index = renaming.get(index).copied().unwrap_or(*index);
                Term::Variable { index, ty: ty.clone() }
            }
            Term::Abstraction { var_index, var_type, body, ty } => {
                let fresh = fresh_var_index();
                renaming.insert(*var_index, fresh);
                let body = body.copy_recursive(renaming);
                Term::Abstraction {
                    var_index: fresh,
                    var_type: var_type.clone(),
                    body: Box::new(body),
                    ty: ty.clone(),
                }
            }
            Term::Application { func, arg, ty } => Term::Application {
                func: Box::new(func.copy_recursive(renaming)),
                arg: Box::new(arg.copy_recursive(renaming)),
                ty: ty.clone(),
            },
            Term::MetaApplication { metavar, args, ty } => Term::MetaApplication {
                metavar: *metavar,
                args: args.iter().map(|a| a.copy_recursive(renaming)).collect(),
                ty: ty.clone(),
            },
        }
    }

    /// Structural equality up to bound-variable renaming (alpha-equality).
    pub fn equals(&self, other: &Term) -> bool {
        let mut renaming = HashMap::new();
        self.equals_recursive(other, &mut renaming)
    }

    fn equals_recursive(&self, other: &Term, renaming: &mut HashMap<i64, i64>) -> bool {
        match (self, other) {
            (Term::Constant { name: n1, ty: t1 }, Term::Constant { name: n2, ty: t2 }) => {
                n1 == n2 && t1.equals(t2)
            }
            (Term::Variable { index: i1, ty: t1 }, Term::Variable { index: i2, ty: t2 }) => {
                if !t1.equals(t2) {
                    return false;
                }
                match renaming.get(i1) {
                    Some(mapped) => mapped == i2,
                    None => i1 == i2,
                }
            }
            (
                Term::Abstraction { var_index: v1, var_type: t1, body: b1, .. },
                Term::Abstraction { var_index: v2, var_type: t2, body: b2, .. },
            ) => {
                if !t1.equals(t2) {
                    return false;
                }
                let previous = renaming.insert(*v1, *v2);
                let result = b1.equals_recursive(b2, renaming);
                match previous {
                    Some(p) => {
                        renaming.insert(*v1, p);
                    }
                    None => {
                        renaming.remove(v1);
                    }
                }
                result
            }
            (
                Term::Application { func: f1, arg: a1, .. },
                Term::Application { func: f2, arg: a2, .. },
            ) => f1.equals_recursive(f2, renaming) && a1.equals_recursive(a2, renaming),
            (
                Term::MetaApplication { metavar: m1, args: a1, .. },
                Term::MetaApplication { metavar: m2, args: a2, .. },
            ) => {
                m1 == m2
                    && a1.len() == a2.len()
                    && a1.iter().zip(a2).all(|(x, y)| x.equals_recursive(y, renaming))
            }
            _ => false,
        }
    }

    /// Looks up a position made of '1'/'2' (application: func/arg;
    /// abstraction: '1' descends to the body) and '0'.. for meta-arguments
    /// (meta-argument indices beyond 9 use the ASCII characters following
    /// '9', matching `term.h`'s documented trick of treating the position
    /// string as a sequence of byte offsets from `'0'`).
    pub fn subterm(&self, position: &str) -> Option<&Term> {
        let mut cur = self;
        for c in position.chars() {
            cur = cur.child_for(c)?;
        }
        Some(cur)
    }

    fn child_for(&self, c: char) -> Option<&Term> {
        match self {
            Term::Application { func, arg, .. } => match c {
                '1' => Some(func),
                '2' => Some(arg),
                _ => None,
            },
            Term::Abstraction { body, .. } => {
                if c == '1' {
                    Some(body)
                } else {
                    None
                }
            }
            Term::MetaApplication { args, .. } => {
                let idx = (c as u32).wrapping_sub('0' as u32) as usize;
                args.get(idx)
            }
            _ => None,
        }
    }

    pub fn number_children(&self) -> usize {
        match self {
            Term::Constant { .. } | Term::Variable { .. } => 0,
            Term::Abstraction { .. } => 1,
            Term::Application { .. } => 2,
            Term::MetaApplication { args, .. } => args.len(),
        }
    }

    /// 0-based child access (unlike `subterm`, which is 1-based for
    /// applications/abstractions to match the position-string convention).
    pub fn get_child(&self, index: usize) -> Option<&Term> {
        match self {
            Term::Abstraction { body, .. } if index == 0 => Some(body),
            Term::Application { func, arg, .. } => match index {
                0 => Some(func),
                1 => Some(arg),
                _ => None,
            },
            Term::MetaApplication { args, .. } => args.get(index),
            _ => None,
        }
    }

    /// Every valid position string in this term, prefixed by `startwith`.
    pub fn query_positions(&self, startwith: &str) -> Vec<String> {
        let mut out = vec![startwith.to_string()];
        let n = self.number_children();
        for i in 0..n {
            if let Some(child) = self.get_child(i) {
                let c = position_char(self, i);
                out.extend(child.query_positions(&format!("{startwith}{c}")));
            }
        }
        out
    }

    /// The type of the variable or meta-variable with index `v`
    /// occurring anywhere in this term, if any.
    pub fn lookup_type(&self, v: i64) -> Option<&Type> {
        match self {
            Term::Variable { index, ty } if *index == v => Some(ty),
            Term::MetaApplication { metavar, args, ty } => {
                if *metavar == v {
                    return Some(ty);
                }
                args.iter().find_map(|a| a.lookup_type(v))
            }
            Term::Abstraction { var_index, var_type, body, .. } => {
                if *var_index == v {
                    Some(var_type)
                } else {
                    body.lookup_type(v)
                }
            }
            Term::Application { func, arg, .. } => func.lookup_type(v).or_else(|| arg.lookup_type(v)),
            _ => None,
        }
    }

    /// Updates `arities` with the arity(s) observed for constants headed
    /// at this term or any subterm's application spine; an existing entry
    /// may only be decreased, never increased, matching the "effective
    /// (minimum observed) arity" used by the ordering problem (C6).
    pub fn adjust_arities(&self, arities: &mut HashMap<String, usize>) {
        let spine = self.split();
        if let Term::Constant { name, .. } = spine[0] {
            let k = spine.len() - 1;
            arities
                .entry(name.clone())
                .and_modify(|existing| *existing = (*existing).min(k))
                .or_insert(k);
        }
        match self {
            Term::Constant { .. } | Term::Variable { .. } => {}
            Term::Application { func, arg, .. } => {
                func.adjust_arities(arities);
                arg.adjust_arities(arities);
            }
            Term::Abstraction { body, .. } => body.adjust_arities(arities),
            Term::MetaApplication { args, .. } => {
                for a in args {
                    a.adjust_arities(arities);
                }
            }
        }
    }

    pub fn to_string_env(&self, env: &mut Environment) -> String {
        match self {
            Term::Constant { name, .. } => name.clone(),
            Term::Variable { index, .. } => env.name_for(*index, false),
            Term::Abstraction { var_index, body, .. } => {
                let name = env.name_for(*var_index, true);
                format!("λ{}.{}", name, body.to_string_env(env))
            }
            Term::Application { func, arg, .. } => {
                format!("{}·{}", paren_if_needed(func, env), paren_if_needed(arg, env))
            }
            Term::MetaApplication { metavar, args, .. } => {
                let name = env.name_for(*metavar, false);
                if args.is_empty() {
                    name
                } else {
                    let parts: Vec<String> = args.iter().map(|a| a.to_string_env(env)).collect();
                    format!("{}[{}]", name, parts.join(","))
                }
            }
        }
    }
}

fn paren_if_needed(t: &Term, env: &mut Environment) -> String {
    let s = t.to_string_env(env);
    if t.query_abstraction() { format!("({s})") } else { s }
}

fn position_char(parent: &Term, index: usize) -> char {
    match parent {
        Term::Application { .. } => {
            if index == 0 { '1' } else { '2' }
        }
        Term::Abstraction { .. } => '1',
        Term::MetaApplication { .. } => ((b'0' as usize + index) as u8) as char,
        _ => '?',
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut env = Environment::new();
        write!(f, "{}", self.to_string_env(&mut env))
    }
}

/// Assigns stable, human-readable names to free variables and
/// meta-variables within one proof attempt (`term.cpp`'s `Environment`).
#[derive(Debug, Default)]
pub struct Environment {
    names: HashMap<i64, String>,
    next_bound: usize,
    next_free: usize,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name_for(&mut self, index: i64, bound: bool) -> String {
        if let Some(existing) = self.names.get(&index) {
            return existing.clone();
        }
        let name = if bound {
            let n = self.next_bound;
            self.next_bound += 1;
            format!("x{n}")
        } else {
            let n = self.next_free;
            self.next_free += 1;
            format!("Z{n}")
        };
        self.names.insert(index, name.clone());
        name
    }
}

/// Maps ordinary free-variable indices to terms, and meta-variable indices
/// to a captured abstraction over the bound variables they matched
/// against (`γ(Z)` "becomes λ-abstracted over those variables").
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    pub vars: HashMap<i64, Term>,
    pub metavars: HashMap<i64, MetaBinding>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetaBinding {
    /// The (target-side) bound-variable indices the meta-variable was
    /// matched against, in argument order.
    pub params: Vec<i64>,
    pub body: Term,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// `t.apply_substitution(gamma)`: substitutes free variables from
    /// `gamma.vars` and plugs meta-application arguments into
    /// `gamma.metavars` bindings.
    pub fn apply(&self, term: &Term) -> Term {
        match term {
            Term::Constant { .. } => term.clone(),
            Term::Variable { index, .. } => match self.vars.get(index) {
                Some(replacement) => replacement.clone(),
                None => term.clone(),
            },
            Term::Abstraction { var_index, var_type, body, .. } => {
                let mut shadowed = self.clone();
                shadowed.vars.remove(var_index);
                let new_body = shadowed.apply(body);
                Term::lambda(*var_index, var_type.clone(), new_body)
            }
            Term::Application { func, arg, .. } => {
                let f = self.apply(func);
                let a = self.apply(arg);
                Term::apply(f, a).expect("substitution preserves typing")
            }
            Term::MetaApplication { metavar, args, ty } => {
                let new_args: Vec<Term> = args.iter().map(|a| self.apply(a)).collect();
                match self.metavars.get(metavar) {
                    Some(binding) => plug(binding, &new_args),
                    None => Term::MetaApplication { metavar: *metavar, args: new_args, ty: ty.clone() },
                }
            }
        }
    }
}

/// Simultaneously substitutes `binding.params[i] -> args[i]` into
/// `binding.body`.
fn plug(binding: &MetaBinding, args: &[Term]) -> Term {
    let mut sub = Substitution::new();
    for (param, arg) in binding.params.iter().zip(args) {
        sub.vars.insert(*param, arg.clone());
    }
    sub.apply(&binding.body)
}

/// Attempts to extend `theta`/`gamma` so that `pattern` instantiated by
/// them equals `target`. `bound` maps a pattern-side bound variable index
/// to its target-side counterpart, accumulated while descending through
/// matching abstractions. Returns `false` on any mismatch (`theta`/`gamma`
/// may still have gained some entries, matching the teacher's contract).
pub fn instantiate(
    pattern: &Term,
    target: &Term,
    theta: &mut TypeSubstitution,
    gamma: &mut Substitution,
    bound: &mut HashMap<i64, i64>,
) -> bool {
    match pattern {
        Term::Constant { name, ty } => match target {
            Term::Constant { name: oname, ty: oty } => name == oname && ty.instantiate(oty, theta),
            _ => false,
        },
        Term::Variable { index, .. } => match bound.get(index) {
            Some(&partner) => matches!(target, Term::Variable { index: oi, .. } if *oi == partner),
            None => {
                if let Some(existing) = gamma.vars.get(index) {
                    existing.equals(target)
                } else {
                    let bound_targets: std::collections::HashSet<i64> = bound.values().copied().collect();
                    if target.free_var(false).iter().any(|v| bound_targets.contains(v)) {
                        false
                    } else {
                        gamma.vars.insert(*index, target.clone());
                        true
                    }
                }
            }
        },
        Term::Application { func, arg, .. } => match target {
            Term::Application { func: ofunc, arg: oarg, .. } => {
                instantiate(func, ofunc, theta, gamma, bound)
                    && instantiate(arg, oarg, theta, gamma, bound)
            }
            _ => false,
        },
        Term::Abstraction { var_index, var_type, body, .. } => match target {
            Term::Abstraction { var_index: ovar, var_type: ovar_type, body: obody, .. } => {
                if !var_type.instantiate(ovar_type, theta) {
                    return false;
                }
                let previous = bound.insert(*var_index, *ovar);
                let ok = instantiate(body, obody, theta, gamma, bound);
                match previous {
                    Some(p) => {
                        bound.insert(*var_index, p);
                    }
                    None => {
                        bound.remove(var_index);
                    }
                }
                ok
            }
            _ => false,
        },
        Term::MetaApplication { metavar, args, .. } => {
            let mut params = Vec::with_capacity(args.len());
            let mut seen = std::collections::HashSet::new();
            for a in args {
                let Term::Variable { index, .. } = a else { return false };
                if !seen.insert(*index) {
                    return false;
                }
                let Some(&partner) = bound.get(index) else { return false };
                params.push(partner);
            }
            let allowed: std::collections::HashSet<i64> = params.iter().copied().collect();
            if !target.free_var(false).iter().all(|v| allowed.contains(v)) {
                return false;
            }
            let new_binding = MetaBinding { params: params.clone(), body: target.fresh_copy() };
            match gamma.metavars.get(metavar) {
                Some(existing) => existing.params == new_binding.params && existing.body.equals(&new_binding.body),
                None => {
                    gamma.metavars.insert(*metavar, new_binding);
                    true
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nat() -> Type {
        Type::base("Nat")
    }

    #[test]
    fn fresh_copy_renames_bound_variables() {
        let x = fresh_var_index();
        let t = Term::lambda(x, nat(), Term::var(x, nat()));
        let copy = t.fresh_copy();
        assert!(t.equals(&copy));
        let Term::Abstraction { var_index: x2, .. } = &copy else { panic!() };
        assert_ne!(*x2, x);
    }

    #[test]
    fn equals_is_alpha_invariant() {
        let x = fresh_var_index();
        let y = fresh_var_index();
        let t1 = Term::lambda(x, nat(), Term::var(x, nat()));
        let t2 = Term::lambda(y, nat(), Term::var(y, nat()));
        assert!(t1.equals(&t2));
    }

    #[test]
    fn query_pattern_rejects_repeated_metavar_args() {
        let x = fresh_var_index();
        let z = fresh_var_index();
        let good = Term::meta(z, vec![Term::var(x, nat())], nat());
        assert!(good.query_pattern());
        let bad = Term::meta(z, vec![Term::var(x, nat()), Term::var(x, nat())], nat());
        assert!(!bad.query_pattern());
    }

    #[test]
    fn instantiate_matches_pattern_and_builds_substitution() {
        // pattern: Z[x] matched against target: s(x) under binder x, i.e.
        // Z should be bound to \x. s(x).
        let x_pat = fresh_var_index();
        let z = fresh_var_index();
        let s_ty = Type::arrow(nat(), nat());
        let pattern = Term::lambda(x_pat, nat(), Term::meta(z, vec![Term::var(x_pat, nat())], nat()));

        let x_tgt = fresh_var_index();
        let s = Term::constant("s", s_ty);
        let target = Term::lambda(
            x_tgt,
            nat(),
            Term::apply(s, Term::var(x_tgt, nat())).unwrap(),
        );

        let mut theta = TypeSubstitution::new();
        let mut gamma = Substitution::new();
        let mut bound = HashMap::new();
        assert!(instantiate(&pattern, &target, &mut theta, &mut gamma, &mut bound));
        assert!(gamma.metavars.contains_key(&z));
    }

    #[test]
    fn substitution_respects_free_var_invariant() {
        let x = fresh_var_index();
        let y = fresh_var_index();
        let t = Term::var(x, nat());
        let mut gamma = Substitution::new();
        gamma.vars.insert(x, Term::var(y, nat()));
        let result = gamma.apply(&t);
        assert_eq!(result.free_var(false), BTreeSet::from([y]));
    }

    #[test]
    fn adjust_arities_keeps_the_minimum_observed() {
        let ty = Type::arrow_many(vec![nat(), nat()], nat());
        let f = Term::constant("f", ty);
        let partial = Term::apply(f.clone(), Term::fresh_var(nat())).unwrap();
        let mut arities = HashMap::new();
        partial.adjust_arities(&mut arities);
        assert_eq!(arities.get("f"), Some(&1));
    }
}
