//! Rewrite rules (C3): validity checking, top-level matching/rewriting,
//! and dependency-pair generation (§4.10).

use std::collections::BTreeSet;

use super::alphabet::Alphabet;
use super::error::{ProverError, Result};
use super::terms::{instantiate, Substitution, Term};
use super::types::{Type, TypeSubstitution};

/// The data type dependency-pair-marked symbols' results are collapsed
/// onto, matching `original_source`'s use of a dedicated sentinel return
/// type so `f#`'s arity/typing never collides with `f`'s.
pub const DP_BASE: &str = "DP_BASE";

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub lhs: Term,
    pub rhs: Term,
}

impl Rule {
    /// Builds a rule, checking `matchrule.cpp`'s validity invariants:
    /// headed by a constant, the left-hand side is a pattern, both sides
    /// share a type, both are closed (no free ordinary variables), and
    /// the right-hand side's free type- and meta-variables are subsets of
    /// the left-hand side's.
    pub fn new(lhs: Term, rhs: Term) -> Result<Rule> {
        let rule = Rule { lhs, rhs };
        rule.check_valid()?;
        Ok(rule)
    }

    pub fn check_valid(&self) -> Result<()> {
        if !self.lhs.query_head().query_constant() {
            return Err(ProverError::malformed("rule left-hand side must be headed by a constant"));
        }
        if !self.lhs.query_pattern() {
            return Err(ProverError::malformed("rule left-hand side must be a pattern"));
        }
        if !self.lhs.query_type().equals(self.rhs.query_type()) {
            return Err(ProverError::malformed("rule sides must share a type"));
        }
        if !self.lhs.free_var(false).is_empty() || !self.rhs.free_var(false).is_empty() {
            return Err(ProverError::malformed("rule sides must be closed (no free ordinary variables)"));
        }
        let lhs_typevars = self.lhs.free_typevar();
        if !self.rhs.free_typevar().is_subset(&lhs_typevars) {
            return Err(ProverError::malformed(
                "rule right-hand side introduces a type variable absent from the left-hand side",
            ));
        }
        let lhs_metavars = self.lhs.free_var(true);
        if !self.rhs.free_var(true).is_subset(&lhs_metavars) {
            return Err(ProverError::malformed(
                "rule right-hand side introduces a meta-variable absent from the left-hand side",
            ));
        }
        Ok(())
    }

    /// Attempts to match this rule's left-hand side against `term` at the
    /// top position, returning the type- and term-substitutions on
    /// success.
    pub fn applicable_top(&self, term: &Term) -> Option<(TypeSubstitution, Substitution)> {
        let mut theta = TypeSubstitution::new();
        let mut gamma = Substitution::new();
        let mut bound = std::collections::HashMap::new();
        if instantiate(&self.lhs, term, &mut theta, &mut gamma, &mut bound) {
            Some((theta, gamma))
        } else {
            None
        }
    }

    /// Rewrites `term` at the top position using this rule, if it applies.
    pub fn rewrite_top(&self, term: &Term) -> Option<Term> {
        let (theta, gamma) = self.applicable_top(term)?;
        let mut rhs = self.rhs.clone();
        rhs.apply_type_substitution(&theta);
        Some(gamma.apply(&rhs))
    }

    pub fn head_name(&self) -> &str {
        match self.lhs.query_head() {
            Term::Constant { name, .. } => name,
            _ => unreachable!("check_valid guarantees a constant head"),
        }
    }
}

fn marked_name(name: &str) -> String {
    format!("{name}#")
}

fn dp_type_for(original: &Type) -> Type {
    let (args, _result) = original.split_arrows();
    Type::arrow_many(args.into_iter().cloned().collect(), Type::base(DP_BASE))
}

/// Walks `t`, collecting every subterm headed by a constant in `defined`
/// that is not itself a bare variable or abstraction node (abstractions
/// are still recursed into, just never themselves reported).
fn collect_defined_occurrences<'a>(t: &'a Term, defined: &BTreeSet<String>, out: &mut Vec<&'a Term>) {
    match t {
        Term::Constant { name, .. } => {
            if defined.contains(name) {
                out.push(t);
            }
        }
        Term::Variable { .. } => {}
        Term::Abstraction { body, .. } => collect_defined_occurrences(body, defined, out),
        Term::Application { func, arg, .. } => {
            let spine = t.split();
            if let Term::Constant { name, .. } = spine[0] {
                if defined.contains(name) {
                    out.push(t);
                }
            }
            collect_defined_occurrences(func, defined, out);
            collect_defined_occurrences(arg, defined, out);
        }
        Term::MetaApplication { args, .. } => {
            for a in args {
                collect_defined_occurrences(a, defined, out);
            }
        }
    }
}

/// Computes dependency pairs (§4.10): for every rule `f(l1..ln) => r` and
/// every subterm of `r` headed by a defined symbol `g` at a non-variable,
/// non-abstraction position, emits `f#(l1..ln) => g#(s1..sk)`. Returns an
/// alphabet extended with the fresh `#`-marked symbols alongside the
/// generated dependency pairs.
pub fn compute_dependency_pairs(alphabet: &Alphabet, rules: &[Rule]) -> (Alphabet, Vec<Rule>) {
    let defined: BTreeSet<String> = rules.iter().map(|r| r.head_name().to_string()).collect();

    let mut dp_alphabet = alphabet.clone();
    let mut declare_marked = |name: &str, dp_alphabet: &mut Alphabet| {
        let mk = marked_name(name);
        if !dp_alphabet.contains(&mk) {
            if let Some(ty) = alphabet.query_type(name) {
                dp_alphabet.declare(mk, dp_type_for(ty));
            }
        }
    };

    let mut pairs = Vec::new();
    for rule in rules {
        let lhs_spine = rule.lhs.split();
        let Term::Constant { name: f_name, .. } = lhs_spine[0] else { continue };
        declare_marked(f_name, &mut dp_alphabet);
        let f_marked = marked_name(f_name);
        let Some(f_type) = dp_alphabet.query_type(&f_marked).cloned() else { continue };
        let lhs_args: Vec<Term> = lhs_spine[1..].iter().map(|t| (*t).clone()).collect();
        let Some(dp_lhs) = Term::apply_many(Term::constant(f_marked, f_type), lhs_args) else { continue };

        let mut occurrences = Vec::new();
        collect_defined_occurrences(&rule.rhs, &defined, &mut occurrences);
        for occurrence in occurrences {
            let spine = occurrence.split();
            let Term::Constant { name: g_name, .. } = spine[0] else { continue };
            declare_marked(g_name, &mut dp_alphabet);
            let g_marked = marked_name(g_name);
            let Some(g_type) = dp_alphabet.query_type(&g_marked).cloned() else { continue };
            let args: Vec<Term> = spine[1..].iter().map(|t| (*t).clone()).collect();
            let Some(dp_rhs) = Term::apply_many(Term::constant(g_marked, g_type), args) else { continue };
            pairs.push(Rule { lhs: dp_lhs.clone(), rhs: dp_rhs });
        }
    }
    (dp_alphabet, pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::terms::fresh_var_index;

    fn nat_to_nat() -> Type {
        Type::arrow(Type::base("Nat"), Type::base("Nat"))
    }

    #[test]
    fn valid_rule_passes_check() {
        let x = fresh_var_index();
        let f = Term::constant("f", nat_to_nat());
        let lhs = Term::apply(f, Term::var(x, Type::base("Nat"))).unwrap();
        let rhs = Term::var(x, Type::base("Nat"));
        assert!(Rule::new(lhs, rhs).is_ok());
    }

    #[test]
    fn rejects_non_constant_head() {
        let x = fresh_var_index();
        let lhs = Term::var(x, Type::base("Nat"));
        let rhs = Term::var(x, Type::base("Nat"));
        assert!(Rule::new(lhs, rhs).is_err());
    }

    #[test]
    fn rewrite_top_matches_and_substitutes() {
        let x = fresh_var_index();
        let f = Term::constant("f", nat_to_nat());
        let lhs = Term::apply(f.clone(), Term::var(x, Type::base("Nat"))).unwrap();
        let rhs = Term::var(x, Type::base("Nat"));
        let rule = Rule::new(lhs, rhs).unwrap();

        let zero = Term::constant("zero", Type::base("Nat"));
        let target = Term::apply(f, zero.clone()).unwrap();
        let result = rule.rewrite_top(&target).unwrap();
        assert!(result.equals(&zero));
    }

    #[test]
    fn dependency_pairs_mark_defined_occurrences() {
        // f(x) => g(x), g defined separately by its own rule.
        let mut alphabet = Alphabet::new();
        alphabet.declare("f", nat_to_nat());
        alphabet.declare("g", nat_to_nat());

        let x1 = fresh_var_index();
        let f = Term::constant("f", nat_to_nat());
        let g = Term::constant("g", nat_to_nat());
        let rule1 = Rule::new(
            Term::apply(f, Term::var(x1, Type::base("Nat"))).unwrap(),
            Term::apply(g.clone(), Term::var(x1, Type::base("Nat"))).unwrap(),
        )
        .unwrap();
        let x2 = fresh_var_index();
        let rule2 = Rule::new(
            Term::apply(g, Term::var(x2, Type::base("Nat"))).unwrap(),
            Term::var(x2, Type::base("Nat")),
        )
        .unwrap();

        let (dp_alphabet, pairs) = compute_dependency_pairs(&alphabet, &[rule1, rule2]);
        assert!(dp_alphabet.contains("f#"));
        assert!(dp_alphabet.contains("g#"));
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].head_name(), "f#");
    }
}
