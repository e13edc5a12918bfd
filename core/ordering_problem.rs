//! Ordering problem (C6): ties rules/dependency-pairs to orient-requirements
//! plus per-symbol argument-filtering propositional variables.
//!
//! `PlainOrdering` and `DPOrdering` are two named constructors on one
//! [`OrderingProblem`] rather than separate types, since they share every
//! field and differ only in how requirements and filterability are
//! seeded (`orderingproblem.cpp`'s single class, two constructors).

use std::collections::BTreeMap;

use super::alphabet::Alphabet;
use super::error::{ProverError, Result};
use super::formula::Vars;
use super::rules::Rule;

/// A requirement `(lhs, rhs, strict_var)`: when `strict_var` holds, the
/// requirement demands `lhs > rhs`; otherwise it demands `lhs >= rhs`.
#[derive(Debug, Clone)]
pub struct OrderRequirement {
    pub lhs: super::terms::Term,
    pub rhs: super::terms::Term,
    pub strict_var: usize,
    /// Whether this requirement must be oriented at all (participates in
    /// the "at least one strict" disjunction) or is merely permitted.
    pub must_orient: bool,
}

impl OrderRequirement {
    /// A requirement that may be oriented either strictly or weakly.
    pub fn geq(lhs: super::terms::Term, rhs: super::terms::Term, vars: &mut Vars) -> OrderRequirement {
        let strict_var = vars.add_vars(1);
        OrderRequirement { lhs, rhs, strict_var, must_orient: false }
    }

    /// A requirement that may additionally be left unoriented entirely
    /// (used for dependency-pair requirements that aren't the one
    /// currently being forced strict).
    pub fn maybe_greater(lhs: super::terms::Term, rhs: super::terms::Term, vars: &mut Vars) -> OrderRequirement {
        let strict_var = vars.add_vars(1);
        OrderRequirement { lhs, rhs, strict_var, must_orient: false }
    }

    pub fn orient_greater(&mut self) {
        self.must_orient = true;
    }

    pub fn orient_geq(&mut self) {
        self.must_orient = true;
    }

    pub fn orient_at_all(&self) -> bool {
        self.must_orient
    }

    /// Forces `strict_var` to `True` in `vars`, committing this
    /// requirement to the strict orientation.
    pub fn force_strict(&self, vars: &mut Vars) {
        vars.force_value(self.strict_var, super::formula::Valuation::True);
    }

    pub fn condition_valuation(&self, vars: &Vars) -> super::formula::Valuation {
        vars.query_value(self.strict_var)
    }
}

/// Whether application is unfilterable (0), subterm-steps are required
/// (1), or strong monotonicity is required (2) for the unfiltered
/// positions of every symbol in this problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfilteredProperties {
    Unfilterable = 0,
    SubtermSteps = 1,
    StrongMonotone = 2,
}

#[derive(Debug, Clone)]
pub struct FilterVars {
    pub symbol_filtered: Option<usize>,
    pub arg_filtered: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct OrderingProblem {
    pub alphabet: Alphabet,
    /// Effective (minimum observed) arity per symbol.
    pub arity: BTreeMap<String, usize>,
    pub filter_vars: BTreeMap<String, FilterVars>,
    pub requirements: Vec<OrderRequirement>,
    pub unfiltered_properties: UnfilteredProperties,
}

impl OrderingProblem {
    /// Every rule becomes a strict-or-weak requirement; nothing is
    /// filterable; at least one requirement must end up strict.
    pub fn plain(alphabet: &Alphabet, rules: &[Rule], vars: &mut Vars) -> Result<OrderingProblem> {
        let arity = observed_arity(rules)?;
        let mut requirements = Vec::new();
        for rule in rules {
            requirements.push(OrderRequirement::geq(rule.lhs.clone(), rule.rhs.clone(), vars));
        }
        Ok(OrderingProblem {
            alphabet: alphabet.clone(),
            arity,
            filter_vars: BTreeMap::new(),
            requirements,
            unfiltered_properties: UnfilteredProperties::Unfilterable,
        })
    }

    /// Dependency pairs get strict-or-weak requirements (one must be
    /// strict across the whole set); the original rules are added as
    /// weak-only requirements (`must_orient = false`, never forced).
    /// Symbols get a filterability block (`filter_vars`), one propositional
    /// variable per argument position.
    pub fn dependency_pairs(
        alphabet: &Alphabet,
        dp_alphabet: &Alphabet,
        pairs: &[Rule],
        rules: &[Rule],
        vars: &mut Vars,
    ) -> Result<OrderingProblem> {
        let arity = observed_arity(pairs)?;
        let mut requirements = Vec::new();
        for pair in pairs {
            requirements.push(OrderRequirement::geq(pair.lhs.clone(), pair.rhs.clone(), vars));
        }
        for rule in rules {
            let mut req = OrderRequirement::geq(rule.lhs.clone(), rule.rhs.clone(), vars);
            req.orient_geq();
            requirements.push(req);
        }

        let mut filter_vars = BTreeMap::new();
        for (name, ty) in dp_alphabet.get_all() {
            if alphabet.contains(name) {
                continue; // only dependency-pair-marked (and argfun) symbols are filterable
            }
            let k = ty.arity();
            let symbol_filtered = Some(vars.add_vars(1));
            let arg_filtered = (0..k).map(|_| vars.add_vars(1)).collect();
            filter_vars.insert(name.clone(), FilterVars { symbol_filtered, arg_filtered });
        }

        Ok(OrderingProblem {
            alphabet: dp_alphabet.clone(),
            arity,
            filter_vars,
            requirements,
            unfiltered_properties: UnfilteredProperties::SubtermSteps,
        })
    }

    /// The propositional index standing for "argument `i` (0-based) of
    /// `f` survives filtering", or `None` if `f` isn't filterable at all
    /// (in which case every argument is unconditionally unfiltered).
    pub fn filtered_variable(&self, f: &str, i: usize) -> Option<usize> {
        self.filter_vars.get(f).and_then(|fv| fv.arg_filtered.get(i).copied())
    }

    pub fn at_least_one_strict(&self) -> Vec<usize> {
        self.requirements.iter().filter(|r| !r.must_orient).map(|r| r.strict_var).collect()
    }
}

/// Detects the effective per-symbol arity as the minimum arity any rule
/// or dependency pair actually applies that symbol with, surfacing a
/// malformed-input error for symbols that never got declared.
fn observed_arity(rules: &[Rule]) -> Result<BTreeMap<String, usize>> {
    let mut arities = std::collections::HashMap::new();
    for rule in rules {
        rule.lhs.adjust_arities(&mut arities);
        rule.rhs.adjust_arities(&mut arities);
    }
    if arities.is_empty() && !rules.is_empty() {
        return Err(ProverError::malformed("rule set has no symbols with observable arity"));
    }
    Ok(arities.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::terms::{fresh_var_index, Term};
    use crate::core::types::Type;

    #[test]
    fn plain_ordering_has_one_requirement_per_rule() {
        let mut alphabet = Alphabet::new();
        let ty = Type::arrow(Type::base("Nat"), Type::base("Nat"));
        alphabet.declare("f", ty.clone());
        let x = fresh_var_index();
        let rule = Rule::new(
            Term::apply(Term::constant("f", ty), Term::var(x, Type::base("Nat"))).unwrap(),
            Term::var(x, Type::base("Nat")),
        )
        .unwrap();
        let mut vars = Vars::new();
        let problem = OrderingProblem::plain(&alphabet, &[rule], &mut vars).unwrap();
        assert_eq!(problem.requirements.len(), 1);
        assert!(problem.filter_vars.is_empty());
    }
}
