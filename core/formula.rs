//! Propositional formulas and the shared `Vars` registry (C4).
//!
//! A single [`Vars`] registry is threaded through one proof attempt
//! (via [`super::context::ProofContext`]) rather than living in a global,
//! as `formula.h`'s `extern Vars vars` does. Index 0 is permanently
//! forced false, index 1 permanently forced true.

use serde::{Deserialize, Serialize};

/// A variable's current truth assignment; `Unknown` means "not yet
/// decided" rather than "false".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Valuation {
    True,
    False,
    Unknown,
}

/// The registry of propositional atoms used across a proof attempt.
/// Index 0 is [`Vars::false_var`], index 1 is [`Vars::true_var`]; both are
/// forced at construction and survive [`Vars::reset`].
#[derive(Debug, Clone)]
pub struct Vars {
    val: Vec<Valuation>,
    descriptions: Vec<Option<String>>,
}

impl Default for Vars {
    fn default() -> Self {
        Self::new()
    }
}

impl Vars {
    pub fn new() -> Self {
        let mut vars = Vars { val: Vec::new(), descriptions: Vec::new() };
        vars.val.push(Valuation::False);
        vars.descriptions.push(Some("false".to_string()));
        vars.val.push(Valuation::True);
        vars.descriptions.push(Some("true".to_string()));
        vars
    }

    pub fn query_size(&self) -> usize {
        self.val.len()
    }

    pub fn query_value(&self, index: usize) -> Valuation {
        self.val.get(index).copied().unwrap_or(Valuation::Unknown)
    }

    pub fn force_value(&mut self, index: usize, value: Valuation) {
        if index >= self.val.len() {
            self.add_vars(index + 1 - self.val.len());
        }
        self.val[index] = value;
    }

    /// Allocates `number` fresh, `Unknown`-valued atoms and returns the
    /// index of the first one.
    pub fn add_vars(&mut self, number: usize) -> usize {
        let start = self.val.len();
        for _ in 0..number {
            self.val.push(Valuation::Unknown);
            self.descriptions.push(None);
        }
        start
    }

    pub fn set_description(&mut self, index: usize, desc: impl Into<String>) {
        if index < self.descriptions.len() {
            self.descriptions[index] = Some(desc.into());
        }
    }

    pub fn query_description(&self, index: usize) -> Option<&str> {
        self.descriptions.get(index).and_then(|d| d.as_deref())
    }

    pub fn has_description(&self, index: usize) -> bool {
        self.query_description(index).is_some()
    }

    pub fn true_var(&self) -> usize {
        1
    }

    pub fn false_var(&self) -> usize {
        0
    }

    /// Empties the registry, preserving only the forced true/false atoms.
    pub fn reset(&mut self) {
        self.val.truncate(2);
        self.descriptions.truncate(2);
    }

    /// Resets every non-forced atom's valuation to `Unknown`, keeping the
    /// atoms themselves (and their descriptions) registered.
    pub fn reset_valuation(&mut self) {
        for v in self.val.iter_mut().skip(2) {
            *v = Valuation::Unknown;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Formula {
    Top,
    Bottom,
    Var(usize),
    AntiVar(usize),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Not(Box<Formula>),
}

impl Formula {
    pub fn var(index: usize) -> Formula {
        Formula::Var(index)
    }

    pub fn antivar(index: usize) -> Formula {
        Formula::AntiVar(index)
    }

    pub fn and(children: Vec<Formula>) -> Formula {
        Formula::And(children)
    }

    pub fn or(children: Vec<Formula>) -> Formula {
        Formula::Or(children)
    }

    pub fn query_top(&self) -> bool {
        matches!(self, Formula::Top)
    }

    pub fn query_bottom(&self) -> bool {
        matches!(self, Formula::Bottom)
    }

    pub fn query_variable(&self) -> bool {
        matches!(self, Formula::Var(_))
    }

    pub fn query_antivariable(&self) -> bool {
        matches!(self, Formula::AntiVar(_))
    }

    /// The negation of this formula, preferring `AntiVar`/De Morgan
    /// rewriting over wrapping in `Not`.
    pub fn negate(&self) -> Formula {
        match self {
            Formula::Top => Formula::Bottom,
            Formula::Bottom => Formula::Top,
            Formula::Var(i) => Formula::AntiVar(*i),
            Formula::AntiVar(i) => Formula::Var(*i),
            Formula::And(children) => Formula::Or(children.iter().map(Formula::negate).collect()),
            Formula::Or(children) => Formula::And(children.iter().map(Formula::negate).collect()),
            Formula::Not(inner) => (**inner).clone(),
        }
    }

    /// Puts the formula in a standard form: no `Not`, flattened/sorted
    /// `And`/`Or`, atoms forced by `vars`' current valuation propagated
    /// to `Top`/`Bottom`, and direct contradictions/tautologies collapsed.
    /// Idempotent: simplifying an already-simplified formula is a no-op.
    pub fn simplify(&self, vars: &Vars) -> Formula {
        match self {
            Formula::Top => Formula::Top,
            Formula::Bottom => Formula::Bottom,
            Formula::Var(i) => match vars.query_value(*i) {
                Valuation::True => Formula::Top,
                Valuation::False => Formula::Bottom,
                Valuation::Unknown => Formula::Var(*i),
            },
            Formula::AntiVar(i) => match vars.query_value(*i) {
                Valuation::True => Formula::Bottom,
                Valuation::False => Formula::Top,
                Valuation::Unknown => Formula::AntiVar(*i),
            },
            Formula::Not(inner) => inner.negate().simplify(vars),
            Formula::And(children) => {
                let mut flat = Vec::new();
                for c in children {
                    flatten_into(c.simplify(vars), &mut flat, true);
                }
                if flat.iter().any(Formula::query_bottom) || has_contradiction(&flat) {
                    return Formula::Bottom;
                }
                flat.retain(|c| !c.query_top());
                flat.sort();
                flat.dedup();
                match flat.len() {
                    0 => Formula::Top,
                    1 => flat.into_iter().next().unwrap(),
                    _ => Formula::And(flat),
                }
            }
            Formula::Or(children) => {
                let mut flat = Vec::new();
                for c in children {
                    flatten_into(c.simplify(vars), &mut flat, false);
                }
                if flat.iter().any(Formula::query_top) || has_contradiction(&flat) {
                    return Formula::Top;
                }
                flat.retain(|c| !c.query_bottom());
                flat.sort();
                flat.dedup();
                match flat.len() {
                    0 => Formula::Bottom,
                    1 => flat.into_iter().next().unwrap(),
                    _ => Formula::Or(flat),
                }
            }
        }
    }
}

fn flatten_into(f: Formula, out: &mut Vec<Formula>, into_and: bool) {
    match (&f, into_and) {
        (Formula::And(cs), true) => out.extend(cs.iter().cloned()),
        (Formula::Or(cs), false) => out.extend(cs.iter().cloned()),
        _ => out.push(f),
    }
}

/// True if `children` contains both `Var(i)` and `AntiVar(i)` for some
/// `i`: a contradiction inside an `And`, a tautology inside an `Or`.
fn has_contradiction(children: &[Formula]) -> bool {
    let positives: std::collections::HashSet<usize> =
        children.iter().filter_map(|c| if let Formula::Var(i) = c { Some(*i) } else { None }).collect();
    children.iter().any(|c| matches!(c, Formula::AntiVar(i) if positives.contains(i)))
}

/// Introduces a fresh atom per compound subformula with defining clauses
/// in both directions (`atom <=> subformula`), the standard Tseitin
/// transform; matches `formula.h`'s documented CNF contract while always
/// emitting the "negation-relevant" biconditional guard rather than only
/// the one-directional implication the original uses when it can prove
/// the direction is unneeded.
fn tseitin(f: &Formula, vars: &mut Vars, clauses: &mut Vec<Formula>) -> Formula {
    match f {
        Formula::Top | Formula::Bottom | Formula::Var(_) | Formula::AntiVar(_) => f.clone(),
        Formula::Not(inner) => tseitin(&inner.negate(), vars, clauses),
        Formula::And(children) => {
            let lits: Vec<Formula> = children.iter().map(|c| tseitin(c, vars, clauses)).collect();
            let atom = Formula::Var(vars.add_vars(1));
            for lit in &lits {
                clauses.push(Formula::or(vec![atom.negate(), lit.clone()]));
            }
            let mut all_false = vec![atom.clone()];
            all_false.extend(lits.iter().map(Formula::negate));
            clauses.push(Formula::or(all_false));
            atom
        }
        Formula::Or(children) => {
            let lits: Vec<Formula> = children.iter().map(|c| tseitin(c, vars, clauses)).collect();
            let atom = Formula::Var(vars.add_vars(1));
            let mut any_true = vec![atom.negate()];
            any_true.extend(lits.iter().cloned());
            clauses.push(Formula::or(any_true));
            for lit in &lits {
                clauses.push(Formula::or(vec![lit.negate(), atom.clone()]));
            }
            atom
        }
    }
}

/// Rewrites `f` to conjunctive normal form: `A1 /\ ... /\ An`, each `Ai`
/// a disjunction of distinct atoms/antivariables.
pub fn conjunctive_form(f: &Formula, vars: &mut Vars) -> Formula {
    let simplified = f.simplify(vars);
    let mut clauses = Vec::new();
    let root = tseitin(&simplified, vars, &mut clauses);
    clauses.push(root);
    Formula::And(clauses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vars_reserves_false_and_true() {
        let vars = Vars::new();
        assert_eq!(vars.query_value(vars.false_var()), Valuation::False);
        assert_eq!(vars.query_value(vars.true_var()), Valuation::True);
    }

    #[test]
    fn reset_preserves_reserved_atoms() {
        let mut vars = Vars::new();
        vars.add_vars(5);
        vars.reset();
        assert_eq!(vars.query_size(), 2);
    }

    #[test]
    fn negate_prefers_antivar_over_not() {
        let f = Formula::var(3);
        assert_eq!(f.negate(), Formula::antivar(3));
    }

    #[test]
    fn simplify_collapses_forced_atoms() {
        let mut vars = Vars::new();
        let idx = vars.add_vars(1);
        vars.force_value(idx, Valuation::True);
        let f = Formula::And(vec![Formula::var(idx), Formula::var(vars.true_var())]);
        assert_eq!(f.simplify(&vars), Formula::Top);
    }

    #[test]
    fn simplify_detects_contradiction() {
        let vars = Vars::new();
        let f = Formula::And(vec![Formula::var(5), Formula::antivar(5)]);
        assert_eq!(f.simplify(&vars), Formula::Bottom);
    }

    #[test]
    fn conjunctive_form_is_flat_and_of_or() {
        let mut vars = Vars::new();
        let a = vars.add_vars(1);
        let b = vars.add_vars(1);
        let f = Formula::Or(vec![
            Formula::And(vec![Formula::var(a), Formula::var(b)]),
            Formula::var(a),
        ]);
        let cnf = conjunctive_form(&f, &mut vars);
        let Formula::And(clauses) = cnf else { panic!("expected And") };
        for clause in &clauses {
            assert!(matches!(clause, Formula::Or(_) | Formula::Var(_) | Formula::AntiVar(_) | Formula::Top | Formula::Bottom));
        }
    }
}
