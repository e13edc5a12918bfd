//! Polynomial interpreter (C7): synthesizes a parametric per-symbol
//! interpretation and emits arithmetic atoms (guarded by a propositional
//! condition) for the SMT-over-N layer (C9) to discharge.

use std::collections::{BTreeMap, BTreeSet};

use super::error::{ProverError, Result};
use super::formula::Formula;
use super::ordering_problem::OrderingProblem;
use super::polynomial::Polynomial;
use super::terms::Term;
use super::types::Type;

/// Fresh per-symbol/per-argument interpretation-parameter indices,
/// process-unique like the term/type counters.
static NEXT_POLVAR: std::sync::atomic::AtomicI64 = std::sync::atomic::AtomicI64::new(0);

fn fresh_polvar() -> Polynomial {
    Polynomial::Polvar(NEXT_POLVAR.fetch_add(1, std::sync::atomic::Ordering::Relaxed))
}

pub fn reset_polvar_counter() {
    NEXT_POLVAR.store(0, std::sync::atomic::Ordering::Relaxed);
}

#[derive(Debug, Clone)]
enum ArgShape {
    /// A base-type argument: contributes `coeff * y_i` linearly.
    Base { coeff: Polynomial },
    /// A second-order or higher-order argument: contributes
    /// `coeff * Functional(f_i, placeholders)`, an opaque symbolic value.
    Functional { coeff: Polynomial, placeholder: Polynomial },
}

#[derive(Debug, Clone)]
pub struct Interpretation {
    pub constant: Polynomial,
    args: Vec<ArgShape>,
    /// Cross-term coefficients between base-type argument pairs,
    /// populated only when product terms are enabled.
    cross: Vec<((usize, usize), Polynomial)>,
}

impl Interpretation {
    /// All coefficient polynomial-variables introduced for this symbol
    /// (used by the ordering problem to emit filtering side-constraints:
    /// "if position i is filtered, the total coefficient of y_i is 0").
    pub fn coefficients_for(&self, position: usize) -> Vec<Polynomial> {
        let mut out = Vec::new();
        match &self.args[position] {
            ArgShape::Base { coeff } => out.push(coeff.clone()),
            ArgShape::Functional { coeff, .. } => out.push(coeff.clone()),
        }
        for ((i, j), coeff) in &self.cross {
            if *i == position || *j == position {
                out.push(coeff.clone());
            }
        }
        out
    }
}

/// A guarded arithmetic atom `guard => left >= right`, handed to the SMT
/// layer (C9). An unconditional atom has `guard = Formula::Top`.
#[derive(Debug, Clone)]
pub struct ArithAtom {
    pub left: Polynomial,
    pub right: Polynomial,
    pub guard: Formula,
}

pub struct PolyInterpreterOutput {
    pub interpretations: BTreeMap<String, Interpretation>,
    pub atoms: Vec<ArithAtom>,
}

pub struct PolynomialInterpreter {
    pub allow_products: bool,
}

impl PolynomialInterpreter {
    pub fn new(allow_products: bool) -> Self {
        PolynomialInterpreter { allow_products }
    }

    /// Runs the interpreter over every requirement in `problem`. Aborts
    /// with `ProverError::aborted` (the "not attempted" recoverable
    /// result) if any subterm carries a free type variable.
    pub fn run(&self, problem: &OrderingProblem) -> Result<PolyInterpreterOutput> {
        if !is_monomorphic(problem) {
            return Err(ProverError::aborted("ordering problem is not monomorphic"));
        }

        let mut interpretations = BTreeMap::new();
        for (name, ty) in problem.alphabet.get_all() {
            interpretations.insert(name.clone(), self.synthesize(name, ty));
        }

        let mut atoms = Vec::new();
        for requirement in &problem.requirements {
            let left = interpret_term(&requirement.lhs, &interpretations);
            let right = interpret_term(&requirement.rhs, &interpretations);
            let right_plus_one = Polynomial::sum(vec![right.clone(), Polynomial::Integer(1)]);

            atoms.extend(absolute_geq_atoms(&left, &right_plus_one, Formula::var(requirement.strict_var)));
            atoms.extend(absolute_geq_atoms(&left, &right, Formula::antivar(requirement.strict_var)));
        }

        // Filtering side-constraints (spec.md §4.4): a symbol argument
        // that's filtered away must not influence the interpretation, so
        // every coefficient touching that position is pinned to 0 while
        // its filter variable holds.
        for (name, interp) in &interpretations {
            let Some(fv) = problem.filter_vars.get(name) else { continue };
            for (i, &filtered) in fv.arg_filtered.iter().enumerate() {
                for coeff in interp.coefficients_for(i) {
                    atoms.push(ArithAtom { left: Polynomial::Integer(0), right: coeff.clone(), guard: Formula::var(filtered) });
                    atoms.push(ArithAtom { left: coeff, right: Polynomial::Integer(0), guard: Formula::var(filtered) });
                }
            }
        }

        Ok(PolyInterpreterOutput { interpretations, atoms })
    }

    fn synthesize(&self, _name: &str, ty: &Type) -> Interpretation {
        let (arg_types, _base) = ty.split_arrows();
        let constant = fresh_polvar();
        let mut args = Vec::with_capacity(arg_types.len());
        let mut base_positions = Vec::new();
        for (i, arg_ty) in arg_types.iter().enumerate() {
            if arg_ty.query_composed() {
                args.push(ArgShape::Functional { coeff: fresh_polvar(), placeholder: fresh_polvar() });
            } else {
                args.push(ArgShape::Base { coeff: fresh_polvar() });
                base_positions.push(i);
            }
        }
        let mut cross = Vec::new();
        if self.allow_products {
            for w in base_positions.windows(2) {
                cross.push(((w[0], w[1]), fresh_polvar()));
            }
        }
        Interpretation { constant, args, cross }
    }
}

fn is_monomorphic(problem: &OrderingProblem) -> bool {
    problem
        .requirements
        .iter()
        .all(|r| r.lhs.free_typevar().is_empty() && r.rhs.free_typevar().is_empty())
}

/// `y_v`, the polynomial placeholder standing for the argument variable
/// with index `v`, consistent across one requirement's interpretation.
/// Universally quantified over ℕ — never an existentially-solved
/// coefficient — so it is a `Polynomial::Var`, not a `Polvar`.
fn var_placeholder(index: i64) -> Polynomial {
    Polynomial::Var(index)
}

/// True for the atomic building blocks of a monomial's "variable part":
/// a universally-quantified argument variable, or an opaque functional
/// subterm. Everything else (`Integer`, `Unknown`, `Polvar`) belongs to
/// the monomial's *coefficient*, which the SAT search still solves for
/// existentially.
fn is_variable_part(p: &Polynomial) -> bool {
    matches!(p, Polynomial::Var(_) | Polynomial::Functional { .. })
}

/// Splits one already-flattened product (or bare atom) into its sorted
/// variable-part signature and its coefficient, e.g. `c * y_0 * F(y_1)`
/// becomes `(signature = [y_0, F(y_1)], coefficient = c)`.
fn signature_and_coeff(term: &Polynomial) -> (Vec<Polynomial>, Polynomial) {
    match term {
        Polynomial::Product(factors) => {
            let mut signature = Vec::new();
            let mut coeff_factors = Vec::new();
            for factor in factors {
                if is_variable_part(factor) {
                    signature.push(factor.clone());
                } else {
                    coeff_factors.push(factor.clone());
                }
            }
            signature.sort();
            let coeff = if coeff_factors.is_empty() { Polynomial::one() } else { Polynomial::product(coeff_factors).simplify() };
            (signature, coeff)
        }
        other if is_variable_part(other) => (vec![other.clone()], Polynomial::one()),
        other => (Vec::new(), other.clone()),
    }
}

/// Groups a polynomial's simplified sum-of-monomials form by variable
/// signature, summing the coefficients of every monomial sharing a
/// signature.
fn monomial_map(p: &Polynomial) -> BTreeMap<Vec<Polynomial>, Polynomial> {
    let simplified = p.simplify();
    let addends: Vec<Polynomial> = match simplified {
        Polynomial::Sum(terms) => terms,
        other => vec![other],
    };
    let mut map: BTreeMap<Vec<Polynomial>, Polynomial> = BTreeMap::new();
    for addend in addends {
        let (signature, coeff) = signature_and_coeff(&addend);
        map.entry(signature)
            .and_modify(|existing| *existing = Polynomial::sum(vec![existing.clone(), coeff.clone()]).simplify())
            .or_insert(coeff);
    }
    map
}

/// The "absolute positiveness" comparison (spec.md §4.4): rather than
/// bit-blasting `left >= right` with `left`/`right`'s universally
/// quantified argument variables picked as solver unknowns (which would
/// only check the inequality for *some* value, not all of them), this
/// groups both sides into monomials with identical variable/functional
/// signatures and requires each signature's left coefficient to
/// dominate its right coefficient. Every emitted atom compares only
/// `Polvar`/`Unknown`/`Integer` expressions — no `Var` ever reaches the
/// SMT layer — so proving the (existentially quantified) coefficient
/// inequality is sufficient to prove the (universally quantified)
/// polynomial inequality for every natural-number instantiation.
fn absolute_geq_atoms(left: &Polynomial, right: &Polynomial, guard: Formula) -> Vec<ArithAtom> {
    let left_map = monomial_map(left);
    let right_map = monomial_map(right);
    let mut signatures: BTreeSet<Vec<Polynomial>> = BTreeSet::new();
    signatures.extend(left_map.keys().cloned());
    signatures.extend(right_map.keys().cloned());

    signatures
        .into_iter()
        .map(|signature| {
            let left_coeff = left_map.get(&signature).cloned().unwrap_or_else(Polynomial::zero);
            let right_coeff = right_map.get(&signature).cloned().unwrap_or_else(Polynomial::zero);
            ArithAtom { left: left_coeff, right: right_coeff, guard: guard.clone() }
        })
        .collect()
}

fn interpret_term(term: &Term, table: &BTreeMap<String, Interpretation>) -> Polynomial {
    match term {
        Term::Variable { index, .. } => var_placeholder(*index),
        Term::MetaApplication { metavar, args, .. } => {
            let sub_args: Vec<Polynomial> = args.iter().map(|a| interpret_term(a, table)).collect();
            Polynomial::Functional { name: format!("Z{metavar}"), args: sub_args }
        }
        Term::Abstraction { body, .. } => interpret_term(body, table),
        Term::Constant { name, .. } => interpret_head(name, &[], table),
        Term::Application { .. } => {
            let spine = term.split();
            match spine[0] {
                Term::Constant { name, .. } => {
                    let args: Vec<Polynomial> = spine[1..].iter().map(|t| interpret_term(t, table)).collect();
                    interpret_head(name, &args, table)
                }
                other => {
                    let args: Vec<Polynomial> = spine.iter().map(|t| interpret_term(t, table)).collect();
                    Polynomial::Functional { name: format!("{other}"), args }
                }
            }
        }
    }
}

fn interpret_head(name: &str, args: &[Polynomial], table: &BTreeMap<String, Interpretation>) -> Polynomial {
    let Some(interp) = table.get(name) else {
        return Polynomial::Functional { name: name.to_string(), args: args.to_vec() };
    };
    let mut terms = vec![interp.constant.clone()];
    for (i, arg) in args.iter().enumerate() {
        if let Some(shape) = interp.args.get(i) {
            match shape {
                ArgShape::Base { coeff } => terms.push(Polynomial::product(vec![coeff.clone(), arg.clone()])),
                ArgShape::Functional { coeff, placeholder } => {
                    terms.push(Polynomial::product(vec![
                        coeff.clone(),
                        Polynomial::Functional { name: format!("{name}@{i}"), args: vec![placeholder.clone(), arg.clone()] },
                    ]));
                }
            }
        }
    }
    for ((i, j), coeff) in &interp.cross {
        if let (Some(a), Some(b)) = (args.get(*i), args.get(*j)) {
            terms.push(Polynomial::product(vec![coeff.clone(), a.clone(), b.clone()]));
        }
    }
    Polynomial::sum(terms).simplify()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alphabet::Alphabet;
    use crate::core::formula::Vars;
    use crate::core::terms::fresh_var_index;

    #[test]
    fn synthesizes_linear_interpretation_for_base_symbol() {
        let mut alphabet = Alphabet::new();
        let ty = Type::arrow(Type::base("Nat"), Type::base("Nat"));
        alphabet.declare("s", ty.clone());
        let x = fresh_var_index();
        let rule_lhs = Term::apply(Term::constant("s", ty), Term::var(x, Type::base("Nat"))).unwrap();
        let mut vars = Vars::new();
        let problem = crate::core::ordering_problem::OrderingProblem::plain(
            &alphabet,
            &[crate::core::rules::Rule::new(rule_lhs.clone(), Term::var(x, Type::base("Nat"))).unwrap()],
            &mut vars,
        )
        .unwrap();

        let interpreter = PolynomialInterpreter::new(false);
        let output = interpreter.run(&problem).unwrap();
        assert!(output.interpretations.contains_key("s"));
        // `s(x) = c0 + c1*x` vs `x` has two monomial signatures (the
        // constant term and the `x` term), each compared under both the
        // strict and the weak guard: 2 signatures * 2 guards = 4 atoms.
        assert_eq!(output.atoms.len(), 4);
    }

    #[test]
    fn absolute_geq_compares_matching_signatures_not_substituted_values() {
        // left = 2 + 3*x + 5*y, right = y: the only sound requirement is
        // that y's coefficient (5) dominates 1, and the constant/x
        // coefficients are unconstrained by y's absence on the right —
        // no single witness value for x or y is ever chosen.
        let x = Polynomial::Var(0);
        let y = Polynomial::Var(1);
        let left = Polynomial::sum(vec![
            Polynomial::Integer(2),
            Polynomial::product(vec![Polynomial::Polvar(0), x]),
            Polynomial::product(vec![Polynomial::Integer(5), y.clone()]),
        ]);
        let atoms = absolute_geq_atoms(&left, &y, Formula::Top);
        let y_signature = vec![Polynomial::Var(1)];
        let y_atom = atoms
            .iter()
            .find(|a| monomial_map(&left).contains_key(&y_signature) && a.left == Polynomial::Integer(5) && a.right == Polynomial::Integer(1));
        assert!(y_atom.is_some(), "expected an atom requiring y's coefficient (5) >= 1, got {atoms:?}");
    }

    #[test]
    fn aborts_on_polymorphic_requirement() {
        let mut alphabet = Alphabet::new();
        let alpha = Type::fresh_var();
        alphabet.declare("id", Type::arrow(alpha.clone(), alpha.clone()));
        let x = fresh_var_index();
        let rule = crate::core::rules::Rule::new(
            Term::apply(Term::constant("id", Type::arrow(alpha.clone(), alpha.clone())), Term::var(x, alpha.clone()))
                .unwrap(),
            Term::var(x, alpha),
        )
        .unwrap();
        let mut vars = Vars::new();
        let problem = crate::core::ordering_problem::OrderingProblem::plain(&alphabet, &[rule], &mut vars).unwrap();
        let interpreter = PolynomialInterpreter::new(false);
        assert!(interpreter.run(&problem).is_err());
    }
}
