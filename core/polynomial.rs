//! Polynomial expressions (C5) used by weakly monotonic algebra
//! interpretations: integers, SMT "unknowns", per-symbol coefficient
//! variables, opaque functional terms (for higher-order argument
//! positions), and sum/product/max combinators.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Polynomial {
    Integer(i64),
    /// An as-yet-undetermined natural number, indexed into the SMT layer's
    /// unknown table (C9). Solved for (existentially), same as `Polvar`.
    Unknown(usize),
    /// A per-symbol interpretation-parameter variable (C7 synthesizes
    /// these, one or more per symbol argument position). Solved for
    /// (existentially) by the SAT search, same as `Unknown`.
    Polvar(i64),
    /// A rewrite-rule's own argument variable, universally quantified
    /// over all of ℕ — distinct from `Polvar`/`Unknown`, which are
    /// existentially solved-for coefficients. `Var` is never bit-blasted
    /// directly; C7's absolute-positiveness comparison (`poly_interpreter
    /// ::absolute_geq_atoms`) eliminates it before any atom reaches the
    /// SMT layer, by comparing coefficients of matching monomials rather
    /// than picking one witness value for the variable.
    Var(i64),
    /// An uninterpreted application of `name` to polynomial arguments,
    /// standing in for a higher-order subterm that isn't itself
    /// interpreted numerically.
    Functional { name: String, args: Vec<Polynomial> },
    Sum(Vec<Polynomial>),
    Product(Vec<Polynomial>),
    Max(Vec<Polynomial>),
}

/// The total-order rank used to keep canonical forms stable; variants are
/// declared in rank order so `#[derive(Ord)]` already encodes this, but a
/// named accessor documents the intent (`polynomial.h`'s `query_type`).
fn rank(p: &Polynomial) -> u8 {
    match p {
        Polynomial::Integer(_) => 0,
        Polynomial::Unknown(_) => 1,
        Polynomial::Polvar(_) => 2,
        Polynomial::Var(_) => 3,
        Polynomial::Functional { .. } => 4,
        Polynomial::Max(_) => 5,
        Polynomial::Sum(_) => 6,
        Polynomial::Product(_) => 7,
    }
}

impl Polynomial {
    pub fn zero() -> Polynomial {
        Polynomial::Integer(0)
    }

    pub fn one() -> Polynomial {
        Polynomial::Integer(1)
    }

    pub fn sum(args: Vec<Polynomial>) -> Polynomial {
        Polynomial::Sum(args)
    }

    pub fn product(args: Vec<Polynomial>) -> Polynomial {
        Polynomial::Product(args)
    }

    pub fn max(args: Vec<Polynomial>) -> Polynomial {
        Polynomial::Max(args)
    }

    pub fn query_integer(&self) -> Option<i64> {
        if let Polynomial::Integer(n) = self { Some(*n) } else { None }
    }

    /// Puts the expression in a canonical simplified form: nested
    /// sums/products/maxes flattened, integer constants merged, additive
    /// and multiplicative identities (0 and 1 respectively) dropped,
    /// products distributed over sums, and `Max` arguments deduplicated
    /// and sorted, matching `polynomial.cpp`'s `simplify`.
    pub fn simplify(&self) -> Polynomial {
        match self {
            Polynomial::Integer(_) | Polynomial::Unknown(_) | Polynomial::Polvar(_) | Polynomial::Var(_) => self.clone(),
            Polynomial::Functional { name, args } => Polynomial::Functional {
                name: name.clone(),
                args: args.iter().map(Polynomial::simplify).collect(),
            },
            Polynomial::Sum(children) => simplify_sum(children),
            Polynomial::Product(children) => simplify_product(children),
            Polynomial::Max(children) => simplify_max(children),
        }
    }
}

fn simplify_sum(children: &[Polynomial]) -> Polynomial {
    let mut flat = Vec::new();
    let mut constant = 0i64;
    for c in children {
        flatten_sum(c.simplify(), &mut flat, &mut constant);
    }
    if constant != 0 || flat.is_empty() {
        flat.push(Polynomial::Integer(constant));
    }
    flat.sort_by(|a, b| cmp_poly(a, b));
    match flat.len() {
        0 => Polynomial::Integer(0),
        1 => flat.into_iter().next().unwrap(),
        _ => Polynomial::Sum(flat),
    }
}

fn flatten_sum(p: Polynomial, out: &mut Vec<Polynomial>, constant: &mut i64) {
    match p {
        Polynomial::Integer(0) => {}
        Polynomial::Integer(n) => *constant += n,
        Polynomial::Sum(cs) => {
            for c in cs {
                flatten_sum(c, out, constant);
            }
        }
        other => out.push(other),
    }
}

fn simplify_product(children: &[Polynomial]) -> Polynomial {
    let mut flat = Vec::new();
    let mut constant = 1i64;
    for c in children {
        flatten_product(c.simplify(), &mut flat, &mut constant);
    }
    if constant == 0 {
        return Polynomial::Integer(0);
    }
    if constant != 1 || flat.is_empty() {
        flat.push(Polynomial::Integer(constant));
    }
    // distribute over any remaining Sum factor.
    if let Some(pos) = flat.iter().position(|f| matches!(f, Polynomial::Sum(_))) {
        let Polynomial::Sum(terms) = flat.remove(pos) else { unreachable!() };
        let rest = flat;
        let expanded: Vec<Polynomial> = terms
            .into_iter()
            .map(|term| {
                let mut factors = rest.clone();
                factors.push(term);
                Polynomial::Product(factors).simplify()
            })
            .collect();
        return Polynomial::Sum(expanded).simplify();
    }
    flat.sort_by(|a, b| cmp_poly(a, b));
    match flat.len() {
        0 => Polynomial::Integer(1),
        1 => flat.into_iter().next().unwrap(),
        _ => Polynomial::Product(flat),
    }
}

fn flatten_product(p: Polynomial, out: &mut Vec<Polynomial>, constant: &mut i64) {
    match p {
        Polynomial::Integer(1) => {}
        Polynomial::Integer(n) => *constant *= n,
        Polynomial::Product(cs) => {
            for c in cs {
                flatten_product(c, out, constant);
            }
        }
        other => out.push(other),
    }
}

fn simplify_max(children: &[Polynomial]) -> Polynomial {
    let mut flat = Vec::new();
    for c in children {
        match c.simplify() {
            Polynomial::Max(cs) => flat.extend(cs),
            other => flat.push(other),
        }
    }
    flat.sort_by(|a, b| cmp_poly(a, b));
    flat.dedup();
    match flat.len() {
        0 => Polynomial::Integer(0),
        1 => flat.into_iter().next().unwrap(),
        _ => Polynomial::Max(flat),
    }
}

fn cmp_poly(a: &Polynomial, b: &Polynomial) -> std::cmp::Ordering {
    rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_integer_constants() {
        let p = Polynomial::sum(vec![Polynomial::Integer(2), Polynomial::Integer(3), Polynomial::Polvar(0)]);
        assert_eq!(p.simplify(), Polynomial::Sum(vec![Polynomial::Polvar(0), Polynomial::Integer(5)]));
    }

    #[test]
    fn drops_additive_identity() {
        let p = Polynomial::sum(vec![Polynomial::Integer(0), Polynomial::Polvar(1)]);
        assert_eq!(p.simplify(), Polynomial::Polvar(1));
    }

    #[test]
    fn product_with_zero_factor_is_zero() {
        let p = Polynomial::product(vec![Polynomial::Polvar(0), Polynomial::Integer(0)]);
        assert_eq!(p.simplify(), Polynomial::Integer(0));
    }

    #[test]
    fn distributes_product_over_sum() {
        let p = Polynomial::product(vec![
            Polynomial::Polvar(0),
            Polynomial::sum(vec![Polynomial::Polvar(1), Polynomial::Polvar(2)]),
        ]);
        let simplified = p.simplify();
        assert!(matches!(simplified, Polynomial::Sum(ref cs) if cs.len() == 2));
    }

    #[test]
    fn max_dedupes_equal_arguments() {
        let p = Polynomial::max(vec![Polynomial::Polvar(0), Polynomial::Polvar(0)]);
        assert_eq!(p.simplify(), Polynomial::Polvar(0));
    }
}
