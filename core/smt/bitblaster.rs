//! Bit-blasting: encodes arithmetic relations over bounded unknowns as
//! propositional formulas over per-unknown bit variables, delegating the
//! actual CNF conversion to [`crate::core::formula::conjunctive_form`]'s
//! Tseitin encoder rather than hand-rolling adder/multiplier gates.
//!
//! Each unknown's value is enumerated over its declared range (capped by
//! [`MAX_BITS`], so at most 256 values), which keeps every encoder a
//! finite disjunction of "these bits spell this value" conjunctions —
//! correct, if not maximally compact, bit-blasting for the module-sized
//! problems this prover targets.

use crate::core::formula::{Formula, Vars};

/// Bits per unknown, plus one overflow bit; module-wide, not configurable
/// (matches `bitblaster.h`'s `MAXBITS 8`).
pub const MAX_BITS: usize = 8;
pub const MAX_VALUE: i64 = (1i64 << MAX_BITS) - 1;

/// Allocates `MAX_BITS + 1` (the extra bit is the overflow flag) fresh
/// propositional variables for each range in `ranges`.
pub fn allocate_bits(ranges: &[(i64, i64)], vars: &mut Vars) -> Vec<Vec<usize>> {
    ranges.iter().map(|_| (0..=MAX_BITS).map(|_| vars.add_vars(1)).collect()).collect()
}

/// The formula asserting that `bits` (MSB-first, plus a trailing overflow
/// bit forced false) spell out exactly `value`.
pub fn value_formula(bits: &[usize], value: i64) -> Formula {
    let mut literals = Vec::with_capacity(bits.len());
    for i in 0..MAX_BITS {
        let set = (value >> (MAX_BITS - 1 - i)) & 1 == 1;
        literals.push(if set { Formula::var(bits[i]) } else { Formula::antivar(bits[i]) });
    }
    literals.push(Formula::antivar(bits[MAX_BITS])); // overflow bit forced false
    Formula::And(literals)
}

/// Reconstructs the integer a decoded SAT model assigns to `bits`
/// (MSB-first, as produced by [`value_formula`]). `model` is indexed by
/// DIMACS variable (1-based); `model[0]` is unused.
pub fn decode_value(bits: &[usize], model: &[bool]) -> i64 {
    let mut value = 0i64;
    for (i, &bit) in bits.iter().take(MAX_BITS).enumerate() {
        if model.get(bit + 1).copied().unwrap_or(false) {
            value |= 1 << (MAX_BITS - 1 - i);
        }
    }
    value
}

/// Asserts that the value encoded by `bits` lies in `[min, max]`.
pub fn range_constraint(bits: &[usize], min: i64, max: i64) -> Formula {
    let options: Vec<Formula> = (min..=max).map(|v| value_formula(bits, v)).collect();
    Formula::Or(options)
}

/// `unknown-bits >= literal`.
pub fn geq_constant(bits: &[usize], min: i64, max: i64, k: i64) -> Formula {
    let options: Vec<Formula> = (min..=max).filter(|v| *v >= k).map(|v| value_formula(bits, v)).collect();
    Formula::Or(options)
}

/// `literal >= unknown-bits`.
pub fn constant_geq(bits: &[usize], min: i64, max: i64, k: i64) -> Formula {
    let options: Vec<Formula> = (min..=max).filter(|v| k >= *v).map(|v| value_formula(bits, v)).collect();
    Formula::Or(options)
}

/// `a-bits >= b-bits`, enumerated over both ranges.
pub fn geq_unknown(a_bits: &[usize], a_min: i64, a_max: i64, b_bits: &[usize], b_min: i64, b_max: i64) -> Formula {
    let mut options = Vec::new();
    for a in a_min..=a_max {
        for b in b_min..=b_max {
            if a >= b {
                options.push(Formula::And(vec![value_formula(a_bits, a), value_formula(b_bits, b)]));
            }
        }
    }
    Formula::Or(options)
}

#[derive(Debug, Clone, Copy)]
pub enum EquationOp {
    Sum,
    Product,
}

/// Asserts `result-bits == op(operand_1, operand_2, ...)`, enumerated
/// over every operand's range. Used to enforce the defining equations
/// recorded when the SMT layer hoists a product/sum into a fresh unknown.
pub fn equation_constraint(
    result: (&[usize], i64, i64),
    operands: &[(&[usize], i64, i64)],
    op: EquationOp,
) -> Formula {
    let (result_bits, result_min, result_max) = result;
    let mut options = Vec::new();
    enumerate_operands(operands, 0, &mut Vec::new(), &mut |values| {
        let combined = match op {
            EquationOp::Sum => values.iter().sum::<i64>(),
            EquationOp::Product => values.iter().product::<i64>(),
        };
        let combined = combined.clamp(result_min, result_max.max(MAX_VALUE));
        if combined < result_min || combined > result_max {
            return;
        }
        let mut conjuncts: Vec<Formula> =
            operands.iter().zip(values.iter()).map(|((bits, _, _), v)| value_formula(bits, *v)).collect();
        conjuncts.push(value_formula(result_bits, combined));
        options.push(Formula::And(conjuncts));
    });
    Formula::Or(options)
}

fn enumerate_operands(
    operands: &[(&[usize], i64, i64)],
    index: usize,
    acc: &mut Vec<i64>,
    emit: &mut dyn FnMut(&[i64]),
) {
    if index == operands.len() {
        emit(acc);
        return;
    }
    let (_, min, max) = operands[index];
    for v in min..=max {
        acc.push(v);
        enumerate_operands(operands, index + 1, acc, emit);
        acc.pop();
    }
}

/// DIMACS CNF, ready for the SAT interface (C10). `num_vars` is the
/// highest variable index used (1-based); `clauses` are lists of signed
/// literals.
#[derive(Debug, Clone, Default)]
pub struct Cnf {
    pub num_vars: usize,
    pub clauses: Vec<Vec<i64>>,
}

impl Cnf {
    pub fn to_dimacs(&self) -> String {
        let mut out = format!("p cnf {} {}\n", self.num_vars, self.clauses.len());
        for clause in &self.clauses {
            let parts: Vec<String> = clause.iter().map(|l| l.to_string()).collect();
            out.push_str(&parts.join(" "));
            out.push_str(" 0\n");
        }
        out
    }
}

/// Converts a simplified CNF `Formula` (`And` of `Or`/literal clauses, as
/// produced by [`crate::core::formula::conjunctive_form`]) into DIMACS,
/// mapping `Vars` index `i` to DIMACS variable `i + 1` (DIMACS variables
/// are 1-based).
pub fn formula_to_cnf(f: &Formula, num_vars: usize) -> Cnf {
    let mut clauses = Vec::new();
    match f {
        Formula::And(cs) => {
            for c in cs {
                push_clause(c, &mut clauses);
            }
        }
        other => push_clause(other, &mut clauses),
    }
    Cnf { num_vars, clauses }
}

fn push_clause(f: &Formula, out: &mut Vec<Vec<i64>>) {
    match f {
        Formula::Or(lits) => {
            let clause: Vec<i64> = lits.iter().map(literal).collect();
            out.push(clause);
        }
        Formula::Top => {}
        Formula::Bottom => out.push(Vec::new()),
        other => out.push(vec![literal(other)]),
    }
}

fn literal(f: &Formula) -> i64 {
    match f {
        Formula::Var(i) => (*i as i64) + 1,
        Formula::AntiVar(i) => -((*i as i64) + 1),
        _ => unreachable!("clause literal must be a (anti-)variable"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_formula_round_trips_through_vars() {
        let mut vars = Vars::new();
        let bits = allocate_bits(&[(0, 10)], &mut vars)[0].clone();
        for i in &bits {
            vars.force_value(*i, crate::core::formula::Valuation::False);
        }
        vars.force_value(*bits.last().unwrap() - 1, crate::core::formula::Valuation::True); // set LSB
        let f = value_formula(&bits, 1).simplify(&vars);
        assert!(f.query_top());
    }

    #[test]
    fn range_constraint_is_satisfiable_disjunction() {
        let mut vars = Vars::new();
        let bits = allocate_bits(&[(2, 4)], &mut vars)[0].clone();
        let f = range_constraint(&bits, 2, 4);
        assert!(matches!(f, Formula::Or(ref options) if options.len() == 3));
    }
}
