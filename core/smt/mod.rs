//! SMT-over-N layer (C9): simplifies a conjunction of propositional
//! clauses and `L >= R` integer-arithmetic atoms over bounded unknowns,
//! then hands the arithmetic off to the bit-blaster.

pub mod bitblaster;

use std::collections::BTreeMap;

use bitblaster::{EquationOp, MAX_VALUE};

use crate::core::error::{ProverError, Result};
use crate::core::formula::{Formula, Vars};
use crate::core::polynomial::Polynomial;

/// An equation recorded when the preprocessing pass hoists a product or
/// sum of unknowns into a fresh unknown, to be re-verified against the
/// decoded SAT model (`cross-check` in spec.md §4.6).
#[derive(Debug, Clone)]
pub enum Equation {
    Sum(i64, Vec<i64>),
    Product(i64, Vec<i64>),
}

/// A guarded arithmetic atom `guard => left >= right` plus bookkeeping
/// for the ranges of every unknown mentioned across the whole problem.
pub struct Smt {
    ranges: BTreeMap<i64, (i64, i64)>,
    atoms: Vec<(Formula, Polynomial, Polynomial)>,
    equations: Vec<Equation>,
    contradiction: bool,
}

impl Smt {
    pub fn new() -> Self {
        Smt { ranges: BTreeMap::new(), atoms: Vec::new(), equations: Vec::new(), contradiction: false }
    }

    fn range_of(&mut self, id: i64) -> (i64, i64) {
        *self.ranges.entry(id).or_insert((0, MAX_VALUE))
    }

    pub fn add_atom(&mut self, guard: Formula, left: Polynomial, right: Polynomial) {
        self.atoms.push((guard, left.simplify(), right.simplify()));
    }

    /// Runs the unit/obvious/single-side/arithmetic-simplification passes
    /// to a fixed point (spec.md §4.6, steps 1-4).
    pub fn preprocess(&mut self) {
        let mut changed = true;
        let mut iterations = 0;
        while changed && iterations < 64 {
            changed = false;
            iterations += 1;
            changed |= self.unit_propagate();
            changed |= self.obvious_propagate();
            changed |= self.single_side();
            changed |= self.simplify_arithmetic();
        }
    }

    fn ids_in(poly: &Polynomial, out: &mut Vec<i64>) {
        match poly {
            Polynomial::Polvar(i) => out.push(*i),
            Polynomial::Unknown(i) => out.push(*i as i64),
            Polynomial::Functional { args, .. } | Polynomial::Sum(args) | Polynomial::Product(args) | Polynomial::Max(args) => {
                for a in args {
                    Self::ids_in(a, out);
                }
            }
            Polynomial::Integer(_) | Polynomial::Var(_) => {}
        }
    }

    fn unit_propagate(&mut self) -> bool {
        let mut changed = false;
        let mut contradiction = false;
        self.atoms.retain(|(guard, l, r)| {
            if !guard.query_top() {
                return true;
            }
            if let (Some(lv), Some(rv)) = (l.query_integer(), r.query_integer()) {
                if lv < rv {
                    contradiction = true;
                }
                changed = true;
                return false; // decided, drop
            }
            true
        });
        if contradiction {
            self.contradiction = true;
        }
        changed
    }

    fn obvious_propagate(&mut self) -> bool {
        let mut changed = false;
        let mut substitutions: Vec<(i64, i64)> = Vec::new();
        for (guard, l, r) in &self.atoms {
            if !guard.query_top() {
                continue;
            }
            if let Some(n) = l.query_integer() {
                // n >= r, so r's upper bound is at most n.
                if let Some(id) = id_of(r) {
                    let range = self.ranges.entry(id).or_insert((0, MAX_VALUE));
                    if n < range.1 {
                        range.1 = n;
                        changed = true;
                    }
                }
            } else if let Some(n) = r.query_integer() {
                // l >= n, so l's lower bound is at least n.
                if let Some(id) = id_of(l) {
                    let range = self.ranges.entry(id).or_insert((0, MAX_VALUE));
                    if n > range.0 {
                        range.0 = n;
                        changed = true;
                    }
                }
            }
        }
        for (id, range) in self.ranges.iter() {
            if range.0 == range.1 {
                substitutions.push((*id, range.0));
            }
        }
        if !substitutions.is_empty() {
            for (_, l, r) in self.atoms.iter_mut() {
                *l = substitute(l, &substitutions);
                *r = substitute(r, &substitutions);
            }
        }
        changed
    }

    fn single_side(&mut self) -> bool {
        let mut left_only: BTreeMap<i64, bool> = BTreeMap::new();
        let mut right_only: BTreeMap<i64, bool> = BTreeMap::new();
        let mut seen_left = std::collections::HashSet::new();
        let mut seen_right = std::collections::HashSet::new();
        for (_, l, r) in &self.atoms {
            let mut ids = Vec::new();
            Self::ids_in(l, &mut ids);
            for id in ids {
                seen_left.insert(id);
            }
            let mut ids = Vec::new();
            Self::ids_in(r, &mut ids);
            for id in ids {
                seen_right.insert(id);
            }
        }
        for id in seen_left.iter() {
            left_only.insert(*id, !seen_right.contains(id));
        }
        for id in seen_right.iter() {
            right_only.insert(*id, !seen_left.contains(id));
        }
        let mut changed = false;
        let mut subs = Vec::new();
        for (id, only) in left_only {
            if only {
                let (_, max) = self.range_of(id);
                subs.push((id, max));
                changed = true;
            }
        }
        for (id, only) in right_only {
            if only && !subs.iter().any(|(i, _)| *i == id) {
                let (min, _) = self.range_of(id);
                subs.push((id, min));
                changed = true;
            }
        }
        if changed {
            for (_, l, r) in self.atoms.iter_mut() {
                *l = substitute(l, &subs);
                *r = substitute(r, &subs);
            }
        }
        changed
    }

    fn simplify_arithmetic(&mut self) -> bool {
        let mut changed = false;
        for (_, l, r) in self.atoms.iter_mut() {
            let nl = l.simplify();
            let nr = r.simplify();
            if nl != *l || nr != *r {
                changed = true;
            }
            *l = nl;
            *r = nr;
        }
        changed
    }

    /// Ensures every unknown id referenced by an atom or equation has a
    /// range entry, defaulting to `(0, MAX_VALUE)` for anything the
    /// preprocessing passes never touched.
    fn ensure_ranges(&mut self) {
        let mut ids = Vec::new();
        for (_, l, r) in &self.atoms {
            Self::ids_in(l, &mut ids);
            Self::ids_in(r, &mut ids);
        }
        for eq in &self.equations {
            match eq {
                Equation::Sum(result, ops) | Equation::Product(result, ops) => {
                    ids.push(*result);
                    ids.extend(ops.iter().copied());
                }
            }
        }
        for id in ids {
            self.ranges.entry(id).or_insert((0, MAX_VALUE));
        }
    }

    /// Replaces every syntactic product and every sum of ≥2 unknowns with
    /// a fresh unknown, recording the defining equation.
    pub fn hoist(&mut self) {
        let mut equations = Vec::new();
        let mut next_id = self.ranges.keys().copied().max().unwrap_or(-1) + 1;
        let atoms = std::mem::take(&mut self.atoms);
        self.atoms = atoms
            .into_iter()
            .map(|(guard, l, r)| {
                let l = hoist_poly(l, &mut self.ranges, &mut equations, &mut next_id);
                let r = hoist_poly(r, &mut self.ranges, &mut equations, &mut next_id);
                (guard, l, r)
            })
            .collect();
        self.equations.extend(equations);
    }

    pub fn ranges(&self) -> &BTreeMap<i64, (i64, i64)> {
        &self.ranges
    }

    pub fn atoms(&self) -> &[(Formula, Polynomial, Polynomial)] {
        &self.atoms
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    pub fn is_contradictory(&self) -> bool {
        self.contradiction
    }

    /// Encodes every remaining atom and equation into a single
    /// propositional formula over per-unknown bit variables, skipping
    /// atoms whose sides still contain an uninterpreted `Functional` term
    /// (those are HORPO's responsibility, not the arithmetic layer's).
    pub fn encode(&mut self, vars: &mut Vars) -> Result<(Formula, BTreeMap<i64, Vec<usize>>)> {
        if self.contradiction {
            return Ok((Formula::Bottom, BTreeMap::new()));
        }
        self.ensure_ranges();
        let ids: Vec<i64> = self.ranges.keys().copied().collect();
        let ranges: Vec<(i64, i64)> = ids.iter().map(|id| self.ranges[id]).collect();
        let bits = bitblaster::allocate_bits(&ranges, vars);
        let mut bit_table = BTreeMap::new();
        for (id, b) in ids.iter().zip(bits.iter()) {
            bit_table.insert(*id, b.clone());
        }

        let mut clauses = Vec::new();
        for (id, (min, max)) in self.ranges.iter() {
            clauses.push(bitblaster::range_constraint(&bit_table[id], *min, *max));
        }

        for (guard, l, r) in &self.atoms {
            let Some(atom) = self.encode_atom(l, r, &bit_table) else { continue };
            clauses.push(Formula::or(vec![guard.negate(), atom]));
        }

        for eq in &self.equations {
            let (result_id, operand_ids, op) = match eq {
                Equation::Sum(id, ops) => (*id, ops.clone(), EquationOp::Sum),
                Equation::Product(id, ops) => (*id, ops.clone(), EquationOp::Product),
            };
            let Some(result_bits) = bit_table.get(&result_id) else { continue };
            let result_range = self.ranges[&result_id];
            let operand_refs: Option<Vec<(&[usize], i64, i64)>> = operand_ids
                .iter()
                .map(|id| bit_table.get(id).map(|b| (b.as_slice(), self.ranges[id].0, self.ranges[id].1)))
                .collect();
            if let Some(operands) = operand_refs {
                clauses.push(bitblaster::equation_constraint(
                    (result_bits, result_range.0, result_range.1),
                    &operands,
                    op,
                ));
            }
        }

        Ok((Formula::And(clauses), bit_table))
    }

    fn encode_atom(&self, l: &Polynomial, r: &Polynomial, bit_table: &BTreeMap<i64, Vec<usize>>) -> Option<Formula> {
        if contains_functional(l) || contains_functional(r) {
            return None;
        }
        match (l, r) {
            (Polynomial::Integer(a), Polynomial::Integer(b)) => Some(if a >= b { Formula::Top } else { Formula::Bottom }),
            (Polynomial::Integer(k), other) => {
                let id = id_of(other)?;
                let (min, max) = self.ranges[&id];
                Some(bitblaster::constant_geq(&bit_table[&id], min, max, *k))
            }
            (other, Polynomial::Integer(k)) => {
                let id = id_of(other)?;
                let (min, max) = self.ranges[&id];
                Some(bitblaster::geq_constant(&bit_table[&id], min, max, *k))
            }
            _ => {
                let la = id_of(l)?;
                let ra = id_of(r)?;
                let (amin, amax) = self.ranges[&la];
                let (bmin, bmax) = self.ranges[&ra];
                Some(bitblaster::geq_unknown(&bit_table[&la], amin, amax, &bit_table[&ra], bmin, bmax))
            }
        }
    }

    /// Verifies recorded hoisting equations against a decoded model,
    /// flagging anything that isn't overflow-saturation as a solver bug.
    pub fn verify_model(&self, decoded: &BTreeMap<i64, i64>) -> Result<()> {
        for eq in &self.equations {
            let (result, ops, combine): (i64, &[i64], fn(&[i64]) -> i64) = match eq {
                Equation::Sum(r, o) => (*r, o, |vs: &[i64]| vs.iter().sum()),
                Equation::Product(r, o) => (*r, o, |vs: &[i64]| vs.iter().product()),
            };
            let Some(&result_val) = decoded.get(&result) else { continue };
            let operand_vals: Option<Vec<i64>> = ops.iter().map(|id| decoded.get(id).copied()).collect();
            let Some(operand_vals) = operand_vals else { continue };
            let expected = combine(&operand_vals);
            if expected != result_val && expected <= MAX_VALUE {
                return Err(ProverError::internal(format!(
                    "hoisted equation mismatch: expected {expected}, model has {result_val}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for Smt {
    fn default() -> Self {
        Self::new()
    }
}

fn id_of(p: &Polynomial) -> Option<i64> {
    match p {
        Polynomial::Polvar(i) => Some(*i),
        Polynomial::Unknown(i) => Some(*i as i64),
        _ => None,
    }
}

fn substitute(p: &Polynomial, subs: &[(i64, i64)]) -> Polynomial {
    match p {
        Polynomial::Polvar(_) | Polynomial::Unknown(_) => {
            let id = id_of(p).unwrap();
            if let Some((_, v)) = subs.iter().find(|(sid, _)| *sid == id) {
                Polynomial::Integer(*v)
            } else {
                p.clone()
            }
        }
        Polynomial::Functional { name, args } => {
            Polynomial::Functional { name: name.clone(), args: args.iter().map(|a| substitute(a, subs)).collect() }
        }
        Polynomial::Sum(args) => Polynomial::Sum(args.iter().map(|a| substitute(a, subs)).collect()).simplify(),
        Polynomial::Product(args) => Polynomial::Product(args.iter().map(|a| substitute(a, subs)).collect()).simplify(),
        Polynomial::Max(args) => Polynomial::Max(args.iter().map(|a| substitute(a, subs)).collect()).simplify(),
        _ => p.clone(),
    }
}

/// True for a `Functional` subterm or a stray universally-quantified
/// `Var` — both are un-bit-blastable here. `Var` should never actually
/// reach this layer (C7 eliminates it via absolute-positiveness before
/// emitting atoms), but this keeps `encode_atom` from misinterpreting
/// one as an existential unknown if that contract is ever violated.
fn contains_functional(p: &Polynomial) -> bool {
    match p {
        Polynomial::Functional { .. } | Polynomial::Var(_) => true,
        Polynomial::Sum(args) | Polynomial::Product(args) | Polynomial::Max(args) => args.iter().any(contains_functional),
        _ => false,
    }
}

fn hoist_poly(p: Polynomial, ranges: &mut BTreeMap<i64, (i64, i64)>, equations: &mut Vec<Equation>, next_id: &mut i64) -> Polynomial {
    match p {
        Polynomial::Integer(_) | Polynomial::Polvar(_) | Polynomial::Unknown(_) => p,
        Polynomial::Functional { .. } | Polynomial::Var(_) => p,
        Polynomial::Sum(args) => {
            let hoisted: Vec<Polynomial> = args.into_iter().map(|a| hoist_poly(a, ranges, equations, next_id)).collect();
            let ids: Option<Vec<i64>> = hoisted.iter().map(id_of).collect();
            match ids {
                Some(ids) if ids.len() >= 2 => {
                    let min: i64 = ids.iter().map(|i| ranges.get(i).map(|r| r.0).unwrap_or(0)).sum();
                    let max: i64 = ids.iter().map(|i| ranges.get(i).map(|r| r.1).unwrap_or(MAX_VALUE)).sum::<i64>().min(MAX_VALUE);
                    let fresh = *next_id;
                    *next_id += 1;
                    ranges.insert(fresh, (min, max));
                    equations.push(Equation::Sum(fresh, ids));
                    Polynomial::Polvar(fresh)
                }
                _ => Polynomial::Sum(hoisted).simplify(),
            }
        }
        Polynomial::Product(args) => {
            let hoisted: Vec<Polynomial> = args.into_iter().map(|a| hoist_poly(a, ranges, equations, next_id)).collect();
            let ids: Option<Vec<i64>> = hoisted.iter().map(id_of).collect();
            match ids {
                Some(ids) if ids.len() >= 2 => {
                    let min: i64 = ids.iter().map(|i| ranges.get(i).map(|r| r.0).unwrap_or(0)).product();
                    let max: i64 = ids.iter().map(|i| ranges.get(i).map(|r| r.1).unwrap_or(MAX_VALUE)).product::<i64>().min(MAX_VALUE);
                    let fresh = *next_id;
                    *next_id += 1;
                    ranges.insert(fresh, (min, max));
                    equations.push(Equation::Product(fresh, ids));
                    Polynomial::Polvar(fresh)
                }
                _ => Polynomial::Product(hoisted).simplify(),
            }
        }
        Polynomial::Max(args) => Polynomial::Max(args.into_iter().map(|a| hoist_poly(a, ranges, equations, next_id)).collect()).simplify(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_propagate_detects_contradiction() {
        let mut smt = Smt::new();
        smt.add_atom(Formula::Top, Polynomial::Integer(1), Polynomial::Integer(2));
        smt.preprocess();
        assert!(smt.is_contradictory());
    }

    #[test]
    fn obvious_propagate_tightens_range() {
        let mut smt = Smt::new();
        smt.add_atom(Formula::Top, Polynomial::Integer(5), Polynomial::Polvar(0));
        smt.preprocess();
        assert_eq!(smt.ranges().get(&0), Some(&(0, 5)));
    }

    #[test]
    fn hoist_replaces_sum_of_two_unknowns() {
        let mut smt = Smt::new();
        smt.ranges.insert(0, (0, 3));
        smt.ranges.insert(1, (0, 3));
        smt.add_atom(
            Formula::Top,
            Polynomial::Sum(vec![Polynomial::Polvar(0), Polynomial::Polvar(1)]),
            Polynomial::Integer(0),
        );
        smt.hoist();
        assert_eq!(smt.equations().len(), 1);
    }
}
