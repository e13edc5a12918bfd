//! The HORPO constraint list's record shape (C8): `(lhs, rhs, relation,
//! restriction-term, restriction-num, propositional-var)`.

use crate::core::terms::Term;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorpoRelation {
    Greater,
    Geq,
    GeqStdr,
    GeqFun,
    GeqEta,
    /// Same handler body as `GeqFun` — the original distinguishes a
    /// "marked head" comparison from the direct same-symbol comparison,
    /// but both reduce to the same lexicographic/multiset case split here
    /// (see `DESIGN.md`).
    GeqStat,
    GeqFabs,
    GeqCopy,
    GeqSelect,
    GeqRst,
}

impl std::fmt::Display for HorpoRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HorpoRelation::Greater => ">",
            HorpoRelation::Geq => ">=",
            HorpoRelation::GeqStdr => ">=stdr",
            HorpoRelation::GeqFun => ">=fun",
            HorpoRelation::GeqEta => ">=eta",
            HorpoRelation::GeqStat => ">=stat",
            HorpoRelation::GeqFabs => ">=fabs",
            HorpoRelation::GeqCopy => ">=copy",
            HorpoRelation::GeqSelect => ">=select",
            HorpoRelation::GeqRst => ">=RST",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone)]
pub struct HorpoConstraint {
    pub lhs: Term,
    pub rhs: Term,
    pub relation: HorpoRelation,
    pub restriction_term: Option<Term>,
    pub restriction_num: u32,
    pub prop_var: usize,
    /// Index of the constraint this one was spawned from, for
    /// justification reconstruction; `None` for a top-level requirement.
    pub parent: Option<usize>,
}
