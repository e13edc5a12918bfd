//! Justification reconstruction: walks a [`HorpoConstraint`] list back
//! from a strictly-oriented requirement to the chain of relations that
//! proved it, producing a small numbered subproof tree.

use crate::core::formula::Vars;
use crate::core::terms::Environment;

use super::constraints::HorpoConstraint;

#[derive(Debug, Clone)]
pub struct JustificationNode {
    pub step: usize,
    pub relation: String,
    pub lhs: String,
    pub rhs: String,
    pub children: Vec<JustificationNode>,
}

/// Reconstructs the subproof tree rooted at `root`, following `parent`
/// links among constraints whose `prop_var` is `True` under `vars`.
pub fn reconstruct(constraints: &[HorpoConstraint], root: usize, vars: &Vars) -> JustificationNode {
    let mut env = Environment::new();
    build(constraints, root, vars, &mut env)
}

fn build(constraints: &[HorpoConstraint], idx: usize, vars: &Vars, env: &mut Environment) -> JustificationNode {
    let c = &constraints[idx];
    let children: Vec<JustificationNode> = constraints
        .iter()
        .enumerate()
        .filter(|(_, child)| child.parent == Some(idx) && vars.query_value(child.prop_var) == crate::core::formula::Valuation::True)
        .map(|(i, _)| build(constraints, i, vars, env))
        .collect();
    JustificationNode {
        step: idx,
        relation: c.relation.to_string(),
        lhs: c.lhs.to_string_env(env),
        rhs: c.rhs.to_string_env(env),
        children,
    }
}

/// Renders the tree as indented plain text, numbering each step.
pub fn render_plain(node: &JustificationNode, depth: usize) -> String {
    let indent = "  ".repeat(depth);
    let mut out = format!("{indent}{}. {} {} {}\n", node.step, node.lhs, node.relation, node.rhs);
    for child in &node.children {
        out.push_str(&render_plain(child, depth + 1));
    }
    out
}
