//! End-to-end termination-proof scenarios, driving the whole pipeline
//! (dependency pairs, polynomial interpretation, HORPO, the SMT/SAT
//! layers) through `afsm_termination::core::driver::prove` with the
//! embedded DPLL solver.

use afsm_termination::core::alphabet::Alphabet;
use afsm_termination::core::driver::{prove, Verdict};
use afsm_termination::core::rules::Rule;
use afsm_termination::core::sat::DpllSatSolver;
use afsm_termination::core::terms::{fresh_var_index, Term};
use afsm_termination::core::types::Type;

fn nat() -> Type {
    Type::base("Nat")
}

fn list() -> Type {
    Type::base("List")
}

/// Scenario 1: first-order Peano addition terminates via a linear
/// polynomial interpretation.
#[test]
fn peano_addition_is_yes() {
    let plus_ty = Type::arrow_many(vec![nat(), nat()], nat());
    let s_ty = Type::arrow(nat(), nat());

    let mut alphabet = Alphabet::new();
    alphabet.declare("0", nat());
    alphabet.declare("s", s_ty.clone());
    alphabet.declare("plus", plus_ty.clone());

    let y = fresh_var_index();
    let base_rule = Rule::new(
        Term::apply_many(Term::constant("plus", plus_ty.clone()), vec![Term::constant("0", nat()), Term::var(y, nat())])
            .unwrap(),
        Term::var(y, nat()),
    )
    .unwrap();

    let x = fresh_var_index();
    let y2 = fresh_var_index();
    let step_lhs = Term::apply_many(Term::constant("plus", plus_ty.clone()), vec![
        Term::apply(Term::constant("s", s_ty.clone()), Term::var(x, nat())).unwrap(),
        Term::var(y2, nat()),
    ])
    .unwrap();
    let step_rhs = Term::apply(
        Term::constant("s", s_ty),
        Term::apply_many(Term::constant("plus", plus_ty), vec![Term::var(x, nat()), Term::var(y2, nat())]).unwrap(),
    )
    .unwrap();
    let step_rule = Rule::new(step_lhs, step_rhs).unwrap();

    let verdict = prove(&alphabet, &[base_rule, step_rule], &DpllSatSolver).unwrap();
    assert!(matches!(verdict, Verdict::Yes { .. }), "expected YES, got {verdict:?}");
}

/// Scenario 3: a single higher-order rule with no recursive structure at
/// all terminates via a polynomial interpretation that adds 1 for the
/// application itself.
#[test]
fn single_application_rule_is_yes() {
    let alpha = Type::fresh_var();
    let arrow = Type::arrow(alpha.clone(), alpha.clone());
    let app_ty = Type::arrow_many(vec![arrow.clone(), alpha.clone()], alpha.clone());

    let mut alphabet = Alphabet::new();
    alphabet.declare("app", app_ty.clone());

    let f = fresh_var_index();
    let x = fresh_var_index();
    let lhs = Term::apply_many(Term::constant("app", app_ty), vec![Term::var(f, arrow.clone()), Term::var(x, alpha.clone())])
        .unwrap();
    let rhs = Term::apply(Term::var(f, arrow), Term::var(x, alpha)).unwrap();
    let rule = Rule::new(lhs, rhs).unwrap();

    let verdict = prove(&alphabet, &[rule], &DpllSatSolver).unwrap();
    assert!(matches!(verdict, Verdict::Yes { .. }), "expected YES, got {verdict:?}");
}

/// Scenario 4: `f(F) => F·(f(F))` loops immediately — the non-terminator
/// must catch it before any SAT call is made.
#[test]
fn self_feeding_rule_is_no() {
    let f_ty = Type::arrow(Type::arrow(nat(), nat()), nat());
    let arrow = Type::arrow(nat(), nat());

    let mut alphabet = Alphabet::new();
    alphabet.declare("f", f_ty.clone());

    let big_f = fresh_var_index();
    let lhs = Term::apply(Term::constant("f", f_ty.clone()), Term::var(big_f, arrow.clone())).unwrap();
    let inner = Term::apply(Term::constant("f", f_ty), Term::var(big_f, arrow.clone())).unwrap();
    let rhs = Term::apply(Term::var(big_f, arrow), inner).unwrap();
    let rule = Rule::new(lhs, rhs).unwrap();

    let verdict = prove(&alphabet, &[rule], &DpllSatSolver).unwrap();
    match verdict {
        Verdict::No { witness } => assert!(witness.contains("loops")),
        other => panic!("expected NO, got {other:?}"),
    }
}

/// Scenario 5: the untyped Ω-combinator body `λx.(x·x)` diverges under
/// self-application, caught by the lambda-embedding detector.
#[test]
fn omega_combinator_body_is_no() {
    let alpha = Type::fresh_var();
    let mut alphabet = Alphabet::new();
    alphabet.declare("omega", alpha.clone());

    let x = fresh_var_index();
    let arrow_alpha = Type::arrow(alpha.clone(), alpha.clone());
    let body = Term::Application {
        func: Box::new(Term::var(x, arrow_alpha.clone())),
        arg: Box::new(Term::var(x, arrow_alpha.clone())),
        ty: alpha.clone(),
    };
    let rhs = Term::lambda(x, arrow_alpha, body);
    let lhs = Term::constant("omega", alpha);
    let rule = Rule { lhs, rhs };

    let verdict = prove(&alphabet, &[rule], &DpllSatSolver).unwrap();
    match verdict {
        Verdict::No { witness } => assert!(witness.contains("self-application")),
        other => panic!("expected NO, got {other:?}"),
    }
}

/// Scenario 6: `f(X) => g(X)`, `g(X) => f(X)` has no strict measure in
/// either direction — no polynomial or precedence orients anything, so
/// the driver must report MAYBE with nothing removed.
#[test]
fn mutual_recursion_with_no_measure_is_maybe() {
    let f_ty = Type::arrow(nat(), nat());
    let g_ty = Type::arrow(nat(), nat());

    let mut alphabet = Alphabet::new();
    alphabet.declare("f", f_ty.clone());
    alphabet.declare("g", g_ty.clone());

    let x1 = fresh_var_index();
    let rule1 = Rule::new(
        Term::apply(Term::constant("f", f_ty.clone()), Term::var(x1, nat())).unwrap(),
        Term::apply(Term::constant("g", g_ty.clone()), Term::var(x1, nat())).unwrap(),
    )
    .unwrap();
    let x2 = fresh_var_index();
    let rule2 = Rule::new(
        Term::apply(Term::constant("g", g_ty), Term::var(x2, nat())).unwrap(),
        Term::apply(Term::constant("f", f_ty), Term::var(x2, nat())).unwrap(),
    )
    .unwrap();

    let verdict = prove(&alphabet, &[rule1, rule2], &DpllSatSolver).unwrap();
    assert!(matches!(verdict, Verdict::Maybe { .. }), "expected MAYBE, got {verdict:?}");
}

/// A smoke test for the list-traversal shape of scenario 2 (higher-order
/// `map`), checked for a sane (non-panicking, terminating or at least
/// non-"NO") answer rather than asserting a specific method wins, since
/// HORPO's precedence search has many equally valid solutions.
#[test]
fn map_over_cons_lists_does_not_panic() {
    let f_to_f = Type::arrow(nat(), nat());
    let map_ty = Type::arrow_many(vec![f_to_f.clone(), list()], list());
    let cons_ty = Type::arrow_many(vec![nat(), list()], list());

    let mut alphabet = Alphabet::new();
    alphabet.declare("nil", list());
    alphabet.declare("cons", cons_ty.clone());
    alphabet.declare("map", map_ty.clone());

    let f1 = fresh_var_index();
    let rule_nil = Rule::new(
        Term::apply_many(Term::constant("map", map_ty.clone()), vec![Term::var(f1, f_to_f.clone()), Term::constant("nil", list())])
            .unwrap(),
        Term::constant("nil", list()),
    )
    .unwrap();

    let f2 = fresh_var_index();
    let x = fresh_var_index();
    let xs = fresh_var_index();
    let lhs = Term::apply_many(Term::constant("map", map_ty.clone()), vec![
        Term::var(f2, f_to_f.clone()),
        Term::apply_many(Term::constant("cons", cons_ty.clone()), vec![Term::var(x, nat()), Term::var(xs, list())]).unwrap(),
    ])
    .unwrap();
    let rhs = Term::apply_many(Term::constant("cons", cons_ty), vec![
        Term::apply(Term::var(f2, f_to_f.clone()), Term::var(x, nat())).unwrap(),
        Term::apply_many(Term::constant("map", map_ty), vec![Term::var(f2, f_to_f), Term::var(xs, list())]).unwrap(),
    ])
    .unwrap();
    let rule_cons = Rule::new(lhs, rhs).unwrap();

    let verdict = prove(&alphabet, &[rule_nil, rule_cons], &DpllSatSolver).unwrap();
    assert!(!matches!(verdict, Verdict::No { .. }), "map/cons recursion should not be reported non-terminating: {verdict:?}");
}
