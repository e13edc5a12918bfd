//! JSON input format: `{"symbols": {name: Type}, "rules": [{"lhs": Term, "rhs": Term}]}`.
//! `Type` and `Term` serialize via their own derived `serde` impls, so the
//! wire shape is exactly their tagged-enum JSON representation — this
//! format is meant for tooling/tests round-tripping the engine's own
//! vocabulary, not as a surface syntax for humans to write by hand.

use serde::{Deserialize, Serialize};

use crate::core::alphabet::Alphabet;
use crate::core::error::{ProverError, Result};
use crate::core::rules::Rule;
use crate::core::terms::Term;
use crate::core::types::Type;

#[derive(Debug, Serialize, Deserialize)]
struct RawRule {
    lhs: Term,
    rhs: Term,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawInput {
    symbols: std::collections::BTreeMap<String, Type>,
    rules: Vec<RawRule>,
}

/// Parses `input` into an `(Alphabet, Vec<Rule>)` pair, validating every
/// rule with [`Rule::new`] as it's built so a malformed rule is reported
/// with the same error kind the core engine itself would raise later.
pub fn parse(input: &str) -> Result<(Alphabet, Vec<Rule>)> {
    let raw: RawInput =
        serde_json::from_str(input).map_err(|e| ProverError::malformed(format!("could not parse input JSON: {e}")))?;

    let mut alphabet = Alphabet::new();
    for (name, ty) in raw.symbols {
        alphabet.declare(name, ty);
    }

    let mut rules = Vec::with_capacity(raw.rules.len());
    for raw_rule in raw.rules {
        rules.push(Rule::new(raw_rule.lhs, raw_rule.rhs)?);
    }

    Ok((alphabet, rules))
}

/// Serializes `(alphabet, rules)` back into the same wire format, mainly
/// useful for round-trip tests and for saving a derived rule set (e.g.
/// the generated dependency pairs) for inspection.
pub fn render(alphabet: &Alphabet, rules: &[Rule]) -> Result<String> {
    let symbols: std::collections::BTreeMap<String, Type> =
        alphabet.get_all().map(|(n, t)| (n.clone(), t.clone())).collect();
    let raw = RawInput {
        symbols,
        rules: rules.iter().map(|r| RawRule { lhs: r.lhs.clone(), rhs: r.rhs.clone() }).collect(),
    };
    serde_json::to_string_pretty(&raw).map_err(|e| ProverError::internal(format!("could not render JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_minimal_rule_set() {
        let mut alphabet = Alphabet::new();
        alphabet.declare("zero", Type::base("Nat"));
        let rules: Vec<Rule> = Vec::new();
        let json = render(&alphabet, &rules).unwrap();
        let (parsed_alphabet, parsed_rules) = parse(&json).unwrap();
        assert!(parsed_alphabet.contains("zero"));
        assert!(parsed_rules.is_empty());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse("not json").is_err());
    }
}
