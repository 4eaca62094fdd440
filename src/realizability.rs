//! The realizability check: does the winning set cover the declared
//! initial states, under one of two regimes for how system initial states
//! are quantified.

use crate::predicate::{Predicate, PredicateLayer};
use crate::spec::CompiledSpec;

/// The regime under which the initial-condition predicate is checked
/// against the winning set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitConstraints {
    /// Realizable iff every state satisfying both initial predicates is
    /// winning: `env_init ∧ sys_init ⟹ W`.
    AllSysInit,
    /// Realizable iff for every environment-initial valuation there
    /// exists a winning system-initial valuation:
    /// `∀env (¬env_init ∨ ∃sys (sys_init ∧ W)) ≡ true`.
    ExistSysInit,
}

/// Checks realizability and returns the winning set on success.
///
/// Returns `Some(W)` if realizable, `None` otherwise (an `Unrealizable`
/// verdict, not an error).
pub fn check(
    predicates: &PredicateLayer,
    spec: &CompiledSpec,
    winning_set: &Predicate,
    mode: InitConstraints,
) -> Option<Predicate> {
    let realizable = match mode {
        InitConstraints::AllSysInit => {
            let init = predicates.and(&spec.env_init, &spec.sys_init);
            predicates.entails(&init, winning_set)
        }
        InitConstraints::ExistSysInit => {
            let sys_winning = predicates.and(&spec.sys_init, winning_set);
            let exists_sys = predicates.exists(&sys_winning, &predicates.sys_cube());
            let not_env_init = predicates.not(&spec.env_init);
            let disjunction = predicates.or(&not_env_init, &exists_sys);
            let forall_env = predicates.forall(&disjunction, &predicates.env_cube());
            forall_env == predicates.truth()
        }
    };
    if realizable {
        Some(winning_set.clone())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{ParseTree, Specification};
    use crate::variables::VariableIndex;
    use crate::fixpoint::compute_winning_set;

    fn var(name: &str) -> ParseTree {
        ParseTree::Variable {
            name: name.to_string(),
            primed: false,
        }
    }

    fn compile(spec: &Specification) -> (PredicateLayer, CompiledSpec) {
        let vars = spec.variable_index();
        let predicates = PredicateLayer::new(vars).unwrap();
        let compiled = CompiledSpec::compile(&predicates, spec).unwrap();
        (predicates, compiled)
    }

    /// S1 — trivial true: realizable under `AllSysInit`.
    #[test]
    fn test_trivial_true_is_realizable() {
        let spec = Specification {
            env_vars: vec![],
            sys_vars: vec!["a".to_string()],
            env_init: ParseTree::truth(),
            sys_init: ParseTree::truth(),
            env_trans: vec![],
            sys_trans: vec![],
            env_goals: vec![],
            sys_goals: vec![var("a")],
        };
        let (predicates, compiled) = compile(&spec);
        let (w, _) = compute_winning_set(&predicates, &compiled).unwrap();
        let result = check(&predicates, &compiled, &w, InitConstraints::AllSysInit);
        assert!(result.is_some());
    }

    /// S2 — unrealizable safety: `sys_init = a`, `sys_trans = !a'`, sole
    /// sys goal `a`. The system commits to `a` initially but can never
    /// set `a'` again, so no strategy can revisit the goal; this must be
    /// unrealizable under `AllSysInit` once the winning set excludes the
    /// states from which revisiting is required.
    #[test]
    fn test_unrealizable_safety() {
        let spec = Specification {
            env_vars: vec![],
            sys_vars: vec!["a".to_string()],
            env_init: ParseTree::truth(),
            sys_init: var("a"),
            env_trans: vec![],
            sys_trans: vec![ParseTree::Not(Box::new(ParseTree::Variable {
                name: "a".to_string(),
                primed: true,
            }))],
            env_goals: vec![],
            sys_goals: vec![var("a")],
        };
        let (predicates, compiled) = compile(&spec);
        let (w, _) = compute_winning_set(&predicates, &compiled).unwrap();
        let result = check(&predicates, &compiled, &w, InitConstraints::AllSysInit);
        assert!(result.is_none());
    }
}
