//! The controllable-predecessor modal operator `CPre`.

use crate::predicate::{Predicate, PredicateLayer};

/// Computes `CPre(target)`: the set of states from which the system can
/// force the successor into `target` against every admissible
/// environment move.
///
/// `CPre(C) = forall_{env'} ( env_trans ⟹ exists_{sys'} ( sys_trans ∧ substitute_primed(C) ) )`
pub fn cpre(
    predicates: &PredicateLayer,
    env_trans: &Predicate,
    sys_trans: &Predicate,
    target: &Predicate,
) -> Predicate {
    let target_primed = predicates.substitute_primed(target);
    let reachable = predicates.and(sys_trans, &target_primed);
    let exists_sys_prime = predicates.exists(&reachable, &predicates.sys_prime_cube());
    let implication = predicates.implies(env_trans, &exists_sys_prime);
    predicates.forall(&implication, &predicates.env_prime_cube())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ParseTree;
    use crate::variables::VariableIndex;

    fn make(num_env: usize, num_sys: usize) -> PredicateLayer {
        let env_vars = (0..num_env).map(|i| format!("e{}", i)).collect();
        let sys_vars = (0..num_sys).map(|i| format!("s{}", i)).collect();
        PredicateLayer::new(VariableIndex::new(env_vars, sys_vars)).unwrap()
    }

    #[test]
    fn test_cpre_true_is_true() {
        let predicates = make(1, 1);
        let target = predicates.truth();
        let env_trans = predicates.truth();
        let sys_trans = predicates.truth();
        assert_eq!(cpre(&predicates, &env_trans, &sys_trans, &target), predicates.truth());
    }

    #[test]
    fn test_cpre_monotone() {
        let predicates = make(0, 1);
        let env_trans = predicates.truth();
        let sys_trans = predicates.truth();
        let s0 = predicates
            .compile(&ParseTree::Variable {
                name: "s0".to_string(),
                primed: false,
            })
            .unwrap();
        let s0_primed_target = predicates
            .compile(&ParseTree::Variable {
                name: "s0".to_string(),
                primed: true,
            })
            .unwrap();
        // sys_trans = true, so from any state the system can pick s' freely:
        // CPre(s0) should be true, since the system can always choose s' = 1.
        let _ = s0_primed_target;
        let c = cpre(&predicates, &env_trans, &sys_trans, &s0);
        assert_eq!(c, predicates.truth());
    }
}
