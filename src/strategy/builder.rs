//! The strategy builder: forward exploration from the concrete initial
//! states, tracking each reachable state's goal-mode and committing nodes
//! and transitions into a [`StrategyAutomaton`] as it goes.

use std::collections::VecDeque;
use std::error::Error;
use std::fmt;

use crate::fixpoint::LevelLadder;
use crate::predicate::{Predicate, PredicateLayer};
use crate::realizability::InitConstraints;
use crate::spec::CompiledSpec;
use crate::variables::StateVector;

use super::automaton::{NodeIndex, StrategyAutomaton};

/// An error from the strategy builder: a fatal invariant violation, either
/// a state found outside the winning set after a full mode rotation, or an
/// environment move with no admissible system response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuilderError {
    InvariantViolation(String),
}

impl fmt::Display for BuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvariantViolation(msg) => write!(f, "strategy builder invariant violated: {}", msg),
        }
    }
}

impl Error for BuilderError {}

/// Builds the strategy automaton by forward exploration from the concrete
/// initial states, per the level ladders and winning set already computed
/// by the fixpoint engine.
///
/// `level_ladders[i]` must be the attractor ladder for `spec.sys_goals[i]`,
/// in the order returned by [`crate::fixpoint::compute_winning_set`].
pub fn build(
    predicates: &PredicateLayer,
    spec: &CompiledSpec,
    winning_set: &Predicate,
    level_ladders: &[LevelLadder],
    init_constraints: InitConstraints,
) -> Result<StrategyAutomaton, BuilderError> {
    let num_goals = level_ladders.len().max(1);
    let mut automaton = StrategyAutomaton::new();
    let w_primed = predicates.substitute_primed(winning_set);

    let initial_predicate = match init_constraints {
        InitConstraints::AllSysInit => predicates.and(&spec.env_init, &spec.sys_init),
        InitConstraints::ExistSysInit => {
            let init = predicates.and(&spec.env_init, &spec.sys_init);
            predicates.and(&init, winning_set)
        }
    };

    let mut this_stack: VecDeque<(usize, StateVector)> = VecDeque::new();
    let mut next_stack: VecDeque<(usize, StateVector)> = VecDeque::new();

    for state in predicates.enumerate_states(&initial_predicate) {
        let (node, created) = automaton.get_or_insert(0, &state);
        automaton.mark_initial(node);
        if created {
            this_stack.push_back((0, state));
        }
    }

    loop {
        let (loop_mode, state) = match this_stack.pop_front() {
            Some(entry) => entry,
            None if !next_stack.is_empty() => {
                std::mem::swap(&mut this_stack, &mut next_stack);
                continue;
            }
            None => break,
        };

        let (mode, j) = advance_mode(predicates, level_ladders, loop_mode, &state)?;

        let old_node = automaton
            .find(loop_mode, &state)
            .expect("strategy node missing for a previously pushed (mode, state) pair");

        // Strategy commit: reconcile the stale (loop_mode, state) identity
        // under which this entry was pushed with the mode the ladder search
        // just settled on.
        let node = if mode == loop_mode {
            old_node
        } else if let Some(existing) = automaton.find(mode, &state) {
            automaton.delete(old_node, Some(existing));
            existing
        } else {
            let (fresh, _) = automaton.get_or_insert(mode, &state);
            automaton.delete(old_node, Some(fresh));
            fresh
        };

        if !automaton.successors(node).is_empty() {
            // Already expanded via another path.
            continue;
        }

        expand_node(
            predicates,
            spec,
            &w_primed,
            level_ladders,
            &mut automaton,
            &mut next_stack,
            node,
            mode,
            j,
            &state,
            num_goals,
        )?;
    }

    Ok(automaton)
}

/// Finds the smallest `j` such that `eval(Y[mode][j], state)` holds,
/// advancing `mode` (mod the number of sys-goals) when the current mode's
/// ladder has no such level. A smallest true level of `0` means `state`
/// already satisfies `mode`'s own goal, so rather than settling there, mode
/// is advanced to pursue the next goal and the search retries against its
/// ladder — this is what drives mode progress between goals; without it a
/// state already sitting on its current goal would self-loop in that mode
/// forever. Only when a full rotation returns to `loop_mode` without ever
/// landing on a level `>= 1` does the search settle for `(loop_mode, 0)`
/// (every goal is simultaneously satisfied at `state`, e.g. the
/// single-sys-goal case). Fails if a full rotation finds no satisfied
/// level at all, meaning `state` lies outside the winning set.
fn advance_mode(
    predicates: &PredicateLayer,
    level_ladders: &[LevelLadder],
    loop_mode: usize,
    state: &StateVector,
) -> Result<(usize, usize), BuilderError> {
    let num_goals = level_ladders.len();
    let mut mode = loop_mode;
    loop {
        match level_ladders[mode]
            .iter()
            .position(|level| predicates.eval_state(level, state))
        {
            Some(0) => {
                mode = (mode + 1) % num_goals;
                if mode == loop_mode {
                    return Ok((mode, 0));
                }
            }
            Some(j) => return Ok((mode, j)),
            None => {
                mode = (mode + 1) % num_goals;
                if mode == loop_mode {
                    return Err(BuilderError::InvariantViolation(format!(
                        "state {} lies outside the winning set after a full mode rotation starting at mode {}",
                        state, loop_mode
                    )));
                }
            }
        }
    }
}

/// Enumerates every admissible environment move from `state` and commits
/// the resulting successor transitions onto `node`, pushing newly-created
/// successors onto `next_stack`.
#[allow(clippy::too_many_arguments)]
fn expand_node(
    predicates: &PredicateLayer,
    spec: &CompiledSpec,
    w_primed: &Predicate,
    level_ladders: &[LevelLadder],
    automaton: &mut StrategyAutomaton,
    next_stack: &mut VecDeque<(usize, StateVector)>,
    node: NodeIndex,
    mode: usize,
    j: usize,
    state: &StateVector,
    num_goals: usize,
) -> Result<(), BuilderError> {
    let target_level = if j > 0 {
        &level_ladders[mode][j - 1]
    } else {
        &level_ladders[mode][0]
    };
    let target_primed = predicates.substitute_primed(target_level);
    let step_closer = predicates.and(&predicates.and(&spec.sys_trans, w_primed), &target_primed);
    let fallback = predicates.and(&spec.sys_trans, w_primed);

    for env_move in predicates.env_moves(&spec.env_trans, state) {
        let key = predicates.state_and_env_move_cube(state, &env_move);
        let restricted = predicates.cofactor(&step_closer, &key);
        let (successor_formula, next_mode) = if !predicates.is_false(&restricted) {
            let next_mode = if j == 1 { (mode + 1) % num_goals } else { mode };
            (restricted, next_mode)
        } else {
            let fallback_restricted = predicates.cofactor(&fallback, &key);
            if predicates.is_false(&fallback_restricted) {
                return Err(BuilderError::InvariantViolation(format!(
                    "no admissible system successor from state {} under environment move {}",
                    state, env_move
                )));
            }
            (fallback_restricted, mode)
        };

        let succ_sys = predicates.first_sys_successor(&successor_formula);
        let succ_state = env_move.concat(&succ_sys);
        let (succ_node, created) = automaton.get_or_insert(next_mode, &succ_state);
        automaton.append_edge(node, succ_node);
        if created {
            next_stack.push_back((next_mode, succ_state));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixpoint::compute_winning_set;
    use crate::spec::{ParseTree, Specification};
    use crate::variables::VariableIndex;

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

    /// S1 — trivial true: every state is winning, so the builder should
    /// reach a fixed automaton with every initial state represented and no
    /// invariant violation.
    #[test]
    fn test_build_trivial_true_is_total() {
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
        let (w, ladders) = compute_winning_set(&predicates, &compiled).unwrap();
        let automaton = build(
            &predicates,
            &compiled,
            &w,
            &ladders,
            InitConstraints::AllSysInit,
        )
        .unwrap();
        assert_eq!(automaton.initial_nodes().len(), 2);
        for &node in automaton.initial_nodes() {
            assert!(!automaton.successors(node).is_empty());
        }
    }

    /// S2 — unrealizable safety: the sole initial state lies outside the
    /// (empty) winning set, which the builder must report as a fatal
    /// invariant violation rather than silently produce a partial
    /// automaton.
    #[test]
    fn test_build_outside_winning_set_is_fatal() {
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
        let (w, ladders) = compute_winning_set(&predicates, &compiled).unwrap();
        let result = build(
            &predicates,
            &compiled,
            &w,
            &ladders,
            InitConstraints::AllSysInit,
        );
        assert!(matches!(result, Err(BuilderError::InvariantViolation(_))));
    }

    /// Every reachable node in a realizable automaton must have at least
    /// one outgoing edge (universal property: totality of the strategy).
    #[test]
    fn test_every_committed_node_has_a_successor() {
        let spec = Specification {
            env_vars: vec!["e".to_string()],
            sys_vars: vec!["s".to_string()],
            env_init: ParseTree::truth(),
            sys_init: ParseTree::truth(),
            env_trans: vec![],
            sys_trans: vec![ParseTree::Iff(
                Box::new(ParseTree::Variable {
                    name: "s".to_string(),
                    primed: true,
                }),
                Box::new(ParseTree::Variable {
                    name: "e".to_string(),
                    primed: false,
                }),
            )],
            env_goals: vec![],
            sys_goals: vec![var("s")],
        };
        let (predicates, compiled) = compile(&spec);
        let (w, ladders) = compute_winning_set(&predicates, &compiled).unwrap();
        let automaton = build(
            &predicates,
            &compiled,
            &w,
            &ladders,
            InitConstraints::AllSysInit,
        )
        .unwrap();
        assert!(automaton.size() > 0);
        for &node in automaton.initial_nodes() {
            assert!(!automaton.successors(node).is_empty());
        }
    }

    /// Property 8 regression: a two-goal spec whose initial state already
    /// satisfies the first goal (`a`) must still make mode progress instead
    /// of self-looping in mode 0 forever. Starting at `j == 0` for mode 0
    /// must advance to mode 1 before settling, so mode 1 must appear
    /// somewhere among the reachable nodes.
    #[test]
    fn test_initial_state_already_on_goal_still_advances_mode() {
        let spec = Specification {
            env_vars: vec![],
            sys_vars: vec!["a".to_string(), "b".to_string()],
            env_init: ParseTree::truth(),
            sys_init: ParseTree::And(
                Box::new(var("a")),
                Box::new(ParseTree::Not(Box::new(var("b")))),
            ),
            env_trans: vec![],
            sys_trans: vec![ParseTree::Not(Box::new(ParseTree::And(
                Box::new(ParseTree::Variable {
                    name: "a".to_string(),
                    primed: true,
                }),
                Box::new(ParseTree::Variable {
                    name: "b".to_string(),
                    primed: true,
                }),
            )))],
            env_goals: vec![],
            sys_goals: vec![var("a"), var("b")],
        };
        let (predicates, compiled) = compile(&spec);
        let (w, ladders) = compute_winning_set(&predicates, &compiled).unwrap();
        let automaton = build(
            &predicates,
            &compiled,
            &w,
            &ladders,
            InitConstraints::AllSysInit,
        )
        .unwrap();
        let mut seen_modes = std::collections::HashSet::new();
        for &node in automaton.initial_nodes() {
            seen_modes.insert(automaton.key(node).0);
            let mut frontier = vec![node];
            let mut visited = std::collections::HashSet::new();
            while let Some(n) = frontier.pop() {
                if !visited.insert(n) {
                    continue;
                }
                seen_modes.insert(automaton.key(n).0);
                frontier.extend(automaton.successors(n).iter().copied());
            }
        }
        assert!(
            seen_modes.contains(&0) && seen_modes.contains(&1),
            "expected both modes to be reachable, got {:?}",
            seen_modes
        );
    }
}
