//! The fixpoint engine: the nested GR(1) μ-calculus computation producing
//! the winning set `W` and, as a side product of the middle least
//! fixpoint, the per-sys-goal attractor level-set ladders `Y[i][*]`.

use std::error::Error;
use std::fmt;

use log::{debug, trace};

use crate::cpre::cpre;
use crate::predicate::{Predicate, PredicateError, PredicateLayer};
use crate::spec::CompiledSpec;

/// An error from the fixpoint engine: propagation of a predicate-layer
/// failure encountered during iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixpointError(pub PredicateError);

impl fmt::Display for FixpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fixpoint computation failed: {}", self.0)
    }
}

impl Error for FixpointError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

impl From<PredicateError> for FixpointError {
    fn from(e: PredicateError) -> Self {
        Self(e)
    }
}

/// The ladder of attractor levels for a single system goal,
/// `Y[0] ⊆ Y[1] ⊆ … ⊆ Y[L-1]`, ordered with the first-computed level
/// first (lower index = closer to the goal).
pub type LevelLadder = Vec<Predicate>;

/// Computes the winning set `W` and, for every system goal, its attractor
/// level-set ladder.
///
/// Implements the nested `νZ.⋀μY.⋁νX` fixpoint of the GR(1) formula:
///
/// `W = νZ. ⋀_i μY. ⋁_j νX. (sys_goal_i ∧ CPre(Z)) ∨ CPre(Y) ∨ (¬env_goal_j ∧ CPre(X))`
///
/// computed in the standard nested order (outer greatest over `Z`, middle
/// least over `Y` per sys-goal, innermost greatest over `X` per env-goal),
/// by repeatedly rebuilding the level ladders against the current `Z`
/// until `Z` itself stabilizes.
pub fn compute_winning_set(
    predicates: &PredicateLayer,
    spec: &CompiledSpec,
) -> Result<(Predicate, Vec<LevelLadder>), FixpointError> {
    let mut z = predicates.truth();
    let mut ladders: Vec<LevelLadder> = Vec::new();
    let mut outer_iteration = 0;

    loop {
        outer_iteration += 1;
        trace!("fixpoint: outer iteration {}", outer_iteration);
        ladders = Vec::with_capacity(spec.sys_goals.len());
        let mut goal_levels = Vec::with_capacity(spec.sys_goals.len());

        for (i, sys_goal) in spec.sys_goals.iter().enumerate() {
            let ladder = build_level_ladder(predicates, spec, sys_goal, &z)?;
            trace!("fixpoint: sys goal {} ladder has {} levels", i, ladder.len());
            goal_levels.push(ladder.last().cloned().unwrap_or_else(|| predicates.falsity()));
            ladders.push(ladder);
        }

        let z_new = goal_levels
            .iter()
            .fold(predicates.truth(), |acc, level| predicates.and(&acc, level));

        if z_new == z {
            debug!(
                "fixpoint: winning set converged after {} outer iteration(s)",
                outer_iteration
            );
            break;
        }
        z = z_new;
    }

    Ok((z, ladders))
}

/// Builds the attractor level-set ladder for a single system goal against
/// the current outer iterate `z`.
///
/// `Y[0] = sys_goal ∧ CPre(z)`; `Y[k+1] = Y[k] ∨ ⋁_j X_{j,k}` where
/// `X_{j,k}` is the greatest fixpoint of
/// `X ↦ (sys_goal ∧ CPre(z)) ∨ CPre(Y[k]) ∨ (¬env_goal_j ∧ CPre(X))`.
/// Stops when `Y[k+1] ≡ Y[k]`, dropping the duplicate tail.
///
/// Note the `CPre(z)` rather than bare `z`: during outer iteration `z` has
/// not yet converged, and only at the fixpoint does `CPre(z) ≡ z` hold
/// (property 1, winning-set closure). Once converged the two coincide, so
/// the ladder returned from the final outer iteration is exactly the one
/// the strategy builder needs.
fn build_level_ladder(
    predicates: &PredicateLayer,
    spec: &CompiledSpec,
    sys_goal: &Predicate,
    z: &Predicate,
) -> Result<LevelLadder, FixpointError> {
    let cpre_z = cpre(predicates, &spec.env_trans, &spec.sys_trans, z);
    let base = predicates.and(sys_goal, &cpre_z);
    let mut ladder = vec![base.clone()];

    loop {
        let current = ladder.last().unwrap().clone();
        let cpre_current = cpre(predicates, &spec.env_trans, &spec.sys_trans, &current);

        let mut next = current.clone();
        for env_goal in &spec.env_goals {
            let not_env_goal = predicates.not(env_goal);
            let x = greatest_fixpoint_x(predicates, spec, &base, &cpre_current, &not_env_goal)?;
            next = predicates.or(&next, &x);
        }

        if next == current {
            break;
        }
        ladder.push(next);
    }

    Ok(ladder)
}

/// The innermost greatest fixpoint over `X`:
/// `X ↦ base ∨ cpre_current ∨ (not_env_goal ∧ CPre(X))`, starting from
/// `X = true`.
fn greatest_fixpoint_x(
    predicates: &PredicateLayer,
    spec: &CompiledSpec,
    base: &Predicate,
    cpre_current: &Predicate,
    not_env_goal: &Predicate,
) -> Result<Predicate, FixpointError> {
    let mut x = predicates.truth();
    loop {
        let cpre_x = cpre(predicates, &spec.env_trans, &spec.sys_trans, &x);
        let escape = predicates.and(not_env_goal, &cpre_x);
        let with_base = predicates.or(base, cpre_current);
        let x_new = predicates.or(&with_base, &escape);
        if x_new == x {
            return Ok(x);
        }
        x = x_new;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{ParseTree, Specification};
    use crate::variables::VariableIndex;

    fn compile(spec: &Specification) -> (PredicateLayer, CompiledSpec) {
        let vars = spec.variable_index();
        let predicates = PredicateLayer::new(vars).unwrap();
        let compiled = CompiledSpec::compile(&predicates, spec).unwrap();
        (predicates, compiled)
    }

    fn var(name: &str) -> ParseTree {
        ParseTree::Variable {
            name: name.to_string(),
            primed: false,
        }
    }

    fn var_primed(name: &str) -> ParseTree {
        ParseTree::Variable {
            name: name.to_string(),
            primed: true,
        }
    }

    /// S1 — trivial true: no env vars, one sys var `a`, everything free,
    /// the sole sys goal is `a`. Expect the winning set to be everything.
    #[test]
    fn test_trivial_true_winning_set_is_everything() {
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
        assert_eq!(w, predicates.truth());
        assert_eq!(ladders.len(), 1);
        assert!(predicates.entails(ladders[0].last().unwrap(), &w));
    }

    /// S2 — unrealizable safety: `sys_trans = !a'` forbids the system from
    /// ever choosing `a' = 1`. The winning set is still well-defined (it is
    /// a property of the transition/goal structure, not of the initial
    /// predicate); property 1 must hold for it regardless.
    #[test]
    fn test_unrealizable_safety_ladder_still_computed() {
        let spec = Specification {
            env_vars: vec![],
            sys_vars: vec!["a".to_string()],
            env_init: ParseTree::truth(),
            sys_init: var("a"),
            env_trans: vec![],
            sys_trans: vec![ParseTree::Not(Box::new(var_primed("a")))],
            env_goals: vec![],
            sys_goals: vec![var("a")],
        };
        let (predicates, compiled) = compile(&spec);
        let (w, _ladders) = compute_winning_set(&predicates, &compiled).unwrap();
        // property 1: winning-set closure
        let cpre_w = cpre(&predicates, &compiled.env_trans, &compiled.sys_trans, &w);
        assert_eq!(cpre_w, w);
    }

    /// Universal property 3: level monotonicity.
    #[test]
    fn test_level_monotonicity() {
        let spec = Specification {
            env_vars: vec!["e".to_string()],
            sys_vars: vec!["a".to_string(), "b".to_string()],
            env_init: ParseTree::truth(),
            sys_init: ParseTree::truth(),
            env_trans: vec![],
            sys_trans: vec![],
            env_goals: vec![var("e")],
            sys_goals: vec![var("a"), var("b")],
        };
        let (predicates, compiled) = compile(&spec);
        let (_w, ladders) = compute_winning_set(&predicates, &compiled).unwrap();
        for ladder in &ladders {
            for window in ladder.windows(2) {
                assert!(predicates.entails(&window[0], &window[1]));
            }
        }
    }
}
