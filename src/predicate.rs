//! The predicate layer: Boolean predicates over unprimed/primed state
//! variables, compiled from parse trees and combined via the standard
//! Boolean connectives plus quantification, cofactor and substitution.
//!
//! The BDD library (`cudd`) is treated as a black box: this module only
//! ever calls its public operations and never reaches into its internals.

use std::error::Error;
use std::fmt;

use cudd::{Cube, CubeValue, Cudd, CuddError, ReorderingMethod};

use crate::spec::ParseTree;
use crate::variables::{StateVector, VariableIndex};

/// An error from the predicate layer: an unknown variable name encountered
/// while compiling a parse tree, or a failure reported by the underlying
/// BDD library (out-of-memory, a malformed variable map, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredicateError {
    /// `compile` encountered a variable name absent from the variable
    /// index.
    UnknownVariable(String),
    /// The BDD library reported an error.
    Bdd(CuddError),
}

impl fmt::Display for PredicateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownVariable(name) => write!(f, "unknown variable in formula: {}", name),
            Self::Bdd(e) => write!(f, "BDD library error: {}", e),
        }
    }
}

impl Error for PredicateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnknownVariable(_) => None,
            Self::Bdd(e) => Some(e),
        }
    }
}

/// An opaque Boolean function over the `2N` indexed state variables.
/// Reference-counted by the BDD layer; the Rust ownership system releases
/// the underlying handle automatically when the last `Predicate` pointing
/// to it is dropped, which is what removes the need for the matched
/// acquire/release discipline a C implementation would require on every
/// path.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate(cudd::Bdd);

impl Predicate {
    /// Returns the underlying BDD handle.
    pub fn bdd(&self) -> &cudd::Bdd {
        &self.0
    }
}

/// Suspends adaptive BDD reordering for its lifetime, re-enabling it (to
/// [`ReorderingMethod::Same`], i.e. whatever method was previously
/// configured) on drop. Every cube enumeration and "first cube" extraction
/// in this crate is bracketed by one of these, since iterating over a
/// BDD's paths is not reentrant with respect to reordering.
struct AutodynGuard {
    cudd: Cudd,
}

impl AutodynGuard {
    fn new(cudd: &Cudd) -> Self {
        let mut guarded = cudd.clone();
        guarded.autodyn_disable();
        Self { cudd: guarded }
    }
}

impl Drop for AutodynGuard {
    fn drop(&mut self) {
        self.cudd.autodyn_enable(ReorderingMethod::Same);
    }
}

/// The predicate layer: a BDD manager sized for the given variable index,
/// plus the quantification cubes and variable map derived from it.
pub struct PredicateLayer {
    cudd: Cudd,
    vars: VariableIndex,
}

impl PredicateLayer {
    /// Creates a new predicate layer for the given variable index.
    ///
    /// Declares one BDD variable per unprimed and primed index, and
    /// installs the primed/unprimed variable map used by
    /// `substitute_primed`.
    ///
    /// # Errors
    ///
    /// Returns [`PredicateError::Bdd`] if the BDD manager could not be
    /// instantiated.
    pub fn new(vars: VariableIndex) -> Result<Self, PredicateError> {
        let cudd = Cudd::with_vars(vars.total_vars()).map_err(PredicateError::Bdd)?;
        for i in 0..vars.total_vars() {
            let _ = cudd.bdd_var(i);
        }
        let (from, to): (Vec<usize>, Vec<usize>) = vars.primed_variable_map().into_iter().unzip();
        cudd.set_var_map(&from, &to);
        Ok(Self { cudd, vars })
    }

    /// The variable index this layer was constructed with.
    pub fn vars(&self) -> &VariableIndex {
        &self.vars
    }

    /// The constant-true predicate.
    pub fn truth(&self) -> Predicate {
        Predicate(self.cudd.bdd_one())
    }

    /// The constant-false predicate.
    pub fn falsity(&self) -> Predicate {
        Predicate(self.cudd.bdd_zero())
    }

    /// Whether `p` is the constant-false predicate.
    pub fn is_false(&self, p: &Predicate) -> bool {
        p.0.is_zero()
    }

    /// Whether `p` entails `q`, i.e. `p ⟹ q` is a tautology.
    pub fn entails(&self, p: &Predicate, q: &Predicate) -> bool {
        p.0 <= q.0
    }

    /// Compiles a parse tree into a predicate.
    ///
    /// # Errors
    ///
    /// Returns [`PredicateError::UnknownVariable`] if the tree references
    /// a variable absent from this layer's variable index.
    pub fn compile(&self, tree: &ParseTree) -> Result<Predicate, PredicateError> {
        match tree {
            ParseTree::Constant(true) => Ok(self.truth()),
            ParseTree::Constant(false) => Ok(self.falsity()),
            ParseTree::Variable { name, primed } => {
                let index = if *primed {
                    self.vars.primed_index_of(name)
                } else {
                    self.vars.index_of(name)
                };
                let index = index.ok_or_else(|| PredicateError::UnknownVariable(name.clone()))?;
                Ok(Predicate(self.cudd.bdd_var(index)))
            }
            ParseTree::Not(inner) => Ok(self.not(&self.compile(inner)?)),
            ParseTree::And(l, r) => {
                let l = self.compile(l)?;
                let r = self.compile(r)?;
                Ok(self.and(&l, &r))
            }
            ParseTree::Or(l, r) => {
                let l = self.compile(l)?;
                let r = self.compile(r)?;
                Ok(self.or(&l, &r))
            }
            ParseTree::Implies(l, r) => {
                let l = self.compile(l)?;
                let r = self.compile(r)?;
                Ok(self.implies(&l, &r))
            }
            ParseTree::Iff(l, r) => {
                let l = self.compile(l)?;
                let r = self.compile(r)?;
                Ok(self.iff(&l, &r))
            }
        }
    }

    /// Conjunction.
    pub fn and(&self, a: &Predicate, b: &Predicate) -> Predicate {
        Predicate(&a.0 & &b.0)
    }

    /// Disjunction.
    pub fn or(&self, a: &Predicate, b: &Predicate) -> Predicate {
        Predicate(&a.0 | &b.0)
    }

    /// Negation.
    pub fn not(&self, a: &Predicate) -> Predicate {
        Predicate(!&a.0)
    }

    /// Implication, `a ⟹ b`.
    pub fn implies(&self, a: &Predicate, b: &Predicate) -> Predicate {
        self.or(&self.not(a), b)
    }

    /// Equivalence, `a ⟺ b`.
    pub fn iff(&self, a: &Predicate, b: &Predicate) -> Predicate {
        let fwd = self.implies(a, b);
        let bwd = self.implies(b, a);
        self.and(&fwd, &bwd)
    }

    /// Existential abstraction of `p` over the variables selected by
    /// `mask`.
    pub fn exists(&self, p: &Predicate, mask: &Predicate) -> Predicate {
        Predicate(p.0.exists(&mask.0))
    }

    /// Universal abstraction of `p` over the variables selected by `mask`.
    pub fn forall(&self, p: &Predicate, mask: &Predicate) -> Predicate {
        Predicate(p.0.forall(&mask.0))
    }

    /// Restricts `p` by fixing the variables constrained in `cube`.
    pub fn cofactor(&self, p: &Predicate, cube: &Predicate) -> Predicate {
        Predicate(p.0.cofactor(&cube.0))
    }

    /// Swaps every unprimed index of `p` with its primed counterpart.
    pub fn substitute_primed(&self, p: &Predicate) -> Predicate {
        Predicate(p.0.var_map())
    }

    /// Point-evaluates `p` at the given state, treating every primed
    /// position (and any unprimed position beyond `state`'s length) as
    /// irrelevant to the result. `p` must not depend on a variable outside
    /// the ones `state` constrains.
    pub fn eval_state(&self, p: &Predicate, state: &StateVector) -> bool {
        let mut values = vec![false; self.vars.total_vars()];
        for (i, bit) in state.iter().enumerate() {
            values[i] = bit;
        }
        p.0.eval(&values)
    }

    /// The cube of all unprimed environment variables.
    pub fn env_cube(&self) -> Predicate {
        self.cube_over(self.vars.env_range())
    }

    /// The cube of all unprimed system variables.
    pub fn sys_cube(&self) -> Predicate {
        self.cube_over(self.vars.sys_range())
    }

    /// The cube of all primed environment variables.
    pub fn env_prime_cube(&self) -> Predicate {
        self.cube_over(self.vars.env_prime_range())
    }

    /// The cube of all primed system variables.
    pub fn sys_prime_cube(&self) -> Predicate {
        self.cube_over(self.vars.sys_prime_range())
    }

    fn cube_over(&self, range: std::ops::Range<usize>) -> Predicate {
        range
            .map(|i| Predicate(self.cudd.bdd_var(i)))
            .fold(self.truth(), |acc, v| self.and(&acc, &v))
    }

    /// Builds the predicate fixing exactly the given `(index, value)`
    /// pairs and leaving every other index unconstrained ("don't care").
    /// Used to build cofactor keys from concrete state/move assignments.
    pub fn partial_assignment(&self, assignments: &[(usize, bool)]) -> Predicate {
        let mut values = vec![CubeValue::Unspecified; self.vars.total_vars()];
        for &(index, value) in assignments {
            values[index] = if value {
                CubeValue::Set
            } else {
                CubeValue::Unset
            };
        }
        Predicate(self.cudd.cube_to_bdd(&Cube::new(values)))
    }

    /// Builds the cube fixing every unprimed variable to the bits of
    /// `state`.
    pub fn state_cube(&self, state: &StateVector) -> Predicate {
        let assignments: Vec<(usize, bool)> = state.iter().enumerate().collect();
        self.partial_assignment(&assignments)
    }

    /// Builds the cube fixing every unprimed variable to the bits of
    /// `state` and every primed environment variable to the bits of
    /// `env_move`.
    pub fn state_and_env_move_cube(&self, state: &StateVector, env_move: &StateVector) -> Predicate {
        let n = self.vars.num_vars();
        let mut assignments: Vec<(usize, bool)> = state.iter().enumerate().collect();
        assignments.extend(env_move.iter().enumerate().map(|(i, b)| (n + i, b)));
        self.partial_assignment(&assignments)
    }

    /// Iterates over the cubes (each of width `total_vars()`) comprising
    /// `p`, with adaptive reordering suspended for the duration of the
    /// enumeration per the concurrency model's reordering discipline.
    pub fn enumerate_cubes(&self, p: &Predicate) -> Vec<Cube> {
        let _guard = AutodynGuard::new(&self.cudd);
        p.0.cube_iter(self.vars.total_vars()).collect()
    }

    /// Enumerates every concrete unprimed state vector satisfying `p`,
    /// expanding BDD don't-care cubes to the full concrete product via the
    /// don't-care odometer.
    pub fn enumerate_states(&self, p: &Predicate) -> Vec<StateVector> {
        let n = self.vars.num_vars();
        let mut states = Vec::new();
        for cube in self.enumerate_cubes(p) {
            let reference: Vec<CubeValue> = (0..n).map(|i| cube[i]).collect();
            for concrete in DontCareOdometer::new(&reference) {
                states.push(StateVector::new(
                    concrete.iter().map(|v| *v == CubeValue::Set).collect(),
                ));
            }
        }
        states
    }

    /// Enumerates every admissible environment successor `e'` from `state`
    /// under `env_trans`, using the `emoves_len = 1` shortcut when there
    /// are no environment variables at all.
    pub fn env_moves(&self, env_trans: &Predicate, state: &StateVector) -> Vec<StateVector> {
        if self.vars.num_env() == 0 {
            return vec![StateVector::new(vec![])];
        }
        let restricted = self.cofactor(env_trans, &self.state_cube(state));
        let restricted = self.exists(&restricted, &self.sys_prime_cube());
        let num_env = self.vars.num_env();
        let num_vars = self.vars.num_vars();
        let mut moves = Vec::new();
        for cube in self.enumerate_cubes(&restricted) {
            let reference: Vec<CubeValue> =
                (0..num_env).map(|i| cube[num_vars + i]).collect();
            for concrete in DontCareOdometer::new(&reference) {
                moves.push(StateVector::new(
                    concrete.iter().map(|v| *v == CubeValue::Set).collect(),
                ));
            }
        }
        moves
    }

    /// Picks the lexicographically-first concrete system successor
    /// satisfying `p`, reading off the primed system-variable positions.
    ///
    /// `p` must not be the false predicate.
    pub fn first_sys_successor(&self, p: &Predicate) -> StateVector {
        let _guard = AutodynGuard::new(&self.cudd);
        let mut iter = p.0.cube_iter(self.vars.total_vars());
        let cube = iter
            .next()
            .expect("first_sys_successor called on the false predicate");
        let num_vars = self.vars.num_vars();
        let num_env = self.vars.num_env();
        let bits: Vec<bool> = (0..self.vars.num_sys())
            .map(|i| cube[num_vars + num_env + i] == CubeValue::Set)
            .collect();
        StateVector::new(bits)
    }
}

/// Expands the don't-care (`⊥`) positions of a reference cube into every
/// concrete assignment, via a little-endian bit odometer over only the
/// don't-care positions: initialize each to `0`, then repeatedly increment
/// across exactly those positions in order. Preserves gr1c's exact
/// enumeration discipline, on which the concrete order of strategy
/// construction (and the seeded automaton-store test) depends.
struct DontCareOdometer {
    reference: Vec<CubeValue>,
    dont_cares: Vec<usize>,
    index: u64,
    total: u64,
}

impl DontCareOdometer {
    fn new(reference: &[CubeValue]) -> Self {
        let dont_cares: Vec<usize> = reference
            .iter()
            .enumerate()
            .filter(|(_, v)| **v == CubeValue::Unspecified)
            .map(|(i, _)| i)
            .collect();
        let total = 1u64 << dont_cares.len();
        Self {
            reference: reference.to_vec(),
            dont_cares,
            index: 0,
            total,
        }
    }
}

impl Iterator for DontCareOdometer {
    type Item = Vec<CubeValue>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.total {
            return None;
        }
        let mut values = self.reference.clone();
        // `increment_cube` treats the highest-index don't-care position as
        // the least-significant digit, so it is the one that flips first;
        // iterate `dont_cares` high-index-first to match.
        for (bit, &pos) in self.dont_cares.iter().rev().enumerate() {
            let set = (self.index >> bit) & 1 == 1;
            values[pos] = if set { CubeValue::Set } else { CubeValue::Unset };
        }
        self.index += 1;
        Some(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(num_env: usize, num_sys: usize) -> PredicateLayer {
        let env_vars = (0..num_env).map(|i| format!("e{}", i)).collect();
        let sys_vars = (0..num_sys).map(|i| format!("s{}", i)).collect();
        PredicateLayer::new(VariableIndex::new(env_vars, sys_vars)).unwrap()
    }

    #[test]
    fn test_compile_and_combinators() {
        let layer = layer(1, 1);
        let tree = ParseTree::And(
            Box::new(ParseTree::Variable {
                name: "e0".to_string(),
                primed: false,
            }),
            Box::new(ParseTree::Not(Box::new(ParseTree::Variable {
                name: "s0".to_string(),
                primed: false,
            }))),
        );
        let p = layer.compile(&tree).unwrap();
        assert!(layer.eval_state(&p, &StateVector::new(vec![true, false])));
        assert!(!layer.eval_state(&p, &StateVector::new(vec![true, true])));
        assert!(!layer.eval_state(&p, &StateVector::new(vec![false, false])));
    }

    #[test]
    fn test_compile_unknown_variable() {
        let layer = layer(1, 1);
        let tree = ParseTree::Variable {
            name: "zz".to_string(),
            primed: false,
        };
        assert_eq!(
            layer.compile(&tree).unwrap_err(),
            PredicateError::UnknownVariable("zz".to_string())
        );
    }

    #[test]
    fn test_substitute_primed_roundtrip() {
        let layer = layer(0, 1);
        let s0 = layer.compile(&ParseTree::Variable {
            name: "s0".to_string(),
            primed: false,
        }).unwrap();
        let s0_primed = layer.substitute_primed(&s0);
        let s0_back = layer.substitute_primed(&s0_primed);
        assert_eq!(s0, s0_back);
    }

    #[test]
    fn test_exists_forall() {
        let layer = layer(0, 2);
        let s0 = layer.compile(&ParseTree::Variable {
            name: "s0".to_string(),
            primed: false,
        }).unwrap();
        let s1 = layer.compile(&ParseTree::Variable {
            name: "s1".to_string(),
            primed: false,
        }).unwrap();
        let f = layer.and(&s0, &s1);
        let mask = layer.cube_over(0..1);
        assert_eq!(layer.exists(&f, &mask), s1);
    }

    #[test]
    fn test_enumerate_states_expands_dont_cares() {
        let layer = layer(0, 2);
        let states = layer.enumerate_states(&layer.truth());
        assert_eq!(states.len(), 4);
    }

    #[test]
    fn test_env_moves_no_env_vars() {
        let layer = layer(0, 1);
        let moves = layer.env_moves(&layer.truth(), &StateVector::new(vec![true]));
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].len(), 0);
    }

    #[test]
    fn test_dont_care_odometer_order() {
        // Don't-care positions are indices 0 and 2; index 2 (the
        // highest-index don't care) is the least-significant digit and
        // flips first, matching `increment_cube`'s high-to-low iteration.
        let reference = vec![CubeValue::Unspecified, CubeValue::Set, CubeValue::Unspecified];
        let all: Vec<Vec<CubeValue>> = DontCareOdometer::new(&reference).collect();
        assert_eq!(all.len(), 4);
        assert_eq!(
            all[0],
            vec![CubeValue::Unset, CubeValue::Set, CubeValue::Unset]
        );
        assert_eq!(
            all[1],
            vec![CubeValue::Unset, CubeValue::Set, CubeValue::Set]
        );
        assert_eq!(
            all[2],
            vec![CubeValue::Set, CubeValue::Set, CubeValue::Unset]
        );
        assert_eq!(
            all[3],
            vec![CubeValue::Set, CubeValue::Set, CubeValue::Set]
        );
    }
}
