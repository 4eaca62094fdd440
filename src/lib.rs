//! `gr1-synth`: a reactive synthesis engine for generalized Rabin(1)
//! (GR(1)) temporal logic specifications.
//!
//! Given an environment/system specification (initial conditions, a safety
//! transition relation, and recurrence goals for each side), decides
//! whether the system has a winning strategy against every admissible
//! environment and, if so, constructs a finite-state strategy automaton
//! realizing one. The specification lexer/parser, debugging dumps and the
//! CLI front end are external collaborators; the BDD library (`cudd`) is
//! treated as a black box.

pub mod cpre;
pub mod fixpoint;
pub mod options;
pub mod predicate;
pub mod realizability;
pub mod spec;
pub mod strategy;
pub mod variables;

use std::error::Error;
use std::fmt;

use log::info;

use fixpoint::{compute_winning_set, FixpointError};
use options::SynthesisOptions;
use predicate::{PredicateError, PredicateLayer};
use realizability::InitConstraints;
use spec::{CompiledSpec, Specification};
use strategy::automaton::StrategyAutomaton;
use strategy::builder::{self, BuilderError};

/// The realizability status for a specification.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Status {
    /// The specification is realizable.
    Realizable,
    /// The specification is unrealizable.
    Unrealizable,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Realizable => "REALIZABLE",
                Self::Unrealizable => "UNREALIZABLE",
            }
        )
    }
}

/// A unified error for the top-level synthesis entry points, wrapping every
/// failure domain from spec.md §7 that is not itself a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    /// The predicate layer failed to compile the specification.
    Predicate(PredicateError),
    /// The fixpoint engine failed during iteration.
    Fixpoint(FixpointError),
    /// The strategy builder hit a fatal invariant violation.
    Builder(BuilderError),
}

impl fmt::Display for SynthesisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Predicate(e) => write!(f, "{}", e),
            Self::Fixpoint(e) => write!(f, "{}", e),
            Self::Builder(e) => write!(f, "{}", e),
        }
    }
}

impl Error for SynthesisError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Predicate(e) => Some(e),
            Self::Fixpoint(e) => Some(e),
            Self::Builder(e) => Some(e),
        }
    }
}

impl From<PredicateError> for SynthesisError {
    fn from(e: PredicateError) -> Self {
        Self::Predicate(e)
    }
}

impl From<FixpointError> for SynthesisError {
    fn from(e: FixpointError) -> Self {
        Self::Fixpoint(e)
    }
}

impl From<BuilderError> for SynthesisError {
    fn from(e: BuilderError) -> Self {
        Self::Builder(e)
    }
}

/// The result of a synthesis run.
pub struct SynthesisResult {
    status: Status,
    automaton: Option<StrategyAutomaton>,
}

impl SynthesisResult {
    /// The realizability status of the specification.
    pub fn status(&self) -> Status {
        self.status
    }

    /// The strategy automaton realizing the specification, if one was
    /// constructed. Absent when the specification is unrealizable, or when
    /// [`SynthesisOptions::only_realizability`] suppressed construction.
    pub fn automaton(&self) -> Option<&StrategyAutomaton> {
        self.automaton.as_ref()
    }
}

/// Synthesizes a winning strategy for `spec`, using the default
/// [`SynthesisOptions`].
///
/// # Errors
///
/// Returns a [`SynthesisError`] if the predicate layer, fixpoint engine or
/// strategy builder fail. An unrealizable specification is not an error:
/// it is reported as `Ok` with [`Status::Unrealizable`].
pub fn synthesize(spec: &Specification) -> Result<SynthesisResult, SynthesisError> {
    synthesize_with(spec, &SynthesisOptions::default())
}

/// Synthesizes a winning strategy for `spec` with the given options.
///
/// # Errors
///
/// See [`synthesize`].
pub fn synthesize_with(
    spec: &Specification,
    options: &SynthesisOptions,
) -> Result<SynthesisResult, SynthesisError> {
    let vars = spec.variable_index();
    let predicates = PredicateLayer::new(vars)?;
    let compiled = CompiledSpec::compile(&predicates, spec)?;

    info!("Computing winning set");
    let (winning_set, level_ladders) = compute_winning_set(&predicates, &compiled)?;

    let init_constraints = options.init_constraints;
    let realizable = realizability::check(&predicates, &compiled, &winning_set, init_constraints);

    match realizable {
        None => {
            info!("Specification is unrealizable");
            Ok(SynthesisResult {
                status: Status::Unrealizable,
                automaton: None,
            })
        }
        Some(winning_set) => {
            info!("Specification is realizable");
            if options.only_realizability {
                Ok(SynthesisResult {
                    status: Status::Realizable,
                    automaton: None,
                })
            } else {
                info!("Constructing strategy automaton");
                let automaton = builder::build(
                    &predicates,
                    &compiled,
                    &winning_set,
                    &level_ladders,
                    init_constraints,
                )?;
                Ok(SynthesisResult {
                    status: Status::Realizable,
                    automaton: Some(automaton),
                })
            }
        }
    }
}
