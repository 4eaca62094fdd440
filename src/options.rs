//! Options for the synthesis procedure and for the command-line front end.

use clap::Clap;

use crate::realizability::InitConstraints;

/// Implement [`Display`](std::fmt::Display) with the information in [`clap::ArgEnum`].
///
/// This ensures consistent names for parsing of the default argument.
macro_rules! clap_display {
    ($t:ty) => {
        impl std::fmt::Display for $t
        where
            $t: clap::ArgEnum,
        {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                use clap::ArgEnum as _;
                let self_str = Self::VARIANTS
                    .iter()
                    .find(|s| &Self::from_str(s, false).unwrap() == self)
                    .unwrap();
                write!(f, "{}", self_str)
            }
        }
    };
}

/// The trace level / verbosity for the logging framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Clap)]
pub enum TraceLevel {
    /// Turn logging off.
    #[clap(name = "off")]
    Off,
    /// Only print errors.
    #[clap(name = "error")]
    Error,
    /// Print errors and warnings.
    #[clap(name = "warn")]
    Warn,
    /// Print errors, warnings and useful information.
    #[clap(name = "info")]
    Info,
    /// Print errors, warnings, useful and debug information.
    #[clap(name = "debug")]
    Debug,
    /// Print all information, including very verbose output.
    #[clap(name = "trace")]
    Trace,
}
impl Default for TraceLevel {
    fn default() -> Self {
        Self::Error
    }
}
clap_display!(TraceLevel);

impl From<TraceLevel> for log::LevelFilter {
    fn from(level: TraceLevel) -> Self {
        match level {
            TraceLevel::Off => Self::Off,
            TraceLevel::Error => Self::Error,
            TraceLevel::Warn => Self::Warn,
            TraceLevel::Info => Self::Info,
            TraceLevel::Debug => Self::Debug,
            TraceLevel::Trace => Self::Trace,
        }
    }
}

/// The regime under which initial states are checked against the winning
/// set; exposed on the CLI as `--init`, mirroring
/// [`InitConstraints`](crate::realizability::InitConstraints) since that
/// enum is otherwise never chosen by the CLI surface spec.md §6 describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Clap)]
pub enum InitMode {
    /// Realizable iff every state satisfying both initial predicates wins:
    /// `env_init ∧ sys_init ⟹ W`.
    #[clap(name = "all")]
    All,
    /// Realizable iff every environment-initial valuation has a winning
    /// system-initial response.
    #[clap(name = "exist")]
    Exist,
}
impl Default for InitMode {
    fn default() -> Self {
        Self::All
    }
}
clap_display!(InitMode);

impl From<InitMode> for InitConstraints {
    fn from(mode: InitMode) -> Self {
        match mode {
            InitMode::All => Self::AllSysInit,
            InitMode::Exist => Self::ExistSysInit,
        }
    }
}

/// Options for the synthesis procedure, usable directly as a library
/// without going through the CLI.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisOptions {
    /// The regime under which initial states are checked against the
    /// winning set.
    pub init_constraints: InitConstraints,
    /// Only check realizability; do not construct a strategy automaton.
    pub only_realizability: bool,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            init_constraints: InitConstraints::AllSysInit,
            only_realizability: false,
        }
    }
}

/// Command-line arguments for the `gr1-synth` binary.
///
/// Per spec.md §6: a single optional positional input file (stdin if
/// absent), `-h` usage, and `-p` to echo the parsed problem without
/// synthesizing. The only knob beyond that literal surface is `--init`,
/// since otherwise [`InitConstraints::ExistSysInit`] could never be
/// selected from the command line.
#[derive(Debug, Clone, Clap)]
#[clap(version, about)]
pub struct CliOptions {
    /// The specification file to read. Reads from stdin if absent.
    #[clap(name = "FILE")]
    pub input_file: Option<String>,
    /// Echo the parsed problem (variable lists with indices, init/trans/
    /// goal formulas) and exit without synthesizing.
    #[clap(short = 'p', long = "print", about = "Echo the parsed problem and exit")]
    pub print_only: bool,
    /// Only check realizability; do not construct or print a strategy.
    #[clap(short = 'r', long = "realizability", about = "Only check realizability")]
    pub only_realizability: bool,
    /// The regime under which initial states are checked against the
    /// winning set.
    #[clap(
        arg_enum,
        long = "init",
        name = "regime",
        default_value,
        about = "Realizability regime: 'all' system-initial states must win, \
        or there must 'exist' one for every environment-initial state"
    )]
    pub init_mode: InitMode,
    /// The trace level to use for instantiating the logging framework.
    #[clap(
        arg_enum,
        short = 't',
        long = "trace",
        name = "trace-level",
        default_value,
        about = "Trace level"
    )]
    pub trace_level: TraceLevel,
}

impl From<&CliOptions> for SynthesisOptions {
    fn from(options: &CliOptions) -> Self {
        Self {
            init_constraints: options.init_mode.into(),
            only_realizability: options.only_realizability,
        }
    }
}
