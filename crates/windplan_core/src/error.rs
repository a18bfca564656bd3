use std::fmt;

/// Errors raised by the distribution sampling layer
#[derive(Debug, Clone, PartialEq)]
pub enum SamplingError {
    /// A settings object requested a distribution kind the kernel does not implement
    UnsupportedKind(String),
    /// A rand_distr constructor rejected the supplied parameters
    InvalidParameters {
        kind: &'static str,
        reason: &'static str,
    },
}

impl fmt::Display for SamplingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingError::UnsupportedKind(kind) => {
                write!(f, "unsupported distribution kind {kind:?}")
            }
            SamplingError::InvalidParameters { kind, reason } => {
                write!(f, "invalid {kind} parameters: {reason}")
            }
        }
    }
}

impl std::error::Error for SamplingError {}

/// Errors a domain module can raise for a single trial.
///
/// These are recovered by the engine: the offending (module, trial) pair is
/// recorded as an error marker and the run continues.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleError {
    Sampling(SamplingError),
    /// A module needed another module's same-trial output and it was absent
    MissingUpstream {
        module: &'static str,
        series: &'static str,
    },
    /// Two annual series that must align had different lengths
    SeriesLength {
        series: &'static str,
        expected: usize,
        found: usize,
    },
    /// An iterative solver failed to converge (e.g. IRR with no sign change)
    NoConvergence(&'static str),
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleError::Sampling(e) => write!(f, "{e}"),
            ModuleError::MissingUpstream { module, series } => {
                write!(f, "missing upstream output {series:?} from module {module:?}")
            }
            ModuleError::SeriesLength {
                series,
                expected,
                found,
            } => {
                write!(
                    f,
                    "series {series:?} has length {found}, expected {expected}"
                )
            }
            ModuleError::NoConvergence(what) => write!(f, "{what} did not converge"),
        }
    }
}

impl std::error::Error for ModuleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModuleError::Sampling(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SamplingError> for ModuleError {
    fn from(e: SamplingError) -> Self {
        ModuleError::Sampling(e)
    }
}

/// Fatal structural validation failure, raised before any iteration runs.
///
/// Carries the complete list of violated constraints rather than the first.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationError {
    pub errors: Vec<String>,
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid simulation context ({} errors):", self.errors.len())?;
        for e in &self.errors {
            write!(f, "\n  - {e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigurationError {}

/// A module's reducer failed; recovered at summary level
#[derive(Debug, Clone, PartialEq)]
pub enum FormatError {
    /// A custom reducer required data the trial set did not contain
    MissingField(String),
    Custom(String),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::MissingField(name) => {
                write!(f, "formatting requires field {name:?} which no trial produced")
            }
            FormatError::Custom(msg) => write!(f, "formatting failed: {msg}"),
        }
    }
}

impl std::error::Error for FormatError {}

/// Errors from engine lifecycle misuse
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// `register_module` called while a run is in flight
    NotIdle(&'static str),
    /// A module reported an empty name
    UnnamedModule,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::NotIdle(state) => {
                write!(f, "modules can only be registered while idle (engine is {state})")
            }
            EngineError::UnnamedModule => write!(f, "modules must have a non-empty name"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Errors reconstructing a cash-flow series from a formatted stage-1 summary
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// Neither a net series nor a revenue/cost pair was available for a band
    MissingSeries { band: &'static str },
    LengthMismatch {
        band: &'static str,
        revenue: usize,
        cost: usize,
    },
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::MissingSeries { band } => {
                write!(f, "no cash-flow series could be reconstructed for band {band}")
            }
            BridgeError::LengthMismatch {
                band,
                revenue,
                cost,
            } => {
                write!(
                    f,
                    "band {band}: revenue series ({revenue} years) does not match cost series ({cost} years)"
                )
            }
        }
    }
}

impl std::error::Error for BridgeError {}

/// Errors from the two-stage pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    Config(ConfigurationError),
    Bridge(BridgeError),
    Engine(EngineError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Config(e) => write!(f, "{e}"),
            PipelineError::Bridge(e) => write!(f, "{e}"),
            PipelineError::Engine(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Config(e) => Some(e),
            PipelineError::Bridge(e) => Some(e),
            PipelineError::Engine(e) => Some(e),
        }
    }
}

impl From<ConfigurationError> for PipelineError {
    fn from(e: ConfigurationError) -> Self {
        PipelineError::Config(e)
    }
}

impl From<BridgeError> for PipelineError {
    fn from(e: BridgeError) -> Self {
        PipelineError::Bridge(e)
    }
}

impl From<EngineError> for PipelineError {
    fn from(e: EngineError) -> Self {
        PipelineError::Engine(e)
    }
}
