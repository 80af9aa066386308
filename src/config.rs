//! Configuration management for the community inference run

/// Required accuracy for BP to terminate
pub const BP_TOLERANCE: f64 = 1e-4;

/// Maximum number of BP sweeps per EM step
pub const BP_MAX_SWEEPS: usize = 20;

/// Required accuracy for EM to terminate
pub const EM_TOLERANCE: f64 = 1e-4;

/// Maximum number of EM steps before giving up
pub const EM_MAX_STEPS: usize = 100;

/// Floor applied to every weighted message sum before taking its logarithm
pub const SMALL: f64 = 1.0e-100;

/// Settings for one inference run
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Number of latent groups K
    pub groups: usize,

    /// Largest message change accepted as a BP fixed point
    pub bp_tolerance: f64,

    /// Sweep cap for a single BP run
    pub bp_max_sweeps: usize,

    /// Largest change in the raw affinity matrix accepted as EM convergence
    pub em_tolerance: f64,

    /// Step cap for the EM loop
    pub em_max_steps: usize,

    /// Seed for the uniform source; `None` draws from OS entropy
    pub seed: Option<u64>,

    /// Treat non-convergence as a failure
    pub strict_convergence: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            groups: 2,
            bp_tolerance: BP_TOLERANCE,
            bp_max_sweeps: BP_MAX_SWEEPS,
            em_tolerance: EM_TOLERANCE,
            em_max_steps: EM_MAX_STEPS,
            seed: None,
            strict_convergence: false,
        }
    }
}

impl InferenceConfig {
    /// Create a configuration with default tolerances and caps
    pub fn new(groups: usize, seed: Option<u64>) -> Self {
        Self {
            groups,
            seed,
            ..Self::default()
        }
    }

    /// Enable or disable the strict convergence policy
    pub fn with_strict_convergence(mut self, strict: bool) -> Self {
        self.strict_convergence = strict;
        self
    }
}
