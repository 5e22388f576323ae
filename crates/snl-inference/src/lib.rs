#![deny(missing_docs)]
#![doc = "Sequential neural likelihood. Rounds alternate between simulating parameters proposed by the prior (first round) or the current posterior, fitting a conditional density estimator of the likelihood on every simulation so far, and exposing an MCMC-sampled posterior built on that likelihood."]

pub mod bank;
pub mod config;
pub mod early_stopping;
pub mod estimator;
pub mod evaluation;
pub mod optim;
pub mod posterior;
pub mod potential;
pub mod priors;
pub mod simulation;
pub mod snl;
pub mod summary;
pub mod telemetry;
pub mod trainer;

pub use bank::ParameterObservationBank;
pub use config::{SnlConfig, TelemetryConfig, TrainingConfig};
pub use early_stopping::{EarlyStopping, TrainingPhase, INITIAL_BEST_VALIDATION_LOG_PROB};
pub use estimator::AffineAutoregressive;
pub use evaluation::{
    median_pairwise_distance, unbiased_mmd_squared, GroundTruth, MMDS,
    NEGATIVE_LOG_PROBS_TRUE_PARAMETERS,
};
pub use optim::{adam, clip_grad_norm, Adam, FlatParameters, ParameterBackend, TrainingBackend};
pub use posterior::{Posterior, PARAMETER_SITE};
pub use potential::{
    BoundPotential, FlatPotential, PotentialFunction, PotentialFunctionProvider,
    StructuredPotential,
};
pub use priors::{AnyPrior, BoxUniform, DiagonalGaussian};
pub use simulation::{simulate_in_batches, SimulationBatchSize};
pub use snl::{Proposal, Snl};
pub use summary::{
    median_observation_distance, DistanceRecorder, SummaryRecord, SummaryRecorder,
    BEST_VALIDATION_LOG_PROBS, EPOCHS, MCMC_TIMES, MEDIAN_OBSERVATION_DISTANCES,
    NEURAL_NET_FIT_TIMES,
};
pub use telemetry::{log_dir, timestamp, RoundEvent, TelemetryRecorder};
pub use trainer::{split_indices, validation_log_prob, LikelihoodTrainer, Split, TrainingSummary};
