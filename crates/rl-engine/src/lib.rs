//! Bandit engine: Beta-Bernoulli posteriors, Thompson sampling traffic
//! allocation, a simulated latent environment and read-side reporting.

pub mod aggregator;
pub mod allocator;
pub mod posterior;
pub mod report;
pub mod retention;
pub mod session;
pub mod simulator;

pub use aggregator::{aggregate, CumulativeTotals, VariantTotals};
pub use allocator::{even_split, ThompsonAllocator, TrafficSplit};
pub use posterior::{BetaPosterior, VariantPosterior};
pub use report::{ConversionRate, ExperimentReport};
pub use retention::filter_window;
pub use session::{ExperimentSession, RoundKind, RoundSummary};
pub use simulator::LatentEnvironment;
