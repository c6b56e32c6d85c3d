//! Experiment session: owns the record log, the day counter and the random
//! stream, and runs initialize/simulate rounds to completion one at a time.

use crate::aggregator::{aggregate, CumulativeTotals};
use crate::allocator::{even_split, ThompsonAllocator, TrafficSplit};
use crate::posterior::{posteriors, VariantPosterior};
use crate::report::{variant_reports, ExperimentReport};
use crate::retention::filter_window;
use crate::simulator::LatentEnvironment;
use bandit_core::config::{AppConfig, ReportConfig};
use bandit_core::{
    BanditError, BanditResult, DayCounter, ExperimentLog, RetentionWindow, TrialRecord,
    VariantSet,
};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundKind {
    Initialize,
    Simulate,
}

impl RoundKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Simulate => "simulate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub kind: RoundKind,
    pub day: u64,
    pub round_size: usize,
    pub split: TrafficSplit,
    pub records: Vec<TrialRecord>,
}

/// A single experiment run over a fixed variant set.
///
/// The random source is injected so tests can drive the session from a
/// seeded stream; sessions never share a log or a stream.
pub struct ExperimentSession<R = StdRng> {
    id: Uuid,
    variants: VariantSet,
    segment: String,
    retention: RetentionWindow,
    round_sizes: RangeInclusive<usize>,
    environment: LatentEnvironment,
    report_config: ReportConfig,
    allocator: ThompsonAllocator,
    log: ExperimentLog,
    day: DayCounter,
    rng: R,
}

impl ExperimentSession<StdRng> {
    /// Seeded from `experiment.seed` when configured, otherwise from OS entropy.
    pub fn from_config(config: &AppConfig) -> BanditResult<Self> {
        let rng = match config.experiment.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(config, rng)
    }

    pub fn with_seed(config: &AppConfig, seed: u64) -> BanditResult<Self> {
        Self::new(config, StdRng::seed_from_u64(seed))
    }

    /// Restart the random stream from `seed`. Log and day counter are kept.
    pub fn reseed(&mut self, seed: u64) {
        tracing::debug!(session_id = %self.id, seed, "random stream reseeded");
        self.rng = StdRng::seed_from_u64(seed);
    }
}

impl<R: Rng> ExperimentSession<R> {
    pub fn new(config: &AppConfig, rng: R) -> BanditResult<Self> {
        config.validate()?;
        let experiment = &config.experiment;
        let variants = experiment.variant_set()?;
        let environment = LatentEnvironment::from_config(&config.environment)?;

        let session = Self {
            id: Uuid::new_v4(),
            variants,
            segment: experiment.segment.trim().to_string(),
            retention: experiment.retention,
            round_sizes: experiment.round_size_min..=experiment.round_size_max,
            environment,
            report_config: config.report.clone(),
            allocator: ThompsonAllocator::new(),
            log: ExperimentLog::new(),
            day: DayCounter::default(),
            rng,
        };

        tracing::info!(
            session_id = %session.id,
            variants = ?session.variants.as_slice(),
            retention = %session.retention,
            "experiment session created"
        );
        Ok(session)
    }

    /// Continue an experiment from an existing log. The day counter resumes
    /// one past the latest recorded day.
    pub fn resume(config: &AppConfig, log: ExperimentLog, rng: R) -> BanditResult<Self> {
        let mut session = Self::new(config, rng)?;
        session.day = DayCounter::starting_at(log.max_day().map_or(0, |day| day + 1));
        session.log = log;
        tracing::info!(
            session_id = %session.id,
            records = session.log.len(),
            day = session.day.current(),
            "experiment session resumed"
        );
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn variants(&self) -> &VariantSet {
        &self.variants
    }

    pub fn log(&self) -> &ExperimentLog {
        &self.log
    }

    pub fn day(&self) -> u64 {
        self.day.current()
    }

    pub fn retention(&self) -> RetentionWindow {
        self.retention
    }

    /// Change the display window. Allocation always reads the full log.
    pub fn set_retention(&mut self, retention: RetentionWindow) {
        self.retention = retention;
    }

    /// Reset the log and day counter, then run one evenly split round with a
    /// random round size.
    pub fn initialize(&mut self) -> BanditResult<RoundSummary> {
        let round_size = self.draw_round_size();
        self.initialize_with_round_size(round_size)
    }

    /// As [`initialize`](Self::initialize) with an explicit round size.
    pub fn initialize_with_round_size(&mut self, round_size: usize) -> BanditResult<RoundSummary> {
        let split = even_split(&self.variants, round_size)?;
        self.log = ExperimentLog::new();
        self.day = DayCounter::default();
        self.complete_round(RoundKind::Initialize, round_size, split)
    }

    pub fn simulate(&mut self) -> BanditResult<RoundSummary> {
        let round_size = self.draw_round_size();
        self.simulate_with_round_size(round_size)
    }

    pub fn simulate_with_round_size(&mut self, round_size: usize) -> BanditResult<RoundSummary> {
        if round_size == 0 {
            return Err(BanditError::InvalidRoundSize(round_size));
        }
        let posteriors = self.posteriors()?;
        let split = self
            .allocator
            .allocate(&posteriors, round_size, &mut self.rng)?;
        self.complete_round(RoundKind::Simulate, round_size, split)
    }

    pub fn totals(&self) -> CumulativeTotals {
        aggregate(self.log.records(), &self.variants)
    }

    pub fn posteriors(&self) -> BanditResult<Vec<VariantPosterior>> {
        posteriors(&self.totals())
    }

    pub fn filtered_records(&self) -> &[TrialRecord] {
        filter_window(&self.log, self.retention)
    }

    pub fn report(&self) -> BanditResult<ExperimentReport> {
        let records = self.filtered_records();
        Ok(ExperimentReport {
            session_id: self.id,
            generated_at: Utc::now(),
            day: self.day.current(),
            retention: self.retention,
            records: records.to_vec(),
            variants: variant_reports(records, &self.variants, &self.report_config)?,
        })
    }

    fn draw_round_size(&mut self) -> usize {
        self.rng.gen_range(self.round_sizes.clone())
    }

    fn complete_round(
        &mut self,
        kind: RoundKind,
        round_size: usize,
        split: TrafficSplit,
    ) -> BanditResult<RoundSummary> {
        let day = self.day.current();
        let records = self
            .environment
            .run_round(day, &self.segment, &split, &mut self.rng);
        self.log.append_round(records.clone())?;
        self.day.advance();

        metrics::counter!("bandit.rounds", "kind" => kind.as_str()).increment(1);
        metrics::histogram!("bandit.round_size").record(round_size as f64);
        tracing::info!(
            session_id = %self.id,
            kind = kind.as_str(),
            day,
            round_size,
            split = ?split,
            "round completed"
        );

        Ok(RoundSummary {
            kind,
            day,
            round_size,
            split,
            records,
        })
    }
}
