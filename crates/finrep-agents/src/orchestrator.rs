use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use finrep_models::{
    ExecutionMode, PipelineConfig, PipelineResult, ReportContext, SectionKind, StageLog,
    CONTEXT_STAGE, PARAPHRASE_STAGE,
};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::aggregator::aggregate;
use crate::error::ReportError;
use crate::generator::{PriorOutputs, SectionGenerator, StageOutput, StageRuntime};
use crate::oracle::{GenerationOracle, Prompt};
use crate::prompts::paraphrase_system_prompt;
use crate::retry::RetryPolicy;

/// The pipeline runs the section generators for one report and aggregates the result.
pub struct Pipeline {
    generators: BTreeMap<SectionKind, Arc<dyn SectionGenerator>>,
    oracle: Arc<dyn GenerationOracle>,
    paraphrase_oracle: Option<Arc<dyn GenerationOracle>>,
    config: PipelineConfig,
    progress: Option<mpsc::UnboundedSender<StageLog>>,
}

impl Pipeline {
    pub fn new(
        generators: Vec<Arc<dyn SectionGenerator>>,
        oracle: Arc<dyn GenerationOracle>,
        config: PipelineConfig,
    ) -> Self {
        let mut by_kind = BTreeMap::new();
        for generator in generators {
            by_kind.entry(generator.kind()).or_insert(generator);
        }
        Self {
            generators: by_kind,
            oracle,
            paraphrase_oracle: None,
            config,
            progress: None,
        }
    }

    /// Use a separate oracle for the paraphrase step.
    pub fn with_paraphrase_oracle(mut self, oracle: Arc<dyn GenerationOracle>) -> Self {
        self.paraphrase_oracle = Some(oracle);
        self
    }

    /// Publish every stage log on `sender` as soon as it is committed.
    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<StageLog>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn execute(&self, ctx: ReportContext) -> PipelineResult {
        self.execute_with_cancel(ctx, CancellationToken::new()).await
    }

    /// Run every stage and the paraphrase step. Only an invalid context ends the
    /// run early; cancellation turns the remaining work into fallbacks.
    pub async fn execute_with_cancel(&self, ctx: ReportContext, cancel: CancellationToken) -> PipelineResult {
        let start = Instant::now();

        if let Err(missing) = ctx.validate() {
            let reason = ReportError::FatalContext(missing.to_string());
            error!(request_id = %ctx.request_id, error = %reason, "Rejecting report context");
            let log = StageLog::fatal(CONTEXT_STAGE, reason.to_string());
            self.publish(&log);
            return PipelineResult {
                completed: false,
                request_id: ctx.request_id,
                subject: ctx.subject,
                intent: ctx.intent,
                time_window: ctx.time_window,
                sections: Vec::new(),
                paraphrase: String::new(),
                logs: vec![log],
            };
        }

        info!(
            request_id = %ctx.request_id,
            subject = %ctx.subject.display(),
            mode = ?self.config.mode,
            "Starting report"
        );

        let ctx = Arc::new(ctx);
        let rt = StageRuntime {
            oracle: Arc::clone(&self.oracle),
            timeout: Duration::from_secs(self.config.stage_timeout_seconds),
            retry: RetryPolicy::from(&self.config.retry),
            cancel,
            max_sources: self.config.max_sources,
        };

        let outputs = match self.config.mode {
            ExecutionMode::Sequential => self.run_sequential(&ctx, &rt).await,
            ExecutionMode::Concurrent => self.run_concurrent(&ctx, &rt).await,
        };

        let (paraphrase, paraphrase_log) = self.paraphrase(&ctx, &rt).await;
        self.publish(&paraphrase_log);

        let sections: Vec<_> = outputs.iter().map(|o| o.section.clone()).collect();
        let mut logs: Vec<_> = outputs.into_iter().map(|o| o.log).collect();
        logs.push(paraphrase_log);

        let result = aggregate(&sections, &paraphrase, &logs, &ctx);

        info!(
            request_id = %ctx.request_id,
            fallbacks = result.fallback_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Report complete"
        );

        result
    }

    fn publish(&self, log: &StageLog) {
        if let Some(sender) = &self.progress {
            if sender.send(log.clone()).is_err() {
                warn!(stage = %log.stage, "Progress receiver dropped");
            }
        }
    }

    async fn run_stage(
        generator: Option<Arc<dyn SectionGenerator>>,
        kind: SectionKind,
        ctx: &ReportContext,
        priors: &PriorOutputs,
        rt: &StageRuntime,
    ) -> StageOutput {
        if rt.cancel.is_cancelled() {
            return StageOutput::fallback(kind, ctx, rt.max_sources, &ReportError::Cancelled, Duration::ZERO);
        }
        match generator {
            Some(generator) => generator.run(ctx, priors, rt).await,
            None => StageOutput::fallback(
                kind,
                ctx,
                rt.max_sources,
                &ReportError::MissingInput(format!("no generator for {kind}")),
                Duration::ZERO,
            ),
        }
    }

    async fn run_sequential(&self, ctx: &ReportContext, rt: &StageRuntime) -> Vec<StageOutput> {
        let mut priors = PriorOutputs::default();
        let mut outputs = Vec::with_capacity(SectionKind::COUNT);

        for kind in SectionKind::ALL {
            let generator = self.generators.get(&kind).cloned();
            let output = Self::run_stage(generator, kind, ctx, &priors, rt).await;
            priors.record(&output);
            self.publish(&output.log);
            outputs.push(output);
        }

        outputs
    }

    /// Independent stages run on a bounded join set; stages that read the
    /// financial section start once it is done. Logs are committed in canonical
    /// order as soon as every earlier stage has finished.
    async fn run_concurrent(&self, ctx: &Arc<ReportContext>, rt: &StageRuntime) -> Vec<StageOutput> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_workers.max(1)));
        let rt = Arc::new(rt.clone());
        let mut tasks = JoinSet::new();
        let mut pending = 0usize;

        let spawn = |tasks: &mut JoinSet<(SectionKind, StageOutput)>, kind: SectionKind, priors: PriorOutputs| {
            let generator = self.generators.get(&kind).cloned();
            let ctx = Arc::clone(ctx);
            let rt = Arc::clone(&rt);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                // The semaphore is never closed.
                let _permit = semaphore.acquire_owned().await.ok();
                let output = Self::run_stage(generator, kind, &ctx, &priors, &rt).await;
                (kind, output)
            });
        };

        for kind in SectionKind::ALL.into_iter().filter(|k| !k.depends_on_financial()) {
            spawn(&mut tasks, kind, PriorOutputs::default());
            pending += 1;
        }

        let mut finished: BTreeMap<SectionKind, StageOutput> = BTreeMap::new();
        let mut committed = 0usize;

        while pending > 0 {
            let Some(joined) = tasks.join_next().await else {
                break;
            };
            pending -= 1;

            let (kind, output) = match joined {
                Ok(done) => done,
                Err(e) => {
                    error!(error = %e, "Stage task panicked");
                    continue;
                }
            };

            if kind == SectionKind::FinancialAnalysis {
                let mut priors = PriorOutputs::default();
                priors.record(&output);
                for dependent in SectionKind::ALL.into_iter().filter(|k| k.depends_on_financial()) {
                    spawn(&mut tasks, dependent, priors.clone());
                    pending += 1;
                }
            }

            finished.insert(kind, output);
            while let Some(output) = SectionKind::ALL
                .get(committed)
                .and_then(|next| finished.get(next))
            {
                self.publish(&output.log);
                committed += 1;
            }
        }

        // A panicked stage leaves a hole; fill it and flush whatever it held back.
        let outputs: Vec<StageOutput> = SectionKind::ALL
            .into_iter()
            .map(|kind| {
                finished.remove(&kind).unwrap_or_else(|| {
                    StageOutput::fallback(
                        kind,
                        ctx,
                        rt.max_sources,
                        &ReportError::MissingInput(format!("{kind} stage did not finish")),
                        Duration::ZERO,
                    )
                })
            })
            .collect();
        for output in outputs.iter().skip(committed) {
            self.publish(&output.log);
        }
        outputs
    }

    async fn paraphrase(&self, ctx: &ReportContext, rt: &StageRuntime) -> (String, StageLog) {
        let started = Instant::now();
        let query = ctx.originating_query().to_string();
        let elapsed = || started.elapsed().as_millis() as u64;

        if query.is_empty() {
            return (String::new(), StageLog::fallback(PARAPHRASE_STAGE, "no query to paraphrase"));
        }
        if !self.config.paraphrase {
            return (query, StageLog::fallback(PARAPHRASE_STAGE, "paraphrase disabled"));
        }

        let prompt = Prompt::new(PARAPHRASE_STAGE, paraphrase_system_prompt(), query.clone());
        let rt = match &self.paraphrase_oracle {
            Some(oracle) => StageRuntime {
                oracle: Arc::clone(oracle),
                ..rt.clone()
            },
            None => rt.clone(),
        };

        match rt.call_oracle(&prompt).await.and_then(|raw| clean_paraphrase(&raw)) {
            Ok(paraphrased) => {
                info!(elapsed_ms = elapsed(), "Paraphrase succeeded");
                (
                    format!("{query} - {paraphrased}"),
                    StageLog::success(PARAPHRASE_STAGE, "Paraphrased query").elapsed(elapsed()),
                )
            }
            Err(e) => {
                warn!(error = %e, elapsed_ms = elapsed(), "Paraphrase fell back");
                (query, StageLog::fallback(PARAPHRASE_STAGE, e.to_string()).elapsed(elapsed()))
            }
        }
    }
}

/// First non-blank line of the reply, without wrapping quotes.
fn clean_paraphrase(raw: &str) -> Result<String, ReportError> {
    raw.lines()
        .map(|l| l.trim().trim_matches(|c| c == '"' || c == '「' || c == '」').trim())
        .find(|l| !l.is_empty())
        .map(str::to_string)
        .ok_or(ReportError::EmptyResponse)
}
