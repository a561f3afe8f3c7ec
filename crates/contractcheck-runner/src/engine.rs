//! Run engine: plans every case, then drives the sequential chain and the
//! bounded parallel fan-out, folding outcomes into one [`Reporter`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use contractcheck_core::{Config, Reporter, RunMode, SchemaDocument, SkippedCase, TestOutcome};

use crate::RunError;
use crate::cancel::CancellationToken;
use crate::checks::evaluate;
use crate::context::TestContext;
use crate::executor::Executor;
use crate::retry::RetryPolicy;
use crate::suites::{self, Plan, PlannedCase};

pub struct Engine {
    doc: SchemaDocument,
    config: Config,
    executor: Executor,
    cancellation: CancellationToken,
}

impl Engine {
    /// Validate `config` and load the document it points at.
    ///
    /// # Errors
    ///
    /// Returns error if the config is invalid, the document cannot be loaded
    /// or the HTTP client cannot be built.
    pub fn from_config(config: Config) -> Result<Self, RunError> {
        config.validate()?;
        let doc = SchemaDocument::from_path(&config.spec)?;
        Self::new(doc, config)
    }

    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(doc: SchemaDocument, config: Config) -> Result<Self, RunError> {
        let executor = Executor::new(
            &config.base_url,
            config.headers.clone(),
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self {
            doc,
            config,
            executor,
            cancellation: CancellationToken::never(),
        })
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Fetch the configured references.
    ///
    /// # Errors
    ///
    /// `RunError::Cancelled` if cancelled while fetching.
    pub async fn context(&self) -> Result<TestContext, RunError> {
        info!(references = self.config.references.len(), "fetching references");
        TestContext::fetch(
            &self.executor,
            &self.config.references,
            &RetryPolicy::from(&self.config.retry),
            self.cancellation.clone(),
        )
        .await
    }

    #[must_use]
    pub fn plan(&self, context: &TestContext) -> Plan {
        suites::plan(&self.doc, &self.config, context)
    }

    /// Plan and execute every case.
    pub async fn run(&self, context: &TestContext) -> Reporter {
        let plan = self.plan(context);
        self.execute(plan, context).await
    }

    /// Execute an existing plan. Cases not started before cancellation are
    /// recorded as skipped.
    pub async fn execute(&self, plan: Plan, context: &TestContext) -> Reporter {
        let executor = self.executor.render_headers(|value| context.render(value));
        let token = context.cancellation().clone();
        let mut reporter = Reporter::new();

        info!(
            cases = plan.cases.len(),
            checks = plan.checks.len(),
            skipped = plan.skipped.len(),
            "plan ready"
        );
        for check in plan.checks {
            reporter.record(check);
        }
        for skipped in plan.skipped {
            reporter.record_skip(skipped);
        }

        let (sequential, parallel): (Vec<_>, Vec<_>) = plan
            .cases
            .into_iter()
            .partition(|case| case.mode() == RunMode::Sequential);

        info!(cases = sequential.len(), "running sequential suites");
        self.run_sequential(&executor, &token, sequential, &mut reporter)
            .await;

        info!(
            cases = parallel.len(),
            concurrency = self.config.concurrency,
            "running parallel suites"
        );
        self.run_parallel(&executor, &token, parallel, &mut reporter)
            .await;

        let summary = reporter.summarize();
        info!(
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            "run finished"
        );
        reporter
    }

    async fn run_sequential(
        &self,
        executor: &Executor,
        token: &CancellationToken,
        cases: Vec<PlannedCase>,
        reporter: &mut Reporter,
    ) {
        let delay = Duration::from_millis(self.config.delay_ms);
        let mut first = true;
        for case in cases {
            if token.is_cancelled() {
                reporter.record_skip(cancelled(&case));
                continue;
            }
            if !first && !delay.is_zero() {
                tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        reporter.record_skip(cancelled(&case));
                        continue;
                    }
                    () = tokio::time::sleep(delay) => {}
                }
            }
            first = false;

            tokio::select! {
                biased;
                () = token.cancelled() => reporter.record_skip(cancelled(&case)),
                outcome = run_case(executor, &case) => {
                    reporter.record(outcome);
                }
            }
        }
    }

    async fn run_parallel(
        &self,
        executor: &Executor,
        token: &CancellationToken,
        cases: Vec<PlannedCase>,
        reporter: &mut Reporter,
    ) {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks: JoinSet<Result<TestOutcome, SkippedCase>> = JoinSet::new();

        for case in cases {
            if token.is_cancelled() {
                reporter.record_skip(cancelled(&case));
                continue;
            }
            let permit = tokio::select! {
                biased;
                () = token.cancelled() => {
                    reporter.record_skip(cancelled(&case));
                    continue;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => permit,
            };
            let Ok(permit) = permit else {
                reporter.record_skip(cancelled(&case));
                continue;
            };

            let executor = executor.clone();
            let token = token.clone();
            tasks.spawn(async move {
                let _permit = permit;
                tokio::select! {
                    biased;
                    () = token.cancelled() => Err(cancelled(&case)),
                    outcome = run_case(&executor, &case) => Ok(outcome),
                }
            });

            while let Some(joined) = tasks.try_join_next() {
                fold(reporter, joined);
            }
        }

        while let Some(joined) = tasks.join_next().await {
            fold(reporter, joined);
        }
    }
}

async fn run_case(executor: &Executor, case: &PlannedCase) -> TestOutcome {
    debug!(id = %case.id, suite = %case.suite, endpoint = %case.endpoint, "running case");
    let record = executor.record(&case.request);
    let result = executor.execute(&case.request).await;
    let outcome = evaluate(case, result, record);
    debug!(id = %case.id, passed = outcome.passed, status = ?outcome.status, "case finished");
    outcome
}

fn cancelled(case: &PlannedCase) -> SkippedCase {
    SkippedCase {
        suite: case.suite,
        endpoint: case.endpoint.clone(),
        reason: "cancelled".to_string(),
    }
}

fn fold(reporter: &mut Reporter, joined: Result<Result<TestOutcome, SkippedCase>, JoinError>) {
    match joined {
        Ok(Ok(outcome)) => {
            reporter.record(outcome);
        }
        Ok(Err(skipped)) => reporter.record_skip(skipped),
        Err(e) => warn!(error = %e, "case task failed"),
    }
}
