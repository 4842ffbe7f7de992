//! Search driver - generation loop over execute, evaluate, archive, mutate

use super::config::SearchConfig;
use super::seeds::seed_candidates;
use crate::archive::{AddOutcome, ParetoArchive};
use crate::candidate::{Candidate, ExecutionTrace};
use crate::engine::{ExecutionContext, ExecutionEngine};
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::mutator::Mutator;
use crate::scores::{ScoreWeights, Scores};
use evopath_llm::{LlmProvider, Message, ToolDefinition};
use evopath_tools::ToolExecutor;
use futures::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Input to one search
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    /// User query
    pub query: String,
    /// Prior conversation; system messages are dropped
    pub history: Vec<Message>,
    /// Tools candidates may call
    pub tools: Vec<ToolDefinition>,
}

impl SearchRequest {
    /// Request with no history and no tools
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Set the history
    #[must_use]
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    /// Set the tools
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

/// Result of a successful search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Final answer of the best candidate
    pub answer: String,
    /// Best candidate id
    pub candidate_id: String,
    /// Best candidate's trace
    pub trace: ExecutionTrace,
    /// Best candidate's scores
    pub scores: Scores,
    /// Best candidate's weighted score
    pub weighted_score: f64,
    /// Generations executed
    pub generations_run: u32,
    /// Archive size at termination
    pub archive_size: usize,
    /// Archive members at termination
    pub pareto_front: Vec<Arc<Candidate>>,
}

/// Pareto path search over candidate strategies
pub struct PathSearch {
    llm: Arc<dyn LlmProvider>,
    executor: Option<Arc<dyn ToolExecutor>>,
    cancel: CancellationToken,
    weights: ScoreWeights,
}

impl PathSearch {
    /// Create a search bound to a generation service
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            executor: None,
            cancel: CancellationToken::new(),
            weights: ScoreWeights::default(),
        }
    }

    /// Set the tool executor
    #[must_use]
    pub fn with_tool_executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Use an external cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the search
    #[instrument(skip(self, request, config), fields(query_len = request.query.len(), generations = config.generation_count))]
    pub async fn search(&self, request: SearchRequest, config: &SearchConfig) -> Result<SearchOutcome> {
        config.validate()?;

        let cancel = self.cancel.child_token();
        let run = tokio::time::timeout(config.deadline(), self.run(&request, config, &cancel));

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                warn!("Search cancelled");
                Err(Error::Cancelled)
            }
            result = run => match result {
                Ok(outcome) => outcome,
                Err(_) => {
                    cancel.cancel();
                    error!(deadline_secs = config.deadline_secs, "Search deadline exceeded");
                    Err(Error::DeadlineExceeded(config.deadline_secs))
                }
            },
        }
    }

    async fn run(
        &self,
        request: &SearchRequest,
        config: &SearchConfig,
        cancel: &CancellationToken,
    ) -> Result<SearchOutcome> {
        let archive = ParetoArchive::new(config.archive_capacity);
        let engine = ExecutionEngine::new(
            Arc::clone(&self.llm),
            self.executor.clone(),
            config.engine_settings(),
        );
        let evaluator = Evaluator::new(Arc::clone(&self.llm), config.model.clone());
        let mutator = Mutator::new(Arc::clone(&self.llm), config.model.clone());
        let ctx = ExecutionContext {
            query: &request.query,
            history: &request.history,
            tools: &request.tools,
        };

        let mut population = seed_candidates(config.candidates_per_generation);
        let last_generation = config.generation_count - 1;

        for generation in 0..config.generation_count {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            info!(generation, candidates = population.len(), "Starting generation");

            let results = join_all(
                population
                    .into_iter()
                    .map(|candidate| self.run_candidate(candidate, ctx, &engine, &evaluator, &archive, cancel)),
            )
            .await;

            let mut scored = 0usize;
            for result in results {
                match result {
                    Ok(()) => scored += 1,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => warn!(generation, error = %e, "Candidate dropped"),
                }
            }

            if scored == 0 {
                error!(generation, "All candidates failed in generation");
                return Err(Error::ArchiveExhaustion { generation });
            }

            let best = archive
                .best_by_weighted_sum(&self.weights)
                .ok_or(Error::ArchiveExhaustion { generation })?;
            let best_score = best.weighted_score(&self.weights);
            info!(
                generation,
                best = %best.id,
                best_score,
                archive_size = archive.len(),
                "Generation complete"
            );

            if best_score >= config.target_score || generation == last_generation {
                return self.finish(&best, generation + 1, &archive);
            }

            population = self.next_generation(&archive, &mutator, config).await;
        }

        // generation_count >= 1 is validated, so the loop always returns
        Err(Error::ArchiveExhaustion {
            generation: last_generation,
        })
    }

    /// Execute, evaluate and archive one candidate
    async fn run_candidate(
        &self,
        mut candidate: Candidate,
        ctx: ExecutionContext<'_>,
        engine: &ExecutionEngine,
        evaluator: &Evaluator,
        archive: &ParetoArchive,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let trace = engine.execute(&candidate, ctx, cancel).await?;

        let evaluation = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            evaluation = evaluator.evaluate(ctx.query, &trace) => evaluation?,
        };

        let weighted = evaluation.scores.weighted_sum(&self.weights);
        candidate.assign_evaluation(trace, evaluation.scores, evaluation.feedback)?;
        let id = candidate.id.clone();

        match archive.add(candidate) {
            AddOutcome::Inserted { evicted, pruned } => {
                debug!(candidate = %id, weighted, evicted = evicted.len(), pruned = pruned.len(), "Archived");
            }
            AddOutcome::Rejected { dominated_by } => {
                debug!(candidate = %id, weighted, dominated_by = ?dominated_by, "Not archived");
            }
        }
        Ok(())
    }

    /// Mutate the selected parents, plus one crossover of the top two
    async fn next_generation(
        &self,
        archive: &ParetoArchive,
        mutator: &Mutator,
        config: &SearchConfig,
    ) -> Vec<Candidate> {
        let parents = archive.select_for_mutation(config.candidates_per_generation);
        let empty = ExecutionTrace::default();

        let mutations = join_all(parents.iter().map(|parent| {
            let trace = parent.trace().unwrap_or(&empty);
            mutator.mutate(parent, trace, parent.feedback())
        }));
        let crossover = async {
            match parents.as_slice() {
                [a, b, ..] if config.enable_crossover => Some(mutator.crossover(a, b).await),
                _ => None,
            }
        };

        let (mut offspring, crossed) = tokio::join!(mutations, crossover);
        offspring.extend(crossed);

        if offspring.is_empty() {
            warn!("No offspring produced, re-running parents");
            offspring = parents.iter().map(|p| p.rerun()).collect();
        }
        debug!(parents = parents.len(), offspring = offspring.len(), "Next generation prepared");
        offspring
    }

    fn finish(
        &self,
        best: &Arc<Candidate>,
        generations_run: u32,
        archive: &ParetoArchive,
    ) -> Result<SearchOutcome> {
        let (Some(trace), Some(scores)) = (best.trace(), best.scores().copied()) else {
            return Err(Error::EmptyFinalAnswer {
                candidate_id: best.id.clone(),
            });
        };
        if trace.final_answer.trim().is_empty() {
            error!(candidate = %best.id, "Best candidate has an empty answer");
            return Err(Error::EmptyFinalAnswer {
                candidate_id: best.id.clone(),
            });
        }

        let trace = trace.clone();
        let outcome = SearchOutcome {
            answer: trace.final_answer.clone(),
            candidate_id: best.id.clone(),
            weighted_score: scores.weighted_sum(&self.weights),
            scores,
            trace,
            generations_run,
            archive_size: archive.len(),
            pareto_front: archive.pareto_front(),
        };

        info!(
            candidate = %outcome.candidate_id,
            weighted_score = outcome.weighted_score,
            generations_run,
            archive_size = outcome.archive_size,
            "Search complete"
        );
        Ok(outcome)
    }
}

/// Run a search with a fresh [`PathSearch`]
pub async fn search(
    llm: Arc<dyn LlmProvider>,
    executor: Option<Arc<dyn ToolExecutor>>,
    request: SearchRequest,
    config: &SearchConfig,
) -> Result<SearchOutcome> {
    let mut search = PathSearch::new(llm);
    if let Some(executor) = executor {
        search = search.with_tool_executor(executor);
    }
    search.search(request, config).await
}
