//! Round-based frontier expansion under a global exploration budget.

use std::collections::HashMap;
use std::time::Duration;

use super::{classify, finalize, Graph, Label, TerminalRule};
use crate::error::{CrawlError, Result};
use crate::source::LinkSource;

/// Outcome of one traversal.
#[derive(Debug, Clone)]
pub struct Traversal {
    pub graph: Graph,
    /// Rounds started, including a round abandoned on budget exhaustion.
    pub rounds: usize,
    /// Terms fetched and recorded.
    pub explored: usize,
    /// True when the run stopped on the budget rather than an empty frontier.
    pub budget_exhausted: bool,
}

/// Open terms queued for the next round, with the URL to fetch each one from.
#[derive(Debug, Default)]
struct Frontier {
    terms: Vec<String>,
    urls: HashMap<String, String>,
}

impl Frontier {
    fn seed(term: &str, url: &str) -> Self {
        let mut frontier = Self::default();
        frontier.terms.push(term.to_string());
        frontier.urls.insert(term.to_string(), url.to_string());
        frontier
    }

    /// Queue the open labels of one explored page. A URL already queued this
    /// round is kept over a later discovery of the same term.
    fn absorb(&mut self, labels: &[Label], mut urls: HashMap<String, String>) {
        for label in labels.iter().filter(|l| l.is_open()) {
            if let Some(url) = urls.remove(&label.term) {
                self.urls.entry(label.term.clone()).or_insert(url);
            }
            self.terms.push(label.term.clone());
        }
    }

    fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Sequential explorer over a [`LinkSource`].
pub struct Crawler<S> {
    source: S,
    rule: Box<dyn TerminalRule>,
    budget_limit: usize,
    delay: Duration,
}

impl<S: LinkSource> Crawler<S> {
    pub fn new(source: S, rule: Box<dyn TerminalRule>, budget_limit: usize, delay: Duration) -> Self {
        Self {
            source,
            rule,
            budget_limit,
            delay,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Explore outward from `seed` until the budget is spent or no open term
    /// remains.
    ///
    /// Each round fetches every open term of the current frontier in order,
    /// records its labelled links, and queues the open ones for the next
    /// round. The budget is checked after each recorded term, so a round may
    /// be abandoned part-way; its unexplored terms stay open inside the
    /// entries already recorded. A fetch failure aborts the run.
    pub async fn traverse(&self, seed: &str, seed_url: &str) -> Result<Traversal> {
        let mut graph = Graph::new();
        let mut explored = 0;
        let mut rounds = 0;

        if self.budget_limit == 0 {
            log::warn!("Budget limit is 0, nothing will be explored");
            return Ok(Traversal {
                graph,
                rounds,
                explored,
                budget_exhausted: true,
            });
        }

        let mut frontier = Frontier::seed(seed, seed_url);

        while !frontier.is_empty() {
            rounds += 1;
            log::debug!("Round {}: {} queued term(s)", rounds, frontier.terms.len());
            let mut next = Frontier::default();

            for term in &frontier.terms {
                // Rediscovered by several pages, or already explored
                if graph.contains(term) {
                    continue;
                }

                let url = match frontier.urls.get(term) {
                    Some(url) => url.clone(),
                    None => {
                        log::debug!("No queued URL for {}, using canonical lookup", term);
                        self.source.lookup_url(term)
                    }
                };

                log::info!("[{}/{}] Exploring: {}", explored + 1, self.budget_limit, term);
                let page = self.source.fetch_page(&url).await?;
                let discovery = self.source.extract(&page);

                let labels: Vec<Label> = discovery
                    .terms
                    .iter()
                    .map(|t| {
                        let label = classify(t, &graph, self.rule.as_ref());
                        // A page linking to itself is resolved by this very visit
                        if label.is_open() && t == term {
                            Label::resolved(t.as_str())
                        } else {
                            label
                        }
                    })
                    .collect();
                log::debug!("{} -> {} label(s)", term, labels.len());

                next.absorb(&labels, discovery.urls);
                graph.insert(term.clone(), labels);

                explored += 1;
                if explored >= self.budget_limit {
                    log::info!("Budget of {} reached in round {}", self.budget_limit, rounds);
                    return Ok(Traversal {
                        graph,
                        rounds,
                        explored,
                        budget_exhausted: true,
                    });
                }

                tokio::time::sleep(self.delay).await;
            }

            frontier = next;
        }

        log::info!("Frontier exhausted after {} round(s)", rounds);
        Ok(Traversal {
            graph,
            rounds,
            explored,
            budget_exhausted: false,
        })
    }
}

/// Full pipeline for one seed term: traverse from its canonical URL, then
/// finalize. A run that discovers nothing is reported as
/// [`CrawlError::NoResults`].
pub async fn explore<S: LinkSource>(crawler: &Crawler<S>, seed: &str) -> Result<Graph> {
    if seed.trim().is_empty() {
        return Err(CrawlError::InvalidInput("seed term is empty".to_string()));
    }

    let seed_url = crawler.source().lookup_url(seed);
    let traversal = crawler.traverse(seed, &seed_url).await?;
    log::info!(
        "Explored {} term(s) in {} round(s){}",
        traversal.explored,
        traversal.rounds,
        if traversal.budget_exhausted { " (budget reached)" } else { "" }
    );

    let graph = finalize(traversal.graph);
    if graph.has_no_results() {
        return Err(CrawlError::NoResults(seed.to_string()));
    }
    Ok(graph)
}
