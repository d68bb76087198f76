use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use hunter_common::RawPlaceRecord;

use crate::traits::{CrawlRequest, PlaceCrawler};

/// What happened to one search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermOutcome {
    Harvested { term: String, count: usize },
    Skipped { term: String, reason: String },
}

impl TermOutcome {
    pub fn term(&self) -> &str {
        match self {
            TermOutcome::Harvested { term, .. } | TermOutcome::Skipped { term, .. } => term,
        }
    }
}

/// Records from every successful term, in term order, plus a per-term account.
#[derive(Debug, Clone, Default)]
pub struct HarvestReport {
    pub records: Vec<RawPlaceRecord>,
    pub terms: Vec<TermOutcome>,
}

impl HarvestReport {
    pub fn succeeded(&self) -> usize {
        self.terms
            .iter()
            .filter(|t| matches!(t, TermOutcome::Harvested { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.terms.len() - self.succeeded()
    }
}

impl fmt::Display for HarvestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "records={} terms_ok={} terms_skipped={}",
            self.records.len(),
            self.succeeded(),
            self.skipped()
        )
    }
}

/// Runs search terms against the place crawler, one at a time.
pub struct Harvester {
    crawler: Arc<dyn PlaceCrawler>,
    language: String,
}

impl Harvester {
    pub fn new(crawler: Arc<dyn PlaceCrawler>, language: impl Into<String>) -> Self {
        Self {
            crawler,
            language: language.into(),
        }
    }

    /// Crawl each term sequentially; the crawler backend enforces its own job
    /// concurrency. A failing term is logged and skipped, never retried here.
    pub async fn harvest(&self, terms: &[String], per_term_limit: u32) -> HarvestReport {
        info!(terms = terms.len(), per_term_limit, "Harvesting places");
        let mut report = HarvestReport::default();

        for term in terms {
            info!(term = %term, "Searching");
            let request = CrawlRequest {
                query: term.clone(),
                max_results: per_term_limit,
                language: self.language.clone(),
            };

            match self.crawler.crawl(&request).await {
                Ok(places) => {
                    info!(term = %term, count = places.len(), "Places found");
                    report.terms.push(TermOutcome::Harvested {
                        term: term.clone(),
                        count: places.len(),
                    });
                    report.records.extend(places);
                }
                Err(e) => {
                    warn!(term = %term, error = %e, "Search failed, skipping term");
                    report.terms.push(TermOutcome::Skipped {
                        term: term.clone(),
                        reason: format!("{e:#}"),
                    });
                }
            }
        }

        info!("Harvest complete. {report}");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{place, MockCrawler};

    fn terms(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn failing_term_does_not_affect_others() {
        let crawler = Arc::new(
            MockCrawler::new()
                .on_term("A", vec![place("a1"), place("a2")])
                .on_failure("B", "actor run FAILED")
                .on_term("C", vec![place("c1")]),
        );
        let harvester = Harvester::new(crawler.clone(), "es");

        let report = harvester.harvest(&terms(&["A", "B", "C"]), 4).await;

        let names: Vec<_> = report.records.iter().filter_map(|r| r.name.as_deref()).collect();
        assert_eq!(names, vec!["a1", "a2", "c1"]);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.skipped(), 1);
        assert!(matches!(
            &report.terms[1],
            TermOutcome::Skipped { term, reason } if term == "B" && reason.contains("FAILED")
        ));

        // All three were attempted, in order, with the same limit and language.
        let requests = crawler.requests();
        let queried: Vec<_> = requests.iter().map(|r| r.query.as_str()).collect();
        assert_eq!(queried, vec!["A", "B", "C"]);
        assert!(requests.iter().all(|r| r.max_results == 4 && r.language == "es"));
    }

    #[tokio::test]
    async fn failure_isolation_matches_individual_harvests() {
        let crawler = Arc::new(
            MockCrawler::new()
                .on_term("A", vec![place("a1")])
                .on_failure("B", "boom")
                .on_term("C", vec![place("c1"), place("c2")]),
        );
        let harvester = Harvester::new(crawler, "es");

        let combined = harvester.harvest(&terms(&["A", "B", "C"]), 3).await.records;
        let mut separate = harvester.harvest(&terms(&["A"]), 3).await.records;
        separate.extend(harvester.harvest(&terms(&["C"]), 3).await.records);

        assert_eq!(combined, separate);
    }

    #[tokio::test]
    async fn duplicates_across_terms_are_kept() {
        let crawler = Arc::new(
            MockCrawler::new()
                .on_term("A", vec![place("same")])
                .on_term("B", vec![place("same")]),
        );
        let report = Harvester::new(crawler, "es")
            .harvest(&terms(&["A", "B"]), 1)
            .await;
        assert_eq!(report.records.len(), 2);
    }

    #[tokio::test]
    async fn all_terms_failing_yields_empty_report() {
        let crawler = Arc::new(MockCrawler::new());
        let report = Harvester::new(crawler, "es")
            .harvest(&terms(&["unknown"]), 1)
            .await;
        assert!(report.records.is_empty());
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.to_string(), "records=0 terms_ok=0 terms_skipped=1");
    }
}
