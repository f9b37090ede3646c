use crate::filter;
use crate::models::Listing;
use crate::notify::Dispatcher;
use crate::scrapers::types::Criteria;
use crate::scrapers::ScraperTrait;
use chrono::{SecondsFormat, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// A source paired with the thresholds its listings must meet
pub struct Source {
    pub scraper: Arc<dyn ScraperTrait>,
    pub criteria: Criteria,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Another run was still in progress
    Skipped,
    Completed {
        found: usize,
        accepted: usize,
        sent: usize,
    },
}

/// Scans every source concurrently and notifies per source as each finishes.
///
/// Runs never overlap: a run that starts while another is active is
/// skipped rather than queued.
pub struct RunCoordinator {
    sources: Vec<Source>,
    dispatcher: Mutex<Dispatcher>,
    running: AtomicBool,
}

/// Returns the coordinator to idle when a run ends, however it ends
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RunCoordinator {
    pub fn new(sources: Vec<Source>, dispatcher: Dispatcher) -> Self {
        Self {
            sources,
            dispatcher: Mutex::new(dispatcher),
            running: AtomicBool::new(false),
        }
    }

    fn try_begin(&self) -> Option<RunGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| RunGuard(&self.running))
    }

    pub async fn run_once(&self) -> RunOutcome {
        let Some(_guard) = self.try_begin() else {
            warn!("Previous run still active, skipping");
            return RunOutcome::Skipped;
        };

        let mut tasks = JoinSet::new();
        for (idx, source) in self.sources.iter().enumerate() {
            let scraper = source.scraper.clone();
            tasks.spawn(async move { (idx, scraper.scrape().await) });
        }

        let (mut found, mut accepted, mut sent) = (0, 0, 0);
        while let Some(joined) = tasks.join_next().await {
            let (idx, listings) = match joined {
                Ok((idx, Ok(listings))) => (idx, listings),
                Ok((idx, Err(e))) => {
                    error!("{} fatal: {:#}", self.sources[idx].scraper.source_name(), e);
                    continue;
                }
                Err(e) => {
                    error!("Source task crashed: {}", e);
                    continue;
                }
            };

            found += listings.len();
            let source = &self.sources[idx];
            let keep: Vec<Listing> = filter::retain_accepted(listings, &source.criteria);
            accepted += keep.len();
            sent += self.dispatcher.lock().await.dispatch(&keep).await;
        }

        info!(
            "Run finished at {} ({} listings total, {} matching, {} notified, {} seen overall)",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            found,
            accepted,
            sent,
            self.dispatcher.lock().await.seen_count()
        );
        RunOutcome::Completed {
            found,
            accepted,
            sent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::dispatcher::tests::{listing, RecordingMessenger};
    use crate::store::SeenStore;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Notify;

    enum Behaviour {
        Return(Vec<Listing>),
        Fail,
        Panic,
        Delay(Duration, Vec<Listing>),
        Block(Arc<Notify>, Arc<Notify>),
    }

    struct FakeScraper {
        name: &'static str,
        behaviour: Behaviour,
    }

    #[async_trait]
    impl ScraperTrait for FakeScraper {
        async fn scrape(&self) -> Result<Vec<Listing>> {
            match &self.behaviour {
                Behaviour::Return(listings) => Ok(listings.clone()),
                Behaviour::Fail => anyhow::bail!("browser exploded"),
                Behaviour::Panic => panic!("unexpected markup"),
                Behaviour::Delay(wait, listings) => {
                    tokio::time::sleep(*wait).await;
                    Ok(listings.clone())
                }
                Behaviour::Block(started, release) => {
                    started.notify_one();
                    release.notified().await;
                    Ok(Vec::new())
                }
            }
        }

        fn extract(&self, _html: &str) -> Result<Vec<Listing>> {
            Ok(Vec::new())
        }

        fn source_name(&self) -> &'static str {
            self.name
        }

        fn prefix(&self) -> &'static str {
            self.name
        }
    }

    fn source(name: &'static str, behaviour: Behaviour) -> Source {
        Source {
            scraper: Arc::new(FakeScraper { name, behaviour }),
            criteria: Criteria::default(),
        }
    }

    async fn coordinator(
        dir: &tempfile::TempDir,
        sources: Vec<Source>,
        messenger: Arc<RecordingMessenger>,
    ) -> RunCoordinator {
        let store = SeenStore::load(dir.path().join("notified.json")).await;
        RunCoordinator::new(sources, Dispatcher::new(store, messenger, "42"))
    }

    fn sent_ids(messenger: &RecordingMessenger) -> Vec<String> {
        messenger
            .texts()
            .iter()
            .map(|t| t.lines().next().unwrap().rsplit(' ').next().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_failing_sources_do_not_block_others() {
        let dir = tempfile::tempdir().unwrap();
        let messenger = Arc::new(RecordingMessenger::default());
        let c = coordinator(
            &dir,
            vec![
                source("broken", Behaviour::Fail),
                source("crashing", Behaviour::Panic),
                source("ok", Behaviour::Return(vec![listing("ok_1"), listing("ok_2")])),
            ],
            messenger.clone(),
        )
        .await;

        let outcome = c.run_once().await;
        assert_eq!(
            outcome,
            RunOutcome::Completed {
                found: 2,
                accepted: 2,
                sent: 2
            }
        );
        assert_eq!(sent_ids(&messenger), vec!["ok_1", "ok_2"]);
    }

    #[tokio::test]
    async fn test_rejected_listings_not_dispatched() {
        let dir = tempfile::tempdir().unwrap();
        let messenger = Arc::new(RecordingMessenger::default());
        let small = Listing {
            rooms: 1.0,
            ..listing("small_1")
        };
        let c = coordinator(
            &dir,
            vec![source("mixed", Behaviour::Return(vec![small, listing("big_1")]))],
            messenger.clone(),
        )
        .await;

        assert_eq!(
            c.run_once().await,
            RunOutcome::Completed {
                found: 2,
                accepted: 1,
                sent: 1
            }
        );
        assert_eq!(sent_ids(&messenger), vec!["big_1"]);
    }

    #[tokio::test]
    async fn test_second_run_sends_nothing_new() {
        let dir = tempfile::tempdir().unwrap();
        let messenger = Arc::new(RecordingMessenger::default());
        let c = coordinator(
            &dir,
            vec![source("s", Behaviour::Return(vec![listing("s_1")]))],
            messenger.clone(),
        )
        .await;

        c.run_once().await;
        assert_eq!(
            c.run_once().await,
            RunOutcome::Completed {
                found: 1,
                accepted: 1,
                sent: 0
            }
        );
        assert_eq!(messenger.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_handled_in_completion_order() {
        let dir = tempfile::tempdir().unwrap();
        let messenger = Arc::new(RecordingMessenger::default());
        let c = coordinator(
            &dir,
            vec![
                source("slow", Behaviour::Delay(Duration::from_secs(30), vec![listing("slow_1")])),
                source("fast", Behaviour::Delay(Duration::from_secs(1), vec![listing("fast_1")])),
            ],
            messenger.clone(),
        )
        .await;

        c.run_once().await;
        assert_eq!(sent_ids(&messenger), vec!["fast_1", "slow_1"]);
    }

    #[tokio::test]
    async fn test_overlapping_run_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let c = Arc::new(
            coordinator(
                &dir,
                vec![source("slow", Behaviour::Block(started.clone(), release.clone()))],
                Arc::new(RecordingMessenger::default()),
            )
            .await,
        );

        let first = tokio::spawn({
            let c = c.clone();
            async move { c.run_once().await }
        });
        started.notified().await;

        assert_eq!(c.run_once().await, RunOutcome::Skipped);

        release.notify_one();
        assert!(matches!(
            first.await.unwrap(),
            RunOutcome::Completed { .. }
        ));

        // Back to idle afterwards
        release.notify_one();
        assert!(matches!(c.run_once().await, RunOutcome::Completed { .. }));
    }
}
