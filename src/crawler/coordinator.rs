//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the run loop that coordinates all aspects of a
//! crawl run, including:
//! - Recording the run and scheduling bulk-imported packages
//! - Crawling due packages and due persons concurrently until the deadline
//! - Turning each crawl result into an index action and a new schedule
//! - Scheduling newly discovered packages and persons
//!
//! Storage is owned here. Crawl tasks never touch it; their results are
//! applied one at a time as they complete.

use crate::config::{Config, MAX_INTERVAL_HOURS, MAX_RUN_MINUTES};
use crate::crawler::package::{crawl_package_isolated, is_bad_package, CrawlOutcome};
use crate::crawler::person::{crawl_person, PersonSite};
use crate::crawler::scheduler::{QueuedItem, Scheduler};
use crate::crawler::{CrawlContext, CRAWLER_VERSION};
use crate::discovery::{github_updates, read_packages, ImportSegments};
use crate::identity::{author_of, host_of};
use crate::model::{CrawlResultAction, CrawlingEntry, Package, Person, PersonId};
use crate::storage::{EntryKind, RunStatus, SqliteStorage, Storage};
use crate::SearchError;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Number of search result pages scraped for recent updates
const GITHUB_UPDATE_PAGES: usize = 2;

/// Outcome counts for the package half of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageTally {
    pub updated: usize,
    pub stars_only: usize,
    pub not_modified: usize,
    pub deleted: usize,
    pub failed: usize,
    /// Packages and persons first seen in crawled packages
    pub discovered: usize,
    /// Due packages left over when the deadline passed
    pub remaining: usize,
}

/// Outcome counts for the person half of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonTally {
    pub crawled: usize,
    pub unsupported: usize,
    pub failed: usize,
    /// Packages first seen in person listings
    pub discovered: usize,
    pub remaining: usize,
}

/// Summary of a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: i64,
    /// Packages newly scheduled from bulk imports
    pub imported: usize,
    /// Packages rescheduled because they were recently updated upstream
    pub refreshed: usize,
    pub packages: PackageTally,
    pub persons: PersonTally,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    storage: Arc<Mutex<SqliteStorage>>,
    ctx: Arc<CrawlContext>,
    imports: ImportSegments,
    run_id: i64,
}

impl Coordinator {
    /// Creates a coordinator talking to the configured endpoints
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `config_hash` - Hash of the configuration, recorded with the run
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(SearchError)` - Failed to open storage or build the HTTP client
    pub fn new(config: Config, config_hash: &str) -> Result<Self, SearchError> {
        let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;
        let ctx = CrawlContext::from_config(&config)?;
        Self::with_parts(config, storage, Arc::new(ctx), config_hash)
    }

    /// Creates a coordinator from already built parts
    pub fn with_parts(
        config: Config,
        mut storage: SqliteStorage,
        ctx: Arc<CrawlContext>,
        config_hash: &str,
    ) -> Result<Self, SearchError> {
        let run_id = storage.create_run(config_hash)?;
        let imports = ImportSegments::new(&config.storage.imports_dir);

        Ok(Self {
            config,
            storage: Arc::new(Mutex::new(storage)),
            ctx,
            imports,
            run_id,
        })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Shared handle to the storage, e.g. for inspecting results
    pub fn storage_handle(&self) -> Arc<Mutex<SqliteStorage>> {
        Arc::clone(&self.storage)
    }

    fn storage(&self) -> MutexGuard<'_, SqliteStorage> {
        self.storage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `now` plus an interval, clamped to the configurable range
    fn after_hours(now: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
        now + ChronoDuration::hours(hours.clamp(0, MAX_INTERVAL_HOURS))
    }

    /// Runs one crawl run
    ///
    /// This method:
    /// 1. Schedules packages from complete import segments
    /// 2. Optionally reschedules recently updated repositories
    /// 3. Crawls due packages and due persons concurrently until the deadline
    /// 4. Marks the run completed, or failed if either half failed
    pub async fn run(&mut self) -> Result<RunSummary, SearchError> {
        tracing::info!("Starting crawl run {}", self.run_id);
        let start_time = std::time::Instant::now();

        let mut summary = RunSummary {
            run_id: self.run_id,
            ..RunSummary::default()
        };

        summary.imported = self.process_imports()?;

        if self.config.crawler.refresh_github_updates {
            match github_updates(
                self.ctx.client.as_ref(),
                &self.config.endpoints.github_search,
                GITHUB_UPDATE_PAGES,
            )
            .await
            {
                Ok(updates) => {
                    summary.refreshed = self.apply_updates(&updates)?;
                }
                Err(e) => tracing::warn!("Fetching recent updates failed: {}", e),
            }
        }

        let minutes = self.config.crawler.due_per_run_minutes.min(MAX_RUN_MINUTES);
        let deadline = Instant::now() + Duration::from_secs(minutes * 60);
        let semaphore = Arc::new(Semaphore::new(
            self.config.crawler.max_concurrent_crawls as usize,
        ));

        let (packages, persons) = tokio::join!(
            self.crawl_packages(Arc::clone(&semaphore), deadline),
            self.crawl_persons(Arc::clone(&semaphore), deadline),
        );

        let (packages, persons) = match (packages, persons) {
            (Ok(packages), Ok(persons)) => (packages, persons),
            (packages, persons) => {
                tracing::error!(
                    "Some job may have failed, package: {:?}, person: {:?}",
                    packages.as_ref().err(),
                    persons.as_ref().err()
                );
                self.storage()
                    .update_run_status(self.run_id, RunStatus::Failed)?;
                return Err(packages.err().or(persons.err()).unwrap_or_else(|| {
                    SearchError::Storage("crawl failed".to_string())
                }));
            }
        };
        summary.packages = packages;
        summary.persons = persons;

        self.storage().complete_run(self.run_id)?;

        tracing::info!(
            "Crawl run {} completed in {:?}: {:?}",
            self.run_id,
            start_time.elapsed(),
            summary
        );

        Ok(summary)
    }

    /// Schedules every unseen package from complete import segments
    ///
    /// Processed segments are removed. A segment that cannot be read is
    /// left in place for the next run.
    ///
    /// # Returns
    ///
    /// The number of newly scheduled packages
    pub fn process_imports(&self) -> Result<usize, SearchError> {
        let now = Utc::now();
        let mut scheduled = 0;

        for segment in self.imports.done_segments()? {
            let packages = match read_packages(&segment) {
                Ok(packages) => packages,
                Err(e) => {
                    tracing::warn!("Skipping import segment {}: {}", segment.path.display(), e);
                    continue;
                }
            };

            {
                let mut storage = self.storage();
                for path in &packages {
                    let entry = CrawlingEntry::new(now, CRAWLER_VERSION, "");
                    if storage.ensure_entry(EntryKind::Package, path, &entry)? {
                        scheduled += 1;
                    }
                }
            }

            tracing::info!(
                "Import segment {} processed: {} packages",
                segment.number,
                packages.len()
            );
            self.imports.remove_segment(&segment)?;
        }

        Ok(scheduled)
    }

    /// Makes recently updated packages due now
    fn apply_updates(
        &self,
        updates: &HashMap<String, chrono::DateTime<Utc>>,
    ) -> Result<usize, SearchError> {
        let now = Utc::now();
        let mut storage = self.storage();
        let mut refreshed = 0;

        for path in updates.keys() {
            match storage.get_entry(EntryKind::Package, path)? {
                Some(mut entry) if entry.schedule_time > now => {
                    entry.schedule_time = now;
                    storage.put_entry(EntryKind::Package, path, &entry)?;
                    refreshed += 1;
                }
                Some(_) => {}
                None => {
                    let entry = CrawlingEntry::new(now, CRAWLER_VERSION, "");
                    if storage.ensure_entry(EntryKind::Package, path, &entry)? {
                        refreshed += 1;
                    }
                }
            }
        }

        tracing::info!("{} packages rescheduled from recent updates", refreshed);
        Ok(refreshed)
    }

    fn due_items(&self, kind: EntryKind) -> Result<Vec<QueuedItem>, SearchError> {
        let due = self.storage().due_entries(kind, Utc::now())?;
        Ok(due
            .into_iter()
            .map(|(key, entry)| {
                let etag = entry.etag_for(CRAWLER_VERSION).to_string();
                QueuedItem::new(key, entry.schedule_time, etag)
            })
            .collect())
    }

    /// Crawls due packages until the frontier is empty or the deadline passes
    async fn crawl_packages(
        &self,
        semaphore: Arc<Semaphore>,
        deadline: Instant,
    ) -> Result<PackageTally, SearchError> {
        let items = self.due_items(EntryKind::Package)?;
        tracing::info!("{} packages due", items.len());

        let mut scheduler = Scheduler::with_semaphore(semaphore, deadline, items);
        let mut tasks = JoinSet::new();
        let mut tally = PackageTally::default();
        let mut dispatching = true;

        loop {
            tokio::select! {
                scheduled = scheduler.next_item(), if dispatching => match scheduled {
                    Some(scheduled) => {
                        let ctx = Arc::clone(&self.ctx);
                        tasks.spawn(async move {
                            let _permit = scheduled.permit;
                            let item = scheduled.item;
                            let result =
                                crawl_package_isolated(ctx, item.key.clone(), item.etag.clone()).await;
                            (item, result)
                        });
                    }
                    None => dispatching = false,
                },
                joined = tasks.join_next(), if !tasks.is_empty() => match joined {
                    Some(Ok((item, result))) => self.record_package(&item, result, &mut tally)?,
                    Some(Err(e)) => {
                        tally.failed += 1;
                        tracing::error!("Package task failed: {}", e);
                    }
                    None => {}
                },
                else => break,
            }
        }

        tally.remaining = scheduler.frontier_size();
        tracing::info!(
            "Package crawling finished: {} dispatched, {} left",
            scheduler.dispatched(),
            tally.remaining
        );
        Ok(tally)
    }

    /// Applies one package crawl result to storage
    fn record_package(
        &self,
        item: &QueuedItem,
        result: Result<CrawlOutcome, SearchError>,
        tally: &mut PackageTally,
    ) -> Result<(), SearchError> {
        let now = Utc::now();
        let crawler = &self.config.crawler;
        let mut storage = self.storage();

        match result {
            Ok(CrawlOutcome::Fetched(mut package)) => {
                package.package = item.key.clone();

                let previous = storage.get_doc(&item.key)?;
                let action = match previous {
                    Some(previous) if previous.same_except_stars(&package) => {
                        tally.stars_only += 1;
                        CrawlResultAction::StarsOnly(package.clone())
                    }
                    _ => {
                        tally.updated += 1;
                        CrawlResultAction::Update(package.clone())
                    }
                };

                storage.put_doc(&package)?;
                storage.append_action(self.run_id, &item.key, &action)?;
                let entry = CrawlingEntry::new(
                    Self::after_hours(now, crawler.recrawl_interval_hours),
                    CRAWLER_VERSION,
                    package.etag.clone(),
                );
                storage.put_entry(EntryKind::Package, &item.key, &entry)?;

                tally.discovered += schedule_discovered(&mut *storage, &package)?;
                tracing::debug!("Crawled package {}", item.key);
            }
            Ok(CrawlOutcome::NotModified) => {
                tally.not_modified += 1;
                let entry = CrawlingEntry::new(
                    Self::after_hours(now, crawler.recrawl_interval_hours),
                    CRAWLER_VERSION,
                    item.etag.clone(),
                );
                storage.put_entry(EntryKind::Package, &item.key, &entry)?;
            }
            Err(e) if is_bad_package(&e) => {
                tally.deleted += 1;
                tracing::info!("Removing package {}: {}", item.key, e);
                storage.delete_doc(&item.key)?;
                storage.delete_entry(EntryKind::Package, &item.key)?;
                storage.append_action(self.run_id, &item.key, &CrawlResultAction::Delete)?;
            }
            Err(e) => {
                tally.failed += 1;
                tracing::warn!("Crawling package {} failed: {}", item.key, e);
                let entry = CrawlingEntry::new(
                    Self::after_hours(now, crawler.retry_after_hours),
                    CRAWLER_VERSION,
                    item.etag.clone(),
                );
                storage.put_entry(EntryKind::Package, &item.key, &entry)?;
            }
        }

        Ok(())
    }

    /// Crawls due persons until the frontier is empty or the deadline passes
    async fn crawl_persons(
        &self,
        semaphore: Arc<Semaphore>,
        deadline: Instant,
    ) -> Result<PersonTally, SearchError> {
        let items = self.due_items(EntryKind::Person)?;
        tracing::info!("{} persons due", items.len());

        let mut scheduler = Scheduler::with_semaphore(semaphore, deadline, items);
        let mut tasks = JoinSet::new();
        let mut tally = PersonTally::default();
        let mut dispatching = true;

        loop {
            tokio::select! {
                scheduled = scheduler.next_item(), if dispatching => match scheduled {
                    Some(scheduled) => {
                        let id = match scheduled.item.key.parse::<PersonId>() {
                            Ok(id) => id,
                            Err(e) => {
                                tracing::warn!("Dropping person entry: {}", e);
                                self.storage().delete_entry(EntryKind::Person, &scheduled.item.key)?;
                                continue;
                            }
                        };
                        let ctx = Arc::clone(&self.ctx);
                        tasks.spawn(async move {
                            let _permit = scheduled.permit;
                            let result = crawl_person(&ctx, &id).await;
                            (scheduled.item, result)
                        });
                    }
                    None => dispatching = false,
                },
                joined = tasks.join_next(), if !tasks.is_empty() => match joined {
                    Some(Ok((item, result))) => self.record_person(&item, result, &mut tally)?,
                    Some(Err(e)) => {
                        tally.failed += 1;
                        tracing::error!("Person task failed: {}", e);
                    }
                    None => {}
                },
                else => break,
            }
        }

        tally.remaining = scheduler.frontier_size();
        tracing::info!(
            "Person crawling finished: {} dispatched, {} left",
            scheduler.dispatched(),
            tally.remaining
        );
        Ok(tally)
    }

    /// Applies one person crawl result to storage
    fn record_person(
        &self,
        item: &QueuedItem,
        result: Result<Option<Person>, SearchError>,
        tally: &mut PersonTally,
    ) -> Result<(), SearchError> {
        let now = Utc::now();
        let crawler = &self.config.crawler;
        let mut storage = self.storage();

        let next = match result {
            Ok(Some(person)) => {
                tally.crawled += 1;
                let entry = CrawlingEntry::new(now, CRAWLER_VERSION, "");
                for path in &person.packages {
                    if storage.ensure_entry(EntryKind::Package, path, &entry)? {
                        tally.discovered += 1;
                    }
                }
                tracing::debug!("Crawled person {}: {} packages", item.key, person.packages.len());
                Self::after_hours(now, crawler.person_interval_hours)
            }
            Ok(None) => {
                tally.unsupported += 1;
                Self::after_hours(now, crawler.person_interval_hours)
            }
            Err(e) => {
                tally.failed += 1;
                tracing::warn!("Crawling person {} failed: {}", item.key, e);
                Self::after_hours(now, crawler.retry_after_hours)
            }
        };

        storage.put_entry(
            EntryKind::Person,
            &item.key,
            &CrawlingEntry::new(next, CRAWLER_VERSION, ""),
        )?;
        Ok(())
    }
}

/// Schedules unseen imports, references and the author of a crawled package
///
/// # Returns
///
/// The number of new entries
fn schedule_discovered(
    storage: &mut dyn Storage,
    package: &Package,
) -> Result<usize, SearchError> {
    let entry = CrawlingEntry::new(Utc::now(), CRAWLER_VERSION, "");
    let mut discovered = 0;

    for path in package
        .imports
        .iter()
        .chain(&package.test_imports)
        .chain(&package.references)
    {
        // Standard library packages have no host
        if !host_of(path).contains('.') {
            continue;
        }
        if storage.ensure_entry(EntryKind::Package, path, &entry)? {
            discovered += 1;
        }
    }

    let host = host_of(&package.package);
    if PersonSite::from_host(&host).is_some() {
        let id = PersonId::new(host, author_of(&package.package));
        if !id.username.is_empty()
            && storage.ensure_entry(EntryKind::Person, &id.to_string(), &entry)?
        {
            discovered += 1;
        }
    }

    Ok(discovered)
}

/// Runs one crawl run with the production endpoints
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the configuration file, recorded with the run
///
/// # Returns
///
/// * `Ok(RunSummary)` - The run completed
/// * `Err(SearchError)` - Setup or storage failed
///
/// # Example
///
/// ```no_run
/// use pkgsearch::config::load_config_with_hash;
/// use pkgsearch::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("crawler.toml"))?;
/// let summary = run_crawl(config, &hash).await?;
/// println!("{} packages updated", summary.packages.updated);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, config_hash: &str) -> Result<RunSummary, SearchError> {
    let mut coordinator = Coordinator::new(config, config_hash)?;
    coordinator.run().await
}
