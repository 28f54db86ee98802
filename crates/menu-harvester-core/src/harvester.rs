//! The extraction pipeline: watched file changes in, deduplicated image
//! records out.

use std::path::PathBuf;

use crossbeam::channel::{never, select, tick, Receiver};
use log::{debug, info};

use crate::activity::ActivityLog;
use crate::collector::ProductCollector;
use crate::config::Config;
use crate::download::{
    product_jobs, store_jobs, target_job, BulkDownloader, DownloadJob, DownloadReport,
    ImageFetcher, ImageTarget,
};
use crate::error::{Error, Result};
use crate::extract::{extract_with, parse_document, ExtractContext, ExtractResult, Extraction};
use crate::fs_access::{FileAccess, LocalFileAccess};
use crate::monitor::{MonitorSession, PollOutcome, SessionKind, Watcher};
use crate::persistence::StoreHistory;
use crate::types::{ProductRecord, StoreRecord};

/// Requests accepted by [`Harvester::watch`] while it is polling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCommand {
    /// Drop the current storefront; the next storefront change is skipped
    ClearStore,
    /// Empty the product collector; the next product change is skipped
    ClearProducts,
    /// Bulk download everything collected, optionally into a given directory
    Download(Option<PathBuf>),
    /// Save one image under its role-based name, optionally into a given directory
    Save(ImageTarget, Option<PathBuf>),
    /// Log a summary of the watched files and collected records
    Status,
    /// Stop the session with this label
    Stop(String),
    Quit,
}

enum Step {
    Poll,
    Command(WatchCommand),
    CommandsClosed,
    Shutdown,
}

/// Owns everything the pipeline accumulates
#[derive(Debug)]
pub struct Harvester {
    config: Config,
    history: StoreHistory,
    products: ProductCollector,
    activity: ActivityLog,
}

impl Harvester {
    /// Create a harvester whose store history lives in the configured state dir
    pub fn new(config: Config) -> Result<Self> {
        let dir = config.resolve_state_dir()?;
        let history = StoreHistory::open(dir, config.history_limit)?;
        Ok(Self::with_history(config, history))
    }

    pub fn with_history(config: Config, history: StoreHistory) -> Self {
        Self {
            config,
            history,
            products: ProductCollector::new(),
            activity: ActivityLog::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn current_store(&self) -> Option<&StoreRecord> {
        self.history.current()
    }

    pub fn history(&self) -> &StoreHistory {
        &self.history
    }

    pub fn products(&self) -> &[ProductRecord] {
        self.products.records()
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    fn context(&self) -> ExtractContext {
        ExtractContext::new(self.config.cdn_host.clone())
    }

    /// Parse `content` and run the extractor chain for `kind`.
    ///
    /// Returns whether anything was extracted. Parse failures and payloads
    /// no extractor recognises are logged and leave all state untouched.
    pub fn process_content(&mut self, kind: SessionKind, content: &str, source: &str) -> bool {
        let doc = match parse_document(content) {
            Ok(doc) => doc,
            Err(e) => {
                self.activity
                    .error(format!("[{}] could not parse payload: {}", source, e));
                return false;
            }
        };

        match extract_with(&doc, kind.chain(), &self.context()) {
            ExtractResult::Matched(extraction) => {
                self.apply(extraction, source);
                true
            }
            ExtractResult::NoMatch => {
                self.activity
                    .warning(format!("[{}] payload has no recognised image data", source));
                false
            }
        }
    }

    /// Fold one extraction into the harvested state
    pub fn apply(&mut self, extraction: Extraction, source: &str) {
        match extraction {
            Extraction::Storefront(record) => {
                let summary = format!(
                    "[{}] storefront {} ({}): {} images",
                    source,
                    record.name,
                    record.id,
                    record.image_count()
                );
                let saved = self.history.record(record);
                self.activity.success(summary);
                if let Err(e) = saved {
                    self.activity
                        .error(format!("Could not save store history: {}", e));
                }
            }
            Extraction::Products(batch) => {
                let stats = self.products.merge(batch.records);
                self.activity.success(format!(
                    "[{}] scanned {} products: {} new, {} updated, {} collected",
                    source,
                    batch.scanned,
                    stats.added,
                    stats.replaced,
                    self.products.len()
                ));
            }
        }
    }

    /// React to one poll outcome of `session`
    pub fn handle_outcome(&mut self, session: &MonitorSession, outcome: PollOutcome) {
        match outcome {
            PollOutcome::Inactive | PollOutcome::Unchanged => {}
            PollOutcome::Touched => {
                debug!("[{}] touched without content change", session.label());
            }
            PollOutcome::Updated(content) => {
                self.activity
                    .info(format!("[{}] content changed", session.label()));
                self.process_content(session.kind(), &content, session.label());
            }
            PollOutcome::Rearmed => {
                self.activity.info(format!(
                    "[{}] change after clear skipped; watching for the next one",
                    session.label()
                ));
            }
            PollOutcome::Failed(e) => {
                self.activity
                    .error(format!("[{}] stopped watching: {}", session.label(), e));
            }
        }
    }

    /// Forget the current storefront and silence storefront sessions
    pub fn clear_store(&mut self, watcher: &mut Watcher) {
        if let Err(e) = self.history.clear_current() {
            self.activity
                .error(format!("Could not clear current storefront: {}", e));
        }
        watcher.silence(SessionKind::Storefront);
        self.activity.info("Storefront cleared");
    }

    /// Empty the collector and silence every product session
    pub fn clear_products(&mut self, watcher: &mut Watcher) {
        self.products.clear();
        watcher.silence(SessionKind::Products);
        self.activity.info("Products cleared");
    }

    /// Storefront images first, then products in first-seen order
    pub fn download_jobs(&self) -> Vec<DownloadJob> {
        let mut jobs = self.history.current().map(store_jobs).unwrap_or_default();
        jobs.extend(product_jobs(self.products.records()));
        jobs
    }

    /// Bulk download every harvested image
    pub fn download_all(
        &mut self,
        fetcher: &dyn ImageFetcher,
        fs: &mut dyn FileAccess,
        show_progress: bool,
    ) -> Result<DownloadReport> {
        let jobs = self.download_jobs();
        BulkDownloader::new(fetcher, self.config.jpeg_quality)
            .with_progress(show_progress)
            .run(&jobs, fs, &mut self.activity)
    }

    /// Save the single image `target` names
    pub fn save_image(
        &mut self,
        target: &ImageTarget,
        fetcher: &dyn ImageFetcher,
        fs: &mut dyn FileAccess,
    ) -> Result<DownloadReport> {
        let Some(job) = target_job(self.history.current(), self.products.records(), target) else {
            self.activity
                .warning(format!("No harvested image for {}", target));
            return Err(Error::MissingImage(target.to_string()));
        };
        BulkDownloader::new(fetcher, self.config.jpeg_quality).run(&[job], fs, &mut self.activity)
    }

    /// Log a one-line summary per watched file plus the collected totals
    pub fn log_status(&mut self, watcher: &Watcher) {
        for session in watcher.sessions() {
            let file = session
                .handle()
                .map(|h| h.name().to_string())
                .unwrap_or_else(|| "-".to_string());
            self.activity.info(format!(
                "[{}] {:?} {} (armed: {})",
                session.label(),
                session.state(),
                file,
                session.is_armed()
            ));
        }
        let store = self
            .history
            .current()
            .map(|s| s.name.clone())
            .unwrap_or_else(|| "none".to_string());
        self.activity.info(format!(
            "Storefront: {}, products collected: {}",
            store,
            self.products.len()
        ));
    }

    /// Poll `watcher` on its interval until every session has stopped,
    /// `shutdown` fires, or a [`WatchCommand::Quit`] arrives.
    ///
    /// Ticks that elapse while a poll round is still running are coalesced.
    pub fn watch(
        &mut self,
        watcher: &mut Watcher,
        fs: &mut dyn FileAccess,
        fetcher: &dyn ImageFetcher,
        commands: &Receiver<WatchCommand>,
        shutdown: &Receiver<()>,
    ) -> Result<()> {
        let ticker = tick(watcher.interval());
        let closed = never();
        let mut commands = commands;
        info!(
            "Watching {} file(s) every {:?}",
            watcher.sessions().len(),
            watcher.interval()
        );

        while watcher.has_active_sessions() {
            let step = select! {
                recv(ticker) -> _ => Step::Poll,
                recv(commands) -> msg => msg.map_or(Step::CommandsClosed, Step::Command),
                recv(shutdown) -> _ => Step::Shutdown,
            };

            match step {
                Step::Poll => {
                    watcher.poll_all(&*fs, |session, outcome| self.handle_outcome(session, outcome));
                }
                Step::Command(WatchCommand::Quit) => break,
                Step::Command(command) => self.run_command(command, watcher, fs, fetcher),
                // Input closed; keep polling without commands
                Step::CommandsClosed => commands = &closed,
                Step::Shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        watcher.stop_all();
        self.activity.info("Stopped watching");
        Ok(())
    }

    fn run_command(
        &mut self,
        command: WatchCommand,
        watcher: &mut Watcher,
        fs: &mut dyn FileAccess,
        fetcher: &dyn ImageFetcher,
    ) {
        match command {
            WatchCommand::ClearStore => self.clear_store(watcher),
            WatchCommand::ClearProducts => self.clear_products(watcher),
            WatchCommand::Status => self.log_status(watcher),
            WatchCommand::Stop(label) => {
                if watcher.stop(&label) {
                    self.activity.info(format!("[{}] stopped", label));
                } else {
                    self.activity.warning(format!("No watched file called {}", label));
                }
            }
            WatchCommand::Download(dir) => {
                let result = match dir {
                    Some(dir) => {
                        let mut target = LocalFileAccess::new().with_directory(dir);
                        self.download_all(fetcher, &mut target, false)
                    }
                    None => self.download_all(fetcher, fs, false),
                };
                // Failures were already written to the activity log
                if let Ok(report) = result {
                    debug!("Download finished: {}", report.summary());
                }
            }
            WatchCommand::Save(target, dir) => {
                let result = match dir {
                    Some(dir) => {
                        let mut target_fs = LocalFileAccess::new().with_directory(dir);
                        self.save_image(&target, fetcher, &mut target_fs)
                    }
                    None => self.save_image(&target, fetcher, fs),
                };
                if let Ok(report) = result {
                    debug!("Saved {}: {}", target, report.summary());
                }
            }
            WatchCommand::Quit => {}
        }
    }
}
