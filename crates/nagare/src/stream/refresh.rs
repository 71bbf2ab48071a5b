use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicI64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use tokio::sync::Mutex;
use url::Url;

use super::{HlsStream, OpenedStream};
use crate::error::{NagareError, NagareResult};

/// Source of wall-clock time in unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self(AtomicI64::new(now))
    }

    pub fn set(&self, now: i64) {
        self.0.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.0.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Re-derives a playable URL once the watch window has closed.
#[async_trait]
pub trait UrlRefresher: Send + Sync {
    /// `Ok(None)` means the upstream gave no replacement this time.
    async fn refresh(&self) -> NagareResult<Option<String>>;
}

/// Where the deadline lives in a signed URL and how it is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchWindowConfig {
    /// Index into `path.split('/')`, so the empty segment before the leading
    /// slash counts as index 0.
    pub deadline_segment: usize,
    /// Seconds subtracted from the encoded deadline.
    pub margin: i64,
    /// Seconds the deadline advances by when a refresh yields nothing.
    pub backoff: i64,
}

impl Default for WatchWindowConfig {
    fn default() -> Self {
        Self {
            deadline_segment: 2,
            margin: 15,
            backoff: 10,
        }
    }
}

impl WatchWindowConfig {
    /// Encoded deadline minus the margin.
    pub fn deadline(&self, url: &Url) -> NagareResult<i64> {
        let invalid = |reason: String| NagareError::InvalidWatchWindow {
            url: url.to_string(),
            reason,
        };

        let segment = url
            .path()
            .split('/')
            .nth(self.deadline_segment)
            .ok_or_else(|| invalid(format!("no path segment {}", self.deadline_segment)))?;
        let deadline: i64 = segment
            .parse()
            .map_err(|e| invalid(format!("segment {segment:?} is not a timestamp: {e}")))?;
        Ok(deadline - self.margin)
    }
}

struct WatchState {
    url: Url,
    deadline: i64,
}

/// HLS stream behind a time-limited signed URL.
///
/// The exposed URL keeps the host and chunklist name captured at construction.
/// Only one refresh runs at a time: readers wait on the state lock and then
/// observe the refreshed URL.
#[derive(Clone)]
pub struct RefreshingHlsStream {
    inner: HlsStream,
    first_host: String,
    first_port: Option<u16>,
    first_tail: String,
    config: WatchWindowConfig,
    state: Arc<Mutex<WatchState>>,
    refresher: Arc<dyn UrlRefresher>,
    clock: Arc<dyn Clock>,
    opened: Arc<AtomicBool>,
}

impl fmt::Debug for RefreshingHlsStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshingHlsStream")
            .field("inner", &self.inner)
            .field("first_host", &self.first_host)
            .field("first_tail", &self.first_tail)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RefreshingHlsStream {
    pub fn new(
        inner: HlsStream,
        refresher: Arc<dyn UrlRefresher>,
        config: WatchWindowConfig,
    ) -> NagareResult<Self> {
        Self::with_clock(inner, refresher, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        inner: HlsStream,
        refresher: Arc<dyn UrlRefresher>,
        config: WatchWindowConfig,
        clock: Arc<dyn Clock>,
    ) -> NagareResult<Self> {
        let url = inner.url().clone();
        let invalid = |reason: &str| NagareError::InvalidWatchWindow {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let first_host = url
            .host_str()
            .ok_or_else(|| invalid("no host"))?
            .to_string();
        let first_tail = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|tail| !tail.is_empty())
            .ok_or_else(|| invalid("no chunklist name"))?
            .to_string();
        let deadline = config.deadline(&url)?;
        log::trace!("host={first_host} tail={first_tail} deadline={deadline}");

        Ok(Self {
            first_port: url.port(),
            state: Arc::new(Mutex::new(WatchState { url, deadline })),
            inner,
            first_host,
            first_tail,
            config,
            refresher,
            clock,
            opened: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn inner(&self) -> &HlsStream {
        &self.inner
    }

    pub async fn deadline(&self) -> i64 {
        self.state.lock().await.deadline
    }

    /// The current URL, refreshed first if the watch window has closed.
    pub async fn url(&self) -> NagareResult<Url> {
        let mut state = self.state.lock().await;
        if self.clock.now() < state.deadline {
            return Ok(state.url.clone());
        }

        log::debug!("Watch window of {} closed, refreshing", state.url);
        let fresh = self.refresher.refresh().await?;
        match fresh.map(|fresh| self.rewrite(&fresh)) {
            Some(Ok((url, deadline))) => {
                log::debug!("Refreshed URL: {url}");
                state.deadline = state.deadline.max(deadline);
                state.url = url;
            }
            Some(Err(e)) => {
                log::warn!("Ignoring refreshed URL: {e}");
                state.deadline += self.config.backoff;
            }
            None => {
                log::debug!("No refreshed URL, retrying in {}s", self.config.backoff);
                state.deadline += self.config.backoff;
            }
        }
        Ok(state.url.clone())
    }

    /// Moves `fresh` back onto the original host and chunklist.
    fn rewrite(&self, fresh: &str) -> NagareResult<(Url, i64)> {
        let mut url = Url::parse(fresh)?;
        log::trace!("refresh: host={:?} path={}", url.host_str(), url.path());

        url.set_host(Some(&self.first_host))?;
        url.set_port(self.first_port)
            .map_err(|_| NagareError::InvalidWatchWindow {
                url: fresh.to_string(),
                reason: "cannot carry a port".to_string(),
            })?;
        url.path_segments_mut()
            .map_err(|_| NagareError::InvalidWatchWindow {
                url: fresh.to_string(),
                reason: "cannot be a base".to_string(),
            })?
            .pop()
            .push(&self.first_tail);

        let deadline = self.config.deadline(&url)?;
        Ok((url, deadline))
    }

    pub async fn open(&self) -> NagareResult<OpenedStream> {
        if !self.opened.swap(true, Ordering::SeqCst) {
            let deadline = self.deadline().await;
            match chrono::DateTime::from_timestamp(deadline, 0) {
                Some(at) => log::debug!("Next URL refresh at {}", at.format("%Y-%m-%d %H:%M:%S")),
                None => log::debug!("Next URL refresh at {deadline}"),
            }
        }

        let url = self.url().await?;
        self.inner.open_url(url).await
    }
}
