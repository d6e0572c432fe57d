use std::sync::Arc;

use snaplink_core::{Clock, Repository, SystemClock};
use snaplink_generator::Generator;
use snaplink_redirector::{Redirector, RedirectorService};
use snaplink_shortener::{Shortener, UrlRegistry};

#[derive(Clone)]
pub struct AppState {
    shortener: Arc<dyn Shortener>,
    redirector: Arc<dyn Redirector>,
    base_url: Arc<str>,
}

impl AppState {
    pub fn new(
        shortener: Arc<dyn Shortener>,
        redirector: Arc<dyn Redirector>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            shortener,
            redirector,
            base_url: Arc::from(public_base_url.into()),
        }
    }

    /// Wires the registry and the redirector onto one shared repository.
    pub fn with_repository<R, G>(
        repository: Arc<R>,
        generator: G,
        public_base_url: impl Into<String>,
        public_limit: usize,
    ) -> Self
    where
        R: Repository,
        G: Generator,
    {
        Self::with_clock(
            repository,
            generator,
            Arc::new(SystemClock),
            public_base_url,
            public_limit,
        )
    }

    pub fn with_clock<R, G>(
        repository: Arc<R>,
        generator: G,
        clock: Arc<dyn Clock>,
        public_base_url: impl Into<String>,
        public_limit: usize,
    ) -> Self
    where
        R: Repository,
        G: Generator,
    {
        let shortener =
            UrlRegistry::with_clock(Arc::clone(&repository), generator, Arc::clone(&clock))
                .with_public_limit(public_limit);
        let redirector = RedirectorService::with_clock(repository, clock);
        Self::new(Arc::new(shortener), Arc::new(redirector), public_base_url)
    }

    pub fn shortener(&self) -> &dyn Shortener {
        self.shortener.as_ref()
    }

    pub fn redirector(&self) -> &dyn Redirector {
        self.redirector.as_ref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
