// ── Page ──
//
// The query page as a value: where it was loaded from, the form it holds,
// the store it persists to, and the last rendered report.

use url::Url;

use downtime_api::DataLogger;

use crate::error::CoreError;
use crate::form::QueryForm;
use crate::persist::{self, KeyValueStore};
use crate::report::Report;
use crate::session::{QueryOptions, QueryOutcome, run_query};

#[derive(Debug)]
pub struct Page<S: KeyValueStore> {
    location: Url,
    store: S,
    form: QueryForm,
    share_url: Option<Url>,
    report: Report,
}

impl<S: KeyValueStore> Page<S> {
    /// Initialize from `location`'s query string, or from `store` when
    /// the URL carries no state.
    pub fn load(location: Url, store: S) -> Self {
        let state = persist::load_preferring_url(Some(&location), &store);
        Self {
            form: QueryForm::from_state(&state),
            location,
            store,
            share_url: None,
            report: Report::new(),
        }
    }

    pub fn form(&self) -> &QueryForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut QueryForm {
        &mut self.form
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    /// The URL that reproduces the current selection. Before anything has
    /// been persisted this is the page's own location.
    pub fn share_url(&self) -> &Url {
        self.share_url.as_ref().unwrap_or(&self.location)
    }

    /// Write the form to the store and rebuild the share URL from it.
    pub fn persist(&mut self) -> Result<(), CoreError> {
        persist::save(&mut self.store, &self.form.to_state())?;
        self.share_url = persist::reflect_to_url(&self.store, &self.location);
        Ok(())
    }

    /// The "Get Downtime" action: persist, then query every configured row.
    pub async fn get_downtime<L: DataLogger>(
        &mut self,
        logger: &L,
        options: &QueryOptions,
    ) -> Result<QueryOutcome, CoreError> {
        self.persist()?;
        let window = self.form.window().resolve()?;
        run_query(logger, &window, &self.form.rows, &mut self.report, options).await
    }
}
