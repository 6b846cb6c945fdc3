use time::{Date, Duration};
use tracing::{error, info};

use crate::fx::RateSeries;
use crate::ledger::Currency;
use crate::log::WriteHandle;
use crate::write_errln;

use super::{Error, RatesCache, RemoteRateLoader};

// The CBR does not publish rates on weekends or holidays, so a cached
// series whose newest sample is within this many days of the requested
// range end is still considered complete.
const CACHE_SLACK: Duration = Duration::days(7);

// The markets can be closed for up to several weeks around the new year,
// and as-of resolution needs a sample at or before the very first queried
// date, so the remote fetch window starts this far before the range.
const FETCH_LOOKBACK: Duration = Duration::days(31);

// Overall utility for loading rate series (both remotely and from cache).
pub struct RateLoader {
    pub force_download: bool,
    pub cache: Box<dyn RatesCache>,
    pub remote_loader: Box<dyn RemoteRateLoader>,
    err_stream: WriteHandle,
}

impl RateLoader {
    pub fn new(
        force_download: bool,
        cache: Box<dyn RatesCache>,
        remote_loader: Box<dyn RemoteRateLoader>,
        err_stream: WriteHandle,
    ) -> RateLoader {
        RateLoader {
            force_download,
            cache,
            remote_loader,
            err_stream: err_stream,
        }
    }

    // Returns the full series for one tracked foreign currency, covering
    // [from, to]. Uses the cache unless force_download is set, the cache
    // fails, or the cached series does not span the requested range.
    pub fn get_rate_series(
        &mut self,
        currency: &Currency,
        from: Date,
        to: Date,
    ) -> Result<RateSeries, Error> {
        if !self.force_download {
            match self.cache.get_rates(currency) {
                Err(e) => {
                    // This is non-fatal, as we can just do a server lookup.
                    write_errln!(
                        self.err_stream,
                        "Could not load cached exchange rates: {}",
                        e
                    );
                }
                Ok(Some(rates)) => {
                    let series = RateSeries::new(rates);
                    if Self::covers(&series, from, to) {
                        info!("RateLoader::get_rate_series {} found in cache",
                              currency);
                        return Ok(series);
                    }
                    info!("RateLoader::get_rate_series {} cache is stale",
                          currency);
                }
                Ok(None) => {
                    info!("RateLoader::get_rate_series NO {} rates in cache",
                          currency);
                }
            }
        }

        self.fetch_remote_rates(currency, from, to)
    }

    fn covers(series: &RateSeries, from: Date, to: Date) -> bool {
        match (series.first_date(), series.last_date()) {
            (Some(first), Some(last)) => {
                first <= from && last.saturating_add(CACHE_SLACK) >= to
            }
            _ => false,
        }
    }

    fn fetch_remote_rates(
        &mut self,
        currency: &Currency,
        from: Date,
        to: Date,
    ) -> Result<RateSeries, Error> {
        let fetch_from = from.saturating_sub(FETCH_LOOKBACK);
        let res = self
            .remote_loader
            .get_remote_rates(currency, fetch_from, to)?;
        for nfe in res.non_fatal_errors {
            write_errln!(self.err_stream, "{}", nfe);
        }
        if res.rates.is_empty() {
            return Err(format!(
                "Received no {} exchange rates between {} and {}",
                currency, fetch_from, to
            ));
        }

        let series = RateSeries::new(res.rates);
        if let Err(e) = self.cache.write_rates(currency, &series.samples().to_vec()) {
            error!("RateLoader::fetch_remote_rates cache write failed: {}", e);
            write_errln!(
                self.err_stream,
                "Failed to update exchange rate cache: {}",
                e
            );
        }

        Ok(series)
    }
}
