//! Blog-post discovery for visualization descriptions.
//!
//! Candidate URLs for a track's date are probed serially; the first HTTP 200
//! wins and the sequence stops. A miss on every candidate records the
//! not-found marker instead; a transport failure aborts the run.

use crate::kml::{MONTH_NAMES, WEEKDAY_NAMES};
use crate::{ExtractError, Result};
use chrono::{Datelike, NaiveDate};
use tracing::{debug, info};

/// Recorded in the description when no candidate URL answered 200.
pub const NOT_FOUND_MARKER: &str = "not found";

const BLOG_BASE_URL: &str = "https://daily-rides.blogspot.com";

/// Issues one HEAD-like probe per candidate URL.
pub trait UrlProber {
    /// True when the URL answered HTTP 200.
    fn probe(&self, url: &str) -> Result<bool>;
}

/// Blocking HTTP prober.
pub struct HttpProber {
    client: reqwest::blocking::Client,
}

impl HttpProber {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| ExtractError::NetworkLookup {
                url: BLOG_BASE_URL.to_string(),
                detail: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl UrlProber for HttpProber {
    fn probe(&self, url: &str) -> Result<bool> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| ExtractError::NetworkLookup {
                url: url.to_string(),
                detail: e.to_string(),
            })?;
        debug!(%url, status = %response.status(), "probed candidate url");
        Ok(response.status() == reqwest::StatusCode::OK)
    }
}

/// Resolves a date to the blog post covering it, if one exists.
pub struct BlogFinder<'a> {
    prober: &'a dyn UrlProber,
}

impl<'a> BlogFinder<'a> {
    pub fn new(prober: &'a dyn UrlProber) -> Self {
        Self { prober }
    }

    /// Probe the candidate URLs for `date` in order; first 200 wins, no
    /// retries. Returns the winning URL or [`NOT_FOUND_MARKER`].
    pub fn find_for_date(&self, date: NaiveDate) -> Result<String> {
        for url in candidate_urls(date) {
            if self.prober.probe(&url)? {
                info!(%url, "blog post found");
                return Ok(url);
            }
        }
        info!(%date, "no blog post found");
        Ok(NOT_FOUND_MARKER.to_string())
    }
}

/// The blog's historical archive layouts, most recent first.
fn candidate_urls(date: NaiveDate) -> Vec<String> {
    let year = date.year();
    let month = date.month();
    let day = date.day();
    let weekday = WEEKDAY_NAMES[date.weekday().num_days_from_monday() as usize].to_lowercase();
    let month_name = MONTH_NAMES[month as usize].to_lowercase();

    vec![
        format!("{BLOG_BASE_URL}/{year}/{month:02}/ride-{year}-{month:02}-{day:02}.html"),
        format!("{BLOG_BASE_URL}/{year}/{month:02}/{weekday}-{month_name}-{day}-ride.html"),
        format!("{BLOG_BASE_URL}/{year}/{month:02}/{month_name}-{day}-ride.html"),
    ]
}
