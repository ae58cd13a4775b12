// src/services/source.rs

//! Offer acquisition service.
//!
//! Fetches the source page and extracts boosted offers using configured CSS
//! selectors.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{Item, SENTINEL, SourceConfig, UNKNOWN_CATEGORY, is_resolved, timestamp_now};
use crate::services::Acquisition;
use crate::utils::{decimal_comma, http, normalize_whitespace};

/// Sport names keyed by the numeric id in the offer icon file name.
const SPORT_ICONS: &[(&str, &str)] = &[
    ("1", "Soccer"),
    ("2", "Horse Racing"),
    ("3", "Cricket"),
    ("5", "Specials"),
    ("7", "Golf"),
    ("8", "Rugby Union"),
    ("9", "Boxing"),
    ("10", "Formula 1"),
    ("12", "Tennis"),
    ("14", "Snooker"),
    ("15", "Darts"),
    ("16", "Baseball"),
    ("17", "Ice Hockey"),
    ("18", "Basketball"),
    ("19", "Rugby League"),
    ("24", "Speedway"),
    ("36", "Aussie Rules"),
    ("38", "Cycling"),
    ("78", "Handball"),
    ("83", "Futsal"),
];

/// Selectors compiled once at construction.
#[derive(Debug)]
struct CompiledSelectors {
    containers: Vec<Selector>,
    boost_marker: Selector,
    icon: Selector,
    details: Selector,
    subject: Selector,
    market: Selector,
    old_value: Selector,
    new_value: Selector,
}

impl CompiledSelectors {
    fn compile(config: &SourceConfig) -> Result<Self> {
        let fields = &config.fields;
        Ok(Self {
            containers: config
                .container_selectors
                .iter()
                .map(|s| parse_selector(s))
                .collect::<Result<_>>()?,
            boost_marker: parse_selector(&config.boost_marker_selector)?,
            icon: parse_selector(&fields.icon)?,
            details: parse_selector(&fields.details)?,
            subject: parse_selector(&fields.subject)?,
            market: parse_selector(&fields.market)?,
            old_value: parse_selector(&fields.old_value)?,
            new_value: parse_selector(&fields.new_value)?,
        })
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Acquisition over plain HTTP. The HTTP client is the managed resource.
pub struct HtmlAcquisition {
    config: SourceConfig,
    selectors: CompiledSelectors,
    sport_icon: Regex,
    client: Option<Client>,
    last_page: Option<String>,
}

impl HtmlAcquisition {
    /// Create an acquisition for the given source. Fails on invalid selectors.
    pub fn new(config: SourceConfig) -> Result<Self> {
        let selectors = CompiledSelectors::compile(&config)?;
        let sport_icon = Regex::new(r"/(\d+)\.svg$")
            .map_err(|e| AppError::config(format!("sport icon pattern: {e}")))?;

        Ok(Self {
            config,
            selectors,
            sport_icon,
            client: None,
            last_page: None,
        })
    }

    /// Extract all offers from a page.
    ///
    /// Container selectors are tried in order and the first group that
    /// matches anything is used.
    pub fn extract(&self, html: &str) -> Vec<Item> {
        let document = Html::parse_document(html);

        let containers: Vec<ElementRef> = self
            .selectors
            .containers
            .iter()
            .map(|sel| document.select(sel).collect::<Vec<_>>())
            .find(|found| !found.is_empty())
            .unwrap_or_default();

        if containers.is_empty() {
            log::info!("No offer containers found on page");
            return Vec::new();
        }
        log::info!("Found {} potential offers", containers.len());

        let observed_at = timestamp_now();
        let mut items = Vec::new();
        for container in containers {
            if container.select(&self.selectors.boost_marker).next().is_none() {
                continue;
            }
            match self.parse_container(&container, &observed_at) {
                Ok(item) => items.push(item),
                Err(e) => log::debug!("Skipping offer: {}", e),
            }
        }
        items
    }

    fn parse_container(&self, container: &ElementRef, observed_at: &str) -> Result<Item> {
        let sel = &self.selectors;
        let mut item = Item {
            category: self.category(container),
            market: text_of(container, &sel.market),
            details: text_of(container, &sel.details),
            subject: text_of(container, &sel.subject),
            old_value: text_of(container, &sel.old_value),
            new_value: text_of(container, &sel.new_value),
            observed_at: observed_at.to_string(),
        };

        if !item.has_identity() {
            return Err(AppError::extraction(format!(
                "offer without subject or market (subject={:?}, market={:?})",
                item.subject, item.market
            )));
        }
        if !is_resolved(&item.new_value) {
            return Err(AppError::extraction(format!(
                "offer '{}' has no boosted value",
                item.subject
            )));
        }

        if self.config.decimal_comma {
            item.old_value = decimal_comma(&item.old_value);
            item.new_value = decimal_comma(&item.new_value);
        }
        Ok(item)
    }

    fn category(&self, container: &ElementRef) -> String {
        let src = container
            .select(&self.selectors.icon)
            .next()
            .and_then(|icon| icon.value().attr("src"))
            .unwrap_or("");

        match self.sport_icon.captures(src).and_then(|caps| caps.get(1)) {
            Some(id) => SPORT_ICONS
                .iter()
                .find(|(key, _)| *key == id.as_str())
                .map(|(_, name)| name.to_string())
                .unwrap_or_else(|| format!("Sport ID {}", id.as_str())),
            None => UNKNOWN_CATEGORY.to_string(),
        }
    }
}

/// Text of the first match, whitespace-normalized, or the sentinel.
fn text_of(container: &ElementRef, selector: &Selector) -> String {
    container
        .select(selector)
        .next()
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| SENTINEL.to_string())
}

#[async_trait]
impl Acquisition for HtmlAcquisition {
    async fn initialize(&mut self) -> Result<()> {
        let client = http::create_client(&self.config.user_agent, self.config.timeout_secs)
            .map_err(AppError::acquisition)?;
        self.client = Some(client);
        log::info!("Acquisition client ready for {}", self.config.url);
        Ok(())
    }

    async fn fetch_candidates(&mut self) -> Result<Vec<Item>> {
        self.last_page = None;
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| AppError::acquisition("client not initialized"))?;

        log::info!("Fetching {}", self.config.url);
        let response = client
            .get(&self.config.url)
            .send()
            .await
            .map_err(AppError::acquisition)?;

        let status = response.status();
        let body = response.text().await;

        if !status.is_success() {
            self.last_page = body.ok();
            return Err(AppError::acquisition(format!(
                "{} returned {}",
                self.config.url, status
            )));
        }

        let html = body.map_err(AppError::acquisition)?;
        let items = self.extract(&html);
        self.last_page = Some(html);
        Ok(items)
    }

    async fn release(&mut self) {
        self.last_page = None;
        if self.client.take().is_some() {
            log::info!("Acquisition client released");
        }
    }

    async fn capture_diagnostics(&mut self) -> Option<Vec<u8>> {
        self.last_page.as_ref().map(|page| page.clone().into_bytes())
    }
}
