use crate::ConstituentSource;
use crate::error::ApiError;
use async_trait::async_trait;
use configuration::{HttpSettings, UniverseSettings};
use core_types::ReferenceTable;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

/// Scrapes the index constituent table from a Wikipedia article.
#[derive(Clone)]
pub struct WikipediaClient {
    client: reqwest::Client,
    url: String,
    table_index: usize,
}

impl WikipediaClient {
    pub fn new(universe: &UniverseSettings, http: &HttpSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(http.user_agent.clone())
            .timeout(Duration::from_secs(http.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: universe.source_url.clone(),
            table_index: universe.table_index,
        })
    }
}

#[async_trait]
impl ConstituentSource for WikipediaClient {
    async fn fetch_reference_table(&self) -> Result<ReferenceTable, ApiError> {
        tracing::debug!(url = %self.url, "Fetching constituent table.");

        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let table = parse_table(&text, self.table_index)?;
        tracing::info!(rows = table.len(), "Constituent table fetched.");
        Ok(table)
    }
}

/// Extracts the `index`-th `<table>` of an HTML document.
///
/// The first row that contains header cells supplies the column names; every
/// later row with at least one cell becomes a data row.
pub fn parse_table(html: &str, index: usize) -> Result<ReferenceTable, ApiError> {
    let document = Html::parse_document(html);
    let table_selector = selector("table")?;
    let row_selector = selector("tr")?;
    let header_selector = selector("th")?;
    let cell_selector = selector("th, td")?;

    let table = document
        .select(&table_selector)
        .nth(index)
        .ok_or_else(|| ApiError::InvalidData(format!("No table at index {} in the page", index)))?;

    let mut columns: Vec<String> = Vec::new();
    let mut rows = Vec::new();

    for row in table.select(&row_selector) {
        if columns.is_empty() {
            if row.select(&header_selector).next().is_some() {
                columns = row.select(&cell_selector).map(cell_text).collect();
            }
            continue;
        }

        let cells: Vec<String> = row.select(&cell_selector).map(cell_text).collect();
        if !cells.is_empty() {
            rows.push(cells);
        }
    }

    if columns.is_empty() {
        return Err(ApiError::InvalidData(format!(
            "Table at index {} has no header row",
            index
        )));
    }

    Ok(ReferenceTable::new(columns, rows))
}

fn selector(css: &str) -> Result<Selector, ApiError> {
    Selector::parse(css).map_err(|e| ApiError::InvalidData(format!("Bad selector '{}': {:?}", css, e)))
}

/// The visible text of a cell with whitespace collapsed and footnote
/// markers such as `[3]` or `[a]` removed.
fn cell_text(cell: ElementRef<'_>) -> String {
    let raw: String = cell.text().collect();
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    strip_footnotes(&collapsed)
}

fn strip_footnotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('[') {
        let after = &rest[open + 1..];
        match after.find(']') {
            Some(close) if close <= 3 && after[..close].chars().all(|c| c.is_ascii_alphanumeric()) => {
                out.push_str(&rest[..open]);
                rest = &after[close + 1..];
            }
            _ => {
                out.push_str(&rest[..=open]);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}
