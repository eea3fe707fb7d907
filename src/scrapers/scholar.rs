//! Google Scholar case law scraper.
//!
//! # URL Pattern
//!
//! Searches go to `https://scholar.google.com/scholar?hl=en&as_sdt=<court>&q=<phrase>`.
//! Result titles are `h3.gs_rt a` links to `/scholar_case?case=...` pages,
//! and the opinion body on a case page lives in `div#gs_opinion`.

use crate::egress::{ClientFactory, Discovery, PoolStore, Prober, RotationManager};
use crate::models::Opinion;
use crate::outputs::opinion::write_opinion;
use crate::utils::case_stem;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::error::Error;
use std::num::NonZeroUsize;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const SCHOLAR_ORIGIN: &str = "https://scholar.google.com/";

static RESULT_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("h3.gs_rt a[href]").unwrap());
static NAV_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("#gs_n a[href]").unwrap());
static NAV_NEXT_ICON: Lazy<Selector> = Lazy::new(|| Selector::parse("span.gs_ico_nav_next").unwrap());
static OPINION: Lazy<Selector> = Lazy::new(|| Selector::parse("div#gs_opinion").unwrap());
static TITLE_HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"h1[dir="ltr"]"#).unwrap());
static PAGE_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static SCHOLAR_BASE: Lazy<Url> = Lazy::new(|| Url::parse(SCHOLAR_ORIGIN).unwrap());

/// Build the first search results URL.
pub fn search_url(search_phrase: &str, court: &str) -> String {
    format!(
        "{SCHOLAR_ORIGIN}scholar?hl=en&as_sdt={}&q={}&btnG=&oq=",
        urlencoding::encode(court),
        urlencoding::encode(search_phrase)
    )
}

/// Opinion links on a search results page, resolved against `base`.
/// Only links that stay on Scholar are kept (citations to publisher sites
/// are dropped).
pub fn extract_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&RESULT_LINK)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .map(|u| u.to_string())
        .filter(|u| u.starts_with("https://scholar"))
        .collect()
}

/// Success predicate for search pages: at least one opinion link.
pub fn has_result_links(html: &str) -> bool {
    !extract_links(html, &SCHOLAR_BASE).is_empty()
}

/// The "Next" link of the results navigation, if there is one.
pub fn next_page_url(html: &str, base: &Url) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&NAV_LINK)
        .find(|a| a.select(&NAV_NEXT_ICON).next().is_some())
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| base.join(href).ok())
        .map(|u| u.to_string())
}

/// Success predicate for case pages.
pub fn has_opinion(html: &str) -> bool {
    Html::parse_document(html).select(&OPINION).next().is_some()
}

/// Pull the opinion text and title out of a case page.
///
/// Text nodes are joined with newlines and kept as they are. The segment
/// after the last newline holds the "Save / Cite" footer and is dropped.
pub fn extract_opinion(html: &str, source: &str) -> Option<Opinion> {
    let document = Html::parse_document(html);
    let body = document.select(&OPINION).next()?;

    let raw = body.text().collect::<Vec<_>>().join("\n");
    let mut segments: Vec<&str> = raw.split('\n').collect();
    segments.pop();
    let text = segments.join("\n");

    let title = first_text(&document, &TITLE_HEADING)
        .or_else(|| {
            first_text(&document, &PAGE_TITLE)
                .map(|t| t.trim_end_matches("- Google Scholar").trim().to_string())
        })
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| case_stem(source));

    Some(Opinion {
        source: source.to_string(),
        title,
        text,
    })
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|el: ElementRef| el.text().collect::<String>().trim().to_string())
}

/// Walk the search results from `start_url`, following "Next" until it
/// disappears or `max_pages` pages have been read. Returns the opinion
/// links in the order found, without duplicates.
#[instrument(level = "info", skip_all, fields(%start_url, ?max_pages))]
pub async fn harvest_links<S, P, D, F>(
    manager: &mut RotationManager<S, P, D, F>,
    start_url: &str,
    max_pages: Option<NonZeroUsize>,
) -> Result<Vec<String>, Box<dyn Error>>
where
    S: PoolStore,
    P: Prober,
    D: Discovery,
    F: ClientFactory,
{
    let mut links = Vec::new();
    let mut next = Some(start_url.to_string());
    let mut pages = 0usize;

    while let Some(url) = next.take() {
        let html = manager.run_with_rotation(&url, has_result_links).await?;
        pages += 1;

        let base = Url::parse(&url)?;
        let found = extract_links(&html, &base);
        debug!(page = pages, count = found.len(), "Extracted result links");
        links.extend(found);

        info!(
            page = pages,
            total = links.len(),
            via = %manager.active_candidate().map_or_else(|| "local connection".to_string(), |c| c.to_string()),
            "Fetched result page"
        );

        if max_pages.is_some_and(|max| pages >= max.get()) {
            info!(pages, "Reached maximum page count");
            break;
        }
        next = next_page_url(&html, &base);
        if next.is_none() {
            info!(pages, "No more search result pages");
        }
    }

    let links: Vec<String> = links.into_iter().unique().collect();
    info!(count = links.len(), "Harvested opinion links");
    Ok(links)
}

/// Fetch every link and write the opinion it holds. Returns how many
/// opinions were written.
#[instrument(level = "info", skip_all, fields(count = links.len(), %save_dir))]
pub async fn harvest_opinions<S, P, D, F>(
    manager: &mut RotationManager<S, P, D, F>,
    links: &[String],
    save_dir: &str,
) -> Result<usize, Box<dyn Error>>
where
    S: PoolStore,
    P: Prober,
    D: Discovery,
    F: ClientFactory,
{
    let total = links.len();
    let mut written = 0usize;

    for (i, link) in links.iter().enumerate() {
        let html = manager.run_with_rotation(link, has_opinion).await?;
        match extract_opinion(&html, link) {
            Some(opinion) => {
                let path = write_opinion(save_dir, &opinion).await?;
                written += 1;
                info!(done = i + 1, total, path = %path.display(), "Saved opinion");
            }
            None => warn!(%link, "Case page had no opinion body; skipping"),
        }
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r#"
        <html><body>
          <div class="gs_r">
            <h3 class="gs_rt"><a href="/scholar_case?case=111&q=miranda&hl=en&as_sdt=4,10">Miranda v. Arizona</a></h3>
          </div>
          <div class="gs_r">
            <h3 class="gs_rt"><span class="gs_ctu">[CITATION]</span><a href="https://www.example-reporter.com/case/42">Off-site</a></h3>
          </div>
          <div class="gs_r">
            <h3 class="gs_rt"><a href="https://scholar.google.com/scholar_case?case=222&hl=en">Dickerson v. United States</a></h3>
          </div>
          <div id="gs_n"><table><tr>
            <td><a href="/scholar?start=0&q=miranda"><span class="gs_ico gs_ico_nav_previous"></span>Previous</a></td>
            <td><a href="/scholar?start=10&q=miranda&hl=en&as_sdt=4,10"><span class="gs_ico gs_ico_nav_next"></span><b>Next</b></a></td>
          </tr></table></div>
        </body></html>
    "#;

    const LAST_PAGE: &str = r#"
        <html><body>
          <h3 class="gs_rt"><a href="/scholar_case?case=333">Vega v. Tekoh</a></h3>
          <div id="gs_n"><a href="/scholar?start=0"><span class="gs_ico_nav_previous"></span></a></div>
        </body></html>
    "#;

    const BLOCK_PAGE: &str = r#"<html><body><div id="gs_captcha_ccl">Please show you're not a robot</div></body></html>"#;

    const CASE_PAGE: &str = r#"
        <html><head><title>Miranda v. Arizona, 384 US 436 - Supreme Court 1966 - Google Scholar</title></head>
        <body>
          <h1 dir="ltr">Miranda v. Arizona</h1>
          <div id="gs_opinion_wrapper"><div id="gs_opinion">
            <center><b>384 U.S. 436 (1966)</b></center>
            <p>MR. CHIEF JUSTICE WARREN delivered the opinion of the Court.</p>
            <p>The cases before us raise questions which go to the roots of our concepts.</p>
            <a href="/scholar?cites=1">Save / Cite</a>
          </div></div>
        </body></html>
    "#;

    fn base() -> Url {
        Url::parse("https://scholar.google.com/scholar?q=miranda").unwrap()
    }

    #[test]
    fn test_search_url_encodes_phrase_and_court() {
        assert_eq!(
            search_url("fourth amendment & curtilage", "4,10"),
            "https://scholar.google.com/scholar?hl=en&as_sdt=4%2C10&q=fourth%20amendment%20%26%20curtilage&btnG=&oq="
        );
    }

    #[test]
    fn test_extract_links_resolves_and_keeps_scholar_only() {
        let links = extract_links(RESULTS_PAGE, &base());
        assert_eq!(
            links,
            vec![
                "https://scholar.google.com/scholar_case?case=111&q=miranda&hl=en&as_sdt=4,10",
                "https://scholar.google.com/scholar_case?case=222&hl=en",
            ]
        );
    }

    #[test]
    fn test_block_page_fails_predicate() {
        assert!(has_result_links(RESULTS_PAGE));
        assert!(!has_result_links(BLOCK_PAGE));
        assert!(!has_opinion(BLOCK_PAGE));
    }

    #[test]
    fn test_next_page_url() {
        assert_eq!(
            next_page_url(RESULTS_PAGE, &base()).as_deref(),
            Some("https://scholar.google.com/scholar?start=10&q=miranda&hl=en&as_sdt=4,10")
        );
        assert_eq!(next_page_url(LAST_PAGE, &base()), None);
    }

    #[test]
    fn test_extract_opinion() {
        let source = "https://scholar.google.com/scholar_case?case=111";
        assert!(has_opinion(CASE_PAGE));

        let opinion = extract_opinion(CASE_PAGE, source).unwrap();

        assert_eq!(opinion.title, "Miranda v. Arizona");
        assert_eq!(opinion.source, source);
        let lines: Vec<&str> = opinion.text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        assert_eq!(
            lines,
            vec![
                "384 U.S. 436 (1966)",
                "MR. CHIEF JUSTICE WARREN delivered the opinion of the Court.",
                "The cases before us raise questions which go to the roots of our concepts.",
                "Save / Cite",
            ]
        );
    }

    #[test]
    fn test_extract_opinion_keeps_closing_line_and_blank_lines() {
        let page = "<html><body><div id=\"gs_opinion\"><p>Para one.</p>\n\n<p>It is so ordered.</p>\n</div></body></html>";

        let opinion = extract_opinion(page, "https://scholar.google.com/scholar_case?case=111").unwrap();

        assert_eq!(opinion.text, "Para one.\n\n\n\nIt is so ordered.\n");
    }

    #[test]
    fn test_extract_opinion_title_fallbacks() {
        let no_heading = CASE_PAGE.replace(r#"<h1 dir="ltr">Miranda v. Arizona</h1>"#, "");
        let opinion = extract_opinion(&no_heading, "https://scholar.google.com/scholar_case?case=111").unwrap();
        assert_eq!(opinion.title, "Miranda v. Arizona, 384 US 436 - Supreme Court 1966");

        let bare = r#"<html><body><div id="gs_opinion"><p>Text</p><p>footer</p></div></body></html>"#;
        let opinion = extract_opinion(bare, "https://scholar.google.com/scholar_case?case=999&hl=en").unwrap();
        assert_eq!(opinion.title, "opinion_999");
        assert_eq!(opinion.text, "Text");
    }

    #[test]
    fn test_extract_opinion_missing_body() {
        assert!(extract_opinion(BLOCK_PAGE, "https://scholar.google.com/x").is_none());
    }
}
