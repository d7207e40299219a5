//! Parsed HTML index pages.
//!
//! A legacy package index answers `GET {base}/{name}/` with an HTML
//! document of anchors, one per distributable file. `IndexPage` owns the
//! parse tree for one such document and derives candidate links and
//! versions from it.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use scraper::{Html, Selector};
use url::Url;

use harbor_core::types::Link;
use harbor_core::Version;

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("anchor selector"));

// `{dist}-{version}(-{build})?-{python tag}-{abi tag}-{platform tag}.whl`
static WHEEL_FILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?P<namever>(?P<name>.+?)-(?P<ver>\d.*?))(-(?P<build>\d.*?))?-(?P<pyver>.+?)-(?P<abi>.+?)-(?P<plat>.+?)\.whl$",
    )
    .expect("wheel filename pattern")
});

// `{name}-{version}` where the version must begin with a digit
static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([a-z0-9_\-.]+?)-(\d[a-z0-9_.!+-]*)$").expect("version pattern"));

// Everything outside this conservative safe set gets percent-encoded when
// cleaning a link. `%` stays safe so already-escaped sequences survive.
const LINK_CLEAN: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b',')
    .remove(b'/')
    .remove(b':')
    .remove(b';')
    .remove(b'=')
    .remove(b'?')
    .remove(b'@')
    .remove(b'.')
    .remove(b'#')
    .remove(b'%')
    .remove(b'_')
    .remove(b'\\')
    .remove(b'|')
    .remove(b'-');

/// The parsed HTML document for one index path. Not mutated after
/// construction.
pub struct IndexPage {
    url: Url,
    document: Html,
}

impl IndexPage {
    /// Parse a fetched index document. The character encoding comes from
    /// the `Content-Type` header's `charset` parameter when present.
    pub fn new(mut url: Url, body: &[u8], headers: &HeaderMap) -> Self {
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let content = decode_body(body, charset_from_headers(headers).as_deref());
        let document = Html::parse_document(&content);

        Self { url, document }
    }

    /// Base URL used to resolve relative hrefs
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Candidate artifact links: every anchor with an `href`, resolved
    /// against the base URL and filtered to the supported archive formats.
    pub fn links(&self) -> impl Iterator<Item = Link> + '_ {
        self.document.select(&ANCHOR_SELECTOR).filter_map(move |anchor| {
            let href = anchor.value().attr("href")?;
            let resolved = self.url.join(href).ok()?;
            let cleaned = clean_link(resolved.as_str());
            let url = Url::parse(&cleaned).ok()?;

            // the parser already unescaped HTML entities in the attribute
            let requires_python = anchor
                .value()
                .attr("data-requires-python")
                .map(str::to_string);

            let link = Link::new(url, requires_python);
            link.is_supported().then_some(link)
        })
    }

    /// Versions derived from the links, deduplicated by parsed equality,
    /// in first-seen order. Restartable: re-walks `links` on every call.
    pub fn versions(&self) -> impl Iterator<Item = Version> + '_ {
        let mut seen = HashSet::new();
        self.links().filter_map(move |link| {
            let version = Self::link_version(&link)?;
            seen.insert(version.clone()).then_some(version)
        })
    }

    /// Links whose derived version equals the given one
    pub fn links_for_version<'a>(&'a self, version: &'a Version) -> impl Iterator<Item = Link> + 'a {
        self.links()
            .filter(move |link| Self::link_version(link).as_ref() == Some(version))
    }

    /// Derive a version from a link's filename: wheel filenames carry the
    /// version directly, anything else is matched as `{name}-{version}`
    /// with a digit-led version. Unparsable filenames yield no version.
    pub fn link_version(link: &Link) -> Option<Version> {
        let filename = link.filename();

        let text = match WHEEL_FILE_RE.captures(&filename) {
            Some(caps) => caps["ver"].to_string(),
            None => {
                let stem = link.stem();
                let caps = VERSION_RE.captures(&stem)?;
                caps[2].to_string()
            },
        };

        Version::parse(&text).ok()
    }
}

fn charset_from_headers(headers: &HeaderMap) -> Option<String> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;

    for param in content_type.split(';').skip(1) {
        if let Some((key, value)) = param.split_once('=') {
            if key.trim().eq_ignore_ascii_case("charset") {
                return Some(value.trim().trim_matches('"').to_string());
            }
        }
    }

    None
}

fn decode_body(body: &[u8], charset: Option<&str>) -> String {
    match charset {
        Some(label)
            if label.eq_ignore_ascii_case("iso-8859-1")
                || label.eq_ignore_ascii_case("latin-1")
                || label.eq_ignore_ascii_case("latin1")
                || label.eq_ignore_ascii_case("windows-1252") =>
        {
            body.iter().map(|&byte| byte as char).collect()
        },
        // utf-8, us-ascii, unknown labels: the parser copes with lossy utf-8
        _ => String::from_utf8_lossy(body).into_owned(),
    }
}

fn clean_link(url: &str) -> String {
    utf8_percent_encode(url, LINK_CLEAN).to_string()
}
