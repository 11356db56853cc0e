//! Content extraction for fetched pages
//!
//! This module handles:
//! - Selecting the primary content region and any blog-post regions
//! - Mirroring images inside those regions through the asset store
//! - Harvesting in-scope links from the whole document
//!
//! Region selection is an ordered list of strategies per region kind; the first
//! strategy that finds anything wins.
//!
//! `scraper::Html` is not `Send`, so the document is parsed twice: once to survey
//! regions, images and links, and again after the image downloads to render the
//! regions. Both passes select regions the same way.

use crate::crawler::assets::AssetStore;
use crate::crawler::render::{collect_image_sources, render_region, ImageRewrite, Rewrites};
use crate::url::{resolve_and_normalize, CanonicalUrl, Route, Scope};
use crate::HarvestError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Page-container marker
const ITEM_PAGE_SELECTOR: &str = "div.item-page";

/// Generic content containers, tried when no page container exists
const GENERIC_CONTENT_SELECTOR: &str = r#"article, [role="main"], main, #content, .content"#;

/// Blog-post markers, in priority order
const BLOG_POST_SELECTORS: &[&str] = &[r#"div[itemprop="blogPost"]"#, r#"div[itemprop="blogpost"]"#];

/// Class-name fallback for blog posts (`leading-0`, `leading-1`, ...)
const BLOG_POST_CLASS_PATTERN: &str = r"^leading-\d+$";

/// One way of locating a content region
#[derive(Debug)]
pub enum RegionStrategy {
    /// Elements matching a CSS selector
    Css { name: &'static str, selector: Selector },
    /// `div` elements carrying a class that matches a pattern
    ClassPattern { name: &'static str, pattern: Regex },
    /// The document body (or the root element when there is no body)
    WholeDocument,
}

impl RegionStrategy {
    fn css(name: &'static str, selector: &str) -> Result<Self, HarvestError> {
        let selector = Selector::parse(selector).map_err(|e| HarvestError::Selector {
            selector: selector.to_string(),
            message: format!("{:?}", e),
        })?;
        Ok(Self::Css { name, selector })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Css { name, .. } | Self::ClassPattern { name, .. } => name,
            Self::WholeDocument => "document",
        }
    }

    /// Returns every match in document order
    pub fn find<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        match self {
            Self::Css { selector, .. } => document.select(selector).collect(),
            Self::ClassPattern { pattern, .. } => document
                .root_element()
                .descendants()
                .filter_map(ElementRef::wrap)
                .filter(|el| {
                    el.value().name() == "div"
                        && el.value().classes().any(|class| pattern.is_match(class))
                })
                .collect(),
            Self::WholeDocument => {
                let body = document
                    .root_element()
                    .children()
                    .filter_map(ElementRef::wrap)
                    .find(|el| el.value().name() == "body");
                vec![body.unwrap_or_else(|| document.root_element())]
            }
        }
    }
}

/// Content fragments pulled from one page, images already rewritten
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub primary: Option<String>,
    pub secondary: Vec<String>,
    /// Name of the strategy that produced `primary`
    pub primary_strategy: Option<&'static str>,
}

impl ExtractedDocument {
    /// Returns true if neither a primary nor a secondary region was found
    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.secondary.is_empty()
    }

    /// Number of files this document will produce
    pub fn fragment_count(&self) -> usize {
        usize::from(self.primary.is_some()) + self.secondary.len()
    }
}

/// Regions, images and links found in a page before any download
#[derive(Debug, Clone, Default)]
pub struct Survey {
    /// Raw `img[src]` values inside selected regions, unique, in document order
    pub image_sources: Vec<String>,
    pub links: HashSet<CanonicalUrl>,
    pub has_regions: bool,
}

/// Full result of processing one page
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub document: ExtractedDocument,
    /// In-scope outbound links, deduplicated
    pub links: HashSet<CanonicalUrl>,
    /// Number of image references rewritten to local copies
    pub images_rewritten: usize,
}

struct Regions<'a> {
    primary: Option<(ElementRef<'a>, &'static str)>,
    secondary: Vec<ElementRef<'a>>,
}

/// Extracts content regions and links from fetched pages
#[derive(Debug)]
pub struct Extractor {
    page_container: RegionStrategy,
    generic: RegionStrategy,
    document: Option<RegionStrategy>,
    blog_posts: Vec<RegionStrategy>,
    anchors: Selector,
    scope: Scope,
}

impl Extractor {
    /// Builds an extractor for the given scope
    ///
    /// With `fallback_to_document` set, pages with no recognized region save their
    /// whole body as the primary region instead of producing nothing.
    pub fn new(scope: Scope, fallback_to_document: bool) -> Result<Self, HarvestError> {
        let mut blog_posts = Vec::new();
        for selector in BLOG_POST_SELECTORS {
            blog_posts.push(RegionStrategy::css("blog-post", selector)?);
        }
        blog_posts.push(RegionStrategy::ClassPattern {
            name: "leading-class",
            pattern: Regex::new(BLOG_POST_CLASS_PATTERN)?,
        });

        let anchors = Selector::parse("a[href]").map_err(|e| HarvestError::Selector {
            selector: "a[href]".to_string(),
            message: format!("{:?}", e),
        })?;

        Ok(Self {
            page_container: RegionStrategy::css("item-page", ITEM_PAGE_SELECTOR)?,
            generic: RegionStrategy::css("generic", GENERIC_CONTENT_SELECTOR)?,
            document: fallback_to_document.then_some(RegionStrategy::WholeDocument),
            blog_posts,
            anchors,
            scope,
        })
    }

    /// Processes a fetched page
    ///
    /// Images inside the selected regions are resolved through `assets` under the
    /// page's route; failed resolutions leave the reference untouched.
    pub async fn extract(
        &self,
        body: &str,
        source: &CanonicalUrl,
        route: &Route,
        assets: &AssetStore,
    ) -> Extraction {
        let survey = self.survey(body, source);

        let mut rewrites = Rewrites::new();
        for src in &survey.image_sources {
            let Some(absolute) = image_target(source.as_url(), src) else {
                continue;
            };
            if let Some(local) = assets.resolve(&absolute, route).await {
                rewrites.insert(
                    src.clone(),
                    ImageRewrite {
                        local: local.relative,
                        original: absolute,
                    },
                );
            }
        }

        let document = if survey.has_regions {
            self.render(body, &rewrites)
        } else {
            ExtractedDocument::default()
        };

        Extraction {
            document,
            links: survey.links,
            images_rewritten: rewrites.len(),
        }
    }

    /// Locates regions, images and links without touching the network
    pub fn survey(&self, body: &str, source: &CanonicalUrl) -> Survey {
        let document = Html::parse_document(body);
        let regions = self.select_regions(&document);

        let mut sources = Vec::new();
        if let Some((primary, _)) = regions.primary {
            collect_image_sources(primary, &mut sources);
        }
        for post in &regions.secondary {
            collect_image_sources(*post, &mut sources);
        }
        let mut seen = HashSet::new();
        sources.retain(|src| seen.insert(src.clone()));

        Survey {
            image_sources: sources,
            links: self.harvest_links(&document, source),
            has_regions: regions.primary.is_some() || !regions.secondary.is_empty(),
        }
    }

    /// Serializes the selected regions with image rewrites applied
    pub fn render(&self, body: &str, rewrites: &Rewrites) -> ExtractedDocument {
        let document = Html::parse_document(body);
        let regions = self.select_regions(&document);

        ExtractedDocument {
            primary: regions
                .primary
                .map(|(region, _)| render_region(region, rewrites)),
            secondary: regions
                .secondary
                .iter()
                .map(|post| render_region(*post, rewrites))
                .collect(),
            primary_strategy: regions.primary.map(|(_, name)| name),
        }
    }

    /// Collects in-scope links from every anchor in the document
    pub fn harvest_links(&self, document: &Html, source: &CanonicalUrl) -> HashSet<CanonicalUrl> {
        document
            .select(&self.anchors)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(follow_target)
            .filter_map(|href| resolve_and_normalize(source.as_url(), href).ok())
            .filter(|url| self.scope.is_in_scope(url))
            .collect()
    }

    fn select_regions<'a>(&self, document: &'a Html) -> Regions<'a> {
        let secondary = self
            .blog_posts
            .iter()
            .map(|strategy| strategy.find(document))
            .find(|found| !found.is_empty())
            .unwrap_or_default();

        let primary = first_match(&self.page_container, document)
            .or_else(|| first_match(&self.generic, document))
            .or_else(|| {
                self.document
                    .as_ref()
                    .and_then(|strategy| first_match(strategy, document))
            });

        Regions { primary, secondary }
    }
}

fn first_match<'a>(
    strategy: &RegionStrategy,
    document: &'a Html,
) -> Option<(ElementRef<'a>, &'static str)> {
    strategy
        .find(document)
        .into_iter()
        .next()
        .map(|el| (el, strategy.name()))
}

/// Filters hrefs that never lead to a page
fn follow_target(href: &str) -> Option<&str> {
    let href = href.trim();
    let lower = href.to_ascii_lowercase();
    if href.is_empty()
        || href.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
    {
        return None;
    }
    Some(href)
}

/// Absolute URL of an image reference, or `None` for inline `data:` images
fn image_target(source: &Url, src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() || src.starts_with("data:") {
        return None;
    }
    if src.starts_with("//") {
        return Some(format!("https:{}", src));
    }
    source.join(src).ok().map(|url| url.to_string())
}
