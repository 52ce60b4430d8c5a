use regex::Regex;
use select::document::Document;
use select::predicate::{Attr, Name};
use url::Url;

use crate::assets::AssetTask;
use crate::exporter::SiteContext;
use crate::paths::{self, AssetClass};
use crate::urls;

/// Substrings that identify the hosting vendor's badge anchor. Matched
/// against the opening tag, which covers both class names and inline styles.
const BADGE_ELEMENT_MARKERS: &[&str] = &["w-webflow-badge"];

/// Inline scripts containing any of these are dropped wholesale.
const BADGE_SCRIPT_MARKERS: &[&str] = &["w-webflow-badge"];

/// Images whose tag mentions any of these are dropped.
const BADGE_IMAGE_MARKERS: &[&str] = &["webflow-badge", "made-in-webflow"];

/// Outcome of rewriting one fetched document.
pub struct RewriteResult {
    /// The rewritten HTML, ready to persist.
    pub html: String,
    /// Download obligations introduced by this document.
    pub assets: Vec<AssetTask>,
    /// Same-origin page URLs discovered in anchors, absolute form.
    pub links: Vec<Url>,
}

/// Rewrites every reference in a document so the page works from its local
/// output path: same-origin anchors point at local `.html` files, asset
/// references point at the per-class asset directories, and vendor branding
/// is stripped. Cross-origin anchors and unfetchable targets are untouched.
///
/// Running the pass over an already-rewritten document is a no-op: local
/// references resolve back (via the page's base URL) to the same local path
/// they already carry.
pub fn rewrite_document(
    html: &str,
    source_url: &Url,
    output_path: &str,
    ctx: &SiteContext,
) -> RewriteResult {
    let mut pass = RewritePass {
        html: strip_branding(html),
        base: source_url.clone(),
        prefix: paths::root_relative_prefix(output_path),
        ctx,
        assets: Vec::new(),
        links: Vec::new(),
    };

    let doc = Document::from(pass.html.as_str());
    pass.rewrite_anchors(&doc);
    pass.rewrite_images(&doc);
    pass.rewrite_stylesheet_links(&doc);
    pass.rewrite_scripts(&doc);
    pass.rewrite_inline_styles(&doc);
    pass.rewrite_favicons(&doc);

    RewriteResult {
        html: pass.html,
        assets: pass.assets,
        links: pass.links,
    }
}

/// Removes vendor badge elements: anchors carrying a badge class or style,
/// badge images, and inline scripts that reinsert the badge.
pub fn strip_branding(html: &str) -> String {
    let mut out = html.to_string();

    for marker in BADGE_ELEMENT_MARKERS {
        let pattern = format!(r"(?s)<a\b[^>]*{}[^>]*>.*?</a>", regex::escape(marker));
        if let Ok(re) = Regex::new(&pattern) {
            out = re.replace_all(&out, "").into_owned();
        }
    }

    for marker in BADGE_IMAGE_MARKERS {
        let pattern = format!(r"<img\b[^>]*{}[^>]*/?>", regex::escape(marker));
        if let Ok(re) = Regex::new(&pattern) {
            out = re.replace_all(&out, "").into_owned();
        }
    }

    // The regex crate has no lookaround, so script blocks are located first
    // and filtered by content.
    if let Ok(re) = Regex::new(r"(?s)<script\b[^>]*>.*?</script>") {
        let doomed: Vec<String> = re
            .find_iter(&out)
            .filter(|m| BADGE_SCRIPT_MARKERS.iter().any(|marker| m.as_str().contains(marker)))
            .map(|m| m.as_str().to_string())
            .collect();
        for block in doomed {
            out = out.replace(&block, "");
        }
    }

    out
}

struct RewritePass<'a> {
    html: String,
    base: Url,
    prefix: String,
    ctx: &'a SiteContext,
    assets: Vec<AssetTask>,
    links: Vec<Url>,
}

impl RewritePass<'_> {
    /// Registers a download task for an asset reference and returns the
    /// prefixed local reference to substitute, or None when the reference is
    /// not fetchable.
    fn register_asset(&mut self, raw: &str, class: AssetClass) -> Option<String> {
        let raw = raw.trim();
        if urls::is_skippable(raw) || raw.starts_with("data:") {
            return None;
        }
        let absolute = urls::resolve(&self.base, raw).ok()?;
        if !matches!(absolute.scheme(), "http" | "https") {
            return None;
        }
        let local = paths::asset_local_path(&absolute, class);
        self.assets.push(AssetTask {
            url: absolute.to_string(),
            local_path: local.clone(),
            class,
        });
        Some(format!("{}{}", self.prefix, local))
    }

    fn replace_attr(&mut self, attr: &str, old: &str, new: &str) {
        if old == new {
            return;
        }
        self.html = self
            .html
            .replace(&format!("{attr}=\"{old}\""), &format!("{attr}=\"{new}\""));
    }

    fn rewrite_anchors(&mut self, doc: &Document) {
        for node in doc.find(Name("a")) {
            let Some(href) = node.attr("href") else { continue };
            if urls::is_skippable(href) {
                continue;
            }
            let Ok(absolute) = urls::resolve(&self.base, href) else {
                continue;
            };
            if !urls::is_same_origin(&absolute, &self.ctx.origin) {
                continue;
            }
            self.links.push(absolute.clone());
            let local = format!("{}{}", self.prefix, paths::page_output_path(&absolute));
            self.replace_attr("href", href, &local);
        }
    }

    fn rewrite_images(&mut self, doc: &Document) {
        for node in doc.find(Name("img")) {
            if let Some(src) = node.attr("src") {
                if let Some(local) = self.register_asset(src, AssetClass::Image) {
                    self.replace_attr("src", src, &local);
                }
            }
            if let Some(srcset) = node.attr("srcset") {
                if let Some(rewritten) = self.rewrite_srcset(srcset) {
                    self.replace_attr("srcset", srcset, &rewritten);
                }
            }
        }
    }

    /// Each comma-separated srcset candidate is `<url> [descriptor]`; the URL
    /// part is rewritten per candidate, descriptors kept as-is.
    fn rewrite_srcset(&mut self, srcset: &str) -> Option<String> {
        let mut changed = false;
        let mut candidates = Vec::new();
        for part in srcset.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let mut pieces = part.split_whitespace();
            let raw = pieces.next()?;
            let descriptors: Vec<&str> = pieces.collect();
            match self.register_asset(raw, AssetClass::Image) {
                Some(local) => {
                    changed = true;
                    let mut candidate = local;
                    for d in descriptors {
                        candidate.push(' ');
                        candidate.push_str(d);
                    }
                    candidates.push(candidate);
                }
                None => candidates.push(part.to_string()),
            }
        }
        changed.then(|| candidates.join(", "))
    }

    fn rewrite_stylesheet_links(&mut self, doc: &Document) {
        // When CSS processing is disabled, stylesheet hrefs keep pointing at
        // the original remote URLs so remote font/asset resolution keeps
        // working.
        if !self.ctx.rewrite_css {
            return;
        }
        for node in doc.find(Name("link")) {
            let Some(rel) = node.attr("rel") else { continue };
            if !rel.contains("stylesheet") {
                continue;
            }
            if let Some(href) = node.attr("href") {
                if let Some(local) = self.register_asset(href, AssetClass::Stylesheet) {
                    self.replace_attr("href", href, &local);
                }
            }
        }
    }

    fn rewrite_scripts(&mut self, doc: &Document) {
        for node in doc.find(Name("script")) {
            if let Some(src) = node.attr("src") {
                if let Some(local) = self.register_asset(src, AssetClass::Script) {
                    self.replace_attr("src", src, &local);
                }
            }
        }
    }

    fn rewrite_inline_styles(&mut self, doc: &Document) {
        let bg_re = Regex::new(r#"background(?:-image)?\s*:\s*url\(['"]?([^'")\s]+)['"]?\)"#)
            .expect("static pattern");
        for node in doc.find(Attr("style", ())) {
            let Some(style) = node.attr("style") else { continue };
            let mut seen = Vec::new();
            let mut rewritten = style.to_string();
            for cap in bg_re.captures_iter(style) {
                let lit = cap[1].to_string();
                if seen.contains(&lit) {
                    continue;
                }
                seen.push(lit.clone());
                if let Some(local) = self.register_asset(&lit, AssetClass::Image) {
                    rewritten = rewritten.replace(&lit, &local);
                }
            }
            if rewritten != style {
                let style = style.to_string();
                self.replace_attr("style", &style, &rewritten);
            }
        }
    }

    fn rewrite_favicons(&mut self, doc: &Document) {
        for node in doc.find(Name("link")) {
            let Some(rel) = node.attr("rel") else { continue };
            if !(rel.contains("icon") || rel.contains("shortcut")) {
                continue;
            }
            if let Some(href) = node.attr("href") {
                if let Some(local) = self.register_asset(href, AssetClass::Image) {
                    self.replace_attr("href", href, &local);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> SiteContext {
        SiteContext::new("https://x.io", 2, 0.0, true, true, false).unwrap()
    }

    fn ctx_no_css() -> SiteContext {
        SiteContext::new("https://x.io", 2, 0.0, true, false, false).unwrap()
    }

    const PAGE: &str = r##"<!DOCTYPE html>
<html>
<head>
<link rel="stylesheet" href="/css/site.css">
<link rel="shortcut icon" href="/media/favicon.ico">
<script src="https://x.io/js/app.js"></script>
</head>
<body>
<a href="/about">About</a>
<a href="/about/">About again</a>
<a href="https://other.io/page">Elsewhere</a>
<a href="#top">Top</a>
<a href="mailto:hi@x.io">Mail</a>
<img src="https://cdn.x.io/media/hero.png" srcset="https://cdn.x.io/media/hero.png 1x, https://cdn.x.io/media/hero%402x.png 2x">
<div style="background-image: url('/media/bg.jpg')">banner</div>
</body>
</html>"##;

    #[test]
    fn rewrites_same_origin_anchors_only() {
        let base = Url::parse("https://x.io/").unwrap();
        let result = rewrite_document(PAGE, &base, "index.html", &ctx());

        assert!(result.html.contains(r#"href="about.html""#));
        assert!(result.html.contains(r#"href="https://other.io/page""#));
        assert!(result.html.contains(r##"href="#top""##));
        assert!(result.html.contains(r#"href="mailto:hi@x.io""#));

        let links: Vec<String> = result.links.iter().map(|u| u.to_string()).collect();
        assert!(links.contains(&"https://x.io/about".to_string()));
        assert!(!links.iter().any(|l| l.contains("other.io")));
    }

    #[test]
    fn rewrites_assets_and_registers_tasks() {
        let base = Url::parse("https://x.io/").unwrap();
        let result = rewrite_document(PAGE, &base, "index.html", &ctx());

        assert!(result.html.contains(r#"src="images/hero.png""#));
        assert!(result.html.contains("images/hero_2x.png 2x"));
        assert!(result.html.contains(r#"href="css/site.css""#));
        assert!(result.html.contains(r#"src="js/app.js""#));
        assert!(result.html.contains(r#"href="images/favicon.ico""#));
        assert!(result.html.contains("url('images/bg.jpg')"));

        let urls: Vec<&str> = result.assets.iter().map(|t| t.url.as_str()).collect();
        assert!(urls.contains(&"https://cdn.x.io/media/hero.png"));
        assert!(urls.contains(&"https://cdn.x.io/media/hero%402x.png"));
        assert!(urls.contains(&"https://x.io/css/site.css"));
        assert!(urls.contains(&"https://x.io/js/app.js"));
        assert!(urls.contains(&"https://x.io/media/favicon.ico"));
        assert!(urls.contains(&"https://x.io/media/bg.jpg"));
    }

    #[test]
    fn nested_pages_get_climbing_prefixes() {
        let html = r#"<a href="/about">About</a><img src="/media/a.png">"#;
        let base = Url::parse("https://x.io/blog/post-a").unwrap();
        let result = rewrite_document(html, &base, "blog/post-a.html", &ctx());

        assert!(result.html.contains(r#"href="../about.html""#));
        assert!(result.html.contains(r#"src="../images/a.png""#));
    }

    #[test]
    fn css_flag_gates_stylesheet_links() {
        let base = Url::parse("https://x.io/").unwrap();
        let result = rewrite_document(PAGE, &base, "index.html", &ctx_no_css());

        // Stylesheet href untouched, no stylesheet task.
        assert!(result.html.contains(r#"href="/css/site.css""#));
        assert!(!result.assets.iter().any(|t| t.class == AssetClass::Stylesheet));
        // Scripts are not gated by the CSS flag.
        assert!(result.html.contains(r#"src="js/app.js""#));
    }

    #[test]
    fn rewriting_twice_is_a_no_op() {
        let base = Url::parse("https://x.io/").unwrap();
        let once = rewrite_document(PAGE, &base, "index.html", &ctx());
        let twice = rewrite_document(&once.html, &base, "index.html", &ctx());
        assert_eq!(once.html, twice.html);

        let nested = r#"<a href="/about">About</a><img src="/media/a.png">"#;
        let base = Url::parse("https://x.io/blog/post-a").unwrap();
        let once = rewrite_document(nested, &base, "blog/post-a.html", &ctx());
        let twice = rewrite_document(&once.html, &base, "blog/post-a.html", &ctx());
        assert_eq!(once.html, twice.html);
    }

    #[test]
    fn strips_vendor_badge_markup() {
        let html = r#"<body>
<p>keep me</p>
<a class="w-webflow-badge" href="https://vendor.example"><img src="https://assets.example/webflow-badge-icon.png"></a>
<img src="https://assets.example/made-in-webflow.svg">
<script type="text/javascript">var badge = document.querySelector(".w-webflow-badge"); badge.remove();</script>
<script src="/js/app.js"></script>
</body>"#;
        let stripped = strip_branding(html);

        assert!(stripped.contains("keep me"));
        assert!(stripped.contains(r#"<script src="/js/app.js">"#));
        assert!(!stripped.contains("w-webflow-badge"));
        assert!(!stripped.contains("made-in-webflow"));
    }

    #[test]
    fn data_urls_are_never_tasks() {
        let html = r#"<img src="data:image/png;base64,AAAA">"#;
        let base = Url::parse("https://x.io/").unwrap();
        let result = rewrite_document(html, &base, "index.html", &ctx());
        assert!(result.assets.is_empty());
        assert!(result.html.contains("data:image/png;base64,AAAA"));
    }

    #[test]
    fn duplicate_references_yield_duplicate_tasks_for_caller_dedup() {
        let html = r#"<img src="/media/a.png"><img src="/media/a.png">"#;
        let base = Url::parse("https://x.io/").unwrap();
        let result = rewrite_document(html, &base, "index.html", &ctx());
        // The scheduler dedups by URL; the rewriter just reports what it saw.
        assert_eq!(result.assets.len(), 2);
    }
}
