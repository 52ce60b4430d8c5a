use regex::Regex;
use url::Url;

use crate::assets::AssetTask;
use crate::exporter::SiteContext;
use crate::paths::{self, AssetClass};
use crate::urls;

/// Outcome of rewriting one stylesheet: the new text plus the download
/// obligations it introduced.
pub struct CssRewrite {
    pub css: String,
    pub tasks: Vec<AssetTask>,
}

/// Rewrites every fetchable `url(...)` occurrence in a stylesheet to a path
/// relative to the stylesheet's own output location, and records a download
/// task for each referenced asset.
///
/// `data:` URLs and literals containing unresolved template markers (`${`,
/// `$(`) are left verbatim. When CSS processing is disabled for the run the
/// text passes through untouched.
pub fn rewrite_css(
    css: &str,
    source_url: &Url,
    css_output_path: &str,
    ctx: &SiteContext,
) -> CssRewrite {
    if !ctx.rewrite_css {
        return CssRewrite {
            css: css.to_string(),
            tasks: Vec::new(),
        };
    }

    let url_re = Regex::new(r#"url\(\s*['"]?([^'")]+?)['"]?\s*\)"#).expect("static pattern");

    let mut literals: Vec<String> = Vec::new();
    for cap in url_re.captures_iter(css) {
        let lit = cap[1].trim().to_string();
        if !literals.contains(&lit) {
            literals.push(lit);
        }
    }

    let mut out = css.to_string();
    let mut tasks = Vec::new();
    for lit in literals {
        if lit.starts_with("data:") || lit.contains("${") || lit.contains("$(") {
            continue;
        }
        let Ok(absolute) = urls::resolve(source_url, &lit) else {
            continue;
        };
        if !matches!(absolute.scheme(), "http" | "https") {
            continue;
        }
        let local = paths::asset_local_path(&absolute, AssetClass::Image);
        let replacement = paths::relative_between(css_output_path, &local);
        tasks.push(AssetTask {
            url: absolute.to_string(),
            local_path: local,
            class: AssetClass::Image,
        });

        // Cover all three quoting forms of the same literal.
        out = out.replace(&format!("url({lit})"), &format!("url({replacement})"));
        out = out.replace(&format!("url('{lit}')"), &format!("url('{replacement}')"));
        out = out.replace(&format!("url(\"{lit}\")"), &format!("url(\"{replacement}\")"));
    }

    CssRewrite { css: out, tasks }
}
