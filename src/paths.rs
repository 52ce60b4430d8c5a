use std::path::Path;

use url::Url;

use crate::urls;

/// Longest file name the mapper will emit; longer decoded basenames are cut.
const MAX_BASENAME_LEN: usize = 96;

/// Broad class of a downloadable asset, which decides the directory it is
/// stored under. Resources referenced from stylesheets (fonts, background
/// images) land in the image directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetClass {
    Image,
    Stylesheet,
    Script,
}

impl AssetClass {
    pub fn dir(self) -> &'static str {
        match self {
            AssetClass::Image => "images",
            AssetClass::Stylesheet => "css",
            AssetClass::Script => "js",
        }
    }
}

/// Local file a page is written to, relative to the output root. The root
/// page maps to `index.html`; every other page keeps its URL path with a
/// single `.html` suffix.
pub fn page_output_path(url: &Url) -> String {
    let canonical = urls::canonical_page_path(url);
    if canonical.is_empty() {
        "index.html".to_string()
    } else {
        format!("{}.html", canonical.trim_start_matches('/'))
    }
}

/// Local file an asset is written to: `<class dir>/<basename>`, with the
/// basename percent-decoded and sanitized first.
///
/// Two distinct remote paths whose decoded basenames coincide collide into
/// the same local file; the later download overwrites the earlier one. This
/// is a known limitation of the flat per-class layout, not something the
/// mapper tries to disambiguate.
pub fn asset_local_path(url: &Url, class: AssetClass) -> String {
    let basename = url.path().rsplit('/').next().unwrap_or("");
    let decoded = urlencoding::decode(basename)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| basename.to_string());
    let name = sanitize_file_name(&decoded);
    format!("{}/{}", class.dir(), name)
}

/// Relative prefix that climbs from an output file back up to the output
/// root: empty at the root, one `../` per directory of depth.
pub fn root_relative_prefix(output_path: &str) -> String {
    "../".repeat(output_path.matches('/').count())
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() => c,
            '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect();
    let capped: String = cleaned.chars().take(MAX_BASENAME_LEN).collect();
    if capped.is_empty() {
        "asset".to_string()
    } else {
        capped
    }
}

/// Relative reference from one output file to another, e.g. from
/// `css/site.css` to `images/bg.png` -> `../images/bg.png`. Falls back to a
/// root-relative walk when the paths share no prefix.
pub fn relative_between(from_output_path: &str, to_output_path: &str) -> String {
    let from_dir = Path::new(from_output_path).parent().unwrap_or(Path::new(""));
    match pathdiff::diff_paths(Path::new(to_output_path), from_dir) {
        Some(p) => p.to_string_lossy().into_owned(),
        None => format!("{}{}", root_relative_prefix(from_output_path), to_output_path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn root_maps_to_index() {
        assert_eq!(page_output_path(&url("https://x.io/")), "index.html");
        assert_eq!(page_output_path(&url("https://x.io")), "index.html");
        assert_eq!(page_output_path(&url("https://x.io/index.html")), "index.html");
    }

    #[test]
    fn pages_gain_a_single_html_suffix() {
        assert_eq!(page_output_path(&url("https://x.io/about")), "about.html");
        assert_eq!(page_output_path(&url("https://x.io/about/")), "about.html");
        assert_eq!(page_output_path(&url("https://x.io/about.html")), "about.html");
        assert_eq!(
            page_output_path(&url("https://x.io/blog/post-a")),
            "blog/post-a.html"
        );
    }

    #[test]
    fn prefix_matches_output_depth() {
        assert_eq!(root_relative_prefix("index.html"), "");
        assert_eq!(root_relative_prefix("blog/post.html"), "../");
        assert_eq!(root_relative_prefix("blog/2024/post.html"), "../../");
    }

    #[test]
    fn asset_paths_decode_and_sanitize() {
        assert_eq!(
            asset_local_path(&url("https://cdn.x.io/media/hero%20shot.png"), AssetClass::Image),
            "images/hero_shot.png"
        );
        assert_eq!(
            asset_local_path(&url("https://x.io/static/site.css?v=3"), AssetClass::Stylesheet),
            "css/site.css"
        );
        assert_eq!(
            asset_local_path(&url("https://x.io/bundles/app.js"), AssetClass::Script),
            "js/app.js"
        );
    }

    #[test]
    fn empty_basename_gets_a_placeholder() {
        assert_eq!(
            asset_local_path(&url("https://x.io/media/"), AssetClass::Image),
            "images/asset"
        );
    }

    #[test]
    fn long_basenames_are_capped() {
        let long = format!("https://x.io/{}.png", "a".repeat(200));
        let path = asset_local_path(&url(&long), AssetClass::Image);
        let name = path.strip_prefix("images/").unwrap();
        assert_eq!(name.len(), MAX_BASENAME_LEN);
    }

    #[test]
    fn colliding_basenames_map_to_one_file() {
        let a = asset_local_path(&url("https://x.io/2023/logo.png"), AssetClass::Image);
        let b = asset_local_path(&url("https://x.io/2024/logo.png"), AssetClass::Image);
        assert_eq!(a, b);
    }

    #[test]
    fn relative_between_output_files() {
        assert_eq!(relative_between("css/site.css", "images/bg.png"), "../images/bg.png");
        assert_eq!(relative_between("index.html", "images/bg.png"), "images/bg.png");
    }
}
