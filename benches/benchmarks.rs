use criterion::{black_box, criterion_group, criterion_main, Criterion};
use url::Url;

use snapsite::exporter::SiteContext;
use snapsite::paths::{self, AssetClass};
use snapsite::rewriter;
use snapsite::stylesheet;
use snapsite::urls;

const PAGE: &str = r#"<html><head>
<link rel="stylesheet" href="/css/site.css">
<link rel="stylesheet" href="/css/theme.css">
<link rel="shortcut icon" href="/media/favicon.ico">
<script src="/js/app.js"></script>
<script src="/js/utils.js"></script>
</head><body>
<a href="/about">About</a>
<a href="/contact">Contact</a>
<a href="/blog/post-a">Blog</a>
<a href="https://other.example/page">External</a>
<img src="/media/logo.png" srcset="/media/logo.png 1x, /media/logo@2x.png 2x">
<img src="https://cdn.example.com/banner.jpg">
<div style="background-image: url('/media/bg.jpg')">banner</div>
</body></html>"#;

fn bench_document_rewrite(c: &mut Criterion) {
    let ctx = SiteContext::new("https://example.com", 5, 0.0, true, true, false).unwrap();
    let base = Url::parse("https://example.com/").unwrap();

    c.bench_function("rewrite_document", |b| {
        b.iter(|| {
            let _result = rewriter::rewrite_document(black_box(PAGE), &base, "index.html", &ctx);
        });
    });
}

fn bench_stylesheet_rewrite(c: &mut Criterion) {
    let ctx = SiteContext::new("https://example.com", 5, 0.0, true, true, false).unwrap();
    let source = Url::parse("https://example.com/css/site.css").unwrap();
    let css = r#"
        .a { background-image: url('/media/bg1.jpg'); }
        .b { background: url(/media/bg2.jpg); }
        .c { background: url("/media/bg3.jpg"); }
        .d { background: url(data:image/png;base64,AAAA); }
        .e { src: url(/fonts/brand.woff2); }
    "#;

    c.bench_function("rewrite_css", |b| {
        b.iter(|| {
            let _result = stylesheet::rewrite_css(black_box(css), &source, "css/site.css", &ctx);
        });
    });
}

fn bench_url_canonicalization(c: &mut Criterion) {
    let candidates: Vec<Url> = [
        "https://example.com/",
        "https://example.com/about",
        "https://example.com/about/",
        "https://example.com/about.html",
        "https://example.com/blog/2024/post?utm=1#top",
    ]
    .iter()
    .map(|s| Url::parse(s).unwrap())
    .collect();

    c.bench_function("visited_keys", |b| {
        b.iter(|| {
            for url in &candidates {
                let _key = urls::visited_key(black_box(url));
            }
        });
    });
}

fn bench_asset_paths(c: &mut Criterion) {
    let candidates: Vec<Url> = [
        "https://cdn.example.com/media/hero%20shot.png",
        "https://example.com/css/site.css?v=3",
        "https://example.com/bundles/app.min.js",
        "https://cdn.example.com/a/very/deep/path/to/an/image.webp",
    ]
    .iter()
    .map(|s| Url::parse(s).unwrap())
    .collect();

    c.bench_function("asset_local_paths", |b| {
        b.iter(|| {
            for url in &candidates {
                let _path = paths::asset_local_path(black_box(url), AssetClass::Image);
            }
        });
    });
}

criterion_group!(
    benches,
    bench_document_rewrite,
    bench_stylesheet_rewrite,
    bench_url_canonicalization,
    bench_asset_paths,
);
criterion_main!(benches);
