//! Site building orchestration.
//!
//! One build is strictly sequential and starts from nothing:
//!
//! ```text
//! build_site()
//!     │
//!     ├── check content/ and layouts/ exist
//!     ├── prepare .<output>.staging/
//!     ├── copy static/                       (skipped if absent)
//!     ├── LayoutSet::load()                  base+partials → pages → home
//!     ├── parse content/**.md → Collection
//!     ├── render items, home, posts listing  into staging
//!     │
//!     └── OutputGate::publish()              staging becomes the output
//! ```
//!
//! Any failure discards the staging tree and leaves the published output as
//! it was.

use crate::{
    compiler::{
        Collection, ContentItem, LayoutSet, Renderer, collect_content_files, copy_static,
        parse_document,
    },
    config::{SiteConfig, SitePaths},
    log,
    output::OutputGate,
};
use anyhow::{Context, Result, bail};
use std::{collections::BTreeMap, fs, path::Path};

/// Everything one build reads from: config, compiled layouts and content.
pub struct BuildContext<'a> {
    pub config: &'a SiteConfig,
    pub layouts: LayoutSet,
    pub collection: Collection,
}

/// Counts from a successful build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub items: usize,
    pub posts: usize,
    pub projects: usize,
    pub by_type: BTreeMap<String, usize>,
    pub assets: usize,
    pub layouts: usize,
    pub listing: bool,
}

/// Build the whole site and publish it to the output directory.
pub fn build_site(config: &SiteConfig, gate: &OutputGate) -> Result<BuildReport> {
    let report = match build_into_staging(config, gate) {
        Ok(report) => report,
        Err(err) => {
            gate.discard_staging();
            return Err(err);
        }
    };

    gate.publish()?;
    log_summary(&report, gate.output());
    Ok(report)
}

fn build_into_staging(config: &SiteConfig, gate: &OutputGate) -> Result<BuildReport> {
    let paths = config.paths();
    check_source_dirs(&paths)?;

    let staging = gate.prepare_staging()?;

    let assets = copy_static(&paths.static_dir(), staging)?;
    if assets > 0 {
        log!("assets"; "copied {assets} files");
    }

    let layouts = LayoutSet::load(&paths.layouts())?;
    let collection = Collection::new(load_items(&paths.content())?);

    let ctx = BuildContext {
        config,
        layouts,
        collection,
    };
    let listing = render_site(&ctx, staging)?;

    Ok(BuildReport {
        items: ctx.collection.items.len(),
        posts: ctx.collection.posts.len(),
        projects: ctx.collection.projects.len(),
        by_type: ctx
            .collection
            .by_type
            .iter()
            .map(|(kind, items)| (kind.clone(), items.len()))
            .collect(),
        assets,
        layouts: ctx.layouts.template_count(),
        listing,
    })
}

fn check_source_dirs(paths: &SitePaths<'_>) -> Result<()> {
    for (label, dir) in [("content", paths.content()), ("layouts", paths.layouts())] {
        if !dir.is_dir() {
            bail!("{label} directory `{}` not found", dir.display());
        }
    }
    Ok(())
}

/// Parse every markdown file under `content_dir`, in walk order.
fn load_items(content_dir: &Path) -> Result<Vec<ContentItem>> {
    collect_content_files(content_dir)?
        .into_iter()
        .map(|path| {
            let bytes =
                fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
            let doc = parse_document(&path, &bytes)?;
            let rel = path.strip_prefix(content_dir).with_context(|| {
                format!("{} is not in {}", path.display(), content_dir.display())
            })?;
            Ok(ContentItem::build(rel, &path, doc.frontmatter, doc.html))
        })
        .collect()
}

/// Render every page into `staging`. Returns whether a posts listing was written.
fn render_site(ctx: &BuildContext<'_>, staging: &Path) -> Result<bool> {
    let mut renderer = Renderer::new(&ctx.layouts, &ctx.collection, ctx.config, staging)?;

    for item in &ctx.collection.items {
        renderer.render_item(item)?;
    }
    renderer.render_home()?;
    let listing = renderer.render_posts_listing()?.is_some();

    Ok(listing)
}

fn log_summary(report: &BuildReport, output: &Path) {
    log!(
        "build";
        "{} items ({} posts, {} projects), {} layouts, {} assets{} → {}",
        report.items,
        report.posts,
        report.projects,
        report.layouts,
        report.assets,
        if report.listing { ", posts listing" } else { "" },
        output.display()
    );

    if !report.by_type.is_empty() {
        let per_type = report
            .by_type
            .iter()
            .map(|(kind, count)| format!("{kind}: {count}"))
            .collect::<Vec<_>>()
            .join(", ");
        log!("build"; "{per_type}");
    }
}

// ============================================================================
// Tests
// ============================================================================
