//! Catalog output assembler.
//!
//! Lays the summarized tree out as a self-contained STAC catalog with
//! relative links, then writes it to disk.

use std::collections::{HashSet, VecDeque};
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use osccat_shared::{CatalogError, DocumentHeader, Link, OscType, RelType, Result};

use crate::builder::CatalogTree;
use crate::summary::Metrics;

/// Root document file name.
pub const CATALOG_FILE: &str = "catalog.json";

/// Metrics document file name.
pub const METRICS_FILE: &str = "metrics.json";

/// A serialized document and its path relative to the output directory.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub path: String,
    pub body: String,
}

/// Metadata for a file written to the output directory.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WrittenDocument {
    pub path: String,
    pub sha256: String,
    pub size_bytes: usize,
}

/// Counts of documents reachable from `catalog.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputStats {
    pub catalogs: usize,
    pub collections: usize,
    pub items: usize,
}

/// Output path of a collection: `themes/<slug>.json`, `variables/<slug>.json`.
pub fn collection_path(kind: OscType, slug: &str) -> String {
    format!("{}/{slug}.json", kind.dir_name())
}

/// Output path of an item: `products/<id>.json`, `projects/<id>.json`.
pub fn item_path(kind: OscType, id: &str) -> String {
    format!("{}/{id}.json", kind.dir_name())
}

/// Relative href from one output path to another.
///
/// Documents live at most one directory deep, so the result is either
/// `./<to>` or `../<to>`.
pub fn relative_href(from: &str, to: &str) -> String {
    let from_dir = from.rsplit_once('/').map(|(dir, _)| dir);
    let to_split = to.rsplit_once('/');

    match (from_dir, to_split) {
        (None, _) => format!("./{to}"),
        (Some(dir), Some((to_dir, name))) if dir == to_dir => format!("./{name}"),
        (Some(_), _) => format!("../{to}"),
    }
}

/// Render every reachable document of the tree plus `metrics.json`.
///
/// Variables whose theme did not resolve are unreachable and not rendered,
/// nor are their products. Projects with no resolved theme are skipped too.
#[instrument(skip_all)]
pub fn render(tree: &CatalogTree, metrics: &Metrics) -> Result<Vec<RenderedDocument>> {
    let mut docs = Vec::new();

    let theme_paths: Vec<String> = tree
        .themes
        .iter()
        .map(|t| collection_path(OscType::Theme, &t.slug))
        .collect();
    let variable_paths: Vec<String> = tree
        .variables
        .iter()
        .map(|v| collection_path(OscType::Variable, &v.slug))
        .collect();
    let project_paths: Vec<String> = tree
        .projects
        .iter()
        .map(|p| item_path(OscType::Project, &p.item.id))
        .collect();

    // Root catalog.
    let mut catalog = tree.catalog.clone();
    catalog.links = vec![Link::json(RelType::Root, relative_href(CATALOG_FILE, CATALOG_FILE))];
    for (theme, path) in tree.themes.iter().zip(&theme_paths) {
        catalog.links.push(
            Link::json(RelType::Child, relative_href(CATALOG_FILE, path))
                .with_title(&theme.collection.id),
        );
    }
    catalog.links.push(Link::json(
        RelType::Alternate,
        relative_href(CATALOG_FILE, METRICS_FILE),
    ));
    docs.push(document(CATALOG_FILE, &catalog)?);

    // Themes.
    for (theme, path) in tree.themes.iter().zip(&theme_paths) {
        let mut coll = theme.collection.clone();
        coll.links = hierarchy_links(path, CATALOG_FILE);
        coll.links.extend(theme.collection.links.iter().cloned());
        for &v in &theme.variables {
            coll.links.push(
                Link::json(RelType::Child, relative_href(path, &variable_paths[v]))
                    .with_title(&tree.variables[v].collection.id),
            );
        }
        for &p in &theme.projects {
            coll.links
                .push(Link::json(RelType::Item, relative_href(path, &project_paths[p])));
        }
        docs.push(document(path, &coll)?);
    }

    // Variables and their products.
    for (variable, path) in tree.variables.iter().zip(&variable_paths) {
        let Some(t) = variable.theme else {
            debug!(variable = %variable.collection.id, "skipping unreachable variable");
            continue;
        };

        let mut coll = variable.collection.clone();
        coll.links = hierarchy_links(path, &theme_paths[t]);
        coll.links.extend(variable.collection.links.iter().cloned());

        for product in &variable.products {
            let product_path = item_path(OscType::Product, &product.id);
            coll.links
                .push(Link::json(RelType::Item, relative_href(path, &product_path)));

            let mut item = product.clone();
            item.links = hierarchy_links(&product_path, path);
            item.links
                .push(Link::json(RelType::Collection, relative_href(&product_path, path)));
            item.links.extend(product.links.iter().cloned());
            docs.push(document(&product_path, &item)?);
        }

        docs.push(document(path, &coll)?);
    }

    // Projects, linked to every owning theme.
    for (project, path) in tree.projects.iter().zip(&project_paths) {
        let Some(&last) = project.themes.last() else {
            debug!(project = %project.item.id, "skipping project without a theme");
            continue;
        };

        let mut item = project.item.clone();
        item.links = hierarchy_links(path, &theme_paths[last]);
        for &t in &project.themes {
            item.links
                .push(Link::json(RelType::Collection, relative_href(path, &theme_paths[t])));
        }
        item.links.extend(project.item.links.iter().cloned());
        docs.push(document(path, &item)?);
    }

    docs.push(document(METRICS_FILE, metrics)?);

    debug!(documents = docs.len(), "catalog rendered");
    Ok(docs)
}

/// Prepare the output directory for a fresh write.
///
/// A non-empty directory is refused unless `overwrite` is set, in which case
/// previously generated entries are removed and anything else is kept.
pub fn prepare_output_dir(out_dir: &Path, overwrite: bool) -> Result<()> {
    if dir_is_non_empty(out_dir)? {
        if !overwrite {
            return Err(CatalogError::validation(format!(
                "output directory {} is not empty (use --overwrite)",
                out_dir.display()
            )));
        }
        clear_generated(out_dir)?;
    }

    std::fs::create_dir_all(out_dir).map_err(|e| CatalogError::io(out_dir, e))?;
    Ok(())
}

/// Write rendered documents under `out_dir`, each atomically.
#[instrument(skip_all, fields(out_dir = %out_dir.display(), documents = docs.len()))]
pub fn write_documents(out_dir: &Path, docs: &[RenderedDocument]) -> Result<Vec<WrittenDocument>> {
    let mut written = Vec::with_capacity(docs.len());

    for doc in docs {
        let target = out_dir.join(&doc.path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
        }

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let temp = target.with_file_name(format!(".{file_name}.tmp"));

        std::fs::write(&temp, &doc.body).map_err(|e| CatalogError::io(&temp, e))?;
        std::fs::rename(&temp, &target).map_err(|e| CatalogError::io(&target, e))?;

        let mut hasher = Sha256::new();
        hasher.update(doc.body.as_bytes());

        written.push(WrittenDocument {
            path: doc.path.clone(),
            sha256: format!("{:x}", hasher.finalize()),
            size_bytes: doc.body.len(),
        });
    }

    info!(count = written.len(), "catalog documents written");
    Ok(written)
}

/// Verify that a generated directory is a well-formed catalog.
///
/// Walks every `child` and `item` link from `catalog.json` and checks that
/// each target exists and parses.
#[instrument(skip_all, fields(out_dir = %out_dir.display()))]
pub fn validate_output(out_dir: &Path) -> Result<OutputStats> {
    let root = out_dir.join(CATALOG_FILE);
    let meta = std::fs::metadata(&root)
        .map_err(|_| CatalogError::validation(format!("missing {}", root.display())))?;
    if meta.len() == 0 {
        return Err(CatalogError::validation(format!("{} is empty", root.display())));
    }

    let mut stats = OutputStats::default();
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut queue: VecDeque<PathBuf> = VecDeque::from([normalize(&root)]);

    while let Some(path) = queue.pop_front() {
        if !seen.insert(path.clone()) {
            continue;
        }

        let content =
            std::fs::read_to_string(&path).map_err(|e| CatalogError::io(&path, e))?;
        let header: DocumentHeader = serde_json::from_str(&content).map_err(|e| {
            CatalogError::validation(format!("invalid document {}: {e}", path.display()))
        })?;

        match header.kind.as_str() {
            "Catalog" => stats.catalogs += 1,
            "Collection" => stats.collections += 1,
            "Feature" => stats.items += 1,
            other => {
                return Err(CatalogError::validation(format!(
                    "{} has unknown type '{other}'",
                    path.display()
                )));
            }
        }

        let base = path.parent().unwrap_or(out_dir);
        for link in &header.links {
            if !matches!(link.rel, RelType::Child | RelType::Item) || link.href.contains("://") {
                continue;
            }
            let target = normalize(&base.join(&link.href));
            if !target.is_file() {
                return Err(CatalogError::validation(format!(
                    "{} ({}) links to missing {}",
                    header.id,
                    path.display(),
                    link.href
                )));
            }
            queue.push_back(target);
        }
    }

    debug!(?stats, "output validated");
    Ok(stats)
}

/// `true` if `dir` exists and has at least one entry.
pub fn dir_is_non_empty(dir: &Path) -> Result<bool> {
    if !dir.exists() {
        return Ok(false);
    }
    let mut entries = std::fs::read_dir(dir).map_err(|e| CatalogError::io(dir, e))?;
    Ok(entries.next().is_some())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `root` and `parent` links for a document at `path`.
fn hierarchy_links(path: &str, parent: &str) -> Vec<Link> {
    vec![
        Link::json(RelType::Root, relative_href(path, CATALOG_FILE)),
        Link::json(RelType::Parent, relative_href(path, parent)),
    ]
}

fn document<T: serde::Serialize>(path: &str, data: &T) -> Result<RenderedDocument> {
    Ok(RenderedDocument {
        path: path.to_string(),
        body: serde_json::to_string_pretty(data)?,
    })
}

fn clear_generated(out_dir: &Path) -> Result<()> {
    for file in [CATALOG_FILE, METRICS_FILE] {
        let path = out_dir.join(file);
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| CatalogError::io(&path, e))?;
        }
    }
    for kind in [OscType::Theme, OscType::Variable, OscType::Product, OscType::Project] {
        let path = out_dir.join(kind.dir_name());
        if path.exists() {
            std::fs::remove_dir_all(&path).map_err(|e| CatalogError::io(&path, e))?;
        }
    }
    debug!(path = %out_dir.display(), "cleared previously generated documents");
    Ok(())
}

/// Lexically resolve `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
