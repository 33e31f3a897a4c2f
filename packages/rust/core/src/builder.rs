//! Catalog tree construction.
//!
//! Converts input rows into STAC collections and items, then wires them
//! together: variables under themes, products under variables, and projects
//! under every theme they list. References are matched by slug.

use std::collections::HashMap;

use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use osccat_shared::{
    Catalog, CatalogConfig, CatalogError, Collection, ExtraFields, Item, Link, OscType, RelType,
    Result, SCIENTIFIC_EXTENSION,
};
use osccat_sources::{
    ProductRow, ProjectRow, SourceTables, ThemeRow, VariableRow, iso_local, parse_geometry,
    parse_product_date, parse_project_date, stac_datetime,
};

use crate::slug::slugify;

/// Options for [`build_tree`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub catalog_id: String,
    pub description: String,
    pub title: Option<String>,
    /// Fail on the first unresolved reference instead of skipping it.
    pub strict: bool,
}

impl From<&CatalogConfig> for BuildOptions {
    fn from(config: &CatalogConfig) -> Self {
        Self {
            catalog_id: config.id.clone(),
            description: config.description.clone(),
            title: config.title.clone(),
            strict: config.strict,
        }
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::from(&CatalogConfig::default())
    }
}

/// A theme collection and the indices of its members.
#[derive(Debug, Clone)]
pub struct ThemeNode {
    pub slug: String,
    pub collection: Collection,
    /// Indices into [`CatalogTree::variables`].
    pub variables: Vec<usize>,
    /// Indices into [`CatalogTree::projects`].
    pub projects: Vec<usize>,
}

/// A variable collection and the products it holds.
#[derive(Debug, Clone)]
pub struct VariableNode {
    pub slug: String,
    pub collection: Collection,
    /// Owning theme; `None` if the theme reference did not resolve.
    pub theme: Option<usize>,
    pub products: Vec<Item>,
}

/// A project item and the themes it belongs to.
#[derive(Debug, Clone)]
pub struct ProjectNode {
    pub item: Item,
    /// Indices into [`CatalogTree::themes`], in the project's column order.
    pub themes: Vec<usize>,
}

/// Counts of references that did not resolve (non-strict mode).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unresolved {
    pub variables: usize,
    pub products: usize,
    pub project_themes: usize,
}

/// The assembled, not yet summarized, catalog.
#[derive(Debug, Clone)]
pub struct CatalogTree {
    pub catalog: Catalog,
    pub themes: Vec<ThemeNode>,
    pub variables: Vec<VariableNode>,
    pub projects: Vec<ProjectNode>,
    pub unresolved: Unresolved,
}

impl CatalogTree {
    /// Number of products placed under some variable.
    pub fn product_count(&self) -> usize {
        self.variables.iter().map(|v| v.products.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Row conversion
// ---------------------------------------------------------------------------

/// Build a theme collection from a `Themes.csv` row.
pub fn theme_to_collection(row: &ThemeRow) -> Collection {
    let mut collection = Collection::new(row.theme.trim(), &row.description);
    set_osc_type(&mut collection.extra_fields, OscType::Theme);
    push_via(&mut collection.links, &row.link);
    collection
}

/// Build a variable collection from a `Variables.csv` row.
pub fn variable_to_collection(row: &VariableRow) -> Collection {
    let mut collection = Collection::new(row.variable.trim(), &row.description);
    collection
        .extra_fields
        .insert("osc:theme".into(), Value::String(row.theme.clone()));
    set_osc_type(&mut collection.extra_fields, OscType::Variable);
    push_via(&mut collection.links, &row.link);
    collection
}

/// Build a product item. Fails on an empty or path-unsafe ID or a bad date.
pub fn product_to_item(row: &ProductRow) -> Result<Item> {
    let id = item_id("product", &row.id, &row.name)?;
    let start = parse_product_date(&row.start)?;
    let end = parse_product_date(&row.end)?;

    let mut properties = ExtraFields::new();
    properties.insert("datetime".into(), opt_string(start.as_ref().map(stac_datetime)));
    properties.insert("start_datetime".into(), opt_string(start.as_ref().map(iso_local)));
    properties.insert("end_datetime".into(), opt_string(end.as_ref().map(iso_local)));
    properties.insert("title".into(), json!(row.name));
    properties.insert("description".into(), json!(row.description));
    properties.insert("mission".into(), json!(row.missions));
    properties.insert("osc:project".into(), json!(row.project));
    properties.insert("osc:themes".into(), json!(row.themes()));
    properties.insert("osc:variable".into(), json!(row.variable));
    properties.insert("osc:status".into(), json!(row.status));
    properties.insert("osc:region".into(), json!(row.region));
    set_osc_type(&mut properties, OscType::Product);

    let doi = row.doi.trim();
    if !doi.is_empty() {
        properties.insert("sci:doi".into(), json!(doi));
    }

    let mut item = Item::new(id, parse_geometry(&row.polygon), properties);
    if !doi.is_empty() {
        item.stac_extensions.push(SCIENTIFIC_EXTENSION.into());
    }
    for href in [&row.website, &row.access, &row.documentation] {
        push_via(&mut item.links, href);
    }

    Ok(item)
}

/// Build a project item. Start and end dates are required.
pub fn project_to_item(row: &ProjectRow) -> Result<Item> {
    let id = item_id("project", &row.id, &row.name)?;
    let start = parse_project_date(&row.start)
        .map_err(|e| CatalogError::parse(format!("{id} start date: {e}")))?;
    let end = parse_project_date(&row.end)
        .map_err(|e| CatalogError::parse(format!("{id} end date: {e}")))?;

    let mut properties = ExtraFields::new();
    properties.insert("datetime".into(), json!(stac_datetime(&start)));
    properties.insert("start_datetime".into(), json!(iso_local(&start)));
    properties.insert("end_datetime".into(), json!(iso_local(&end)));
    properties.insert("title".into(), json!(row.name));
    properties.insert("description".into(), json!(row.description));
    properties.insert("osc:themes".into(), json!(row.themes()));
    properties.insert("osc:status".into(), json!(row.status));
    properties.insert("osc:consortium".into(), json!(row.consortium));
    properties.insert(
        "osc:technical_officer".into(),
        json!({
            "name": row.technical_officer,
            "email": row.technical_officer_email,
        }),
    );
    set_osc_type(&mut properties, OscType::Project);

    let mut item = Item::new(id, None, properties);
    for href in [&row.website, &row.eo4society_link] {
        push_via(&mut item.links, href);
    }

    Ok(item)
}

// ---------------------------------------------------------------------------
// Tree assembly
// ---------------------------------------------------------------------------

/// Convert all rows and place every element under its parent.
#[instrument(skip_all, fields(catalog_id = %options.catalog_id, strict = options.strict))]
pub fn build_tree(tables: &SourceTables, options: &BuildOptions) -> Result<CatalogTree> {
    let mut unresolved = Unresolved::default();

    let mut themes: Vec<ThemeNode> =
        unique_by_slug(&tables.themes, |row| row.theme.as_str(), OscType::Theme)?
            .into_iter()
            .map(|(slug, row)| ThemeNode {
                slug,
                collection: theme_to_collection(row),
                variables: Vec::new(),
                projects: Vec::new(),
            })
            .collect();
    let theme_index = index_by_slug(themes.iter().map(|t| t.slug.as_str()));

    // Variables under themes.
    let variable_rows =
        unique_by_slug(&tables.variables, |row| row.variable.as_str(), OscType::Variable)?;
    let mut variables: Vec<VariableNode> = Vec::with_capacity(variable_rows.len());
    for (slug, row) in variable_rows {
        let collection = variable_to_collection(row);
        let theme = theme_index.get(&slugify(&row.theme)).copied();

        match theme {
            Some(t) => themes[t].variables.push(variables.len()),
            None => note_unresolved(
                options.strict,
                &mut unresolved.variables,
                format!(
                    "variable '{}' references unknown theme '{}'",
                    collection.id, row.theme
                ),
            )?,
        }

        variables.push(VariableNode {
            slug,
            collection,
            theme,
            products: Vec::new(),
        });
    }
    let variable_index = index_by_slug(variables.iter().map(|v| v.slug.as_str()));

    // Products under variables.
    for (i, row) in tables.products.iter().enumerate() {
        let mut item = product_to_item(row)
            .map_err(|e| CatalogError::validation(format!("product row {}: {e}", i + 1)))?;

        match variable_index.get(&slugify(&row.variable)).copied() {
            Some(v) => {
                item.collection = Some(variables[v].collection.id.clone());
                variables[v].products.push(item);
            }
            None => note_unresolved(
                options.strict,
                &mut unresolved.products,
                format!("{} references unknown variable '{}'", item.id, row.variable),
            )?,
        }
    }

    // Projects under each of their themes.
    let mut projects: Vec<ProjectNode> = Vec::with_capacity(tables.projects.len());
    for (i, row) in tables.projects.iter().enumerate() {
        let mut item = project_to_item(row)
            .map_err(|e| CatalogError::validation(format!("project row {}: {e}", i + 1)))?;

        let mut owners: Vec<usize> = Vec::new();
        for name in row.themes() {
            match theme_index.get(&slugify(&name)).copied() {
                Some(t) if owners.contains(&t) => {}
                Some(t) => owners.push(t),
                None => note_unresolved(
                    options.strict,
                    &mut unresolved.project_themes,
                    format!("{} references unknown theme '{name}'", item.id),
                )?,
            }
        }

        item.collection = owners.last().map(|&t| themes[t].collection.id.clone());
        for &t in &owners {
            themes[t].projects.push(projects.len());
        }
        projects.push(ProjectNode {
            item,
            themes: owners,
        });
    }

    let mut catalog = Catalog::new(&options.catalog_id, &options.description);
    catalog.title = options.title.clone();

    let tree = CatalogTree {
        catalog,
        themes,
        variables,
        projects,
        unresolved,
    };

    info!(
        themes = tree.themes.len(),
        variables = tree.variables.len(),
        products = tree.product_count(),
        projects = tree.projects.len(),
        unresolved = ?tree.unresolved,
        "catalog tree built"
    );

    Ok(tree)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn set_osc_type(fields: &mut ExtraFields, kind: OscType) {
    fields.insert("osc:type".into(), json!(kind.as_str()));
}

fn push_via(links: &mut Vec<Link>, href: &str) {
    let href = href.trim();
    if !href.is_empty() {
        links.push(Link::new(RelType::Via, href));
    }
}

fn opt_string(value: Option<String>) -> Value {
    value.map(Value::String).unwrap_or(Value::Null)
}

/// `<prefix>-<raw>`; the raw ID becomes a file name, so it must be non-empty
/// and contain no path separators.
fn item_id(prefix: &str, raw: &str, name: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CatalogError::validation(format!(
            "{prefix} '{name}' has an empty ID"
        )));
    }
    if raw.contains(['/', '\\']) || raw.contains("..") {
        return Err(CatalogError::validation(format!(
            "{prefix} ID '{raw}' is not usable as a file name"
        )));
    }
    Ok(format!("{prefix}-{raw}"))
}

/// Rows keyed by the slug of their name, one per slug.
///
/// A later row with an already seen slug replaces the earlier one in place.
/// A name with an empty slug is an error naming the 1-based row.
fn unique_by_slug<'a, T>(
    rows: &'a [T],
    name: impl Fn(&T) -> &str,
    kind: OscType,
) -> Result<Vec<(String, &'a T)>> {
    let mut unique: Vec<(String, &'a T)> = Vec::with_capacity(rows.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (i, row) in rows.iter().enumerate() {
        let raw = name(row);
        let slug = slugify(raw);
        if slug.is_empty() {
            return Err(CatalogError::validation(format!(
                "{kind} row {}: name '{raw}' has no usable slug",
                i + 1
            )));
        }

        match positions.get(&slug) {
            Some(&at) => {
                warn!(%kind, %slug, row = i + 1, "duplicate slug, later entry wins");
                unique[at].1 = row;
            }
            None => {
                positions.insert(slug.clone(), unique.len());
                unique.push((slug, row));
            }
        }
    }
    Ok(unique)
}

/// Map slug to position.
fn index_by_slug<'a>(slugs: impl Iterator<Item = &'a str>) -> HashMap<String, usize> {
    let index: HashMap<String, usize> =
        slugs.enumerate().map(|(i, slug)| (slug.to_string(), i)).collect();
    debug!(entries = index.len(), "slug index built");
    index
}

fn note_unresolved(strict: bool, counter: &mut usize, message: String) -> Result<()> {
    if strict {
        return Err(CatalogError::reference(message));
    }
    warn!("{message}");
    *counter += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn theme(name: &str) -> ThemeRow {
        ThemeRow {
            theme: name.into(),
            description: format!("{name} theme"),
            link: format!("https://example.org/{}", slugify(name)),
        }
    }

    fn variable(name: &str, theme: &str) -> VariableRow {
        VariableRow {
            variable: name.into(),
            description: format!("{name} variable"),
            link: String::new(),
            theme: theme.into(),
        }
    }

    fn product(id: &str, variable: &str, start: &str) -> ProductRow {
        ProductRow {
            id: id.into(),
            name: format!("Product {id}"),
            start: start.into(),
            variable: variable.into(),
            website: "https://example.org/p".into(),
            ..Default::default()
        }
    }

    fn project(id: &str, themes: &[&str]) -> ProjectRow {
        let mut row = ProjectRow {
            id: id.into(),
            name: format!("Project {id}"),
            start: "2019-01-01".into(),
            end: "2020-12-31".into(),
            ..Default::default()
        };
        let slots = [
            &mut row.theme1,
            &mut row.theme2,
            &mut row.theme3,
            &mut row.theme4,
            &mut row.theme5,
            &mut row.theme6,
        ];
        for (slot, name) in slots.into_iter().zip(themes) {
            *slot = (*name).to_string();
        }
        row
    }

    fn tables() -> SourceTables {
        SourceTables {
            themes: vec![theme("Land"), theme("Oceans")],
            variables: vec![
                variable("Soil Moisture", "land"),
                variable("Sea Surface Temperature", "Oceans"),
            ],
            products: vec![
                product("1", "soil moisture", "2017.0"),
                product("2", "Sea Surface Temperature", ""),
            ],
            projects: vec![project("7", &["Land", "Oceans"])],
        }
    }

    #[test]
    fn theme_collection_fields() {
        let coll = theme_to_collection(&theme(" Land "));
        assert_eq!(coll.id, "Land");
        assert_eq!(coll.extra_fields["osc:type"], "Theme");
        assert_eq!(coll.link_href(RelType::Via), Some("https://example.org/land"));
    }

    #[test]
    fn variable_keeps_raw_theme_name() {
        let coll = variable_to_collection(&variable("Soil Moisture", "Land"));
        assert_eq!(coll.extra_fields["osc:theme"], "Land");
        assert_eq!(coll.extra_fields["osc:type"], "Variable");
        // Empty link produces no via link.
        assert!(coll.links.is_empty());
    }

    #[test]
    fn product_item_properties() {
        let mut row = product("42", "Soil Moisture", "2018.2");
        row.end = "2019.11".into();
        row.doi = "10.1234/abc".into();
        row.polygon = "[1.0, 2.0]".into();
        row.theme1 = "Land".into();

        let item = product_to_item(&row).unwrap();
        assert_eq!(item.id, "product-42");
        assert_eq!(item.property_str("start_datetime"), Some("2018-03-01T00:00:00"));
        assert_eq!(item.property_str("end_datetime"), Some("2019-12-01T00:00:00"));
        assert_eq!(item.property_str("datetime"), Some("2018-03-01T00:00:00Z"));
        assert_eq!(item.property_str("osc:type"), Some("Product"));
        assert_eq!(item.property_str("sci:doi"), Some("10.1234/abc"));
        assert_eq!(item.properties["osc:themes"], json!(["Land"]));
        assert_eq!(item.stac_extensions, vec![SCIENTIFIC_EXTENSION.to_string()]);
        assert_eq!(item.bbox, Some([1.0, 2.0, 1.0, 2.0]));
        assert_eq!(item.links.len(), 1);
    }

    #[test]
    fn product_without_dates_has_null_datetime() {
        let item = product_to_item(&product("3", "x", "")).unwrap();
        assert!(item.properties["datetime"].is_null());
        assert!(item.properties["start_datetime"].is_null());
        assert!(item.stac_extensions.is_empty());
    }

    #[test]
    fn product_bad_id_rejected() {
        assert!(product_to_item(&product("", "x", "")).is_err());
        assert!(product_to_item(&product("../x", "x", "")).is_err());
    }

    #[test]
    fn project_item_properties() {
        let mut row = project("9", &["Land"]);
        row.technical_officer = "Jane Roe".into();
        row.technical_officer_email = "jane@example.org".into();

        let item = project_to_item(&row).unwrap();
        assert_eq!(item.id, "project-9");
        assert!(item.geometry.is_none());
        assert_eq!(item.property_str("osc:type"), Some("Project"));
        assert_eq!(item.properties["osc:technical_officer"]["name"], "Jane Roe");
        assert_eq!(item.property_str("start_datetime"), Some("2019-01-01T00:00:00"));
    }

    #[test]
    fn project_bad_date_is_error() {
        let mut row = project("9", &[]);
        row.start = "whenever".into();
        let err = project_to_item(&row).unwrap_err();
        assert!(err.to_string().contains("project-9 start date"));
    }

    #[test]
    fn tree_places_by_slug() {
        let tree = build_tree(&tables(), &BuildOptions::default()).unwrap();

        assert_eq!(tree.themes[0].variables, vec![0]);
        assert_eq!(tree.themes[1].variables, vec![1]);
        assert_eq!(tree.variables[0].products.len(), 1);
        assert_eq!(tree.variables[0].products[0].collection.as_deref(), Some("Soil Moisture"));
        assert_eq!(tree.variables[1].products.len(), 1);
        assert_eq!(tree.unresolved, Unresolved::default());
    }

    #[test]
    fn project_joins_every_listed_theme() {
        let tree = build_tree(&tables(), &BuildOptions::default()).unwrap();
        assert_eq!(tree.themes[0].projects, vec![0]);
        assert_eq!(tree.themes[1].projects, vec![0]);
        assert_eq!(tree.projects[0].themes, vec![0, 1]);
        // Last owner is recorded as the item's collection.
        assert_eq!(tree.projects[0].item.collection.as_deref(), Some("Oceans"));
    }

    #[test]
    fn duplicate_project_theme_counted_once() {
        let mut t = tables();
        t.projects = vec![project("8", &["Land", "land"])];
        let tree = build_tree(&t, &BuildOptions::default()).unwrap();
        assert_eq!(tree.themes[0].projects, vec![0]);
    }

    #[test]
    fn unresolved_references_skipped_when_lenient() {
        let mut t = tables();
        t.variables.push(variable("Ozone", "Atmosphere"));
        t.products.push(product("9", "Aerosols", ""));
        t.projects.push(project("10", &["Atmosphere", "Land"]));

        let tree = build_tree(&t, &BuildOptions::default()).unwrap();
        assert_eq!(
            tree.unresolved,
            Unresolved {
                variables: 1,
                products: 1,
                project_themes: 1,
            }
        );
        assert!(tree.variables[2].theme.is_none());
        assert_eq!(tree.product_count(), 2);
        assert_eq!(tree.themes[0].projects, vec![0, 1]);
    }

    #[test]
    fn unresolved_reference_fails_when_strict() {
        let mut t = tables();
        t.products.push(product("9", "Aerosols", ""));
        let options = BuildOptions {
            strict: true,
            ..Default::default()
        };

        let err = build_tree(&t, &options).unwrap_err();
        assert!(matches!(err, CatalogError::Reference { .. }));
        assert!(err.to_string().contains("Aerosols"));
    }

    #[test]
    fn same_slug_theme_collapses_to_later_row() {
        let mut t = tables();
        t.themes.push(ThemeRow {
            theme: "LAND".into(),
            description: "Replacement".into(),
            link: String::new(),
        });

        let mut tree = build_tree(&t, &BuildOptions::default()).unwrap();
        assert_eq!(tree.themes.len(), 2);
        assert_eq!(tree.themes[0].slug, "land");
        assert_eq!(tree.themes[0].collection.id, "LAND");
        assert_eq!(tree.themes[0].collection.description, "Replacement");
        assert_eq!(tree.themes[0].variables, vec![0]);
        assert_eq!(tree.themes[0].projects, vec![0]);

        let metrics = crate::summary::summarize(&mut tree);
        assert_eq!(metrics.summary.number_of_themes, 2);

        let docs = crate::assembler::render(&tree, &metrics).unwrap();
        let land_docs = docs.iter().filter(|d| d.path == "themes/land.json").count();
        assert_eq!(land_docs, 1);
        let catalog = &docs[0].body;
        assert_eq!(catalog.matches("./themes/land.json").count(), 1);
    }

    #[test]
    fn same_slug_variable_collapses_to_later_row() {
        let mut t = tables();
        t.variables.push(variable("soil-moisture", "Oceans"));

        let tree = build_tree(&t, &BuildOptions::default()).unwrap();
        assert_eq!(tree.variables.len(), 2);
        assert_eq!(tree.variables[0].collection.id, "soil-moisture");
        assert_eq!(tree.variables[0].theme, Some(1));
        assert!(tree.themes[0].variables.is_empty());
        assert_eq!(tree.themes[1].variables, vec![0, 1]);
        // Products follow the surviving variable.
        assert_eq!(tree.variables[0].products.len(), 1);
    }

    #[test]
    fn empty_slug_rejected_with_row_number() {
        let mut t = tables();
        t.themes.push(ThemeRow {
            theme: "!!!".into(),
            ..Default::default()
        });
        let err = build_tree(&t, &BuildOptions::default()).unwrap_err();
        assert!(matches!(err, CatalogError::Validation { .. }));
        assert!(err.to_string().contains("Theme row 3"));

        let mut t = tables();
        t.variables.insert(0, variable("  ", "Land"));
        let err = build_tree(&t, &BuildOptions::default()).unwrap_err();
        assert!(err.to_string().contains("Variable row 1"));
    }

    #[test]
    fn bad_product_row_names_row_number() {
        let mut t = tables();
        t.products.push(product("5", "Soil Moisture", "2020.14"));
        let err = build_tree(&t, &BuildOptions::default()).unwrap_err();
        assert!(err.to_string().contains("product row 3"));
    }
}
