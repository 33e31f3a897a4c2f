//! Summary statistics for variables, themes, and the root catalog, plus the
//! `metrics.json` document consumed by the browser front end.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use osccat_shared::{ExtraFields, Item, RelType};

use crate::builder::CatalogTree;

/// Placeholder image reference for theme tiles.
const THEME_IMAGE_PLACEHOLDER: &str = "...";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSummary {
    pub years: Vec<i32>,
    pub number_of_products: usize,
    pub number_of_projects: usize,
    pub number_of_variables: usize,
    pub number_of_themes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSummary {
    pub years: Vec<i32>,
    pub number_of_products: usize,
    pub number_of_projects: usize,
    pub number_of_variables: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableSummary {
    pub years: Vec<i32>,
    pub number_of_products: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableMetrics {
    pub name: String,
    pub description: String,
    pub summary: VariableSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeMetrics {
    pub name: String,
    pub description: String,
    pub image: String,
    pub website: Option<String>,
    pub summary: ThemeSummary,
    pub variables: Vec<VariableMetrics>,
}

/// Root of `metrics.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub id: String,
    pub summary: CatalogSummary,
    pub themes: Vec<ThemeMetrics>,
}

/// Compute summaries bottom-up, store them as `osc:*` fields on the tree's
/// documents, and return the metrics document.
#[instrument(skip_all)]
pub fn summarize(tree: &mut CatalogTree) -> Metrics {
    let variable_summaries: Vec<VariableSummary> = tree
        .variables
        .iter()
        .map(|v| VariableSummary {
            years: years_of(&v.products),
            number_of_products: v.products.len(),
        })
        .collect();

    for (node, summary) in tree.variables.iter_mut().zip(&variable_summaries) {
        let fields = &mut node.collection.extra_fields;
        fields.insert("osc:years".into(), json!(summary.years));
        fields.insert("osc:numberOfProducts".into(), json!(summary.number_of_products));
    }

    let mut theme_metrics = Vec::with_capacity(tree.themes.len());
    for theme in &mut tree.themes {
        let mut years = BTreeSet::new();
        let mut number_of_products = 0;
        let mut variables = Vec::with_capacity(theme.variables.len());

        for &v in &theme.variables {
            let summary = &variable_summaries[v];
            years.extend(summary.years.iter().copied());
            number_of_products += summary.number_of_products;

            let collection = &tree.variables[v].collection;
            variables.push(VariableMetrics {
                name: collection.id.clone(),
                description: collection.description.clone(),
                summary: summary.clone(),
            });
        }

        let summary = ThemeSummary {
            years: years.into_iter().collect(),
            number_of_products,
            number_of_projects: theme.projects.len(),
            number_of_variables: theme.variables.len(),
        };

        let fields = &mut theme.collection.extra_fields;
        fields.insert("osc:years".into(), json!(summary.years));
        fields.insert("osc:numberOfProducts".into(), json!(summary.number_of_products));
        fields.insert("osc:numberOfVariables".into(), json!(summary.number_of_variables));
        fields.insert("osc:numberOfProjects".into(), json!(summary.number_of_projects));

        theme_metrics.push(ThemeMetrics {
            name: theme.collection.id.clone(),
            description: theme.collection.description.clone(),
            image: THEME_IMAGE_PLACEHOLDER.into(),
            website: theme.collection.link_href(RelType::Via).map(String::from),
            summary,
            variables,
        });
    }

    let years: BTreeSet<i32> = theme_metrics
        .iter()
        .flat_map(|t| t.summary.years.iter().copied())
        .collect();

    let summary = CatalogSummary {
        years: years.into_iter().collect(),
        number_of_products: theme_metrics.iter().map(|t| t.summary.number_of_products).sum(),
        number_of_projects: tree.projects.len(),
        number_of_variables: theme_metrics.iter().map(|t| t.summary.number_of_variables).sum(),
        number_of_themes: theme_metrics.len(),
    };

    write_catalog_fields(&mut tree.catalog.extra_fields, &summary);

    debug!(
        products = summary.number_of_products,
        projects = summary.number_of_projects,
        years = summary.years.len(),
        "summaries computed"
    );

    Metrics {
        id: tree.catalog.id.clone(),
        summary,
        themes: theme_metrics,
    }
}

fn write_catalog_fields(fields: &mut ExtraFields, summary: &CatalogSummary) {
    fields.insert("osc:numberOfProducts".into(), json!(summary.number_of_products));
    fields.insert("osc:numberOfProjects".into(), json!(summary.number_of_projects));
    fields.insert("osc:numberOfVariables".into(), json!(summary.number_of_variables));
    fields.insert("osc:numberOfThemes".into(), json!(summary.number_of_themes));
    fields.insert("osc:years".into(), json!(summary.years));
}

/// Sorted distinct years of the items' `start_datetime`.
fn years_of(items: &[Item]) -> Vec<i32> {
    items
        .iter()
        .filter_map(|item| item.property_str("start_datetime"))
        .filter_map(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok())
        .map(|dt| dt.year())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
