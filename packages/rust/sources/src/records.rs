//! Typed rows of the four catalog input tables.
//!
//! Columns are matched by header name. Missing columns deserialize as empty
//! strings and unknown columns are ignored.

use serde::Deserialize;

/// A row of `Themes.csv`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThemeRow {
    pub theme: String,
    pub description: String,
    pub link: String,
}

/// A row of `Variables.csv`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VariableRow {
    pub variable: String,
    #[serde(rename = "variable description")]
    pub description: String,
    pub link: String,
    /// Name of the owning theme, as written in the themes table.
    pub theme: String,
}

/// Non-empty values of the `Theme1`..`Theme6` columns, in column order.
fn non_empty(columns: [&String; 6]) -> Vec<String> {
    columns
        .into_iter()
        .filter(|t| !t.is_empty())
        .cloned()
        .collect()
}

/// A row of the projects table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectRow {
    #[serde(rename = "Project_ID")]
    pub id: String,
    #[serde(rename = "Project_Name")]
    pub name: String,
    #[serde(rename = "Short_Description")]
    pub description: String,
    #[serde(rename = "Start_Date_Project")]
    pub start: String,
    #[serde(rename = "End_Date_Project")]
    pub end: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Consortium")]
    pub consortium: String,
    #[serde(rename = "TO")]
    pub technical_officer: String,
    #[serde(rename = "TO_E-mail")]
    pub technical_officer_email: String,
    #[serde(rename = "Website")]
    pub website: String,
    #[serde(rename = "Eo4Society_link")]
    pub eo4society_link: String,
    #[serde(rename = "Theme1")]
    pub theme1: String,
    #[serde(rename = "Theme2")]
    pub theme2: String,
    #[serde(rename = "Theme3")]
    pub theme3: String,
    #[serde(rename = "Theme4")]
    pub theme4: String,
    #[serde(rename = "Theme5")]
    pub theme5: String,
    #[serde(rename = "Theme6")]
    pub theme6: String,
}

impl ProjectRow {
    pub fn themes(&self) -> Vec<String> {
        non_empty([
            &self.theme1,
            &self.theme2,
            &self.theme3,
            &self.theme4,
            &self.theme5,
            &self.theme6,
        ])
    }
}

/// A row of the products table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductRow {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Product")]
    pub name: String,
    #[serde(rename = "Description")]
    pub description: String,
    /// `YYYY.M` with a zero-based month.
    #[serde(rename = "Start")]
    pub start: String,
    #[serde(rename = "End")]
    pub end: String,
    #[serde(rename = "EO_Missions")]
    pub missions: String,
    #[serde(rename = "Project")]
    pub project: String,
    #[serde(rename = "Variable")]
    pub variable: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Polygon")]
    pub polygon: String,
    #[serde(rename = "Website")]
    pub website: String,
    #[serde(rename = "Access")]
    pub access: String,
    #[serde(rename = "Documentation")]
    pub documentation: String,
    #[serde(rename = "DOI")]
    pub doi: String,
    #[serde(rename = "Theme1")]
    pub theme1: String,
    #[serde(rename = "Theme2")]
    pub theme2: String,
    #[serde(rename = "Theme3")]
    pub theme3: String,
    #[serde(rename = "Theme4")]
    pub theme4: String,
    #[serde(rename = "Theme5")]
    pub theme5: String,
    #[serde(rename = "Theme6")]
    pub theme6: String,
}

impl ProductRow {
    pub fn themes(&self) -> Vec<String> {
        non_empty([
            &self.theme1,
            &self.theme2,
            &self.theme3,
            &self.theme4,
            &self.theme5,
            &self.theme6,
        ])
    }
}
