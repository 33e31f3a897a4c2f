//! CSV input tables for the OSC catalog.
//!
//! Reads the variables, themes, projects, and products spreadsheets into
//! typed rows, and parses the date and geometry columns they carry.

pub mod dates;
pub mod geometry;
pub mod records;

use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use osccat_shared::{CatalogError, InputsConfig, Result};

pub use dates::{iso_local, parse_product_date, parse_project_date, stac_datetime};
pub use geometry::parse_geometry;
pub use records::{ProductRow, ProjectRow, ThemeRow, VariableRow};

/// Locations of the four input tables.
#[derive(Debug, Clone)]
pub struct InputPaths {
    pub variables: PathBuf,
    pub themes: PathBuf,
    pub projects: PathBuf,
    pub products: PathBuf,
}

impl From<&InputsConfig> for InputPaths {
    fn from(config: &InputsConfig) -> Self {
        Self {
            variables: PathBuf::from(&config.variables),
            themes: PathBuf::from(&config.themes),
            projects: PathBuf::from(&config.projects),
            products: PathBuf::from(&config.products),
        }
    }
}

/// All four tables, fully parsed.
#[derive(Debug, Clone, Default)]
pub struct SourceTables {
    pub variables: Vec<VariableRow>,
    pub themes: Vec<ThemeRow>,
    pub projects: Vec<ProjectRow>,
    pub products: Vec<ProductRow>,
}

/// Read every input table. Stops at the first unreadable file.
#[instrument(skip_all)]
pub fn load_tables(paths: &InputPaths) -> Result<SourceTables> {
    let tables = SourceTables {
        variables: read_csv(&paths.variables)?,
        themes: read_csv(&paths.themes)?,
        projects: read_csv(&paths.projects)?,
        products: read_csv(&paths.products)?,
    };

    info!(
        variables = tables.variables.len(),
        themes = tables.themes.len(),
        projects = tables.projects.len(),
        products = tables.products.len(),
        "input tables loaded"
    );

    Ok(tables)
}

/// Read a CSV file with a header row into typed records.
pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = std::fs::File::open(path).map_err(|e| CatalogError::io(path, e))?;
    let rows = read_csv_from(file, path)?;
    debug!(path = %path.display(), rows = rows.len(), "read CSV");
    Ok(rows)
}

/// Read CSV records from any reader; `label` names the source in errors.
pub fn read_csv_from<T: DeserializeOwned, R: Read>(reader: R, label: &Path) -> Result<Vec<T>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    reader
        .headers()
        .map_err(|e| CatalogError::csv(label, format!("failed to read header row: {e}")))?;

    reader
        .deserialize()
        .enumerate()
        .map(|(i, record)| {
            record.map_err(|e| CatalogError::csv(label, format!("record {}: {e}", i + 1)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse<T: DeserializeOwned>(content: &str) -> Result<Vec<T>> {
        read_csv_from(content.as_bytes(), Path::new("inline.csv"))
    }

    #[test]
    fn themes_by_header_name() {
        let rows: Vec<ThemeRow> = parse(
            "theme,description,link,unused\n\
             Land , Land surface ,https://example.com/land,x\n",
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].theme, "Land");
        assert_eq!(rows[0].description, "Land surface");
        assert_eq!(rows[0].link, "https://example.com/land");
    }

    #[test]
    fn variable_description_column_with_space() {
        let rows: Vec<VariableRow> = parse(
            "variable,variable description,link,theme\n\
             Sea Ice Extent,Extent of sea ice,https://example.com/sie,Cryosphere\n",
        )
        .unwrap();
        assert_eq!(rows[0].description, "Extent of sea ice");
        assert_eq!(rows[0].theme, "Cryosphere");
    }

    #[test]
    fn missing_columns_default_to_empty() {
        let rows: Vec<ProductRow> = parse("ID,Product\n7,Snow Cover\n").unwrap();
        assert_eq!(rows[0].id, "7");
        assert_eq!(rows[0].name, "Snow Cover");
        assert!(rows[0].polygon.is_empty());
        assert!(rows[0].themes().is_empty());
    }

    #[test]
    fn theme_columns_skip_blanks() {
        let rows: Vec<ProjectRow> = parse(
            "Project_ID,Theme1,Theme2,Theme3,Theme4,Theme5,Theme6\n\
             12,Land,,Oceans,,,\n",
        )
        .unwrap();
        assert_eq!(rows[0].themes(), vec!["Land".to_string(), "Oceans".to_string()]);
    }

    #[test]
    fn numeric_looking_cells_stay_strings() {
        let rows: Vec<ProductRow> = parse("ID,Start,End\n0042,2017.3,2018.0\n").unwrap();
        assert_eq!(rows[0].id, "0042");
        assert_eq!(rows[0].start, "2017.3");
    }

    #[test]
    fn quoted_json_polygon_survives() {
        let rows: Vec<ProductRow> =
            parse("ID,Polygon\n1,\"[[[0,0],[1,0],[1,1],[0,0]]]\"\n").unwrap();
        assert!(parse_geometry(&rows[0].polygon).is_some());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_csv::<ThemeRow>(Path::new("/nonexistent/Themes.csv")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    #[test]
    fn load_fixture_tables() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures/csv");
        let paths = InputPaths {
            variables: dir.join("Variables.csv"),
            themes: dir.join("Themes.csv"),
            projects: dir.join("Projects.csv"),
            products: dir.join("Products.csv"),
        };
        let tables = load_tables(&paths).expect("load fixtures");
        assert_eq!(tables.themes.len(), 3);
        assert_eq!(tables.variables.len(), 4);
        assert_eq!(tables.projects.len(), 3);
        assert_eq!(tables.products.len(), 5);
    }
}
