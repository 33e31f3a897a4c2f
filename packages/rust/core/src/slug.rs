//! Slugs used to match theme and variable names across tables and to name
//! collection files.

use std::sync::LazyLock;

use regex::Regex;

/// Runs of anything that is not a lowercase ASCII letter or digit.
static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("separator regex"));

/// Turn a display name into a lowercase, hyphen-separated slug.
///
/// `"Sea Surface Temperature"` becomes `sea-surface-temperature`,
/// `"Land Cover (CCI)"` becomes `land-cover-cci`. Apostrophes are dropped so
/// `"Earth's Surface"` becomes `earths-surface`.
pub fn slugify(name: &str) -> String {
    let folded: String = name
        .to_lowercase()
        .chars()
        .filter(|c| *c != '\'' && *c != '\u{2019}')
        .map(fold_latin)
        .collect();

    SEPARATOR_RE
        .replace_all(&folded, "-")
        .trim_matches('-')
        .to_string()
}

/// Fold common accented Latin letters to their ASCII base letters.
fn fold_latin(c: char) -> String {
    let base = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ą' => "a",
        'ç' | 'ć' | 'č' => "c",
        'ď' | 'đ' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'ī' => "i",
        'ł' => "l",
        'ñ' | 'ń' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'ř' => "r",
        'ś' | 'š' | 'ş' => "s",
        'ť' | 'ţ' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        'æ' => "ae",
        'œ' => "oe",
        'ß' => "ss",
        _ => return c.to_string(),
    };
    base.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaces_and_case() {
        assert_eq!(slugify("Sea Surface Temperature"), "sea-surface-temperature");
        assert_eq!(slugify("  Land  "), "land");
    }

    #[test]
    fn punctuation_collapses() {
        assert_eq!(slugify("Land Cover (CCI)"), "land-cover-cci");
        assert_eq!(slugify("Snow/Ice -- Albedo"), "snow-ice-albedo");
        assert_eq!(slugify("Earth's Surface"), "earths-surface");
    }

    #[test]
    fn accents_fold() {
        assert_eq!(slugify("Température de surface"), "temperature-de-surface");
        assert_eq!(slugify("Straße"), "strasse");
    }

    #[test]
    fn same_slug_for_variant_spellings() {
        assert_eq!(slugify("Sea-Ice Extent"), slugify("sea ice extent"));
    }

    #[test]
    fn empty_and_symbol_only() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }
}
