//! Pruning tunables and column classification.

use carburantes_types::Cell;

/// Prefix shared by every fuel price column (note the trailing space).
pub const FUEL_PRICE_PREFIX: &str = "Precio ";

/// Placeholder the API uses for a missing value.
pub const PLACEHOLDER: &str = "#####";

/// Station identity and location columns that are never dropped.
pub const FUNDAMENTAL_COLUMNS: [&str; 7] = [
    "IDEESS",
    "Rótulo",
    "Dirección",
    "C.P.",
    "Localidad",
    "Municipio",
    "Provincia",
];

/// Tunables of the column pruning policy.
#[derive(Debug, Clone, PartialEq)]
pub struct PruneRules {
    /// Prefix identifying fuel price columns.
    pub fuel_prefix: String,
    /// Columns kept regardless of content.
    pub fundamental_columns: Vec<String>,
    /// Text treated as a missing value.
    pub placeholder: String,
    /// A column is dropped when its share of empty values exceeds this.
    pub empty_threshold: f64,
    /// A column is dropped when its most frequent value's share exceeds this.
    pub constant_threshold: f64,
    /// Column holding postal codes.
    pub postal_code_column: String,
    /// Column rows are ordered by.
    pub locality_column: String,
    /// Width postal codes are zero-padded to.
    pub postal_code_width: usize,
}

impl Default for PruneRules {
    fn default() -> Self {
        Self {
            fuel_prefix: FUEL_PRICE_PREFIX.to_string(),
            fundamental_columns: FUNDAMENTAL_COLUMNS.iter().map(ToString::to_string).collect(),
            placeholder: PLACEHOLDER.to_string(),
            empty_threshold: 0.8,
            constant_threshold: 0.9,
            postal_code_column: "C.P.".to_string(),
            locality_column: "Localidad".to_string(),
            postal_code_width: 5,
        }
    }
}

impl PruneRules {
    /// Sets both drop thresholds.
    #[must_use]
    pub const fn with_thresholds(mut self, empty: f64, constant: f64) -> Self {
        self.empty_threshold = empty;
        self.constant_threshold = constant;
        self
    }

    /// Sets the fuel column prefix.
    #[must_use]
    pub fn with_fuel_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.fuel_prefix = prefix.into();
        self
    }

    /// Returns true for the identity and location columns.
    #[must_use]
    pub fn is_fundamental(&self, name: &str) -> bool {
        self.fundamental_columns.iter().any(|c| c == name)
    }

    /// Returns true if the column holds a fuel price.
    #[must_use]
    pub fn is_fuel_column(&self, name: &str) -> bool {
        name.starts_with(&self.fuel_prefix)
    }

    /// Returns the fuel type name of a fuel price column.
    #[must_use]
    pub fn fuel_name<'a>(&self, column: &'a str) -> Option<&'a str> {
        column.strip_prefix(self.fuel_prefix.as_str())
    }

    /// Returns true if the cell counts as empty: no value, an empty string
    /// or the placeholder.
    #[must_use]
    pub fn is_empty_cell(&self, cell: &Cell) -> bool {
        match cell {
            Cell::Empty => true,
            Cell::Text(s) | Cell::Literal(s) => s.is_empty() || *s == self.placeholder,
            Cell::Number(_) => false,
        }
    }
}

/// Returns true if the column name denotes a latitude or longitude
/// (case-insensitive).
#[must_use]
pub fn is_coordinate_column(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("latitud") || lower.contains("longitud")
}

/// Parses a coordinate written with a decimal comma or point.
///
/// Missing values, empty strings, the placeholder and anything that does not
/// parse to a finite number become [`Cell::Empty`].
#[must_use]
pub fn normalize_coordinate(cell: &Cell, placeholder: &str) -> Cell {
    match cell {
        Cell::Number(n) if n.is_finite() => Cell::Number(*n),
        Cell::Text(s) | Cell::Literal(s) if !s.is_empty() && s != placeholder => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map_or(Cell::Empty, Cell::Number),
        _ => Cell::Empty,
    }
}

/// Formats a postal code as text, zero-padded to `width` when it is made
/// of digits only. Longer codes are left intact.
#[must_use]
pub fn format_postal_code(cell: &Cell, width: usize) -> Cell {
    let text = match cell {
        Cell::Empty => return Cell::Empty,
        Cell::Number(n) if n.fract() == 0.0 && *n >= 0.0 => format!("{n:.0}"),
        other => other.to_string(),
    };
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        Cell::Literal(format!("{text:0>width$}"))
    } else {
        Cell::Literal(text)
    }
}

/// Key used to compare values for the near-constant rule: comma replaced by
/// a point and surrounding whitespace trimmed. Missing values share one key.
pub(crate) fn mode_key(cell: &Cell) -> String {
    match cell {
        Cell::Empty => "nan".to_string(),
        other => other.to_string().replace(',', ".").trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_names() {
        assert!(is_coordinate_column("Latitud"));
        assert!(is_coordinate_column("Longitud (WGS84)"));
        assert!(is_coordinate_column("LONGITUD"));
        assert!(!is_coordinate_column("Localidad"));
    }

    #[test]
    fn test_fuel_columns() {
        let rules = PruneRules::default();
        assert!(rules.is_fuel_column("Precio Gasoleo A"));
        assert!(!rules.is_fuel_column("PrecioGasoleo"));
        assert!(!rules.is_fuel_column("precio Gasoleo A"));
        assert_eq!(rules.fuel_name("Precio Gasolina 95 E5"), Some("Gasolina 95 E5"));
        assert_eq!(rules.fuel_name("Horario"), None);
    }

    #[test]
    fn test_empty_cells() {
        let rules = PruneRules::default();
        assert!(rules.is_empty_cell(&Cell::Empty));
        assert!(rules.is_empty_cell(&Cell::Text(String::new())));
        assert!(rules.is_empty_cell(&Cell::Text("#####".into())));
        assert!(!rules.is_empty_cell(&Cell::Text(" ".into())));
        assert!(!rules.is_empty_cell(&Cell::Number(0.0)));
    }

    #[test]
    fn test_normalize_coordinate() {
        let p = PLACEHOLDER;
        assert_eq!(normalize_coordinate(&Cell::Text("40,416775".into()), p), Cell::Number(40.416775));
        assert_eq!(normalize_coordinate(&Cell::Text(" -3.70 ".into()), p), Cell::Number(-3.70));
        assert_eq!(normalize_coordinate(&Cell::Text("#####".into()), p), Cell::Empty);
        assert_eq!(normalize_coordinate(&Cell::Text(String::new()), p), Cell::Empty);
        assert_eq!(normalize_coordinate(&Cell::Text("n/a".into()), p), Cell::Empty);
        assert_eq!(normalize_coordinate(&Cell::Text("inf".into()), p), Cell::Empty);
        assert_eq!(normalize_coordinate(&Cell::Number(1.5), p), Cell::Number(1.5));
    }

    #[test]
    fn test_format_postal_code() {
        assert_eq!(format_postal_code(&Cell::Text("1234".into()), 5), Cell::Literal("01234".into()));
        assert_eq!(format_postal_code(&Cell::Text("28001".into()), 5), Cell::Literal("28001".into()));
        assert_eq!(format_postal_code(&Cell::Number(8001.0), 5), Cell::Literal("08001".into()));
        assert_eq!(format_postal_code(&Cell::Text("280 01".into()), 5), Cell::Literal("280 01".into()));
        assert_eq!(format_postal_code(&Cell::Text("1234567".into()), 5), Cell::Literal("1234567".into()));
        assert_eq!(format_postal_code(&Cell::Empty, 5), Cell::Empty);
        let once = format_postal_code(&Cell::Text("7".into()), 5);
        assert_eq!(format_postal_code(&once, 5), once);
    }

    #[test]
    fn test_mode_key() {
        assert_eq!(mode_key(&Cell::Text(" 1,5 ".into())), "1.5");
        assert_eq!(mode_key(&Cell::Number(1.5)), "1.5");
        assert_eq!(mode_key(&Cell::Empty), "nan");
    }
}
