//! Plate well identifiers.
//!
//! Sample columns are named `<assay_prefix>:<well_id>`; the well id is the
//! trailing 3 characters (e.g. `A09`).

use crate::models::ExpressionMatrix;
use std::collections::BTreeSet;

/// Delimiter between the assay prefix and the well id.
pub const WELL_DELIMITER: char = ':';

/// Length of a well id.
pub const WELL_ID_LEN: usize = 3;

/// Reference control wells of the plate layout.
pub const CONTROL_WELLS: [&str; 63] = [
    "A09", "A17", "B03", "B14", "C03", "C06", "C12", "C15", "C18", "C21", "D14", "D15", "D21",
    "D22", "E07", "E14", "E17", "E24", "F01", "F03", "F06", "F09", "G04", "G09", "G10", "G13",
    "G18", "H04", "H10", "H13", "H17", "H18", "I02", "I09", "I10", "I21", "I22", "J14", "J19",
    "J23", "K05", "K06", "K13", "K16", "K19", "L02", "L05", "L06", "L15", "L18", "M01", "M04",
    "M17", "M22", "M23", "N07", "N08", "N17", "N22", "O07", "O18", "P05", "P10",
];

/// The control wells as an owned set.
pub fn control_wells() -> BTreeSet<String> {
    CONTROL_WELLS.iter().map(|w| w.to_string()).collect()
}

/// Whether `well` is one of the reference control wells.
pub fn is_control_well(well: &str) -> bool {
    CONTROL_WELLS.contains(&well)
}

/// Well id of a sample column, or `None` for columns without the delimiter.
pub fn well_suffix(column: &str) -> Option<&str> {
    if !column.contains(WELL_DELIMITER) {
        return None;
    }
    let start = column
        .char_indices()
        .rev()
        .nth(WELL_ID_LEN - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    Some(&column[start..])
}

/// Sorted distinct wells present in the matrix columns.
pub fn discover_wells(matrix: &ExpressionMatrix) -> BTreeSet<String> {
    matrix
        .columns
        .iter()
        .filter_map(|c| well_suffix(c))
        .map(str::to_string)
        .collect()
}

/// Normalize a user-supplied well id.
pub fn normalize_well(well: &str) -> String {
    well.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_wells_are_distinct() {
        let set = control_wells();
        assert_eq!(set.len(), 63);
        assert!(set.contains("A09"));
        assert!(set.contains("P10"));
        assert!(!set.contains("B01"));
    }

    #[test]
    fn test_well_suffix() {
        assert_eq!(well_suffix("CPC004_PC3_6H:BRD-A1:A09"), Some("A09"));
        assert_eq!(well_suffix("X:B01"), Some("B01"));
        assert_eq!(well_suffix("rid"), None);
        assert_eq!(well_suffix("X:1"), Some("X:1"));
    }

    #[test]
    fn test_discover_wells_skips_id_like_columns() {
        let matrix = ExpressionMatrix {
            row_ids: vec![],
            columns: vec![
                "X:B01".to_string(),
                "Y:A09".to_string(),
                "Z:B01".to_string(),
                "notes".to_string(),
            ],
            values: vec![],
        };
        let wells: Vec<_> = discover_wells(&matrix).into_iter().collect();
        assert_eq!(wells, vec!["A09", "B01"]);
    }

    #[test]
    fn test_normalize_well() {
        assert_eq!(normalize_well(" b01 "), "B01");
        assert!(is_control_well(&normalize_well("a09")));
    }
}
