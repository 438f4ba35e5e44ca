//! Generated artifact file names.
//!
//! Names carry a millisecond timestamp so repeated exports into the same
//! directory do not overwrite each other's files.

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, or 0 if the clock is before it.
pub fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// File name for a raster diagram: `diagram_<index>_<millis>.png`.
pub fn diagram_file_name(index: usize, millis: u128) -> String {
    format!("diagram_{index}_{millis}.png")
}

/// File name for a named image: `<name>_<millis>.png`.
///
/// Path separators in `name` are replaced so the file always lands in
/// the target directory.
pub fn service_image_file_name(name: &str, millis: u128) -> String {
    let safe: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{safe}_{millis}.png")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagram_file_name() {
        assert_eq!(
            diagram_file_name(2, 1_700_000_000_123),
            "diagram_2_1700000000123.png"
        );
    }

    #[test]
    fn test_service_image_file_name() {
        assert_eq!(service_image_file_name("schema", 42), "schema_42.png");
        assert_eq!(service_image_file_name("../evil", 1), ".._evil_1.png");
    }

    #[test]
    fn test_unix_millis_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(unix_millis() > 1_577_836_800_000);
    }
}
