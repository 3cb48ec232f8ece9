use std::str::FromStr;

/// Parses a "WxH" resolution option value.
pub fn parse_resolution_str(arg: &str) -> (u32, u32) {
    let (width_str, height_str) = arg
        .split_once('x')
        .unwrap_or_else(|| panic!("Invalid resolution '{}', expected WxH", arg));

    let width = u32::from_str(width_str)
        .unwrap_or_else(|e| panic!("Unable to parse width '{}': {}", width_str, e));

    let height = u32::from_str(height_str)
        .unwrap_or_else(|e| panic!("Unable to parse height '{}': {}", height_str, e));

    (width, height)
}
