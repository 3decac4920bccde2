//! Data models for mzXML scans

/// A single `<scan>` element
#[derive(Debug, Clone, Default)]
pub struct MzXMLScan {
    /// Scan number, the `num` attribute
    pub num: String,

    /// MS level
    pub ms_level: i16,

    /// Declared number of peaks
    pub peaks_count: usize,

    /// Polarity: 1 for `+`, -1 for `-`, 0 when absent
    pub polarity: i8,

    /// Whether the peaks are centroided
    pub centroided: bool,

    /// Retention time in seconds
    pub retention_time: Option<f64>,

    /// Precursors in document order
    pub precursors: Vec<MzXMLPrecursor>,

    /// m/z array (decoded)
    pub mz_array: Vec<f64>,

    /// Intensity array (decoded)
    pub intensity_array: Vec<f64>,
}

/// A `<precursorMz>` element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MzXMLPrecursor {
    /// Precursor m/z, the element text
    pub mz: Option<f64>,

    /// `precursorCharge`
    pub charge: Option<i32>,

    /// `precursorIntensity`
    pub intensity: Option<f64>,

    /// `activationMethod`
    pub activation_method: Option<String>,

    /// `precursorScanNum`
    pub precursor_scan_num: Option<String>,
}

/// Parse an `xs:duration` such as `PT1M30.5S` into seconds
///
/// Bare numbers are taken as seconds. Year and month designators are
/// rejected since their length in seconds is undefined.
pub fn parse_iso8601_duration(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Ok(seconds) = text.parse::<f64>() {
        return Some(seconds);
    }

    let (sign, rest) = match text.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, text),
    };
    let rest = rest.strip_prefix('P')?;

    let mut seconds = 0.0;
    let mut in_time = false;
    let mut number = String::new();
    let mut seen_component = false;

    for c in rest.chars() {
        match c {
            'T' if !in_time && number.is_empty() => in_time = true,
            '0'..='9' | '.' => number.push(c),
            designator => {
                let value: f64 = number.parse().ok()?;
                number.clear();
                seen_component = true;
                seconds += value
                    * match (in_time, designator) {
                        (false, 'W') => 7.0 * 86_400.0,
                        (false, 'D') => 86_400.0,
                        (true, 'H') => 3_600.0,
                        (true, 'M') => 60.0,
                        (true, 'S') => 1.0,
                        _ => return None,
                    };
            }
        }
    }

    if !number.is_empty() || !seen_component {
        return None;
    }
    Some(sign * seconds)
}
