//! Path rewrites applied before any network access

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use super::RewriteError;

/// Dataset whose raw-file mzML conversions were moved under dated directories
const RELOCATED_DATASET: &str = "MSV000080620/ccms_peak/RAW/";

/// A literal substring replacement on archive paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathReplacement {
    /// Substring to look for
    pub pattern: String,
    /// Text substituted for every occurrence of `pattern`
    pub replacement: String,
}

impl PathReplacement {
    /// Create a replacement rule
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

/// Replacement table used when none is configured
pub fn default_replacements() -> Vec<PathReplacement> {
    vec![PathReplacement::new(
        "MSV000083508/ccms_peak_centroided",
        "MSV000083508/ccms_peak",
    )]
}

/// Apply every rewrite rule to a logical path
///
/// The relocation rule runs first, then the first replacement whose pattern
/// occurs in the path.
pub fn rewrite_path(path: &str, replacements: &[PathReplacement]) -> Result<String, RewriteError> {
    let relocated = relocate(path)?;
    Ok(apply_replacements(&relocated, replacements).into_owned())
}

/// Move `MSV000080620/ccms_peak/RAW/<name>` to its dated directory
///
/// `<name>` must have seven `_`-separated fields; the fifth one names the
/// directory and its first three characters the parent directory. The file
/// extension changes from `.mzML` to `.mzXML`.
pub fn relocate(path: &str) -> Result<Cow<'_, str>, RewriteError> {
    if !path.contains(RELOCATED_DATASET) {
        return Ok(Cow::Borrowed(path));
    }

    let malformed = |reason: String| RewriteError::MalformedRelocation {
        path: path.to_string(),
        reason,
    };

    let name = path
        .split('/')
        .nth(3)
        .ok_or_else(|| malformed("missing file name component".to_string()))?;

    let fields: Vec<&str> = name.split('_').collect();
    if fields.len() != 7 {
        return Err(malformed(format!(
            "expected 7 '_'-separated fields in '{name}', found {}",
            fields.len()
        )));
    }

    let directory = fields[4];
    let parent: String = directory.chars().take(3).collect();
    let name = name.replace(".mzML", ".mzXML");

    Ok(Cow::Owned(format!(
        "MSV000080620/ccms_peak/{parent}/{directory}/{name}"
    )))
}

/// Apply the first replacement whose pattern occurs in `path`
pub fn apply_replacements<'a>(path: &'a str, replacements: &[PathReplacement]) -> Cow<'a, str> {
    replacements
        .iter()
        .find(|rule| !rule.pattern.is_empty() && path.contains(&rule.pattern))
        .map(|rule| Cow::Owned(path.replace(&rule.pattern, &rule.replacement)))
        .unwrap_or(Cow::Borrowed(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_relocation() {
        let path = "MSV000080620/ccms_peak/RAW/20160101_A_B_C_Day5x_E_F.mzML";
        assert_eq!(
            relocate(path).unwrap(),
            "MSV000080620/ccms_peak/Day/Day5x/20160101_A_B_C_Day5x_E_F.mzXML"
        );
    }

    #[test]
    fn test_relocation_short_directory() {
        let path = "MSV000080620/ccms_peak/RAW/a_b_c_d_Q1_f_g.mzML";
        assert_eq!(
            relocate(path).unwrap(),
            "MSV000080620/ccms_peak/Q1/Q1/a_b_c_d_Q1_f_g.mzXML"
        );
    }

    #[test]
    fn test_relocation_rejects_wrong_field_count() {
        let path = "MSV000080620/ccms_peak/RAW/too_few_fields.mzML";
        let err = relocate(path).unwrap_err();
        assert!(matches!(err, RewriteError::MalformedRelocation { .. }));
        assert!(err.to_string().contains("found 3"));
    }

    #[test]
    fn test_unrelated_path_is_borrowed() {
        let path = "MSV000012345/ccms_peak/run1.mzML";
        assert!(matches!(relocate(path).unwrap(), Cow::Borrowed(_)));
        assert!(matches!(
            apply_replacements(path, &default_replacements()),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn test_centroided_replacement() {
        let path = "MSV000083508/ccms_peak_centroided/sub/run.mzML";
        assert_eq!(
            rewrite_path(path, &default_replacements()).unwrap(),
            "MSV000083508/ccms_peak/sub/run.mzML"
        );
    }

    #[test]
    fn test_only_first_matching_replacement_applies() {
        let rules = vec![
            PathReplacement::new("alpha", "beta"),
            PathReplacement::new("beta", "gamma"),
        ];
        assert_eq!(apply_replacements("x/alpha/alpha", &rules), "x/beta/beta");
        assert_eq!(apply_replacements("x/beta", &rules), "x/gamma");
    }

    proptest! {
        #[test]
        fn prop_rewrite_is_idempotent(
            dataset in prop_oneof![Just("MSV000083508".to_string()), "MSV0000[1-7][0-9]{4}"],
            sub in "[A-Za-z0-9]{1,8}",
            name in "[A-Za-z0-9-]{1,12}",
            centroided in any::<bool>(),
        ) {
            let peak = if centroided { "ccms_peak_centroided" } else { "ccms_peak" };
            let path = format!("{dataset}/{peak}/{sub}/{name}.mzML");
            let rules = default_replacements();
            let once = rewrite_path(&path, &rules).unwrap();
            let twice = rewrite_path(&once, &rules).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_relocation_is_idempotent(
            fields in proptest::collection::vec("[A-Za-z0-9]{1,6}", 7),
        ) {
            let path = format!("MSV000080620/ccms_peak/RAW/{}.mzML", fields.join("_"));
            let rules = default_replacements();
            let once = rewrite_path(&path, &rules).unwrap();
            prop_assert!(once.ends_with(".mzXML"));
            let twice = rewrite_path(&once, &rules).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
