use serde::Serialize;
use utoipa::ToSchema;

use crate::predict::error::PredictError;

/// A named two-line element set. Opaque to the search engine beyond being
/// the geometry provider's configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ElementSet {
    pub name: String,
    pub line1: String,
    pub line2: String,
}

impl ElementSet {
    pub fn new(name: Option<String>, line1: &str, line2: &str) -> Self {
        let line1 = line1.trim().to_string();
        let line2 = line2.trim().to_string();
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("NORAD {}", catalog_number(&line1).unwrap_or("?")));
        Self { name, line1, line2 }
    }

    /// Parses an uploaded file: an optional name line followed by the two
    /// element lines. Anything after the element lines is ignored.
    pub fn from_upload(source_name: &str, text: &str) -> Result<Self, PredictError> {
        let lines: Vec<&str> = text
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();

        match lines.as_slice() {
            [] | [_] => Err(PredictError::malformed(
                source_name,
                format!("expected at least 2 lines, got {}", lines.len()),
            )),
            [l1, l2, ..] if is_line1(l1) => {
                check_line2(source_name, l2)?;
                Ok(Self::new(None, l1, l2))
            }
            [name, l1, l2, ..] => {
                if !is_line1(l1) {
                    return Err(PredictError::malformed(
                        source_name,
                        "element line 1 must start with '1 '",
                    ));
                }
                check_line2(source_name, l2)?;
                Ok(Self::new(Some(name.to_string()), l1, l2))
            }
            [_, _] => Err(PredictError::malformed(
                source_name,
                "element line 1 must start with '1 '",
            )),
        }
    }

    pub fn catalog_number(&self) -> Option<&str> {
        catalog_number(&self.line1)
    }
}

fn is_line1(line: &str) -> bool {
    line.starts_with("1 ")
}

fn is_line2(line: &str) -> bool {
    line.starts_with("2 ")
}

fn check_line2(source_name: &str, line: &str) -> Result<(), PredictError> {
    if is_line2(line) {
        Ok(())
    } else {
        Err(PredictError::malformed(
            source_name,
            "element line 2 must start with '2 '",
        ))
    }
}

fn catalog_number(line1: &str) -> Option<&str> {
    line1.get(2..7).map(str::trim).filter(|s| !s.is_empty())
}

/// Parses multi-record feed content (2- or 3-line records), skipping
/// lines that don't belong to a record.
pub fn parse_catalog(content: &str) -> Vec<ElementSet> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut result = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if is_line1(lines[i]) && i + 1 < lines.len() && is_line2(lines[i + 1]) {
            result.push(ElementSet::new(None, lines[i], lines[i + 1]));
            i += 2;
        } else if i + 2 < lines.len() && is_line1(lines[i + 1]) && is_line2(lines[i + 2]) {
            result.push(ElementSet::new(
                Some(lines[i].to_string()),
                lines[i + 1],
                lines[i + 2],
            ));
            i += 3;
        } else {
            i += 1;
        }
    }

    result
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const ISS_NAME: &str = "ISS (ZARYA)";
    pub const ISS_LINE1: &str =
        "1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992";
    pub const ISS_LINE2: &str =
        "2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008";

    pub fn iss() -> ElementSet {
        ElementSet::new(Some(ISS_NAME.to_string()), ISS_LINE1, ISS_LINE2)
    }

    #[test]
    fn test_upload_three_lines() {
        let text = format!("{}\n{}\n{}\n", ISS_NAME, ISS_LINE1, ISS_LINE2);
        let set = ElementSet::from_upload("iss.txt", &text).unwrap();
        assert_eq!(set, iss());
        assert_eq!(set.catalog_number(), Some("25544"));
    }

    #[test]
    fn test_upload_two_lines_derives_name() {
        let text = format!("\n  {}\r\n{}\r\n", ISS_LINE1, ISS_LINE2);
        let set = ElementSet::from_upload("iss.txt", &text).unwrap();
        assert_eq!(set.name, "NORAD 25544");
        assert_eq!(set.line1, ISS_LINE1);
    }

    #[test]
    fn test_upload_single_line_is_malformed() {
        let err = ElementSet::from_upload("short.txt", ISS_LINE1).unwrap_err();
        match err {
            PredictError::MalformedElementSet { source_name, .. } => {
                assert_eq!(source_name, "short.txt")
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(ElementSet::from_upload("empty.txt", "\n\n").is_err());
    }

    #[test]
    fn test_upload_rejects_wrong_line_markers() {
        let swapped = format!("{}\n{}", ISS_LINE2, ISS_LINE1);
        assert!(ElementSet::from_upload("x", &swapped).is_err());

        let bad_second = format!("{}\n{}\n{}", ISS_NAME, ISS_LINE1, ISS_LINE1);
        assert!(ElementSet::from_upload("x", &bad_second).is_err());
    }

    #[test]
    fn test_parse_catalog_mixed_records() {
        let content = format!(
            "garbage header\n{}\n{}\n{}\n{}\n{}\nCSS (TIANHE)\n{}\n{}\n",
            ISS_NAME, ISS_LINE1, ISS_LINE2, ISS_LINE1, ISS_LINE2, ISS_LINE1, ISS_LINE2
        );
        let sets = parse_catalog(&content);
        let names: Vec<_> = sets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec![ISS_NAME, "NORAD 25544", "CSS (TIANHE)"]);
    }
}
