//! Output file naming from a compiled `XForm`.
//!
//! When the output path is left at [`DEFAULT_OUTPUT`], the real name is
//! taken from the `jr://file/<name>.geojson` attachment referenced by
//! `<category>.xml`.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::ExtractError;

/// Placeholder output name that triggers `XForm` lookup.
pub const DEFAULT_OUTPUT: &str = "tmp.geojson";

/// Returns the file name of the first `GeoJSON` attachment referenced in
/// `xml`.
#[must_use]
pub fn output_name_from_form(xml: &str) -> Option<String> {
    let re = Regex::new(r#"jr://file[^\s"'<>]*\.geojson"#).unwrap_or_else(|_| unreachable!());
    let reference = re.find(xml)?.as_str();
    reference
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Resolves where the extract is written.
///
/// Anything other than [`DEFAULT_OUTPUT`] is used as given. The default
/// is replaced by the attachment name found in `<form_dir>/<category>.xml`.
///
/// # Errors
///
/// * [`ExtractError::FormNotFound`] if the `XForm` doesn't exist
/// * [`ExtractError::FormReference`] if it references no `GeoJSON` file
/// * [`ExtractError::Io`] if it can't be read
pub fn resolve_output_path(
    geojson: &Path,
    category: &str,
    form_dir: &Path,
) -> Result<PathBuf, ExtractError> {
    if geojson != Path::new(DEFAULT_OUTPUT) {
        return Ok(geojson.to_path_buf());
    }

    let form = form_dir.join(format!("{category}.xml"));
    if !form.exists() {
        return Err(ExtractError::FormNotFound {
            path: form.display().to_string(),
        });
    }

    let xml = std::fs::read_to_string(&form)?;
    let name = output_name_from_form(&xml).ok_or_else(|| ExtractError::FormReference {
        path: form.display().to_string(),
    })?;
    log::debug!("Output name {name} taken from {}", form.display());

    Ok(PathBuf::from(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORM: &str = r#"<h:html>
  <h:head>
    <model>
      <instance id="buildings" src="jr://file/buildings.geojson"/>
    </model>
  </h:head>
</h:html>"#;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "data_extract_form_{}_{name}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn finds_attachment_name() {
        assert_eq!(
            output_name_from_form(FORM),
            Some("buildings.geojson".to_string())
        );
    }

    #[test]
    fn ignores_other_attachments() {
        let xml = r#"<instance src="jr://file-csv/health.csv"/><x src="jr://file/health.geojson"/>"#;
        assert_eq!(
            output_name_from_form(xml),
            Some("health.geojson".to_string())
        );
        assert_eq!(output_name_from_form("<h:html/>"), None);
    }

    #[test]
    fn explicit_output_is_used_as_is() {
        let path = resolve_output_path(Path::new("out.geojson"), "buildings", Path::new("/nonexistent"))
            .unwrap();
        assert_eq!(path, PathBuf::from("out.geojson"));
    }

    #[test]
    fn default_output_reads_the_form() {
        let dir = temp_dir("found");
        std::fs::write(dir.join("buildings.xml"), FORM).unwrap();

        let path = resolve_output_path(Path::new(DEFAULT_OUTPUT), "buildings", &dir).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(path, PathBuf::from("buildings.geojson"));
    }

    #[test]
    fn missing_form_is_an_error() {
        let dir = temp_dir("missing");

        let err = resolve_output_path(Path::new(DEFAULT_OUTPUT), "toilets", &dir).unwrap_err();
        std::fs::remove_dir_all(&dir).ok();

        assert!(matches!(err, ExtractError::FormNotFound { .. }));
    }

    #[test]
    fn form_without_reference_is_an_error() {
        let dir = temp_dir("unreferenced");
        std::fs::write(dir.join("water.xml"), "<h:html/>").unwrap();

        let err = resolve_output_path(Path::new(DEFAULT_OUTPUT), "water", &dir).unwrap_err();
        std::fs::remove_dir_all(&dir).ok();

        assert!(matches!(err, ExtractError::FormReference { .. }));
    }
}
