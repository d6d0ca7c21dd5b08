//! `acp convert` command implementation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use acp_config::{CliSettings, Config, ConvertConfig};
use acp_confluence::{ConvertedPage, PageConverter};
use acp_renderer::{AsciidocEngine, RenderOptions};
use acp_source::{FsSource, scan_documents};
use clap::Args;
use rayon::prelude::*;
use serde_json::Value;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the convert command.
#[derive(Args)]
pub(crate) struct ConvertArgs {
    /// Root folder of the page tree (default: `docs.source_dir` from config).
    root: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover acp.toml).
    #[arg(short, long, env = "ACP_CONFIG")]
    config: Option<PathBuf>,

    /// Directory with template overrides (overrides config).
    #[arg(long)]
    template_dir: Option<PathBuf>,

    /// Directory converted pages are written to (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Text encoding of source documents, e.g. utf-8 or windows-1252 (overrides config).
    #[arg(long)]
    source_encoding: Option<String>,

    /// Attribute binding; repeatable. A value ending in `@` can be overridden by documents.
    #[arg(short = 'a', long = "attribute", value_name = "NAME=VALUE", value_parser = parse_attribute)]
    attribute: Vec<(String, String)>,

    /// Attribute bindings as a JSON object of strings, numbers or booleans.
    #[arg(long, value_name = "JSON")]
    attributes: Option<String>,

    /// Report failed documents and continue with the rest.
    #[arg(long)]
    keep_going: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl ConvertArgs {
    /// Execute the convert command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid, the source tree can't be
    /// read, or any document fails to convert.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.root.clone(),
            template_dir: self.template_dir.clone(),
            output_dir: self.output_dir.clone(),
            source_encoding: self.source_encoding.clone(),
            attributes: self.resolve_attributes()?,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let source_dir = &config.docs_resolved.source_dir;
        let convert = &config.convert_resolved;

        let converter = create_converter(convert)?;
        let documents = scan_documents(source_dir)?;
        if documents.is_empty() {
            output.warning(&format!("No documents found in {}", source_dir.display()));
            return Ok(());
        }
        output.info(&format!(
            "Converting {} documents from {}...",
            documents.len(),
            source_dir.display()
        ));

        let convert_one = |path: &PathBuf| -> Result<PathBuf, CliError> {
            let page = converter.convert_path(path)?;
            write_page(&page, &output_path(source_dir, &convert.output_dir, path))
        };

        if self.keep_going {
            let results: Vec<_> = documents.par_iter().map(convert_one).collect();
            report(&output, &documents, &results, &convert.output_dir)
        } else {
            let written = documents
                .par_iter()
                .map(convert_one)
                .collect::<Result<Vec<_>, _>>()?;
            for path in &written {
                output.info(&format!("  -> {}", path.display()));
            }
            output.success(&format!(
                "\nConverted {} pages into {}",
                written.len(),
                convert.output_dir.display()
            ));
            Ok(())
        }
    }

    /// Merge `--attributes` JSON with `-a` bindings; the latter win.
    fn resolve_attributes(&self) -> Result<BTreeMap<String, String>, CliError> {
        let mut attributes = match &self.attributes {
            Some(json) => parse_json_attributes(json)?,
            None => BTreeMap::new(),
        };
        attributes.extend(self.attribute.iter().cloned());
        Ok(attributes)
    }
}

/// Parse a JSON object of attribute bindings.
///
/// Strings and numbers are taken as text. `true` sets an empty attribute and
/// `false` leaves it unset, as in `acp.toml`.
fn parse_json_attributes(json: &str) -> Result<BTreeMap<String, String>, CliError> {
    let object = match serde_json::from_str(json)? {
        Value::Object(object) => object,
        other => {
            return Err(CliError::Validation(format!(
                "--attributes must be a JSON object, got {other}"
            )));
        }
    };

    let mut attributes = BTreeMap::new();
    for (name, value) in object {
        let value = match value {
            Value::String(text) => text,
            Value::Number(number) => number.to_string(),
            Value::Bool(true) => String::new(),
            Value::Bool(false) => continue,
            other => {
                return Err(CliError::Validation(format!(
                    "--attributes: unsupported value for '{name}': {other}"
                )));
            }
        };
        attributes.insert(name, value);
    }
    Ok(attributes)
}

fn create_converter(convert: &ConvertConfig) -> Result<PageConverter, CliError> {
    let reader = FsSource::new(&convert.source_encoding)?;
    let mut options = RenderOptions::new().with_attributes(convert.attributes.clone());
    if let Some(dir) = &convert.template_dir {
        options = options.with_template_dir(dir);
    }
    let converter = PageConverter::new(Arc::new(AsciidocEngine::new()), Arc::new(reader), options)?;
    Ok(converter)
}

fn parse_attribute(value: &str) -> Result<(String, String), String> {
    let (name, value) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{value}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("attribute name cannot be empty".to_owned());
    }
    Ok((name.to_owned(), value.to_owned()))
}

/// Output file for a document, mirroring the source tree.
fn output_path(source_dir: &Path, output_dir: &Path, document: &Path) -> PathBuf {
    let relative = document.strip_prefix(source_dir).unwrap_or(document);
    output_dir.join(relative).with_extension("json")
}

fn write_page(page: &ConvertedPage, path: &Path) -> Result<PathBuf, CliError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(page)?)?;
    Ok(path.to_path_buf())
}

fn report(
    output: &Output,
    documents: &[PathBuf],
    results: &[Result<PathBuf, CliError>],
    output_dir: &Path,
) -> Result<(), CliError> {
    let mut failed = 0;
    for (document, result) in documents.iter().zip(results) {
        match result {
            Ok(path) => output.info(&format!("  -> {}", path.display())),
            Err(err) => {
                failed += 1;
                tracing::warn!(path = %document.display(), error = %err, "Skipping document");
                output.error(&format!("  x {err}"));
            }
        }
    }

    let converted = results.len() - failed;
    if failed == 0 {
        output.success(&format!("\nConverted {converted} pages into {}", output_dir.display()));
        return Ok(());
    }

    output.highlight(&format!(
        "\nConverted {converted} pages into {}",
        output_dir.display()
    ));
    Err(CliError::Validation(format!(
        "{failed} of {} documents failed to convert",
        results.len()
    )))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn args(config: &Path) -> ConvertArgs {
        ConvertArgs {
            root: None,
            config: Some(config.to_path_buf()),
            template_dir: None,
            output_dir: None,
            source_encoding: None,
            attribute: Vec::new(),
            attributes: None,
            keep_going: false,
            verbose: false,
        }
    }

    fn page_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("docs/guide")).unwrap();
        fs::write(
            root.join("acp.toml"),
            "[docs]\nsource_dir = \"docs\"\n\n[convert]\noutput_dir = \"build\"\n",
        )
        .unwrap();
        fs::write(
            root.join("docs/intro.adoc"),
            "= Introduction\n\nSee <<guide/setup.adoc#,setup>>.\n\nimage::diagram.png[]\n",
        )
        .unwrap();
        fs::write(
            root.join("docs/guide/setup.adoc"),
            "= Setup Guide\n\nProduct: {product}\n",
        )
        .unwrap();
        dir
    }

    fn read_page(path: &Path) -> ConvertedPage {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_parse_attribute() {
        assert_eq!(
            parse_attribute("product=ACP").unwrap(),
            ("product".to_owned(), "ACP".to_owned())
        );
        assert_eq!(
            parse_attribute("url=a=b").unwrap(),
            ("url".to_owned(), "a=b".to_owned())
        );
        assert!(parse_attribute("product").is_err());
        assert!(parse_attribute("=x").is_err());
    }

    #[test]
    fn test_resolve_attributes_flag_wins_over_json() {
        let mut args = args(Path::new("acp.toml"));
        args.attributes = Some(r#"{"product": "Old", "env": "prod"}"#.to_owned());
        args.attribute = vec![("product".to_owned(), "ACP".to_owned())];

        let attributes = args.resolve_attributes().unwrap();
        assert_eq!(attributes.get("product").map(String::as_str), Some("ACP"));
        assert_eq!(attributes.get("env").map(String::as_str), Some("prod"));
    }

    #[test]
    fn test_resolve_attributes_invalid_json() {
        let mut args = args(Path::new("acp.toml"));
        args.attributes = Some("{not json".to_owned());
        assert!(matches!(args.resolve_attributes(), Err(CliError::Json(_))));
    }

    #[test]
    fn test_json_attributes_must_be_object() {
        assert!(matches!(
            parse_json_attributes("[1, 2]"),
            Err(CliError::Validation(_))
        ));
    }

    #[test]
    fn test_json_attributes_numbers_and_flags() {
        let attributes =
            parse_json_attributes(r#"{"version": 2, "ratio": 1.5, "toc": true, "draft": false}"#)
                .unwrap();

        assert_eq!(
            attributes,
            BTreeMap::from([
                ("ratio".to_owned(), "1.5".to_owned()),
                ("toc".to_owned(), String::new()),
                ("version".to_owned(), "2".to_owned()),
            ])
        );
    }

    #[test]
    fn test_json_attributes_reject_nested_values() {
        let err = parse_json_attributes(r#"{"tags": ["a"]}"#).unwrap_err();
        assert!(err.to_string().contains("tags"));
    }

    #[test]
    fn test_output_path_mirrors_tree() {
        assert_eq!(
            output_path(Path::new("/d/docs"), Path::new("/d/build"), Path::new("/d/docs/guide/setup.adoc")),
            PathBuf::from("/d/build/guide/setup.json")
        );
    }

    #[test]
    fn test_convert_tree() {
        let dir = page_tree();
        let mut args = args(&dir.path().join("acp.toml"));
        args.attribute = vec![("product".to_owned(), "ACP".to_owned())];

        args.execute().unwrap();

        let intro = read_page(&dir.path().join("build/intro.json"));
        assert_eq!(intro.title, "Introduction");
        assert!(intro.body.contains(r#"ri:content-title="Setup Guide""#));
        assert_eq!(intro.images, vec!["diagram.png"]);

        let setup = read_page(&dir.path().join("build/guide/setup.json"));
        assert_eq!(setup.body, "<p>Product: ACP</p>");
    }

    #[test]
    fn test_failure_aborts_without_keep_going() {
        let dir = page_tree();
        fs::write(dir.path().join("docs/broken.adoc"), "no title\n").unwrap();

        let err = args(&dir.path().join("acp.toml")).execute().unwrap_err();
        assert!(matches!(err, CliError::Conversion(_)));
    }

    #[test]
    fn test_keep_going_converts_the_rest() {
        let dir = page_tree();
        fs::write(dir.path().join("docs/broken.adoc"), "no title\n").unwrap();
        let mut args = args(&dir.path().join("acp.toml"));
        args.keep_going = true;

        let err = args.execute().unwrap_err();

        assert_eq!(err.to_string(), "1 of 3 documents failed to convert");
        assert!(dir.path().join("build/intro.json").exists());
        assert!(!dir.path().join("build/broken.json").exists());
    }

    #[test]
    fn test_missing_template_dir() {
        let dir = page_tree();
        let mut args = args(&dir.path().join("acp.toml"));
        args.template_dir = Some(dir.path().join("no-templates"));

        let err = args.execute().unwrap_err();
        assert!(matches!(err, CliError::Setup(_)));
        assert!(!dir.path().join("build").exists());
    }

    #[test]
    fn test_empty_tree() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("acp.toml"), "").unwrap();

        args(&dir.path().join("acp.toml")).execute().unwrap();
        assert!(!dir.path().join("build").exists());
    }
}
