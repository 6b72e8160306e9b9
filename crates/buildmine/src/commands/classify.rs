//! Classify command: show how changed-file paths are categorized.

use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use buildmine_core::classify::{FileCategory, classify, dotted_extension};

/// Arguments for the `classify` subcommand.
#[derive(Args, Debug, Default)]
pub struct ClassifyArgs {
    /// Repository-relative paths to classify
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Classified {
    path: String,
    category: FileCategory,
    #[serde(skip_serializing_if = "String::is_empty")]
    extension: String,
}

fn classify_all(paths: &[String]) -> Vec<Classified> {
    paths
        .iter()
        .map(|path| Classified {
            category: classify(path),
            extension: dotted_extension(path),
            path: path.clone(),
        })
        .collect()
}

/// Print the category of each path.
#[instrument(name = "cmd_classify", skip_all, fields(json_output = global_json))]
pub fn cmd_classify(args: ClassifyArgs, global_json: bool) -> anyhow::Result<()> {
    debug!(count = args.paths.len(), "classifying paths");
    let classified = classify_all(&args.paths);

    if global_json {
        println!("{}", serde_json::to_string_pretty(&classified)?);
        return Ok(());
    }

    for entry in &classified {
        let label = format!("{:<14}", entry.category.to_string());
        let label = match entry.category {
            FileCategory::Test => label.green().to_string(),
            FileCategory::Production => label.cyan().to_string(),
            FileCategory::Documentation => label.blue().to_string(),
            FileCategory::Other => label.dimmed().to_string(),
        };
        println!("{label}{}", entry.path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_all_keeps_input_order() {
        let paths = vec![
            "spec/models/user_spec.rb".to_string(),
            "lib/user.rb".to_string(),
            "README.md".to_string(),
        ];
        let classified = classify_all(&paths);
        let categories: Vec<FileCategory> = classified.iter().map(|c| c.category).collect();
        assert_eq!(
            categories,
            vec![
                FileCategory::Test,
                FileCategory::Production,
                FileCategory::Documentation
            ]
        );
        assert_eq!(classified[1].extension, ".rb");
    }

    #[test]
    fn json_uses_lowercase_categories() {
        let classified = classify_all(&["src/main.rs".to_string()]);
        let json = serde_json::to_value(&classified).unwrap();
        assert_eq!(json[0]["category"], "production");
    }
}
