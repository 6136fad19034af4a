use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use topicview::visualize::{list_artifacts, purge_artifacts};
use topicview::{DocumentTable, Pipeline, PipelineConfig, PipelineOutput};

#[derive(Parser, Debug)]
#[command(version, about = "Topic modeling for a column of free text", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit a topic model on one column of a CSV file
    Run(RunArgs),
    /// List the columns of a CSV file that hold text
    Columns { path: PathBuf },
    /// List (or delete) visualization files in a directory
    Artifacts {
        dir: PathBuf,
        #[clap(long, help = "Delete the listed files")]
        purge: bool,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    path: PathBuf,
    #[clap(short, long, help = "Column holding the documents")]
    column: String,
    #[clap(short = 'k', long, help = "Number of topics, 2 to 100")]
    topics: Option<usize>,
    #[clap(long, help = "Drop baseline and additional stopwords")]
    remove_stop_words: bool,
    #[clap(
        long,
        conflicts_with = "remove_stop_words",
        help = "Keep stopwords even if the config file removes them"
    )]
    keep_stop_words: bool,
    #[clap(long, help = "Apply the Snowball stemmer")]
    stem: bool,
    #[clap(long, help = "Additional stop words separated by comma")]
    stop_words: Option<String>,
    #[clap(short, long, help = "Directory the HTML visualization is written to")]
    output_dir: Option<PathBuf>,
    #[clap(long)]
    seed: Option<u64>,
    #[clap(long, help = "JSON file with pipeline settings; flags override it")]
    config: Option<PathBuf>,
    #[clap(long, help = "Print the result as JSON")]
    json: bool,
}

impl RunArgs {
    fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(topics) = self.topics {
            config.num_topics = topics;
        }
        if self.remove_stop_words {
            config.remove_stop_words = true;
        }
        if self.keep_stop_words {
            config.remove_stop_words = false;
        }
        if self.stem {
            config.stem_words = true;
        }
        if let Some(words) = &self.stop_words {
            config.additional_stop_words = words.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Run(run) => run_pipeline(&run),
        Command::Columns { path } => {
            let table = DocumentTable::from_csv_path(&path)?;
            for column in table.text_columns() {
                println!("{}", column);
            }
            Ok(())
        }
        Command::Artifacts { dir, purge } => {
            if purge {
                let removed = purge_artifacts(&dir)
                    .with_context(|| format!("purging {}", dir.display()))?;
                println!("Removed {} visualization file(s)", removed);
            } else {
                let artifacts = list_artifacts(&dir)
                    .with_context(|| format!("listing {}", dir.display()))?;
                for path in artifacts {
                    println!("{}", path.display());
                }
            }
            Ok(())
        }
    }
}

fn run_pipeline(args: &RunArgs) -> anyhow::Result<()> {
    let config = args.pipeline_config()?;
    let table = DocumentTable::from_csv_path(&args.path)?;
    let output = Pipeline::default()
        .run_table(&table, &args.column, &config)
        .context("topic pipeline failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_summary(&output);
    }
    Ok(())
}

fn print_summary(output: &PipelineOutput) {
    println!("📊 Topic model summary:");
    println!("   Documents:   {}", output.documents);
    println!("   Vocabulary:  {}", output.vocabulary_size);
    println!("   Topics:      {}", output.num_topics);
    println!("   Coherence:   {}", output.metrics.coherence);
    println!("   Perplexity:  {}", output.metrics.perplexity);
    output.topic_report.print_table();
    println!("\n✅ Visualization: {}", output.html_file_path.path().display());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(extra: &[&str]) -> RunArgs {
        let argv = ["topicview", "run", "reviews.csv", "--column", "review"];
        let args = Args::try_parse_from(argv.iter().chain(extra).copied()).unwrap();
        match args.command {
            Command::Run(run) => run,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn stop_words_are_kept_unless_requested() {
        let config = run_args(&[]).pipeline_config().unwrap();
        assert!(!config.remove_stop_words);

        let config = run_args(&["--remove-stop-words"]).pipeline_config().unwrap();
        assert!(config.remove_stop_words);
    }

    #[test]
    fn keep_flag_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "remove_stop_words": true, "num_topics": 7 }"#).unwrap();
        let config_path = path.to_str().unwrap();

        let config = run_args(&["--config", config_path]).pipeline_config().unwrap();
        assert!(config.remove_stop_words);
        assert_eq!(config.num_topics, 7);

        let config = run_args(&["--config", config_path, "--keep-stop-words", "-k", "3"])
            .pipeline_config()
            .unwrap();
        assert!(!config.remove_stop_words);
        assert_eq!(config.num_topics, 3);
    }

    #[test]
    fn remove_and_keep_flags_conflict() {
        let argv = [
            "topicview",
            "run",
            "reviews.csv",
            "--column",
            "review",
            "--remove-stop-words",
            "--keep-stop-words",
        ];
        assert!(Args::try_parse_from(argv).is_err());
    }
}
