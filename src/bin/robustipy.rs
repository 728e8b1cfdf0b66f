use std::path::PathBuf;

use clap::{Parser, Subcommand};

use robustipy::io::{read_table, write_dataframe};
use robustipy::logging::{RunLog, init_tracing};
use robustipy::model::{FitConfig, OlsRobust};
use robustipy::plot::PlotOptions;
use robustipy::qc::check_file_exists;
use robustipy::results::OlsResult;
use robustipy::types::InfoCriterion;

#[derive(Parser)]
#[command(name = "robustipy")]
#[command(about = "Multiversal estimation for robust inference", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Fit {
        #[arg(long, required = true)]
        data: PathBuf,
        #[arg(long, required = true)]
        y: String,
        #[arg(long, required = true)]
        x: String,
        #[arg(long, default_value = "")]
        controls: String,
        #[arg(long)]
        group: Option<String>,
        #[arg(long, default_value_t = 500)]
        draws: usize,
        #[arg(long)]
        sample_size: Option<usize>,
        #[arg(long)]
        replace: bool,
        #[arg(long)]
        kfold: Option<usize>,
        #[arg(long)]
        shuffle: bool,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        cores: Option<usize>,
        #[arg(long)]
        sequential: bool,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        summary: Option<PathBuf>,
        #[arg(long)]
        log_name: Option<String>,
    },
    Summary {
        #[arg(long, required = true)]
        results: PathBuf,
        #[arg(long)]
        table: Option<PathBuf>,
    },
    Bma {
        #[arg(long, required = true)]
        results: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    Plot {
        #[arg(long, required = true)]
        results: PathBuf,
        /// Specifications to highlight: control lists separated by ';'.
        #[arg(long)]
        specs: Option<String>,
        #[arg(long)]
        ic: Option<String>,
        #[arg(long)]
        joyplot: bool,
        #[arg(long, default_value = "Plots")]
        output_dir: PathBuf,
        #[arg(long)]
        output_prefix: Option<String>,
    },
    Merge {
        #[arg(long, required = true)]
        left: PathBuf,
        #[arg(long, required = true)]
        right: PathBuf,
        #[arg(long, default_value = "")]
        prefix: String,
        #[arg(long, required = true)]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Fit {
            data,
            y,
            x,
            controls,
            group,
            draws,
            sample_size,
            replace,
            kfold,
            shuffle,
            seed,
            cores,
            sequential,
            output,
            summary,
            log_name,
        } => {
            check_file_exists(&data, "--data")?;
            let mut log = RunLog::create(log_name.as_deref())?;
            let df = read_table(&data)?;
            let y = split_string_list(y);
            let x = split_string_list(x);
            let controls = split_string_list(controls);
            log.line(&format!("Data: {} ({} rows)", data.display(), df.height()), false)?;
            log.line(&format!("y: {}; x: {}", y.join(", "), x.join(", ")), false)?;
            log.line(&format!("controls: {}", controls.join(", ")), false)?;
            let config = FitConfig {
                draws,
                sample_size,
                replace,
                kfold,
                shuffle,
                group,
                seed,
                cores,
                parallel: !sequential,
            };
            let mut model = OlsRobust::new(y, x, df)?;
            let results = model.fit(&controls, &config)?;
            let failed: usize = results
                .specs
                .iter()
                .map(|s| s.estimates.iter().filter(|b| !b.is_finite()).count())
                .sum();
            let text = results.summary();
            if log.is_enabled() {
                for line in text.lines() {
                    log.line(line, true)?;
                }
            } else {
                print!("{text}");
            }
            if failed > 0 {
                log.warn(&format!("{failed} bootstrap draws could not be estimated"))?;
            }
            let output = output.unwrap_or_else(|| PathBuf::from("robustipy_results.json"));
            results.save(&output)?;
            tracing::info!("Wrote {}", output.display());
            if let Some(path) = summary {
                write_dataframe(&results.summary_table()?, &path)?;
            }
        }
        Command::Summary { results, table } => {
            let results = OlsResult::load(&results)?;
            print!("{}", results.summary());
            if let Some(path) = table {
                write_dataframe(&results.summary_table()?, &path)?;
            }
        }
        Command::Bma { results, output } => {
            let results = OlsResult::load(&results)?;
            let df = results.bma_table()?;
            let output = output.unwrap_or_else(|| PathBuf::from("bma.tsv"));
            write_dataframe(&df, &output)?;
        }
        Command::Plot {
            results,
            specs,
            ic,
            joyplot,
            output_dir,
            output_prefix,
        } => {
            let results = OlsResult::load(&results)?;
            let specs = specs.map(|s| parse_spec_list(&s));
            let ic = ic.map(|s| s.parse::<InfoCriterion>()).transpose()?;
            let options = PlotOptions {
                specs,
                ic,
                output_dir,
                prefix: output_prefix,
                joyplot,
                ..Default::default()
            };
            results.plot(&options)?;
        }
        Command::Merge {
            left,
            right,
            prefix,
            output,
        } => {
            let left = OlsResult::load(&left)?;
            let right = OlsResult::load(&right)?;
            let merged = left.merge(&right, &prefix)?;
            merged.save(&output)?;
        }
    }

    Ok(())
}

fn split_string_list(input: String) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `a,b;c` names two specifications: {a, b} and {c}. An empty entry names
/// the specification without controls.
fn parse_spec_list(input: &str) -> Vec<Vec<String>> {
    input
        .split(';')
        .map(|spec| split_string_list(spec.to_string()))
        .collect()
}
