mod report;
mod run;

use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use ecoroute_ai::onnx::{DEFAULT_EMBEDDING_MODEL, DEFAULT_HYPOTHESIS_TEMPLATE, DEFAULT_NLI_MODEL};
use ecoroute_ai::{CancelFlag, EvaluatorOptions, OnnxConfig, OnnxProvider, Resilient, RetryPolicy};
use ecoroute_core::{BinaryLabels, DatasetSchema, Quotas};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "ecoroute",
    version,
    about = "Compare zero-shot classification and semantic routing on a labelled dataset"
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Classify every sample with the zero-shot NLI model.
    Classify(ClassifyArgs),
    /// Seed routes from labelled examples and route the remaining samples.
    Route(RouteArgs),
    /// Run both strategies on the same test split.
    Compare {
        #[command(flatten)]
        route: RouteArgs,
        #[command(flatten)]
        classify: ClassifyArgs,
    },
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Delimited input file with a header line.
    #[arg(long, env = "ECOROUTE_DATA", default_value = "environmental_2k.csv", global = true)]
    data: PathBuf,

    #[arg(long, env = "ECOROUTE_DELIMITER", default_value_t = ',', global = true)]
    delimiter: char,

    #[arg(long, env = "ECOROUTE_TEXT_COLUMN", default_value = "text", global = true)]
    text_column: String,

    /// Column whose value "1" marks a positive sample.
    #[arg(long, env = "ECOROUTE_LABEL_COLUMN", default_value = "env", global = true)]
    label_column: String,

    /// Shuffle seed; random when omitted.
    #[arg(long, env = "ECOROUTE_SEED", global = true)]
    seed: Option<u64>,

    #[arg(long, env = "ECOROUTE_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL, global = true)]
    embedding_model: PathBuf,

    #[arg(long, env = "ECOROUTE_NLI_MODEL", default_value = DEFAULT_NLI_MODEL, global = true)]
    nli_model: PathBuf,

    #[arg(long, env = "ECOROUTE_HYPOTHESIS_TEMPLATE", default_value = DEFAULT_HYPOTHESIS_TEMPLATE, global = true)]
    hypothesis_template: String,

    /// Per provider call, in milliseconds.
    #[arg(long, env = "ECOROUTE_TIMEOUT_MS", global = true)]
    timeout_ms: Option<u64>,

    /// Attempts per provider call, including the first.
    #[arg(long, env = "ECOROUTE_RETRIES", default_value_t = 3, global = true)]
    retries: usize,

    /// Provider calls in flight during evaluation.
    #[arg(long, env = "ECOROUTE_CONCURRENCY", default_value_t = 1, global = true)]
    concurrency: usize,

    /// Print the report as JSON on stdout.
    #[arg(long, env = "ECOROUTE_JSON", global = true)]
    json: bool,
}

#[derive(Debug, Clone, Args)]
struct ClassifyArgs {
    #[arg(long, env = "ECOROUTE_POSITIVE_LABEL", default_value = "environmental")]
    positive_label: String,

    #[arg(long, env = "ECOROUTE_NEGATIVE_LABEL", default_value = "random other")]
    negative_label: String,
}

#[derive(Debug, Clone, Args)]
struct RouteArgs {
    /// Positive samples embedded as route examples.
    #[arg(long, env = "ECOROUTE_POSITIVE_EXAMPLES", default_value_t = 20)]
    positive_examples: usize,

    /// Negative samples embedded as route examples.
    #[arg(long, env = "ECOROUTE_NEGATIVE_EXAMPLES", default_value_t = 80)]
    negative_examples: usize,

    #[arg(long, env = "ECOROUTE_POSITIVE_ROUTE", default_value = "environmental")]
    positive_route: String,

    #[arg(long, env = "ECOROUTE_NEGATIVE_ROUTE", default_value = "not environmental")]
    negative_route: String,
}

impl ClassifyArgs {
    fn labels(&self) -> BinaryLabels {
        BinaryLabels::new(&self.positive_label, &self.negative_label)
    }
}

impl RouteArgs {
    fn quotas(&self) -> Quotas {
        Quotas {
            positive: self.positive_examples,
            negative: self.negative_examples,
        }
    }

    fn labels(&self) -> BinaryLabels {
        BinaryLabels::new(&self.positive_route, &self.negative_route)
    }
}

impl CommonArgs {
    fn schema(&self) -> DatasetSchema {
        DatasetSchema {
            delimiter: self.delimiter,
            text_column: self.text_column.clone(),
            label_column: self.label_column.clone(),
        }
    }

    fn provider(&self) -> Resilient<OnnxProvider> {
        let onnx = OnnxProvider::new(OnnxConfig {
            embedding_model: self.embedding_model.clone(),
            nli_model: self.nli_model.clone(),
            hypothesis_template: self.hypothesis_template.clone(),
        });
        Resilient::new(
            onnx,
            self.timeout_ms.map(Duration::from_millis),
            RetryPolicy::exponential(self.retries, Duration::from_millis(200)),
        )
    }

    fn evaluator_options(&self) -> EvaluatorOptions {
        EvaluatorOptions {
            concurrency: self.concurrency,
        }
    }
}

/// Trip `cancel` on the first signal. Returns `true` once a second signal
/// arrives, `false` if the signal source fails.
async fn watch_interrupts<F, Fut>(mut next_signal: F, cancel: CancelFlag) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if next_signal().await.is_err() {
        return false;
    }
    eprintln!("\n  Interrupted, finishing current sample (Ctrl-C again to quit)...");
    cancel.cancel();
    next_signal().await.is_ok()
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("ecoroute v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, on_interrupt).await {
            eprintln!("\n  Interrupted again, exiting");
            std::process::exit(130);
        }
    });

    let dataset = run::load_dataset(&cli.common)?;
    let provider = cli.common.provider();
    let options = cli.common.evaluator_options();

    let reports = match &cli.command {
        Command::Classify(args) => {
            vec![run::classify(&provider, &dataset, args.labels(), options, cancel).await?]
        }
        Command::Route(args) => {
            let quotas = args.quotas();
            vec![run::route(&provider, &dataset, quotas, args.labels(), options, cancel).await?]
        }
        Command::Compare { route, classify } => {
            run::compare(
                &provider,
                &dataset,
                route.quotas(),
                route.labels(),
                classify.labels(),
                options,
                cancel,
            )
            .await?
        }
    };

    if cli.common.json {
        report::print_json(&reports)?;
    } else {
        print!("{}", report::render_dataset(&cli.common.data, &dataset));
        for r in &reports {
            print!("{}", report::render(r));
        }
    }

    // An empty test set or an interrupted run is not a successful measurement.
    let complete = reports
        .iter()
        .all(|r| !r.cancelled && r.accuracy.percent().is_some());
    Ok(if complete {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
