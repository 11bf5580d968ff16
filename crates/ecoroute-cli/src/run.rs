//! Evaluation pipelines: load and shuffle the dataset, then classify or route.

use anyhow::Context;
use ecoroute_ai::{
    CancelFlag, ClassifierAdapter, Evaluator, EvaluatorOptions, Provider, RouteSpec, RouteStore,
    Router,
};
use ecoroute_core::{BinaryLabels, DatasetSummary, Quotas, Sample, load_samples, partition};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::CommonArgs;
use crate::report::{Mode, RouteSummary, RunReport};

/// Shuffled samples and how they were obtained.
pub struct LoadedDataset {
    pub samples: Vec<Sample>,
    pub summary: DatasetSummary,
    pub seed: u64,
}

pub fn load_dataset(args: &CommonArgs) -> anyhow::Result<LoadedDataset> {
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);

    let dataset = load_samples(&args.data, &args.schema(), &mut rng)
        .with_context(|| format!("loading {}", args.data.display()))?;
    let summary = dataset.summary();
    eprintln!(
        "  Loaded {} samples ({} positive, {} negative, {} dropped), seed {seed}",
        summary.total, summary.positive, summary.negative, summary.dropped
    );

    Ok(LoadedDataset {
        samples: dataset.samples,
        summary,
        seed,
    })
}

/// Zero-shot classify every sample.
pub async fn classify<P: Provider>(
    provider: &P,
    dataset: &LoadedDataset,
    labels: BinaryLabels,
    options: EvaluatorOptions,
    cancel: CancelFlag,
) -> anyhow::Result<RunReport> {
    classify_samples(provider, dataset, &dataset.samples, labels, options, cancel).await
}

/// Seed routes from the first samples of each class and route the rest.
pub async fn route<P: Provider>(
    provider: &P,
    dataset: &LoadedDataset,
    quotas: Quotas,
    labels: BinaryLabels,
    options: EvaluatorOptions,
    cancel: CancelFlag,
) -> anyhow::Result<RunReport> {
    let split = partition(dataset.samples.clone(), quotas);
    route_split(
        provider,
        dataset,
        split.positive,
        split.negative,
        &split.test,
        labels,
        options,
        cancel,
    )
    .await
}

/// Route, then classify the same test split.
#[allow(clippy::too_many_arguments)]
pub async fn compare<P: Provider>(
    provider: &P,
    dataset: &LoadedDataset,
    quotas: Quotas,
    route_labels: BinaryLabels,
    classify_labels: BinaryLabels,
    options: EvaluatorOptions,
    cancel: CancelFlag,
) -> anyhow::Result<Vec<RunReport>> {
    let split = partition(dataset.samples.clone(), quotas);
    let routed = route_split(
        provider,
        dataset,
        split.positive,
        split.negative,
        &split.test,
        route_labels,
        options.clone(),
        cancel.clone(),
    )
    .await?;
    if routed.cancelled {
        return Ok(vec![routed]);
    }

    let classified =
        classify_samples(provider, dataset, &split.test, classify_labels, options, cancel).await?;
    Ok(vec![routed, classified])
}

async fn classify_samples<P: Provider>(
    provider: &P,
    dataset: &LoadedDataset,
    test: &[Sample],
    labels: BinaryLabels,
    options: EvaluatorOptions,
    cancel: CancelFlag,
) -> anyhow::Result<RunReport> {
    let adapter = ClassifierAdapter::new(provider, labels);

    eprintln!("  Classifying {} samples...", test.len());
    let outcome = Evaluator::new(options)
        .with_cancel(cancel)
        .evaluate(test, adapter.labels(), &adapter)
        .await
        .context("zero-shot classification")?;

    Ok(RunReport::new(
        Mode::Classify,
        dataset,
        adapter.labels().clone(),
        Vec::new(),
        test.len(),
        &outcome,
    ))
}

#[allow(clippy::too_many_arguments)]
async fn route_split<P: Provider>(
    provider: &P,
    dataset: &LoadedDataset,
    positive: Vec<String>,
    negative: Vec<String>,
    test: &[Sample],
    labels: BinaryLabels,
    options: EvaluatorOptions,
    cancel: CancelFlag,
) -> anyhow::Result<RunReport> {
    eprintln!(
        "  Seeding routes from {} + {} examples...",
        positive.len(),
        negative.len()
    );
    let store = RouteStore::seed(
        provider,
        vec![
            RouteSpec::new(&labels.positive, positive),
            RouteSpec::new(&labels.negative, negative),
        ],
    )
    .await
    .context("seeding routes")?;
    let routes = store
        .summary()
        .into_iter()
        .map(|(name, examples)| RouteSummary {
            name: name.to_string(),
            examples,
        })
        .collect();

    eprintln!("  Routing {} samples...", test.len());
    let router = Router::new(&store, provider);
    let outcome = Evaluator::new(options)
        .with_cancel(cancel)
        .evaluate(test, &labels, &router)
        .await
        .context("semantic routing")?;

    Ok(RunReport::new(
        Mode::Route,
        dataset,
        labels,
        routes,
        test.len(),
        &outcome,
    ))
}
