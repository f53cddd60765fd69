use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use u_symreg::dataset::{Dataset, DEFAULT_COMMENT};
use u_symreg::evolution::{Breed, Parameters, PopulationAlgorithm};
use u_symreg::expr::{Expression, GapExpression};
use u_symreg::metrics::Metric;
use u_symreg::random::create_rng;

#[derive(Parser, Debug)]
#[command(
    name = "u-symreg",
    version,
    about = "Symbolic regression with genetic programming and GA-P"
)]
struct Cli {
    /// Log the best fitness of every generation.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train on a data file and print the best expression with its errors.
    Fit {
        /// Training data (delimited, label in the last column).
        train: PathBuf,
        /// Held-out data; errors are reported on it instead of the training set.
        #[arg(long)]
        test: Option<PathBuf>,
        /// Write the best expression as infix text to this file.
        #[arg(long)]
        save: Option<PathBuf>,
        #[command(flatten)]
        evolution: EvolutionArgs,
    },
    /// Run k-fold cross-validation and print per-fold and mean errors.
    Cv {
        /// Data file (delimited, label in the last column).
        data: PathBuf,
        /// Number of folds.
        #[arg(long, default_value_t = 5)]
        folds: usize,
        /// Shuffle rows before partitioning.
        #[arg(long)]
        shuffle: bool,
        #[command(flatten)]
        evolution: EvolutionArgs,
    },
    /// Evaluate a saved expression on a data file.
    Eval {
        /// Data file (delimited, label in the last column).
        data: PathBuf,
        /// File whose first line is an infix expression.
        expression: PathBuf,
        /// Field delimiter.
        #[arg(long, default_value_t = ',')]
        delimiter: char,
        /// Largest accepted expression, in nodes.
        #[arg(long, default_value_t = 10_000)]
        max_nodes: usize,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Algorithm {
    /// Plain trees with literal constants.
    Gp,
    /// Trees with a jointly evolved constant chromosome.
    Gap,
}

#[derive(Args, Debug, Clone)]
struct EvolutionArgs {
    #[arg(long, value_enum, default_value_t = Algorithm::Gap)]
    algorithm: Algorithm,
    #[arg(long, default_value_t = 100)]
    population_size: usize,
    /// Probability that a generated terminal is a variable.
    #[arg(long, default_value_t = 0.5)]
    prob_variable: f64,
    /// Capacity of an expression, in nodes.
    #[arg(long, default_value_t = 20)]
    max_depth: usize,
    #[arg(long, default_value_t = 10_000)]
    evaluations: usize,
    /// Fitness function; the other metrics are reported alongside.
    #[arg(long, default_value = "mse")]
    metric: Metric,
    #[arg(long, default_value_t = 0.8)]
    gp_crossover: f64,
    #[arg(long, default_value_t = 0.8)]
    ga_crossover: f64,
    #[arg(long, default_value_t = 0.1)]
    gp_mutation: f64,
    #[arg(long, default_value_t = 0.1)]
    ga_mutation: f64,
    #[arg(long, default_value_t = 0.5)]
    inter_niche: f64,
    #[arg(long, default_value_t = 3)]
    tournament_size: usize,
    #[arg(long, default_value_t = 0.3)]
    blx_alpha: f64,
    /// Field delimiter of the data files.
    #[arg(long, default_value_t = ',')]
    delimiter: char,
    /// Worker threads for evaluation (default: all cores).
    #[arg(long)]
    threads: Option<usize>,
    /// Random seed (default: drawn from the OS).
    #[arg(long)]
    seed: Option<u64>,
}

impl EvolutionArgs {
    /// Reporting order: the fitness metric first, then the others.
    fn metrics(&self) -> Vec<Metric> {
        std::iter::once(self.metric)
            .chain(Metric::ALL.into_iter().filter(|m| *m != self.metric))
            .collect()
    }

    fn parameters(&self, verbose: bool) -> Parameters {
        let metrics = self.metrics();
        let mut params = Parameters::new(self.evaluations, metrics[0].function())
            .with_gp_crossover_probability(self.gp_crossover)
            .with_ga_crossover_probability(self.ga_crossover)
            .with_gp_mutation_probability(self.gp_mutation)
            .with_ga_mutation_probability(self.ga_mutation)
            .with_inter_niche_crossover_probability(self.inter_niche)
            .with_tournament_size(self.tournament_size)
            .with_blx_alpha(self.blx_alpha)
            .with_verbose(verbose);
        for m in &metrics[1..] {
            params = params.with_error_function(m.function());
        }
        params
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Commands::Fit {
            train,
            test,
            save,
            evolution,
        } => run_fit(&train, test.as_deref(), save.as_deref(), &evolution, cli.verbose),
        Commands::Cv {
            data,
            folds,
            shuffle,
            evolution,
        } => run_cv(&data, folds, shuffle, &evolution, cli.verbose),
        Commands::Eval {
            data,
            expression,
            delimiter,
            max_nodes,
        } => run_eval(&data, &expression, delimiter, max_nodes),
    }
}

fn read_data(path: &Path, delimiter: char) -> Result<Dataset> {
    let data = Dataset::read_delimited(path, DEFAULT_COMMENT, delimiter)
        .with_context(|| format!("failed to read data from {}", path.display()))?;
    if data.is_empty() {
        bail!("{} contains no data rows", path.display());
    }
    Ok(data)
}

fn configure_threads(threads: Option<usize>) -> Result<()> {
    let Some(n) = threads else {
        return Ok(());
    };
    #[cfg(feature = "parallel")]
    {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .context("failed to configure the thread pool")?;
    }
    #[cfg(not(feature = "parallel"))]
    log::warn!("--threads {n} ignored: built without the `parallel` feature");
    Ok(())
}

fn format_errors(errors: &[f64]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\t")
}

fn header(metrics: &[Metric]) -> String {
    let names: Vec<&str> = metrics.iter().map(|m| m.name()).collect();
    format!("seed\t{}", names.join("\t"))
}

fn run_fit(
    train_path: &Path,
    test_path: Option<&Path>,
    save: Option<&Path>,
    args: &EvolutionArgs,
    verbose: bool,
) -> Result<()> {
    configure_threads(args.threads)?;
    let train = read_data(train_path, args.delimiter)?;
    let test = test_path
        .map(|p| read_data(p, args.delimiter))
        .transpose()?;
    let seed = args.seed.unwrap_or_else(rand::random);
    let params = args.parameters(verbose);

    let (expression, errors) = match args.algorithm {
        Algorithm::Gp => fit_one::<Expression>(train, test, args, &params, seed)?,
        Algorithm::Gap => fit_one::<GapExpression>(train, test, args, &params, seed)?,
    };

    println!("{}\texpression", header(&args.metrics()));
    println!("{seed}\t{}\t{expression}", format_errors(&errors));

    if let Some(path) = save {
        std::fs::write(path, format!("{expression}\n"))
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("saved best expression to {}", path.display());
    }
    Ok(())
}

/// Trains one algorithm; returns the best expression as infix text and its
/// errors (held-out when `test` is given).
fn fit_one<T: Breed>(
    train: Dataset,
    test: Option<Dataset>,
    args: &EvolutionArgs,
    params: &Parameters,
    seed: u64,
) -> Result<(String, Vec<f64>)> {
    let mut alg = PopulationAlgorithm::<T>::from_dataset(
        train.clone(),
        seed,
        args.population_size,
        args.max_depth,
        args.prob_variable,
    )
    .context("invalid algorithm settings")?;

    match test {
        Some(test) => {
            let cv = alg
                .fit_cv_files(&train, &test, params)
                .context("training failed")?;
            let errors = cv.errors.iter().map(|row| row[0]).collect();
            Ok((cv.best.to_string(), errors))
        }
        None => {
            let report = alg.fit(params).context("training failed")?;
            let predicted = alg.predict_all(&train.features);
            let errors = params
                .reporting_functions()
                .iter()
                .map(|f| f(&predicted, &train.labels))
                .collect();
            Ok((report.best.to_string(), errors))
        }
    }
}

fn run_cv(
    data_path: &Path,
    folds: usize,
    shuffle: bool,
    args: &EvolutionArgs,
    verbose: bool,
) -> Result<()> {
    configure_threads(args.threads)?;
    let mut data = read_data(data_path, args.delimiter)?;
    let seed = args.seed.unwrap_or_else(rand::random);
    if shuffle {
        data = data.shuffled(&mut create_rng(seed));
    }
    let params = args.parameters(verbose);

    let (best, errors, mean) = match args.algorithm {
        Algorithm::Gp => cv_one::<Expression>(data, folds, args, &params, seed)?,
        Algorithm::Gap => cv_one::<GapExpression>(data, folds, args, &params, seed)?,
    };

    println!("{}\tfold", header(&args.metrics()));
    for fold in 0..errors.first().map_or(0, Vec::len) {
        let row: Vec<f64> = errors.iter().map(|r| r[fold]).collect();
        println!("{seed}\t{}\t{fold}", format_errors(&row));
    }
    println!("{seed}\t{}\tmean", format_errors(&mean));
    println!("best\t{best}");
    Ok(())
}

type CvSummary = (String, Vec<Vec<f64>>, Vec<f64>);

fn cv_one<T: Breed>(
    data: Dataset,
    folds: usize,
    args: &EvolutionArgs,
    params: &Parameters,
    seed: u64,
) -> Result<CvSummary> {
    let mut alg = PopulationAlgorithm::<T>::from_dataset(
        data,
        seed,
        args.population_size,
        args.max_depth,
        args.prob_variable,
    )
    .context("invalid algorithm settings")?;
    let cv = alg
        .perform_k_cross_validation(folds, params)
        .context("cross-validation failed")?;
    let mean = cv.mean_errors();
    Ok((cv.best.to_string(), cv.errors, mean))
}

fn run_eval(data_path: &Path, expression_path: &Path, delimiter: char, max_nodes: usize) -> Result<()> {
    let data = read_data(data_path, delimiter)?;
    let mut expression = Expression::load(expression_path, max_nodes, data.num_variables())
        .with_context(|| format!("failed to load expression from {}", expression_path.display()))?;

    for metric in Metric::ALL {
        let error = expression.evaluate_expression(&data.features, &data.labels, metric.function(), true);
        println!("{metric}\t{error}");
    }
    println!("expression\t{expression}");
    Ok(())
}
