use homsde_core::{Estimator, FastGenerator, State};
use homsde_models::{OuSine, Quadratic1d, TripleWell};
use homsde_spectral::{PotentialMeasure, SpectralConfig, SpectralSolver};
use nalgebra::DVector;
use clap::{Parser, ValueEnum};
use anyhow::Result;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Model {
    OuSine,
    Quadratic,
    TripleWell,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Estimate homogenized drift and diffusion at one slow state")]
struct Args {
    #[arg(long, value_enum, default_value_t = Model::OuSine)]
    model: Model,

    /// Slow state, comma separated
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, default_value = "0.5")]
    x: Vec<f64>,

    /// JSON solver configuration. Without one the degree-10 setup with the
    /// model's reference scaling is used; an empty `scaling` in the file
    /// also falls back to the reference scaling.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Hermite degree, overriding the default setup (nodes follow as 2·degree + 1)
    #[arg(long, conflicts_with = "config")]
    degree: Option<usize>,

    /// Nodes per dimension of the grid that integrates the triple-well measure
    #[arg(long, default_value_t = 100)]
    measure_nodes: usize,

    /// Spread of that grid around the origin
    #[arg(long, default_value_t = 0.5)]
    measure_spread: f64,
}

fn load_config<G: FastGenerator>(args: &Args, problem: &G) -> Result<SpectralConfig> {
    let n_fast = problem.fast_dim();
    let reference = vec![problem.reference_scaling(); n_fast];
    let config = match (&args.config, args.degree) {
        (Some(path), _) => {
            let config = SpectralConfig::load(path)?;
            if config.scaling.is_empty() {
                config.with_scaling(reference)
            } else {
                config
            }
        }
        (None, Some(degree)) => SpectralConfig::new(degree, 2 * degree + 1, n_fast).with_scaling(reference),
        (None, None) => SpectralConfig::sensible_for(problem),
    };
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let x = State::new(args.x.clone());
    info!(model = ?args.model, x = ?args.x, "estimating coefficients");

    let coeffs = match args.model {
        Model::OuSine => {
            let model = OuSine::standard();
            let config = load_config(&args, &model)?;
            let measure = model.invariant_measure()?;
            SpectralSolver::new(model, measure, config)?.estimate(&x)?
        }
        Model::Quadratic => {
            let model = Quadratic1d::new();
            let config = load_config(&args, &model)?;
            let measure = model.invariant_measure()?;
            SpectralSolver::new(model, measure, config)?.estimate(&x)?
        }
        Model::TripleWell => {
            let config = load_config(&args, &TripleWell::new())?;
            let measure = PotentialMeasure::new(
                TripleWell::new(),
                DVector::zeros(2),
                DVector::from_element(2, args.measure_spread),
                args.measure_nodes,
            )?;
            SpectralSolver::new(TripleWell::new(), measure, config)?.estimate(&x)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&coeffs)?);
    Ok(())
}
