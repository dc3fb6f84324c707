use argh::FromArgs;
use std::{path::PathBuf, time::Duration};

use bandblur::{
    dist::{ClusterConfig, LocalCluster},
    image::ImageSize,
    imgproc::{
        filter::{FilterPreset, Kernel},
        parallel::DEFAULT_NUM_THREADS,
    },
    io::functional as F,
};

#[derive(FromArgs)]
/// Apply box blurs to a raw RGB image across a set of workers
struct Args {
    /// path to the input image: headerless RGB triplets, row-major
    #[argh(option, short = 'i')]
    input: PathBuf,

    /// path to write the filtered image to, in the same raw format
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,

    /// side length of the square input image
    #[argh(option, default = "2048")]
    side: usize,

    /// filter presets to apply in order, e.g. `box5` or `q,t` (q: 3x3, t: 5x5)
    #[argh(option, default = "String::from(\"box5\")")]
    filter: String,

    /// custom kernel weights, comma separated and row-major; replaces `--filter`
    #[argh(option)]
    kernel: Option<String>,

    /// bias added per kernel tap when using `--kernel`
    #[argh(option, default = "0.0")]
    bias: f32,

    /// number of workers, coordinator included
    #[argh(option, short = 'n', default = "1")]
    workers: usize,

    /// number of threads per worker
    #[argh(option, default = "DEFAULT_NUM_THREADS")]
    threads: usize,

    /// give up the gather after this many milliseconds without a band
    #[argh(option)]
    gather_timeout_ms: Option<u64>,
}

fn parse_kernel(weights: &str) -> Result<Kernel, Box<dyn std::error::Error>> {
    let weights = weights
        .split(',')
        .map(|w| w.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Kernel::from_weights(weights)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let source = F::read_image_rgb_raw(&args.input, ImageSize::square(args.side))?;
    log::info!("loaded {} from {}", source.size(), args.input.display());

    let mut config = ClusterConfig::new(args.workers).with_threads(args.threads);
    if let Some(ms) = args.gather_timeout_ms {
        config = config.with_gather_timeout(Duration::from_millis(ms));
    }

    let mut cluster = LocalCluster::new(source, config)?;

    if let Some(weights) = &args.kernel {
        let kernel = parse_kernel(weights)?;
        log::info!("start effect: custom {0}x{0} kernel", kernel.size());
        cluster.apply_filter(&kernel, args.bias)?;
    } else {
        let presets = args
            .filter
            .split(',')
            .map(|name| name.trim().parse::<FilterPreset>())
            .collect::<Result<Vec<_>, _>>()?;

        for preset in presets {
            log::info!("start effect: {preset}");
            cluster.apply_preset(preset)?;
        }
    }

    if let Some(output) = &args.output {
        F::write_image_rgb_raw(output, cluster.result())?;
        log::info!("wrote result to {}", output.display());
    }

    Ok(())
}
