use layered_sketch::prelude::*;
use rand::{rngs::SmallRng, RngCore, SeedableRng};
use std::{collections::BTreeMap, error::Error};

fn mean(data: &[u64]) -> f64 {
    data.iter().sum::<u64>() as f64 / data.len() as f64
}
fn median(data: &[u64]) -> f64 {
    let n = data.len();
    if n % 2 == 0 {
        (data[n / 2 - 1] + data[n / 2]) as f64 / 2.0
    } else {
        data[n / 2] as f64
    }
}
fn stddev(data: &[u64]) -> f64 {
    let m = mean(data);
    let sum = data.iter().map(|x| (*x as f64 - m).powi(2)).sum::<f64>();
    (sum / data.len() as f64).sqrt()
}

#[derive(serde::Serialize)]
struct JsonResult {
    algorithm: String,
    expected: u64,
    mean: f64,
    stddev: f64,
    median: f64,
    min: u64,
    max: u64,
}

impl JsonResult {
    fn from(name: &str, expected: u64, mut counts: Vec<u64>) -> Self {
        counts.sort_unstable();
        Self {
            algorithm: name.to_string(),
            expected,
            mean: mean(&counts),
            stddev: stddev(&counts),
            median: median(&counts),
            min: counts[0],
            max: counts[counts.len() - 1],
        }
    }
}

#[derive(serde::Serialize)]
struct Output {
    counting: Vec<JsonResult>,
    decaying: Vec<JsonResult>,
}

/// Inserts keys with multiplicities `2^0 .. 2^max_log2` and collects the
/// estimates per true multiplicity
fn counting(n: usize, max_log2: u32, seed: u64) -> Result<Vec<JsonResult>, Box<dyn Error>> {
    let mut by_count: BTreeMap<u64, Vec<u64>> = BTreeMap::new();
    let mut rng = SmallRng::seed_from_u64(seed);
    for run in 0..n {
        let mut cbf: CountingLayerFilter =
            CountingLayerFilter::new(max_log2 as usize + 2, 20, 2, seed + run as u64)?;
        let keys: Vec<(u64, u64)> = (0..=max_log2)
            .flat_map(|log2| (0..64).map(move |_| 1_u64 << log2))
            .map(|count| (rng.next_u64(), count))
            .collect();
        for (key, count) in &keys {
            for _ in 0..*count {
                cbf.insert_hash(*key);
            }
        }
        for (key, count) in keys {
            by_count
                .entry(count)
                .or_default()
                .push(cbf.estimate_count(key));
        }
    }
    Ok(by_count
        .into_iter()
        .map(|(count, estimates)| JsonResult::from("CountingLayerFilter", count, estimates))
        .collect())
}

/// Feeds `distinct` keys into a decaying sketch and collects every layer's
/// estimate
fn decaying(n: usize, distinct: u64, layers: usize) -> Result<Vec<JsonResult>, Box<dyn Error>> {
    let mut per_layer = vec![Vec::with_capacity(n); layers];
    for run in 0..n {
        ThreadSeeded::reseed(run as u64);
        let mut sketch: DecayingLayerSketch = DecayingLayerSketch::new(layers, &12)?;
        for key in 0..distinct {
            sketch.insert(&(run, key));
        }
        for (layer, estimate) in per_layer.iter_mut().zip(sketch.estimates()) {
            layer.push(estimate);
        }
    }
    Ok(per_layer
        .into_iter()
        .enumerate()
        .map(|(depth, estimates)| {
            // layer 0 sees everything, layer i needs i + 1 trailing ones
            let expected = if depth == 0 { distinct } else { distinct >> (depth + 1) };
            JsonResult::from(&format!("DecayingLayerSketch[{depth}]"), expected, estimates)
        })
        .collect())
}

fn main() -> Result<(), Box<dyn Error>> {
    let n = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(16);

    let output = Output {
        counting: counting(n, 12, 1)?,
        decaying: decaying(n, 1_000_000, 6)?,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
