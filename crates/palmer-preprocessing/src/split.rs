use palmer_core::{PipelineError, PipelineResult, Table};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Number of rows assigned to the train partition: `floor(n * train_fraction)`.
pub fn train_size(n: usize, train_fraction: f64) -> usize {
    (n as f64 * train_fraction).floor() as usize
}

fn check_fraction(train_fraction: f64) -> PipelineResult<()> {
    if !(train_fraction > 0.0 && train_fraction < 1.0) {
        return Err(PipelineError::invalid_config(
            "train_fraction",
            format!("{} is outside (0, 1)", train_fraction),
        ));
    }
    Ok(())
}

/// Shuffle `0..n` with `rng` and cut it into train and test positions.
///
/// Both partitions must be non-empty.
pub fn split_indices_with<R: Rng + ?Sized>(
    n: usize,
    train_fraction: f64,
    rng: &mut R,
) -> PipelineResult<(Vec<usize>, Vec<usize>)> {
    check_fraction(train_fraction)?;
    if n == 0 {
        return Err(PipelineError::empty("nothing to split"));
    }
    let n_train = train_size(n, train_fraction);
    if n_train == 0 || n_train == n {
        return Err(PipelineError::invalid_config(
            "train_fraction",
            format!("{} of {} rows leaves an empty partition", train_fraction, n),
        ));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    let test = indices.split_off(n_train);
    Ok((indices, test))
}

/// Seeded variant of [`split_indices_with`].
pub fn split_indices(n: usize, train_fraction: f64, seed: u64) -> PipelineResult<(Vec<usize>, Vec<usize>)> {
    let mut rng = StdRng::seed_from_u64(seed);
    split_indices_with(n, train_fraction, &mut rng)
}

/// Split table rows into disjoint train and test tables.
///
/// Same input, fraction and seed always produce the same partition.
pub fn train_test_split(table: &Table, train_fraction: f64, seed: u64) -> PipelineResult<(Table, Table)> {
    let (train_idx, test_idx) = split_indices(table.n_rows(), train_fraction, seed)?;
    debug!(train = train_idx.len(), test = test_idx.len(), seed, "partitioned rows");
    Ok((table.select_rows(&train_idx)?, table.select_rows(&test_idx)?))
}
