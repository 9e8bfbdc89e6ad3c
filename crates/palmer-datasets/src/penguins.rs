use palmer_core::{PipelineError, PipelineResult, Table, Value};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

/// Column layout of the Palmer penguins table.
pub const PENGUIN_COLUMNS: [&str; 7] = [
    "species",
    "island",
    "bill_length_mm",
    "bill_depth_mm",
    "flipper_length_mm",
    "body_mass_g",
    "sex",
];

struct Profile {
    species: &'static str,
    islands: &'static [&'static str],
    /// (mean, std) for bill length, bill depth, flipper length, body mass.
    measures: [(f64, f64); 4],
}

const PROFILES: [Profile; 3] = [
    Profile {
        species: "Adelie",
        islands: &["Torgersen", "Biscoe", "Dream"],
        measures: [(38.8, 2.7), (18.3, 1.2), (190.0, 6.5), (3700.0, 460.0)],
    },
    Profile {
        species: "Chinstrap",
        islands: &["Dream"],
        measures: [(48.8, 3.3), (18.4, 1.1), (196.0, 7.1), (3733.0, 384.0)],
    },
    Profile {
        species: "Gentoo",
        islands: &["Biscoe"],
        measures: [(47.5, 3.1), (15.0, 1.0), (217.0, 6.5), (5076.0, 504.0)],
    },
];

/// How far males sit above (and females below) the species mean.
const SEX_SHIFT: [f64; 4] = [1.8, 0.7, 3.5, 300.0];

fn normal(rng: &mut StdRng) -> f64 {
    // Box-Muller
    let u1: f64 = rng.gen::<f64>().max(1e-10);
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn round_to(v: f64, step: f64) -> f64 {
    (v / step).round() * step
}

/// Generate a penguin-like table with the real schema.
///
/// Species cycle through Adelie, Chinstrap and Gentoo; sex alternates
/// randomly and shifts every measurement. `missing_rows` rows, placed at
/// random, have every measurement and the sex missing.
pub fn make_penguins(n: usize, missing_rows: usize, seed: u64) -> PipelineResult<Table> {
    if missing_rows > n {
        return Err(PipelineError::invalid_config(
            "missing_rows",
            format!("{} exceeds the {} generated rows", missing_rows, n),
        ));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let blanks: Vec<usize> = index::sample(&mut rng, n, missing_rows).into_vec();

    let mut rows = Vec::with_capacity(n);
    for i in 0..n {
        let profile = &PROFILES[i % PROFILES.len()];
        let island = profile.islands[rng.gen_range(0..profile.islands.len())];
        let male = rng.gen_bool(0.5);
        let sign = if male { 1.0 } else { -1.0 };

        let mut m = [0.0; 4];
        for (k, &(mean, std)) in profile.measures.iter().enumerate() {
            m[k] = mean + sign * SEX_SHIFT[k] + normal(&mut rng) * std * 0.6;
        }

        let mut row = vec![
            Value::Text(profile.species.to_string()),
            Value::Text(island.to_string()),
            Value::Number(round_to(m[0], 0.1)),
            Value::Number(round_to(m[1], 0.1)),
            Value::Number(m[2].round()),
            Value::Number(round_to(m[3], 25.0)),
            Value::Text(if male { "male" } else { "female" }.to_string()),
        ];
        if blanks.contains(&i) {
            for v in row.iter_mut().skip(2) {
                *v = Value::Missing;
            }
        }
        rows.push(row);
    }

    Table::new(PENGUIN_COLUMNS.iter().map(|c| c.to_string()).collect(), rows)
}
