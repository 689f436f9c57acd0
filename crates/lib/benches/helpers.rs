//! Shared helpers for benchmark tests

use rand::{Rng, SeedableRng, rngs::StdRng};
use viewsync::{Store, Table, view::SortBy};

/// Deterministic generator so runs are comparable across machines.
pub fn rng() -> StdRng {
    StdRng::seed_from_u64(0x5eed)
}

/// `count` distinct values in random order.
pub fn random_values(rng: &mut StdRng, count: usize) -> Vec<i64> {
    let mut values: Vec<i64> = (0..count as i64).map(|v| v * 7).collect();
    for i in (1..values.len()).rev() {
        let j = rng.gen_range(0..=i);
        values.swap(i, j);
    }
    values
}

/// Random `/` separated paths with up to `depth` segments drawn from
/// `fanout` names per level.
pub fn random_paths(rng: &mut StdRng, count: usize, depth: usize, fanout: u32) -> Vec<String> {
    (0..count)
        .map(|i| {
            let levels = rng.gen_range(1..=depth);
            let mut path: Vec<String> = (1..levels)
                .map(|_| format!("d{}", rng.gen_range(0..fanout)))
                .collect();
            path.push(format!("f{i}"));
            path.join("/")
        })
        .collect()
}

/// A sorted table pre-populated with `count` values.
pub fn sorted_table(count: usize) -> Table<i64> {
    let mut rng = rng();
    let mut table = Table::new().expect("Failed to create table");
    table
        .sort_by(Some(SortBy::natural()))
        .expect("Failed to set sort");
    table
        .assign(random_values(&mut rng, count))
        .expect("Failed to populate table");
    table
}

/// A store pre-populated with `count` values.
pub fn filled_store(count: usize) -> Store<i64> {
    let mut rng = rng();
    let mut store = Store::new();
    store
        .assign(random_values(&mut rng, count))
        .expect("Failed to populate store");
    store
}
