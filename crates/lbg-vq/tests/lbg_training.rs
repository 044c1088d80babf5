//! End-to-end training properties: size growth, distortion behaviour,
//! determinism and encode/assign consistency.

use lbg_vq::{
    train, CancelToken, IterationStats, LbgTrainer, Quantizer, TrainConfig, TrainObserver,
    VectorStore, VqError,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ─────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────

/// `per_cluster` points scattered around each of `centers`.
fn clustered_store(seed: u64, centers: &[Vec<f64>], per_cluster: usize, spread: f64) -> VectorStore {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut vectors = Vec::with_capacity(centers.len() * per_cluster);
    for _ in 0..per_cluster {
        for c in centers {
            vectors.push(c.iter().map(|x| x + rng.gen_range(-spread..spread)).collect());
        }
    }
    VectorStore::new(vectors).unwrap()
}

fn random_store(seed: u64, n: usize, dim: usize) -> VectorStore {
    let mut rng = StdRng::seed_from_u64(seed);
    let vectors = (0..n)
        .map(|_| (0..dim).map(|_| rng.gen_range(0.0..255.0)).collect())
        .collect();
    VectorStore::new(vectors).unwrap()
}

fn bits(codebook: &lbg_vq::Codebook) -> Vec<Vec<u64>> {
    codebook
        .iter()
        .map(|c| c.iter().map(|x| x.to_bits()).collect())
        .collect()
}

#[derive(Default)]
struct IterationLog(Vec<IterationStats>);

impl TrainObserver for IterationLog {
    fn on_iteration(&mut self, stats: &IterationStats) {
        self.0.push(stats.clone());
    }
}

// ─────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────

#[test]
fn two_clusters_round_trip() {
    let store = VectorStore::new(vec![
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![10.0, 10.0],
        vec![10.0, 11.0],
    ])
    .unwrap();
    let codebook = train(&store, 2, 1e-6, 50, 0.5).unwrap();
    assert_eq!(codebook.size(), 2);

    let mut words: Vec<Vec<f64>> = codebook.iter().map(<[f64]>::to_vec).collect();
    words.sort_by(|a, b| a[0].total_cmp(&b[0]));
    for (word, expected) in words.iter().zip([[0.0, 0.5], [10.0, 10.5]]) {
        for (x, e) in word.iter().zip(expected) {
            assert!((x - e).abs() < 1e-9, "codeword {word:?} not near {expected:?}");
        }
    }

    let q = Quantizer::new(codebook);
    let low = q.encode(&[0.0, 0.0]).unwrap();
    assert_eq!(q.encode(&[0.0, 1.0]).unwrap(), low);
    let high = q.encode(&[10.0, 10.0]).unwrap();
    assert_eq!(q.encode(&[10.0, 11.0]).unwrap(), high);
    assert_ne!(low, high);
}

#[test]
fn empty_store_yields_empty_codebook() {
    let codebook = train(&VectorStore::empty(4), 8, 1e-5, 10, 1.0).unwrap();
    assert_eq!(codebook.size(), 0);
    assert!(codebook.is_empty());

    let from_new = train(&VectorStore::new(Vec::new()).unwrap(), 8, 1e-5, 10, 1.0).unwrap();
    assert_eq!(from_new.size(), 0);
}

#[test]
fn single_target_is_global_mean_without_refinement() {
    let store = random_store(7, 101, 5);
    let trainer = LbgTrainer::new(TrainConfig::new(1, 1e-5, 10, 1.0)).unwrap();
    let mut log = IterationLog::default();
    let report = trainer.train_with(&store, &mut log, &CancelToken::new()).unwrap();

    assert_eq!(report.codebook.size(), 1);
    assert_eq!(report.codebook.get(0).unwrap(), store.centroid().unwrap().as_slice());
    assert!(log.0.is_empty(), "no Lloyd iterations expected");
    assert_eq!(report.levels.len(), 1);
    assert_eq!(report.levels[0].iterations, 0);
    assert!(report.assignments.iter().all(|&k| k == 0));
}

#[test]
fn encode_with_wrong_dimension_leaves_codebook_untouched() {
    let store = clustered_store(1, &[vec![0.0, 0.0], vec![5.0, 5.0]], 10, 0.5);
    let codebook = train(&store, 2, 1e-6, 20, 0.5).unwrap();
    let before = codebook.clone();

    let q = Quantizer::new(codebook);
    match q.encode(&[1.0, 2.0, 3.0]) {
        Err(VqError::DimensionMismatch { expected: 2, got: 3 }) => {}
        other => panic!("expected DimensionMismatch, got: {other:?}"),
    }
    assert_eq!(q.codebook(), &before);
}

// ─────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────

#[test]
fn every_codeword_has_store_dimension() {
    for (seed, dim, target) in [(11, 1, 4), (12, 3, 7), (13, 16, 32)] {
        let store = random_store(seed, 200, dim);
        let codebook = train(&store, target, 1e-4, 15, 1.0).unwrap();
        assert_eq!(codebook.dimension(), dim);
        assert_eq!(codebook.size(), target);
        assert!(codebook.iter().all(|c| c.len() == dim));
    }
}

#[test]
fn sizes_double_until_capped() {
    let store = random_store(21, 300, 4);
    let trainer = LbgTrainer::new(TrainConfig::new(13, 1e-4, 10, 1.0)).unwrap();
    let codebook = trainer.train(&store).unwrap();
    assert_eq!(codebook.size(), 13);

    let report = trainer
        .train_with(&store, &mut lbg_vq::NoopObserver, &CancelToken::new())
        .unwrap();
    let sizes: Vec<usize> = report.levels.iter().map(|l| l.size).collect();
    assert_eq!(sizes, vec![1, 2, 4, 8, 13]);
    for pair in sizes.windows(2) {
        assert_eq!(pair[1], (pair[0] * 2).min(13));
    }
}

#[test]
fn distortion_never_rises_within_a_level() {
    let store = clustered_store(
        31,
        &[vec![0.0, 0.0, 0.0], vec![50.0, 0.0, 20.0], vec![0.0, 80.0, 40.0]],
        60,
        15.0,
    );
    let trainer = LbgTrainer::new(TrainConfig::new(16, 1e-9, 40, 0.5)).unwrap();
    let mut log = IterationLog::default();
    trainer.train_with(&store, &mut log, &CancelToken::new()).unwrap();

    assert!(!log.0.is_empty());
    for pair in log.0.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.level_size != b.level_size {
            continue;
        }
        assert!(
            b.distortion <= a.distortion * (1.0 + 1e-9) + 1e-12,
            "level {} iteration {}: distortion rose {} -> {}",
            b.level_size,
            b.iteration,
            a.distortion,
            b.distortion
        );
    }
}

#[test]
fn distortion_improves_across_levels() {
    let store = random_store(41, 400, 4);
    let trainer = LbgTrainer::new(TrainConfig::new(32, 1e-6, 30, 1.0)).unwrap();
    let report = trainer
        .train_with(&store, &mut lbg_vq::NoopObserver, &CancelToken::new())
        .unwrap();
    let first = report.levels.first().unwrap().distortion;
    let last = report.levels.last().unwrap().distortion;
    assert!(last < first, "distortion {first} -> {last}");
    assert!(report.final_distortion <= last * (1.0 + 1e-12));
}

#[test]
fn training_is_bit_for_bit_deterministic() {
    let store = random_store(51, 250, 6);
    let config = TrainConfig::new(12, 1e-5, 25, 0.75);

    let a = LbgTrainer::new(config.clone()).unwrap().train(&store).unwrap();
    let b = LbgTrainer::new(config).unwrap().train(&store).unwrap();
    assert_eq!(bits(&a), bits(&b));

    // Non-power-of-two targets truncate the same way every time.
    let c = train(&store, 5, 1e-5, 25, 0.75).unwrap();
    let d = train(&store, 5, 1e-5, 25, 0.75).unwrap();
    assert_eq!(c.size(), 5);
    assert_eq!(bits(&c), bits(&d));
}

#[test]
fn symmetry_offset_training_is_deterministic() {
    let store = random_store(52, 120, 3);
    let config = TrainConfig { symmetry_offset: 0.1, ..TrainConfig::new(8, 1e-5, 20, 1.0) };
    let a = LbgTrainer::new(config.clone()).unwrap().train(&store).unwrap();
    let b = LbgTrainer::new(config).unwrap().train(&store).unwrap();
    assert_eq!(bits(&a), bits(&b));
    assert_eq!(a.size(), 8);
}

#[test]
fn encode_matches_final_assignments() {
    let store = clustered_store(61, &[vec![0.0; 4], vec![30.0; 4], vec![-30.0; 4]], 40, 8.0);
    let trainer = LbgTrainer::new(TrainConfig::new(6, 1e-6, 50, 1.0)).unwrap();
    let report = trainer
        .train_with(&store, &mut lbg_vq::NoopObserver, &CancelToken::new())
        .unwrap();

    let q = Quantizer::new(report.codebook.clone());
    let vectors: Vec<&[f64]> = store.iter().collect();
    assert_eq!(q.encode_batch(&vectors).unwrap(), report.assignments);
    let mean = q.mean_distortion(&store).unwrap();
    assert!((mean - report.final_distortion).abs() <= 1e-9 * mean.max(1.0));
}

#[test]
fn fewer_points_than_codewords_still_fills_target() {
    let store = VectorStore::new(vec![vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]]).unwrap();
    let codebook = train(&store, 8, 1e-6, 20, 0.5).unwrap();
    assert_eq!(codebook.size(), 8);

    // Every training point still has an exact representative.
    let q = Quantizer::new(codebook);
    for v in store.iter() {
        let (_, d) = q.encode_with_distance(v).unwrap();
        assert!(d < 1e-18, "point {v:?} quantized with error {d}");
    }
}

#[test]
fn cancellation_from_another_thread_returns_consistent_codebook() {
    let store = random_store(71, 1_000, 8);
    let trainer = LbgTrainer::new(TrainConfig::new(64, 1e-12, 100, 1.0)).unwrap();
    let cancel = CancelToken::new();

    let handle = {
        let cancel = cancel.clone();
        std::thread::spawn(move || cancel.cancel())
    };
    let report = trainer
        .train_with(&store, &mut lbg_vq::NoopObserver, &cancel)
        .unwrap();
    handle.join().unwrap();

    // Whether or not the flag landed before training finished, the result
    // is the codebook of a fully completed level.
    let last = report.levels.last().unwrap();
    assert_eq!(report.codebook.size(), last.size);
    assert!(report.codebook.size().is_power_of_two());
    assert_eq!(report.assignments.len(), store.len());
    if !report.cancelled {
        assert_eq!(report.codebook.size(), 64);
    }
}
