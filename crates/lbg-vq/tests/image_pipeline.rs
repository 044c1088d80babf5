//! Image → blocks → codebook → indices → image, plus codebook persistence.

use lbg_vq::blocks::{codebook_mosaic, image_to_vectors, psnr, vectors_to_image, GrayImage};
use lbg_vq::persist::{load_codebook, load_vectors, save_codebook, write_vectors};
use lbg_vq::{Codebook, LbgTrainer, Quantizer, TrainConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Horizontal stripes of flat blocks alternating between two gray levels.
fn striped_image(width: usize, height: usize, block: usize) -> GrayImage {
    let pixels = (0..height)
        .flat_map(|y| (0..width).map(move |_| if (y / block) % 2 == 0 { 30 } else { 220 }))
        .collect();
    GrayImage::new(width, height, pixels).unwrap()
}

fn noisy_image(seed: u64, width: usize, height: usize) -> GrayImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let pixels = (0..width * height)
        .map(|i| {
            let base = ((i % width) * 255 / width) as i32;
            (base + rng.gen_range(-10..=10)).clamp(0, 255) as u8
        })
        .collect();
    GrayImage::new(width, height, pixels).unwrap()
}

#[test]
fn two_level_image_is_reconstructed_exactly() {
    let img = striped_image(16, 16, 4);
    let (store, grid) = image_to_vectors(&img, 4).unwrap();
    assert_eq!(store.len(), 16);
    assert_eq!(store.dimension(), 16);

    let codebook = LbgTrainer::new(TrainConfig::new(2, 1e-6, 20, 1.0))
        .unwrap()
        .train(&store)
        .unwrap();
    let q = Quantizer::new(codebook);

    let vectors: Vec<&[f64]> = store.iter().collect();
    let indices = q.encode_batch(&vectors).unwrap();
    let decoded = q.decode_batch(&indices).unwrap();
    let out = vectors_to_image(&grid, &decoded).unwrap();

    assert_eq!(out, img);
    assert_eq!(psnr(&img, &out).unwrap(), f64::INFINITY);
}

#[test]
fn larger_codebooks_reconstruct_better() {
    let img = noisy_image(3, 64, 64);
    let (store, grid) = image_to_vectors(&img, 4).unwrap();

    let mut scores = Vec::new();
    for target in [2, 16] {
        let codebook = LbgTrainer::new(TrainConfig::new(target, 1e-5, 30, 1.0))
            .unwrap()
            .train(&store)
            .unwrap();
        let q = Quantizer::new(codebook);
        let vectors: Vec<&[f64]> = store.iter().collect();
        let out = vectors_to_image(&grid, &q.reconstruct(&vectors).unwrap()).unwrap();
        scores.push(psnr(&img, &out).unwrap());
    }
    assert!(scores[1] > scores[0], "PSNR did not improve: {scores:?}");
}

#[test]
fn mosaic_has_one_tile_per_codeword() {
    let img = noisy_image(5, 32, 32);
    let (store, _) = image_to_vectors(&img, 4).unwrap();
    let codebook = LbgTrainer::new(TrainConfig::new(8, 1e-5, 20, 1.0))
        .unwrap()
        .train(&store)
        .unwrap();

    let mosaic = codebook_mosaic(&codebook, 4).unwrap();
    // 8 tiles → 3 columns × 3 rows of 4×4 blocks
    assert_eq!((mosaic.width(), mosaic.height()), (12, 12));
    assert!(codebook_mosaic(&codebook, 3).is_err());
}

#[test]
fn trained_codebook_survives_every_persistence_path() {
    let img = noisy_image(9, 32, 32);
    let (store, _) = image_to_vectors(&img, 4).unwrap();
    let codebook = LbgTrainer::new(TrainConfig::new(8, 1e-5, 20, 1.0))
        .unwrap()
        .train(&store)
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lbg_codebook_8.txt");
    save_codebook(&codebook, &path).unwrap();
    let from_text = load_codebook(&path).unwrap();
    assert_eq!(from_text, codebook);

    let json = serde_json::to_string(&codebook).expect("json serialization");
    let from_json: Codebook = serde_json::from_str(&json).expect("json deserialization");
    assert_eq!(from_json.size(), codebook.size());
    assert_eq!(from_json.dimension(), codebook.dimension());

    let bytes = bincode::serialize(&codebook).expect("bincode serialization");
    let from_bincode: Codebook = bincode::deserialize(&bytes).expect("bincode deserialization");
    assert_eq!(from_bincode, codebook);

    // Index identity is preserved: the loaded codebook encodes identically.
    let original = Quantizer::new(codebook);
    let reloaded = Quantizer::new(from_text);
    for v in store.iter() {
        assert_eq!(original.encode(v).unwrap(), reloaded.encode(v).unwrap());
    }
}

#[test]
fn vector_files_feed_training() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vectors.txt");
    let vectors = vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![10.0, 10.0], vec![10.0, 11.0]];
    write_vectors(&vectors, std::fs::File::create(&path).unwrap()).unwrap();

    let store = load_vectors(&path).unwrap();
    assert_eq!(store.len(), 4);
    let codebook = lbg_vq::train(&store, 2, 1e-6, 50, 0.5).unwrap();
    assert_eq!(codebook.size(), 2);
}
