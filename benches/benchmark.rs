// Benchmarks for comment tree resolution and relevance projection
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use rand::prelude::*;
use rand::rngs::StdRng;
use storyrank_core::{
    Comment, CsrMatrix, IndexedSparseMatrix, RelevanceProjector, Story, TreeResolver,
    TruncatedSvd,
};

/// Threads of random shape: each comment replies to a story or to an earlier comment.
fn generate_threads(rng: &mut StdRng, stories: usize, comments: usize) -> (Vec<Story>, Vec<Comment>) {
    let story_ids: Vec<Story> = (0..stories as i64).map(|i| Story::new(10_000_000 + i)).collect();
    let comments = (1..=comments as i64)
        .map(|id| {
            let parent = if id == 1 || rng.random_bool(0.3) {
                story_ids[rng.random_range(0..story_ids.len())].id
            } else {
                rng.random_range((id - 50).max(1)..id)
            };
            Comment::new(id, format!("user{}", id % 997), parent)
        })
        .collect();
    (story_ids, comments)
}

fn generate_interactions(rng: &mut StdRng, users: usize, stories: usize, per_user: usize) -> IndexedSparseMatrix {
    let triplets: Vec<(usize, usize, f32)> = (0..users)
        .flat_map(|user| {
            (0..per_user)
                .map(|_| (user, rng.random_range(0..stories), 1.0f32))
                .collect::<Vec<_>>()
        })
        .collect();
    let matrix = CsrMatrix::from_triplets(users, stories, triplets).unwrap();
    IndexedSparseMatrix::new(
        matrix,
        (0..users).map(|u| format!("user{}", u)).collect(),
        (0..stories as i64).collect(),
    )
    .unwrap()
}

fn benchmark_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    let mut rng = StdRng::seed_from_u64(42);

    for size in [1_000, 10_000, 100_000].iter() {
        let (stories, comments) = generate_threads(&mut rng, size / 20, *size);
        let resolver = TreeResolver::default();
        group.bench_with_input(BenchmarkId::new("comments", size), size, |b, _| {
            b.iter(|| {
                let resolution = resolver.resolve(black_box(&stories), black_box(&comments));
                black_box(resolution);
            });
        });
    }

    group.finish();
}

fn benchmark_project(c: &mut Criterion) {
    let mut group = c.benchmark_group("project");
    let mut rng = StdRng::seed_from_u64(7);

    for users in [1_000, 10_000].iter() {
        let interactions = generate_interactions(&mut rng, *users, 5_000, 20);
        let components =
            Array2::from_shape_fn((16, 5_000), |_| rng.random_range(-0.1f32..0.1f32));
        let model = TruncatedSvd::new(components).unwrap();
        let projector = RelevanceProjector::default();

        group.bench_with_input(BenchmarkId::new("users", users), users, |b, _| {
            b.iter(|| {
                let projection = projector
                    .project_model(model.clone(), black_box(&interactions))
                    .unwrap();
                black_box(projection);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_resolve, benchmark_project);
criterion_main!(benches);
