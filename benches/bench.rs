use criterion::{criterion_group, criterion_main, Criterion};

use double_array_trie::value::BigEndianIntegerCodec;
use double_array_trie::Trie;

/// A few thousand short ASCII keys, sorted, with no duplicates.
fn keys(count: u32) -> Vec<(Vec<u8>, u32)> {
	(0..count).map(|i| (format!("key-{:08}", i).into_bytes(), i)).collect()
}

fn bench_build(c: &mut Criterion) {
	let elements = keys(10_000);

	c.bench_function("build 10k keys, default density", |b| {
		b.iter(|| {
			Trie::builder().elements(elements.clone()).build().unwrap();
		});
	});

	c.bench_function("build 10k keys, density_factor 1", |b| {
		b.iter(|| {
			Trie::builder().elements(elements.clone()).density_factor(1).build().unwrap();
		});
	});
}

fn bench_find(c: &mut Criterion) {
	let elements = keys(10_000);
	let trie = Trie::builder().elements(elements).build().unwrap();

	c.bench_function("find present key", |b| {
		b.iter(|| trie.find(b"key-00005000").unwrap());
	});

	c.bench_function("find absent key", |b| {
		b.iter(|| trie.find(b"key-99999999").unwrap());
	});
}

fn bench_iterate(c: &mut Criterion) {
	let elements = keys(10_000);
	let trie = Trie::builder().elements(elements).build().unwrap();

	c.bench_function("iterate 10k keys", |b| {
		b.iter(|| {
			for entry in trie.iter() {
				entry.unwrap();
			}
		});
	});
}

fn bench_mmap_lookup(c: &mut Criterion) {
	let elements = keys(10_000);
	let trie = Trie::builder().elements(elements).build().unwrap();

	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("bench.trie");
	let mut file = std::fs::File::create(&path).unwrap();
	trie.save_to(&mut file, &BigEndianIntegerCodec).unwrap();
	drop(file);

	let mapped =
		Trie::<u32>::open_mmap(&path, BigEndianIntegerCodec, 1_000, 0).unwrap();

	c.bench_function("mmap find present key", |b| {
		b.iter(|| mapped.find(b"key-00005000").unwrap());
	});
}

criterion_group!(benches, bench_build, bench_find, bench_iterate, bench_mmap_lookup);
criterion_main!(benches);
