//! End-to-end tests of sequential and parallel tile sweeps, using an
//! instrumented image that records every fetch, acquire and release.

use rastile_core::{GridImage, PixelRect, Result, Roi, Tile, TileGrid, TileMut, TileSink, TileSource};
use rastile_engine::{Collector, TileExecutor};
use std::collections::HashMap;
use std::sync::Mutex;

/// Wraps a [`GridImage`] and counts tile accesses per coordinate.
struct CountingImage {
    inner: GridImage<f32>,
    fetches: Mutex<HashMap<(i32, i32), u32>>,
    acquires: Mutex<HashMap<(i32, i32), u32>>,
    releases: Mutex<HashMap<(i32, i32), u32>>,
}

impl CountingImage {
    fn new(width: u64, height: u64, tile: u32) -> Self {
        let grid = TileGrid::new(PixelRect::from_size(width, height), tile, tile).unwrap();
        Self {
            inner: GridImage::filled(grid, 1, 1.0).unwrap(),
            fetches: Mutex::new(HashMap::new()),
            acquires: Mutex::new(HashMap::new()),
            releases: Mutex::new(HashMap::new()),
        }
    }

    fn total_fetches(&self) -> u32 {
        self.fetches.lock().unwrap().values().sum()
    }

    fn fetched_tiles(&self) -> Vec<(i32, i32)> {
        let mut tiles: Vec<_> = self.fetches.lock().unwrap().keys().copied().collect();
        tiles.sort();
        tiles
    }

    fn release_counts(&self) -> HashMap<(i32, i32), u32> {
        self.releases.lock().unwrap().clone()
    }

    fn acquire_counts(&self) -> HashMap<(i32, i32), u32> {
        self.acquires.lock().unwrap().clone()
    }
}

fn bump(map: &Mutex<HashMap<(i32, i32), u32>>, tx: i32, ty: i32) {
    *map.lock().unwrap().entry((tx, ty)).or_insert(0) += 1;
}

impl TileSource for CountingImage {
    type Tile<'a>
        = Tile<'a, f32>
    where
        Self: 'a;

    fn grid(&self) -> &TileGrid {
        self.inner.grid()
    }

    fn tile(&self, tx: i32, ty: i32) -> Result<Self::Tile<'_>> {
        bump(&self.fetches, tx, ty);
        self.inner.tile(tx, ty)
    }
}

impl TileSink for CountingImage {
    type TileMut<'a>
        = TileMut<'a, f32>
    where
        Self: 'a;

    fn acquire_tile(&self, tx: i32, ty: i32) -> Result<Self::TileMut<'_>> {
        bump(&self.acquires, tx, ty);
        self.inner.acquire_tile(tx, ty)
    }

    fn release_tile(&self, tx: i32, ty: i32) {
        bump(&self.releases, tx, ty);
        self.inner.release_tile(tx, ty);
    }
}

fn executor(img: &CountingImage, roi: Roi) -> TileExecutor {
    TileExecutor::new(img.grid(), roi).unwrap()
}

/// Counts callback invocations per tile, keyed by tile rect origin.
fn visit_collector() -> Collector<
    impl Fn() -> Vec<(i64, i64)> + Sync,
    impl for<'t> Fn(&mut Vec<(i64, i64)>, Tile<'t, f32>) -> rastile_engine::TileOpResult + Sync,
    impl Fn(Vec<(i64, i64)>, Vec<(i64, i64)>) -> Vec<(i64, i64)> + Sync,
    impl FnOnce(Vec<(i64, i64)>) -> Vec<(i64, i64)>,
> {
    Collector::new(
        Vec::new,
        |seen: &mut Vec<(i64, i64)>, tile: Tile<'_, f32>| {
            seen.push((tile.rect().x, tile.rect().y));
            Ok(())
        },
        |mut a: Vec<(i64, i64)>, b| {
            a.extend(b);
            a
        },
        |mut a: Vec<(i64, i64)>| {
            a.sort();
            a
        },
    )
}

#[test]
fn roi_outside_image_visits_no_tile() {
    let img = CountingImage::new(100, 60, 32);
    let roi = Roi::Region(PixelRect::new(1000, 1000, 50, 50));

    let exec = executor(&img, roi);
    assert_eq!(exec.tile_count(), 0);
    exec.read_from(&img, |_| Err("never called".into())).unwrap();
    exec.parallel_read_from(&img, |_| Err("never called".into()))
        .unwrap();
    exec.parallel_write_to(&img, |_| Err("never called".into()))
        .unwrap();
    assert_eq!(img.total_fetches(), 0);
    assert!(img.acquire_counts().is_empty());
}

#[test]
fn empty_range_finisher_receives_supplier_value() {
    let img = CountingImage::new(100, 60, 32);
    let exec = executor(&img, Roi::Region(PixelRect::new(-500, -500, 10, 10)));
    let result = exec
        .execute_on_readable(
            &img,
            Collector::new(
                || 42u32,
                |_: &mut u32, _tile: Tile<'_, f32>| Ok(()),
                |a, b| a + b,
                |a| a,
            ),
            None,
        )
        .unwrap();
    assert_eq!(result, 42);
}

#[test]
fn sequential_and_parallel_reads_visit_same_tiles() {
    let img = CountingImage::new(257, 129, 32);
    let exec = executor(&img, Roi::Full);

    let sequential = {
        let seen = Mutex::new(Vec::new());
        exec.read_from(&img, |tile: Tile<'_, f32>| {
            seen.lock().unwrap().push((tile.rect().x, tile.rect().y));
            Ok(())
        })
        .unwrap();
        let mut seen = seen.into_inner().unwrap();
        seen.sort();
        seen
    };

    let parallel = exec
        .execute_on_readable(&img, visit_collector(), None)
        .unwrap();

    assert_eq!(sequential.len() as u64, exec.tile_count());
    assert_eq!(sequential, parallel);

    // Both sweeps together fetched each tile exactly twice.
    for (_, count) in img.fetches.lock().unwrap().iter() {
        assert_eq!(*count, 2);
    }
}

#[test]
fn parallel_read_is_idempotent() {
    let img = CountingImage::new(300, 300, 64);
    let exec = executor(&img, Roi::Full);
    let first = exec
        .execute_on_readable(&img, visit_collector(), None)
        .unwrap();
    let second = exec
        .execute_on_readable(&img, visit_collector(), None)
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn write_failure_still_releases_every_tile_once() {
    let img = CountingImage::new(64, 64, 32);
    let exec = executor(&img, Roi::Full);

    let err = exec
        .parallel_write_to(&img, |_| Err("refused".into()))
        .unwrap_err();

    assert_eq!(err.failure_count(), 4);
    assert!(!img.inner.has_tile_writers());
    let acquires = img.acquire_counts();
    let releases = img.release_counts();
    assert_eq!(acquires.len(), 4);
    assert_eq!(releases, acquires);
    for count in releases.values() {
        assert_eq!(*count, 1);
    }
}

#[test]
fn write_failure_on_one_tile_keeps_other_contributions() {
    let img = CountingImage::new(64, 64, 32);
    let exec = executor(&img, Roi::Full);

    let err = exec
        .execute_on_writable(
            &img,
            Collector::new(
                Vec::new,
                |done: &mut Vec<(i64, i64)>, mut tile: TileMut<'_, f32>| {
                    let origin = (tile.rect().x, tile.rect().y);
                    if origin == (32, 32) {
                        return Err("bad tile".into());
                    }
                    tile.fill(2.0);
                    done.push(origin);
                    Ok(())
                },
                |mut a: Vec<(i64, i64)>, b| {
                    a.extend(b);
                    a
                },
                |mut a: Vec<(i64, i64)>| {
                    a.sort();
                    a
                },
            ),
            None,
        )
        .unwrap_err();

    // The consolidated error identifies (1, 1) as primary, every tile was
    // visited, and the three successful tiles were updated.
    assert_eq!(err.primary().tile(), (1, 1));
    assert_eq!(err.failure_count(), 1);
    assert_eq!(img.acquire_counts().len(), 4);
    assert_eq!(img.inner.tile(0, 0).unwrap().sample(0, 0, 0), 2.0);
    assert_eq!(img.inner.tile(1, 1).unwrap().sample(32, 32, 0), 1.0);
}

#[test]
fn write_handler_mode_returns_partial_result() {
    let img = CountingImage::new(64, 64, 32);
    let exec = executor(&img, Roi::Full);

    let mut handled = Vec::new();
    let done = exec
        .execute_on_writable(
            &img,
            Collector::new(
                || 0u32,
                |done: &mut u32, tile: TileMut<'_, f32>| {
                    if (tile.rect().x, tile.rect().y) == (32, 32) {
                        return Err("bad tile".into());
                    }
                    *done += 1;
                    Ok(())
                },
                |a, b| a + b,
                |a| a,
            ),
            Some(&mut |err| handled.push(err)),
        )
        .unwrap();

    assert_eq!(done, 3);
    assert_eq!(handled.len(), 1);
    assert_eq!(handled[0].primary().tile(), (1, 1));
    assert_eq!(handled[0].to_string(), "cannot update tile (1, 1)");
}

#[test]
fn sequential_read_stops_at_first_tile_failure() {
    let img = CountingImage::new(64, 64, 32);
    let exec = executor(&img, Roi::Full);

    let err = exec
        .read_from(&img, |_| Err("unreadable".into()))
        .unwrap_err();

    assert_eq!(err.primary().tile(), (0, 0));
    // Row-major order visits (0, 0) first; the others are never fetched.
    assert_eq!(img.fetched_tiles(), vec![(0, 0)]);
}

#[test]
fn stop_on_error_halts_claims_after_first_failure() {
    let img = CountingImage::new(256, 256, 32);
    // Cap of zero: the calling thread is the only worker, so the claim
    // sequence is deterministic.
    let exec = executor(&img, Roi::Full).with_parallelism(0);

    let err = exec
        .execute_on_readable(
            &img,
            Collector::new(
                || (),
                |_: &mut (), _tile: Tile<'_, f32>| Err("unreadable".into()),
                |_, _| (),
                |_| (),
            ),
            None,
        )
        .unwrap_err();

    assert_eq!(err.primary().tile(), (0, 0));
    assert_eq!(img.total_fetches(), 1);
}

#[test]
fn single_tile_roi_degrades_to_sequential() {
    let img = CountingImage::new(256, 256, 64);
    let roi = Roi::Region(PixelRect::new(70, 70, 10, 10));
    let exec = executor(&img, roi);
    assert!(!exec.is_multi_tiled());
    assert_eq!(exec.tile_count(), 1);

    let caller = std::thread::current().id();
    let threads = Mutex::new(Vec::new());
    exec.parallel_read_from(&img, |_tile: Tile<'_, f32>| {
        threads.lock().unwrap().push(std::thread::current().id());
        Ok(())
    })
    .unwrap();
    exec.parallel_write_to(&img, |_tile: TileMut<'_, f32>| {
        threads.lock().unwrap().push(std::thread::current().id());
        Ok(())
    })
    .unwrap();

    let threads = threads.into_inner().unwrap();
    assert_eq!(threads.len(), 2);
    assert!(threads.iter().all(|id| *id == caller));
    assert_eq!(img.total_fetches(), 1);
}

#[test]
fn parallel_write_reaches_every_tile() {
    let img = CountingImage::new(500, 300, 64);
    let exec = executor(&img, Roi::Full);

    exec.parallel_write_to(&img, |mut tile: TileMut<'_, f32>| {
        let r = *tile.rect();
        for y in r.y..r.bottom() {
            for x in r.x..r.right() {
                tile.set_sample(x, y, 0, (x + y) as f32);
            }
        }
        Ok(())
    })
    .unwrap();

    assert!(!img.inner.has_tile_writers());
    assert_eq!(img.inner.tile(0, 0).unwrap().sample(0, 0, 0), 0.0);
    assert_eq!(img.inner.tile(7, 4).unwrap().sample(499, 299, 0), 798.0);
}

#[test]
fn combiner_associativity_over_partitions() {
    // For an associative, order-tolerant combiner, combining per-group
    // reductions equals combining per-tile accumulators individually.
    let per_tile: Vec<u64> = (1..=12).collect();
    let combine = |a: u64, b: u64| a + b;

    let individually = per_tile.iter().copied().reduce(combine).unwrap();

    for split in 1..per_tile.len() {
        let (left, right) = per_tile.split_at(split);
        let grouped = combine(
            left.iter().copied().reduce(combine).unwrap(),
            right.iter().copied().reduce(combine).unwrap(),
        );
        assert_eq!(grouped, individually);
    }
}

#[test]
fn reduction_matches_sequential_reference() {
    let img = CountingImage::new(257, 129, 32);
    {
        let exec = executor(&img, Roi::Full);
        exec.parallel_write_to(&img, |mut tile: TileMut<'_, f32>| {
            let r = *tile.rect();
            for y in r.y..r.bottom() {
                for x in r.x..r.right() {
                    tile.set_sample(x, y, 0, (x * 7 + y) as f32);
                }
            }
            Ok(())
        })
        .unwrap();
    }

    let sum_collector = || {
        Collector::new(
            || 0.0f64,
            |sum: &mut f64, tile: Tile<'_, f32>| {
                let r = *tile.rect();
                for y in r.y..r.bottom() {
                    for x in r.x..r.right() {
                        *sum += tile.sample(x, y, 0) as f64;
                    }
                }
                Ok(())
            },
            |a, b| a + b,
            |a| a,
        )
    };

    let exec = executor(&img, Roi::Full);
    let parallel = exec
        .execute_on_readable(&img, sum_collector(), None)
        .unwrap();
    let inline = exec
        .with_parallelism(0)
        .execute_on_readable(&img, sum_collector(), None)
        .unwrap();
    assert_eq!(parallel, inline);
}
