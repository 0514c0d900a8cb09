use proptest::prelude::*;
use qerase_core::overwrite::{DestroyOutcome, OverwriteExecutor};
use qerase_core::progress::{BatchProgress, CancelToken};
use qerase_core::standard::{PassSpec, Standard};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::path::Path;
use std::time::Duration;

fn write_random(path: &Path, bytes: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<u8> = (0..bytes).map(|_| rng.gen()).collect();
    std::fs::write(path, data).unwrap();
}

fn progress_for(size: u64, passes: usize) -> BatchProgress {
    BatchProgress::new(size * passes as u64, Duration::ZERO)
}

#[test]
fn destroy_writes_every_pass_and_unlinks() {
    let td = tempfile::tempdir().unwrap();
    let f = td.path().join("secret.bin");
    write_random(&f, 10_000, 7);

    let passes = Standard::DoD7PassECE.passes();
    let cancel = CancelToken::new();
    let mut rng = StdRng::seed_from_u64(3);
    let mut exec = OverwriteExecutor::new(4096, false, &cancel, &mut rng);
    let mut progress = progress_for(10_000, passes.len());
    let mut seen = vec![];
    let out = exec.destroy(&f, &passes, &mut progress, &mut |p| seen.push(p)).unwrap();

    assert_eq!(out, DestroyOutcome::Destroyed { bytes_written: 70_000 });
    assert!(!f.exists());
    assert_eq!(progress.bytes_done(), 70_000);
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn last_fixed_pass_is_what_remains() {
    let td = tempfile::tempdir().unwrap();
    let f = td.path().join("a.bin");
    // not a multiple of the chunk size
    write_random(&f, 4096 + 1234, 9);

    let cancel = CancelToken::new();
    let mut rng = StdRng::seed_from_u64(4);
    let mut exec = OverwriteExecutor::new(4096, true, &cancel, &mut rng);
    let passes = [PassSpec::Random, PassSpec::Fixed(0x5C)];
    let mut progress = progress_for(5330, passes.len());
    let out = exec.overwrite(&f, &passes, &mut progress, &mut |_| {}).unwrap();

    assert_eq!(out.bytes_written(), 2 * 5330);
    let data = std::fs::read(&f).unwrap();
    assert_eq!(data.len(), 5330);
    assert!(data.iter().all(|&b| b == 0x5C));
}

#[test]
fn empty_file_is_still_deleted() {
    let td = tempfile::tempdir().unwrap();
    let f = td.path().join("empty");
    std::fs::write(&f, b"").unwrap();

    let cancel = CancelToken::new();
    let mut rng = StdRng::seed_from_u64(5);
    let mut exec = OverwriteExecutor::new(65536, false, &cancel, &mut rng);
    let passes = Standard::Gutmann35Pass.passes();
    let mut progress = progress_for(0, passes.len());
    let out = exec.destroy(&f, &passes, &mut progress, &mut |_| {}).unwrap();

    assert_eq!(out, DestroyOutcome::Destroyed { bytes_written: 0 });
    assert!(!f.exists());
}

#[test]
fn cancelled_before_start_leaves_file_alone() {
    let td = tempfile::tempdir().unwrap();
    let f = td.path().join("keep.txt");
    std::fs::write(&f, b"hello world").unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();
    let mut rng = StdRng::seed_from_u64(6);
    let mut exec = OverwriteExecutor::new(4, false, &cancel, &mut rng);
    let mut progress = progress_for(11, 1);
    let out = exec.destroy(&f, &[PassSpec::Fixed(0)], &mut progress, &mut |_| {}).unwrap();

    assert_eq!(out, DestroyOutcome::Cancelled { bytes_written: 0 });
    assert_eq!(std::fs::read(&f).unwrap(), b"hello world");
}

#[test]
fn cancel_mid_pass_stops_at_next_chunk() {
    let td = tempfile::tempdir().unwrap();
    let f = td.path().join("big.bin");
    write_random(&f, 64 * 1024, 11);

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    let mut rng = StdRng::seed_from_u64(8);
    let mut exec = OverwriteExecutor::new(1024, false, &cancel, &mut rng);
    let mut progress = progress_for(64 * 1024, 1);
    let out = exec
        .destroy(&f, &[PassSpec::Fixed(0)], &mut progress, &mut |_| trigger.cancel())
        .unwrap();

    // the first chunk reports, the next poll sees the flag
    assert_eq!(out, DestroyOutcome::Cancelled { bytes_written: 1024 });
    assert!(f.exists());
}

#[test]
fn missing_file_is_an_overwrite_error() {
    let td = tempfile::tempdir().unwrap();
    let cancel = CancelToken::new();
    let mut rng = StdRng::seed_from_u64(1);
    let mut exec = OverwriteExecutor::new(1024, false, &cancel, &mut rng);
    let mut progress = progress_for(1, 1);
    let err = exec
        .destroy(&td.path().join("nope"), &[PassSpec::Fixed(0)], &mut progress, &mut |_| {})
        .unwrap_err();
    assert!(matches!(err, qerase_core::EraseError::Overwrite { .. }));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn bytes_written_is_passes_times_size(size in 0usize..20_000, chunk in 1usize..5_000, passes in 1usize..4) {
        let td = tempfile::tempdir().unwrap();
        let f = td.path().join("p.bin");
        write_random(&f, size, size as u64);

        let cancel = CancelToken::new();
        let mut rng = StdRng::seed_from_u64(chunk as u64);
        let mut exec = OverwriteExecutor::new(chunk, false, &cancel, &mut rng);
        let plan = vec![PassSpec::Random; passes];
        let mut progress = progress_for(size as u64, passes);
        let out = exec.overwrite(&f, &plan, &mut progress, &mut |_| {}).unwrap();

        prop_assert_eq!(out.bytes_written(), (size * passes) as u64);
        prop_assert_eq!(std::fs::metadata(&f).unwrap().len(), size as u64);
    }
}
