use std::fs;
use std::thread;
use std::time::{Duration, Instant};

use dirsizer::fs::{LocalDir, LocalOptions, MemDir, MemFile};
use dirsizer::{CancelToken, DirSizer, SizeError, Totals};
use tempfile::TempDir;

fn totals(total_size: u64, file_count: u64) -> Totals {
    Totals {
        total_size,
        file_count,
    }
}

fn size_of(workers: usize, root: MemDir) -> Totals {
    DirSizer::new(workers)
        .size(&CancelToken::new(), root)
        .expect("size")
}

#[test]
fn sizes_files_in_nested_and_empty_directories() {
    let root = MemDir::new("root")
        .with_file(MemFile::new("fileA", 10))
        .with_dir(MemDir::new("subdir1").with_file(MemFile::new("fileB", 5)))
        .with_dir(MemDir::new("subdir2"));

    assert_eq!(size_of(3, root), totals(15, 2));
}

#[test]
fn empty_root_yields_zero() {
    assert_eq!(size_of(1, MemDir::new("root")), totals(0, 0));
    assert_eq!(size_of(8, MemDir::new("root")), totals(0, 0));
}

#[test]
fn result_does_not_depend_on_worker_count() {
    let tree = MemDir::synthetic(4, 4, 3, 17);
    let expected = tree.expected_totals();
    assert_eq!(expected, totals(341 * 3 * 17, 341 * 3));

    assert_eq!(size_of(1, tree.clone()), expected);
    assert_eq!(size_of(8, tree.clone()), expected);
    // every directory is listed exactly once per run
    assert_eq!(tree.subtree_list_calls(), 2 * tree.subtree_dir_count());
}

#[test]
fn repeated_runs_agree() {
    let tree = MemDir::synthetic(3, 5, 2, 3)
        .with_dir(MemDir::new("jitter").with_list_delay(Duration::from_millis(3)))
        .with_file(MemFile::new("slow", 1000).with_stat_delay(Duration::from_millis(2)));
    let expected = tree.expected_totals();

    for workers in [2, 5, 8] {
        for _ in 0..5 {
            assert_eq!(size_of(workers, tree.clone()), expected);
        }
    }
}

#[test]
fn slow_branch_is_fully_counted() {
    let slow_subtree = MemDir::synthetic(2, 3, 1, 100);
    let slow = MemDir::new("slow")
        .with_list_delay(Duration::from_millis(150))
        .with_dir(slow_subtree.clone().with_list_delay(Duration::from_millis(50)));
    let mut root = MemDir::new("root").with_dir(slow);
    for index in 0..16 {
        root = root.with_dir(MemDir::new(format!("fast{index}")).with_file(MemFile::new("f", 1)));
    }

    let expected = root.expected_totals();
    assert_eq!(expected.file_count, 16 + slow_subtree.expected_totals().file_count);
    assert_eq!(size_of(8, root), expected);
}

#[test]
fn first_listing_error_wins_and_stops_the_pool() {
    let big = MemDir::synthetic(4, 5, 1, 1).with_subtree_list_delay(Duration::from_millis(2));
    let root = MemDir::new("root")
        .with_dir(big.clone())
        .with_dir(MemDir::new("bad1").failing_list("permission denied"))
        .with_dir(MemDir::new("bad2").failing_list("permission denied"));

    let failure = DirSizer::new(4)
        .size(&CancelToken::new(), root)
        .expect_err("listing failure");

    match &failure.error {
        SizeError::List(source) => {
            let message = source.to_string();
            assert!(message.starts_with("bad1") || message.starts_with("bad2"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(failure.error.is_filesystem());
    assert!(big.subtree_list_calls() < big.subtree_dir_count());
    assert!(failure.partial.file_count <= big.expected_totals().file_count);
}

#[test]
fn stat_failure_is_reported_as_stat_error() {
    let root = MemDir::new("root")
        .with_file(MemFile::new("ok", 5))
        .with_dir(MemDir::new("sub").with_file(MemFile::new("broken", 1).failing_stat("EIO")));

    let failure = DirSizer::new(2)
        .size(&CancelToken::new(), root)
        .expect_err("stat failure");
    assert!(matches!(failure.error, SizeError::Stat(_)));
    assert!(failure.partial.total_size <= 5);
}

#[test]
fn cancellation_returns_well_before_natural_completion() {
    // roughly 3900 directories at 5ms each: several seconds of work for 4 workers
    let tree = MemDir::synthetic(5, 5, 1, 1).with_subtree_list_delay(Duration::from_millis(5));
    let token = CancelToken::new();

    let canceller = {
        let token = token.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            token.cancel();
        })
    };

    let started = Instant::now();
    let failure = DirSizer::new(4)
        .size(&token, tree.clone())
        .expect_err("cancelled");
    let elapsed = started.elapsed();
    canceller.join().expect("canceller");

    assert!(matches!(failure.error, SizeError::Cancelled));
    assert!(failure.error.is_cancellation());
    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
    assert!(tree.subtree_list_calls() < tree.subtree_dir_count());
}

#[test]
fn deadline_is_reported_separately_from_cancellation() {
    let tree = MemDir::synthetic(5, 5, 1, 1).with_subtree_list_delay(Duration::from_millis(5));
    let token = CancelToken::with_timeout(Duration::from_millis(40));

    let failure = DirSizer::new(4)
        .size(&token, tree)
        .expect_err("deadline");
    assert!(matches!(failure.error, SizeError::DeadlineExceeded));
}

#[test]
fn already_cancelled_token_fails_immediately() {
    let token = CancelToken::new();
    token.cancel();
    let root = MemDir::new("root").with_file(MemFile::new("f", 1));

    let failure = DirSizer::new(3).size(&token, root.clone()).expect_err("cancelled");
    assert!(matches!(failure.error, SizeError::Cancelled));
    assert_eq!(failure.partial, Totals::default());
    assert_eq!(root.list_calls(), 0);
}

#[test]
fn sizes_a_real_directory_tree() {
    let temp = TempDir::new().expect("temp dir");
    let root = temp.path();
    fs::write(root.join("a.bin"), vec![0_u8; 256]).expect("write a");
    fs::create_dir_all(root.join("docs").join("deep")).expect("dirs");
    fs::write(root.join("docs").join("b.txt"), vec![1_u8; 128]).expect("write b");
    fs::write(root.join("docs").join("deep").join("c.txt"), vec![2_u8; 64]).expect("write c");
    fs::create_dir(root.join("empty")).expect("empty");

    for workers in [1, 8] {
        let dir = LocalDir::open(root, LocalOptions::default()).expect("open");
        let result = DirSizer::new(workers)
            .size(&CancelToken::new(), dir)
            .expect("size");
        assert_eq!(result, totals(448, 3));
    }
}

#[test]
fn hidden_files_can_be_skipped() {
    let temp = TempDir::new().expect("temp dir");
    fs::write(temp.path().join(".secret"), vec![1_u8; 10]).expect("hidden");
    fs::write(temp.path().join("visible"), vec![1_u8; 4]).expect("visible");

    let options = LocalOptions {
        show_hidden: false,
        ..LocalOptions::default()
    };
    let dir = LocalDir::open(temp.path(), options).expect("open");
    let result = DirSizer::default()
        .size(&CancelToken::new(), dir)
        .expect("size");
    assert_eq!(result, totals(4, 1));
}

#[test]
fn unreadable_directory_fails_the_run() {
    let temp = TempDir::new().expect("temp dir");
    let dir = LocalDir::open(temp.path(), LocalOptions::default()).expect("open");
    fs::remove_dir(temp.path()).expect("remove root");

    let failure = DirSizer::new(2)
        .size(&CancelToken::new(), dir)
        .expect_err("root vanished");
    assert!(matches!(failure.error, SizeError::List(_)));
}
