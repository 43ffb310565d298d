//! Handle and file lifecycle transitions.

mod common;

use common::{handle, scratch, whole};
use core_engine::ErrorCode;

#[test]
fn create_write_close_open_cycle() {
    let (_dir, path) = scratch("cycle.h5");
    let mut h = handle();
    assert!(!h.is_open());
    h.file_create(&path, true).unwrap();
    assert!(h.is_open());
    let data = [1.0f64, 2.0];
    h.field_write("u", &data, whole(1), whole(1), whole(2)).unwrap();
    h.file_flush().unwrap();
    h.file_close().unwrap();
    assert!(!h.is_open());

    // The same handle is reusable for another open.
    h.file_open(&path, false).unwrap();
    let mut out = [0.0f64; 2];
    h.field_read("u", &mut out, whole(1), whole(1), whole(2)).unwrap();
    assert_eq!(out, data);
    h.file_close().unwrap();
}

#[test]
fn double_close_is_idempotent() {
    let (_dir, path) = scratch("dclose.h5");
    let mut h = handle();
    h.file_create(&path, true).unwrap();
    h.file_close().unwrap();
    assert!(h.file_close().is_ok(), "second close succeeds");
    assert!(h.file_close().is_ok(), "and so does a third");
}

#[test]
fn create_while_open_is_a_usage_error() {
    let (_dir, path) = scratch("busy.h5");
    let mut h = handle();
    h.file_create(&path, true).unwrap();
    let err = h.file_create(&path, true).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Invalid);
    let err = h.file_open(&path, false).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Invalid);
    h.file_close().unwrap();
}

#[test]
fn flush_without_open_file_is_invalid() {
    let mut h = handle();
    let err = h.file_flush().unwrap_err();
    assert_eq!(err.code(), ErrorCode::Invalid);
}

#[test]
fn overwrite_refusal_and_retry_after_unlink() {
    let (_dir, path) = scratch("b.h5");
    let mut h = handle();
    h.file_create(&path, false).unwrap();
    h.file_close().unwrap();

    let err = h.file_create(&path, false).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Failed);
    assert!(!h.is_open());

    std::fs::remove_file(&path).unwrap();
    h.file_create(&path, false).unwrap();
    h.file_close().unwrap();
}

#[test]
fn open_missing_file_fails() {
    let (_dir, path) = scratch("ghost.h5");
    let mut h = handle();
    let err = h.file_open(&path, false).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Failed);
}

#[test]
fn layout_tag_is_range_checked() {
    let mut h = handle();
    assert_eq!(h.layout(), 0);
    h.set_layout(core_engine::layout_count() - 1).unwrap();
    let err = h.set_layout(core_engine::layout_count()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Invalid);
}

#[test]
fn finalize_force_closes_an_open_file() {
    let (_dir, path) = scratch("forced.h5");
    let mut h = handle();
    h.file_create(&path, true).unwrap();
    let data = [3.5f64];
    h.field_write("w", &data, whole(1), whole(1), whole(1)).unwrap();
    h.finalize();

    // The forced close persisted enough for a clean reopen.
    let mut h = handle();
    h.file_open(&path, false).unwrap();
    let mut out = [0.0f64];
    h.field_read("w", &mut out, whole(1), whole(1), whole(1)).unwrap();
    assert_eq!(out, data);
    h.file_close().unwrap();
}

#[test]
fn readonly_open_rejects_writes() {
    let (_dir, path) = scratch("ro.h5");
    let mut h = handle();
    h.file_create(&path, true).unwrap();
    h.file_close().unwrap();

    h.file_open(&path, false).unwrap();
    let data = [1.0f64];
    let err = h
        .field_write("u", &data, whole(1), whole(1), whole(1))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Failed);
    h.file_close().unwrap();
}
