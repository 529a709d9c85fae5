use super::*;

/// A 4x1 surface whose first `n` pixels are opaque, so snapshots are distinguishable.
fn snap(n: u32) -> Surface {
    let mut s = Surface::new(4, 1).unwrap();
    let data = s.pixmap_mut().data_mut();
    for px in 0..n.min(4) as usize {
        data[px * 4 + 3] = 255;
    }
    s
}

#[test]
fn new_history_is_empty_at_baseline() {
    let h = InkHistory::new(20);
    assert!(h.is_empty());
    assert_eq!(h.index(), None);
    assert!(h.current().is_none());
    assert!(!h.can_undo());
    assert!(!h.can_redo());
}

#[test]
fn first_commit_sets_index_zero() {
    let mut h = InkHistory::new(20);
    h.commit(snap(1));
    assert_eq!(h.index(), Some(0));
    assert_eq!(h.len(), 1);
    assert!(h.can_undo());
}

#[test]
fn undo_from_first_commit_returns_to_blank() {
    let mut h = InkHistory::new(20);
    h.commit(snap(1));
    assert_eq!(h.undo(), Some(None));
    assert_eq!(h.index(), None);
    assert_eq!(h.undo(), None);
}

#[test]
fn undo_redo_flow() {
    let mut h = InkHistory::new(20);
    h.commit(snap(1));
    h.commit(snap(2));
    h.commit(snap(3));

    assert_eq!(h.undo(), Some(Some(&snap(2))));
    assert_eq!(h.undo(), Some(Some(&snap(1))));
    assert_eq!(h.redo(), Some(&snap(2)));
    assert_eq!(h.redo(), Some(&snap(3)));
    assert_eq!(h.redo(), None);
}

#[test]
fn undo_does_not_mutate_entries() {
    let mut h = InkHistory::new(20);
    h.commit(snap(1));
    h.commit(snap(2));
    h.undo();
    assert_eq!(h.entries(), &[snap(1), snap(2)]);
}

#[test]
fn commit_after_undo_discards_redo_branch() {
    let mut h = InkHistory::new(20);
    h.commit(snap(1));
    h.commit(snap(2));
    h.undo();
    h.commit(snap(4));
    assert_eq!(h.len(), 2);
    assert_eq!(h.current(), Some(&snap(4)));
    assert!(!h.can_redo());
}

#[test]
fn commit_from_blank_after_full_undo_restarts() {
    let mut h = InkHistory::new(20);
    h.commit(snap(1));
    h.undo();
    h.commit(snap(3));
    assert_eq!(h.len(), 1);
    assert_eq!(h.index(), Some(0));
}

#[test]
fn redo_from_blank_goes_to_first() {
    let mut h = InkHistory::new(20);
    h.commit(snap(1));
    h.undo();
    assert_eq!(h.redo(), Some(&snap(1)));
}

#[test]
fn cap_drops_oldest_and_blocks_blank_baseline() {
    let mut h = InkHistory::new(3);
    for n in 1..=4 {
        h.commit(snap(n));
    }
    assert_eq!(h.len(), 3);
    assert_eq!(h.entries()[0], snap(2));
    assert_eq!(h.index(), Some(2));

    assert!(h.undo().is_some());
    assert!(h.undo().is_some());
    assert_eq!(h.index(), Some(0));
    assert!(!h.can_undo());
    assert_eq!(h.undo(), None);
    assert_eq!(h.current(), Some(&snap(2)));
}

#[test]
fn zero_limit_is_raised_to_one() {
    let mut h = InkHistory::new(0);
    h.commit(snap(1));
    h.commit(snap(2));
    assert_eq!(h.limit(), 1);
    assert_eq!(h.len(), 1);
}

#[test]
fn from_parts_restores_cursor() {
    let h = InkHistory::from_parts(vec![snap(1), snap(2), snap(3)], Some(1), 20, false);
    assert_eq!(h.index(), Some(1));
    assert!(h.can_redo());
}

#[test]
fn from_parts_clamps_cursor_and_trims_to_limit() {
    let h = InkHistory::from_parts(vec![snap(1), snap(2), snap(3)], Some(9), 2, false);
    assert_eq!(h.len(), 2);
    assert_eq!(h.index(), Some(1));
    assert_eq!(h.current(), Some(&snap(3)));
}

#[test]
fn from_parts_empty_is_baseline() {
    let h = InkHistory::from_parts(Vec::new(), Some(3), 20, false);
    assert_eq!(h.index(), None);
}

#[test]
fn from_parts_keeps_evicted_baseline() {
    let mut h = InkHistory::from_parts(vec![snap(1), snap(2)], Some(0), 2, true);
    assert!(h.baseline_evicted());
    assert!(!h.can_undo());
    assert_eq!(h.undo(), None);
    assert_eq!(h.current(), Some(&snap(1)));
}

#[test]
fn from_parts_trim_evicts_baseline() {
    let h = InkHistory::from_parts(vec![snap(1), snap(2), snap(3)], Some(2), 2, false);
    assert!(h.baseline_evicted());
}
