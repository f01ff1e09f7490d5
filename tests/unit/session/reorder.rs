use super::*;

#[test]
fn releases_consecutive_prefix_only() {
    let mut buf = ReorderBuffer::new(0);
    buf.insert(2, "c").unwrap();
    buf.insert(1, "b").unwrap();
    assert_eq!(buf.pop_ready(), None);

    buf.insert(0, "a").unwrap();
    let drained: Vec<_> = std::iter::from_fn(|| buf.pop_ready()).collect();
    assert_eq!(drained, ["a", "b", "c"]);
    assert_eq!(buf.next(), 3);
    assert_eq!(buf.pop_ready(), None);
}

#[test]
fn stale_and_duplicate_indices_are_rejected() {
    let mut buf = ReorderBuffer::new(5);
    assert!(buf.insert(4, ()).is_err());
    buf.insert(7, ()).unwrap();
    assert!(buf.insert(7, ()).is_err());
    buf.insert(5, ()).unwrap();
    assert_eq!(buf.pop_ready(), Some(()));
    assert!(buf.insert(5, ()).is_err());
}
