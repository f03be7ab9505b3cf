use crio::storage::page::{BTreePage, BTreePageRef, BTreePageType, InternalTuple, LeafTuple};

const FRAME_SIZE: usize = 8192;

#[test]
fn leaf_page_keeps_tuples_in_insertion_order_with_correct_rids() {
    let mut buf = vec![0u8; FRAME_SIZE];
    let mut page = BTreePage::new(&mut buf).unwrap();
    page.init(BTreePageType::Leaf, 0);

    page.insert_leaf(LeafTuple {
        key: 10,
        rid_page_num: 5,
        rid_slot_num: 2,
    })
    .unwrap();
    page.insert_leaf(LeafTuple {
        key: 20,
        rid_page_num: 6,
        rid_slot_num: 0,
    })
    .unwrap();

    assert_eq!(page.num_slots(), 2);
    let t0 = page.get_leaf_tuple(0).unwrap();
    assert_eq!((t0.key, t0.rid_page_num, t0.rid_slot_num), (10, 5, 2));
    let t1 = page.get_leaf_tuple(1).unwrap();
    assert_eq!((t1.key, t1.rid_page_num, t1.rid_slot_num), (20, 6, 0));
}

#[test]
fn internal_page_exposes_leftmost_child_separately_from_slots() {
    let mut buf = vec![0u8; FRAME_SIZE];
    let mut page = BTreePage::new(&mut buf).unwrap();
    page.init(BTreePageType::Internal, 1);
    page.set_leftmost_child(Some(7));
    page.insert_internal(InternalTuple {
        key: 100,
        right_child: 8,
    })
    .unwrap();

    assert_eq!(page.leftmost_child(), Some(7));
    assert_eq!(page.num_slots(), 1);
    assert_eq!(page.get_internal_tuple(0).unwrap().right_child, 8);
}

#[test]
fn sibling_links_round_trip_through_the_footer() {
    let mut buf = vec![0u8; FRAME_SIZE];
    let mut page = BTreePage::new(&mut buf).unwrap();
    page.init(BTreePageType::Leaf, 0);
    page.set_next_page(Some(42));
    page.set_prev_page(Some(41));

    assert_eq!(page.next_page(), Some(42));
    assert_eq!(page.prev_page(), Some(41));
}

#[test]
fn read_only_view_sees_bytes_written_through_the_mutable_view() {
    let mut buf = vec![0u8; FRAME_SIZE];
    {
        let mut page = BTreePage::new(&mut buf).unwrap();
        page.init(BTreePageType::Leaf, 0);
        for key in [5i64, 1, 3] {
            page.insert_leaf(LeafTuple {
                key,
                rid_page_num: 0,
                rid_slot_num: 0,
            })
            .unwrap();
        }
    }

    let view = BTreePageRef::new(&buf).unwrap();
    assert_eq!(view.num_slots(), 3);
    // Tuples are appended in insertion order; this layer does not sort.
    assert_eq!(view.key_at(0).unwrap(), 5);
    assert_eq!(view.key_at(2).unwrap(), 3);
}
