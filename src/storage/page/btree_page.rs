//! Physical layout of a B+-tree page: a slotted page specialized to two
//! fixed-size tuple kinds (leaf and internal), as laid out over a single
//! frame's worth of bytes.
//!
//! Layout, front to back:
//!
//! ```text
//! [ header: 7B ][ slot array: 2B * num_slots ][ free space ][ tuple area ][ special: 10B ]
//! ```
//!
//! The slot array grows forward from just after the header; the tuple area
//! grows backward from just before the footer. A slot is a bare `u16` byte
//! offset into the page — there is no per-slot length, since tuple size is
//! implied entirely by the page's `page_type`. Internal pages additionally
//! reserve 4 bytes for a leftmost-child pointer immediately before the
//! footer, below the tuple area.

use crate::common::error::{CrioError, Result};

pub const HEADER_SIZE: usize = 7;
pub const FOOTER_SIZE: usize = 10;
pub const SLOT_SIZE: usize = 2;
pub const LEFTMOST_PTR_SIZE: usize = 4;

pub const LEAF_TUPLE_SIZE: usize = 14;
pub const INTERNAL_TUPLE_SIZE: usize = 12;

const HAS_FREE_SPACE_OFFSET: usize = 0;
const PG_LOWER_OFFSET: usize = 1;
const PG_UPPER_OFFSET: usize = 3;
const PG_SPECIAL_OFFSET: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BTreePageType {
    Leaf = 0,
    Internal = 1,
}

impl BTreePageType {
    fn from_u8(v: u8) -> Result<Self> {
        match v {
            0 => Ok(BTreePageType::Leaf),
            1 => Ok(BTreePageType::Internal),
            other => Err(CrioError::InvalidArgument(format!(
                "unrecognized page_type byte {other}"
            ))),
        }
    }
}

/// A leaf tuple: a key paired with the `RecordId` it points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafTuple {
    pub key: i64,
    pub rid_page_num: u32,
    pub rid_slot_num: u16,
}

/// An internal tuple: a separator key paired with the page id of the
/// subtree to its right. The leftmost child (the subtree left of the
/// smallest separator) is stored out-of-band, see [`BTreePage::leftmost_child`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternalTuple {
    pub key: i64,
    pub right_child: u32,
}

fn page_bytes_len(buf_len: usize) -> Result<usize> {
    if buf_len < HEADER_SIZE + FOOTER_SIZE {
        return Err(CrioError::InvalidArgument(format!(
            "page buffer too small: {buf_len} bytes"
        )));
    }
    Ok(buf_len)
}

/// A mutable view of a B+-tree page over a frame's raw bytes.
pub struct BTreePage<'a> {
    data: &'a mut [u8],
}

impl<'a> BTreePage<'a> {
    pub fn new(data: &'a mut [u8]) -> Result<Self> {
        page_bytes_len(data.len())?;
        Ok(Self { data })
    }

    /// Initializes an empty page of `page_type` at tree `level`, with no
    /// sibling links yet.
    pub fn init(&mut self, page_type: BTreePageType, level: u16) {
        let len = self.data.len();
        let special = len - FOOTER_SIZE;
        // Internal pages carve the leftmost-child pointer out of the tuple
        // area up front, so the tuple area never grows into it.
        let tuple_area_top = match page_type {
            BTreePageType::Internal => special - LEFTMOST_PTR_SIZE,
            BTreePageType::Leaf => special,
        };
        self.set_has_free_space(true);
        self.set_pg_lower(HEADER_SIZE as u16);
        self.set_pg_upper(tuple_area_top as u16);
        self.set_pg_special(special as u16);
        self.set_page_type(page_type);
        self.set_level(level);
        self.set_next_page(None);
        self.set_prev_page(None);
        if page_type == BTreePageType::Internal {
            self.set_leftmost_child(None);
        }
    }

    // --- header accessors ---

    pub fn has_free_space(&self) -> bool {
        self.data[HAS_FREE_SPACE_OFFSET] != 0
    }

    fn set_has_free_space(&mut self, v: bool) {
        self.data[HAS_FREE_SPACE_OFFSET] = v as u8;
    }

    pub fn pg_lower(&self) -> u16 {
        u16::from_le_bytes([
            self.data[PG_LOWER_OFFSET],
            self.data[PG_LOWER_OFFSET + 1],
        ])
    }

    fn set_pg_lower(&mut self, v: u16) {
        self.data[PG_LOWER_OFFSET..PG_LOWER_OFFSET + 2].copy_from_slice(&v.to_le_bytes());
    }

    pub fn pg_upper(&self) -> u16 {
        u16::from_le_bytes([
            self.data[PG_UPPER_OFFSET],
            self.data[PG_UPPER_OFFSET + 1],
        ])
    }

    fn set_pg_upper(&mut self, v: u16) {
        self.data[PG_UPPER_OFFSET..PG_UPPER_OFFSET + 2].copy_from_slice(&v.to_le_bytes());
    }

    pub fn pg_special(&self) -> u16 {
        u16::from_le_bytes([
            self.data[PG_SPECIAL_OFFSET],
            self.data[PG_SPECIAL_OFFSET + 1],
        ])
    }

    fn set_pg_special(&mut self, v: u16) {
        self.data[PG_SPECIAL_OFFSET..PG_SPECIAL_OFFSET + 2].copy_from_slice(&v.to_le_bytes());
    }

    fn special_offset(&self) -> usize {
        self.pg_special() as usize
    }

    // --- footer accessors ---

    pub fn page_type(&self) -> Result<BTreePageType> {
        let off = self.special_offset();
        BTreePageType::from_u8(self.data[off])
    }

    fn set_page_type(&mut self, t: BTreePageType) {
        let off = self.special_offset();
        self.data[off] = t as u8;
    }

    pub fn is_leaf(&self) -> Result<bool> {
        Ok(matches!(self.page_type()?, BTreePageType::Leaf))
    }

    pub fn level(&self) -> u16 {
        let off = self.special_offset() + 1;
        u16::from_le_bytes([self.data[off], self.data[off + 1]])
    }

    fn set_level(&mut self, level: u16) {
        let off = self.special_offset() + 1;
        self.data[off..off + 2].copy_from_slice(&level.to_le_bytes());
    }

    fn raw_sibling(&self, rel_off: usize) -> Option<u32> {
        let off = self.special_offset() + rel_off;
        let v = u32::from_le_bytes([
            self.data[off],
            self.data[off + 1],
            self.data[off + 2],
            self.data[off + 3],
        ]);
        if v == u32::MAX {
            None
        } else {
            Some(v)
        }
    }

    fn set_raw_sibling(&mut self, rel_off: usize, v: Option<u32>) {
        let off = self.special_offset() + rel_off;
        let raw = v.unwrap_or(u32::MAX);
        self.data[off..off + 4].copy_from_slice(&raw.to_le_bytes());
    }

    pub fn next_page(&self) -> Option<u32> {
        self.raw_sibling(3)
    }

    pub fn set_next_page(&mut self, v: Option<u32>) {
        self.set_raw_sibling(3, v);
    }

    pub fn prev_page(&self) -> Option<u32> {
        self.raw_sibling(7)
    }

    pub fn set_prev_page(&mut self, v: Option<u32>) {
        self.set_raw_sibling(7, v);
    }

    /// The leftmost child pointer, reserved in the 4 bytes just before the
    /// footer. Only meaningful on internal pages.
    pub fn leftmost_child(&self) -> Option<u32> {
        let off = self.special_offset() - LEFTMOST_PTR_SIZE;
        let v = u32::from_le_bytes([
            self.data[off],
            self.data[off + 1],
            self.data[off + 2],
            self.data[off + 3],
        ]);
        if v == u32::MAX {
            None
        } else {
            Some(v)
        }
    }

    pub fn set_leftmost_child(&mut self, v: Option<u32>) {
        let off = self.special_offset() - LEFTMOST_PTR_SIZE;
        let raw = v.unwrap_or(u32::MAX);
        self.data[off..off + 4].copy_from_slice(&raw.to_le_bytes());
    }

    fn tuple_size(&self) -> Result<usize> {
        Ok(match self.page_type()? {
            BTreePageType::Leaf => LEAF_TUPLE_SIZE,
            BTreePageType::Internal => INTERNAL_TUPLE_SIZE,
        })
    }

    // --- slot array ---

    pub fn num_slots(&self) -> u16 {
        (self.pg_lower() - HEADER_SIZE as u16) / SLOT_SIZE as u16
    }

    fn slot_offset(&self, slot: u16) -> usize {
        HEADER_SIZE + slot as usize * SLOT_SIZE
    }

    /// The byte offset of a tuple's slot. Returns `None` if empty or OOB.
    fn slot_value(&self, slot: u16) -> Option<u16> {
        if slot >= self.num_slots() {
            return None;
        }
        let off = self.slot_offset(slot);
        Some(u16::from_le_bytes([self.data[off], self.data[off + 1]]))
    }

    /// Inserts a new slot at `index`, shifting every slot from `index`
    /// onward one position to the right. The new slot array entry is left
    /// pointing at `tuple_offset`; tuple bytes are never moved, only the
    /// offsets that reference them.
    fn insert_slot(&mut self, index: u16, tuple_offset: u16) {
        let n = self.num_slots();
        self.set_pg_lower(self.pg_lower() + SLOT_SIZE as u16);
        let mut slot = n;
        while slot > index {
            let prev = self.slot_value(slot - 1).expect("slot within bounds");
            let off = self.slot_offset(slot);
            self.data[off..off + 2].copy_from_slice(&prev.to_le_bytes());
            slot -= 1;
        }
        let off = self.slot_offset(index);
        self.data[off..off + 2].copy_from_slice(&tuple_offset.to_le_bytes());
    }

    pub fn free_space(&self) -> usize {
        self.pg_upper() as usize - self.pg_lower() as usize
    }

    pub fn can_insert(&self) -> Result<bool> {
        let needed = self.tuple_size()? + SLOT_SIZE;
        Ok(self.has_free_space() && self.free_space() >= needed)
    }

    /// Returns the key at `slot`, independent of leaf/internal kind. The key
    /// sits at a different byte offset within the two tuple shapes: leaf
    /// tuples lead with the 6-byte `RecordId`, internal tuples lead with
    /// the key itself.
    pub fn key_at(&self, slot: u16) -> Result<i64> {
        let off = self
            .slot_value(slot)
            .ok_or(CrioError::InvalidSlotId(slot))? as usize;
        let key_off = match self.page_type()? {
            BTreePageType::Leaf => off + 6,
            BTreePageType::Internal => off,
        };
        Ok(i64::from_le_bytes(
            self.data[key_off..key_off + 8].try_into().unwrap(),
        ))
    }

    /// Lower-bound binary search: the index of the first slot whose key is
    /// `>= key`, or `num_slots()` if all keys are smaller.
    pub fn find_key_index(&self, key: i64) -> Result<u16> {
        let mut lo = 0u16;
        let mut hi = self.num_slots();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.key_at(mid)? < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }

    pub fn get_leaf_tuple(&self, slot: u16) -> Result<LeafTuple> {
        if self.page_type()? != BTreePageType::Leaf {
            return Err(CrioError::InvalidArgument(
                "get_leaf_tuple called on a non-leaf page".to_string(),
            ));
        }
        let off = self
            .slot_value(slot)
            .ok_or(CrioError::InvalidSlotId(slot))? as usize;
        let rid_page_num = u32::from_le_bytes(self.data[off..off + 4].try_into().unwrap());
        let rid_slot_num = u16::from_le_bytes(self.data[off + 4..off + 6].try_into().unwrap());
        let key = i64::from_le_bytes(self.data[off + 6..off + 14].try_into().unwrap());
        Ok(LeafTuple {
            key,
            rid_page_num,
            rid_slot_num,
        })
    }

    pub fn get_internal_tuple(&self, slot: u16) -> Result<InternalTuple> {
        if self.page_type()? != BTreePageType::Internal {
            return Err(CrioError::InvalidArgument(
                "get_internal_tuple called on a non-internal page".to_string(),
            ));
        }
        let off = self
            .slot_value(slot)
            .ok_or(CrioError::InvalidSlotId(slot))? as usize;
        let key = i64::from_le_bytes(self.data[off..off + 8].try_into().unwrap());
        let right_child = u32::from_le_bytes(self.data[off + 8..off + 12].try_into().unwrap());
        Ok(InternalTuple { key, right_child })
    }

    /// Binary-searches for `tuple.key`'s slot position, appends the tuple
    /// bytes at the low end of the tuple area, and shifts the slot array so
    /// slots stay in ascending-key order. Tuple payloads are not kept in
    /// slot order themselves — only the offsets the slots reference are.
    pub fn insert_leaf(&mut self, tuple: LeafTuple) -> Result<()> {
        if self.page_type()? != BTreePageType::Leaf {
            return Err(CrioError::InvalidArgument(
                "insert_leaf called on a non-leaf page".to_string(),
            ));
        }
        if !self.can_insert()? {
            return Err(CrioError::PageOverflow {
                tuple_size: LEAF_TUPLE_SIZE,
                available: self.free_space(),
            });
        }
        let index = self.find_key_index(tuple.key)?;
        let new_upper = self.pg_upper() - LEAF_TUPLE_SIZE as u16;
        let off = new_upper as usize;
        self.data[off..off + 4].copy_from_slice(&tuple.rid_page_num.to_le_bytes());
        self.data[off + 4..off + 6].copy_from_slice(&tuple.rid_slot_num.to_le_bytes());
        self.data[off + 6..off + 14].copy_from_slice(&tuple.key.to_le_bytes());
        self.set_pg_upper(new_upper);
        self.insert_slot(index, new_upper);
        if self.free_space() < LEAF_TUPLE_SIZE + SLOT_SIZE {
            self.set_has_free_space(false);
        }
        Ok(())
    }

    /// Binary-searches for `tuple.key`'s slot position and shifts the slot
    /// array to keep internal-page separators in ascending order.
    pub fn insert_internal(&mut self, tuple: InternalTuple) -> Result<()> {
        if self.page_type()? != BTreePageType::Internal {
            return Err(CrioError::InvalidArgument(
                "insert_internal called on a non-internal page".to_string(),
            ));
        }
        if !self.can_insert()? {
            return Err(CrioError::PageOverflow {
                tuple_size: INTERNAL_TUPLE_SIZE,
                available: self.free_space(),
            });
        }
        let index = self.find_key_index(tuple.key)?;
        let new_upper = self.pg_upper() - INTERNAL_TUPLE_SIZE as u16;
        let off = new_upper as usize;
        self.data[off..off + 8].copy_from_slice(&tuple.key.to_le_bytes());
        self.data[off + 8..off + 12].copy_from_slice(&tuple.right_child.to_le_bytes());
        self.set_pg_upper(new_upper);
        self.insert_slot(index, new_upper);
        if self.free_space() < INTERNAL_TUPLE_SIZE + SLOT_SIZE {
            self.set_has_free_space(false);
        }
        Ok(())
    }
}

/// A read-only view of a B+-tree page, mirroring [`BTreePage`]'s accessors.
pub struct BTreePageRef<'a> {
    data: &'a [u8],
}

impl<'a> BTreePageRef<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        page_bytes_len(data.len())?;
        Ok(Self { data })
    }

    fn pg_lower(&self) -> u16 {
        u16::from_le_bytes([
            self.data[PG_LOWER_OFFSET],
            self.data[PG_LOWER_OFFSET + 1],
        ])
    }

    fn pg_special(&self) -> u16 {
        u16::from_le_bytes([
            self.data[PG_SPECIAL_OFFSET],
            self.data[PG_SPECIAL_OFFSET + 1],
        ])
    }

    pub fn page_type(&self) -> Result<BTreePageType> {
        BTreePageType::from_u8(self.data[self.pg_special() as usize])
    }

    pub fn is_leaf(&self) -> Result<bool> {
        Ok(matches!(self.page_type()?, BTreePageType::Leaf))
    }

    pub fn num_slots(&self) -> u16 {
        (self.pg_lower() - HEADER_SIZE as u16) / SLOT_SIZE as u16
    }

    fn slot_value(&self, slot: u16) -> Option<u16> {
        if slot >= self.num_slots() {
            return None;
        }
        let off = HEADER_SIZE + slot as usize * SLOT_SIZE;
        Some(u16::from_le_bytes([self.data[off], self.data[off + 1]]))
    }

    pub fn key_at(&self, slot: u16) -> Result<i64> {
        let off = self
            .slot_value(slot)
            .ok_or(CrioError::InvalidSlotId(slot))? as usize;
        let key_off = match self.page_type()? {
            BTreePageType::Leaf => off + 6,
            BTreePageType::Internal => off,
        };
        Ok(i64::from_le_bytes(
            self.data[key_off..key_off + 8].try_into().unwrap(),
        ))
    }

    pub fn get_leaf_tuple(&self, slot: u16) -> Result<LeafTuple> {
        let off = self
            .slot_value(slot)
            .ok_or(CrioError::InvalidSlotId(slot))? as usize;
        let rid_page_num = u32::from_le_bytes(self.data[off..off + 4].try_into().unwrap());
        let rid_slot_num = u16::from_le_bytes(self.data[off + 4..off + 6].try_into().unwrap());
        let key = i64::from_le_bytes(self.data[off + 6..off + 14].try_into().unwrap());
        Ok(LeafTuple {
            key,
            rid_page_num,
            rid_slot_num,
        })
    }

    pub fn get_internal_tuple(&self, slot: u16) -> Result<InternalTuple> {
        let off = self
            .slot_value(slot)
            .ok_or(CrioError::InvalidSlotId(slot))? as usize;
        let key = i64::from_le_bytes(self.data[off..off + 8].try_into().unwrap());
        let right_child = u32::from_le_bytes(self.data[off + 8..off + 12].try_into().unwrap());
        Ok(InternalTuple { key, right_child })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::FRAME_SIZE;

    fn new_leaf() -> Vec<u8> {
        let mut buf = vec![0u8; FRAME_SIZE];
        let mut page = BTreePage::new(&mut buf).unwrap();
        page.init(BTreePageType::Leaf, 0);
        drop(page);
        buf
    }

    fn new_internal() -> Vec<u8> {
        let mut buf = vec![0u8; FRAME_SIZE];
        let mut page = BTreePage::new(&mut buf).unwrap();
        page.init(BTreePageType::Internal, 1);
        drop(page);
        buf
    }

    #[test]
    fn test_init_leaf_page() {
        let mut buf = new_leaf();
        let page = BTreePage::new(&mut buf).unwrap();
        assert!(page.is_leaf().unwrap());
        assert_eq!(page.num_slots(), 0);
        assert_eq!(page.next_page(), None);
        assert_eq!(page.prev_page(), None);
        assert!(page.has_free_space());
    }

    #[test]
    fn test_insert_and_read_leaf_tuples_sorted() {
        let mut buf = new_leaf();
        let mut page = BTreePage::new(&mut buf).unwrap();
        for key in [10i64, 20, 30] {
            page.insert_leaf(LeafTuple {
                key,
                rid_page_num: 7,
                rid_slot_num: key as u16,
            })
            .unwrap();
        }
        assert_eq!(page.num_slots(), 3);
        assert_eq!(page.key_at(0).unwrap(), 10);
        assert_eq!(page.key_at(1).unwrap(), 20);
        assert_eq!(page.key_at(2).unwrap(), 30);
        let t = page.get_leaf_tuple(1).unwrap();
        assert_eq!(t.key, 20);
        assert_eq!(t.rid_page_num, 7);
        assert_eq!(t.rid_slot_num, 20);
    }

    #[test]
    fn test_out_of_order_insert_keeps_slots_sorted() {
        let mut buf = new_leaf();
        let mut page = BTreePage::new(&mut buf).unwrap();
        for key in [30i64, 10, 20, 5] {
            page.insert_leaf(LeafTuple {
                key,
                rid_page_num: 1,
                rid_slot_num: key as u16,
            })
            .unwrap();
        }
        assert_eq!(page.num_slots(), 4);
        let keys: Vec<i64> = (0..4).map(|s| page.key_at(s).unwrap()).collect();
        assert_eq!(keys, vec![5, 10, 20, 30]);
        // Tuple bytes are not moved, only slot offsets: the tuple for key
        // 30 (inserted first, so lowest in the tuple area) is now
        // referenced by the last slot.
        assert_eq!(page.get_leaf_tuple(3).unwrap().rid_slot_num, 30);
    }

    #[test]
    fn test_find_key_index_lower_bound() {
        let mut buf = new_leaf();
        let mut page = BTreePage::new(&mut buf).unwrap();
        for key in [10i64, 20, 30] {
            page.insert_leaf(LeafTuple {
                key,
                rid_page_num: 0,
                rid_slot_num: 0,
            })
            .unwrap();
        }
        assert_eq!(page.find_key_index(5).unwrap(), 0);
        assert_eq!(page.find_key_index(10).unwrap(), 0);
        assert_eq!(page.find_key_index(15).unwrap(), 1);
        assert_eq!(page.find_key_index(30).unwrap(), 2);
        assert_eq!(page.find_key_index(31).unwrap(), 3);
    }

    #[test]
    fn test_internal_page_leftmost_and_tuples() {
        let mut buf = new_internal();
        let mut page = BTreePage::new(&mut buf).unwrap();
        page.set_leftmost_child(Some(100));
        page.insert_internal(InternalTuple {
            key: 50,
            right_child: 101,
        })
        .unwrap();
        page.insert_internal(InternalTuple {
            key: 75,
            right_child: 102,
        })
        .unwrap();
        assert_eq!(page.leftmost_child(), Some(100));
        assert_eq!(page.get_internal_tuple(0).unwrap().right_child, 101);
        assert_eq!(page.get_internal_tuple(1).unwrap().key, 75);
    }

    #[test]
    fn test_insert_leaf_on_internal_page_fails() {
        let mut buf = new_internal();
        let mut page = BTreePage::new(&mut buf).unwrap();
        let err = page
            .insert_leaf(LeafTuple {
                key: 1,
                rid_page_num: 0,
                rid_slot_num: 0,
            })
            .unwrap_err();
        assert!(matches!(err, CrioError::InvalidArgument(_)));
    }

    #[test]
    fn test_page_overflow_when_full() {
        let mut buf = new_leaf();
        let mut page = BTreePage::new(&mut buf).unwrap();
        let mut inserted = 0;
        loop {
            match page.insert_leaf(LeafTuple {
                key: inserted as i64,
                rid_page_num: 0,
                rid_slot_num: 0,
            }) {
                Ok(()) => inserted += 1,
                Err(CrioError::PageOverflow { .. }) => break,
                Err(e) => panic!("unexpected error: {e:?}"),
            }
        }
        assert!(inserted > 0);
        assert!(!page.has_free_space());
    }

    #[test]
    fn test_ref_view_matches_mutable_view() {
        let mut buf = new_leaf();
        {
            let mut page = BTreePage::new(&mut buf).unwrap();
            page.insert_leaf(LeafTuple {
                key: 42,
                rid_page_num: 3,
                rid_slot_num: 9,
            })
            .unwrap();
        }
        let page_ref = BTreePageRef::new(&buf).unwrap();
        assert!(page_ref.is_leaf().unwrap());
        assert_eq!(page_ref.num_slots(), 1);
        assert_eq!(page_ref.key_at(0).unwrap(), 42);
        let t = page_ref.get_leaf_tuple(0).unwrap();
        assert_eq!(t.rid_slot_num, 9);
    }
}
