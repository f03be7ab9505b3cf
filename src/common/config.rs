use super::types::{FrameId, PageId};

/// Size of a frame/page in bytes (8 KB).
pub const FRAME_SIZE: usize = 8192;

/// Fixed number of frames in the buffer pool.
pub const MAX_BUFFER_SIZE: usize = 128;

/// Sentinel page ID stored in a frame that holds no page.
pub const INVALID_PAGE_ID: PageId = PageId::new(u32::MAX, u32::MAX);

/// Sentinel frame ID, used where "no frame" must be represented.
pub const INVALID_FRAME_ID: FrameId = FrameId(u32::MAX);

/// `file_id = 0` is reserved by the Catalog and never issued to a table.
pub const RESERVED_FILE_ID: u32 = 0;
