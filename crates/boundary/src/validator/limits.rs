//! Ceilings and allowlists applied to renderer payloads.

pub const MAX_STRING_LENGTH: usize = 200_000;
/// 512 `KiB`, measured on the compact JSON encoding.
pub const MAX_SERIALIZED_PAYLOAD_SIZE: usize = 512 * 1024;
pub const MAX_CONTAINER_DEPTH: usize = 20;
pub const MAX_PATH_LENGTH: usize = 4096;

pub const MAX_FILTER_EXTENSION_LENGTH: usize = 32;
pub const MAX_FILE_NAME_LENGTH: usize = 120;

pub const MAX_NOTIFICATION_TITLE_LENGTH: usize = 160;
pub const MAX_NOTIFICATION_MESSAGE_LENGTH: usize = 512;
pub const MAX_NOTIFICATION_DESCRIPTION_LENGTH: usize = 512;
pub const MAX_NOTIFICATION_ACTION_LENGTH: usize = 48;
pub const MAX_NOTIFICATION_TAG_LENGTH: usize = 64;
pub const MAX_NOTIFICATION_DURATION_MS: u64 = 30_000;

pub const MAX_DRAG_FILES: usize = 15;
pub const MAX_DRAG_FILE_BYTES: u64 = 12 * 1024 * 1024;
pub const MAX_DRAG_TOTAL_BYTES: u64 = 50 * 1024 * 1024;
pub const MAX_DRAG_TYPE_LENGTH: usize = 128;
pub const MAX_DRAG_SOURCE_LENGTH: usize = 32;
pub const MAX_DRAG_TENDER_ID_LENGTH: usize = 64;

pub const MAX_EXPORT_BYTES: u64 = 20 * 1024 * 1024;
pub const MAX_EXPORT_ORIGIN_LENGTH: usize = 120;
