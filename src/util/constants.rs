/// log2 of the number of bits in a byte
pub const LOG_BITS_IN_BYTE: u8 = 3;
/// The number of bits in a byte
pub const BITS_IN_BYTE: usize = 1 << LOG_BITS_IN_BYTE;

#[cfg(target_pointer_width = "32")]
/// log2 of the number of bytes in an address
pub const LOG_BYTES_IN_ADDRESS: u8 = 2;
#[cfg(target_pointer_width = "64")]
/// log2 of the number of bytes in an address
pub const LOG_BYTES_IN_ADDRESS: u8 = 3;
/// The number of bytes in an address
pub const BYTES_IN_ADDRESS: usize = 1 << LOG_BYTES_IN_ADDRESS;

/// log2 of the number of bytes in a word
pub const LOG_BYTES_IN_WORD: u8 = LOG_BYTES_IN_ADDRESS;
/// log2 of the number of bits in a word
pub const LOG_BITS_IN_WORD: usize = LOG_BITS_IN_BYTE as usize + LOG_BYTES_IN_WORD as usize;
/// The number of bits in a word
pub const BITS_IN_WORD: usize = 1 << LOG_BITS_IN_WORD;

/// log2 of the number of bytes in a page
pub const LOG_BYTES_IN_PAGE: u8 = 12;
/// The number of bytes in a page
pub const BYTES_IN_PAGE: usize = 1 << LOG_BYTES_IN_PAGE;

/// log2 of the number of bytes in a huge page (2MB)
pub const LOG_BYTES_IN_HUGE_PAGE: u8 = 21;
/// The number of bytes in a huge page
pub const BYTES_IN_HUGE_PAGE: usize = 1 << LOG_BYTES_IN_HUGE_PAGE;

/// log2 of the maximum number of NUMA nodes a node mask can describe
pub const LOG_MAX_NUMNODES: u8 = 8;
/// The maximum number of NUMA nodes. Node ids range over `0..MAX_NUMNODES`.
pub const MAX_NUMNODES: usize = 1 << LOG_MAX_NUMNODES;
/// The number of words backing a node mask
pub const NODEMASK_WORDS: usize = MAX_NUMNODES / BITS_IN_WORD;

/// How many times the compliance scanner tries to evict a page-cache page before giving up
pub const DEFAULT_EVICT_RETRIES: usize = 3;

static_assertions::const_assert!(MAX_NUMNODES % BITS_IN_WORD == 0);
static_assertions::const_assert!(MAX_NUMNODES <= u16::MAX as usize + 1);
