use crate::util::constants::*;
use crate::util::Address;

/* Alignment */

pub fn page_align_down(address: Address) -> Address {
    address.align_down(BYTES_IN_PAGE)
}

pub fn is_page_aligned(address: Address) -> bool {
    address.is_aligned_to(BYTES_IN_PAGE)
}

pub const fn raw_align_down(val: usize, align: usize) -> usize {
    val & !align.wrapping_sub(1)
}

pub const fn raw_is_aligned(val: usize, align: usize) -> bool {
    val & align.wrapping_sub(1) == 0
}

/* Conversion */

pub fn pages_to_bytes(pages: usize) -> usize {
    pages << LOG_BYTES_IN_PAGE
}

/// Round a byte length up to whole pages. Returns `None` if the rounded length overflows.
pub fn bytes_to_pages_up(bytes: usize) -> Option<usize> {
    bytes
        .checked_add(BYTES_IN_PAGE - 1)
        .map(|b| b >> LOG_BYTES_IN_PAGE)
}

/// The page index of `addr` inside an area that starts at `area_start` and maps the backing
/// object from page `pgoff`.
pub fn area_page_index(area_start: Address, pgoff: u64, addr: Address) -> u64 {
    pgoff + ((addr - area_start) >> LOG_BYTES_IN_PAGE) as u64
}
