//! Compressed pointer layout and class space placement
//!
//! The metaspace side of the runtime reads two facts from the table:
//! whether compressed class pointers are tied to compressed oops, and at
//! which alignment (if any) the compressed class space base should be
//! searched for. This module resolves the compressed pointer flags the way
//! the runtime's startup ergonomics do, validates a final configuration,
//! and places and encodes the class space.

use crate::error::LayoutError;
use crate::types::{checked_align_up, TraitTable, G};

/// log2 of the minimum object alignment
pub const LOG_MIN_OBJ_ALIGNMENT: u32 = 3;
/// log2 of the Klass alignment used for scaled class pointers
pub const LOG_KLASS_ALIGNMENT: u32 = 3;

/// Largest heap addressable with 32-bit scaled oops
pub const OOP_ENCODING_HEAP_MAX: u64 = (1 << 32) << LOG_MIN_OBJ_ALIGNMENT;
/// Largest class space range addressable with 32-bit scaled class pointers
pub const KLASS_ENCODING_METASPACE_MAX: u64 = (1 << 32) << LOG_KLASS_ALIGNMENT;
/// Class pointers need no shift below this range
pub const UNSCALED_CLASS_SPACE_MAX: u64 = 1 << 32;

pub const DEFAULT_COMPRESSED_CLASS_SPACE_SIZE: u64 = G;

/// Aligned class space bases are not searched above this address
pub const CLASS_SPACE_SEARCH_LIMIT: u64 = 1024 * G;

/// Largest heap that still works with compressed oops, leaving room for the
/// protected null page at the heap base. Zero for page sizes at or above
/// the encoding range.
pub const fn max_heap_for_compressed_oops(page_size: u64) -> u64 {
    OOP_ENCODING_HEAP_MAX.saturating_sub(page_size)
}

/// Layout flags as given on the command line; `None` means not given
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutRequest {
    pub use_compressed_oops: Option<bool>,
    pub use_compressed_class_pointers: Option<bool>,
    pub max_heap_size: u64,
    pub compressed_class_space_size: u64,
    pub page_size: u64,
}

impl Default for LayoutRequest {
    fn default() -> Self {
        LayoutRequest {
            use_compressed_oops: None,
            use_compressed_class_pointers: None,
            max_heap_size: G,
            compressed_class_space_size: DEFAULT_COMPRESSED_CLASS_SPACE_SIZE,
            page_size: 4096,
        }
    }
}

/// Final memory layout configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConfig {
    pub use_compressed_oops: bool,
    pub use_compressed_class_pointers: bool,
    pub max_heap_size: u64,
    pub compressed_class_space_size: u64,
    pub page_size: u64,
}

impl LayoutConfig {
    /// Resolve `request` against the table.
    ///
    /// Never fails: conflicting requests are downgraded with a warning, and
    /// the result always passes [`validate`](Self::validate).
    pub fn resolve(table: &TraitTable, request: &LayoutRequest) -> LayoutConfig {
        let mut config = LayoutConfig {
            use_compressed_oops: false,
            use_compressed_class_pointers: false,
            max_heap_size: request.max_heap_size,
            compressed_class_space_size: request.compressed_class_space_size,
            page_size: request.page_size,
        };

        if table.word_size < 8 {
            if request.use_compressed_oops == Some(true)
                || request.use_compressed_class_pointers == Some(true)
            {
                log::warn!("{}: compressed pointers need a 64-bit VM", table.name);
            }
            return config;
        }

        let heap_fits = request.max_heap_size <= max_heap_for_compressed_oops(request.page_size);
        config.use_compressed_oops = match request.use_compressed_oops {
            None => heap_fits,
            Some(true) if !heap_fits => {
                log::warn!("{}: max heap size too large for compressed oops", table.name);
                false
            }
            Some(requested) => requested,
        };

        config.use_compressed_class_pointers =
            if table.class_pointers_need_compressed_oops && !config.use_compressed_oops {
                if request.use_compressed_class_pointers == Some(true) {
                    log::warn!(
                        "{}: compressed class pointers require compressed oops",
                        table.name
                    );
                }
                false
            } else {
                let wanted = request.use_compressed_class_pointers.unwrap_or(true);
                if wanted && request.compressed_class_space_size > KLASS_ENCODING_METASPACE_MAX {
                    log::warn!(
                        "{}: compressed class space size too large for compressed class pointers",
                        table.name
                    );
                    false
                } else {
                    wanted
                }
            };

        log::debug!(
            "{}: compressed oops {}, compressed class pointers {}",
            table.name,
            config.use_compressed_oops,
            config.use_compressed_class_pointers
        );
        config
    }

    /// Check the configuration against the table
    pub fn validate(&self, table: &TraitTable) -> Result<(), LayoutError> {
        if table.word_size < 8 && (self.use_compressed_oops || self.use_compressed_class_pointers)
        {
            return Err(LayoutError::CompressedPointersOn32Bit { arch: table.name });
        }
        if self.use_compressed_oops {
            let limit = max_heap_for_compressed_oops(self.page_size);
            if self.max_heap_size > limit {
                return Err(LayoutError::HeapTooLargeForCompressedOops {
                    heap: self.max_heap_size,
                    limit,
                });
            }
        }
        if self.use_compressed_class_pointers {
            if table.class_pointers_need_compressed_oops && !self.use_compressed_oops {
                return Err(LayoutError::ClassPointersRequireCompressedOops { arch: table.name });
            }
            if self.compressed_class_space_size > KLASS_ENCODING_METASPACE_MAX {
                return Err(LayoutError::ClassSpaceTooLarge {
                    size: self.compressed_class_space_size,
                    max: KLASS_ENCODING_METASPACE_MAX,
                });
            }
        }
        Ok(())
    }
}

/// Candidate base addresses for the compressed class space, in the order
/// they should be tried
#[derive(Debug, Clone)]
pub struct ClassSpaceCandidates {
    first: Option<u64>,
    next: u64,
    step: u64,
}

impl Iterator for ClassSpaceCandidates {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if let Some(first) = self.first.take() {
            return Some(first);
        }
        if self.step == 0 || self.next >= CLASS_SPACE_SEARCH_LIMIT {
            return None;
        }
        let addr = self.next;
        if addr == KLASS_ENCODING_METASPACE_MAX && self.step < UNSCALED_CLASS_SPACE_MAX {
            // zero-based encoding is out of reach from here on
            self.step = UNSCALED_CLASS_SPACE_MAX;
        }
        self.next = addr.saturating_add(self.step);
        Some(addr)
    }
}

/// Addresses at which to try reserving a class space of `size` bytes.
///
/// Without a preferred alignment only `requested` is tried. With one,
/// `requested` is tried first if the space would end below 4 GiB (so class
/// pointers need neither base nor shift), then every aligned address from
/// `requested` upward below [`CLASS_SPACE_SEARCH_LIMIT`]. Above
/// [`KLASS_ENCODING_METASPACE_MAX`] the walk steps by at least 4 GiB. No
/// aligned address is produced when `requested` cannot be rounded up.
pub fn class_space_candidates(table: &TraitTable, requested: u64, size: u64) -> ClassSpaceCandidates {
    match table.preferred_metaspace_alignment {
        None => ClassSpaceCandidates {
            first: Some(requested),
            next: 0,
            step: 0,
        },
        Some(align) => {
            let start = checked_align_up(requested, align);
            let low_fit = requested.saturating_add(size) < UNSCALED_CLASS_SPACE_MAX;
            ClassSpaceCandidates {
                // avoid trying the same address twice
                first: if low_fit && start != Some(requested) {
                    Some(requested)
                } else {
                    None
                },
                next: start.unwrap_or(CLASS_SPACE_SEARCH_LIMIT),
                step: align,
            }
        }
    }
}

/// Reserve a class space with `try_reserve` and derive its encoding.
///
/// `try_reserve(addr, size)` returns whether the range could be reserved.
/// It is only called for ranges a [`KlassEncoding`] can cover, and never
/// when `size` exceeds [`KLASS_ENCODING_METASPACE_MAX`].
pub fn place_class_space<F>(
    table: &TraitTable,
    requested: u64,
    size: u64,
    mut try_reserve: F,
) -> Option<KlassEncoding>
where
    F: FnMut(u64, u64) -> bool,
{
    if size == 0 || size > KLASS_ENCODING_METASPACE_MAX {
        log::warn!(
            "{}: class space size {:#x} cannot be encoded",
            table.name,
            size
        );
        return None;
    }
    for addr in class_space_candidates(table, requested, size) {
        let Some(encoding) = KlassEncoding::new(addr, size) else {
            continue;
        };
        if try_reserve(addr, size) {
            log::debug!("{}: class space at {:#x} (+{:#x})", table.name, addr, size);
            return Some(encoding);
        }
        log::trace!("{}: class space at {:#x} unavailable", table.name, addr);
    }
    None
}

/// Narrow class pointer encoding of a class space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KlassEncoding {
    base: u64,
    shift: u32,
    range: u64,
}

impl KlassEncoding {
    /// Encoding for a class space at `addr` of `len` bytes.
    ///
    /// A zero base is used when the space ends below the scaled encoding
    /// limit, and no shift when the resulting range fits in 32 bits. `None`
    /// for an empty space, one larger than [`KLASS_ENCODING_METASPACE_MAX`],
    /// or one that runs past the end of the address space.
    pub fn new(addr: u64, len: u64) -> Option<Self> {
        if len == 0 || len > KLASS_ENCODING_METASPACE_MAX {
            return None;
        }
        let end = addr.checked_add(len)?;
        let base = if end <= KLASS_ENCODING_METASPACE_MAX {
            0
        } else {
            addr
        };
        let range = end - base;
        let shift = if range < UNSCALED_CLASS_SPACE_MAX {
            0
        } else {
            LOG_KLASS_ALIGNMENT
        };
        Some(KlassEncoding { base, shift, range })
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn shift(&self) -> u32 {
        self.shift
    }

    pub fn range(&self) -> u64 {
        self.range
    }

    /// Decoding needs no add when the base is zero
    pub fn is_zero_based(&self) -> bool {
        self.base == 0
    }

    /// Narrow form of `klass`, if it lies in the encoded range with the
    /// required alignment
    pub fn encode(&self, klass: u64) -> Option<u32> {
        let offset = klass.checked_sub(self.base)?;
        if offset >= self.range || offset & ((1u64 << self.shift) - 1) != 0 {
            return None;
        }
        u32::try_from(offset >> self.shift).ok()
    }

    pub fn decode(&self, narrow: u32) -> u64 {
        self.base + ((narrow as u64) << self.shift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{aarch64::AArch64, mips64::Mips64, riscv64::Riscv64, table_of};

    fn dependent_table() -> TraitTable {
        TraitTable {
            class_pointers_need_compressed_oops: true,
            ..table_of::<Mips64>()
        }
    }

    #[test]
    fn test_class_pointers_without_oops_on_mips64() {
        let t = table_of::<Mips64>();
        let config = LayoutConfig {
            use_compressed_oops: false,
            use_compressed_class_pointers: true,
            max_heap_size: 64 * G,
            compressed_class_space_size: G,
            page_size: 4096,
        };
        assert_eq!(config.validate(&t), Ok(()));
    }

    #[test]
    fn test_class_pointers_without_oops_on_dependent_table() {
        let t = dependent_table();
        let config = LayoutConfig {
            use_compressed_oops: false,
            use_compressed_class_pointers: true,
            max_heap_size: 64 * G,
            compressed_class_space_size: G,
            page_size: 4096,
        };
        assert_eq!(
            config.validate(&t),
            Err(LayoutError::ClassPointersRequireCompressedOops { arch: "mips64" })
        );
    }

    #[test]
    fn test_resolve_defaults() {
        let config = LayoutConfig::resolve(&table_of::<Mips64>(), &LayoutRequest::default());
        assert!(config.use_compressed_oops);
        assert!(config.use_compressed_class_pointers);
    }

    #[test]
    fn test_resolve_large_heap_keeps_class_pointers() {
        let request = LayoutRequest {
            max_heap_size: 64 * G,
            ..LayoutRequest::default()
        };
        let config = LayoutConfig::resolve(&table_of::<Mips64>(), &request);
        assert!(!config.use_compressed_oops);
        assert!(config.use_compressed_class_pointers);

        let config = LayoutConfig::resolve(&dependent_table(), &request);
        assert!(!config.use_compressed_oops);
        assert!(!config.use_compressed_class_pointers);
    }

    #[test]
    fn test_resolve_explicit_conflict_downgrades() {
        let request = LayoutRequest {
            use_compressed_oops: Some(false),
            use_compressed_class_pointers: Some(true),
            ..LayoutRequest::default()
        };
        let t = dependent_table();
        let config = LayoutConfig::resolve(&t, &request);
        assert!(!config.use_compressed_class_pointers);
        assert_eq!(config.validate(&t), Ok(()));

        let t = table_of::<Mips64>();
        let config = LayoutConfig::resolve(&t, &request);
        assert!(!config.use_compressed_oops);
        assert!(config.use_compressed_class_pointers);
    }

    #[test]
    fn test_resolve_class_space_too_large() {
        let request = LayoutRequest {
            compressed_class_space_size: 64 * G,
            ..LayoutRequest::default()
        };
        let config = LayoutConfig::resolve(&table_of::<Mips64>(), &request);
        assert!(!config.use_compressed_class_pointers);
    }

    #[test]
    fn test_32bit_table_rejects_compression() {
        let t = TraitTable {
            word_size: 4,
            stack_alignment: 8,
            ..table_of::<Mips64>()
        };
        let config = LayoutConfig::resolve(&t, &LayoutRequest::default());
        assert!(!config.use_compressed_oops);
        assert!(!config.use_compressed_class_pointers);

        let forced = LayoutConfig {
            use_compressed_oops: true,
            ..config
        };
        assert_eq!(
            forced.validate(&t),
            Err(LayoutError::CompressedPointersOn32Bit { arch: "mips64" })
        );
    }

    #[test]
    fn test_candidates_without_preference() {
        let t = table_of::<Riscv64>();
        let all: Vec<u64> = class_space_candidates(&t, 0x8_0000_0000, G).collect();
        assert_eq!(all, vec![0x8_0000_0000]);
    }

    #[test]
    fn test_candidates_mips64() {
        let t = table_of::<Mips64>();
        let mut it = class_space_candidates(&t, 0x8000_1000, G);
        // low address tried first, then 1G steps
        assert_eq!(it.next(), Some(0x8000_1000));
        assert_eq!(it.next(), Some(3 * G));
        assert_eq!(it.next(), Some(4 * G));
        assert_eq!(it.last(), Some(1020 * G));
    }

    #[test]
    fn test_candidates_speed_up_past_zero_based_range() {
        let t = table_of::<Mips64>();
        let mut it = class_space_candidates(&t, 31 * G, G);
        assert_eq!(it.next(), Some(31 * G));
        assert_eq!(it.next(), Some(32 * G));
        assert_eq!(it.next(), Some(36 * G));
        assert_eq!(it.next(), Some(40 * G));

        // already 4G steps on aarch64, unchanged
        let t = table_of::<AArch64>();
        let all: Vec<u64> = class_space_candidates(&t, 28 * G, G).take(3).collect();
        assert_eq!(all, vec![28 * G, 32 * G, 36 * G]);
    }

    #[test]
    fn test_candidates_near_address_space_end() {
        let t = table_of::<Mips64>();
        assert_eq!(class_space_candidates(&t, u64::MAX - 0x1000, 0x1000).count(), 0);

        // no preference: the requested address is still the only candidate
        let t = table_of::<Riscv64>();
        let all: Vec<u64> = class_space_candidates(&t, u64::MAX - 0x1000, 0x1000).collect();
        assert_eq!(all, vec![u64::MAX - 0x1000]);
    }

    #[test]
    fn test_huge_page_size_disables_compressed_oops() {
        assert_eq!(max_heap_for_compressed_oops(64 << 30), 0);
        assert_eq!(max_heap_for_compressed_oops(4096), OOP_ENCODING_HEAP_MAX - 4096);

        let t = table_of::<Mips64>();
        let request = LayoutRequest {
            page_size: 64 << 30,
            ..LayoutRequest::default()
        };
        let config = LayoutConfig::resolve(&t, &request);
        assert!(!config.use_compressed_oops);
        assert_eq!(config.validate(&t), Ok(()));

        let forced = LayoutConfig {
            use_compressed_oops: true,
            ..config
        };
        assert_eq!(
            forced.validate(&t),
            Err(LayoutError::HeapTooLargeForCompressedOops { heap: G, limit: 0 })
        );
    }

    #[test]
    fn test_candidates_aarch64_step() {
        let t = table_of::<AArch64>();
        let mut it = class_space_candidates(&t, 5 * G, G);
        assert_eq!(it.next(), Some(8 * G));
        assert_eq!(it.next(), Some(12 * G));
    }

    #[test]
    fn test_place_class_space() {
        let t = table_of::<Mips64>();
        // everything below 8G is taken
        let enc = place_class_space(&t, 0x8000_1000, G, |addr, _| addr >= 8 * G).unwrap();
        assert_eq!(enc.base(), 0);
        assert_eq!(enc.shift(), LOG_KLASS_ALIGNMENT);
        assert!(enc.is_zero_based());

        assert!(place_class_space(&t, 0x8000_1000, G, |_, _| false).is_none());
    }

    #[test]
    fn test_place_class_space_rejects_unencodable_size() {
        let t = table_of::<Mips64>();
        let mut calls = 0;
        let placed = place_class_space(&t, 0, 40 * G, |_, _| {
            calls += 1;
            true
        });
        assert!(placed.is_none());
        assert_eq!(calls, 0);

        // the requested address would run past the end of the address space
        let t = table_of::<Riscv64>();
        assert!(place_class_space(&t, u64::MAX - G, 2 * G, |_, _| true).is_none());
    }

    #[test]
    fn test_klass_encoding_modes() {
        let low = KlassEncoding::new(0x8000_0000, G).unwrap();
        assert_eq!((low.base(), low.shift()), (0, 0));

        let zero_based = KlassEncoding::new(16 * G, G).unwrap();
        assert_eq!((zero_based.base(), zero_based.shift()), (0, 3));

        let based = KlassEncoding::new(64 * G, G).unwrap();
        assert_eq!((based.base(), based.shift()), (64 * G, 0));
        assert!(!based.is_zero_based());

        let widest = KlassEncoding::new(64 * G, KLASS_ENCODING_METASPACE_MAX).unwrap();
        assert_eq!((widest.base(), widest.shift()), (64 * G, 3));
        let last = 64 * G + KLASS_ENCODING_METASPACE_MAX - 8;
        assert_eq!(widest.decode(widest.encode(last).unwrap()), last);
    }

    #[test]
    fn test_klass_encoding_rejects_uncoverable_ranges() {
        assert_eq!(KlassEncoding::new(64 * G, 40 * G), None);
        assert_eq!(KlassEncoding::new(0, KLASS_ENCODING_METASPACE_MAX + 8), None);
        assert_eq!(KlassEncoding::new(16 * G, 0), None);
        assert_eq!(KlassEncoding::new(u64::MAX - G, 2 * G), None);
    }

    #[test]
    fn test_klass_encode_decode() {
        let enc = KlassEncoding::new(16 * G, G).unwrap();
        let klass = 16 * G + 0x1238;
        let narrow = enc.encode(klass).unwrap();
        assert_eq!(enc.decode(narrow), klass);
        // misaligned for shift 3
        assert_eq!(enc.encode(klass + 4), None);
        // outside the range
        assert_eq!(enc.encode(17 * G), None);

        let based = KlassEncoding::new(64 * G, G).unwrap();
        assert_eq!(based.encode(G), None);
        assert_eq!(based.decode(based.encode(64 * G + 0x40).unwrap()), 64 * G + 0x40);
    }
}
