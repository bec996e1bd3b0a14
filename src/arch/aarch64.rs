//! AArch64 architecture table

use crate::arch::Architecture;
use crate::types::{PlatformDefaults, StackPages, G};

pub struct AArch64;

impl Architecture for AArch64 {
    const NAME: &'static str = "aarch64";
    const WORD_SIZE: usize = 8;
    const INSTRUCTION_WORD_SIZE: usize = 4;
    // AAPCS64: sp must be 16-byte aligned at all times
    const STACK_ALIGNMENT: usize = 16;
    const INTS_AS_LONGS: bool = false;
    const NATIVE_CX8: bool = true;
    const RESERVED_STACK_AREA: bool = true;
    // A 4G-aligned class space base decodes with a single movk
    const PREFERRED_METASPACE_ALIGNMENT: Option<u64> = Some(4 * G);
    const CLASS_POINTERS_NEED_COMPRESSED_OOPS: bool = false;

    const DEFAULTS: PlatformDefaults = PlatformDefaults {
        code_entry_alignment: 64,
        opto_loop_alignment: 16,
        code_cache_segment_size: 64,
        inline_small_code: 1000,
        stack_pages: StackPages {
            yellow: 2,
            red: 1,
            reserved: 1,
            shadow: 20,
        },
        min_stack_pages: StackPages {
            yellow: 2,
            red: 1,
            reserved: 0,
            shadow: 20,
        },
    };
}

assert_table!(AArch64);
