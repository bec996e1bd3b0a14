//! MIPS64 architecture table
//!
//! Covers the 64-bit Loongson MIPS cores (GS464, GS464E, GS264). Instructions
//! are a fixed 4 bytes and the n64 ABI keeps 32-bit values sign-extended in
//! registers, so the C calling convention needs no promotion of int arguments.

use crate::arch::Architecture;
use crate::types::{PlatformDefaults, StackPages, G};

/// MIPS64 trait table
pub struct Mips64;

impl Architecture for Mips64 {
    const NAME: &'static str = "mips64";
    const WORD_SIZE: usize = 8;
    const INSTRUCTION_WORD_SIZE: usize = 4;
    const STACK_ALIGNMENT: usize = 2 * Self::WORD_SIZE;
    const INTS_AS_LONGS: bool = false;
    // lld/scd
    const NATIVE_CX8: bool = true;
    const RESERVED_STACK_AREA: bool = true;
    const PREFERRED_METASPACE_ALIGNMENT: Option<u64> = Some(G);
    const CLASS_POINTERS_NEED_COMPRESSED_OOPS: bool = false;

    const DEFAULTS: PlatformDefaults = PlatformDefaults {
        code_entry_alignment: 16,
        opto_loop_alignment: 16,
        code_cache_segment_size: 64,
        // MIPS needs about three times the instructions of x86 for the same code
        inline_small_code: 4000,
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

assert_table!(Mips64);
