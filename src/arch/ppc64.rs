//! PowerPC64 (ELFv2) architecture table
//!
//! The only table whose C calling convention wants int arguments widened to
//! full 64-bit slots by the caller.

use crate::arch::Architecture;
use crate::types::{PlatformDefaults, StackPages};

pub struct Ppc64;

impl Architecture for Ppc64 {
    const NAME: &'static str = "ppc64";
    const WORD_SIZE: usize = 8;
    const INSTRUCTION_WORD_SIZE: usize = 4;
    const STACK_ALIGNMENT: usize = 16;
    const INTS_AS_LONGS: bool = true;
    // ldarx/stdcx.
    const NATIVE_CX8: bool = true;
    const RESERVED_STACK_AREA: bool = true;
    const PREFERRED_METASPACE_ALIGNMENT: Option<u64> = None;
    const CLASS_POINTERS_NEED_COMPRESSED_OOPS: bool = false;

    const DEFAULTS: PlatformDefaults = PlatformDefaults {
        code_entry_alignment: 64,
        opto_loop_alignment: 16,
        code_cache_segment_size: 128,
        inline_small_code: 1500,
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
            shadow: 3,
        },
    };
}

assert_table!(Ppc64);
