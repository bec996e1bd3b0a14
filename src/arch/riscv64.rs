//! RISC-V 64 architecture table
//!
//! Compressed (2-byte) instructions exist but generated code is laid out in
//! 4-byte words.

use crate::arch::Architecture;
use crate::types::{PlatformDefaults, StackPages};

pub struct Riscv64;

impl Architecture for Riscv64 {
    const NAME: &'static str = "riscv64";
    const WORD_SIZE: usize = 8;
    const INSTRUCTION_WORD_SIZE: usize = 4;
    const STACK_ALIGNMENT: usize = 16;
    const INTS_AS_LONGS: bool = false;
    // lr.d/sc.d and amocas
    const NATIVE_CX8: bool = true;
    const RESERVED_STACK_AREA: bool = true;
    const PREFERRED_METASPACE_ALIGNMENT: Option<u64> = None;
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

assert_table!(Riscv64);
