//! LoongArch64 architecture table
//!
//! Same Loongson port family as MIPS64, so the runtime-facing traits line up
//! with the MIPS64 table; only the code generation defaults differ.

use crate::arch::Architecture;
use crate::types::{PlatformDefaults, StackPages, G};

pub struct LoongArch64;

impl Architecture for LoongArch64 {
    const NAME: &'static str = "loongarch64";
    const WORD_SIZE: usize = 8;
    const INSTRUCTION_WORD_SIZE: usize = 4;
    const STACK_ALIGNMENT: usize = 2 * Self::WORD_SIZE;
    const INTS_AS_LONGS: bool = false;
    // ll.d/sc.d
    const NATIVE_CX8: bool = true;
    const RESERVED_STACK_AREA: bool = true;
    const PREFERRED_METASPACE_ALIGNMENT: Option<u64> = Some(G);
    const CLASS_POINTERS_NEED_COMPRESSED_OOPS: bool = false;

    const DEFAULTS: PlatformDefaults = PlatformDefaults {
        code_entry_alignment: 64,
        opto_loop_alignment: 16,
        code_cache_segment_size: 64,
        inline_small_code: 2000,
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

assert_table!(LoongArch64);
