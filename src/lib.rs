//! vm-archdefs - build-time architecture trait tables for a VM runtime
//!
//! This crate tells the architecture-independent parts of a virtual machine
//! runtime (code generator, calling-convention adapter, atomics, stack
//! overflow handling, metaspace layout) the facts they must respect on the
//! CPU family the runtime is built for.
//!
//! Exactly one table is compiled in, chosen by a cargo feature (`mips64` by
//! default) or, with no feature, by the compilation target. Retargeting the
//! runtime means selecting another table; nothing else changes.
//!
//! ```
//! assert_eq!(vm_archdefs::instruction_word_size(), 4);
//! assert_eq!(vm_archdefs::stack_alignment_bytes() % vm_archdefs::pointer_size(), 0);
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]

// Core types
pub mod error;
pub mod types;

// Trait tables
pub mod arch;

// Consumers of the tables
pub mod abi;
pub mod atomic;
pub mod metaspace;
pub mod stack;

// Re-exports
pub use arch::{Architecture, Selected, SELECTED};
pub use error::*;
pub use types::{PlatformDefaults, StackPages, TraitTable};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The full table compiled into this build
#[inline]
pub const fn table() -> TraitTable {
    SELECTED
}

/// Bytes per native instruction word
#[inline]
pub const fn instruction_word_size() -> usize {
    SELECTED.instruction_word_size
}

/// Required stack pointer alignment in bytes
#[inline]
pub const fn stack_alignment_bytes() -> usize {
    SELECTED.stack_alignment
}

/// Native pointer size in bytes
#[inline]
pub const fn pointer_size() -> usize {
    SELECTED.word_size
}

/// Whether 32-bit integer arguments must be widened to 64 bits for C calls
#[inline]
pub const fn calling_convention_requires_int_promotion() -> bool {
    SELECTED.ints_as_longs
}

/// Whether the CPU has a native 8-byte compare-and-swap
#[inline]
pub const fn supports_native_compare_and_swap_8byte() -> bool {
    SELECTED.native_cx8
}

/// Whether the reserved stack area is supported
#[inline]
pub const fn supports_reserved_stack_area() -> bool {
    SELECTED.reserved_stack_area
}

/// Preferred alignment of the compressed class space base, if any
#[inline]
pub const fn preferred_metaspace_alignment() -> Option<u64> {
    SELECTED.preferred_metaspace_alignment
}

/// Whether compressed class pointers can only be enabled with compressed oops
#[inline]
pub const fn compressed_class_pointers_depend_on_compressed_oops() -> bool {
    SELECTED.class_pointers_need_compressed_oops
}

/// Platform-dependent flag defaults
#[inline]
pub const fn platform_defaults() -> PlatformDefaults {
    SELECTED.defaults
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_match_selected() {
        let t = table();
        assert_eq!(instruction_word_size(), t.instruction_word_size);
        assert_eq!(stack_alignment_bytes(), t.stack_alignment);
        assert_eq!(pointer_size(), t.word_size);
        assert_eq!(calling_convention_requires_int_promotion(), t.ints_as_longs);
        assert_eq!(supports_native_compare_and_swap_8byte(), t.native_cx8);
        assert_eq!(supports_reserved_stack_area(), t.reserved_stack_area);
        assert_eq!(preferred_metaspace_alignment(), t.preferred_metaspace_alignment);
        assert_eq!(
            compressed_class_pointers_depend_on_compressed_oops(),
            t.class_pointers_need_compressed_oops
        );
        assert_eq!(platform_defaults(), t.defaults);
    }

    #[test]
    fn test_selected_is_usable_in_const() {
        const ALIGN: usize = stack_alignment_bytes();
        const WORD: usize = pointer_size();
        assert!(ALIGN >= WORD);
        assert_eq!(ALIGN % WORD, 0);
    }

    #[test]
    fn test_selected_matches_trait_consts() {
        assert_eq!(SELECTED.name, <Selected as Architecture>::NAME);
        assert_eq!(
            SELECTED.instruction_word_size,
            <Selected as Architecture>::INSTRUCTION_WORD_SIZE
        );
    }
}
