//! Architecture trait tables
//!
//! Every supported CPU family states its full set of build-time constants by
//! implementing [`Architecture`]. None of the constants has a default, so a
//! table that forgets one does not compile, and each table is run through
//! [`check`] in a const item so a wrong value does not compile either.
//!
//! Exactly one table is selected per build (see `build.rs`) and exported as
//! [`Selected`] / [`SELECTED`]. All tables are plain data and are always
//! compiled, so tools and tests can compare them side by side.

use crate::error::TableDefect;
use crate::types::{PlatformDefaults, TraitTable};

/// Fails compilation if the table of `$arch` violates any invariant
macro_rules! assert_table {
    ($arch:ty) => {
        const _: () = match $crate::arch::check(&$crate::arch::table_of::<$arch>()) {
            Ok(()) => (),
            Err(defect) => panic!("{}", defect.as_str()),
        };
    };
}

// Architecture tables
pub mod aarch64;
pub mod loongarch64;
pub mod mips64;
pub mod ppc64;
pub mod riscv64;

/// The traits every architecture must state, with no inherited defaults
pub trait Architecture {
    /// Table name, matching the cargo feature that selects it
    const NAME: &'static str;

    /// Native pointer size in bytes
    const WORD_SIZE: usize;

    /// Bytes per native instruction word
    const INSTRUCTION_WORD_SIZE: usize;

    /// Required stack pointer alignment in bytes
    const STACK_ALIGNMENT: usize;

    /// Whether the C calling convention requires 32-bit integer arguments to
    /// be extended to 64 bits by the caller
    const INTS_AS_LONGS: bool;

    /// Whether the CPU has a native 8-byte compare-and-swap
    const NATIVE_CX8: bool;

    /// Whether the reserved stack area for critical sections is supported
    const RESERVED_STACK_AREA: bool;

    /// Alignment the compressed class space base should be searched at,
    /// or `None` to take whatever address the OS hands out
    const PREFERRED_METASPACE_ALIGNMENT: Option<u64>;

    /// Whether compressed class pointers can only be used together with
    /// compressed oops
    const CLASS_POINTERS_NEED_COMPRESSED_OOPS: bool;

    /// Platform-dependent flag defaults
    const DEFAULTS: PlatformDefaults;
}

/// Collect the constants of `A` into a [`TraitTable`]
pub const fn table_of<A: Architecture>() -> TraitTable {
    TraitTable {
        name: A::NAME,
        word_size: A::WORD_SIZE,
        instruction_word_size: A::INSTRUCTION_WORD_SIZE,
        stack_alignment: A::STACK_ALIGNMENT,
        ints_as_longs: A::INTS_AS_LONGS,
        native_cx8: A::NATIVE_CX8,
        reserved_stack_area: A::RESERVED_STACK_AREA,
        preferred_metaspace_alignment: A::PREFERRED_METASPACE_ALIGNMENT,
        class_pointers_need_compressed_oops: A::CLASS_POINTERS_NEED_COMPRESSED_OOPS,
        defaults: A::DEFAULTS,
    }
}

/// Check the internal consistency of a table.
///
/// This is a `const fn` so tables can be checked at compile time.
pub const fn check(t: &TraitTable) -> Result<(), TableDefect> {
    if t.word_size != 4 && t.word_size != 8 {
        return Err(TableDefect::WordSize);
    }
    if !t.instruction_word_size.is_power_of_two() || t.instruction_word_size > 8 {
        return Err(TableDefect::InstructionWordSize);
    }
    if t.stack_alignment % t.word_size != 0 {
        return Err(TableDefect::StackAlignmentNotWordMultiple);
    }
    if !t.stack_alignment.is_power_of_two() || t.stack_alignment < t.word_size {
        return Err(TableDefect::StackAlignmentTooSmall);
    }
    if let Some(align) = t.preferred_metaspace_alignment {
        if !align.is_power_of_two() {
            return Err(TableDefect::MetaspaceAlignment);
        }
    }

    let d = &t.defaults;
    if !d.code_entry_alignment.is_power_of_two()
        || !d.opto_loop_alignment.is_power_of_two()
        || !d.code_cache_segment_size.is_power_of_two()
    {
        return Err(TableDefect::CodeAlignment);
    }
    if d.opto_loop_alignment > d.code_entry_alignment {
        return Err(TableDefect::LoopAlignmentExceedsEntry);
    }
    if d.code_entry_alignment % t.instruction_word_size != 0 {
        return Err(TableDefect::EntryAlignmentNotInstructionMultiple);
    }

    let (pages, min) = (&d.stack_pages, &d.min_stack_pages);
    if pages.yellow < min.yellow
        || pages.red < min.red
        || pages.reserved < min.reserved
        || pages.shadow < min.shadow
    {
        return Err(TableDefect::StackPagesBelowMinimum);
    }
    if !t.reserved_stack_area && (pages.reserved != 0 || min.reserved != 0) {
        return Err(TableDefect::ReservedPagesWithoutSupport);
    }

    Ok(())
}

// Build-time selection, driven by `cfg(arch_table = ...)` from build.rs

#[cfg(arch_table = "mips64")]
pub type Selected = mips64::Mips64;

#[cfg(arch_table = "loongarch64")]
pub type Selected = loongarch64::LoongArch64;

#[cfg(arch_table = "aarch64")]
pub type Selected = aarch64::AArch64;

#[cfg(arch_table = "riscv64")]
pub type Selected = riscv64::Riscv64;

#[cfg(arch_table = "ppc64")]
pub type Selected = ppc64::Ppc64;

/// The table compiled into this build
pub const SELECTED: TraitTable = table_of::<Selected>();

/// Every table known to this crate, selected or not
pub static ALL: [TraitTable; 5] = [
    table_of::<mips64::Mips64>(),
    table_of::<loongarch64::LoongArch64>(),
    table_of::<aarch64::AArch64>(),
    table_of::<riscv64::Riscv64>(),
    table_of::<ppc64::Ppc64>(),
];

/// Look up a table by name
pub fn by_name(name: &str) -> Option<&'static TraitTable> {
    ALL.iter().find(|t| t.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StackPages;

    fn base() -> TraitTable {
        table_of::<mips64::Mips64>()
    }

    #[test]
    fn test_all_tables_pass_check() {
        for table in ALL.iter() {
            assert_eq!(check(table), Ok(()), "table {}", table.name);
        }
    }

    #[test]
    fn test_table_names_unique() {
        for (i, a) in ALL.iter().enumerate() {
            for b in ALL.iter().skip(i + 1) {
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn test_selected_is_listed() {
        assert_eq!(by_name(SELECTED.name), Some(&SELECTED));
        assert!(by_name("sparc").is_none());
    }

    #[test]
    fn test_check_word_size() {
        let t = TraitTable {
            word_size: 2,
            ..base()
        };
        assert_eq!(check(&t), Err(TableDefect::WordSize));
    }

    #[test]
    fn test_check_instruction_word() {
        let t = TraitTable {
            instruction_word_size: 3,
            ..base()
        };
        assert_eq!(check(&t), Err(TableDefect::InstructionWordSize));

        let t = TraitTable {
            instruction_word_size: 0,
            ..base()
        };
        assert_eq!(check(&t), Err(TableDefect::InstructionWordSize));
    }

    #[test]
    fn test_check_stack_alignment() {
        let t = TraitTable {
            stack_alignment: 12,
            ..base()
        };
        assert_eq!(check(&t), Err(TableDefect::StackAlignmentNotWordMultiple));

        let t = TraitTable {
            stack_alignment: 24,
            ..base()
        };
        assert_eq!(check(&t), Err(TableDefect::StackAlignmentTooSmall));

        let t = TraitTable {
            word_size: 4,
            stack_alignment: 4,
            ..base()
        };
        assert_eq!(check(&t), Ok(()));
    }

    #[test]
    fn test_check_metaspace_alignment() {
        let t = TraitTable {
            preferred_metaspace_alignment: Some(3 << 30),
            ..base()
        };
        assert_eq!(check(&t), Err(TableDefect::MetaspaceAlignment));

        let t = TraitTable {
            preferred_metaspace_alignment: None,
            ..base()
        };
        assert_eq!(check(&t), Ok(()));
    }

    #[test]
    fn test_check_code_alignment() {
        let mut t = base();
        t.defaults.opto_loop_alignment = 32;
        t.defaults.code_entry_alignment = 16;
        assert_eq!(check(&t), Err(TableDefect::LoopAlignmentExceedsEntry));

        let mut t = base();
        t.defaults.code_cache_segment_size = 48;
        assert_eq!(check(&t), Err(TableDefect::CodeAlignment));

        let mut t = base();
        t.instruction_word_size = 8;
        t.defaults.code_entry_alignment = 4;
        t.defaults.opto_loop_alignment = 4;
        assert_eq!(
            check(&t),
            Err(TableDefect::EntryAlignmentNotInstructionMultiple)
        );
    }

    #[test]
    fn test_check_reserved_pages_need_support() {
        let mut t = base();
        t.reserved_stack_area = false;
        assert_eq!(check(&t), Err(TableDefect::ReservedPagesWithoutSupport));

        t.defaults.stack_pages.reserved = 0;
        assert_eq!(check(&t), Ok(()));
    }

    #[test]
    fn test_check_pages_below_minimum() {
        let mut t = base();
        t.defaults.min_stack_pages = StackPages {
            yellow: 3,
            ..t.defaults.stack_pages
        };
        assert_eq!(check(&t), Err(TableDefect::StackPagesBelowMinimum));
    }

    #[test]
    fn test_defect_message_matches_display() {
        let defects = [
            TableDefect::WordSize,
            TableDefect::InstructionWordSize,
            TableDefect::StackAlignmentTooSmall,
            TableDefect::StackAlignmentNotWordMultiple,
            TableDefect::MetaspaceAlignment,
            TableDefect::CodeAlignment,
            TableDefect::LoopAlignmentExceedsEntry,
            TableDefect::EntryAlignmentNotInstructionMultiple,
            TableDefect::StackPagesBelowMinimum,
            TableDefect::ReservedPagesWithoutSupport,
        ];
        for defect in defects {
            assert_eq!(format!("{}", defect), defect.as_str());
        }
    }
}
