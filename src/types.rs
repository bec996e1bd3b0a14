//! Common types shared by the architecture tables and their consumers
//!
//! This module defines the typed record every architecture fills in, so that
//! the tables and the consumer modules do not depend on each other.

use core::fmt;

/// One kibibyte
pub const K: u64 = 1024;
/// One mebibyte
pub const M: u64 = K * K;
/// One gibibyte
pub const G: u64 = M * K;

/// Stack guard page counts, one per guard zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StackPages {
    /// Yellow zone: overflow is reported as an exception
    pub yellow: usize,
    /// Red zone: overflow is fatal
    pub red: usize,
    /// Reserved zone for critical sections (0 when unsupported)
    pub reserved: usize,
    /// Shadow zone banged ahead of calls into native code
    pub shadow: usize,
}

/// Platform-dependent default values of runtime flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PlatformDefaults {
    pub code_entry_alignment: usize,
    pub opto_loop_alignment: usize,
    pub code_cache_segment_size: usize,
    /// Bytecode size limit for inlining already-compiled methods
    pub inline_small_code: usize,
    pub stack_pages: StackPages,
    pub min_stack_pages: StackPages,
}

/// The complete trait table of one architecture.
///
/// Every field is required and there is no `Default`. Tables are built from
/// an [`Architecture`](crate::arch::Architecture) implementation through
/// [`table_of`](crate::arch::table_of).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TraitTable {
    pub name: &'static str,
    /// Native pointer size in bytes
    pub word_size: usize,
    /// Bytes per native instruction word
    pub instruction_word_size: usize,
    /// Required alignment of the stack pointer at calls
    pub stack_alignment: usize,
    /// C calling convention wants 32-bit ints extended to 64 bits
    pub ints_as_longs: bool,
    /// Native 8-byte compare-and-swap
    pub native_cx8: bool,
    pub reserved_stack_area: bool,
    /// Search increment for the compressed class space base, if preferred
    pub preferred_metaspace_alignment: Option<u64>,
    pub class_pointers_need_compressed_oops: bool,
    pub defaults: PlatformDefaults,
}

impl fmt::Display for StackPages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "yellow={} red={} reserved={} shadow={}",
            self.yellow, self.red, self.reserved, self.shadow
        )
    }
}

impl fmt::Display for TraitTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "arch                                  {}", self.name)?;
        writeln!(f, "word_size                             {}", self.word_size)?;
        writeln!(f, "instruction_word_size                 {}", self.instruction_word_size)?;
        writeln!(f, "stack_alignment                       {}", self.stack_alignment)?;
        writeln!(f, "ints_as_longs                         {}", self.ints_as_longs)?;
        writeln!(f, "native_cx8                            {}", self.native_cx8)?;
        writeln!(f, "reserved_stack_area                   {}", self.reserved_stack_area)?;
        match self.preferred_metaspace_alignment {
            Some(align) => writeln!(f, "preferred_metaspace_alignment         {:#x}", align)?,
            None => writeln!(f, "preferred_metaspace_alignment         none")?,
        }
        writeln!(
            f,
            "class_pointers_need_compressed_oops   {}",
            self.class_pointers_need_compressed_oops
        )?;
        let d = &self.defaults;
        writeln!(f, "code_entry_alignment                  {}", d.code_entry_alignment)?;
        writeln!(f, "opto_loop_alignment                   {}", d.opto_loop_alignment)?;
        writeln!(f, "code_cache_segment_size               {}", d.code_cache_segment_size)?;
        writeln!(f, "inline_small_code                     {}", d.inline_small_code)?;
        writeln!(f, "stack_pages                           {}", d.stack_pages)?;
        write!(f, "min_stack_pages                       {}", d.min_stack_pages)
    }
}

/// Round `value` up to a multiple of `align` (a power of two)
#[inline]
pub const fn align_up(value: u64, align: u64) -> u64 {
    (value + align - 1) & !(align - 1)
}

/// [`align_up`], or `None` if the rounded value does not fit in a `u64`
#[inline]
pub const fn checked_align_up(value: u64, align: u64) -> Option<u64> {
    match value.checked_add(align - 1) {
        Some(v) => Some(v & !(align - 1)),
        None => None,
    }
}

/// Round `value` down to a multiple of `align` (a power of two)
#[inline]
pub const fn align_down(value: u64, align: u64) -> u64 {
    value & !(align - 1)
}
