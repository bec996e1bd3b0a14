//! Error types for the trait tables and their consumers, using thiserror

use thiserror::Error;

/// A defect in an architecture table.
///
/// Produced by the const checker; a defective table fails to compile, so
/// these only surface at runtime when a table is built by hand (tests, tools).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableDefect {
    #[error("word size must be 4 or 8 bytes")]
    WordSize,

    #[error("instruction word size must be a power of two no larger than 8 bytes")]
    InstructionWordSize,

    #[error("stack alignment must be a power of two and at least the word size")]
    StackAlignmentTooSmall,

    #[error("stack alignment must be a multiple of the word size")]
    StackAlignmentNotWordMultiple,

    #[error("preferred metaspace alignment must be a power of two")]
    MetaspaceAlignment,

    #[error("code alignments and segment size must be powers of two")]
    CodeAlignment,

    #[error("loop alignment must not exceed code entry alignment")]
    LoopAlignmentExceedsEntry,

    #[error("code entry alignment must be a multiple of the instruction word size")]
    EntryAlignmentNotInstructionMultiple,

    #[error("default stack guard pages must not be below the minimums")]
    StackPagesBelowMinimum,

    #[error("reserved stack pages configured but reserved stack area is unsupported")]
    ReservedPagesWithoutSupport,
}

impl TableDefect {
    /// Message usable in const panics
    pub const fn as_str(&self) -> &'static str {
        match self {
            TableDefect::WordSize => "word size must be 4 or 8 bytes",
            TableDefect::InstructionWordSize => {
                "instruction word size must be a power of two no larger than 8 bytes"
            }
            TableDefect::StackAlignmentTooSmall => {
                "stack alignment must be a power of two and at least the word size"
            }
            TableDefect::StackAlignmentNotWordMultiple => {
                "stack alignment must be a multiple of the word size"
            }
            TableDefect::MetaspaceAlignment => "preferred metaspace alignment must be a power of two",
            TableDefect::CodeAlignment => "code alignments and segment size must be powers of two",
            TableDefect::LoopAlignmentExceedsEntry => {
                "loop alignment must not exceed code entry alignment"
            }
            TableDefect::EntryAlignmentNotInstructionMultiple => {
                "code entry alignment must be a multiple of the instruction word size"
            }
            TableDefect::StackPagesBelowMinimum => {
                "default stack guard pages must not be below the minimums"
            }
            TableDefect::ReservedPagesWithoutSupport => {
                "reserved stack pages configured but reserved stack area is unsupported"
            }
        }
    }
}

/// Memory layout (compressed pointers, class space) errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutError {
    #[error("compressed class pointers require compressed oops on {arch}")]
    ClassPointersRequireCompressedOops { arch: &'static str },

    #[error("compressed class pointers need a 64-bit word size on {arch}")]
    CompressedPointersOn32Bit { arch: &'static str },

    #[error("max heap size {heap:#x} too large for compressed oops (limit {limit:#x})")]
    HeapTooLargeForCompressedOops { heap: u64, limit: u64 },

    #[error("compressed class space size {size:#x} exceeds encoding range {max:#x}")]
    ClassSpaceTooLarge { size: u64, max: u64 },
}

/// Stack guard configuration errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    #[error("{zone} pages {value} outside of range [{min}..={max}]")]
    PagesOutOfRange {
        zone: &'static str,
        value: usize,
        min: usize,
        max: usize,
    },

    #[error("unusable page size {0:#x}")]
    PageSize(u64),

    #[error("stack of {size:#x} bytes too small for {guard:#x} bytes of guard zones")]
    StackTooSmall { size: u64, guard: u64 },

    #[error("stack base {0:#x} is not page aligned")]
    UnalignedBase(u64),
}

/// Native calling convention errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiError {
    #[error("too many arguments: {count} slots > {max}")]
    TooManyArguments { count: usize, max: usize },

    #[error("void is not a valid argument type")]
    VoidArgument,
}
