//! Native calling convention signatures
//!
//! Turns the argument list of a Java method into the argument list of its
//! JNI native entry point, honouring the table's int promotion rule: when the
//! C calling convention wants ints as longs, every sub-long integer argument
//! takes a full 64-bit slot pair and must be sign or zero extended first.

use heapless::Vec;

use crate::error::AbiError;
use crate::types::{align_up, TraitTable};

/// Maximum number of Java argument slots a method may have
pub const MAX_JAVA_ARG_SLOTS: usize = 255;

/// JNIEnv* plus the class mirror of static methods
const HIDDEN_ARGS: usize = 2;

/// Upper bound on the number of native arguments
pub const MAX_NATIVE_ARGS: usize = MAX_JAVA_ARG_SLOTS + HIDDEN_ARGS;

/// Bytes per VM register/stack slot
pub const STACK_SLOT_SIZE: usize = 4;

/// Basic value types of the VM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicType {
    Boolean,
    Char,
    Float,
    Double,
    Byte,
    Short,
    Int,
    Long,
    Object,
    Array,
    Address,
    Void,
}

impl BasicType {
    /// Java expression stack slots taken by a value of this type
    pub const fn java_slots(self) -> usize {
        match self {
            BasicType::Long | BasicType::Double => 2,
            BasicType::Void => 0,
            _ => 1,
        }
    }

    /// Integer types narrower than a long
    pub const fn is_subword_int(self) -> bool {
        matches!(
            self,
            BasicType::Boolean
                | BasicType::Char
                | BasicType::Byte
                | BasicType::Short
                | BasicType::Int
        )
    }

    pub const fn is_reference(self) -> bool {
        matches!(
            self,
            BasicType::Object | BasicType::Array | BasicType::Address
        )
    }
}

/// How an argument must be widened before the call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    None,
    Sign,
    Zero,
}

/// One argument of a native call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeArg {
    pub ty: BasicType,
    /// VM stack slots used by the argument
    pub slots: usize,
    pub extension: Extension,
}

/// Argument list of a native entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeSignature {
    args: Vec<NativeArg, MAX_NATIVE_ARGS>,
    slots: usize,
}

impl NativeSignature {
    pub fn args(&self) -> &[NativeArg] {
        &self.args
    }

    /// Total VM stack slots over all arguments
    pub fn total_slots(&self) -> usize {
        self.slots
    }

    /// Size of an outgoing argument area holding every argument on the
    /// stack, rounded to the table's stack alignment
    pub fn outgoing_stack_bytes(&self, table: &TraitTable) -> usize {
        align_up(
            (self.slots * STACK_SLOT_SIZE) as u64,
            table.stack_alignment as u64,
        ) as usize
    }
}

fn native_arg(table: &TraitTable, ty: BasicType) -> NativeArg {
    let word_slots = table.word_size / STACK_SLOT_SIZE;
    let (slots, extension) = match ty {
        BasicType::Long | BasicType::Double => (2, Extension::None),
        t if t.is_reference() => (word_slots, Extension::None),
        BasicType::Boolean | BasicType::Char if table.ints_as_longs => (2, Extension::Zero),
        BasicType::Byte | BasicType::Short | BasicType::Int if table.ints_as_longs => {
            (2, Extension::Sign)
        }
        _ => (1, Extension::None),
    };
    NativeArg {
        ty,
        slots,
        extension,
    }
}

/// Build the native signature of a JNI method.
///
/// `java_args` includes the receiver of instance methods. Static methods get
/// the class mirror as a hidden second argument.
pub fn native_signature(
    table: &TraitTable,
    java_args: &[BasicType],
    is_static: bool,
) -> Result<NativeSignature, AbiError> {
    if java_args.contains(&BasicType::Void) {
        return Err(AbiError::VoidArgument);
    }
    let java_slots: usize = java_args.iter().map(|t| t.java_slots()).sum();
    if java_slots > MAX_JAVA_ARG_SLOTS {
        return Err(AbiError::TooManyArguments {
            count: java_slots,
            max: MAX_JAVA_ARG_SLOTS,
        });
    }

    let hidden: &[BasicType] = if is_static {
        &[BasicType::Address, BasicType::Object]
    } else {
        &[BasicType::Address]
    };

    let mut args = Vec::new();
    let mut slots = 0;
    for &ty in hidden.iter().chain(java_args.iter()) {
        let arg = native_arg(table, ty);
        slots += arg.slots;
        args.push(arg).map_err(|_| AbiError::TooManyArguments {
            count: hidden.len() + java_args.len(),
            max: MAX_NATIVE_ARGS,
        })?;
    }

    log::trace!(
        "{}: native signature with {} args, {} slots",
        table.name,
        args.len(),
        slots
    );
    Ok(NativeSignature { args, slots })
}
