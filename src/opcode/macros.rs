//! This module contains useful macros for working with bytecode and opcodes.

/// Constructs a bytecode input from the input instructions as literal opcodes.
///
/// # Usage
///
/// ```
/// use evm_synthesizer::{
///     bytecode,
///     opcode::{control, memory, Opcode},
/// };
///
/// let bytes = bytecode![
///     memory::PushN::new(1, vec![0x03]).unwrap(),
///     control::Jump,
///     control::JumpDest,
///     control::Stop,
/// ];
///
/// let mut expected: Vec<u8> = vec![];
/// expected.extend(memory::PushN::new(1, vec![0x03]).unwrap().encode());
/// expected.extend(control::Jump.encode());
/// expected.extend(control::JumpDest.encode());
/// expected.extend(control::Stop.encode());
///
/// assert_eq!(bytes, expected);
/// ```
#[macro_export]
macro_rules! bytecode {
    ($($path:expr),*$(,)?) => {{
        use $crate::opcode::Opcode;
        let mut vec: Vec<u8> = vec![];
        $(vec.extend($path.encode()));*;
        vec
    }};
}

/// Declares opcodes that can be decoded but not synthesized, each of which
/// fails with an unsupported opcode error when executed.
macro_rules! unsupported_opcodes {
    ($($(#[$meta:meta])* $name:ident => ($text:literal, $byte:literal, $gas:literal, $args:literal, $rets:literal)),* $(,)?) => {
        $(
            $(#[$meta])*
            ///
            /// # Errors
            ///
            /// Always fails with
            /// [`crate::error::execution::Error::UnsupportedOpcode`].
            #[derive(Copy, Clone, Debug, Eq, PartialEq)]
            pub struct $name;

            impl $crate::opcode::Opcode for $name {
                fn execute(&self, vm: &mut $crate::vm::VM) -> $crate::opcode::ExecuteResult {
                    $crate::opcode::util::unsupported(vm, $text)
                }

                fn synthesize(&self, vm: &mut $crate::vm::VM, _step: &$crate::vm::Step) -> $crate::opcode::ExecuteResult {
                    $crate::opcode::util::unsupported(vm, $text)
                }

                fn min_gas_cost(&self) -> usize {
                    $gas
                }

                fn arg_count(&self) -> usize {
                    $args
                }

                fn ret_count(&self) -> usize {
                    $rets
                }

                fn as_text_code(&self) -> String {
                    $text.into()
                }

                fn as_byte(&self) -> u8 {
                    $byte
                }
            }
        )*
    };
}

// Export them scoped
pub use bytecode;
pub(crate) use unsupported_opcodes;
