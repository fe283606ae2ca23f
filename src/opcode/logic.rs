//! Opcodes that perform comparisons and bitwise operations on the EVM.

use crate::{
    arith::ArithOp,
    opcode::{util, ExecuteResult, Opcode},
    vm::{Step, VM},
};

/// The `LT` opcode performs a less-than comparison.
///
/// # Semantics
///
/// | Stack Index | Input | Output  |
/// | :---------: | :---: | :-----: |
/// | 1           | `a`   | `a < b` |
/// | 2           | `b`   |         |
///
/// # Errors
///
/// Fails if there are not enough operands on the stack, or if the placement
/// computing the result cannot be recorded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Lt;

impl Opcode for Lt {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        util::execute_arith(vm, ArithOp::Lt)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        util::synthesize_arith(vm, ArithOp::Lt, step)
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        2
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        "LT".into()
    }

    fn as_byte(&self) -> u8 {
        0x10
    }
}

/// The `GT` opcode performs a greater-than comparison.
///
/// # Semantics
///
/// | Stack Index | Input | Output  |
/// | :---------: | :---: | :-----: |
/// | 1           | `a`   | `a > b` |
/// | 2           | `b`   |         |
///
/// # Errors
///
/// Fails if there are not enough operands on the stack, or if the placement
/// computing the result cannot be recorded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Gt;

impl Opcode for Gt {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        util::execute_arith(vm, ArithOp::Gt)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        util::synthesize_arith(vm, ArithOp::Gt, step)
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        2
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        "GT".into()
    }

    fn as_byte(&self) -> u8 {
        0x11
    }
}

/// The `SLT` opcode performs a less-than comparison, treating both operands as
/// signed two's complement integers.
///
/// # Semantics
///
/// | Stack Index | Input | Output  |
/// | :---------: | :---: | :-----: |
/// | 1           | `a`   | `a < b` |
/// | 2           | `b`   |         |
///
/// # Errors
///
/// Fails if there are not enough operands on the stack, or if the placement
/// computing the result cannot be recorded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SLt;

impl Opcode for SLt {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        util::execute_arith(vm, ArithOp::SLt)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        util::synthesize_arith(vm, ArithOp::SLt, step)
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        2
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        "SLT".into()
    }

    fn as_byte(&self) -> u8 {
        0x12
    }
}

/// The `SGT` opcode performs a greater-than comparison, treating both operands
/// as signed two's complement integers.
///
/// # Semantics
///
/// | Stack Index | Input | Output  |
/// | :---------: | :---: | :-----: |
/// | 1           | `a`   | `a > b` |
/// | 2           | `b`   |         |
///
/// # Errors
///
/// Fails if there are not enough operands on the stack, or if the placement
/// computing the result cannot be recorded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SGt;

impl Opcode for SGt {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        util::execute_arith(vm, ArithOp::SGt)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        util::synthesize_arith(vm, ArithOp::SGt, step)
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        2
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        "SGT".into()
    }

    fn as_byte(&self) -> u8 {
        0x13
    }
}

/// The `EQ` opcode performs an equality comparison.
///
/// # Semantics
///
/// | Stack Index | Input | Output   |
/// | :---------: | :---: | :------: |
/// | 1           | `a`   | `a == b` |
/// | 2           | `b`   |          |
///
/// # Errors
///
/// Fails if there are not enough operands on the stack, or if the placement
/// computing the result cannot be recorded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Eq;

impl Opcode for Eq {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        util::execute_arith(vm, ArithOp::Eq)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        util::synthesize_arith(vm, ArithOp::Eq, step)
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        2
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        "EQ".into()
    }

    fn as_byte(&self) -> u8 {
        0x14
    }
}

/// The `ISZERO` opcode checks if its operand is zero.
///
/// # Semantics
///
/// | Stack Index | Input | Output   |
/// | :---------: | :---: | :------: |
/// | 1           | `a`   | `a == 0` |
///
/// # Errors
///
/// Fails if there are not enough operands on the stack, or if the placement
/// computing the result cannot be recorded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct IsZero;

impl Opcode for IsZero {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        util::execute_arith(vm, ArithOp::IsZero)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        util::synthesize_arith(vm, ArithOp::IsZero, step)
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        1
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        "ISZERO".into()
    }

    fn as_byte(&self) -> u8 {
        0x15
    }
}

/// The `AND` opcode performs a bitwise conjunction of its operands.
///
/// # Semantics
///
/// | Stack Index | Input | Output  |
/// | :---------: | :---: | :-----: |
/// | 1           | `a`   | `a & b` |
/// | 2           | `b`   |         |
///
/// # Errors
///
/// Fails if there are not enough operands on the stack, or if the placement
/// computing the result cannot be recorded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct And;

impl Opcode for And {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        util::execute_arith(vm, ArithOp::And)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        util::synthesize_arith(vm, ArithOp::And, step)
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        2
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        "AND".into()
    }

    fn as_byte(&self) -> u8 {
        0x16
    }
}

/// The `OR` opcode performs a bitwise disjunction of its operands.
///
/// # Semantics
///
/// | Stack Index | Input | Output  |
/// | :---------: | :---: | :-----: |
/// | 1           | `a`   | `a | b` |
/// | 2           | `b`   |         |
///
/// # Errors
///
/// Fails if there are not enough operands on the stack, or if the placement
/// computing the result cannot be recorded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Or;

impl Opcode for Or {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        util::execute_arith(vm, ArithOp::Or)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        util::synthesize_arith(vm, ArithOp::Or, step)
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        2
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        "OR".into()
    }

    fn as_byte(&self) -> u8 {
        0x17
    }
}

/// The `XOR` opcode performs a bitwise exclusive disjunction of its operands
///
/// # Semantics
///
/// | Stack Index | Input | Output  |
/// | :---------: | :---: | :-----: |
/// | 1           | `a`   | `a ^ b` |
/// | 2           | `b`   |         |
///
/// # Errors
///
/// Fails if there are not enough operands on the stack, or if the placement
/// computing the result cannot be recorded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Xor;

impl Opcode for Xor {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        util::execute_arith(vm, ArithOp::Xor)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        util::synthesize_arith(vm, ArithOp::Xor, step)
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        2
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        "XOR".into()
    }

    fn as_byte(&self) -> u8 {
        0x18
    }
}

/// The `NOT` opcode performs a bitwise negation of its operand
///
/// # Semantics
///
/// | Stack Index | Input | Output |
/// | :---------: | :---: | :----: |
/// | 1           | `a`   | `~a`   |
///
/// # Errors
///
/// Fails if there are not enough operands on the stack, or if the placement
/// computing the result cannot be recorded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Not;

impl Opcode for Not {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        util::execute_arith(vm, ArithOp::Not)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        util::synthesize_arith(vm, ArithOp::Not, step)
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        1
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        "NOT".into()
    }

    fn as_byte(&self) -> u8 {
        0x19
    }
}

/// The `BYTE` opcode retrieves a single byte from a word.
///
/// # Semantics
///
/// | Stack Index | Input    | Output                                 |
/// | :---------: | :------: | :------------------------------------: |
/// | 1           | `offset` | `(value >> (248 - offset * 8)) & 0xFF` |
/// | 2           | `value`  |                                        |
///
/// where:
///
/// - `offset` is the byte offset in `value` to retrieve, starting from the most
///   significant byte
/// - `value` is the word-sized (32 byte) value
///
/// # Errors
///
/// Fails if there are not enough operands on the stack, or if the placement
/// computing the result cannot be recorded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Byte;

impl Opcode for Byte {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        util::execute_arith(vm, ArithOp::Byte)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        util::synthesize_arith(vm, ArithOp::Byte, step)
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        2
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        "BYTE".into()
    }

    fn as_byte(&self) -> u8 {
        0x1a
    }
}

/// The `SHL` opcode performs a left shift (toward the MSB).
///
/// The bits moved after the 256th one are discarded, the new bits are set to 0.
///
/// # Semantics
///
/// | Stack Index | Input   | Output           |
/// | :---------: | :-----: | :--------------: |
/// | 1           | `shift` | `value << shift` |
/// | 2           | `value` |                  |
///
/// where:
///
/// - `shift` is the number of bits shifted to the left
/// - `value` the 32-byte value to shift
///
/// # Errors
///
/// Fails if there are not enough operands on the stack, or if the placement
/// computing the result cannot be recorded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Shl;

impl Opcode for Shl {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        util::execute_arith(vm, ArithOp::Shl)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        util::synthesize_arith(vm, ArithOp::Shl, step)
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        2
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        "SHL".into()
    }

    fn as_byte(&self) -> u8 {
        0x1b
    }
}

/// The `SHR` opcode performs a right shift (toward the LSB).
///
/// The bits moved before the first one are discarded, the new bits are set to
/// 0.
///
/// # Semantics
///
/// | Stack Index | Input   | Output           |
/// | :---------: | :-----: | :--------------: |
/// | 1           | `shift` | `value >> shift` |
/// | 2           | `value` |                  |
///
/// where:
///
/// - `shift` is the number of bits shifted to the right
/// - `value` the 32-byte value to shift
///
/// # Errors
///
/// Fails if there are not enough operands on the stack, or if the placement
/// computing the result cannot be recorded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Shr;

impl Opcode for Shr {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        util::execute_arith(vm, ArithOp::Shr)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        util::synthesize_arith(vm, ArithOp::Shr, step)
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        2
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        "SHR".into()
    }

    fn as_byte(&self) -> u8 {
        0x1c
    }
}

/// The `SAR` opcode performs a signed (arithmetic) right shift (toward the
/// LSB).
///
/// The bits moved before the first one are discarded, the new bits are set to 0
/// if the previous most significant bit was 0, otherwise the new bits are set
/// to 1.
///
/// # Semantics
///
/// | Stack Index | Input   | Output           |
/// | :---------: | :-----: | :--------------: |
/// | 1           | `shift` | `value >> shift` |
/// | 2           | `value` |                  |
///
/// where:
///
/// - `shift` is the number of bits shifted to the right
/// - `value` the 32-byte value to shift
///
/// # Errors
///
/// Fails if there are not enough operands on the stack, or if the placement
/// computing the result cannot be recorded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Sar;

impl Opcode for Sar {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        util::execute_arith(vm, ArithOp::Sar)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        util::synthesize_arith(vm, ArithOp::Sar, step)
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        2
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        "SAR".into()
    }

    fn as_byte(&self) -> u8 {
        0x1d
    }
}

#[cfg(test)]
mod test {
    use ethnum::U256;

    use crate::{
        arith::ArithOp,
        opcode::{logic, test_util as util},
        synthesis::{
            placement::PlacementId,
            subcircuit::{ALU3, ALU4, AND, XOR},
        },
    };

    #[test]
    fn and_records_a_placement_without_a_selector() -> anyhow::Result<()> {
        let values = vec![U256::from(0x0fu8), U256::from(0x3cu8)];
        let mut vm = util::new_vm_with_values_on_stack(values)?;
        vm.dispatch(&logic::And)?;

        let (concrete, symbol) = util::top(&vm)?;
        assert_eq!(concrete, U256::from(0x0cu8));
        assert_eq!(symbol.value(), concrete);

        let placement = vm
            .registry()
            .placement(PlacementId(4))
            .expect("The AND placement was not recorded");
        assert_eq!(placement.subcircuit(), AND);
        assert_eq!(placement.selector(), None);
        assert_eq!(placement.in_pts().len(), 2);

        Ok(())
    }

    #[test]
    fn xor_with_itself_is_zero() -> anyhow::Result<()> {
        let values = vec![U256::from(0x55u8), U256::from(0x55u8)];
        let mut vm = util::new_vm_with_values_on_stack(values)?;
        vm.dispatch(&logic::Xor)?;

        let (concrete, symbol) = util::top(&vm)?;
        assert_eq!(concrete, U256::ZERO);
        assert_eq!(symbol.value(), U256::ZERO);
        assert_eq!(
            vm.registry().placement(PlacementId(4)).map(|p| p.subcircuit()),
            Some(XOR)
        );

        Ok(())
    }

    #[test]
    fn is_zero_yields_one_for_zero() -> anyhow::Result<()> {
        let mut vm = util::new_vm_with_values_on_stack(vec![U256::ZERO])?;
        vm.dispatch(&logic::IsZero)?;

        let (concrete, symbol) = util::top(&vm)?;
        assert_eq!(concrete, U256::ONE);
        assert_eq!(symbol.value(), U256::ONE);
        assert_eq!(vm.state().stack().depth(), 1);
        assert_eq!(vm.symbolic().stack().depth(), 1);

        Ok(())
    }

    #[test]
    fn signed_comparisons_respect_the_sign() -> anyhow::Result<()> {
        // -1 < 1 when signed, but not when unsigned.
        let mut vm = util::new_vm_with_values_on_stack(vec![U256::ONE, U256::MAX])?;
        vm.dispatch(&logic::SLt)?;
        assert_eq!(util::top(&vm)?.0, U256::ONE);

        let mut vm = util::new_vm_with_values_on_stack(vec![U256::ONE, U256::MAX])?;
        vm.dispatch(&logic::Lt)?;
        assert_eq!(util::top(&vm)?.0, U256::ZERO);

        let mut vm = util::new_vm_with_values_on_stack(vec![U256::MAX, U256::ONE])?;
        vm.dispatch(&logic::SGt)?;
        let (concrete, symbol) = util::top(&vm)?;
        assert_eq!(concrete, U256::ONE);
        assert_eq!(symbol.value(), U256::ONE);

        let placement = vm
            .registry()
            .placement(PlacementId(4))
            .expect("The SGT placement was not recorded");
        assert_eq!(placement.subcircuit(), ALU4);
        assert_eq!(placement.selector(), Some(ArithOp::SGt.selector()));

        Ok(())
    }

    #[test]
    fn shifts_take_the_shift_amount_first() -> anyhow::Result<()> {
        let mut vm = util::new_vm_with_values_on_stack(vec![U256::ONE, U256::from(4u8)])?;
        vm.dispatch(&logic::Shl)?;
        let (concrete, symbol) = util::top(&vm)?;
        assert_eq!(concrete, U256::from(16u8));
        assert_eq!(symbol.value(), concrete);
        assert_eq!(
            vm.registry().placement(PlacementId(4)).map(|p| p.subcircuit()),
            Some(ALU3)
        );

        let mut vm = util::new_vm_with_values_on_stack(vec![U256::MAX, U256::from(300u16)])?;
        vm.dispatch(&logic::Sar)?;
        assert_eq!(util::top(&vm)?.0, U256::MAX);

        let mut vm = util::new_vm_with_values_on_stack(vec![U256::MAX, U256::from(300u16)])?;
        vm.dispatch(&logic::Shr)?;
        assert_eq!(util::top(&vm)?.0, U256::ZERO);

        Ok(())
    }

    #[test]
    fn byte_indexes_from_the_most_significant_end() -> anyhow::Result<()> {
        let values = vec![U256::from(0xabcdu16), U256::from(30u8)];
        let mut vm = util::new_vm_with_values_on_stack(values)?;
        vm.dispatch(&logic::Byte)?;
        assert_eq!(util::top(&vm)?.0, U256::from(0xabu8));

        Ok(())
    }
}
