//! This module contains the integer semantics of the EVM's arithmetic, logic
//! and bitwise operations.
//!
//! The same [`ArithOp::evaluate`] is used by the concrete half of execution to
//! compute stack results and by the symbolic half to compute the values carried
//! by placement outputs, so the two can never drift apart.

use std::fmt::{Display, Formatter};

use ethnum::{I256, U256};

/// The operations that map onto a single arithmetic subcircuit placement.
///
/// Operands are listed in the order in which they are popped from the stack,
/// so for `SUB` the first operand is the minuend.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ArithOp {
    Add,
    Mul,
    Sub,
    Div,
    SDiv,
    Mod,
    SMod,
    AddMod,
    MulMod,
    Exp,
    SignExtend,
    Lt,
    Gt,
    SLt,
    SGt,
    Eq,
    IsZero,
    And,
    Or,
    Xor,
    Not,
    Byte,
    Shl,
    Shr,
    Sar,
}

impl ArithOp {
    /// Every arithmetic operation, in opcode order.
    pub const ALL: [ArithOp; 25] = [
        Self::Add,
        Self::Mul,
        Self::Sub,
        Self::Div,
        Self::SDiv,
        Self::Mod,
        Self::SMod,
        Self::AddMod,
        Self::MulMod,
        Self::Exp,
        Self::SignExtend,
        Self::Lt,
        Self::Gt,
        Self::SLt,
        Self::SGt,
        Self::Eq,
        Self::IsZero,
        Self::And,
        Self::Or,
        Self::Xor,
        Self::Not,
        Self::Byte,
        Self::Shl,
        Self::Shr,
        Self::Sar,
    ];

    /// Gets the byte value of the opcode that performs this operation.
    #[must_use]
    pub fn opcode(&self) -> u8 {
        match self {
            Self::Add => 0x01,
            Self::Mul => 0x02,
            Self::Sub => 0x03,
            Self::Div => 0x04,
            Self::SDiv => 0x05,
            Self::Mod => 0x06,
            Self::SMod => 0x07,
            Self::AddMod => 0x08,
            Self::MulMod => 0x09,
            Self::Exp => 0x0a,
            Self::SignExtend => 0x0b,
            Self::Lt => 0x10,
            Self::Gt => 0x11,
            Self::SLt => 0x12,
            Self::SGt => 0x13,
            Self::Eq => 0x14,
            Self::IsZero => 0x15,
            Self::And => 0x16,
            Self::Or => 0x17,
            Self::Xor => 0x18,
            Self::Not => 0x19,
            Self::Byte => 0x1a,
            Self::Shl => 0x1b,
            Self::Shr => 0x1c,
            Self::Sar => 0x1d,
        }
    }

    /// Gets the mnemonic of the opcode that performs this operation.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Mul => "MUL",
            Self::Sub => "SUB",
            Self::Div => "DIV",
            Self::SDiv => "SDIV",
            Self::Mod => "MOD",
            Self::SMod => "SMOD",
            Self::AddMod => "ADDMOD",
            Self::MulMod => "MULMOD",
            Self::Exp => "EXP",
            Self::SignExtend => "SIGNEXTEND",
            Self::Lt => "LT",
            Self::Gt => "GT",
            Self::SLt => "SLT",
            Self::SGt => "SGT",
            Self::Eq => "EQ",
            Self::IsZero => "ISZERO",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Not => "NOT",
            Self::Byte => "BYTE",
            Self::Shl => "SHL",
            Self::Shr => "SHR",
            Self::Sar => "SAR",
        }
    }

    /// Gets the number of stack operands consumed by the operation.
    #[must_use]
    pub fn arity(&self) -> usize {
        match self {
            Self::IsZero | Self::Not => 1,
            Self::AddMod | Self::MulMod => 3,
            _ => 2,
        }
    }

    /// Gets the operation performed by the opcode with byte value `byte`, if
    /// any.
    #[must_use]
    pub fn from_opcode(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.opcode() == byte)
    }

    /// Gets the operation whose selector flag is `selector`, where the flag of
    /// an operation is `1 << opcode`.
    #[must_use]
    pub fn from_selector(selector: U256) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.selector() == selector)
    }

    /// Gets the selector flag for the operation, which is `1 << opcode`.
    #[must_use]
    pub fn selector(&self) -> U256 {
        U256::ONE << u32::from(self.opcode())
    }

    /// Evaluates the operation on `inputs`, given in stack-pop order.
    ///
    /// Returns [`None`] if the number of inputs does not match
    /// [`Self::arity`].
    #[must_use]
    pub fn evaluate(&self, inputs: &[U256]) -> Option<U256> {
        if inputs.len() != self.arity() {
            return None;
        }
        let a = inputs[0];
        let b = inputs.get(1).copied().unwrap_or_default();
        let n = inputs.get(2).copied().unwrap_or_default();

        let result = match self {
            Self::Add => a.wrapping_add(b),
            Self::Mul => a.wrapping_mul(b),
            Self::Sub => a.wrapping_sub(b),
            Self::Div => div(a, b),
            Self::SDiv => sdiv(a, b),
            Self::Mod => rem(a, b),
            Self::SMod => srem(a, b),
            Self::AddMod => add_mod(a, b, n),
            Self::MulMod => mul_mod(a, b, n),
            Self::Exp => exp(a, b),
            Self::SignExtend => sign_extend(a, b),
            Self::Lt => from_bool(a < b),
            Self::Gt => from_bool(a > b),
            Self::SLt => from_bool(to_signed(a) < to_signed(b)),
            Self::SGt => from_bool(to_signed(a) > to_signed(b)),
            Self::Eq => from_bool(a == b),
            Self::IsZero => from_bool(a == U256::ZERO),
            Self::And => a & b,
            Self::Or => a | b,
            Self::Xor => a ^ b,
            Self::Not => !a,
            Self::Byte => byte(a, b),
            Self::Shl => shl(a, b),
            Self::Shr => shr(a, b),
            Self::Sar => sar(a, b),
        };

        Some(result)
    }
}

impl Display for ArithOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Reinterprets the bits of `value` as a two's complement signed integer.
#[must_use]
pub fn to_signed(value: U256) -> I256 {
    I256::from_ne_bytes(value.to_ne_bytes())
}

/// Reinterprets the bits of a two's complement signed `value` as unsigned.
#[must_use]
pub fn from_signed(value: I256) -> U256 {
    U256::from_ne_bytes(value.to_ne_bytes())
}

/// Converts a boolean into the EVM's word representation of it.
#[must_use]
pub fn from_bool(value: bool) -> U256 {
    if value {
        U256::ONE
    } else {
        U256::ZERO
    }
}

/// Unsigned division, where division by zero yields zero.
#[must_use]
pub fn div(a: U256, b: U256) -> U256 {
    if b == U256::ZERO {
        U256::ZERO
    } else {
        a / b
    }
}

/// Unsigned remainder, where a zero modulus yields zero.
#[must_use]
pub fn rem(a: U256, b: U256) -> U256 {
    if b == U256::ZERO {
        U256::ZERO
    } else {
        a % b
    }
}

/// Signed division truncating towards zero, where division by zero yields
/// zero and `MIN / -1` wraps to `MIN`.
#[must_use]
pub fn sdiv(a: U256, b: U256) -> U256 {
    if b == U256::ZERO {
        return U256::ZERO;
    }
    from_signed(to_signed(a).wrapping_div(to_signed(b)))
}

/// Signed remainder taking the sign of the dividend, where a zero modulus
/// yields zero.
#[must_use]
pub fn srem(a: U256, b: U256) -> U256 {
    if b == U256::ZERO {
        return U256::ZERO;
    }
    from_signed(to_signed(a).wrapping_rem(to_signed(b)))
}

/// Computes `(a + b) % n` without intermediate overflow.
#[must_use]
pub fn add_mod(a: U256, b: U256, n: U256) -> U256 {
    if n == U256::ZERO {
        return U256::ZERO;
    }
    add_mod_reduced(a % n, b % n, n)
}

/// Computes `(a + b) % n` for `a, b < n`.
fn add_mod_reduced(a: U256, b: U256, n: U256) -> U256 {
    let (sum, overflowed) = a.overflowing_add(b);
    if overflowed || sum >= n {
        sum.wrapping_sub(n)
    } else {
        sum
    }
}

/// Computes `(a * b) % n` without intermediate overflow.
#[must_use]
pub fn mul_mod(a: U256, b: U256, n: U256) -> U256 {
    if n == U256::ZERO {
        return U256::ZERO;
    }
    let a = a % n;
    let mut result = U256::ZERO;
    for bit in (0..256u32).rev() {
        result = add_mod_reduced(result, result, n);
        if (b >> bit) & U256::ONE == U256::ONE {
            result = add_mod_reduced(result, a, n);
        }
    }
    result
}

/// Performs one step of right-to-left binary exponentiation.
///
/// Given the running `result`, the current `power` of the base and the
/// exponent `bit` for that power, returns the next result and the squared
/// power.
#[must_use]
pub fn exp_step(result: U256, power: U256, bit: bool) -> (U256, U256) {
    let next_result = if bit { result.wrapping_mul(power) } else { result };
    (next_result, power.wrapping_mul(power))
}

/// Computes `base ** exponent` modulo `2**256`.
#[must_use]
pub fn exp(base: U256, exponent: U256) -> U256 {
    let mut result = U256::ONE;
    let mut power = base;
    let mut remaining = exponent;
    while remaining != U256::ZERO {
        (result, power) = exp_step(result, power, remaining & U256::ONE == U256::ONE);
        remaining >>= 1u32;
    }
    result
}

/// Gets the number of significant bits in `value`.
#[must_use]
pub fn bit_length(value: U256) -> usize {
    256 - value.leading_zeros() as usize
}

/// Extends the sign of the two's complement integer held in the low
/// `byte_index + 1` bytes of `value` to the full word.
#[must_use]
pub fn sign_extend(byte_index: U256, value: U256) -> U256 {
    if byte_index >= U256::from(31u8) {
        return value;
    }
    let sign_bit = byte_index.as_u32() * 8 + 7;
    let mask = (U256::ONE << (sign_bit + 1)) - U256::ONE;
    if (value >> sign_bit) & U256::ONE == U256::ONE {
        value | !mask
    } else {
        value & mask
    }
}

/// Gets the `index`th byte of `value`, counting from the most significant.
#[must_use]
pub fn byte(index: U256, value: U256) -> U256 {
    if index >= U256::from(32u8) {
        return U256::ZERO;
    }
    let shift = (31 - index.as_u32()) * 8;
    (value >> shift) & U256::from(0xffu8)
}

/// Shifts `value` left by `shift` bits.
#[must_use]
pub fn shl(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256u16) {
        U256::ZERO
    } else {
        value << shift.as_u32()
    }
}

/// Shifts `value` right by `shift` bits, filling with zeroes.
#[must_use]
pub fn shr(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256u16) {
        U256::ZERO
    } else {
        value >> shift.as_u32()
    }
}

/// Shifts `value` right by `shift` bits, filling with copies of the sign bit.
#[must_use]
pub fn sar(shift: U256, value: U256) -> U256 {
    let signed = to_signed(value);
    if shift >= U256::from(256u16) {
        if signed < I256::ZERO {
            U256::MAX
        } else {
            U256::ZERO
        }
    } else {
        from_signed(signed >> shift.as_u32())
    }
}
