//! # Tick Math
//!
//! Conversions between ticks and Q64.64 square-root prices. A tick `t`
//! maps to `sqrt(1.0001^t) * 2^64`. The ratio is accumulated in Q128.128
//! from pre-computed powers of `sqrt(1.0001)^-1` and then narrowed to Q64.64,
//! rounding up.

use ethnum::U256;

use crate::big_int::narrow;
use crate::constants::{MAX_TICK, MIN_TICK, Q64};
use crate::error::{MathError, MathResult};

/// 2^128 as a 256-bit value
const Q128: U256 = U256::from_words(1, 0);

/// Q128.128 factor for bit 0 of the absolute tick
const FACTOR_BIT_0: u128 = 0xfffcb933bd6fad37aa2d162d1a594001;

/// `sqrt(1.0001)^-(2^i)` in Q128.128 for bits 1 through 18 of the absolute tick
const TICK_FACTORS: [(u32, u128); 18] = [
    (0x2, 0xfff97272373d413259a46990580e213a),
    (0x4, 0xfff2e50f5f656932ef12357cf3c7fdcc),
    (0x8, 0xffe5caca7e10e4e61c3624eaa0941cd0),
    (0x10, 0xffcb9843d60f6159c9db58835c926644),
    (0x20, 0xff973b41fa98c081472e6896dfb254c0),
    (0x40, 0xff2ea16466c96a3843ec78b326b52861),
    (0x80, 0xfe5dee046a99a2a811c461f1969c3053),
    (0x100, 0xfcbe86c7900a88aedcffc83b479aa3a4),
    (0x200, 0xf987a7253ac413176f2b074cf7815e54),
    (0x400, 0xf3392b0822b70005940c7a398e4b70f3),
    (0x800, 0xe7159475a2c29b7443b29c7fa6e889d9),
    (0x1000, 0xd097f3bdfd2022b8845ad8f792aa5825),
    (0x2000, 0xa9f746462d870fdf8a65dc1f90e061e5),
    (0x4000, 0x70d869a156d2a1b890bb3df62baf32f7),
    (0x8000, 0x31be135f97d08fd981231505542fcfa6),
    (0x10000, 0x9aa508b5b7a84e1c677de54f3e99bc9),
    (0x20000, 0x5d6af8dedb81196699c329225ee604),
    (0x40000, 0x2216e584f5fa1ea926041bedfe98),
];

/// Get the Q64.64 sqrt price at a tick
pub fn get_sqrt_price_at_tick(tick: i32) -> MathResult<u128> {
    if !is_tick_valid(tick) {
        return Err(MathError::TickOutOfRange(tick));
    }

    let abs_tick = tick.unsigned_abs();
    let mut ratio = if abs_tick & 0x1 != 0 {
        U256::new(FACTOR_BIT_0)
    } else {
        Q128
    };

    // ratio <= 2^128 and every factor < 2^128, so the product fits in 256 bits
    for (bit, factor) in TICK_FACTORS.iter() {
        if abs_tick & bit != 0 {
            ratio = (ratio * U256::new(*factor)) / Q128;
        }
    }

    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    let q64 = U256::new(Q64);
    let mut sqrt_price = ratio / q64;
    if ratio % q64 != U256::ZERO {
        sqrt_price += U256::ONE;
    }
    narrow(sqrt_price)
}

/// Get the greatest tick whose sqrt price is at or below `sqrt_price`
pub fn get_tick_at_sqrt_price(sqrt_price: u128) -> MathResult<i32> {
    let min_sqrt = get_sqrt_price_at_tick(MIN_TICK)?;
    let max_sqrt = get_sqrt_price_at_tick(MAX_TICK)?;
    if sqrt_price < min_sqrt || sqrt_price > max_sqrt {
        return Err(MathError::SqrtPriceOutOfRange(sqrt_price));
    }

    let mut low = MIN_TICK;
    let mut high = MAX_TICK;

    while low <= high {
        let mid = low + (high - low) / 2;
        let mid_sqrt_price = get_sqrt_price_at_tick(mid)?;

        if mid_sqrt_price == sqrt_price {
            return Ok(mid);
        } else if mid_sqrt_price < sqrt_price {
            low = mid + 1;
        } else {
            high = mid - 1;
        }
    }

    Ok(high)
}

/// Check if a tick is within the supported range
pub fn is_tick_valid(tick: i32) -> bool {
    (MIN_TICK..=MAX_TICK).contains(&tick)
}
