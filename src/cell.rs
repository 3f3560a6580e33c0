// Copyright 2017-2019 Parity Technologies (UK) Ltd.
// This file is part of Substrate.

// Substrate is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// Substrate is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with Substrate.  If not, see <http://www.gnu.org/licenses/>.

//! The base/check cell encoding shared by every storage backend.

/// The byte that marks the end of a key inside the double array.
///
/// Input keys must never contain this byte; callers that need to store
/// arbitrary bytes should run them through [`crate::value::escape`] first.
pub const TERMINATOR: u8 = 0xFE;

/// The check value written into cells that belong to no key.
pub const VACANT_CHECK: u8 = 0xFF;

/// The largest value index that fits in a cell's 24-bit base field.
pub const MAX_VALUE_INDEX: usize = 0x007F_FFFF;

/// Packs a signed 24-bit base and an 8-bit check byte into a 32-bit cell.
///
/// `base` must fit in 24 bits (sign included); callers are expected to have
/// validated this already, so out-of-range values are silently truncated
/// the same way a C `int32_t:24` bitfield would truncate them.
pub fn pack(base: i32, check: u8) -> u32 {
	((base as u32) & 0x00FF_FFFF) << 8 | check as u32
}

/// Unpacks the sign-extended base field of a cell.
pub fn base(cell: u32) -> i32 {
	let raw = (cell >> 8) & 0x00FF_FFFF;
	if raw & 0x0080_0000 != 0 {
		(raw | 0xFF00_0000) as i32
	} else {
		raw as i32
	}
}

/// Unpacks the check byte of a cell.
pub fn check(cell: u32) -> u8 {
	(cell & 0xFF) as u8
}

/// A cell whose check byte marks it as belonging to no key.
pub fn vacant_cell() -> u32 {
	pack(0, VACANT_CHECK)
}
