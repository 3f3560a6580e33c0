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

//! Depth-first iteration over every key/value pair stored in a trie.

use crate::cell::TERMINATOR;
use crate::error::{Error, Result};
use crate::storage::Storage;
use std::rc::Rc;

struct Frame {
	index: usize,
	key: Vec<u8>,
}

/// Yields every `(key, value)` pair reachable from a node, in ascending
/// order of the key as encoded in the double array (the terminator byte
/// `0xFE` sorts after every ordinary key byte, so a key that is a strict
/// prefix of another is yielded after it, not before).
///
/// Built by pushing descending byte order `0xFE..=0x00` onto a stack; since
/// the stack is last-in-first-out, popping proceeds in ascending order.
pub struct Iter<'a, V> {
	storage: &'a Storage<V>,
	stack: Vec<Frame>,
}

impl<'a, V> Iter<'a, V> {
	pub(crate) fn new(storage: &'a Storage<V>, root: usize, prefix: Vec<u8>) -> Self {
		Self { storage, stack: vec![Frame { index: root, key: prefix }] }
	}
}

impl<'a, V> Iterator for Iter<'a, V> {
	type Item = Result<(Vec<u8>, Rc<V>)>;

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			let frame = self.stack.pop()?;

			if self.storage.check_at(frame.index) == TERMINATOR {
				let value_index = self.storage.base_at(frame.index);
				if value_index < 0 {
					return Some(Err(Error::malformed("leaf cell has a negative value index")));
				}
				let value = match self.storage.value_at(value_index as usize) {
					Ok(Some(value)) => value,
					Ok(None) => {
						return Some(Err(Error::malformed("leaf cell references a missing value")))
					}
					Err(err) => return Some(Err(err)),
				};
				return Some(Ok((frame.key, value)));
			}

			let base = self.storage.base_at(frame.index);
			for b in (0..=TERMINATOR).rev() {
				let child = base + b as i32;
				if child < 0 {
					continue;
				}
				let child = child as usize;
				if self.storage.check_at(child) == b {
					let mut key = frame.key.clone();
					if b != TERMINATOR {
						key.push(b);
					}
					self.stack.push(Frame { index: child, key });
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::builder::{Builder, NullObserver};
	use crate::storage::Storage as StorageEnum;

	#[test]
	fn yields_every_key_once() {
		let elements: Vec<(Vec<u8>, u32)> = vec![
			(b"SETA".to_vec(), 1),
			(b"UTIGOSI".to_vec(), 2),
			(b"UTO".to_vec(), 3),
		];
		let storage = Builder::new().build(&elements, &mut NullObserver).unwrap();
		let storage = StorageEnum::InMemory(storage);
		let mut seen: Vec<(Vec<u8>, u32)> =
			Iter::new(&storage, 0, Vec::new()).map(|r| r.map(|(k, v)| (k, *v)).unwrap()).collect();
		seen.sort();
		let mut expected = elements.clone();
		expected.sort();
		assert_eq!(seen, expected);
	}
}
