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

//! An ordered map over byte-string keys, backed by a double array.
//!
//! A double array packs a trie into two parallel integer arrays (`base` and
//! `check`, here combined into one 32-bit cell per node) so that following an
//! edge is a single addition plus a bounds check, with no pointer chasing.
//! The trade is construction cost: placing a node's children requires
//! searching the array for a base offset at which none of them collide with
//! an existing cell. [`builder::Builder`] does that search; [`trie::Trie`]
//! is the read side built on top of it.
//!
//! ```
//! use double_array_trie::Trie;
//!
//! let trie = Trie::builder()
//!     .elements(vec![(b"SETA".to_vec(), 1u32), (b"UTO".to_vec(), 2u32)])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(*trie.find(b"UTO").unwrap().unwrap(), 2);
//! assert!(trie.find(b"UT").unwrap().is_none());
//! ```

pub mod builder;
pub mod cell;
pub mod error;
pub mod iter;
pub mod storage;
pub mod trie;
pub mod value;

pub use builder::{BuildingObserver, Builder, NullObserver};
pub use error::{Error, Result};
pub use iter::Iter;
pub use storage::Storage;
pub use trie::{Trie, TrieBuilder};
pub use value::{BigEndianIntegerCodec, ByteStringCodec, Deserializer, Serializer};
