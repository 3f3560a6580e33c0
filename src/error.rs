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

//! Error types returned by this crate's operations.

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while building, loading or querying a double-array trie.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// An argument supplied by the caller violates a documented precondition.
	#[error("invalid argument: {0}")]
	InvalidArgument(String),

	/// An index, offset or size fell outside the range the operation can support.
	#[error("value out of range: {0}")]
	OutOfRange(String),

	/// The underlying storage could not be read from or written to.
	#[error("storage I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// An iterator or other stateful object was driven past its logical end.
	#[error("logic error: {0}")]
	Logic(String),

	/// A serialized value or file could not be decoded.
	#[error("malformed data: {0}")]
	Malformed(String),
}

impl Error {
	pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
		Error::InvalidArgument(message.into())
	}

	pub(crate) fn out_of_range(message: impl Into<String>) -> Self {
		Error::OutOfRange(message.into())
	}

	pub(crate) fn logic(message: impl Into<String>) -> Self {
		Error::Logic(message.into())
	}

	pub(crate) fn malformed(message: impl Into<String>) -> Self {
		Error::Malformed(message.into())
	}
}
