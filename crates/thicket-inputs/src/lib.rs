//! Where parser input comes from: anything that can hand out its bytes in
//! order, plus an editable [`Document`] that reports each change as an
//! `InputEdit`.

mod document;

use std::borrow::Cow;

pub use document::{Document, DocumentError};
pub use line_index::LineIndex;

/// Text that can be read in chunks.
pub trait TextSource {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The longest contiguous piece of text starting at `offset`. Empty at
    /// or past the end.
    fn chunk_at(&self, offset: usize) -> &[u8];

    /// The whole text as one slice, copying only when it is split up.
    fn contiguous(&self) -> Cow<'_, [u8]> {
        let first = self.chunk_at(0);
        if first.len() == self.len() {
            return Cow::Borrowed(first);
        }
        let mut bytes = Vec::with_capacity(self.len());
        while bytes.len() < self.len() {
            let chunk = self.chunk_at(bytes.len());
            if chunk.is_empty() {
                break;
            }
            bytes.extend_from_slice(chunk);
        }
        Cow::Owned(bytes)
    }
}

impl TextSource for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn chunk_at(&self, offset: usize) -> &[u8] {
        self.get(offset..).unwrap_or_default()
    }
}

impl TextSource for str {
    fn len(&self) -> usize {
        str::len(self)
    }

    fn chunk_at(&self, offset: usize) -> &[u8] {
        self.as_bytes().chunk_at(offset)
    }
}

impl TextSource for String {
    fn len(&self) -> usize {
        String::len(self)
    }

    fn chunk_at(&self, offset: usize) -> &[u8] {
        self.as_bytes().chunk_at(offset)
    }
}

impl TextSource for Vec<u8> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn chunk_at(&self, offset: usize) -> &[u8] {
        self.as_slice().chunk_at(offset)
    }
}

/// Text kept as separate pieces, the way an editor buffer might hold it.
#[derive(Debug, Clone, Default)]
pub struct ChunkedText {
    chunks: Vec<Box<[u8]>>,
    /// Offset of each chunk.
    starts: Vec<usize>,
    len: usize,
}

impl ChunkedText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: impl Into<Vec<u8>>) {
        let chunk = chunk.into();
        if chunk.is_empty() {
            return;
        }
        self.starts.push(self.len);
        self.len += chunk.len();
        self.chunks.push(chunk.into_boxed_slice());
    }
}

impl<C: Into<Vec<u8>>> FromIterator<C> for ChunkedText {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        let mut text = Self::new();
        for chunk in iter {
            text.push(chunk);
        }
        text
    }
}

impl TextSource for ChunkedText {
    fn len(&self) -> usize {
        self.len
    }

    fn chunk_at(&self, offset: usize) -> &[u8] {
        if offset >= self.len {
            return &[];
        }
        let index = self.starts.partition_point(|&start| start <= offset) - 1;
        &self.chunks[index][offset - self.starts[index]..]
    }
}

impl TextSource for Document {
    fn len(&self) -> usize {
        self.text().len()
    }

    fn chunk_at(&self, offset: usize) -> &[u8] {
        self.text().chunk_at(offset)
    }
}
