//! Alignment of a query substring to the sequence of a single graph node.

use super::error::ParseError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Match,
    Insertion,
    Deletion,
    SoftClip,
}

impl OperationKind {
    pub fn from_symbol(symbol: u8) -> Option<Self> {
        match symbol {
            b'M' => Some(OperationKind::Match),
            b'I' => Some(OperationKind::Insertion),
            b'D' => Some(OperationKind::Deletion),
            b'S' => Some(OperationKind::SoftClip),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            OperationKind::Match => 'M',
            OperationKind::Insertion => 'I',
            OperationKind::Deletion => 'D',
            OperationKind::SoftClip => 'S',
        }
    }

    pub fn consumes_query(&self) -> bool {
        matches!(
            self,
            OperationKind::Match | OperationKind::Insertion | OperationKind::SoftClip
        )
    }

    pub fn consumes_reference(&self) -> bool {
        matches!(self, OperationKind::Match | OperationKind::Deletion)
    }
}

/// A run of a single alignment operation together with the bases it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub kind: OperationKind,
    pub len: usize,
    pub query: String,
    pub reference: String,
}

impl Operation {
    pub fn query_len(&self) -> usize {
        if self.kind.consumes_query() {
            self.len
        } else {
            0
        }
    }

    pub fn ref_len(&self) -> usize {
        if self.kind.consumes_reference() {
            self.len
        } else {
            0
        }
    }
}

/// Parses a run-length operation string such as `2M1I3M2S`.
pub fn parse_operations(encoding: &str) -> Result<Vec<(usize, OperationKind)>, ParseError> {
    if encoding.is_empty() {
        return Err(ParseError::Empty);
    }

    let bytes = encoding.as_bytes();
    let mut ops = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let digits_end = pos + bytes[pos..].iter().take_while(|b| b.is_ascii_digit()).count();
        if digits_end == pos {
            return Err(ParseError::MissingNumber {
                pos,
                encoding: encoding.to_string(),
            });
        }
        let len = parse_length(&encoding[pos..digits_end], encoding)?;
        if len == 0 {
            return Err(ParseError::InvalidNumber {
                value: encoding[pos..digits_end].to_string(),
                encoding: encoding.to_string(),
            });
        }

        let Some(&symbol) = bytes.get(digits_end) else {
            return Err(ParseError::UnterminatedSegment {
                encoding: encoding.to_string(),
            });
        };
        let kind = OperationKind::from_symbol(symbol).ok_or_else(|| ParseError::UnexpectedChar {
            ch: symbol as char,
            pos: digits_end,
            encoding: encoding.to_string(),
        })?;
        ops.push((len, kind));
        pos = digits_end + 1;
    }

    Ok(ops)
}

/// Total length of the operations matching `consumes`, or an error if the
/// sum does not fit in a `usize`.
pub(crate) fn total_len(
    ops: &[(usize, OperationKind)],
    consumes: impl Fn(OperationKind) -> bool,
) -> Result<usize, ParseError> {
    ops.iter()
        .filter(|(_, kind)| consumes(*kind))
        .try_fold(0usize, |total, (len, _)| total.checked_add(*len))
        .ok_or(ParseError::LengthOverflow)
}

pub(crate) fn parse_length(value: &str, encoding: &str) -> Result<usize, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidNumber {
        value: value.to_string(),
        encoding: encoding.to_string(),
    })
}

/// Alignment of a query substring against one node.
///
/// Operations keep the query and reference bases they cover, so a mapping is
/// self-contained once built. Adjacent operations of the same kind are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    reference_start: usize,
    operations: Vec<Operation>,
}

impl Mapping {
    /// Builds a mapping from an operation string.
    ///
    /// `query` must be exactly the query bases consumed by the operations and
    /// `reference` is the full sequence of the node, aligned from
    /// `reference_start` on.
    pub fn new(
        reference_start: usize,
        encoding: &str,
        query: &str,
        reference: &str,
    ) -> Result<Self, ParseError> {
        let ops = parse_operations(encoding)?;
        Self::from_operations(reference_start, &ops, query, reference)
    }

    pub fn from_operations(
        reference_start: usize,
        ops: &[(usize, OperationKind)],
        query: &str,
        reference: &str,
    ) -> Result<Self, ParseError> {
        if !query.is_ascii() || !reference.is_ascii() {
            return Err(ParseError::NonAsciiSequence);
        }

        if let Some(&(len, kind)) = ops.iter().find(|(len, _)| *len == 0) {
            return Err(ParseError::InvalidNumber {
                value: len.to_string(),
                encoding: format!("{}{}", len, kind.symbol()),
            });
        }

        let needed = total_len(ops, |kind| kind.consumes_query())?;
        if needed != query.len() {
            return Err(if needed > query.len() {
                ParseError::QueryExhausted {
                    needed,
                    available: query.len(),
                }
            } else {
                ParseError::UnconsumedQuery {
                    consumed: needed,
                    query_len: query.len(),
                }
            });
        }

        let ref_len = total_len(ops, |kind| kind.consumes_reference())?;
        let ref_end = reference_start
            .checked_add(ref_len)
            .ok_or(ParseError::LengthOverflow)?;
        if ref_end > reference.len() {
            return Err(ParseError::ReferenceOverrun {
                end: ref_end,
                reference_len: reference.len(),
            });
        }

        let mut operations: Vec<Operation> = Vec::with_capacity(ops.len());
        let (mut query_pos, mut ref_pos) = (0, reference_start);
        for &(len, kind) in ops {
            let query_len = if kind.consumes_query() { len } else { 0 };
            let ref_len = if kind.consumes_reference() { len } else { 0 };
            let query_bases = &query[query_pos..query_pos + query_len];
            let ref_bases = &reference[ref_pos..ref_pos + ref_len];
            query_pos += query_len;
            ref_pos += ref_len;

            match operations.last_mut() {
                Some(last) if last.kind == kind => {
                    last.len += len;
                    last.query.push_str(query_bases);
                    last.reference.push_str(ref_bases);
                }
                _ => operations.push(Operation {
                    kind,
                    len,
                    query: query_bases.to_string(),
                    reference: ref_bases.to_string(),
                }),
            }
        }

        Ok(Mapping {
            reference_start,
            operations,
        })
    }

    pub fn reference_start(&self) -> usize {
        self.reference_start
    }

    /// Position just past the last reference base covered by the mapping.
    pub fn reference_end(&self) -> usize {
        self.reference_start + self.reference_span()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn num_matches(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| op.kind == OperationKind::Match)
            .map(|op| op.len)
            .sum()
    }

    pub fn num_bases(&self, kind: OperationKind) -> usize {
        self.operations
            .iter()
            .filter(|op| op.kind == kind)
            .map(|op| op.len)
            .sum()
    }

    /// Aligned query bases; soft-clipped bases are left out.
    pub fn query(&self) -> String {
        self.operations
            .iter()
            .filter(|op| op.kind != OperationKind::SoftClip)
            .map(|op| op.query.as_str())
            .collect()
    }

    /// Aligned reference bases.
    pub fn reference(&self) -> String {
        self.operations
            .iter()
            .map(|op| op.reference.as_str())
            .collect()
    }

    pub fn query_span(&self) -> usize {
        self.operations.iter().map(|op| op.query_len()).sum()
    }

    pub fn reference_span(&self) -> usize {
        self.operations.iter().map(|op| op.ref_len()).sum()
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in &self.operations {
            write!(f, "{}{}", op.len, op.kind.symbol())?;
        }
        Ok(())
    }
}
